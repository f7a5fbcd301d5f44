use crate::core::range::SheetRange;
use crate::domain::ports::{Storage, Workbook};
use crate::utils::error::{ListingError, Result};

/// Workbook kept as one CSV file per tab under a storage root.
#[derive(Debug, Clone)]
pub struct CsvWorkbook<S: Storage> {
    storage: S,
}

impl<S: Storage> CsvWorkbook<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn tab_file(sheet: &str) -> String {
        format!("{}.csv", sheet.trim().replace(['/', '\\'], "_"))
    }

    pub async fn read_grid(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let file = Self::tab_file(sheet);
        if !self.storage.exists(&file).await {
            return Err(ListingError::SheetNotFoundError {
                sheet: sheet.to_string(),
            });
        }

        let bytes = self.storage.read_file(&file).await?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let mut grid = Vec::new();
        for record in reader.records() {
            let record = record?;
            grid.push(record.iter().map(str::to_string).collect());
        }
        Ok(grid)
    }

    async fn write_grid(&self, sheet: &str, grid: &[Vec<String>]) -> Result<()> {
        let bytes = encode_grid(grid)?;
        self.storage.write_file(&Self::tab_file(sheet), &bytes).await
    }
}

/// Serializes a tab grid as CSV.
pub fn encode_grid(grid: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in grid {
        // 空列寫成單一空欄位 (`""`)，否則讀回時會被當成空行略過
        if row.is_empty() {
            writer.write_record([""])?;
        } else {
            writer.write_record(row)?;
        }
    }
    writer
        .into_inner()
        .map_err(|e| ListingError::IoError(e.into_error()))
}

fn trim_trailing_empty<T: AsRef<str>>(cells: &mut Vec<T>) {
    while cells.last().is_some_and(|cell| cell.as_ref().is_empty()) {
        cells.pop();
    }
}

impl<S: Storage> Workbook for CsvWorkbook<S> {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let range = SheetRange::parse(range)?;
        let grid = self.read_grid(&range.sheet).await?;

        let mut values: Vec<Vec<String>> = grid[range.row_span(grid.len())]
            .iter()
            .map(|row| {
                let mut cells = row[range.column_span(row.len())].to_vec();
                trim_trailing_empty(&mut cells);
                cells
            })
            .collect();

        // 與線上試算表 API 一致：尾端空白列不回傳
        while values.last().is_some_and(|row| row.is_empty()) {
            values.pop();
        }

        tracing::debug!("📖 Read {} rows from {}", values.len(), range);
        Ok(values)
    }

    async fn update_values(&self, range: &str, values: &[Vec<String>]) -> Result<usize> {
        let range = SheetRange::parse(range)?;
        let mut grid = self.read_grid(&range.sheet).await?;

        let mut updated = 0;
        for (i, row) in values.iter().enumerate() {
            let r = range.start_row - 1 + i;
            if grid.len() <= r {
                grid.resize_with(r + 1, Vec::new);
            }
            for (j, value) in row.iter().enumerate() {
                let c = range.start_column + j;
                let target = &mut grid[r];
                if target.len() <= c {
                    target.resize(c + 1, String::new());
                }
                target[c] = value.clone();
                updated += 1;
            }
        }

        self.write_grid(&range.sheet, &grid).await?;
        tracing::debug!("✏️ Updated {} cells in {}", updated, range);
        Ok(updated)
    }

    async fn ensure_sheet(&self, name: &str) -> Result<bool> {
        if self.sheet_exists(name).await {
            tracing::debug!("Sheet '{}' already exists", name);
            return Ok(false);
        }
        self.storage.write_file(&Self::tab_file(name), b"").await?;
        tracing::info!("🆕 Sheet '{}' has been created", name);
        Ok(true)
    }

    async fn sheet_exists(&self, name: &str) -> bool {
        self.storage.exists(&Self::tab_file(name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_sheet_is_reported() {
        let dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::new(LocalStorage::new(dir.path()));

        let err = workbook.get_values("Sheet1!A1:ZZ").await.unwrap_err();
        assert!(matches!(err, ListingError::SheetNotFoundError { sheet } if sheet == "Sheet1"));

        let err = workbook
            .update_values("Sheet1!A1", &[row(&["x"])])
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::SheetNotFoundError { .. }));
    }

    #[tokio::test]
    async fn test_update_grows_grid_and_get_slices_range() {
        let dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::new(LocalStorage::new(dir.path()));

        assert!(workbook.ensure_sheet("sneakers").await.unwrap());
        assert!(!workbook.ensure_sheet("sneakers").await.unwrap());

        let updated = workbook
            .update_values(
                "sneakers!B2",
                &[row(&["Gucci", "Ace", ""]), row(&["Prada", "America's Cup"])],
            )
            .await
            .unwrap();
        assert_eq!(updated, 5);

        let all = workbook.get_values("sneakers").await.unwrap();
        assert_eq!(
            all,
            vec![
                row(&[]),
                row(&["", "Gucci", "Ace"]),
                row(&["", "Prada", "America's Cup"])
            ]
        );

        let column = workbook.get_values("sneakers!C2:C").await.unwrap();
        assert_eq!(column, vec![row(&["Ace"]), row(&["America's Cup"])]);
    }

    #[tokio::test]
    async fn test_cells_with_commas_and_newlines_survive() {
        let dir = TempDir::new().unwrap();
        let workbook = CsvWorkbook::new(LocalStorage::new(dir.path()));
        workbook.ensure_sheet("bags").await.unwrap();

        let description = "<ul>\n<li>Calfskin, gold-tone hardware</li>\n</ul>";
        workbook
            .update_values("'bags'!A1", &[row(&["Description", description])])
            .await
            .unwrap();

        let values = workbook.get_values("bags!A1:B1").await.unwrap();
        assert_eq!(values[0][1], description);
    }

    #[tokio::test]
    async fn test_tab_names_with_separators_map_to_safe_files() {
        assert_eq!(CsvWorkbook::<LocalStorage>::tab_file("bags/wallets"), "bags_wallets.csv");
        assert_eq!(CsvWorkbook::<LocalStorage>::tab_file(" sneakers "), "sneakers.csv");
    }
}
