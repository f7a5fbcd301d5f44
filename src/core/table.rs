use crate::core::range::SheetRange;
use crate::domain::ports::Workbook;
use crate::utils::error::Result;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct TableWrite {
    pub sheet: String,
    /// 1-based row of the first written data row
    pub first_row: usize,
    pub rows: usize,
    pub header: Vec<String>,
}

/// Appends rows after the last non-empty row of the tab.
pub async fn append_rows<W: Workbook>(
    workbook: &W,
    sheet: &str,
    rows: &[Vec<String>],
) -> Result<usize> {
    let existing = workbook
        .get_values(&SheetRange::whole(sheet).to_string())
        .await?;
    let first_row = existing.len() + 1;
    if !rows.is_empty() {
        workbook
            .update_values(&SheetRange::cell(sheet, 0, first_row).to_string(), rows)
            .await?;
    }
    Ok(first_row)
}

/// Writes keyed rows under a header row, keeping an existing header and
/// appending any columns it lacks.
pub async fn write_table<W: Workbook>(
    workbook: &W,
    sheet: &str,
    columns: &[String],
    rows: &[HashMap<String, String>],
) -> Result<TableWrite> {
    workbook.ensure_sheet(sheet).await?;
    let existing = workbook
        .get_values(&SheetRange::whole(sheet).to_string())
        .await?;

    let mut header = existing.first().cloned().unwrap_or_default();
    let original_width = header.len();
    for column in columns {
        if !header.iter().any(|h| h == column) {
            header.push(column.clone());
        }
    }
    if header.len() != original_width {
        tracing::debug!(
            "Writing header for '{}' ({} columns, {} new)",
            sheet,
            header.len(),
            header.len() - original_width
        );
        workbook
            .update_values(
                &SheetRange::cell(sheet, 0, 1).to_string(),
                std::slice::from_ref(&header),
            )
            .await?;
    }

    let values: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            header
                .iter()
                .map(|column| row.get(column).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    let first_row = append_rows(workbook, sheet, &values).await?;
    if !values.is_empty() {
        tracing::info!(
            "📝 Wrote {} rows to '{}' starting at row {}",
            values.len(),
            sheet,
            first_row
        );
    }

    Ok(TableWrite {
        sheet: sheet.to_string(),
        first_row,
        rows: values.len(),
        header,
    })
}
