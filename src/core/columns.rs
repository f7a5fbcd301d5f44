use crate::domain::model::{ProductRow, SkippedRow};
use crate::utils::error::{ListingError, Result};
use serde::{Deserialize, Serialize};

/// Accepted header names for each source column, tried in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub product_type: Vec<String>,
    pub brand: Vec<String>,
    pub style_number: Vec<String>,
    pub additional_info: Vec<String>,
    pub size: Vec<String>,
    pub internal_reference: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            product_type: names(&["Product Type", "ProductType", "Type"]),
            brand: names(&["Brand", "BrandName"]),
            style_number: names(&["Style Number", "StyleNumber", "Style"]),
            additional_info: names(&["Additional Information", "AdditionalInfo", "Extra Info"]),
            size: names(&["Size", "Size Information", "Available Sizes", "SizeInfo"]),
            internal_reference: names(&["Internal Reference", "InternalReference", "Ref"]),
        }
    }
}

/// Resolved 0-based column positions in the source header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    pub product_type: usize,
    pub brand: usize,
    pub style_number: usize,
    pub additional_info: Option<usize>,
    pub size: Vec<usize>,
    pub internal_reference: Option<usize>,
}

/// Exact (case-insensitive, trimmed) match first, then "header contains name".
pub fn find_column(header: &[String], name: &str) -> Option<usize> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    if let Some(index) = header
        .iter()
        .position(|cell| cell.trim().to_lowercase() == wanted)
    {
        return Some(index);
    }
    let fuzzy = header
        .iter()
        .position(|cell| cell.trim().to_lowercase().contains(&wanted))?;
    tracing::info!(
        "Found similar column name: '{}' for '{}'",
        header[fuzzy],
        name
    );
    Some(fuzzy)
}

fn find_any(header: &[String], aliases: &[String]) -> Option<usize> {
    aliases.iter().find_map(|name| find_column(header, name))
}

/// Every column whose header equals or contains one of the aliases.
fn find_all(header: &[String], aliases: &[String]) -> Vec<usize> {
    let wanted: Vec<String> = aliases
        .iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect();
    header
        .iter()
        .enumerate()
        .filter(|(_, cell)| {
            let cell = cell.trim().to_lowercase();
            wanted.iter().any(|alias| cell.contains(alias.as_str()))
        })
        .map(|(index, _)| index)
        .collect()
}

pub fn resolve(header: &[String], aliases: &ColumnAliases) -> Result<ColumnMap> {
    let product_type = find_any(header, &aliases.product_type);
    let brand = find_any(header, &aliases.brand);
    let style_number = find_any(header, &aliases.style_number);

    let mut missing = Vec::new();
    if product_type.is_none() {
        missing.push("product type");
    }
    if brand.is_none() {
        missing.push("brand");
    }
    if style_number.is_none() {
        missing.push("style number");
    }
    let (Some(product_type), Some(brand), Some(style_number)) = (product_type, brand, style_number)
    else {
        return Err(ListingError::ValidationError {
            message: format!(
                "Mandatory columns are missing from the source sheet: {}",
                missing.join(", ")
            ),
        });
    };

    let mut size = find_all(header, &aliases.size);
    size.retain(|&index| index != product_type && index != brand && index != style_number);

    Ok(ColumnMap {
        product_type,
        brand,
        style_number,
        additional_info: find_any(header, &aliases.additional_info),
        size,
        internal_reference: find_any(header, &aliases.internal_reference),
    })
}

/// `"Size <first non-empty cell>"`, or empty when no size is given.
pub fn size_info<'a>(cells: impl IntoIterator<Item = &'a str>) -> String {
    cells
        .into_iter()
        .map(str::trim)
        .find(|cell| !cell.is_empty())
        .map(|cell| format!("Size {}", cell))
        .unwrap_or_default()
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

/// Turns sheet rows (header first) into products, skipping incomplete rows.
pub fn read_products(
    rows: &[Vec<String>],
    map: &ColumnMap,
    first_row_number: usize,
    require_internal_reference: bool,
) -> (Vec<ProductRow>, Vec<SkippedRow>) {
    let mut products = Vec::new();
    let mut skipped = Vec::new();

    for (offset, row) in rows.iter().enumerate().skip(1) {
        let row_number = first_row_number + offset;
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let product = ProductRow {
            row_number,
            product_type: cell(row, map.product_type).to_string(),
            brand: cell(row, map.brand).to_string(),
            style_number: cell(row, map.style_number).to_string(),
            additional_info: map
                .additional_info
                .map(|i| cell(row, i).to_string())
                .unwrap_or_default(),
            size_info: size_info(map.size.iter().map(|&i| cell(row, i))),
            internal_reference: map
                .internal_reference
                .map(|i| cell(row, i).to_string())
                .unwrap_or_default(),
        };

        let mut missing = Vec::new();
        if product.product_type.is_empty() {
            missing.push("product type");
        }
        if product.brand.is_empty() {
            missing.push("brand");
        }
        if product.style_number.is_empty() {
            missing.push("style number");
        }
        if require_internal_reference && product.internal_reference.is_empty() {
            missing.push("internal reference");
        }

        if missing.is_empty() {
            products.push(product);
        } else {
            tracing::warn!(
                "Skipping row {} due to missing mandatory data: {}",
                row_number,
                missing.join(", ")
            );
            skipped.push(SkippedRow {
                row_number,
                reason: format!("missing {}", missing.join(", ")),
            });
        }
    }

    (products, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_find_column_prefers_exact_over_fuzzy() {
        let header = row(&["Brand Notes", "brand ", "Style Number"]);
        assert_eq!(find_column(&header, "Brand"), Some(1));
        assert_eq!(find_column(&header, "style"), Some(2));
        assert_eq!(find_column(&header, "Colour"), None);
    }

    #[test]
    fn test_resolve_reports_every_missing_mandatory_column() {
        let header = row(&["Internal Reference", "Size"]);
        let err = resolve(&header, &ColumnAliases::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("product type"));
        assert!(message.contains("brand"));
        assert!(message.contains("style number"));
    }

    #[test]
    fn test_resolve_collects_size_columns() {
        let header = row(&[
            "Internal Reference",
            "Product Type",
            "Brand",
            "Style Number",
            "Size EU",
            "Size US",
        ]);
        let map = resolve(&header, &ColumnAliases::default()).unwrap();
        assert_eq!(map.product_type, 1);
        assert_eq!(map.size, vec![4, 5]);
        assert_eq!(map.internal_reference, Some(0));
        assert_eq!(map.additional_info, None);
    }

    #[test]
    fn test_size_info_uses_first_non_empty_cell() {
        assert_eq!(size_info(["", " 42 ", "9"]), "Size 42");
        assert_eq!(size_info(["", " "]), "");
    }

    #[test]
    fn test_read_products_skips_incomplete_rows() {
        let rows = vec![
            row(&["Ref", "Product Type", "Brand", "Style Number", "Size"]),
            row(&["A1", "Sneakers", "Gucci", "429445", "42"]),
            row(&["A2", "Handbag", "", "1BA1"]),
            row(&[]),
            row(&["", "Boots", "Prada", "2TG"]),
        ];
        let map = resolve(&rows[0], &ColumnAliases::default()).unwrap();

        let (products, skipped) = read_products(&rows, &map, 1, false);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].row_number, 2);
        assert_eq!(products[0].size_info, "Size 42");
        assert_eq!(products[1].row_number, 5);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].row_number, 3);
        assert_eq!(skipped[0].reason, "missing brand");

        let (products, skipped) = read_products(&rows, &map, 1, true);
        assert_eq!(products.len(), 1);
        assert_eq!(skipped.len(), 2);
    }
}
