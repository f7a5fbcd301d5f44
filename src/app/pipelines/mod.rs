pub mod describe_pipeline;
pub mod listing_pipeline;
pub mod verify_pipeline;

pub use describe_pipeline::DescribePipeline;
pub use listing_pipeline::ListingPipeline;
pub use verify_pipeline::VerifyPipeline;

use crate::core::columns::{self, ColumnAliases};
use crate::core::range::SheetRange;
use crate::domain::model::SourceRow;
use crate::domain::ports::Workbook;
use crate::utils::error::Result;
use std::time::Duration;

/// Reads the product rows of the source range, header first.
pub async fn read_source<W: Workbook>(
    workbook: &W,
    range: &SheetRange,
    aliases: &ColumnAliases,
    require_internal_reference: bool,
    max_rows: Option<usize>,
) -> Result<Vec<SourceRow>> {
    tracing::info!("📥 Reading products from {}", range);
    let rows = workbook.get_values(&range.to_string()).await?;
    let Some(header) = rows.first() else {
        tracing::warn!("Source range {} is empty", range);
        return Ok(Vec::new());
    };

    let map = columns::resolve(header, aliases)?;
    let (mut products, skipped) =
        columns::read_products(&rows, &map, range.start_row, require_internal_reference);

    // 截斷後，最後一個保留列之後的略過列也不再回報
    let mut cutoff = None;
    if let Some(max_rows) = max_rows {
        if products.len() > max_rows {
            tracing::info!("✂️ Limiting run to the first {} of {} products", max_rows, products.len());
            products.truncate(max_rows);
            cutoff = products.last().map(|p| p.row_number);
        }
    }

    let mut source: Vec<SourceRow> = skipped
        .into_iter()
        .filter(|s| cutoff.is_none_or(|last| s.row_number < last))
        .map(SourceRow::Incomplete)
        .chain(products.into_iter().map(SourceRow::Product))
        .collect();
    source.sort_by_key(|row| match row {
        SourceRow::Product(p) => p.row_number,
        SourceRow::Incomplete(s) => s.row_number,
    });
    Ok(source)
}

/// Sleeps between rows, never after the last one.
pub async fn pace(delay: Duration, index: usize, total: usize) {
    if !delay.is_zero() && index + 1 < total {
        tracing::debug!("⏳ Waiting {:?} before the next row", delay);
        tokio::time::sleep(delay).await;
    }
}
