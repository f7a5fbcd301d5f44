use crate::adapters::templates::category_sheet_name;
use crate::app::pipelines::{pace, read_source};
use crate::app::report::{RunReport, SheetSummary};
use crate::config::toml_config::ListingConfig;
use crate::core::markdown;
use crate::core::prompt;
use crate::core::range::SheetRange;
use crate::core::{CompletionClient, Pipeline, Storage, Workbook};
use crate::domain::model::{CompletionRequest, ProductRow, SourceRow, TransformResult};
use crate::utils::error::Result;
use crate::utils::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HtmlDescription {
    pub product: ProductRow,
    pub sheet: String,
    pub html: String,
}

/// Writes a standalone HTML description next to each product on its category tab.
pub struct DescribePipeline<W: Workbook, S: Storage, C: CompletionClient> {
    workbook: W,
    output: S,
    client: C,
    config: ListingConfig,
    column: usize,
    retry: RetryPolicy,
    started_at: DateTime<Utc>,
}

impl<W: Workbook, S: Storage, C: CompletionClient> DescribePipeline<W, S, C> {
    pub fn new(workbook: W, output: S, client: C, config: ListingConfig) -> Result<Self> {
        let column = config.describe_column()?;
        let retry = config.retry_policy();
        Ok(Self {
            workbook,
            output,
            client,
            config,
            column,
            retry,
            started_at: Utc::now(),
        })
    }

    pub fn workbook(&self) -> &W {
        &self.workbook
    }

    pub async fn describe_product(&self, product: &ProductRow) -> Result<HtmlDescription> {
        let request = CompletionRequest::new(
            prompt::html_description_prompt(product),
            self.config.describe.temperature,
        )
        .with_system(prompt::DESCRIPTION_SYSTEM_PROMPT);

        let completion = self
            .retry
            .run("html description request", || self.client.complete(&request))
            .await?;
        let html = markdown::strip_citations(markdown::strip_code_fence(&completion.content));

        Ok(HtmlDescription {
            product: product.clone(),
            sheet: category_sheet_name(&product.product_type),
            html,
        })
    }
}

#[async_trait::async_trait]
impl<W: Workbook, S: Storage, C: CompletionClient> Pipeline for DescribePipeline<W, S, C> {
    type Item = SourceRow;
    type Output = HtmlDescription;

    async fn extract(&self) -> Result<Vec<SourceRow>> {
        let range = self.config.source_range()?;
        read_source(
            &self.workbook,
            &range,
            &self.config.columns,
            false,
            self.config.generation.max_rows,
        )
        .await
    }

    async fn transform(&self, data: Vec<SourceRow>) -> Result<TransformResult<HtmlDescription>> {
        let mut result = TransformResult::new();
        let delay = Duration::from_millis(self.config.describe.rate_limit_ms);
        let total = data.len();

        for (index, row) in data.into_iter().enumerate() {
            let product = match row {
                SourceRow::Product(product) => product,
                SourceRow::Incomplete(skipped) => {
                    result.skipped.push(skipped);
                    continue;
                }
            };

            tracing::info!(
                "✍️ [{}/{}] Describing {} {} (row {})",
                index + 1,
                total,
                product.brand,
                product.style_number,
                product.row_number
            );
            match self.describe_product(&product).await {
                Ok(description) => result.processed.push(description),
                Err(e) => result.skip(product.row_number, e.to_string()),
            }

            pace(delay, index, total).await;
        }

        Ok(result)
    }

    async fn load(&self, result: TransformResult<HtmlDescription>) -> Result<String> {
        // 分頁 -> (第一個寫入列, 寫入數)
        let mut per_sheet: BTreeMap<String, (usize, usize)> = BTreeMap::new();

        for description in &result.processed {
            self.workbook.ensure_sheet(&description.sheet).await?;
            let row_number = description.product.row_number;
            let cell = SheetRange::cell(&description.sheet, self.column, row_number);
            self.workbook
                .update_values(&cell.to_string(), &[vec![description.html.clone()]])
                .await?;
            tracing::info!("📝 Description written to {}", cell);
            let entry = per_sheet
                .entry(description.sheet.clone())
                .or_insert((row_number, 0));
            entry.0 = entry.0.min(row_number);
            entry.1 += 1;
        }

        let mut report = RunReport::new(&self.config.job.name, "describe", self.started_at);
        report.processed = result.processed.len();
        report.skipped = result.skipped;
        report.sheets = per_sheet
            .into_iter()
            .map(|(sheet, (first_row, rows))| SheetSummary {
                sheet,
                first_row,
                rows,
            })
            .collect();
        report
            .finish()
            .save(&self.output, &self.config.load.report_filename)
            .await?;

        Ok(format!(
            "{}/{}",
            self.config.load.output_path, self.config.load.report_filename
        ))
    }
}
