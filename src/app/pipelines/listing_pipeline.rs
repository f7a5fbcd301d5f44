use crate::adapters::templates::{category_sheet_name, TemplateStore};
use crate::adapters::workbook::encode_grid;
use crate::app::pipelines::{pace, read_source};
use crate::app::report::{build_archive, timestamp, RowWarning, RunReport, SheetSummary};
use crate::config::toml_config::ListingConfig;
use crate::core::extract::{self, DESCRIPTION, HEADLINE_FIELDS, TITLE};
use crate::core::markdown;
use crate::core::prompt;
use crate::core::range::SheetRange;
use crate::core::table::write_table;
use crate::core::{CompletionClient, Pipeline, Storage, Workbook};
use crate::domain::model::{
    Completion, CompletionRequest, ExtractedFields, Listing, ProductRow, SourceRow, Template,
    TransformResult,
};
use crate::utils::error::{ListingError, Result};
use crate::utils::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

pub const INTERNAL_REFERENCE: &str = "Internal Reference";
pub const STYLE_NUMBER: &str = "Style Number";
pub const BRAND: &str = "Brand";

/// Generates one listing per product row and writes them to category tabs.
pub struct ListingPipeline<W: Workbook, S: Storage, C: CompletionClient> {
    workbook: W,
    templates: TemplateStore<S>,
    output: S,
    client: C,
    config: ListingConfig,
    retry: RetryPolicy,
    started_at: DateTime<Utc>,
}

impl<W: Workbook, S: Storage, C: CompletionClient> ListingPipeline<W, S, C> {
    pub fn new(
        workbook: W,
        templates: TemplateStore<S>,
        output: S,
        client: C,
        config: ListingConfig,
    ) -> Self {
        let retry = config.retry_policy();
        Self {
            workbook,
            templates,
            output,
            client,
            config,
            retry,
            started_at: Utc::now(),
        }
    }

    pub fn workbook(&self) -> &W {
        &self.workbook
    }

    async fn call(&self, label: &str, request: CompletionRequest) -> Result<Completion> {
        self.retry
            .run(label, || self.client.complete(&request))
            .await
    }

    fn require_title(fields: &ExtractedFields, product: &ProductRow) -> Result<()> {
        if fields.contains(TITLE) {
            return Ok(());
        }
        Err(ListingError::InvalidResponseError {
            message: format!("no title found in the reply for row {}", product.row_number),
        })
    }

    /// 一次請求：標題欄位與模板欄位同一份回覆
    async fn request_listing(
        &self,
        product: &ProductRow,
        template: &Template,
    ) -> Result<(ExtractedFields, Vec<serde_json::Value>)> {
        let listing = self
            .call(
                "listing request",
                CompletionRequest::new(
                    prompt::listing_prompt(product, template),
                    self.config.generation.description_temperature,
                )
                .with_system(prompt::LISTING_SYSTEM_PROMPT),
            )
            .await?;
        let fields = extract::extract_fields(&listing.content, template);
        Self::require_title(&fields, product)?;
        Ok((fields, vec![listing.raw]))
    }

    /// 兩次請求：先描述，再模板欄位
    async fn request_split(
        &self,
        product: &ProductRow,
        template: &Template,
    ) -> Result<(ExtractedFields, Vec<serde_json::Value>)> {
        let generation = &self.config.generation;
        let description = self
            .call(
                "description request",
                CompletionRequest::new(
                    prompt::description_prompt(product),
                    generation.description_temperature,
                )
                .with_system(prompt::DESCRIPTION_SYSTEM_PROMPT),
            )
            .await?;
        let headline = extract::extract_fields(&description.content, &Template::default());
        Self::require_title(&headline, product)?;

        let details = self
            .call(
                "fields request",
                CompletionRequest::new(
                    prompt::fields_prompt(product, template),
                    generation.fields_temperature,
                )
                .with_system(prompt::LISTING_SYSTEM_PROMPT),
            )
            .await?;
        let fields = headline.merge(extract::extract_fields(&details.content, template));
        Ok((fields, vec![description.raw, details.raw]))
    }

    /// Parse, merge and clean one product's listing.
    async fn generate(&self, product: &ProductRow, template: &Template) -> Result<Listing> {
        let generation = &self.config.generation;
        let (mut fields, raw_responses) = if generation.single_call {
            self.request_listing(product, template).await?
        } else {
            self.request_split(product, template).await?
        };

        let warnings = extract::finalize_fields(&mut fields, &product.size_info);
        if let Some(text) = fields.get_mut(DESCRIPTION) {
            *text = if generation.html_description {
                markdown::to_html(text)
            } else {
                markdown::strip_citations(text)
            };
        }

        let raw_responses = if self.config.load.save_responses {
            raw_responses
        } else {
            Vec::new()
        };

        Ok(Listing {
            sheet_name: category_sheet_name(&product.product_type),
            product: product.clone(),
            template: template.clone(),
            fields,
            warnings,
            raw_responses,
        })
    }

    /// Loads the template, then tries `generate` up to `max_attempts` times.
    pub async fn process_product(&self, product: &ProductRow) -> Result<Listing> {
        let template = self.templates.load(&product.product_type).await?;
        let attempts = self.config.generation.max_attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.generate(product, &template).await {
                Ok(listing) => return Ok(listing),
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Attempt {}/{} for row {} ({} {}) failed: {}",
                        attempt,
                        attempts,
                        product.row_number,
                        product.brand,
                        product.style_number,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ListingError::ProcessingError {
            message: format!("no attempt made for row {}", product.row_number),
        }))
    }

    fn sheet_columns(listings: &[Listing]) -> Vec<String> {
        let mut columns: Vec<String> = [INTERNAL_REFERENCE, STYLE_NUMBER, BRAND]
            .into_iter()
            .chain(HEADLINE_FIELDS)
            .map(str::to_string)
            .collect();
        for listing in listings {
            for field in listing.template.all_fields() {
                if !columns.contains(field) {
                    columns.push(field.clone());
                }
            }
        }
        columns
    }

    fn listing_row(listing: &Listing) -> HashMap<String, String> {
        let mut row: HashMap<String, String> = listing
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        row.insert(INTERNAL_REFERENCE.to_string(), listing.product.internal_reference.clone());
        row.insert(STYLE_NUMBER.to_string(), listing.product.style_number.clone());
        row.insert(BRAND.to_string(), listing.product.brand.clone());
        row
    }

    async fn save_responses(&self, listings: &[Listing]) -> Result<usize> {
        let stamp = timestamp(self.started_at);
        let mut saved = 0;
        for listing in listings {
            for (i, raw) in listing.raw_responses.iter().enumerate() {
                let path = format!(
                    "responses/{}_row{}_{}_{}.json",
                    listing.sheet_name.replace(' ', "_"),
                    listing.product.row_number,
                    stamp,
                    i + 1
                );
                self.output
                    .write_file(&path, &serde_json::to_vec_pretty(raw)?)
                    .await?;
                saved += 1;
            }
        }
        if saved > 0 {
            tracing::info!("🗂️ Saved {} raw API responses", saved);
        }
        Ok(saved)
    }
}

#[async_trait::async_trait]
impl<W: Workbook, S: Storage, C: CompletionClient> Pipeline for ListingPipeline<W, S, C> {
    type Item = SourceRow;
    type Output = Listing;

    async fn extract(&self) -> Result<Vec<SourceRow>> {
        let range = self.config.source_range()?;
        read_source(
            &self.workbook,
            &range,
            &self.config.columns,
            self.config.generation.require_internal_reference,
            self.config.generation.max_rows,
        )
        .await
    }

    async fn transform(&self, data: Vec<SourceRow>) -> Result<TransformResult<Listing>> {
        let mut result = TransformResult::new();
        let delay = Duration::from_millis(self.config.generation.rate_limit_ms);
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
                "🛍️ [{}/{}] Row {}: {} {} ({})",
                index + 1,
                total,
                product.row_number,
                product.brand,
                product.style_number,
                product.product_type
            );
            match self.process_product(&product).await {
                Ok(listing) => {
                    tracing::info!(
                        "✅ Row {} ready for '{}' ({} fields)",
                        product.row_number,
                        listing.sheet_name,
                        listing.fields.len()
                    );
                    result.processed.push(listing);
                }
                Err(e) => result.skip(product.row_number, e.to_string()),
            }

            pace(delay, index, total).await;
        }

        Ok(result)
    }

    async fn load(&self, result: TransformResult<Listing>) -> Result<String> {
        let mut by_sheet: BTreeMap<String, Vec<Listing>> = BTreeMap::new();
        for listing in result.processed {
            by_sheet
                .entry(listing.sheet_name.clone())
                .or_default()
                .push(listing);
        }

        let mut report = RunReport::new(&self.config.job.name, "generate", self.started_at);
        report.skipped = result.skipped;

        for (sheet, listings) in &by_sheet {
            let columns = Self::sheet_columns(listings);
            let rows: Vec<HashMap<String, String>> = listings.iter().map(Self::listing_row).collect();
            let written = write_table(&self.workbook, sheet, &columns, &rows).await?;

            report.processed += written.rows;
            report.sheets.push(SheetSummary {
                sheet: sheet.clone(),
                first_row: written.first_row,
                rows: written.rows,
            });
            report
                .warnings
                .extend(listings.iter().flat_map(|listing| {
                    listing.warnings.iter().map(move |message| RowWarning {
                        row_number: listing.product.row_number,
                        message: message.clone(),
                    })
                }));
        }

        if self.config.load.save_responses {
            let listings: Vec<Listing> = by_sheet.into_values().flatten().collect();
            self.save_responses(&listings).await?;
        }

        let report = report.finish();
        let report_json = report
            .save(&self.output, &self.config.load.report_filename)
            .await?;
        let mut output_path = format!(
            "{}/{}",
            self.config.load.output_path, self.config.load.report_filename
        );

        let archive = &self.config.load.archive;
        if archive.enabled {
            let mut entries = Vec::with_capacity(report.sheets.len() + 1);
            for summary in &report.sheets {
                let grid = self
                    .workbook
                    .get_values(&SheetRange::whole(&summary.sheet).to_string())
                    .await?;
                entries.push((format!("{}.csv", summary.sheet), encode_grid(&grid)?));
            }
            entries.push((self.config.load.report_filename.clone(), report_json));

            let zip_data = build_archive(&entries)?;
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.output.write_file(&archive.filename, &zip_data).await?;
            output_path = format!("{}/{}", self.config.load.output_path, archive.filename);
            tracing::info!("📦 Archive saved: {}", output_path);
        }

        Ok(output_path)
    }
}
