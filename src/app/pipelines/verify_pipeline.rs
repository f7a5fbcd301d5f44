use crate::adapters::templates::category_sheet_name;
use crate::app::pipelines::{pace, read_source};
use crate::app::report::{RunReport, SheetSummary};
use crate::config::toml_config::ListingConfig;
use crate::core::prompt;
use crate::core::range::SheetRange;
use crate::core::verify::{self, VERIFICATION_HEADER};
use crate::core::{CompletionClient, Pipeline, Storage, Workbook};
use crate::domain::model::{
    CompletionRequest, ContentVerification, ProductRow, SourceRow, TransformResult,
    VerificationResult,
};
use crate::utils::error::{ListingError, Result};
use crate::utils::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Re-checks generated listings and writes one result row per product.
pub struct VerifyPipeline<W: Workbook, S: Storage, C: CompletionClient> {
    workbook: W,
    output: S,
    client: C,
    config: ListingConfig,
    retry: RetryPolicy,
    started_at: DateTime<Utc>,
}

impl<W: Workbook, S: Storage, C: CompletionClient> VerifyPipeline<W, S, C> {
    pub fn new(workbook: W, output: S, client: C, config: ListingConfig) -> Self {
        let retry = config.retry_policy();
        Self {
            workbook,
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

    async fn check_content(
        &self,
        brand: &str,
        style: &str,
        title: &str,
        description: &str,
    ) -> Result<ContentVerification> {
        let request = CompletionRequest::new(
            prompt::verification_prompt(brand, style, title, description),
            self.config.verification.temperature,
        )
        .with_system(prompt::VERIFICATION_SYSTEM_PROMPT);

        let completion = self
            .retry
            .run("verification request", || self.client.complete(&request))
            .await?;
        verify::parse_verification(&completion.content)
    }

    /// `Ok(None)` when the product has no generated listing to verify.
    pub async fn verify_product(&self, product: &ProductRow) -> Result<Option<VerificationResult>> {
        let sheet = category_sheet_name(&product.product_type);
        let values = match self
            .workbook
            .get_values(&SheetRange::whole(&sheet).to_string())
            .await
        {
            Ok(values) => values,
            Err(ListingError::SheetNotFoundError { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(record) = verify::listing_record(&values, &product.internal_reference) else {
            return Ok(None);
        };

        let objective_checks = verify::objective_checks(&record);
        let title = verify::field_value(&record, "Title").unwrap_or_default();
        let description = verify::field_value(&record, "Description").unwrap_or_default();

        let (content, error) = match self
            .check_content(&product.brand, &product.style_number, title, description)
            .await
        {
            Ok(content) => (Some(content), None),
            Err(e) => {
                tracing::error!("❌ Content check failed for row {}: {}", product.row_number, e);
                (None, Some(e.to_string()))
            }
        };

        let status = verify::overall_status(&objective_checks, content.as_ref());
        Ok(Some(VerificationResult {
            product: product.clone(),
            status,
            objective_checks,
            content,
            error,
        }))
    }
}

#[async_trait::async_trait]
impl<W: Workbook, S: Storage, C: CompletionClient> Pipeline for VerifyPipeline<W, S, C> {
    type Item = SourceRow;
    type Output = VerificationResult;

    async fn extract(&self) -> Result<Vec<SourceRow>> {
        let range = self.config.source_range()?;
        read_source(&self.workbook, &range, &self.config.columns, false, None).await
    }

    async fn transform(&self, data: Vec<SourceRow>) -> Result<TransformResult<VerificationResult>> {
        let mut result = TransformResult::new();
        let delay = Duration::from_millis(self.config.verification.rate_limit_ms);
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
                "🔎 [{}/{}] Verifying {} {} (row {})",
                index + 1,
                total,
                product.brand,
                product.style_number,
                product.row_number
            );
            match self.verify_product(&product).await? {
                Some(verification) => {
                    tracing::info!("📋 Row {}: {}", product.row_number, verification.status);
                    result.processed.push(verification);
                }
                None => result.skip(product.row_number, "no generated listing found"),
            }

            pace(delay, index, total).await;
        }

        Ok(result)
    }

    async fn load(&self, result: TransformResult<VerificationResult>) -> Result<String> {
        let sheet = &self.config.verification.sheet;
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(result.processed.len() + 1);
        rows.push(VERIFICATION_HEADER.iter().map(|h| h.to_string()).collect());
        for verification in &result.processed {
            rows.push(verify::result_row(verification)?);
        }

        self.workbook.ensure_sheet(sheet).await?;
        let updated = self
            .workbook
            .update_values(&SheetRange::cell(sheet, 0, 1).to_string(), &rows)
            .await?;
        tracing::info!(
            "📝 Wrote {} verification results ({} cells) to '{}'",
            result.processed.len(),
            updated,
            sheet
        );

        let mut report = RunReport::new(&self.config.job.name, "verify", self.started_at);
        report.processed = result.processed.len();
        report.skipped = result.skipped;
        report.sheets.push(SheetSummary {
            sheet: sheet.clone(),
            first_row: 2,
            rows: result.processed.len(),
        });
        for verification in &result.processed {
            *report
                .status_counts
                .entry(verification.status.to_string())
                .or_default() += 1;
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use crate::adapters::workbook::CsvWorkbook;
    use crate::app::pipelines::test_support::ScriptedClient;
    use crate::domain::model::VerificationStatus;
    use tempfile::TempDir;

    const VALID_REPLY: &str = r#"```json
{"title_check": {"is_valid": true, "issues": []},
 "description_check": {"is_valid": true, "issues": []},
 "suggestions": ["Mention the dust bag"]}
```"#;

    fn setup(dir: &TempDir) -> ListingConfig {
        std::fs::write(
            dir.path().join("Sheet1.csv"),
            "Internal Reference,Brand,Product Type,Style Number\n\
             R1,Gucci,Sneakers,429445\n\
             R2,Prada,Bags,1BA\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("sneakers.csv"),
            "Internal Reference,Title (Titolo),Description (Descrizione),Color (Colore),Style (Stile),Type (Tipo),Upper Material (Materiale Tomaia)\n\
             R1,Gucci Ace,Leather sneakers,White,Low-top,Sneaker,Leather\n",
        )
        .unwrap();

        ListingConfig::from_toml_str(&format!(
            r#"
[job]
name = "verify-unit"

[workbook]
path = "{0}"

[provider]
kind = "openai"
api_key = "test"
retry_attempts = 1

[verification]
rate_limit_ms = 0

[load]
output_path = "{0}"
"#,
            dir.path().display()
        ))
        .unwrap()
    }

    fn pipeline(
        dir: &TempDir,
        config: ListingConfig,
        client: ScriptedClient,
    ) -> VerifyPipeline<CsvWorkbook<LocalStorage>, LocalStorage, ScriptedClient> {
        VerifyPipeline::new(
            CsvWorkbook::new(LocalStorage::new(dir.path())),
            LocalStorage::new(dir.path()),
            client,
            config,
        )
    }

    #[tokio::test]
    async fn test_verify_writes_results_and_skips_missing_listing() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);
        let pipeline = pipeline(&dir, config, ScriptedClient::new(vec![Ok(VALID_REPLY.to_string())]));

        let items = pipeline.extract().await.unwrap();
        let result = pipeline.transform(items).await.unwrap();
        assert_eq!(result.processed.len(), 1);
        assert_eq!(result.processed[0].status, VerificationStatus::Pass);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].row_number, 3);

        pipeline.load(result).await.unwrap();
        let tab = pipeline.workbook().get_values("verification").await.unwrap();
        assert_eq!(tab.len(), 2);
        assert_eq!(tab[0][4], "Overall Status");
        assert_eq!(tab[1][0], "R1");
        assert_eq!(tab[1][4], "Pass");
        assert_eq!(tab[1][9], r#"["Mention the dust bag"]"#);

        let request = &pipeline.client.requests.lock().unwrap()[0];
        assert!(request.prompt.contains("Title: Gucci Ace"));
        assert_eq!(request.temperature, 0.1);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_error_status() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);
        let pipeline = pipeline(
            &dir,
            config,
            ScriptedClient::new(vec![Ok("The listing looks fine.".to_string())]),
        );

        let product = ProductRow {
            row_number: 2,
            product_type: "Sneakers".to_string(),
            brand: "Gucci".to_string(),
            style_number: "429445".to_string(),
            internal_reference: "R1".to_string(),
            ..Default::default()
        };
        let verification = pipeline.verify_product(&product).await.unwrap().unwrap();
        assert_eq!(verification.status, VerificationStatus::Error);
        assert!(verification.content.is_none());
        assert!(verification.error.is_some());
        assert!(verification.objective_checks.iter().all(|(_, c)| c.is_valid));
    }
}
