use crate::adapters::llm::{ChatClientConfig, Provider};
use crate::core::columns::ColumnAliases;
use crate::core::range::{column_index, SheetRange};
use crate::utils::error::{ListingError, Result};
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub job: JobConfig,
    pub workbook: WorkbookConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub describe: DescribeConfig,
    #[serde(default)]
    pub columns: ColumnAliases,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookConfig {
    /// 每個分頁一個 CSV 檔的目錄
    pub path: String,
    #[serde(default = "default_source_range")]
    pub source_range: String,
}

fn default_source_range() -> String {
    "Sheet1!A1:ZZ".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: Provider,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub dir: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: "./templates".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_attempts: u32,
    /// 一次請求同時取得標題與模板欄位
    pub single_call: bool,
    pub description_temperature: f32,
    pub fields_temperature: f32,
    pub rate_limit_ms: u64,
    pub max_rows: Option<usize>,
    pub html_description: bool,
    pub require_internal_reference: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            single_call: false,
            description_temperature: 0.3,
            fields_temperature: 0.1,
            rate_limit_ms: 1000,
            max_rows: None,
            html_description: false,
            require_internal_reference: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub sheet: String,
    pub temperature: f32,
    pub rate_limit_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            sheet: "verification".to_string(),
            temperature: 0.1,
            rate_limit_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeConfig {
    /// 描述寫入的欄位 (A1 欄位字母)
    pub column: String,
    pub temperature: f32,
    pub rate_limit_ms: u64,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            column: "D".to_string(),
            temperature: 0.5,
            rate_limit_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    pub save_responses: bool,
    pub report_filename: String,
    pub archive: ArchiveConfig,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            save_responses: false,
            report_filename: "run_report.json".to_string(),
            archive: ArchiveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub filename: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filename: "listing_run.zip".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl ListingConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${PERPLEXITY_API_KEY})；未設定的保留原樣，交給驗證處理
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn source_range(&self) -> Result<SheetRange> {
        SheetRange::parse(&self.workbook.source_range)
    }

    pub fn chat_client_config(&self) -> ChatClientConfig {
        let provider = &self.provider;
        let mut config = ChatClientConfig::for_provider(provider.kind, provider.api_key.clone());
        if let Some(endpoint) = &provider.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(model) = &provider.model {
            config.model = model.clone();
        }
        if let Some(max_tokens) = provider.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(top_p) = provider.top_p {
            config.top_p = top_p;
        }
        if let Some(timeout) = provider.timeout_seconds {
            config.timeout = Duration::from_secs(timeout);
        }
        config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy::new(
            self.provider.retry_attempts.unwrap_or(defaults.attempts),
            self.provider
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
        )
    }

    /// 描述欄位的 0-based 索引
    pub fn describe_column(&self) -> Result<usize> {
        column_index(&self.describe.column).ok_or_else(|| ListingError::InvalidConfigValueError {
            field: "describe.column".to_string(),
            value: self.describe.column.clone(),
            reason: "Expected column letters such as D or AB".to_string(),
        })
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("job.name", &self.job.name)?;

        validation::validate_path("workbook.path", &self.workbook.path)?;
        self.source_range()?;

        validation::validate_secret("provider.api_key", &self.provider.api_key)?;
        if let Some(endpoint) = &self.provider.endpoint {
            validation::validate_url("provider.endpoint", endpoint)?;
        }
        if let Some(max_tokens) = self.provider.max_tokens {
            validation::validate_positive_number("provider.max_tokens", max_tokens as usize, 1)?;
        }
        if let Some(top_p) = self.provider.top_p {
            validation::validate_range("provider.top_p", top_p, 0.0, 1.0)?;
        }
        if let Some(timeout) = self.provider.timeout_seconds {
            validation::validate_positive_number("provider.timeout_seconds", timeout as usize, 1)?;
        }
        if let Some(attempts) = self.provider.retry_attempts {
            validation::validate_positive_number("provider.retry_attempts", attempts as usize, 1)?;
        }

        validation::validate_path("templates.dir", &self.templates.dir)?;

        let generation = &self.generation;
        validation::validate_positive_number(
            "generation.max_attempts",
            generation.max_attempts as usize,
            1,
        )?;
        validation::validate_range(
            "generation.description_temperature",
            generation.description_temperature,
            0.0,
            2.0,
        )?;
        validation::validate_range(
            "generation.fields_temperature",
            generation.fields_temperature,
            0.0,
            2.0,
        )?;
        if let Some(max_rows) = generation.max_rows {
            validation::validate_positive_number("generation.max_rows", max_rows, 1)?;
        }

        validation::validate_non_empty_string("verification.sheet", &self.verification.sheet)?;
        validation::validate_range(
            "verification.temperature",
            self.verification.temperature,
            0.0,
            2.0,
        )?;

        self.describe_column()?;
        validation::validate_range("describe.temperature", self.describe.temperature, 0.0, 2.0)?;

        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_non_empty_string("load.report_filename", &self.load.report_filename)?;
        if self.load.archive.enabled && !self.load.archive.filename.ends_with(".zip") {
            return Err(ListingError::InvalidConfigValueError {
                field: "load.archive.filename".to_string(),
                value: self.load.archive.filename.clone(),
                reason: "Archive filename must end with .zip".to_string(),
            });
        }

        Ok(())
    }
}

impl Validate for ListingConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
