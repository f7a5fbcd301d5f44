use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {body}")]
    ApiStatusError { status: u16, body: String },

    #[error("Unexpected API response: {message}")]
    InvalidResponseError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid range '{range}': {reason}")]
    InvalidRangeError { range: String, reason: String },

    #[error("Sheet not found: {sheet}")]
    SheetNotFoundError { sheet: String },

    #[error("No template for product type '{product_type}' ({path})")]
    TemplateNotFoundError { product_type: String, path: String },

    #[error("Template {path} is invalid: {message}")]
    TemplateError { path: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ListingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ListingError::ApiError(_)
            | ListingError::ApiStatusError { .. }
            | ListingError::InvalidResponseError { .. } => ErrorCategory::Network,
            ListingError::ConfigError { .. }
            | ListingError::MissingConfigError { .. }
            | ListingError::InvalidConfigValueError { .. }
            | ListingError::TomlError(_) => ErrorCategory::Configuration,
            ListingError::CsvError(_)
            | ListingError::SerializationError(_)
            | ListingError::InvalidRangeError { .. }
            | ListingError::ValidationError { .. } => ErrorCategory::Data,
            ListingError::IoError(_)
            | ListingError::ZipError(_)
            | ListingError::SheetNotFoundError { .. } => ErrorCategory::Storage,
            ListingError::TemplateNotFoundError { .. }
            | ListingError::TemplateError { .. }
            | ListingError::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
            ErrorCategory::Storage => ErrorSeverity::Critical,
            ErrorCategory::Data | ErrorCategory::Processing => ErrorSeverity::High,
        }
    }

    /// 傳輸層錯誤、429 與 5xx 才值得重試
    pub fn is_retryable(&self) -> bool {
        match self {
            ListingError::ApiError(e) => !e.is_builder() && !e.is_decode(),
            ListingError::ApiStatusError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ListingError::ApiError(_) | ListingError::ApiStatusError { .. } => {
                format!("Could not reach the language model API: {}", self)
            }
            ListingError::InvalidResponseError { .. } => {
                "The language model API answered with an unexpected payload".to_string()
            }
            ListingError::MissingConfigError { field } => {
                format!("Required setting '{}' is not set", field)
            }
            ListingError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            ListingError::SheetNotFoundError { sheet } => {
                format!("The workbook has no tab named '{}'", sheet)
            }
            ListingError::TemplateNotFoundError { product_type, .. } => {
                format!("No listing template exists for '{}'", product_type)
            }
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check the API key, endpoint and network connectivity, then retry"
            }
            ErrorCategory::Configuration => {
                "Fix the configuration file or export the missing environment variables"
            }
            ErrorCategory::Data => "Check the source sheet headers and cell contents",
            ErrorCategory::Storage => "Check that the workbook directory exists and is writable",
            ErrorCategory::Processing => {
                "Add a template under the templates directory or fix the product type"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ListingError>;
