pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::llm::{ChatClient, ChatClientConfig, Provider};
pub use adapters::storage::LocalStorage;
pub use adapters::templates::TemplateStore;
pub use adapters::workbook::CsvWorkbook;
pub use app::pipelines::{DescribePipeline, ListingPipeline, VerifyPipeline};
pub use config::ListingConfig;
pub use core::etl::EtlEngine;
pub use utils::error::{ListingError, Result};
