// Adapters layer: concrete implementations for external systems (files, workbook tabs, chat API)

pub mod llm;
pub mod storage;
pub mod templates;
pub mod workbook;
