use crate::domain::model::{Completion, CompletionRequest, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Range-addressed access to a spreadsheet made of named tabs.
pub trait Workbook: Send + Sync {
    fn get_values(
        &self,
        range: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Vec<String>>>> + Send;
    /// Returns the number of updated cells.
    fn update_values(
        &self,
        range: &str,
        values: &[Vec<String>],
    ) -> impl std::future::Future<Output = Result<usize>> + Send;
    /// Returns `true` when the tab had to be created.
    fn ensure_sheet(&self, name: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    fn sheet_exists(&self, name: &str) -> impl std::future::Future<Output = bool> + Send;
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Item: Send + 'static;
    type Output: Send + 'static;

    async fn extract(&self) -> Result<Vec<Self::Item>>;
    async fn transform(&self, data: Vec<Self::Item>) -> Result<TransformResult<Self::Output>>;
    async fn load(&self, result: TransformResult<Self::Output>) -> Result<String>;
}
