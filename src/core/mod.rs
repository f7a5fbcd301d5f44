pub mod columns;
pub mod etl;
pub mod extract;
pub mod markdown;
pub mod prompt;
pub mod range;
pub mod table;
pub mod verify;

pub use crate::domain::model::{Listing, ProductRow, Template, TransformResult};
pub use crate::domain::ports::{CompletionClient, Pipeline, Storage, Workbook};
pub use crate::utils::error::Result;
