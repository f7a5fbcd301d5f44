use crate::domain::model::Template;
use crate::domain::ports::Storage;
use crate::utils::error::{ListingError, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// `Men's Sneakers` -> `men's_sneakers`; path separators become `_` so the
/// file always stays inside the template root.
pub fn template_key(product_type: &str) -> String {
    product_type
        .trim()
        .to_lowercase()
        .replace([' ', '/', '\\'], "_")
}

pub fn template_file(product_type: &str) -> String {
    format!("{}_template.json", template_key(product_type))
}

/// Category tab that receives listings of this product type.
pub fn category_sheet_name(product_type: &str) -> String {
    product_type.trim().to_lowercase()
}

/// Loads `<key>_template.json` files from a storage root, cached per run.
pub struct TemplateStore<S: Storage> {
    storage: S,
    cache: Mutex<HashMap<String, Template>>,
}

impl<S: Storage> TemplateStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load(&self, product_type: &str) -> Result<Template> {
        if product_type.trim().is_empty() {
            return Err(ListingError::ValidationError {
                message: "Product type is empty".to_string(),
            });
        }

        let key = template_key(product_type);
        if let Some(template) = self.cache.lock().await.get(&key) {
            return Ok(template.clone());
        }

        let file = template_file(product_type);
        tracing::debug!("📄 Loading template file: {}", file);
        if !self.storage.exists(&file).await {
            return Err(ListingError::TemplateNotFoundError {
                product_type: product_type.to_string(),
                path: file,
            });
        }

        let bytes = self.storage.read_file(&file).await?;
        let template: Template =
            serde_json::from_slice(&bytes).map_err(|e| ListingError::TemplateError {
                path: file.clone(),
                message: e.to_string(),
            })?;

        if template.mandatory_fields.is_empty() && template.optional_fields.is_empty() {
            tracing::warn!("Template {} declares no fields", file);
        }

        self.cache.lock().await.insert(key, template.clone());
        Ok(template)
    }
}
