use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const NOT_AVAILABLE: &str = "N/A";

/// One product row read from the source sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    /// 1-based row number in the source sheet
    pub row_number: usize,
    pub product_type: String,
    pub brand: String,
    pub style_number: String,
    pub additional_info: String,
    pub size_info: String,
    pub internal_reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row_number: usize,
    pub reason: String,
}

/// A source sheet row as handed from extract to transform.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRow {
    Product(ProductRow),
    Incomplete(SkippedRow),
}

/// Mandatory and optional field names for one product category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub mandatory_fields: Vec<String>,
    #[serde(default)]
    pub optional_fields: Vec<String>,
}

impl Template {
    pub fn all_fields(&self) -> impl Iterator<Item = &String> {
        self.mandatory_fields.iter().chain(self.optional_fields.iter())
    }
}

/// Field name to value, as parsed out of a model reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFields {
    values: HashMap<String, String>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut String> {
        self.values.get_mut(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }

    /// 以 `other` 覆蓋；但 N/A 不會蓋掉已有的真實值
    pub fn merge(mut self, other: ExtractedFields) -> Self {
        for (field, value) in other.values {
            let keep_existing = value == NOT_AVAILABLE
                && self
                    .values
                    .get(&field)
                    .is_some_and(|existing| existing != NOT_AVAILABLE);
            if !keep_existing {
                self.values.insert(field, value);
            }
        }
        self
    }
}

/// A generated listing ready to be written to its category tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub sheet_name: String,
    pub product: ProductRow,
    pub template: Template,
    pub fields: ExtractedFields,
    pub warnings: Vec<String>,
    /// Raw API payloads, kept only when response saving is enabled
    #[serde(skip)]
    pub raw_responses: Vec<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct TransformResult<T> {
    pub processed: Vec<T>,
    pub skipped: Vec<SkippedRow>,
}

impl<T> TransformResult<T> {
    pub fn new() -> Self {
        Self {
            processed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn skip(&mut self, row_number: usize, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("⏭️ Skipping row {}: {}", row_number, reason);
        self.skipped.push(SkippedRow { row_number, reason });
    }
}

impl<T> Default for TransformResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(ChatMessage {
                role: Role::System,
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: Role::User,
            content: self.prompt.clone(),
        });
        messages
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: Option<String>,
    pub usage: Option<Usage>,
    pub citations: Vec<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveCheck {
    pub is_valid: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleCheck {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub contains_brand: bool,
    #[serde(default)]
    pub appropriate_length: bool,
    #[serde(default)]
    pub keyword_optimization: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptionCheck {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub completeness: bool,
    #[serde(default)]
    pub accuracy: bool,
    #[serde(default)]
    pub formatting: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentVerification {
    #[serde(default)]
    pub title_check: TitleCheck,
    #[serde(default)]
    pub description_check: DescriptionCheck,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Pass,
    Fail,
    Error,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            VerificationStatus::Pass => "Pass",
            VerificationStatus::Fail => "Fail",
            VerificationStatus::Error => "Error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub product: ProductRow,
    pub status: VerificationStatus,
    pub objective_checks: Vec<(String, ObjectiveCheck)>,
    pub content: Option<ContentVerification>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_real_values_over_na() {
        let mut description = ExtractedFields::new();
        description.insert("Title (Titolo)", "Gucci Ace Sneakers");
        description.insert("Color (Colore)", "White");

        let mut fields = ExtractedFields::new();
        fields.insert("Color (Colore)", NOT_AVAILABLE);
        fields.insert("Upper Material (Materiale Tomaia)", "Leather");

        let merged = description.merge(fields);
        assert_eq!(merged.get("Title (Titolo)"), Some("Gucci Ace Sneakers"));
        assert_eq!(merged.get("Color (Colore)"), Some("White"));
        assert_eq!(
            merged.get("Upper Material (Materiale Tomaia)"),
            Some("Leather")
        );
    }

    #[test]
    fn test_merge_overrides_with_newer_real_value() {
        let mut first = ExtractedFields::new();
        first.insert("Style (Stile)", NOT_AVAILABLE);
        let mut second = ExtractedFields::new();
        second.insert("Style (Stile)", "Low-top");

        let merged = first.merge(second);
        assert_eq!(merged.get("Style (Stile)"), Some("Low-top"));
    }

    #[test]
    fn test_request_messages_include_system_prompt_first() {
        let request = CompletionRequest::new("Describe it", 0.3).with_system("You are an expert");
        let messages = request.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "Describe it");

        let bare = CompletionRequest::new("Describe it", 0.3);
        assert_eq!(bare.messages().len(), 1);
    }
}
