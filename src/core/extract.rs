//! Pulls `**Field Name:** value` pairs out of a free-form model reply.

use crate::domain::model::{ExtractedFields, Template, NOT_AVAILABLE};
use crate::utils::text::preview;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

pub const TITLE: &str = "Title (Titolo)";
pub const SUBTITLE: &str = "Subtitle (Sottotitolo)";
pub const SHORT_DESCRIPTION: &str = "Short Description (Breve Descrizione)";
pub const DESCRIPTION: &str = "Description (Descrizione)";

pub const HEADLINE_FIELDS: [&str; 4] = [TITLE, SUBTITLE, SHORT_DESCRIPTION, DESCRIPTION];

pub const MAX_TITLE_CHARS: usize = 80;
pub const MAX_SUBTITLE_CHARS: usize = 55;

/// Multi-line value after `**field:**`, up to the next blank line followed by `**`.
pub fn extract_headline(raw: &str, field: &str) -> Option<String> {
    let marker = format!("**{}:**", field);
    let start = raw.find(&marker)? + marker.len();
    let after = &raw[start..];
    let rest = after.trim_start();

    // 空值：下一個欄位標記緊接在後
    let gap = &after[..after.len() - rest.len()];
    let blank_line = gap.matches('\n').count() >= 2;
    if rest.starts_with("**") && (blank_line || starts_with_headline_marker(rest)) {
        return None;
    }
    let first = rest.chars().next()?;

    // 值至少一個字元，之後遇到 "\n\n**" 就結束
    let skip = first.len_utf8();
    let end = rest[skip..]
        .find("\n\n**")
        .map(|i| i + skip)
        .unwrap_or(rest.len());
    let value = rest[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn starts_with_headline_marker(text: &str) -> bool {
    HEADLINE_FIELDS
        .iter()
        .any(|field| text.starts_with(&format!("**{}:**", field)))
}

static LINE_PATTERNS: LazyLock<Mutex<HashMap<String, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Compiled once per field name and reused across replies.
fn line_pattern(field: &str) -> Option<Regex> {
    let mut patterns = LINE_PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(re) = patterns.get(field) {
        return Some(re.clone());
    }
    let pattern = format!(r"\*\*{}:\*\*[ \t]*(.*)$", regex::escape(field));
    match RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
    {
        Ok(re) => {
            patterns.insert(field.to_string(), re.clone());
            Some(re)
        }
        Err(e) => {
            tracing::error!("❌ Cannot build pattern for field '{}': {}", field, e);
            None
        }
    }
}

/// Value on the same line as `**field:**`, matched case-insensitively.
pub fn extract_line_field(raw: &str, field: &str) -> Option<String> {
    let re = line_pattern(field)?;
    let value = re.captures(raw)?.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub fn extract_fields(raw: &str, template: &Template) -> ExtractedFields {
    tracing::debug!("Raw response to extract: {}", preview(raw, 500));
    let mut fields = ExtractedFields::new();

    for field in HEADLINE_FIELDS {
        match extract_headline(raw, field) {
            Some(value) => {
                tracing::debug!("Extracted {}: {}", field, preview(&value, 100));
                fields.insert(field, value);
            }
            None => tracing::debug!("Failed to extract {}", field),
        }
    }

    for field in template.all_fields() {
        if fields.contains(field) {
            continue;
        }
        match extract_line_field(raw, field) {
            Some(value) => fields.insert(field.as_str(), value),
            None => {
                tracing::debug!("Field '{}' not found in API response", field);
                fields.insert(field.as_str(), NOT_AVAILABLE);
            }
        }
    }

    fields
}

fn cut_at(value: &mut String, marker: &str) -> bool {
    match value.find(marker) {
        Some(index) => {
            value.truncate(index);
            let trimmed = value.trim_end().len();
            value.truncate(trimmed);
            true
        }
        None => false,
    }
}

/// Removes text of the next headline field that leaked into title or subtitle.
pub fn strip_bleed(fields: &mut ExtractedFields) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(title) = fields.get_mut(TITLE) {
        if cut_at(title, "**Subtitle") {
            warnings.push("Title contained Subtitle content".to_string());
        }
        if cut_at(title, "**Short Description") {
            warnings.push("Title contained Short Description content".to_string());
        }
    }
    if let Some(subtitle) = fields.get_mut(SUBTITLE) {
        if cut_at(subtitle, "**Short Description") {
            warnings.push("Subtitle contained Short Description content".to_string());
        }
    }
    warnings
}

pub fn append_size(fields: &mut ExtractedFields, size_info: &str) {
    let size_info = size_info.trim();
    if size_info.is_empty() {
        return;
    }
    if let Some(title) = fields.get_mut(TITLE) {
        title.push(' ');
        title.push_str(size_info);
    }
}

pub fn length_warnings(fields: &ExtractedFields) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(title) = fields.get(TITLE) {
        let len = title.chars().count();
        if len > MAX_TITLE_CHARS {
            warnings.push(format!("Title is too long: {} characters", len));
        }
    }
    if let Some(subtitle) = fields.get(SUBTITLE) {
        let len = subtitle.chars().count();
        if len > MAX_SUBTITLE_CHARS {
            warnings.push(format!("Subtitle is too long: {} characters", len));
        }
    }
    warnings
}

/// Bleed cleanup, size suffix, then length checks. Returns the warnings raised.
pub fn finalize_fields(fields: &mut ExtractedFields, size_info: &str) -> Vec<String> {
    let mut warnings = strip_bleed(fields);
    append_size(fields, size_info);
    warnings.extend(length_warnings(fields));
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    warnings
}
