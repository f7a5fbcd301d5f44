use crate::domain::model::{
    ContentVerification, ObjectiveCheck, VerificationResult, VerificationStatus, NOT_AVAILABLE,
};
use crate::utils::error::{ListingError, Result};
use std::collections::HashMap;

pub const OBJECTIVE_FIELDS: [&str; 4] = ["Color", "Style", "Type", "Upper Material"];

pub const VERIFICATION_HEADER: [&str; 10] = [
    "Internal Reference",
    "Brand",
    "Style Number",
    "Product Type",
    "Overall Status",
    "Title Check",
    "Description Check",
    "Objective Fields Check",
    "Issues Found",
    "Suggestions",
];

/// `Color` matches `Color` and the bilingual `Color (Colore)`.
pub fn header_matches(header: &str, name: &str) -> bool {
    let header = header.trim().to_lowercase();
    let name = name.trim().to_lowercase();
    header == name || header.starts_with(&format!("{} (", name))
}

pub type ListingRecord = HashMap<String, String>;

pub fn field_value<'a>(record: &'a ListingRecord, name: &str) -> Option<&'a str> {
    record
        .get(name)
        .or_else(|| {
            record
                .iter()
                .find(|(header, _)| header_matches(header, name))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

/// Picks the row of a category tab that holds this product's listing:
/// the one with a matching `Internal Reference`, else the last data row.
pub fn listing_record(values: &[Vec<String>], internal_reference: &str) -> Option<ListingRecord> {
    let (header, rows) = values.split_first()?;
    if rows.is_empty() {
        return None;
    }

    let reference_column = header
        .iter()
        .position(|h| header_matches(h, "Internal Reference"));
    let matched = match (reference_column, internal_reference.trim()) {
        (Some(column), reference) if !reference.is_empty() => rows
            .iter()
            .rev()
            .find(|row| row.get(column).map(|c| c.trim()) == Some(reference)),
        _ => None,
    };
    let row = matched.or_else(|| rows.last())?;

    Some(
        header
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
            .collect(),
    )
}

pub fn objective_checks(record: &ListingRecord) -> Vec<(String, ObjectiveCheck)> {
    OBJECTIVE_FIELDS
        .iter()
        .map(|&field| {
            let present = field_value(record, field)
                .map(str::trim)
                .is_some_and(|v| !v.is_empty() && v != NOT_AVAILABLE);
            let check = ObjectiveCheck {
                is_valid: present,
                message: if present {
                    "Valid".to_string()
                } else {
                    format!("{} is missing", field)
                },
            };
            (field.to_string(), check)
        })
        .collect()
}

/// Parses the JSON document out of a reply that may wrap it in fences or prose.
pub fn parse_verification(content: &str) -> Result<ContentVerification> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if end > start => &content[start..=end],
        _ => {
            return Err(ListingError::InvalidResponseError {
                message: "verification reply contains no JSON object".to_string(),
            })
        }
    };
    Ok(serde_json::from_str(json)?)
}

pub fn overall_status(
    objective: &[(String, ObjectiveCheck)],
    content: Option<&ContentVerification>,
) -> VerificationStatus {
    let Some(content) = content else {
        return VerificationStatus::Error;
    };
    let all_objective = objective.iter().all(|(_, check)| check.is_valid);
    if all_objective && content.title_check.is_valid && content.description_check.is_valid {
        VerificationStatus::Pass
    } else {
        VerificationStatus::Fail
    }
}

pub fn result_row(result: &VerificationResult) -> Result<Vec<String>> {
    let objective: serde_json::Map<String, serde_json::Value> = result
        .objective_checks
        .iter()
        .map(|(field, check)| Ok((field.clone(), serde_json::to_value(check)?)))
        .collect::<Result<_>>()?;

    let (title, description, issues, suggestions) = match &result.content {
        Some(content) => {
            let issues: Vec<&String> = content
                .title_check
                .issues
                .iter()
                .chain(content.description_check.issues.iter())
                .collect();
            (
                serde_json::to_string(&content.title_check)?,
                serde_json::to_string(&content.description_check)?,
                serde_json::to_string(&issues)?,
                serde_json::to_string(&content.suggestions)?,
            )
        }
        None => (
            String::new(),
            String::new(),
            serde_json::to_string(&[result.error.clone().unwrap_or_default()])?,
            "[]".to_string(),
        ),
    };

    Ok(vec![
        result.product.internal_reference.clone(),
        result.product.brand.clone(),
        result.product.style_number.clone(),
        result.product.product_type.clone(),
        result.status.to_string(),
        title,
        description,
        serde_json::to_string(&objective)?,
        issues,
        suggestions,
    ])
}
