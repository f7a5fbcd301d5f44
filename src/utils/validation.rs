use crate::utils::error::{ListingError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> ListingError {
    ListingError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.trim().is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    // NaN 不在任何範圍內
    if !(min..=max).contains(&value) {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// 金鑰若仍是 `${VAR}` 代表環境變數沒有設定
pub fn validate_secret(field_name: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() || (trimmed.starts_with("${") && trimmed.ends_with('}')) {
        return Err(ListingError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(())
}
