use anyhow::Result;
use listing_etl::utils::validation::Validate;
use listing_etl::{ListingConfig, LocalStorage, Provider, TemplateStore};
use std::time::Duration;

const SAMPLE_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/listing-etl.toml");
const SAMPLE_TEMPLATES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");

#[test]
fn test_sample_config_parses_and_validates() -> Result<()> {
    std::env::set_var("PERPLEXITY_API_KEY", "pplx-sample");
    let config = ListingConfig::from_file(SAMPLE_CONFIG)?;

    assert_eq!(config.job.name, "luxury-listings");
    assert_eq!(config.provider.kind, Provider::Perplexity);
    assert_eq!(config.provider.api_key, "pplx-sample");
    assert_eq!(config.columns.size, vec!["Size", "Taglia"]);
    assert!(config.generation.html_description);
    assert_eq!(config.describe_column()?, 3);
    assert!(!config.monitoring_enabled());

    let retry = config.retry_policy();
    assert_eq!(retry.attempts, 3);
    assert_eq!(retry.base_delay, Duration::from_millis(1000));

    let client = config.chat_client_config();
    assert_eq!(client.model, "sonar-pro");
    assert_eq!(client.max_tokens, 2000);

    config.validate()?;
    Ok(())
}

#[test]
fn test_archive_without_zip_suffix_fails_validation() -> Result<()> {
    std::env::set_var("PERPLEXITY_API_KEY", "pplx-sample");
    let content = std::fs::read_to_string(SAMPLE_CONFIG)?
        .replace("enabled = false\nfilename = \"listing_run.zip\"", "enabled = true\nfilename = \"listing_run.tar\"");
    let config = ListingConfig::from_toml_str(&content)?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn test_sample_template_loads() {
    let store = TemplateStore::new(LocalStorage::new(SAMPLE_TEMPLATES));
    let template = tokio_test::block_on(store.load("Sneakers")).expect("sneakers template");

    assert!(template
        .mandatory_fields
        .iter()
        .any(|f| f == "Upper Material (Materiale Tomaia)"));
    assert_eq!(template.all_fields().count(), 9);
    assert!(tokio_test::block_on(store.load("Handbags")).is_err());
}
