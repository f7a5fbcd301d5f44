use httpmock::prelude::*;
use listing_etl::core::Workbook;
use listing_etl::{
    ChatClient, CsvWorkbook, EtlEngine, ListingConfig, ListingPipeline, LocalStorage,
    TemplateStore,
};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

const DESCRIPTION_REPLY: &str = "**Title (Titolo):** Gucci Ace Leather Sneakers White\n\n\
**Subtitle (Sottotitolo):** Embroidered bee, Italian craft\n\n\
**Short Description (Breve Descrizione):** Low-top sneakers in white leather.\n\n\
**Description (Descrizione):**\n\
• **Leather** upper with web stripe [1]\n\
• Rubber sole\n\
• 14-day returns under EU rules";

const FIELDS_REPLY: &str = "**Color (Colore):** White\n\
**Upper Material (Materiale Tomaia):** Calfskin leather\n\
**Style (Stile):** N/A";

fn chat_reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "cmpl-1",
        "model": "test-model",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 80, "total_tokens": 200 }
    })
}

fn write_fixture(root: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(root.join("workbook"))?;
    std::fs::create_dir_all(root.join("templates"))?;
    std::fs::write(
        root.join("workbook/Sheet1.csv"),
        "Internal Reference,Brand,Product Type,Style Number,Additional Information,Size\n\
         REF-1,Gucci,Sneakers,429445,white leather,42\n\
         REF-2,Prada,Belts,2CM,,\n\
         REF-3,,Sneakers,777,,\n",
    )?;
    std::fs::write(
        root.join("templates/sneakers_template.json"),
        r#"{
  "mandatory_fields": ["Color (Colore)", "Style (Stile)"],
  "optional_fields": ["Upper Material (Materiale Tomaia)"]
}"#,
    )?;
    Ok(())
}

fn config_for(root: &Path, endpoint: &str, archive: bool) -> anyhow::Result<ListingConfig> {
    let content = format!(
        r#"
[job]
name = "integration"

[workbook]
path = "{root}/workbook"

[provider]
kind = "perplexity"
api_key = "pplx-test"
endpoint = "{endpoint}"
model = "test-model"
retry_attempts = 1
retry_delay_ms = 1

[templates]
dir = "{root}/templates"

[generation]
rate_limit_ms = 0
html_description = true

[load]
output_path = "{root}/output"
save_responses = true

[load.archive]
enabled = {archive}
filename = "run.zip"
"#,
        root = root.display(),
        endpoint = endpoint,
        archive = archive
    );
    Ok(ListingConfig::from_toml_str(&content)?)
}

fn build_pipeline(
    config: ListingConfig,
) -> anyhow::Result<ListingPipeline<CsvWorkbook<LocalStorage>, LocalStorage, ChatClient>> {
    let client = ChatClient::new(config.chat_client_config())?;
    Ok(ListingPipeline::new(
        CsvWorkbook::new(LocalStorage::new(&config.workbook.path)),
        TemplateStore::new(LocalStorage::new(&config.templates.dir)),
        LocalStorage::new(&config.load.output_path),
        client,
        config,
    ))
}

#[tokio::test]
async fn test_generate_end_to_end_with_mock_api() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_fixture(temp_dir.path())?;

    let server = MockServer::start();
    let description_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .header("authorization", "Bearer pplx-test")
            .body_contains("Generate a detailed product description");
        then.status(200).json_body(chat_reply(DESCRIPTION_REPLY));
    });
    let fields_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_contains("provide information for the following fields");
        then.status(200).json_body(chat_reply(FIELDS_REPLY));
    });

    let config = config_for(temp_dir.path(), &server.url("/chat/completions"), false)?;
    let engine = EtlEngine::new_with_monitoring(build_pipeline(config)?, true);
    let output = engine.run().await?;

    // 只有 REF-1 有模板且資料完整
    description_mock.assert_hits(1);
    fields_mock.assert_hits(1);
    assert!(output.ends_with("output/run_report.json"));

    let workbook = CsvWorkbook::new(LocalStorage::new(temp_dir.path().join("workbook")));
    let tab = workbook.get_values("sneakers").await?;
    assert_eq!(tab.len(), 2);

    let header = &tab[0];
    let cell = |name: &str| -> String {
        let index = header.iter().position(|h| h == name).expect("column present");
        tab[1].get(index).cloned().unwrap_or_default()
    };
    assert_eq!(cell("Internal Reference"), "REF-1");
    assert_eq!(cell("Title (Titolo)"), "Gucci Ace Leather Sneakers White Size 42");
    assert_eq!(cell("Color (Colore)"), "White");
    assert_eq!(cell("Style (Stile)"), "N/A");
    assert_eq!(cell("Upper Material (Materiale Tomaia)"), "Calfskin leather");
    assert!(cell("Description (Descrizione)").starts_with("<ul>\n<li><strong>Leather</strong> upper with web stripe</li>"));

    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join("output/run_report.json"))?)?;
    assert_eq!(report["command"], "generate");
    assert_eq!(report["processed"], 1);
    let reasons: Vec<&str> = report["skipped"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["reason"].as_str())
        .collect();
    assert_eq!(reasons.len(), 2);
    assert!(reasons.contains(&"missing brand"));
    assert!(reasons.iter().any(|r| r.contains("belts")));

    let saved = std::fs::read_dir(temp_dir.path().join("output/responses"))?.count();
    assert_eq!(saved, 2);

    assert_eq!(engine.summary().map(|s| s.phases.len()), Some(3));
    Ok(())
}

#[tokio::test]
async fn test_generate_appends_to_existing_tab_and_archives() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_fixture(temp_dir.path())?;
    std::fs::write(
        temp_dir.path().join("workbook/sneakers.csv"),
        "Internal Reference,Style Number,Brand,Title (Titolo),Notes\nOLD-1,111,Gucci,Old title,keep me\n",
    )?;

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).body_contains("Generate a detailed product description");
        then.status(200).json_body(chat_reply(DESCRIPTION_REPLY));
    });
    server.mock(|when, then| {
        when.method(POST).body_contains("provide information for the following fields");
        then.status(200).json_body(chat_reply(FIELDS_REPLY));
    });

    let config = config_for(temp_dir.path(), &server.url("/chat/completions"), true)?;
    let output = EtlEngine::new(build_pipeline(config)?).run().await?;
    assert!(output.ends_with("output/run.zip"));

    let workbook = CsvWorkbook::new(LocalStorage::new(temp_dir.path().join("workbook")));
    let tab = workbook.get_values("sneakers").await?;
    assert_eq!(tab.len(), 3);
    assert_eq!(tab[0][4], "Notes");
    assert_eq!(tab[1][4], "keep me");
    assert_eq!(tab[2][0], "REF-1");

    let mut archive = zip::ZipArchive::new(std::fs::File::open(temp_dir.path().join("output/run.zip"))?)?;
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["run_report.json", "sneakers.csv"]);

    let mut csv = String::new();
    archive.by_name("sneakers.csv")?.read_to_string(&mut csv)?;
    assert!(csv.contains("OLD-1"));
    assert!(csv.contains("REF-1"));
    Ok(())
}

#[tokio::test]
async fn test_generate_skips_row_when_api_keeps_failing() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    write_fixture(temp_dir.path())?;

    let server = MockServer::start();
    let failing = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(500).body("upstream exploded");
    });

    let config = config_for(temp_dir.path(), &server.url("/chat/completions"), false)?;
    EtlEngine::new(build_pipeline(config)?).run().await?;

    // 兩次嘗試，每次描述請求即失敗
    failing.assert_hits(2);
    let workbook = CsvWorkbook::new(LocalStorage::new(temp_dir.path().join("workbook")));
    assert!(!workbook.sheet_exists("sneakers").await);

    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join("output/run_report.json"))?)?;
    assert_eq!(report["processed"], 0);
    assert_eq!(report["skipped"].as_array().map(Vec::len), Some(3));
    Ok(())
}
