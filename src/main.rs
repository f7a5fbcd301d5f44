use clap::Parser;
use listing_etl::app::pipelines::read_source;
use listing_etl::config::cli::{Cli, Command, LogFormat};
use listing_etl::core::Pipeline;
use listing_etl::domain::model::SourceRow;
use listing_etl::utils::error::ErrorSeverity;
use listing_etl::utils::{logger, validation::Validate};
use listing_etl::{
    ChatClient, CsvWorkbook, DescribePipeline, EtlEngine, ListingConfig, ListingPipeline,
    LocalStorage, TemplateStore, VerifyPipeline,
};
use std::collections::BTreeMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 初始化日誌
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("🚀 Starting listing-etl {}", cli.command.name());
    tracing::info!("📁 Loading configuration from: {}", cli.config);

    // 載入 TOML 配置
    let mut config = match ListingConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    let dry_run = match &cli.command {
        Command::Generate { dry_run, max_rows } => {
            if let Some(max_rows) = *max_rows {
                config.generation.max_rows = Some(max_rows);
                tracing::info!("🔧 Max rows overridden to: {}", max_rows);
            }
            *dry_run
        }
        _ => false,
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    // 顯示配置摘要
    display_config_summary(&config, &cli.command, dry_run);

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - No API calls will be made");
        perform_dry_run(&config).await?;
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = cli.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = run_command(&cli.command, config, monitor_enabled).await;

    match result {
        Ok(output_path) => {
            tracing::info!("✅ {} completed successfully!", cli.command.name());
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ {} completed successfully!", cli.command.name());
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
                cli.command.name(),
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,      // 警告，但成功
                ErrorSeverity::Medium => 2,   // 重試錯誤
                ErrorSeverity::High => 1,     // 處理錯誤
                ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run_command(
    command: &Command,
    config: ListingConfig,
    monitor_enabled: bool,
) -> listing_etl::Result<String> {
    let client = ChatClient::new(config.chat_client_config())?;
    let workbook = CsvWorkbook::new(LocalStorage::new(&config.workbook.path));
    let output = LocalStorage::new(&config.load.output_path);

    match command {
        Command::Generate { .. } => {
            let templates = TemplateStore::new(LocalStorage::new(&config.templates.dir));
            let pipeline = ListingPipeline::new(workbook, templates, output, client, config);
            run_pipeline(pipeline, monitor_enabled).await
        }
        Command::Verify => {
            let pipeline = VerifyPipeline::new(workbook, output, client, config);
            run_pipeline(pipeline, monitor_enabled).await
        }
        Command::Describe => {
            let pipeline = DescribePipeline::new(workbook, output, client, config)?;
            run_pipeline(pipeline, monitor_enabled).await
        }
    }
}

async fn run_pipeline<P: Pipeline>(pipeline: P, monitor_enabled: bool) -> listing_etl::Result<String> {
    // 創建 ETL 引擎並運行
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);
    engine.run().await
}

fn display_config_summary(config: &ListingConfig, command: &Command, dry_run: bool) {
    let client = config.chat_client_config();
    println!("📋 Configuration Summary:");
    println!("  Job: {}", config.job.name);
    println!("  Command: {}", command.name());
    println!("  Workbook: {}", config.workbook.path);
    println!("  Source: {}", config.workbook.source_range);
    println!("  Provider: {} ({})", client.provider, client.model);
    println!("  Endpoint: {}", client.endpoint);

    match command {
        Command::Generate { .. } => {
            println!("  Templates: {}", config.templates.dir);
            println!("  Attempts per row: {}", config.generation.max_attempts);
            println!("  Single Call: {}", config.generation.single_call);
            if let Some(max_rows) = config.generation.max_rows {
                println!("  Max Rows: {}", max_rows);
            }
            println!("  HTML Description: {}", config.generation.html_description);
        }
        Command::Verify => println!("  Verification Tab: {}", config.verification.sheet),
        Command::Describe => println!("  Description Column: {}", config.describe.column),
    }
    println!("  Output: {}", config.load.output_path);

    if dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &ListingConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let workbook = CsvWorkbook::new(LocalStorage::new(&config.workbook.path));
    let templates = TemplateStore::new(LocalStorage::new(&config.templates.dir));
    let rows = read_source(
        &workbook,
        &config.source_range()?,
        &config.columns,
        config.generation.require_internal_reference,
        config.generation.max_rows,
    )
    .await?;

    let mut per_sheet: BTreeMap<String, usize> = BTreeMap::new();
    let mut without_template: BTreeMap<String, usize> = BTreeMap::new();
    let mut incomplete = Vec::new();

    for row in rows {
        match row {
            SourceRow::Product(product) => match templates.load(&product.product_type).await {
                Ok(_) => {
                    *per_sheet
                        .entry(listing_etl::adapters::templates::category_sheet_name(
                            &product.product_type,
                        ))
                        .or_default() += 1;
                }
                Err(e) => {
                    tracing::debug!("Template check failed for row {}: {}", product.row_number, e);
                    *without_template.entry(product.product_type).or_default() += 1;
                }
            },
            SourceRow::Incomplete(skipped) => incomplete.push(skipped),
        }
    }

    // 分頁分析
    println!("🗂️ Category Tabs:");
    for (sheet, count) in &per_sheet {
        println!("  {} <- {} rows", sheet, count);
    }
    let ready: usize = per_sheet.values().sum();
    println!("  📊 Rows ready: {}", ready);
    let calls_per_row = if config.generation.single_call { 1 } else { 2 };
    println!(
        "  📡 Expected API calls: {} (before retries)",
        ready * calls_per_row
    );

    if !without_template.is_empty() {
        println!();
        println!("⚠️ Product types without a template:");
        for (product_type, count) in &without_template {
            println!("  {} ({} rows)", product_type, count);
        }
    }

    if !incomplete.is_empty() {
        println!();
        println!("⏭️ Incomplete rows:");
        for skipped in &incomplete {
            println!("  Row {}: {}", skipped.row_number, skipped.reason);
        }
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
