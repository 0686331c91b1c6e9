use clap::Parser;
use zip_enricher::domain::ports::ConfigProvider;
use zip_enricher::utils::error::ErrorSeverity;
use zip_enricher::utils::{logger, validation::Validate};
use zip_enricher::{
    open_provider, EnrichmentPipeline, EtlEngine, LocalStorage, TomlConfig, ZipLookup,
};

#[derive(Parser)]
#[command(name = "toml-enrich")]
#[command(about = "Zip code enrichment driven by a TOML job file")]
struct Args {
    /// Path to TOML job file
    #[arg(short, long, default_value = "enrich-job.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override worker count from config
    #[arg(long)]
    workers: Option<usize>,

    /// Open the dataset and print the plan without enriching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load job file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting job '{}' from {}", config.job.name, args.config);

    // 應用命令列覆蓋設定
    if let Some(workers) = args.workers {
        config.enrich.workers = Some(workers);
        tracing::info!("🔧 Workers overridden to: {}", workers);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    let provider = match open_provider(&config.dataset).await {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("❌ Could not open reference dataset: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        println!("🔍 Dry run: dataset '{}' opened, nothing enriched", provider.name());
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = EnrichmentPipeline::new(LocalStorage::default(), config, provider);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Job completed successfully!");
            println!("✅ Job completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Job failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Job Summary:");
    println!("  Job: {}", config.job.name);
    if let Some(description) = &config.job.description {
        println!("  Description: {}", description);
    }

    let dataset = &config.dataset;
    if dataset.builtin {
        println!("  Dataset: builtin zipcodes");
    } else if let Some(path) = &dataset.path {
        println!("  Dataset: {}", path);
        if let Some(url) = &dataset.url {
            println!("  Download From: {}", url);
        }
    }

    println!("  Input: {}", config.input_path());
    println!("  Mode: {}", config.lookup_mode());
    if let Some(limit) = config.result_limit() {
        println!("  Result Limit: {}", limit);
    }
    println!("  Workers: {}", config.workers());
    println!("  Fill Missing: {}", config.fill_missing());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if config.compress_output() {
        println!("  Compression: enabled (ZIP)");
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
