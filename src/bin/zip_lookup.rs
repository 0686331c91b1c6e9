use clap::Parser;
use zip_enricher::utils::logger;
use zip_enricher::{open_provider, AreaSummary, DatasetSettings, EnrichError, ZipCodeEnricher};

const EXIT_NOT_FOUND: i32 = 4;

#[derive(Parser)]
#[command(name = "zip-lookup")]
#[command(about = "Look up one zip code, or every zip code of a city/state pair")]
struct Args {
    /// Zip code to look up, passed to the dataset as-is
    #[arg(long, conflicts_with_all = ["city", "state"])]
    zip: Option<String>,

    #[arg(long, requires = "state")]
    city: Option<String>,

    #[arg(long, requires = "city")]
    state: Option<String>,

    /// Maximum zip codes returned for a city/state pair
    #[arg(long)]
    limit: Option<usize>,

    /// Print count/mean/std/min/max per metric instead of the records
    #[arg(long, requires = "city")]
    summary: bool,

    /// Reference dataset (.csv or .zip)
    #[arg(long)]
    dataset: Option<String>,

    #[arg(long)]
    dataset_url: Option<String>,

    #[arg(long)]
    archive_entry: Option<String>,

    /// Use the bundled zipcodes dataset (city names only)
    #[arg(long)]
    builtin: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn dataset_settings(&self) -> DatasetSettings {
        DatasetSettings {
            path: self.dataset.clone(),
            url: self.dataset_url.clone(),
            archive_entry: self.archive_entry.clone(),
            builtin: self.builtin,
        }
    }
}

fn fail(e: &EnrichError) -> ! {
    tracing::debug!("lookup failed: {:?}", e);
    eprintln!("❌ {}", e.user_friendly_message());
    if e.is_not_found() {
        std::process::exit(EXIT_NOT_FOUND);
    }
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let settings = args.dataset_settings();
    if let Err(e) = settings.validate("dataset") {
        fail(&e);
    }

    let provider = open_provider(&settings).await.unwrap_or_else(|e| fail(&e));
    let enricher = ZipCodeEnricher::new(provider);

    let output = match (&args.zip, &args.city, &args.state) {
        (Some(zip), _, _) => {
            let record = enricher.enrich(zip).unwrap_or_else(|e| fail(&e));
            serde_json::to_string_pretty(&record)?
        }
        (None, Some(city), Some(state)) => {
            let records = enricher
                .by_city_state(city, state, args.limit)
                .unwrap_or_else(|e| fail(&e));
            if args.summary {
                serde_json::to_string_pretty(&AreaSummary::new(city, state, &records))?
            } else {
                serde_json::to_string_pretty(&records)?
            }
        }
        _ => {
            eprintln!("❌ Pass --zip, or --city together with --state");
            std::process::exit(2);
        }
    };

    println!("{}", output);
    Ok(())
}
