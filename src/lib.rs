pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{
    dataset::ReferenceDataset, fetcher::DatasetFetcher, open_provider, storage::LocalStorage,
    zipcodes_provider::ZipcodesProvider,
};
pub use config::{toml_config::TomlConfig, DatasetSettings};
pub use core::{
    enricher::ZipCodeEnricher,
    etl::EtlEngine,
    pipeline::EnrichmentPipeline,
    summary::{AreaSummary, MetricSummary},
};
pub use domain::model::{Address, LookupMode, ZipRecord};
pub use domain::ports::ZipLookup;
pub use utils::error::{EnrichError, Result};
