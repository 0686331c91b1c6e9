pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extensions, validate_path, validate_required_field, validate_url,
    DATASET_EXTENSIONS,
};
use serde::{Deserialize, Serialize};

/// Where the reference data comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSettings {
    /// Local CSV or `.zip` file. Also the download target when `url` is set.
    pub path: Option<String>,
    /// Fetched into `path` when that file does not exist yet.
    pub url: Option<String>,
    /// CSV entry to read when `path` is an archive.
    pub archive_entry: Option<String>,
    /// Use the dataset bundled with the `zipcodes` crate instead of a file.
    #[serde(default)]
    pub builtin: bool,
}

impl DatasetSettings {
    pub fn validate(&self, prefix: &str) -> Result<()> {
        if self.builtin {
            return Ok(());
        }

        let path = validate_required_field(&format!("{}.path", prefix), &self.path)?;
        validate_path(&format!("{}.path", prefix), path)?;
        validate_file_extensions(
            &format!("{}.path", prefix),
            std::slice::from_ref(path),
            &DATASET_EXTENSIONS,
        )?;

        if let Some(url) = &self.url {
            validate_url(&format!("{}.url", prefix), url)?;
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use super::DatasetSettings;
    use crate::domain::model::LookupMode;
    use crate::domain::ports::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{
        validate_non_empty_string, validate_output_formats, validate_path,
        validate_positive_number, Validate,
    };
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "zip-enricher")]
    #[command(about = "Enrich address rows with zip code demographics")]
    pub struct CliConfig {
        /// CSV file of addresses to enrich
        #[arg(long)]
        pub input: String,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        /// Reference dataset (.csv or .zip)
        #[arg(long)]
        pub dataset: Option<String>,

        /// Download the dataset from here when --dataset does not exist yet
        #[arg(long)]
        pub dataset_url: Option<String>,

        /// CSV entry inside a zipped dataset
        #[arg(long)]
        pub archive_entry: Option<String>,

        /// Use the bundled zipcodes dataset (city names only)
        #[arg(long)]
        pub builtin: bool,

        /// Resolve rows by "zip" or by "city-state"
        #[arg(long, default_value_t = LookupMode::Zip)]
        pub mode: LookupMode,

        /// Maximum zip codes per city/state pair
        #[arg(long)]
        pub result_limit: Option<usize>,

        #[arg(long, default_value = "1")]
        pub workers: usize,

        /// Write 0 instead of empty cells for missing numbers
        #[arg(long)]
        pub fill_missing: bool,

        #[arg(long, value_delimiter = ',', default_value = "csv")]
        pub output_formats: Vec<String>,

        /// Bundle the outputs into one zip archive
        #[arg(long)]
        pub compress: bool,

        #[arg(long, default_value = "Zip")]
        pub zip_column: String,

        #[arg(long, default_value = "City")]
        pub city_column: String,

        #[arg(long, default_value = "State")]
        pub state_column: String,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log process CPU and memory per phase")]
        pub monitor: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,
    }

    impl CliConfig {
        pub fn dataset_settings(&self) -> DatasetSettings {
            DatasetSettings {
                path: self.dataset.clone(),
                url: self.dataset_url.clone(),
                archive_entry: self.archive_entry.clone(),
                builtin: self.builtin,
            }
        }
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &str {
            &self.input
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn zip_column(&self) -> &str {
            &self.zip_column
        }

        fn city_column(&self) -> &str {
            &self.city_column
        }

        fn state_column(&self) -> &str {
            &self.state_column
        }

        fn lookup_mode(&self) -> LookupMode {
            self.mode
        }

        fn result_limit(&self) -> Option<usize> {
            self.result_limit
        }

        fn workers(&self) -> usize {
            self.workers
        }

        fn fill_missing(&self) -> bool {
            self.fill_missing
        }

        fn output_formats(&self) -> &[String] {
            &self.output_formats
        }

        fn compress_output(&self) -> bool {
            self.compress
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_path("input", &self.input)?;
            validate_path("output_path", &self.output_path)?;
            validate_positive_number("workers", self.workers, 1)?;
            if let Some(limit) = self.result_limit {
                validate_positive_number("result_limit", limit, 1)?;
            }
            validate_output_formats("output_formats", &self.output_formats)?;
            validate_non_empty_string("zip_column", &self.zip_column)?;
            validate_non_empty_string("city_column", &self.city_column)?;
            validate_non_empty_string("state_column", &self.state_column)?;
            self.dataset_settings().validate("dataset")
        }
    }

}
