use super::DatasetSettings;
use crate::domain::model::LookupMode;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EnrichError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_output_formats, validate_path, validate_positive_number,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub job: JobConfig,
    pub dataset: DatasetSettings,
    pub input: InputConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
    #[serde(default = "default_zip_column")]
    pub zip_column: String,
    #[serde(default = "default_city_column")]
    pub city_column: String,
    #[serde(default = "default_state_column")]
    pub state_column: String,
}

fn default_zip_column() -> String {
    "Zip".to_string()
}

fn default_city_column() -> String {
    "City".to_string()
}

fn default_state_column() -> String {
    "State".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichConfig {
    pub mode: Option<LookupMode>,
    pub result_limit: Option<usize>,
    pub workers: Option<usize>,
    pub fill_missing: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    #[serde(default)]
    pub compress: bool,
}

fn default_output_formats() -> Vec<String> {
    vec!["csv".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// "compact" (default) or "json"
    pub log_format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EnrichError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EnrichError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATASET_URL})，未設定的變數原樣保留
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EnrichError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("job.name", &self.job.name)?;
        validate_path("input.path", &self.input.path)?;
        validate_non_empty_string("input.zip_column", &self.input.zip_column)?;
        validate_non_empty_string("input.city_column", &self.input.city_column)?;
        validate_non_empty_string("input.state_column", &self.input.state_column)?;
        validate_path("load.output_path", &self.load.output_path)?;
        validate_output_formats("load.output_formats", &self.load.output_formats)?;

        if let Some(workers) = self.enrich.workers {
            validate_positive_number("enrich.workers", workers, 1)?;
        }
        if let Some(limit) = self.enrich.result_limit {
            validate_positive_number("enrich.result_limit", limit, 1)?;
        }

        if let Some(format) = self.monitoring.as_ref().and_then(|m| m.log_format.as_deref()) {
            if !["compact", "json"].contains(&format) {
                return Err(EnrichError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        self.dataset.validate("dataset")
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            .is_some_and(|f| f == "json")
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn zip_column(&self) -> &str {
        &self.input.zip_column
    }

    fn city_column(&self) -> &str {
        &self.input.city_column
    }

    fn state_column(&self) -> &str {
        &self.input.state_column
    }

    fn lookup_mode(&self) -> LookupMode {
        self.enrich.mode.unwrap_or_default()
    }

    fn result_limit(&self) -> Option<usize> {
        self.enrich.result_limit
    }

    fn workers(&self) -> usize {
        self.enrich.workers.unwrap_or(1)
    }

    fn fill_missing(&self) -> bool {
        self.enrich.fill_missing.unwrap_or(false)
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn compress_output(&self) -> bool {
        self.load.compress
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[job]
name = "q3-transactions"

[dataset]
path = "./data/zipcodes.csv"

[input]
path = "./transactions.csv"

[load]
output_path = "./runs/run_1"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.job.name, "q3-transactions");
        assert_eq!(config.dataset.path.as_deref(), Some("./data/zipcodes.csv"));
        assert_eq!(config.zip_column(), "Zip");
        assert_eq!(config.lookup_mode(), LookupMode::Zip);
        assert_eq!(config.workers(), 1);
        assert_eq!(config.output_formats(), &["csv".to_string()]);
        assert!(!config.fill_missing());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[job]
name = "municipal"
description = "All zip codes per branch city"

[dataset]
path = "./cache/zipcodes.zip"
url = "https://example.com/zipcodes.zip"
archive_entry = "simple.csv"

[input]
path = "./branches.csv"
city_column = "branch_city"
state_column = "branch_state"

[enrich]
mode = "city-state"
result_limit = 25
workers = 6
fill_missing = true

[load]
output_path = "./runs/run_2"
output_formats = ["csv", "json"]
compress = true

[monitoring]
enabled = true
log_format = "json"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.lookup_mode(), LookupMode::CityState);
        assert_eq!(config.result_limit(), Some(25));
        assert_eq!(config.workers(), 6);
        assert!(config.fill_missing());
        assert_eq!(config.city_column(), "branch_city");
        assert!(config.compress_output());
        assert!(config.monitoring_enabled());
        assert!(config.json_logs());
        assert_eq!(config.dataset.archive_entry.as_deref(), Some("simple.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ZIP_ENRICHER_TEST_DATASET_URL", "https://test.example.com/zips.csv");

        let toml_content = r#"
[job]
name = "env"

[dataset]
path = "./zips.csv"
url = "${ZIP_ENRICHER_TEST_DATASET_URL}"

[input]
path = "./rows.csv"

[load]
output_path = "./output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.dataset.url.as_deref(),
            Some("https://test.example.com/zips.csv")
        );

        std::env::remove_var("ZIP_ENRICHER_TEST_DATASET_URL");
    }

    #[test]
    fn test_mode_accepts_cli_spellings() {
        for (spelling, expected) in [
            ("city_state", LookupMode::CityState),
            ("city-state", LookupMode::CityState),
            ("zipcode", LookupMode::Zip),
        ] {
            let toml_content = format!(
                r#"
[job]
name = "spelling"

[dataset]
builtin = true

[input]
path = "./rows.csv"

[enrich]
mode = "{}"

[load]
output_path = "./output"
"#,
                spelling
            );

            let config = TomlConfig::from_toml_str(&toml_content).unwrap();
            assert_eq!(config.lookup_mode(), expected);
            assert_eq!(spelling.parse::<LookupMode>().unwrap(), expected);
        }
    }

    #[test]
    fn test_unknown_mode_is_parse_error() {
        let toml_content = r#"
[job]
name = "bad-mode"

[dataset]
builtin = true

[input]
path = "./rows.csv"

[enrich]
mode = "county"

[load]
output_path = "./output"
"#;

        let err = TomlConfig::from_toml_str(toml_content).unwrap_err();
        assert!(matches!(err, EnrichError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[job]
name = "invalid"

[dataset]
path = "./zips.csv"
url = "not-a-url"

[input]
path = "./rows.csv"

[load]
output_path = "./output"
output_formats = ["csv", "parquet"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[job]
name = "file-test"

[dataset]
builtin = true

[input]
path = "./rows.csv"

[load]
output_path = "./output"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.job.name, "file-test");
        assert!(config.dataset.builtin);
    }
}
