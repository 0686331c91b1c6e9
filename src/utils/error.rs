use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("No zip code data found for '{zipcode}'")]
    NotFound { zipcode: String },

    #[error("Lookup provider error: {message}")]
    Provider { message: String },

    #[error("Reference dataset error: {message}")]
    DatasetError { message: String },

    #[error("Archive operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Dataset download failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lookup,
    Dataset,
    Network,
    Io,
    Configuration,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EnrichError {
    pub fn not_found<S: Into<String>>(zipcode: S) -> Self {
        Self::NotFound {
            zipcode: zipcode.into(),
        }
    }

    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    pub fn dataset<S: Into<String>>(message: S) -> Self {
        Self::DatasetError {
            message: message.into(),
        }
    }

    pub fn processing<S: Into<String>>(message: S) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } | Self::Provider { .. } => ErrorCategory::Lookup,
            Self::DatasetError { .. } | Self::ZipError(_) | Self::CsvError(_) => {
                ErrorCategory::Dataset
            }
            Self::ApiError(_) => ErrorCategory::Network,
            Self::IoError(_) => ErrorCategory::Io,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Lookup => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Dataset | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Io | ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Lookup => {
                "Check the zip code or city/state spelling; the reference dataset has no entry for it"
            }
            ErrorCategory::Dataset => {
                "Verify the reference dataset is a CSV (or a zip containing one) with a header row"
            }
            ErrorCategory::Network => "Check the dataset URL and network connectivity, then retry",
            ErrorCategory::Io => "Check that the input/output paths exist and are writable",
            ErrorCategory::Configuration => "Fix the configuration value and run again",
            ErrorCategory::Processing => "Inspect the input rows for malformed values",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { zipcode } => format!("Zip code '{}' was not found", zipcode),
            Self::ApiError(_) => "Could not download the reference dataset".to_string(),
            Self::IoError(e) => format!("File access failed: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;
