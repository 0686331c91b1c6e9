// Adapters layer: concrete implementations for external systems (datasets, storage, http).

pub mod dataset;
pub mod fetcher;
pub mod storage;
pub mod zipcodes_provider;

use crate::config::DatasetSettings;
use crate::domain::ports::ZipLookup;
use crate::utils::error::{EnrichError, Result};
use dataset::ReferenceDataset;
use fetcher::DatasetFetcher;
use zipcodes_provider::ZipcodesProvider;

/// Builds the provider described by `settings`, downloading the dataset
/// first when a URL is configured and the file is not cached yet.
pub async fn open_provider(settings: &DatasetSettings) -> Result<Box<dyn ZipLookup>> {
    if settings.builtin {
        tracing::info!("Using the bundled zipcodes dataset");
        return Ok(Box::new(ZipcodesProvider::new()));
    }

    let path = settings
        .path
        .clone()
        .ok_or_else(|| EnrichError::MissingConfigError {
            field: "dataset.path".to_string(),
        })?;

    if let Some(url) = &settings.url {
        DatasetFetcher::new().ensure_local(url, &path).await?;
    }

    let entry = settings.archive_entry.clone();
    let dataset = tokio::task::spawn_blocking(move || ReferenceDataset::open(&path, entry.as_deref()))
        .await
        .map_err(|e| EnrichError::processing(format!("dataset loader panicked: {}", e)))??;

    if dataset.is_empty() {
        tracing::warn!("Reference dataset '{}' has no rows", dataset.source());
    }

    Ok(Box::new(dataset))
}
