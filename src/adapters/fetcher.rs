use crate::utils::error::Result;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Downloads the reference dataset the first time it is needed.
#[derive(Debug, Clone, Default)]
pub struct DatasetFetcher {
    client: Client,
}

impl DatasetFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Returns `path` if it already exists, otherwise downloads `url` there.
    pub async fn ensure_local(&self, url: &str, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await? {
            debug!("Reference dataset already cached at {}", path.display());
            return Ok(path.to_path_buf());
        }

        info!("Downloading reference dataset from {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write beside the target first so an interrupted download never
        // leaves a truncated file at `path`.
        let partial = path.with_extension("partial");
        tokio::fs::write(&partial, &body).await?;
        tokio::fs::rename(&partial, path).await?;

        info!(
            "Saved reference dataset ({} bytes) to {}",
            body.len(),
            path.display()
        );
        Ok(path.to_path_buf())
    }
}
