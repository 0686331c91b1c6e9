use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Files rooted at a base directory; relative paths resolve against it,
/// absolute paths are used as given. The default base is the working directory.
#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(Path::new(path))
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.resolve(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_nested_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        tokio_test::block_on(storage.write_file("runs/run_1/out.csv", b"zipcode\n10001\n")).unwrap();
        let data = tokio_test::block_on(storage.read_file("runs/run_1/out.csv")).unwrap();

        assert_eq!(data, b"zipcode\n10001\n");
    }

    #[test]
    fn test_absolute_path_ignores_base() {
        let temp_dir = TempDir::new().unwrap();
        let absolute = temp_dir.path().join("input.csv");
        std::fs::write(&absolute, "Zip\n10001\n").unwrap();

        let storage = LocalStorage::new("/nonexistent-base");
        let data = tokio_test::block_on(storage.read_file(absolute.to_str().unwrap())).unwrap();
        assert_eq!(data, b"Zip\n10001\n");
    }
}
