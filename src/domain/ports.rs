use crate::domain::model::{Address, LookupMode, TransformResult, ZipRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// A source of zip-code attributes.
///
/// Implementations are read-only once built and may be shared across threads.
pub trait ZipLookup: Send + Sync {
    /// The record for `zipcode` exactly as given, or `None` when unknown.
    fn lookup(&self, zipcode: &str) -> Result<Option<ZipRecord>>;

    /// Standard zip codes of a city/state pair, at most `limit` of them.
    fn by_city_state(
        &self,
        city: &str,
        state: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ZipRecord>>;

    fn name(&self) -> &str;
}

impl<L: ZipLookup + ?Sized> ZipLookup for Box<L> {
    fn lookup(&self, zipcode: &str) -> Result<Option<ZipRecord>> {
        (**self).lookup(zipcode)
    }

    fn by_city_state(
        &self,
        city: &str,
        state: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ZipRecord>> {
        (**self).by_city_state(city, state, limit)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<L: ZipLookup + ?Sized> ZipLookup for std::sync::Arc<L> {
    fn lookup(&self, zipcode: &str) -> Result<Option<ZipRecord>> {
        (**self).lookup(zipcode)
    }

    fn by_city_state(
        &self,
        city: &str,
        state: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ZipRecord>> {
        (**self).by_city_state(city, state, limit)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn zip_column(&self) -> &str;
    fn city_column(&self) -> &str;
    fn state_column(&self) -> &str;
    fn lookup_mode(&self) -> LookupMode;
    fn result_limit(&self) -> Option<usize>;
    fn workers(&self) -> usize;
    fn fill_missing(&self) -> bool;
    fn output_formats(&self) -> &[String];
    fn compress_output(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Address>>;
    async fn transform(&self, data: Vec<Address>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
