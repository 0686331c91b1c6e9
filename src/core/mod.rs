pub mod enricher;
pub mod etl;
pub mod pipeline;
pub mod summary;

pub use crate::domain::model::{Address, TransformResult, ZipRecord};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, ZipLookup};
pub use crate::utils::error::Result;
