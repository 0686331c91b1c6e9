pub use crate::app::pipelines::enrichment_pipeline::{
    EnrichmentPipeline, BUNDLE_ZIP, ENRICHED_CSV, ENRICHED_JSON, UNRESOLVED_CSV,
};
