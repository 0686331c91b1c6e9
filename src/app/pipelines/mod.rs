pub mod enrichment_pipeline;
