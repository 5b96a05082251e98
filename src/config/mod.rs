// src/config/mod.rs
pub mod pipeline;

pub use pipeline::{
    BackendConfig, GeneratorConfig, ManualTopic, OrchestratorConfig, PipelineConfig, ScoringConfig,
    TrafficBucket, TrendsConfig,
};
