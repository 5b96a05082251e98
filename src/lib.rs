// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod metrics;
pub mod orchestrator;
pub mod store;

use std::sync::Arc;

use axum::Router;
use once_cell::sync::OnceCell;

pub use crate::api::{router, AppState};
pub use crate::config::PipelineConfig;
pub use crate::error::{BackendError, GenerationError, PipelineError, StoreError};
pub use crate::generate::{ContentGenerator, GeneratedContent, GenerationOptions};
pub use crate::ingest::types::{SourceProvider, TopicCandidate, TrendSource};
pub use crate::ingest::TrendAggregator;
pub use crate::orchestrator::{BatchRequest, GenerationOrchestrator};
pub use crate::store::{ContentStore, MemoryContentStore};

use crate::generate::backend::{build_backend_from_config, DynBackend};
use crate::ingest::cache::TrendCache;
use crate::ingest::providers::build_providers;
use crate::metrics::Metrics;

pub const ENV_ADMIN_TOKEN: &str = "ADMIN_TOKEN";

/// Wire the pipeline from explicit collaborators. Tests pass fakes here.
pub fn build_state(
    cfg: &PipelineConfig,
    providers: Vec<Arc<dyn SourceProvider>>,
    backend: DynBackend,
    store: Arc<dyn ContentStore>,
    admin_token: Option<String>,
) -> AppState {
    let cache = Arc::new(TrendCache::new(cfg.trends.cache_ttl()));
    let aggregator = Arc::new(TrendAggregator::new(
        providers,
        cache,
        cfg.trends.clone(),
        cfg.scoring.clone(),
    ));
    let generator = Arc::new(ContentGenerator::new(backend, cfg.generator.clone()));
    let orchestrator = Arc::new(GenerationOrchestrator::new(
        aggregator.clone(),
        generator,
        store,
        cfg.orchestrator.clone(),
    ));
    AppState {
        aggregator,
        orchestrator,
        admin_token: admin_token.filter(|t| !t.trim().is_empty()),
    }
}

/// Production wiring: live adapters, configured backend, in-memory store.
pub fn state_from_config(cfg: &PipelineConfig) -> anyhow::Result<AppState> {
    let providers = build_providers(&cfg.trends)?;
    let backend = build_backend_from_config(cfg)?;
    tracing::info!(
        providers = providers.len(),
        backend = backend.provider_name(),
        region = %cfg.trends.default_region,
        "pipeline configured"
    );
    Ok(build_state(
        cfg,
        providers,
        backend,
        Arc::new(MemoryContentStore::new()),
        std::env::var(ENV_ADMIN_TOKEN).ok(),
    ))
}

/// The recorder is process-global; repeated `app()` calls share one.
fn shared_metrics(cache_ttl_secs: u64) -> anyhow::Result<&'static Metrics> {
    static METRICS: OnceCell<Metrics> = OnceCell::new();
    METRICS.get_or_try_init(|| Metrics::init(cache_ttl_secs))
}

/// Full in-process app: API routes plus `/metrics`, wired from the default config chain.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = PipelineConfig::load_default()?;
    let metrics = shared_metrics(cfg.trends.cache_ttl_secs)?;
    let state = state_from_config(&cfg)?;
    Ok(router(state).merge(metrics.router()))
}
