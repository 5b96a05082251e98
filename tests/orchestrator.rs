// tests/orchestrator.rs
mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{
    article_reply, as_providers, happy_backend, is_seo_stage, scored, seo_reply, test_config,
    topic_line, DownStore, ScriptedBackend, StaticProvider,
};
use trend_press::config::PipelineConfig;
use trend_press::error::{BackendError, PipelineError};
use trend_press::generate::backend::DynBackend;
use trend_press::ingest::types::TrendSource;
use trend_press::ingest::{RefreshRequest, TrendQuery};
use trend_press::store::ContentStore;
use trend_press::{build_state, AppState, BatchRequest, GenerationOptions, MemoryContentStore};

fn batch(max_articles: i64, categories: &[&str]) -> BatchRequest {
    BatchRequest {
        max_articles,
        categories: categories.iter().map(|c| c.to_string()).collect(),
        use_cache: true,
        options: GenerationOptions::default(),
    }
}

fn trending() -> Arc<StaticProvider> {
    StaticProvider::ok(
        TrendSource::SearchTrends,
        vec![
            scored("Quantum Computing", 90.0).with_category("technology"),
            scored("Championship Parade", 80.0).with_category("sports"),
            scored("New Smartphone Launch", 70.0).with_category("technology"),
        ],
    )
}

fn state(
    cfg: &PipelineConfig,
    provider: &Arc<StaticProvider>,
    backend: DynBackend,
    store: Arc<dyn ContentStore>,
) -> AppState {
    build_state(cfg, as_providers(&[provider.clone()]), backend, store, None)
}

#[tokio::test]
async fn second_run_does_not_duplicate_titles() {
    let cfg = test_config();
    let provider = trending();
    let store = Arc::new(MemoryContentStore::new());
    let app = state(&cfg, &provider, happy_backend(), store.clone());

    let first = app
        .orchestrator
        .generate_batch(&batch(2, &[]))
        .await
        .expect("first run ok");
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].title, "Quantum Computing Explained");
    assert_eq!(first[1].title, "Championship Parade Explained");
    assert_eq!(store.len(), 2);

    let second = app
        .orchestrator
        .generate_batch(&batch(2, &[]))
        .await
        .expect("second run ok");
    assert_eq!(store.len(), 2);
    let titles: Vec<&str> = second.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Quantum Computing Explained", "Championship Parade Explained"]);
    // Reused records come back as stored, not regenerated copies.
    assert_eq!(second[0].generated_at, first[0].generated_at);

    // Second run served its candidates from the cache.
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn category_filter_and_max_articles() {
    let cfg = test_config();
    let provider = trending();
    let store = Arc::new(MemoryContentStore::new());
    let app = state(&cfg, &provider, happy_backend(), store.clone());

    let tech = app
        .orchestrator
        .generate_batch(&batch(5, &["Technology"]))
        .await
        .expect("run ok");
    let keywords: Vec<&str> = tech.iter().map(|c| c.source_topic.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["Quantum Computing", "New Smartphone Launch"]);

    let one = app
        .orchestrator
        .generate_batch(&batch(1, &["sports"]))
        .await
        .expect("run ok");
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].category, "sports");
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn unmatched_categories_return_empty() {
    let cfg = test_config();
    let provider = StaticProvider::ok(
        TrendSource::SearchTrends,
        vec![
            scored("Championship Parade", 80.0).with_category("sports"),
            scored("Box Office Weekend", 60.0).with_category("entertainment"),
        ],
    );
    let backend = happy_backend();
    let app = state(
        &cfg,
        &provider,
        backend.clone(),
        Arc::new(MemoryContentStore::new()),
    );

    // Warm the cache, then ask for a category it does not hold.
    let _ = app.aggregator.list_trends(&TrendQuery::default()).await;
    let out = app
        .orchestrator
        .generate_batch(&batch(2, &["technology"]))
        .await
        .expect("empty result is not an error");
    assert!(out.is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn invalid_max_articles_is_rejected() {
    let cfg = test_config();
    let provider = trending();
    let app = state(
        &cfg,
        &provider,
        happy_backend(),
        Arc::new(MemoryContentStore::new()),
    );

    let err = app
        .orchestrator
        .generate_batch(&batch(-1, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    let err = app
        .orchestrator
        .generate_batch(&batch(cfg.orchestrator.max_batch as i64 + 1, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    let none = app
        .orchestrator
        .generate_batch(&batch(0, &[]))
        .await
        .expect("zero is valid");
    assert!(none.is_empty());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn failed_generation_is_skipped() {
    let cfg = test_config();
    let provider = trending();
    let backend = ScriptedBackend::new(|system, user| {
        if is_seo_stage(system) {
            return Ok(seo_reply());
        }
        let t = topic_line(user);
        if t == "Championship Parade" {
            Err(BackendError::Timeout)
        } else {
            Ok(article_reply(&t))
        }
    });
    let store = Arc::new(MemoryContentStore::new());
    let app = state(&cfg, &provider, backend, store.clone());

    let out = app
        .orchestrator
        .generate_batch(&batch(3, &[]))
        .await
        .expect("one failure does not abort the batch");
    let keywords: Vec<&str> = out.iter().map(|c| c.source_topic.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["Quantum Computing", "New Smartphone Launch"]);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn store_outage_is_a_hard_error() {
    let cfg = test_config();
    let provider = trending();
    let app = state(&cfg, &provider, happy_backend(), Arc::new(DownStore));

    let err = app
        .orchestrator
        .generate_batch(&batch(2, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Persistence(_)));
}

#[tokio::test]
async fn politeness_delay_applies_between_calls_only() {
    let mut cfg = test_config();
    cfg.orchestrator.politeness_delay_ms = 200;
    let provider = trending();
    let app = state(
        &cfg,
        &provider,
        happy_backend(),
        Arc::new(MemoryContentStore::new()),
    );

    let started = Instant::now();
    let one = app
        .orchestrator
        .generate_batch(&batch(1, &[]))
        .await
        .expect("run ok");
    assert_eq!(one.len(), 1);
    assert!(started.elapsed() < Duration::from_millis(200));

    let started = Instant::now();
    let three = app
        .orchestrator
        .generate_batch(&batch(3, &[]))
        .await
        .expect("run ok");
    assert_eq!(three.len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn limited_refresh_leaves_full_pool_for_batches() {
    let cfg = test_config();
    let provider = trending();
    let app = state(
        &cfg,
        &provider,
        happy_backend(),
        Arc::new(MemoryContentStore::new()),
    );

    let refreshed = app
        .aggregator
        .refresh(&RefreshRequest {
            limit: Some(1),
            ..RefreshRequest::default()
        })
        .await;
    assert_eq!(refreshed.len(), 1);

    let out = app
        .orchestrator
        .generate_batch(&batch(3, &[]))
        .await
        .expect("run ok");
    assert_eq!(out.len(), 3);
    assert_eq!(provider.calls(), 1);
}
