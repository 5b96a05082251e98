// tests/common/mod.rs
// Fakes shared by the integration tests: counting source adapters, a scripted text
// backend and a store that is always down.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use trend_press::config::PipelineConfig;
use trend_press::error::{BackendError, StoreError};
use trend_press::generate::backend::{CompletionFuture, TextBackend};
use trend_press::ingest::types::{
    FetchParams, RawCandidate, RawSignal, SourceProvider, TopicCandidate, TrendSource,
};
use trend_press::store::{ContentId, ContentStore, StoredContent};
use trend_press::GeneratedContent;

/// Config with no politeness delay and a short adapter timeout.
pub fn test_config() -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.orchestrator.politeness_delay_ms = 0;
    cfg.trends.source_timeout_secs = 1;
    cfg
}

pub fn topic(keyword: &str, score: f64, category: &str) -> TopicCandidate {
    TopicCandidate {
        keyword: keyword.to_string(),
        source: TrendSource::Manual,
        category: category.to_string(),
        score,
        fetched_at: Utc::now(),
        metadata: None,
    }
}

pub fn scored(keyword: &str, score: f64) -> RawCandidate {
    RawCandidate::new(keyword, RawSignal::Score(score))
}

enum Behavior {
    Items(Vec<RawCandidate>),
    Fail,
    Slow(Duration, Vec<RawCandidate>),
}

/// Source adapter returning canned candidates and counting its calls.
pub struct StaticProvider {
    source: TrendSource,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn ok(source: TrendSource, items: Vec<RawCandidate>) -> Arc<Self> {
        Arc::new(Self {
            source,
            behavior: Behavior::Items(items),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(source: TrendSource) -> Arc<Self> {
        Arc::new(Self {
            source,
            behavior: Behavior::Fail,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(source: TrendSource, delay: Duration, items: Vec<RawCandidate>) -> Arc<Self> {
        Arc::new(Self {
            source,
            behavior: Behavior::Slow(delay, items),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for StaticProvider {
    async fn fetch(&self, _params: &FetchParams) -> anyhow::Result<Vec<RawCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Items(items) => Ok(items.clone()),
            Behavior::Fail => anyhow::bail!("{} is down", self.source),
            Behavior::Slow(delay, items) => {
                tokio::time::sleep(*delay).await;
                Ok(items.clone())
            }
        }
    }

    fn source(&self) -> TrendSource {
        self.source
    }
}

pub fn as_providers(list: &[Arc<StaticProvider>]) -> Vec<Arc<dyn SourceProvider>> {
    list.iter()
        .map(|p| p.clone() as Arc<dyn SourceProvider>)
        .collect()
}

type Script = dyn Fn(&str, &str) -> Result<String, BackendError> + Send + Sync;

/// Backend answering from a closure over `(system, user)`; counts calls.
pub struct ScriptedBackend {
    script: Box<Script>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(
        script: impl Fn(&str, &str) -> Result<String, BackendError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextBackend for ScriptedBackend {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> CompletionFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = (self.script)(system, user);
        Box::pin(async move { out })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn is_seo_stage(system: &str) -> bool {
    system.contains("SEO")
}

/// The `Topic:` line of an article prompt.
pub fn topic_line(user: &str) -> String {
    user.lines()
        .find_map(|l| l.strip_prefix("Topic:"))
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Well-formed article reply whose title is derived from the topic.
pub fn article_reply(topic: &str) -> String {
    format!(
        "TITLE: {topic} Explained\n\
         EXCERPT: Why {topic} is everywhere today.\n\
         TAGS: {lower}, news\n\
         CONTENT:\n\
         ## Background\n\n\
         {topic} is trending across several sources.\n",
        lower = topic.to_lowercase()
    )
}

pub fn seo_reply() -> String {
    r#"{"metaTitle":"Meta","metaDescription":"Description","keywords":["one","two"],"ogTitle":"OG","ogDescription":"OG description"}"#.to_string()
}

/// Backend that answers every stage well-formed.
pub fn happy_backend() -> Arc<ScriptedBackend> {
    ScriptedBackend::new(|system, user| {
        if is_seo_stage(system) {
            Ok(seo_reply())
        } else {
            Ok(article_reply(&topic_line(user)))
        }
    })
}

/// Store whose every call fails.
pub struct DownStore;

#[async_trait]
impl ContentStore for DownStore {
    async fn find_by_title_ci(&self, _title: &str) -> Result<Option<StoredContent>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn insert(&self, _content: GeneratedContent) -> Result<ContentId, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}
