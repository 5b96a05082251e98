// src/ingest/providers/mod.rs
pub mod link_aggregator;
pub mod search_trends;
pub mod social_trends;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{ManualTopic, TrendsConfig};
use crate::ingest::types::{FetchParams, RawCandidate, RawSignal, SourceProvider, TrendSource};

pub use link_aggregator::LinkAggregatorProvider;
pub use search_trends::SearchTrendsProvider;
pub use social_trends::SocialTrendsProvider;

const USER_AGENT: &str = "trend-press/0.1 (+https://github.com/trend-press/trend-press)";

/// Shared HTTP client for live adapters. The aggregator enforces its own per-source timeout.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(20))
        .build()
        .context("building trend source http client")
}

/// Live adapters for every enabled source. The manual source needs seeded topics.
pub fn build_providers(cfg: &TrendsConfig) -> Result<Vec<Arc<dyn SourceProvider>>> {
    let client = http_client()?;
    let mut out: Vec<Arc<dyn SourceProvider>> = Vec::new();
    for source in &cfg.enabled_sources {
        match source {
            TrendSource::SearchTrends => out.push(Arc::new(SearchTrendsProvider::from_url(
                cfg.search_trends_url.clone(),
                client.clone(),
            ))),
            TrendSource::SocialTrends => out.push(Arc::new(SocialTrendsProvider::from_url(
                cfg.social_trends_url.clone(),
                client.clone(),
            ))),
            TrendSource::LinkAggregator => out.push(Arc::new(LinkAggregatorProvider::from_url(
                cfg.link_aggregator_url.clone(),
                cfg.link_aggregator_communities.clone(),
                client.clone(),
            ))),
            TrendSource::Manual if !cfg.manual_topics.is_empty() => {
                out.push(Arc::new(ManualProvider::new(cfg.manual_topics.clone())))
            }
            TrendSource::Manual => {}
        }
    }
    Ok(out)
}

/// Editor-seeded topics; scores are taken as given.
pub struct ManualProvider {
    topics: Vec<ManualTopic>,
}

impl ManualProvider {
    pub fn new(topics: Vec<ManualTopic>) -> Self {
        Self { topics }
    }
}

#[async_trait]
impl SourceProvider for ManualProvider {
    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<RawCandidate>> {
        Ok(self
            .topics
            .iter()
            .map(|t| RawCandidate {
                keyword: t.keyword.clone(),
                signal: RawSignal::Score(t.score),
                category: t.category.clone(),
                metadata: Default::default(),
            })
            .collect())
    }

    fn source(&self) -> TrendSource {
        TrendSource::Manual
    }
}
