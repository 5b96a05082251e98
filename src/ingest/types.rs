// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a topic candidate came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum TrendSource {
    SearchTrends,
    SocialTrends,
    LinkAggregator,
    Manual,
}

impl TrendSource {
    /// Stable query order for the fan-out. Dedup is first-seen-wins, so this order is the tie-break.
    pub const FETCH_ORDER: [TrendSource; 3] = [
        TrendSource::SearchTrends,
        TrendSource::SocialTrends,
        TrendSource::LinkAggregator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendSource::SearchTrends => "search-trends",
            TrendSource::SocialTrends => "social-trends",
            TrendSource::LinkAggregator => "link-aggregator",
            TrendSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search-trends" | "search_trends" | "google" | "google-trends" => {
                Some(TrendSource::SearchTrends)
            }
            "social-trends" | "social_trends" | "twitter" | "x" => Some(TrendSource::SocialTrends),
            "link-aggregator" | "link_aggregator" | "reddit" => Some(TrendSource::LinkAggregator),
            "manual" => Some(TrendSource::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrendSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-specific popularity signal, before normalization into a score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawSignal {
    /// Approximate search volume (search-trends).
    Traffic(u64),
    /// 1-based list position (social-trends).
    Rank(u32),
    /// Vote count (link-aggregator).
    Upvotes(u64),
    /// Already normalized (manual entries).
    Score(f64),
}

/// Optional, source-specific extras. Nothing downstream requires these.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TopicMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<i64>, // unix seconds
}

/// One raw tuple as returned by a source adapter.
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub keyword: String,
    pub signal: RawSignal,
    pub category: Option<String>,
    pub metadata: TopicMetadata,
}

impl RawCandidate {
    pub fn new(keyword: impl Into<String>, signal: RawSignal) -> Self {
        Self {
            keyword: keyword.into(),
            signal,
            category: None,
            metadata: TopicMetadata::default(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A normalized trend signal. Created fresh on every aggregation, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicCandidate {
    pub keyword: String,
    pub source: TrendSource,
    pub category: String,
    pub score: f64,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TopicMetadata>,
}

/// Region + category hint handed to every adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub region: String,
    pub category: Option<String>,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawCandidate>>;
    fn source(&self) -> TrendSource;
    fn name(&self) -> &'static str {
        self.source().as_str()
    }
}
