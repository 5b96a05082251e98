// src/generate/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::{TopicCandidate, TrendSource};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetadata {
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
    pub og_title: String,
    pub og_description: String,
}

/// Provenance of a generated record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceTopicRef {
    pub keyword: String,
    pub score: f64,
    pub source: TrendSource,
    pub fetched_at: DateTime<Utc>,
    /// Hash of the normalized keyword.
    pub fingerprint: String,
}

impl SourceTopicRef {
    pub fn from_topic(topic: &TopicCandidate) -> Self {
        Self {
            keyword: topic.keyword.clone(),
            score: topic.score,
            source: topic.source,
            fetched_at: topic.fetched_at,
            fingerprint: crate::generate::topic_fingerprint(&topic.keyword),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub body: String,
    /// Lowercased, deduplicated, in first-seen order.
    pub tags: Vec<String>,
    pub seo: SeoMetadata,
    pub source_topic: SourceTopicRef,
    pub category: String,
    pub is_generated: bool,
    pub word_count: usize,
    pub read_time_minutes: usize,
    pub generated_at: DateTime<Utc>,
}

/// Per-call overrides; `None` falls back to `GeneratorConfig`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(default)]
    pub word_count: Option<u32>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}
