// src/ingest/mod.rs
//! Trend aggregation: concurrent source fan-out, normalization, fuzzy dedup, ranking and
//! the short-TTL cache in front of it all.
//!
//! Adapter failures never escape `aggregate`; when every adapter fails the result is an
//! empty list and nothing is cached.

pub mod cache;
pub mod dedup;
pub mod providers;
pub mod scoring;
pub mod types;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::{ScoringConfig, TrendsConfig};
use crate::ingest::cache::{CachedTrends, TrendCache};
use crate::ingest::scoring::{classify_keyword, score_signal};
use crate::ingest::types::{
    FetchParams, RawCandidate, SourceProvider, TopicCandidate, TopicMetadata, TrendSource,
};

const MAX_KEYWORD_CHARS: usize = 200;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "trends_source_errors_total",
            "Source adapter failures and timeouts."
        );
        describe_histogram!("trends_source_fetch_ms", "Source adapter fetch time in milliseconds.");
        describe_counter!(
            "trends_candidates_total",
            "Candidates kept after normalization, dedup and ranking."
        );
        describe_counter!(
            "trends_dedup_dropped_total",
            "Candidates dropped as near-duplicates."
        );
        describe_counter!("trends_cache_hits_total", "Aggregations served from cache.");
        describe_counter!(
            "trends_cache_misses_total",
            "Aggregations that fanned out to sources."
        );
    });
}

/// Normalize a raw keyword: decode entities, strip tags, straighten quotes, collapse whitespace.
/// Casing is preserved.
pub fn normalize_keyword(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    out = out.split_whitespace().collect::<Vec<_>>().join(" ");

    if out.chars().count() > MAX_KEYWORD_CHARS {
        out = out.chars().take(MAX_KEYWORD_CHARS).collect();
    }
    out
}

/// Inputs to one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateRequest {
    /// Empty means every registered source.
    pub sources: Vec<TrendSource>,
    pub region: String,
    pub category: Option<String>,
    pub limit: usize,
    /// Bypass the cache.
    pub fresh: bool,
}

/// What a single uncached fan-out produced.
#[derive(Debug, Clone, Default)]
pub struct AggregateOutcome {
    pub candidates: Vec<TopicCandidate>,
    pub succeeded: usize,
    pub failed: usize,
    pub dedup_dropped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TrendQuery {
    pub source: Option<TrendSource>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub limit: Option<usize>,
    pub fresh: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendListing {
    pub candidates: Vec<TopicCandidate>,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_minutes: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshRequest {
    pub sources: Vec<TrendSource>,
    pub region: Option<String>,
    pub categories: Vec<String>,
    pub limit: Option<usize>,
}

pub struct TrendAggregator {
    providers: Vec<Arc<dyn SourceProvider>>,
    cache: Arc<TrendCache>,
    trends: TrendsConfig,
    scoring: ScoringConfig,
}

impl TrendAggregator {
    pub fn new(
        mut providers: Vec<Arc<dyn SourceProvider>>,
        cache: Arc<TrendCache>,
        trends: TrendsConfig,
        scoring: ScoringConfig,
    ) -> Self {
        ensure_metrics_described();
        // Stable sort keeps registration order within one source kind.
        providers.sort_by_key(|p| p.source());
        Self {
            providers,
            cache,
            trends,
            scoring,
        }
    }

    pub fn cache(&self) -> &Arc<TrendCache> {
        &self.cache
    }

    pub fn trends_config(&self) -> &TrendsConfig {
        &self.trends
    }

    pub fn default_region(&self) -> &str {
        &self.trends.default_region
    }

    fn region_or_default(&self, region: Option<&str>) -> String {
        match region.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => r.to_ascii_uppercase(),
            None => self.trends.default_region.clone(),
        }
    }

    /// Cache-aware aggregation.
    pub async fn aggregate(&self, req: &AggregateRequest) -> Vec<TopicCandidate> {
        self.aggregate_with_origin(req).await.0
    }

    /// Like `aggregate`, also returning the cache snapshot the result was served from.
    async fn aggregate_with_origin(
        &self,
        req: &AggregateRequest,
    ) -> (Vec<TopicCandidate>, Option<CachedTrends>) {
        let region = self.region_or_default(Some(&req.region));

        if !req.fresh {
            if let Some(hit) = self.cache.get().fresh_for(&region) {
                counter!("trends_cache_hits_total").increment(1);
                return (view(&hit.candidates, req), Some(hit));
            }
        }

        let _gate = self.cache.refresh_guard().await;
        if !req.fresh {
            // Another caller may have refreshed while we waited on the gate.
            if let Some(hit) = self.cache.get().fresh_for(&region) {
                counter!("trends_cache_hits_total").increment(1);
                return (view(&hit.candidates, req), Some(hit));
            }
        }
        counter!("trends_cache_misses_total").increment(1);

        // Only a full, unfiltered fan-out is a valid snapshot for later readers; it is
        // collected at cache size and the caller's limit applies to the returned view.
        let complete = req.sources.is_empty()
            && req.category.as_deref().map(str::trim).unwrap_or("").is_empty();
        if !complete {
            return (self.collect(req).await.candidates, None);
        }
        let full_req = AggregateRequest {
            limit: req.limit.max(self.trends.cache_limit),
            ..req.clone()
        };
        let outcome = self.collect(&full_req).await;
        if outcome.succeeded > 0 {
            self.cache.set(outcome.candidates.clone(), &region);
        } else if outcome.failed > 0 {
            tracing::warn!(target: "trends", region = %region, "all trend sources failed; cache left untouched");
        }
        (view(&outcome.candidates, req), None)
    }

    /// Uncached fan-out + merge. Never fails.
    pub async fn collect(&self, req: &AggregateRequest) -> AggregateOutcome {
        let params = FetchParams {
            region: self.region_or_default(Some(&req.region)),
            category: req
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_lowercase),
        };
        let timeout = self.trends.source_timeout();

        let selected: Vec<&Arc<dyn SourceProvider>> = self
            .providers
            .iter()
            .filter(|p| req.sources.is_empty() || req.sources.contains(&p.source()))
            .collect();

        let fetches = selected.iter().map(|p| {
            let params = &params;
            async move {
                let t0 = Instant::now();
                let res = tokio::time::timeout(timeout, p.fetch(params)).await;
                let ms = t0.elapsed().as_secs_f64() * 1_000.0;
                histogram!("trends_source_fetch_ms", "source" => p.name()).record(ms);
                match res {
                    Ok(Ok(raw)) => {
                        tracing::debug!(target: "trends", source = p.name(), count = raw.len(), "source fetched");
                        Some((p.source(), raw))
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(target: "trends", error = ?e, source = p.name(), "source unavailable");
                        counter!("trends_source_errors_total", "source" => p.name()).increment(1);
                        None
                    }
                    Err(_) => {
                        tracing::warn!(target: "trends", source = p.name(), timeout_ms = timeout.as_millis() as u64, "source timed out");
                        counter!("trends_source_errors_total", "source" => p.name()).increment(1);
                        None
                    }
                }
            }
        });
        // join_all keeps provider order, which is the dedup tie-break.
        let results = futures::future::join_all(fetches).await;

        let mut outcome = AggregateOutcome::default();
        let mut merged = Vec::new();
        for res in results {
            match res {
                Some((source, raw)) => {
                    outcome.succeeded += 1;
                    merged.extend(
                        raw.into_iter()
                            .filter_map(|r| self.normalize(source, r, &params)),
                    );
                }
                None => outcome.failed += 1,
            }
        }

        if let Some(cat) = &params.category {
            merged.retain(|c| c.category.eq_ignore_ascii_case(cat));
        }

        let (mut kept, dropped) =
            dedup::dedup_candidates(merged, self.trends.similarity_threshold);
        rank(&mut kept);
        kept.truncate(req.limit);

        counter!("trends_candidates_total").increment(kept.len() as u64);
        counter!("trends_dedup_dropped_total").increment(dropped as u64);
        tracing::info!(
            target: "trends",
            kept = kept.len(),
            dedup = dropped,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "aggregation finished"
        );

        outcome.candidates = kept;
        outcome.dedup_dropped = dropped;
        outcome
    }

    fn normalize(
        &self,
        source: TrendSource,
        raw: RawCandidate,
        params: &FetchParams,
    ) -> Option<TopicCandidate> {
        let keyword = normalize_keyword(&raw.keyword);
        if keyword.is_empty() {
            return None;
        }
        let category = raw
            .category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .or_else(|| params.category.clone())
            .unwrap_or_else(|| classify_keyword(&keyword));
        let metadata = if raw.metadata == TopicMetadata::default() {
            None
        } else {
            Some(raw.metadata)
        };
        Some(TopicCandidate {
            score: score_signal(raw.signal, &self.scoring),
            keyword,
            source,
            category,
            fetched_at: Utc::now(),
            metadata,
        })
    }

    /// Listing boundary: every registered source, filters applied on the ranked list.
    pub async fn list_trends(&self, query: &TrendQuery) -> TrendListing {
        let req = AggregateRequest {
            sources: Vec::new(),
            region: self.region_or_default(query.region.as_deref()),
            category: None,
            limit: self.trends.cache_limit,
            fresh: query.fresh,
        };
        let (all, hit) = self.aggregate_with_origin(&req).await;

        let limit = query.limit.unwrap_or(self.trends.cache_limit);
        let candidates = all
            .into_iter()
            .filter(|c| query.source.map(|s| c.source == s).unwrap_or(true))
            .filter(|c| {
                query
                    .category
                    .as_deref()
                    .map(|cat| c.category.eq_ignore_ascii_case(cat.trim()))
                    .unwrap_or(true)
            })
            .take(limit)
            .collect();

        TrendListing {
            candidates,
            cached: hit.is_some(),
            cache_age_minutes: hit.map(|h| h.age_minutes()),
        }
    }

    /// Manual refresh: always fans out, repopulates the cache, returns the category view.
    pub async fn refresh(&self, req: &RefreshRequest) -> Vec<TopicCandidate> {
        let agg = AggregateRequest {
            sources: req.sources.clone(),
            region: self.region_or_default(req.region.as_deref()),
            category: None,
            limit: self.trends.cache_limit,
            fresh: true,
        };
        let all = self.aggregate(&agg).await;
        let mut out = filter_categories(all, &req.categories);
        if let Some(limit) = req.limit {
            out.truncate(limit);
        }
        out
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!(target: "trends", "trend cache cleared");
    }
}

/// Descending by score; stable, so equal scores keep first-seen order.
pub fn rank(candidates: &mut [TopicCandidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Keep candidates whose category is in `categories` (case-insensitive). Empty keeps all.
pub fn filter_categories(
    candidates: Vec<TopicCandidate>,
    categories: &[String],
) -> Vec<TopicCandidate> {
    let wanted: BTreeSet<String> = categories
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();
    if wanted.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| wanted.contains(&c.category.to_lowercase()))
        .collect()
}

fn view(candidates: &[TopicCandidate], req: &AggregateRequest) -> Vec<TopicCandidate> {
    candidates
        .iter()
        .filter(|c| req.sources.is_empty() || req.sources.contains(&c.source))
        .filter(|c| {
            req.category
                .as_deref()
                .map(|cat| c.category.eq_ignore_ascii_case(cat.trim()))
                .unwrap_or(true)
        })
        .take(req.limit)
        .cloned()
        .collect()
}
