// src/config/pipeline.rs
//! Pipeline configuration (TOML).
//!
//! Resolution order:
//! 1) `$PIPELINE_CONFIG_PATH` (must exist)
//! 2) `config/pipeline.toml`
//! 3) built-in defaults
//!
//! Every section is optional; missing fields take the defaults below.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::types::TrendSource;

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub trends: TrendsConfig,
    pub scoring: ScoringConfig,
    pub generator: GeneratorConfig,
    pub orchestrator: OrchestratorConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    pub enabled_sources: Vec<TrendSource>,
    pub default_region: String,
    /// Normalized edit-distance similarity above which two keywords collapse.
    pub similarity_threshold: f64,
    pub cache_ttl_secs: u64,
    pub source_timeout_secs: u64,
    /// How many ranked candidates a cache-filling aggregation keeps.
    pub cache_limit: usize,
    pub search_trends_url: String,
    pub social_trends_url: String,
    pub link_aggregator_url: String,
    pub link_aggregator_communities: Vec<String>,
    /// Editor-seeded topics served by the manual source.
    pub manual_topics: Vec<ManualTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualTopic {
    pub keyword: String,
    pub score: f64,
    #[serde(default)]
    pub category: Option<String>,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            enabled_sources: TrendSource::FETCH_ORDER.to_vec(),
            default_region: "US".to_string(),
            similarity_threshold: 0.8,
            cache_ttl_secs: 30 * 60,
            source_timeout_secs: 10,
            cache_limit: 50,
            search_trends_url: "https://trends.google.com/trending/rss".to_string(),
            social_trends_url: "https://trends24.in".to_string(),
            link_aggregator_url: "https://www.reddit.com".to_string(),
            link_aggregator_communities: vec![
                "technology".to_string(),
                "science".to_string(),
                "worldnews".to_string(),
            ],
            manual_topics: Vec::new(),
        }
    }
}

impl TrendsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

/// Score bucket: raw traffic `>= min_traffic` maps to `score`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrafficBucket {
    pub min_traffic: u64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub traffic_buckets: Vec<TrafficBucket>,
    pub traffic_floor: f64,
    pub rank_start: f64,
    pub rank_step: f64,
    pub rank_floor: f64,
    pub upvote_divisor: f64,
    pub upvote_cap: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let buckets = [
            (1_000_000, 100.0),
            (500_000, 90.0),
            (200_000, 80.0),
            (100_000, 70.0),
            (50_000, 60.0),
            (10_000, 50.0),
            (1_000, 40.0),
        ];
        Self {
            traffic_buckets: buckets
                .iter()
                .map(|&(min_traffic, score)| TrafficBucket { min_traffic, score })
                .collect(),
            traffic_floor: 30.0,
            rank_start: 100.0,
            rank_step: 5.0,
            rank_floor: 10.0,
            upvote_divisor: 100.0,
            upvote_cap: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub word_count: u32,
    pub tone: String,
    pub article_max_tokens: u32,
    pub article_temperature: f32,
    pub seo_max_tokens: u32,
    pub seo_temperature: f32,
    pub max_tags: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            word_count: 800,
            tone: "informative".to_string(),
            article_max_tokens: 2_000,
            article_temperature: 0.7,
            seo_max_tokens: 400,
            seo_temperature: 0.3,
            max_tags: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Pause between successive generation calls (not before the first).
    pub politeness_delay_ms: u64,
    pub max_batch: usize,
    /// Aggregation headroom: fetch `max_articles * headroom` candidates.
    pub candidate_headroom: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            politeness_delay_ms: 5_000,
            max_batch: 20,
            candidate_headroom: 3,
        }
    }
}

impl OrchestratorConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub enabled: bool,
    /// "openai" (any OpenAI-compatible endpoint) or "mock".
    pub provider: String,
    pub model: String,
    pub base_url: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: "ENV".to_string(),
            timeout_secs: 60,
        }
    }
}

impl PipelineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: PipelineConfig = toml::from_str(s).context("parsing pipeline config")?;
        Ok(cfg.sanitized())
    }

    /// Env path, then `config/pipeline.toml`, then defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PIPELINE_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_PIPELINE_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from_file(&default_path);
        }
        Ok(Self::default().sanitized())
    }

    fn sanitized(mut self) -> Self {
        let t = &mut self.trends;
        if !t.similarity_threshold.is_finite() {
            t.similarity_threshold = TrendsConfig::default().similarity_threshold;
        } else if !(0.0..=1.0).contains(&t.similarity_threshold) {
            t.similarity_threshold = t.similarity_threshold.clamp(0.0, 1.0);
        }
        if t.cache_ttl_secs == 0 {
            t.cache_ttl_secs = TrendsConfig::default().cache_ttl_secs;
        }
        if t.source_timeout_secs == 0 {
            t.source_timeout_secs = TrendsConfig::default().source_timeout_secs;
        }
        if t.cache_limit == 0 {
            t.cache_limit = TrendsConfig::default().cache_limit;
        }
        t.default_region = t.default_region.trim().to_ascii_uppercase();
        if t.default_region.is_empty() {
            t.default_region = "US".to_string();
        }
        let mut seen = Vec::new();
        t.enabled_sources.retain(|s| {
            let fresh = !seen.contains(s);
            seen.push(*s);
            fresh
        });
        t.manual_topics.retain(|m| !m.keyword.trim().is_empty());

        // Buckets are evaluated top-down.
        self.scoring.traffic_buckets.sort_by(|a, b| b.min_traffic.cmp(&a.min_traffic));
        if self.scoring.upvote_divisor <= 0.0 {
            self.scoring.upvote_divisor = ScoringConfig::default().upvote_divisor;
        }

        if self.generator.word_count == 0 {
            self.generator.word_count = GeneratorConfig::default().word_count;
        }
        if self.generator.max_tags == 0 {
            self.generator.max_tags = GeneratorConfig::default().max_tags;
        }
        if self.orchestrator.candidate_headroom == 0 {
            self.orchestrator.candidate_headroom = 1;
        }

        self.backend.provider = self.backend.provider.to_lowercase();
        self
    }

    /// Resolve `api_key = "ENV"` against the environment. Missing key is an error only
    /// when the backend is enabled with a real provider.
    pub fn resolve_api_key(&self) -> Result<String> {
        let b = &self.backend;
        if !b.api_key.trim().eq_ignore_ascii_case("env") {
            return Ok(b.api_key.clone());
        }
        match b.provider.as_str() {
            "openai" => std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow!("Missing OPENAI_API_KEY env var")),
            "mock" => Ok(String::new()),
            other => Err(anyhow!("Unsupported backend provider in config: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.trends.similarity_threshold, 0.8);
        assert_eq!(cfg.trends.cache_ttl_secs, 1800);
        assert_eq!(cfg.scoring.traffic_buckets[0].score, 100.0);
        assert_eq!(cfg.scoring.traffic_floor, 30.0);
        assert_eq!(cfg.orchestrator.politeness_delay_ms, 5_000);
    }

    #[test]
    fn partial_toml_keeps_defaults_and_sanitizes() {
        let toml = r#"
[trends]
similarity_threshold = 1.7
enabled_sources = ["link-aggregator", "search-trends", "link-aggregator"]
default_region = " gb "

[scoring]
traffic_buckets = [{ min_traffic = 10, score = 35.0 }, { min_traffic = 5000, score = 55.0 }]
"#;
        let cfg = PipelineConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.trends.similarity_threshold, 1.0);
        assert_eq!(
            cfg.trends.enabled_sources,
            vec![TrendSource::LinkAggregator, TrendSource::SearchTrends]
        );
        assert_eq!(cfg.trends.default_region, "GB");
        assert_eq!(cfg.scoring.traffic_buckets[0].min_traffic, 5000);
        assert_eq!(cfg.generator.word_count, 800);
    }

    #[test]
    fn non_finite_threshold_falls_back_to_default() {
        let cfg = PipelineConfig::from_toml_str("[trends]\nsimilarity_threshold = nan\n").unwrap();
        assert_eq!(cfg.trends.similarity_threshold, 0.8);
        let cfg = PipelineConfig::from_toml_str("[trends]\nsimilarity_threshold = inf\n").unwrap();
        assert_eq!(cfg.trends.similarity_threshold, 0.8);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_PIPELINE_CONFIG_PATH);

        let cfg = PipelineConfig::load_default().unwrap();
        assert_eq!(cfg.trends.cache_limit, 50);

        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[orchestrator]\npoliteness_delay_ms = 0\n").unwrap();
        env::set_var(ENV_PIPELINE_CONFIG_PATH, p.display().to_string());
        let cfg = PipelineConfig::load_default().unwrap();
        assert_eq!(cfg.orchestrator.politeness_delay_ms, 0);

        env::set_var(ENV_PIPELINE_CONFIG_PATH, tmp.path().join("nope.toml"));
        assert!(PipelineConfig::load_default().is_err());
        env::remove_var(ENV_PIPELINE_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
