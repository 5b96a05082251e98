// src/orchestrator.rs
//! Batch generation: pick the top candidates, generate them one at a time with a politeness
//! delay between backend calls, and persist each result at most once per title.
//!
//! Generation is strictly sequential; the find-then-insert title check relies on it.

use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::config::OrchestratorConfig;
use crate::error::PipelineError;
use crate::generate::{ContentGenerator, GeneratedContent, GenerationOptions};
use crate::ingest::types::TopicCandidate;
use crate::ingest::{filter_categories, rank, AggregateRequest, TrendAggregator};
use crate::store::ContentStore;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "articles_reused_total",
            "Generated articles whose title already existed in the store."
        );
        describe_counter!("articles_persisted_total", "Articles inserted into the store.");
    });
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Signed so that negative input from the wire can be rejected explicitly.
    pub max_articles: i64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    #[serde(default)]
    pub options: GenerationOptions,
}

fn default_use_cache() -> bool {
    true
}

pub struct GenerationOrchestrator {
    aggregator: Arc<TrendAggregator>,
    generator: Arc<ContentGenerator>,
    store: Arc<dyn ContentStore>,
    cfg: OrchestratorConfig,
}

impl GenerationOrchestrator {
    pub fn new(
        aggregator: Arc<TrendAggregator>,
        generator: Arc<ContentGenerator>,
        store: Arc<dyn ContentStore>,
        cfg: OrchestratorConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            aggregator,
            generator,
            store,
            cfg,
        }
    }

    fn validate(&self, req: &BatchRequest) -> Result<usize, PipelineError> {
        if req.max_articles < 0 {
            return Err(PipelineError::InvalidInput(format!(
                "maxArticles must be >= 0, got {}",
                req.max_articles
            )));
        }
        let n = req.max_articles as usize;
        if n > self.cfg.max_batch {
            return Err(PipelineError::InvalidInput(format!(
                "maxArticles must be <= {}, got {n}",
                self.cfg.max_batch
            )));
        }
        Ok(n)
    }

    async fn candidates(&self, max_articles: usize, use_cache: bool) -> Vec<TopicCandidate> {
        let region = self.aggregator.default_region().to_string();
        if use_cache {
            if let Some(hit) = self.aggregator.cache().get().fresh_for(&region) {
                tracing::debug!(target: "orchestrator", count = hit.candidates.len(), age_secs = hit.age().as_secs(), "using cached candidates");
                return hit.candidates;
            }
        }
        let req = AggregateRequest {
            sources: Vec::new(),
            region,
            category: None,
            limit: max_articles
                .saturating_mul(self.cfg.candidate_headroom)
                .max(self.aggregator.trends_config().cache_limit),
            fresh: true,
        };
        self.aggregator.aggregate(&req).await
    }

    pub async fn generate_batch(
        &self,
        req: &BatchRequest,
    ) -> Result<Vec<GeneratedContent>, PipelineError> {
        let max_articles = self.validate(req)?;
        if max_articles == 0 {
            return Ok(Vec::new());
        }

        let pool = self.candidates(max_articles, req.use_cache).await;
        let mut selected = filter_categories(pool, &req.categories);
        if selected.is_empty() {
            tracing::info!(target: "orchestrator", categories = ?req.categories, "no candidates to generate");
            return Ok(Vec::new());
        }
        rank(&mut selected);
        selected.truncate(max_articles);

        let delay = self.cfg.politeness_delay();
        let mut out = Vec::with_capacity(selected.len());
        let (mut generated, mut reused, mut failed) = (0usize, 0usize, 0usize);

        for (i, topic) in selected.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let content = match self.generator.generate(topic, &req.options).await {
                Ok(c) => c,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(target: "orchestrator", keyword = %topic.keyword, error = %e, "skipping candidate");
                    continue;
                }
            };

            if let Some(existing) = self.store.find_by_title_ci(&content.title).await? {
                reused += 1;
                counter!("articles_reused_total").increment(1);
                tracing::info!(target: "orchestrator", id = existing.id, title = %existing.content.title, "title already stored; reusing");
                out.push(existing.content);
                continue;
            }

            let id = self.store.insert(content.clone()).await?;
            generated += 1;
            counter!("articles_persisted_total").increment(1);
            tracing::info!(target: "orchestrator", id, slug = %content.slug, "article stored");
            out.push(content);
        }

        tracing::info!(
            target: "orchestrator",
            requested = max_articles,
            generated,
            reused,
            failed,
            "batch finished"
        );
        Ok(out)
    }
}
