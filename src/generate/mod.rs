// src/generate/mod.rs
//! Content generation: turns one topic candidate into a complete content record through a
//! two-stage prompt protocol (article, then SEO metadata).

pub mod article;
pub mod backend;
pub mod seo;
pub mod types;

use chrono::Utc;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::generate::article::{
    article_prompt, derive_excerpt, derive_tags, derive_title, parse_sections,
    ARTICLE_SYSTEM_PROMPT,
};
use crate::generate::backend::DynBackend;
use crate::generate::seo::{resolve_seo, seo_prompt, SeoParse, SEO_SYSTEM_PROMPT};
use crate::ingest::dedup::comparison_key;
use crate::ingest::types::TopicCandidate;

pub use types::{GeneratedContent, GenerationOptions, SeoMetadata, SourceTopicRef};

const WORDS_PER_MINUTE: usize = 200;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("articles_generated_total", "Articles produced by the generator.");
        describe_counter!(
            "article_generation_failures_total",
            "Generation attempts that failed at the backend or produced nothing usable."
        );
        describe_counter!(
            "article_parse_fallback_total",
            "Articles where marker parsing needed heuristic fallback."
        );
        describe_counter!("seo_fallback_total", "SEO metadata built from line scan or defaults.");
    });
}

/// Lowercase, drop everything but alphanumerics, spaces and hyphens, whitespace runs to `-`.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .trim_matches('-')
        .to_string()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes at 200 words per minute, rounded up.
pub fn read_time_minutes(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}

/// Short stable hash of the normalized keyword.
pub fn topic_fingerprint(keyword: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(comparison_key(keyword).as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub struct ContentGenerator {
    backend: DynBackend,
    cfg: GeneratorConfig,
}

impl ContentGenerator {
    pub fn new(backend: DynBackend, cfg: GeneratorConfig) -> Self {
        ensure_metrics_described();
        Self { backend, cfg }
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    pub async fn generate(
        &self,
        topic: &TopicCandidate,
        options: &GenerationOptions,
    ) -> Result<GeneratedContent, GenerationError> {
        let res = self.generate_inner(topic, options).await;
        match &res {
            Ok(c) => {
                counter!("articles_generated_total").increment(1);
                tracing::info!(target: "generator", keyword = %topic.keyword, title = %c.title, words = c.word_count, "article generated");
            }
            Err(e) => {
                counter!("article_generation_failures_total").increment(1);
                tracing::warn!(target: "generator", keyword = %topic.keyword, error = %e, "article generation failed");
            }
        }
        res
    }

    async fn generate_inner(
        &self,
        topic: &TopicCandidate,
        options: &GenerationOptions,
    ) -> Result<GeneratedContent, GenerationError> {
        let category = options
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(topic.category.as_str())
            .to_lowercase();
        let target_words = options.word_count.filter(|w| *w > 0).unwrap_or(self.cfg.word_count);
        let tone = options
            .tone
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.cfg.tone.as_str());

        // Stage 1: article
        let prompt = article_prompt(topic, &category, target_words, tone);
        let raw = self
            .backend
            .complete(
                ARTICLE_SYSTEM_PROMPT,
                &prompt,
                self.cfg.article_max_tokens,
                self.cfg.article_temperature,
            )
            .await?;
        if raw.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        let parsed = parse_sections(&raw);
        let needs_fallback =
            parsed.title.is_none() || parsed.excerpt.is_none() || parsed.content.is_none();
        if needs_fallback {
            counter!("article_parse_fallback_total").increment(1);
            tracing::debug!(
                target: "generator",
                keyword = %topic.keyword,
                title = parsed.title.is_some(),
                excerpt = parsed.excerpt.is_some(),
                content = parsed.content.is_some(),
                "section markers incomplete; using fallback parsing"
            );
        }

        let body = parsed
            .content
            .clone()
            .or_else(|| Some(parsed.preamble.clone()).filter(|p| !p.is_empty()))
            .ok_or(GenerationError::EmptyResponse)?;
        let title = parsed
            .title
            .clone()
            .or_else(|| derive_title(&body))
            .unwrap_or_else(|| topic.keyword.clone());
        let excerpt = parsed
            .excerpt
            .clone()
            .or_else(|| derive_excerpt(&body, &title))
            .unwrap_or_else(|| title.clone());

        let mut tags = if parsed.tags.is_empty() {
            derive_tags(&topic.keyword)
        } else {
            parsed.tags.clone()
        };
        tags.truncate(self.cfg.max_tags);

        // Stage 2: SEO metadata (never fails)
        let seo_reply = match self
            .backend
            .complete(
                SEO_SYSTEM_PROMPT,
                &seo_prompt(&title, &excerpt, &topic.keyword),
                self.cfg.seo_max_tokens,
                self.cfg.seo_temperature,
            )
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(target: "generator", keyword = %topic.keyword, error = %e, "seo stage failed; using defaults");
                None
            }
        };
        let (seo, how) = resolve_seo(seo_reply.as_deref(), &title, &excerpt, &topic.keyword, &tags);
        if how != SeoParse::Json {
            counter!("seo_fallback_total").increment(1);
        }

        let words = word_count(&body);
        Ok(GeneratedContent {
            slug: slugify(&title),
            title,
            excerpt,
            tags,
            seo,
            source_topic: SourceTopicRef::from_topic(topic),
            category,
            is_generated: true,
            word_count: words,
            read_time_minutes: read_time_minutes(words),
            generated_at: Utc::now(),
            body,
        })
    }
}
