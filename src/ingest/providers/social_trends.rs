// src/ingest/providers/social_trends.rs
//! Scrape-based social trends feed.
//!
//! Parses a public "trending now" page: the first ranked list on the page is the most
//! recent snapshot, and list position becomes the rank signal. Markup scraping is brittle,
//! so everything page-specific lives in `parse_page`; swapping in an API-backed source only
//! needs another `SourceProvider`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::types::{
    FetchParams, RawCandidate, RawSignal, SourceProvider, TopicMetadata, TrendSource,
};

const MAX_ITEMS: usize = 50;

static RE_FIRST_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<ol[^>]*trend-card__list[^>]*>(.*?)</ol>"#).unwrap());
static RE_TREND_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a[^>]*class="?[^">]*trend-link[^">]*"?[^>]*>(.*?)</a>"#).unwrap()
});
static RE_HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)href="([^"]+)""#).unwrap());

/// Region code -> page path segment.
fn region_slug(region: &str) -> &'static str {
    match region.to_ascii_uppercase().as_str() {
        "US" => "united-states",
        "GB" | "UK" => "united-kingdom",
        "CA" => "canada",
        "AU" => "australia",
        "IN" => "india",
        "DE" => "germany",
        "FR" => "france",
        "JP" => "japan",
        "BR" => "brazil",
        _ => "",
    }
}

pub struct SocialTrendsProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { base_url: String, client: reqwest::Client },
}

impl SocialTrendsProvider {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            mode: Mode::Fixture(content.to_string()),
        }
    }

    pub fn from_url(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                client,
            },
        }
    }

    pub fn parse_page(html: &str) -> Result<Vec<RawCandidate>> {
        let scope = RE_FIRST_LIST
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(html);

        let mut out = Vec::new();
        for caps in RE_TREND_LINK.captures_iter(scope).take(MAX_ITEMS) {
            let Some(inner) = caps.get(1) else { continue };
            let keyword = strip_hashtag(inner.as_str());
            if keyword.is_empty() {
                continue;
            }
            let rank = out.len() as u32 + 1;
            let mut cand = RawCandidate::new(keyword, RawSignal::Rank(rank));
            cand.metadata = TopicMetadata {
                rank: Some(rank),
                links: RE_HREF
                    .captures(caps.get(0).map(|m| m.as_str()).unwrap_or_default())
                    .and_then(|h| h.get(1))
                    .map(|h| vec![h.as_str().to_string()])
                    .unwrap_or_default(),
                ..TopicMetadata::default()
            };
            out.push(cand);
        }

        if out.is_empty() {
            bail!("no trend entries found in social trends page");
        }
        Ok(out)
    }
}

fn strip_hashtag(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.trim().trim_start_matches('#').trim().to_string()
}

#[async_trait]
impl SourceProvider for SocialTrendsProvider {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawCandidate>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_page(s),
            Mode::Http { base_url, client } => {
                let slug = region_slug(&params.region);
                let url = format!("{}/{}", base_url.trim_end_matches('/'), slug);
                let resp = client
                    .get(&url)
                    .send()
                    .await
                    .context("social trends http get()")?;
                if !resp.status().is_success() {
                    bail!("social trends returned status {}", resp.status());
                }
                let body = resp.text().await.context("social trends http .text()")?;
                Self::parse_page(&body)
            }
        }
    }

    fn source(&self) -> TrendSource {
        TrendSource::SocialTrends
    }
}
