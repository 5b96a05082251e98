// src/ingest/providers/link_aggregator.rs
//! Ranked link-aggregator feed: "hot" listings of a few communities, upvotes as signal.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::types::{
    FetchParams, RawCandidate, RawSignal, SourceProvider, TopicMetadata, TrendSource,
};

const LISTING_LIMIT: u32 = 25;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    #[serde(default)]
    ups: i64,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    over_18: bool,
}

/// Community name -> category hint.
fn community_category(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "technology" | "programming" | "gadgets" | "futurology" => Some("technology"),
        "science" | "space" => Some("science"),
        "worldnews" | "news" | "politics" => Some("politics"),
        "business" | "economics" | "stocks" => Some("business"),
        "sports" | "nba" | "nfl" | "soccer" => Some("sports"),
        "movies" | "music" | "television" | "gaming" => Some("entertainment"),
        "health" => Some("health"),
        _ => None,
    }
}

pub struct LinkAggregatorProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        communities: Vec<String>,
        client: reqwest::Client,
    },
}

impl LinkAggregatorProvider {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            mode: Mode::Fixture(content.to_string()),
        }
    }

    pub fn from_url(
        base_url: impl Into<String>,
        communities: Vec<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                communities,
                client,
            },
        }
    }

    pub fn parse_listing(json: &str) -> Result<Vec<RawCandidate>> {
        let listing: Listing =
            serde_json::from_str(json).context("parsing link aggregator listing json")?;
        let mut out = Vec::with_capacity(listing.data.children.len());
        for (idx, child) in listing.data.children.into_iter().enumerate() {
            let post = child.data;
            if post.stickied || post.over_18 || post.title.trim().is_empty() {
                continue;
            }
            let ups = post.ups.max(0) as u64;
            let mut cand = RawCandidate::new(post.title, RawSignal::Upvotes(ups));
            cand.category = post
                .subreddit
                .as_deref()
                .and_then(community_category)
                .map(str::to_string);
            cand.metadata = TopicMetadata {
                links: post
                    .permalink
                    .map(|p| format!("https://www.reddit.com{p}"))
                    .into_iter()
                    .chain(post.url)
                    .collect(),
                rank: Some(idx as u32 + 1),
                upvotes: Some(ups),
                ..TopicMetadata::default()
            };
            out.push(cand);
        }
        Ok(out)
    }

    async fn fetch_community(
        client: &reqwest::Client,
        base_url: &str,
        community: &str,
    ) -> Result<Vec<RawCandidate>> {
        let url = format!(
            "{}/r/{}/hot.json",
            base_url.trim_end_matches('/'),
            community
        );
        let resp = client
            .get(&url)
            .query(&[("limit", LISTING_LIMIT)])
            .send()
            .await
            .with_context(|| format!("link aggregator http get() for {community}"))?;
        if !resp.status().is_success() {
            bail!("link aggregator returned status {} for {community}", resp.status());
        }
        let body = resp.text().await.context("link aggregator http .text()")?;
        Self::parse_listing(&body)
    }
}

#[async_trait]
impl SourceProvider for LinkAggregatorProvider {
    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<RawCandidate>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_listing(s),
            Mode::Http {
                base_url,
                communities,
                client,
            } => {
                let mut out = Vec::new();
                let mut errors = 0usize;
                for community in communities {
                    match Self::fetch_community(client, base_url, community).await {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => {
                            errors += 1;
                            tracing::warn!(target: "trends", error = ?e, community = %community, "community fetch failed");
                        }
                    }
                }
                if errors > 0 && errors == communities.len() {
                    bail!("all {errors} link aggregator communities failed");
                }
                Ok(out)
            }
        }
    }

    fn source(&self) -> TrendSource {
        TrendSource::LinkAggregator
    }
}
