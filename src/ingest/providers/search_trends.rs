// src/ingest/providers/search_trends.rs
//! Ranked search-trends feed (daily trending searches RSS).
//!
//! `ht:approx_traffic` ("200,000+") becomes the raw traffic signal; news item URLs become
//! reference links.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::scoring::parse_traffic;
use crate::ingest::types::{
    FetchParams, RawCandidate, RawSignal, SourceProvider, TopicMetadata, TrendSource,
};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "ht:approx_traffic", alias = "approx_traffic")]
    approx_traffic: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "ht:news_item", alias = "news_item", default)]
    news_item: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    #[serde(rename = "ht:news_item_title", alias = "news_item_title")]
    title: Option<String>,
    #[serde(rename = "ht:news_item_url", alias = "news_item_url")]
    url: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

pub struct SearchTrendsProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { base_url: String, client: reqwest::Client },
}

impl SearchTrendsProvider {
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

    pub fn parse_feed(xml: &str) -> Result<Vec<RawCandidate>> {
        let clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&clean).context("parsing search trends rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for (idx, it) in rss.channel.item.into_iter().enumerate() {
            let Some(title) = it.title.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            let traffic = it.approx_traffic.as_deref().and_then(parse_traffic);
            let mut cand = RawCandidate::new(title, RawSignal::Traffic(traffic.unwrap_or(0)));
            cand.metadata = TopicMetadata {
                related_queries: it.news_item.iter().filter_map(|n| n.title.clone()).collect(),
                links: it.news_item.into_iter().filter_map(|n| n.url).collect(),
                rank: Some(idx as u32 + 1),
                traffic,
                upvotes: None,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
            };
            out.push(cand);
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for SearchTrendsProvider {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawCandidate>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_feed(s),
            Mode::Http { base_url, client } => {
                let resp = client
                    .get(base_url)
                    .query(&[("geo", params.region.as_str())])
                    .send()
                    .await
                    .context("search trends http get()")?;
                if !resp.status().is_success() {
                    bail!("search trends returned status {}", resp.status());
                }
                let body = resp.text().await.context("search trends http .text()")?;
                Self::parse_feed(&body)
            }
        }
    }

    fn source(&self) -> TrendSource {
        TrendSource::SearchTrends
    }
}
