// src/generate/seo.rs
//! Stage 2: SEO metadata. Strict JSON first, then labeled-line scan, then defaults.
//! Nothing here returns an error.

use serde_json::Value;

use crate::generate::article::truncate_chars;
use crate::generate::types::SeoMetadata;

const META_TITLE_MAX: usize = 60;
const META_DESCRIPTION_MAX: usize = 160;
const MAX_KEYWORDS: usize = 10;

pub const SEO_SYSTEM_PROMPT: &str = "You are an SEO expert. You reply with a single JSON object \
and nothing else.";

pub fn seo_prompt(title: &str, excerpt: &str, keyword: &str) -> String {
    format!(
        "Create SEO metadata for this article.\n\n\
         Topic: {keyword}\n\
         Title: {title}\n\
         Excerpt: {excerpt}\n\n\
         Reply with JSON using exactly these keys:\n\
         {{\"metaTitle\": \"<max 60 chars>\", \"metaDescription\": \"<max 160 chars>\", \
         \"keywords\": [\"<5 to 8 keywords>\"], \"ogTitle\": \"...\", \"ogDescription\": \"...\"}}\n"
    )
}

/// Fields recovered from the reply; any may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialSeo {
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Vec<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
}

impl PartialSeo {
    fn is_empty(&self) -> bool {
        self.meta_title.is_none()
            && self.meta_description.is_none()
            && self.keywords.is_empty()
            && self.og_title.is_none()
            && self.og_description.is_none()
    }
}

/// How the metadata was obtained, for logs/metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeoParse {
    Json,
    Lines,
    Defaults,
}

fn string_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn split_keywords(s: &str) -> Vec<String> {
    s.split([',', ';', '\n'])
        .map(|k| k.trim().trim_matches(['"', '\'', '[', ']']).trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Strict structured parse: the outermost `{...}` of the reply as JSON.
pub fn parse_json(raw: &str) -> Option<PartialSeo> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let v: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let obj = v.as_object()?;

    let keywords = match obj.get("keywords").or_else(|| obj.get("meta_keywords")) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => split_keywords(s),
        _ => Vec::new(),
    };
    let out = PartialSeo {
        meta_title: string_field(obj, &["metaTitle", "meta_title", "title"]),
        meta_description: string_field(obj, &["metaDescription", "meta_description", "description"]),
        keywords,
        og_title: string_field(obj, &["ogTitle", "og_title"]),
        og_description: string_field(obj, &["ogDescription", "og_description"]),
    };
    (!out.is_empty()).then_some(out)
}

/// Fallback: scan for labeled lines such as `Meta Title: ...` (case-insensitive).
pub fn parse_lines(raw: &str) -> Option<PartialSeo> {
    let mut out = PartialSeo::default();
    for line in raw.lines() {
        let clean = line
            .trim()
            .trim_start_matches(['-', '*', '#', ' '])
            .replace("**", "");
        let Some((label, value)) = clean.split_once(':') else {
            continue;
        };
        let label = label.trim().trim_matches('"').to_lowercase().replace(['_', '-'], " ");
        let value = value.trim().trim_matches(['"', ',']).trim().to_string();
        if value.is_empty() {
            continue;
        }
        match label.as_str() {
            "meta title" | "metatitle" => out.meta_title = Some(value),
            "meta description" | "metadescription" => out.meta_description = Some(value),
            "keywords" | "meta keywords" => out.keywords = split_keywords(&value),
            "og title" | "ogtitle" => out.og_title = Some(value),
            "og description" | "ogdescription" => out.og_description = Some(value),
            _ => {}
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Parse a stage-2 reply; `None` reply means the call itself failed.
pub fn resolve_seo(
    reply: Option<&str>,
    title: &str,
    excerpt: &str,
    keyword: &str,
    tags: &[String],
) -> (SeoMetadata, SeoParse) {
    let (partial, how) = match reply {
        Some(raw) => match parse_json(raw) {
            Some(p) => (p, SeoParse::Json),
            None => match parse_lines(raw) {
                Some(p) => (p, SeoParse::Lines),
                None => (PartialSeo::default(), SeoParse::Defaults),
            },
        },
        None => (PartialSeo::default(), SeoParse::Defaults),
    };

    let meta_title = truncate_chars(
        &partial.meta_title.unwrap_or_else(|| title.to_string()),
        META_TITLE_MAX,
        "",
    );
    let meta_description = truncate_chars(
        &partial.meta_description.unwrap_or_else(|| excerpt.to_string()),
        META_DESCRIPTION_MAX,
        "...",
    );

    let mut keywords: Vec<String> = Vec::new();
    let defaults = std::iter::once(keyword.trim().to_lowercase()).chain(tags.iter().cloned());
    let source: Vec<String> = if partial.keywords.is_empty() {
        defaults.collect()
    } else {
        partial.keywords
    };
    for k in source {
        if !k.is_empty() && !keywords.contains(&k) {
            keywords.push(k);
        }
    }
    keywords.truncate(MAX_KEYWORDS);

    let og_title = partial.og_title.unwrap_or_else(|| meta_title.clone());
    let og_description = partial
        .og_description
        .unwrap_or_else(|| meta_description.clone());

    (
        SeoMetadata {
            meta_title,
            meta_description,
            keywords,
            og_title,
            og_description,
        },
        how,
    )
}
