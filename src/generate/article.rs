// src/generate/article.rs
//! Stage 1: article prompt and the section parser.
//!
//! Expected reply:
//! ```text
//! TITLE: ...
//! EXCERPT: ...
//! TAGS: a, b, c
//! CONTENT:
//! ...
//! ```
//! Markers are matched case-insensitively and may be wrapped in markdown (`**TITLE:**`,
//! `## Content`). Whatever is missing is filled by the fallback heuristics below.

use crate::ingest::types::TopicCandidate;

pub const EXCERPT_MAX_CHARS: usize = 200;
const TITLE_MAX_CHARS: usize = 120;
const MIN_TITLE_CHARS: usize = 10;

pub const ARTICLE_SYSTEM_PROMPT: &str = "You are an experienced news writer. You write accurate, \
well-structured, original articles in Markdown for a general audience. Never invent quotes. \
Always answer in exactly the requested labeled format.";

pub fn article_prompt(topic: &TopicCandidate, category: &str, word_count: u32, tone: &str) -> String {
    let mut p = String::with_capacity(1_024);
    p.push_str("Write an article about a currently trending topic.\n\n");
    p.push_str(&format!("Topic: {}\n", topic.keyword));
    p.push_str(&format!("Category: {category}\n"));
    if let Some(meta) = &topic.metadata {
        if !meta.related_queries.is_empty() {
            let related: Vec<&str> = meta.related_queries.iter().take(5).map(String::as_str).collect();
            p.push_str(&format!("Related searches: {}\n", related.join("; ")));
        }
    }
    p.push_str(&format!(
        "\nRequirements:\n\
         - Length: about {word_count} words in the CONTENT section.\n\
         - Tone: {tone}.\n\
         - Use Markdown subheadings (##) inside CONTENT.\n\
         - 3 to 6 short, lowercase tags.\n\n\
         Reply in exactly this format:\n\
         TITLE: <a compelling headline>\n\
         EXCERPT: <one or two sentences summarizing the article>\n\
         TAGS: <tag1>, <tag2>, <tag3>\n\
         CONTENT:\n\
         <the full article>\n"
    ));
    p
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Title,
    Excerpt,
    Tags,
    Content,
}

/// Marker-based parse result. `None` / empty means the section was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArticle {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub content: Option<String>,
    /// Lines that appeared before any marker.
    pub preamble: String,
}

/// Recognize a section marker; returns the section and the rest of the line.
/// Inside CONTENT only a non-heading `LABEL:` line switches sections; `## Tags` stays body.
fn match_marker_in(current: Section, line: &str) -> Option<(Section, &str)> {
    let (section, rest, explicit) = match_marker_inner(line)?;
    if current == Section::Content && (!explicit || line.trim_start().starts_with('#')) {
        return None;
    }
    Some((section, rest))
}

/// `(section, rest, has_colon)`.
fn match_marker_inner(line: &str) -> Option<(Section, &str, bool)> {
    let stripped = line
        .trim()
        .trim_start_matches(|c: char| c == '#' || c == '*' || c == '_' || c.is_whitespace());
    let markers = [
        ("TITLE", Section::Title),
        ("EXCERPT", Section::Excerpt),
        ("TAGS", Section::Tags),
        ("CONTENT", Section::Content),
    ];
    for (name, section) in markers {
        let Some(head) = stripped.get(..name.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(name) {
            continue;
        }
        let rest = stripped[name.len()..].trim_start_matches(['*', '_']);
        if rest.is_empty() {
            return Some((section, "", false));
        }
        if let Some(after) = rest.strip_prefix(':') {
            return Some((section, after.trim_start_matches(['*', '_']).trim(), true));
        }
    }
    None
}

pub fn parse_sections(raw: &str) -> ParsedArticle {
    let mut current = Section::Preamble;
    let mut title = String::new();
    let mut excerpt = String::new();
    let mut tags = String::new();
    let mut content = String::new();
    let mut preamble = String::new();

    for line in raw.lines() {
        let text = match match_marker_in(current, line) {
            Some((section, rest)) => {
                current = section;
                if rest.is_empty() {
                    continue;
                }
                rest
            }
            None => line,
        };
        let buf = match current {
            Section::Preamble => &mut preamble,
            Section::Title => &mut title,
            Section::Excerpt => &mut excerpt,
            Section::Tags => &mut tags,
            Section::Content => &mut content,
        };
        buf.push_str(text);
        buf.push('\n');
    }

    let title = title
        .lines()
        .map(clean_heading)
        .find(|l| !l.is_empty());
    let excerpt = Some(excerpt.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|e| !e.is_empty());
    let content = Some(content.trim().to_string()).filter(|c| !c.is_empty());

    ParsedArticle {
        title,
        excerpt,
        tags: split_tags(&tags),
        content,
        preamble: preamble.trim().to_string(),
    }
}

fn split_tags(s: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in s.split([',', '\n', ';']) {
        let tag = t
            .trim()
            .trim_start_matches(['-', '*', '#'])
            .trim()
            .trim_matches('"')
            .to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Strip markdown heading/emphasis and surrounding quotes.
fn clean_heading(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches(|c: char| c == '*' || c == '_' || c == '"')
        .trim()
        .to_string()
}

/// Title fallback: first heading, else first substantial line.
pub fn derive_title(body: &str) -> Option<String> {
    let heading = body
        .lines()
        .find(|l| l.trim_start().starts_with('#'))
        .map(clean_heading)
        .filter(|h| !h.is_empty());
    let title = heading.or_else(|| {
        body.lines()
            .map(clean_heading)
            .find(|l| l.chars().count() >= MIN_TITLE_CHARS)
    })?;
    Some(truncate_chars(&title, TITLE_MAX_CHARS, ""))
}

/// Excerpt fallback: first non-heading paragraph, capped with an ellipsis.
pub fn derive_excerpt(body: &str, title: &str) -> Option<String> {
    let mut paragraph: Vec<&str> = Vec::new();
    let flush = |para: &mut Vec<&str>| -> Option<String> {
        let joined = para.join(" ");
        para.clear();
        let clean = joined.split_whitespace().collect::<Vec<_>>().join(" ");
        if clean.is_empty() || clean.eq_ignore_ascii_case(title) {
            None
        } else {
            Some(clean)
        }
    };
    for line in body.lines() {
        let l = line.trim();
        if l.is_empty() || l.starts_with('#') {
            if let Some(p) = flush(&mut paragraph) {
                return Some(truncate_chars(&p, EXCERPT_MAX_CHARS, "..."));
            }
            continue;
        }
        paragraph.push(l);
    }
    flush(&mut paragraph).map(|p| truncate_chars(&p, EXCERPT_MAX_CHARS, "..."))
}

/// Tag fallback: the keyword itself plus its significant words (len > 3).
pub fn derive_tags(keyword: &str) -> Vec<String> {
    let lower = keyword.trim().to_lowercase();
    let mut out = Vec::new();
    if !lower.is_empty() {
        out.push(lower.clone());
    }
    for w in lower.split(|c: char| !c.is_alphanumeric()) {
        if w.chars().count() > 3 && !out.iter().any(|t| t == w) {
            out.push(w.to_string());
        }
    }
    out
}

/// Truncate to `max` chars, preferring a word boundary, appending `marker` when cut.
pub fn truncate_chars(s: &str, max: usize, marker: &str) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(marker.chars().count());
    let cut: String = s.chars().take(keep).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > keep / 2 => cut[..idx].to_string(),
        _ => cut,
    };
    format!("{}{marker}", cut.trim_end_matches(|c: char| c.is_whitespace() || c == ','))
}
