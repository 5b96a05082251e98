// src/ingest/scoring.rs
//! Source-specific score normalization and best-effort categorization.
//!
//! Scores land in `[0, 100]`:
//! - search-trends: bucketed traffic thresholds (`ScoringConfig::traffic_buckets`)
//! - social-trends: `max(start - step * rank, floor)`
//! - link-aggregator: `min(upvotes / divisor, cap)`

use crate::config::ScoringConfig;
use crate::ingest::types::RawSignal;

pub const GENERAL_CATEGORY: &str = "general";

pub fn score_signal(signal: RawSignal, cfg: &ScoringConfig) -> f64 {
    let raw = match signal {
        RawSignal::Traffic(traffic) => cfg
            .traffic_buckets
            .iter()
            .find(|b| traffic >= b.min_traffic)
            .map(|b| b.score)
            .unwrap_or(cfg.traffic_floor),
        RawSignal::Rank(pos) => (cfg.rank_start - cfg.rank_step * pos as f64).max(cfg.rank_floor),
        RawSignal::Upvotes(ups) => (ups as f64 / cfg.upvote_divisor).min(cfg.upvote_cap),
        RawSignal::Score(s) => s,
    };
    if raw.is_finite() {
        raw.max(0.0)
    } else {
        0.0
    }
}

/// Parse traffic strings such as `"200,000+"`, `"2M+"` or `"50K+"`.
pub fn parse_traffic(raw: &str) -> Option<u64> {
    let s = raw.trim().trim_end_matches('+').replace([',', ' '], "");
    if s.is_empty() {
        return None;
    }
    let (num, mult) = match s.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&s[..s.len() - 1], 1_000f64),
        Some('M') => (&s[..s.len() - 1], 1_000_000f64),
        Some('B') => (&s[..s.len() - 1], 1_000_000_000f64),
        _ => (s.as_str(), 1f64),
    };
    let v: f64 = num.parse().ok()?;
    if v < 0.0 {
        return None;
    }
    Some((v * mult).round() as u64)
}

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "technology",
        &[
            "ai", "artificial", "intelligence", "apple", "google", "microsoft", "iphone",
            "android", "software", "app", "tech", "computing", "quantum", "chip", "openai",
            "crypto", "bitcoin", "robot", "cyber", "startup", "gpu", "nvidia", "tesla",
        ],
    ),
    (
        "business",
        &[
            "stock", "stocks", "market", "economy", "earnings", "inflation", "bank", "merger",
            "ipo", "fed", "rates", "dow", "nasdaq", "trade", "tariff", "layoffs",
        ],
    ),
    (
        "science",
        &[
            "nasa", "space", "climate", "research", "physics", "asteroid", "eclipse", "moon",
            "mars", "scientists", "study", "fossil", "rocket",
        ],
    ),
    (
        "health",
        &[
            "health", "covid", "vaccine", "virus", "disease", "cancer", "outbreak", "fda",
            "medical", "hospital", "flu",
        ],
    ),
    (
        "sports",
        &[
            "nfl", "nba", "mlb", "nhl", "fifa", "football", "soccer", "basketball", "baseball",
            "tennis", "golf", "olympics", "playoffs", "vs", "championship", "league", "cup",
        ],
    ),
    (
        "entertainment",
        &[
            "movie", "film", "album", "netflix", "concert", "tour", "oscars", "grammy", "trailer",
            "series", "season", "actor", "singer", "celebrity", "music",
        ],
    ),
    (
        "politics",
        &[
            "election", "senate", "congress", "president", "vote", "governor", "campaign",
            "parliament", "minister", "bill", "court", "supreme",
        ],
    ),
];

/// Keyword-list heuristic; first category with the most word hits wins, else `general`.
pub fn classify_keyword(keyword: &str) -> String {
    let words: Vec<String> = keyword
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    let mut best: Option<(&str, usize)> = None;
    for (category, needles) in CATEGORY_KEYWORDS {
        let hits = words.iter().filter(|w| needles.contains(&w.as_str())).count();
        if hits > 0 && best.map(|(_, n)| hits > n).unwrap_or(true) {
            best = Some((category, hits));
        }
    }
    best.map(|(c, _)| c.to_string())
        .unwrap_or_else(|| GENERAL_CATEGORY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_buckets_and_floor() {
        let cfg = ScoringConfig::default();
        assert_eq!(score_signal(RawSignal::Traffic(2_000_000), &cfg), 100.0);
        assert_eq!(score_signal(RawSignal::Traffic(500_000), &cfg), 90.0);
        assert_eq!(score_signal(RawSignal::Traffic(1_000), &cfg), 40.0);
        assert_eq!(score_signal(RawSignal::Traffic(999), &cfg), 30.0);
    }

    #[test]
    fn rank_decay_bottoms_out() {
        let cfg = ScoringConfig::default();
        assert_eq!(score_signal(RawSignal::Rank(1), &cfg), 95.0);
        assert_eq!(score_signal(RawSignal::Rank(10), &cfg), 50.0);
        assert_eq!(score_signal(RawSignal::Rank(40), &cfg), 10.0);
    }

    #[test]
    fn upvotes_are_capped() {
        let cfg = ScoringConfig::default();
        assert_eq!(score_signal(RawSignal::Upvotes(4_250), &cfg), 42.5);
        assert_eq!(score_signal(RawSignal::Upvotes(75_000), &cfg), 100.0);
    }

    #[test]
    fn negative_manual_scores_clamp_to_zero() {
        let cfg = ScoringConfig::default();
        assert_eq!(score_signal(RawSignal::Score(-3.0), &cfg), 0.0);
        assert_eq!(score_signal(RawSignal::Score(f64::NAN), &cfg), 0.0);
    }

    #[test]
    fn traffic_strings() {
        assert_eq!(parse_traffic("200,000+"), Some(200_000));
        assert_eq!(parse_traffic("2M+"), Some(2_000_000));
        assert_eq!(parse_traffic("50K+"), Some(50_000));
        assert_eq!(parse_traffic(""), None);
        assert_eq!(parse_traffic("lots"), None);
    }

    #[test]
    fn classify_uses_word_hits() {
        assert_eq!(classify_keyword("Quantum Computing"), "technology");
        assert_eq!(classify_keyword("Lakers vs Celtics"), "sports");
        assert_eq!(classify_keyword("Grandma's recipe"), GENERAL_CATEGORY);
    }
}
