//! Cheap pre-ranking that decides which candidates are worth an LLM call.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::debug;

use platewise_common::PlaceCandidate;

/// Candidates kept after pre-ranking.
pub const SHORTLIST_SIZE: usize = 10;

/// Keywords derived from a dish name: the dish itself, its singular/plural
/// counterpart, and the first word when the name has several.
pub fn dish_keywords(dish: &str) -> Vec<String> {
    let dish = dish.trim().to_lowercase();
    if dish.is_empty() {
        return Vec::new();
    }

    let mut keywords = BTreeSet::new();
    let counterpart = match dish.strip_suffix('s') {
        Some(singular) if !singular.is_empty() => singular.to_string(),
        _ => format!("{dish}s"),
    };
    keywords.insert(counterpart);

    let mut words = dish.split_whitespace();
    if let (Some(first), Some(_)) = (words.next(), words.next()) {
        keywords.insert(first.to_string());
    }
    keywords.insert(dish);

    keywords.into_iter().collect()
}

fn keyword_patterns(keywords: &[String]) -> Vec<Regex> {
    keywords
        .iter()
        .filter_map(|k| Regex::new(&format!(r"\b{}\b", regex::escape(k))).ok())
        .collect()
}

/// Whole-word keyword hits across a candidate's non-empty reviews.
fn count_keywords(candidate: &PlaceCandidate, patterns: &[Regex]) -> u32 {
    let text = candidate
        .written_reviews()
        .map(|r| r.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return 0;
    }
    patterns
        .iter()
        .map(|p| p.find_iter(&text).count() as u32)
        .sum()
}

/// Score and shortlist candidates for a dish.
///
/// Candidates are first stable-sorted by rating so ties in the combined score
/// fall back to rating order, then ranked by
/// `rating * (1 + keyword_count / 10)` and truncated to [`SHORTLIST_SIZE`].
pub fn rank(mut candidates: Vec<PlaceCandidate>, dish: &str) -> Vec<PlaceCandidate> {
    candidates.sort_by(|a, b| b.rating.total_cmp(&a.rating));

    let patterns = keyword_patterns(&dish_keywords(dish));
    for candidate in &mut candidates {
        candidate.keyword_count = count_keywords(candidate, &patterns);
        candidate.combined_score = candidate.rating * (1.0 + candidate.keyword_count as f64 / 10.0);
    }

    candidates.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    candidates.truncate(SHORTLIST_SIZE);

    debug!(
        dish,
        shortlisted = candidates.len(),
        top = candidates.first().map(|c| c.name.as_str()).unwrap_or_default(),
        "Candidates ranked"
    );
    candidates
}
