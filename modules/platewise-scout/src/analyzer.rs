//! Per-restaurant LLM analysis and the single-restaurant summary.
//!
//! Model output is untrusted: after fence stripping it must parse as the
//! documented JSON shape, otherwise the unit falls back to a degraded record.
//! Nothing in here returns an error to the caller.

use std::sync::Arc;

use ai_client::{strip_code_blocks, truncate_to_char_boundary};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use platewise_common::{AnalyzedCandidate, DishAnalysis, DishQuality, PlaceCandidate, PlatewiseError, Review};

use crate::prompts;
use crate::traits::Summarizer;

/// Restaurants kept after analysis.
pub const FINAL_SIZE: usize = 5;

/// `ai_score` for a reply that did not parse.
pub const PARSE_FAILURE_SCORE: f64 = 3.0;

/// `ai_score` for a summarizer call that failed outright.
pub const CALL_FAILURE_SCORE: f64 = 2.0;

const LOG_PREVIEW_BYTES: usize = 200;

/// Parse a model reply into a verdict, after stripping code fences.
pub fn parse_verdict(raw: &str) -> Result<DishAnalysis, PlatewiseError> {
    let body = strip_code_blocks(raw);
    serde_json::from_str::<DishAnalysis>(body).map_err(|e| PlatewiseError::SummarizerParse(e.to_string()))
}

/// Ranking key for an analysed restaurant.
///
/// A positive `recommendation_score` (clamped to 0..=10) wins; otherwise the
/// quality lookup applies. Restaurants that don't serve the dish are halved.
pub fn ai_score(analysis: &DishAnalysis) -> f64 {
    let score = match analysis.recommendation_score {
        Some(s) if s.is_finite() && s > 0.0 => s.min(10.0),
        _ => analysis.dish_quality.base_score(),
    };
    if analysis.serves_dish {
        score
    } else {
        score / 2.0
    }
}

fn degraded(place: PlaceCandidate, dish: &str, ai_score: f64) -> AnalyzedCandidate {
    AnalyzedCandidate {
        place,
        analysis: DishAnalysis {
            serves_dish: false,
            dish_quality: DishQuality::Unknown,
            dish_description: format!("Could not analyze {dish} for this restaurant."),
            key_points: Vec::new(),
            recommendation: format!("No {dish} recommendation available."),
            recommendation_score: None,
        },
        ai_score,
    }
}

/// Analyse one candidate. Always yields a record.
pub async fn analyze_candidate(
    summarizer: &dyn Summarizer,
    place: PlaceCandidate,
    dish: &str,
) -> AnalyzedCandidate {
    let prompt = prompts::dish_verdict_prompt(&place, dish);

    let raw = match summarizer.summarize(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(place = %place.name, error = %e, "Summarizer call failed, degrading candidate");
            return degraded(place, dish, CALL_FAILURE_SCORE);
        }
    };

    match parse_verdict(&raw) {
        Ok(analysis) => {
            let score = ai_score(&analysis);
            AnalyzedCandidate {
                place,
                analysis,
                ai_score: score,
            }
        }
        Err(e) => {
            warn!(
                place = %place.name,
                error = %e,
                preview = truncate_to_char_boundary(&raw, LOG_PREVIEW_BYTES),
                "Unparseable verdict, degrading candidate"
            );
            degraded(place, dish, PARSE_FAILURE_SCORE)
        }
    }
}

/// Analyse every shortlisted candidate concurrently and keep the best
/// [`FINAL_SIZE`].
///
/// Each unit runs as its own spawned task, so a slow, failing, or panicking
/// unit never cancels another. All units are awaited before ranking. Sorting
/// is stable, so equal scores keep shortlist order.
pub async fn analyze_all(
    summarizer: Arc<dyn Summarizer>,
    shortlist: Vec<PlaceCandidate>,
    dish: &str,
) -> Vec<AnalyzedCandidate> {
    let units = shortlist.iter().cloned().map(|place| {
        let summarizer = summarizer.clone();
        let dish = dish.to_string();
        tokio::spawn(async move { analyze_candidate(summarizer.as_ref(), place, &dish).await })
    });

    let joined = join_all(units).await;

    let mut analyzed: Vec<AnalyzedCandidate> = joined
        .into_iter()
        .zip(shortlist)
        .map(|(outcome, place)| match outcome {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(place = %place.name, error = %e, "Analysis unit aborted, degrading candidate");
                degraded(place, dish, CALL_FAILURE_SCORE)
            }
        })
        .collect();

    info!(dish, units = analyzed.len(), "Candidate analysis joined");

    analyzed.sort_by(|a, b| b.ai_score.total_cmp(&a.ai_score));
    analyzed.truncate(FINAL_SIZE);
    analyzed
}

// --- Single-restaurant summary ---

/// Outcome of the single-restaurant summary. Failures are embedded in the
/// task result rather than failing the task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RestaurantSummary {
    Analysis(serde_json::Value),
    Degraded {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_response: Option<String>,
    },
}

impl RestaurantSummary {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RestaurantSummary::Degraded { .. })
    }
}

/// Summarise the standout dishes of one restaurant.
pub async fn summarize_restaurant(
    summarizer: &dyn Summarizer,
    restaurant_name: &str,
    reviews: &[Review],
) -> RestaurantSummary {
    let prompt = prompts::top_dishes_prompt(restaurant_name, reviews);

    let raw = match summarizer.summarize(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(restaurant = restaurant_name, error = %e, "Summarizer call failed");
            return RestaurantSummary::Degraded {
                error: format!("Failed to analyze reviews: {e}"),
                raw_response: None,
            };
        }
    };

    match serde_json::from_str::<serde_json::Value>(strip_code_blocks(&raw)) {
        Ok(value) if value.is_object() => RestaurantSummary::Analysis(value),
        _ => {
            warn!(
                restaurant = restaurant_name,
                preview = truncate_to_char_boundary(&raw, LOG_PREVIEW_BYTES),
                "Summary reply is not a JSON object"
            );
            RestaurantSummary::Degraded {
                error: "Failed to parse summarizer response as JSON".to_string(),
                raw_response: Some(raw),
            }
        }
    }
}
