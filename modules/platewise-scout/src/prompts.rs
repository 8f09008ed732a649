use std::fmt::Write;

use ai_client::truncate_to_char_boundary;

use platewise_common::{PlaceCandidate, Review};

/// Per-review cap so one long review can't crowd out the rest of the prompt.
const MAX_REVIEW_BYTES: usize = 1_200;

/// Reviews fed to the single-restaurant summary.
pub const LOOKUP_REVIEW_LIMIT: usize = 10;

/// Prompt asking whether one restaurant serves a dish and how good it is.
pub fn dish_verdict_prompt(candidate: &PlaceCandidate, dish: &str) -> String {
    let mut reviews = String::new();
    for (i, review) in candidate.written_reviews().enumerate() {
        let _ = writeln!(
            reviews,
            "Review {} ({} stars): {}",
            i + 1,
            review.stars,
            truncate_to_char_boundary(review.text.trim(), MAX_REVIEW_BYTES)
        );
    }
    if reviews.is_empty() {
        reviews.push_str("(no written reviews)\n");
    }

    format!(
        r#"You are a food critic judging one restaurant for a diner who wants {dish}.

Restaurant: {name}
Address: {address}
Rating: {rating:.1} ({review_count} reviews)

Reviews:
{reviews}
Using only the reviews above, answer with a single JSON object:
{{
    "serves_dish": true or false,
    "dish_quality": "excellent" | "good" | "average" | "poor" | "unknown",
    "dish_description": "what reviewers say about the {dish} here",
    "key_points": ["2-3 short points about the {dish}"],
    "recommendation": "one sentence on whether to order {dish} here",
    "recommendation_score": number from 0 to 10
}}

Use "unknown" and a low score when the reviews never mention {dish}.
Return only the JSON object, no markdown and no code fences."#,
        dish = dish,
        name = candidate.name,
        address = if candidate.address.is_empty() { "unknown" } else { candidate.address.as_str() },
        rating = candidate.rating,
        review_count = candidate.review_count,
        reviews = reviews,
    )
}

/// Prompt asking for the standout dishes of one restaurant.
pub fn top_dishes_prompt(restaurant_name: &str, reviews: &[Review]) -> String {
    let mut listing = String::new();
    for (i, review) in reviews.iter().enumerate() {
        let _ = writeln!(
            listing,
            "Review {} ({} stars): {}",
            i + 1,
            review.stars,
            truncate_to_char_boundary(review.text.trim(), MAX_REVIEW_BYTES)
        );
    }

    format!(
        r#"You are a food critic. Read these reviews of {restaurant_name} and identify the five dishes reviewers praise most.

Reviews:
{listing}
Answer with a single JSON object:
{{
    "top_dishes": [
        {{
            "name": "dish name",
            "description": "short description",
            "recommended_with": "anything reviewers pair it with, or empty",
            "key_points": ["2-3 points reviewers praise"]
        }}
    ],
    "best_dish": {{
        "name": "the single best dish",
        "description": "why it stands out",
        "recommended_with": "anything reviewers pair it with, or empty",
        "key_points": ["2-3 points reviewers praise"]
    }},
    "summary": "2-3 sentences on the restaurant's strengths"
}}

Prefer dishes mentioned often or with specific praise, and note pairings reviewers suggest.
Return only the JSON object, no markdown and no code fences."#
    )
}
