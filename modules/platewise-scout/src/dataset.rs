//! Turns raw crawler records into one coherent candidate list.

use std::collections::HashMap;

use apify_client::PlaceItem;
use tracing::debug;

use platewise_common::{PlaceCandidate, Review};

/// Merge crawler records into candidates, keyed by place name.
///
/// Works for both dataset shapes: place records carrying a nested `reviews`
/// list, and place records followed by flattened review records. Place
/// records are folded in a first pass (repeat records for the same name fill
/// in missing metadata and append reviews); review records are attached in a
/// second pass to the candidate with the same name. Review records naming an
/// unknown place are dropped. Output keeps first-seen order.
pub fn merge_items(items: Vec<PlaceItem>) -> Vec<PlaceCandidate> {
    let mut candidates: Vec<PlaceCandidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut review_records = Vec::new();

    for item in items {
        if item.is_review_record() {
            review_records.push(item);
            continue;
        }
        let Some(name) = item.place_name().map(str::to_string) else {
            debug!("Skipping place record without a name");
            continue;
        };
        let key = name_key(&name);
        match index.get(&key) {
            Some(&i) => absorb_place(&mut candidates[i], item),
            None => {
                index.insert(key, candidates.len());
                candidates.push(new_candidate(name, item));
            }
        }
    }

    let mut orphans = 0usize;
    for item in review_records {
        let target = item.place_name().map(name_key).and_then(|k| index.get(&k).copied());
        match target {
            Some(i) => candidates[i].reviews.push(Review::new(item.text, item.stars)),
            None => orphans += 1,
        }
    }
    if orphans > 0 {
        debug!(orphans, "Dropped review records with no matching place");
    }

    candidates
}

/// All reviews from a single-place lookup, in dataset order, plus the scraped
/// place name if any record carried one. Each named record overwrites the
/// name, so the last one wins.
pub fn collect_lookup(items: Vec<PlaceItem>) -> (Option<String>, Vec<Review>) {
    let mut name = None;
    let mut reviews = Vec::new();
    for item in items {
        if let Some(n) = item.place_name() {
            name = Some(n.to_string());
        }
        if item.is_review_record() {
            reviews.push(Review::new(item.text, item.stars));
        } else if let Some(nested) = item.reviews {
            reviews.extend(nested.into_iter().map(|r| Review::new(r.text, r.stars)));
        }
    }
    (name, reviews)
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn new_candidate(name: String, item: PlaceItem) -> PlaceCandidate {
    PlaceCandidate {
        name,
        address: item.address.unwrap_or_default(),
        rating: item.total_score.unwrap_or(0.0),
        review_count: item.reviews_count.unwrap_or(0),
        url: item.url.unwrap_or_default(),
        reviews: item
            .reviews
            .unwrap_or_default()
            .into_iter()
            .map(|r| Review::new(r.text, r.stars))
            .collect(),
        keyword_count: 0,
        combined_score: 0.0,
    }
}

fn absorb_place(existing: &mut PlaceCandidate, item: PlaceItem) {
    if existing.address.is_empty() {
        existing.address = item.address.unwrap_or_default();
    }
    if existing.rating == 0.0 {
        existing.rating = item.total_score.unwrap_or(0.0);
    }
    if existing.review_count == 0 {
        existing.review_count = item.reviews_count.unwrap_or(0);
    }
    if existing.url.is_empty() {
        existing.url = item.url.unwrap_or_default();
    }
    if let Some(reviews) = item.reviews {
        existing
            .reviews
            .extend(reviews.into_iter().map(|r| Review::new(r.text, r.stars)));
    }
}
