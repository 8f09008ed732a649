use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId", default)]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// A start URL entry for crawler input.
#[derive(Debug, Clone, Serialize)]
pub struct StartUrl {
    pub url: String,
}

// --- Google Places crawler (compass/crawler-google-places) ---

/// Input for crawling one known place by its URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceLookupInput {
    pub start_urls: Vec<StartUrl>,
    pub max_reviews: u32,
    pub reviews_sort: String,
    pub scrape_reviews_personal_data: bool,
    pub language: String,
}

impl PlaceLookupInput {
    pub fn new(url: &str, max_reviews: u32, language: &str) -> Self {
        Self {
            start_urls: vec![StartUrl {
                url: url.to_string(),
            }],
            max_reviews,
            reviews_sort: "highestRanking".to_string(),
            scrape_reviews_personal_data: false,
            language: language.to_string(),
        }
    }
}

/// Input for a keyword search around a location.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSearchInput {
    pub search_strings_array: Vec<String>,
    pub location_query: String,
    pub max_crawled_places_per_search: u32,
    pub max_reviews: u32,
    pub reviews_sort: String,
    pub scrape_reviews_personal_data: bool,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_geolocation: Option<CustomGeolocation>,
}

/// GeoJSON point with a search radius, as accepted by the crawler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGeolocation {
    #[serde(rename = "type")]
    pub geo_type: String,
    /// `[longitude, latitude]`, GeoJSON order.
    pub coordinates: [f64; 2],
    pub radius_km: u32,
}

impl CustomGeolocation {
    pub fn point(latitude: f64, longitude: f64, radius_km: u32) -> Self {
        Self {
            geo_type: "Point".to_string(),
            coordinates: [longitude, latitude],
            radius_km,
        }
    }
}

/// One record from the crawler dataset.
///
/// Depending on actor settings a record is either a place (metadata plus a nested
/// `reviews` list) or a single review flattened next to the place title.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceItem {
    pub title: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub total_score: Option<f64>,
    pub reviews_count: Option<u64>,
    pub url: Option<String>,
    pub place_id: Option<String>,
    pub category_name: Option<String>,
    pub reviews: Option<Vec<PlaceReview>>,
    pub text: Option<String>,
    pub stars: Option<f64>,
}

impl PlaceItem {
    /// Place name, preferring the crawler's `title` over the legacy `name` field.
    pub fn place_name(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }

    /// True for flattened review records (no nested list, but review fields at top level).
    pub fn is_review_record(&self) -> bool {
        self.reviews.is_none() && (self.text.is_some() || self.stars.is_some())
    }
}

/// A review nested inside a place record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceReview {
    pub text: Option<String>,
    pub stars: Option<f64>,
    pub published_at_date: Option<String>,
}
