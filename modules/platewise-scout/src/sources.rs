use ai_client::Gemini;
use apify_client::{ApifyClient, CustomGeolocation, PlaceItem, PlaceLookupInput, PlaceSearchInput};
use async_trait::async_trait;
use tracing::info;

use platewise_common::error::Result;
use platewise_common::{Config, DishSearch, PlatewiseError};

use crate::traits::{ReviewSource, Summarizer};

/// Crawl limits applied to every review-source run.
#[derive(Debug, Clone)]
pub struct ScrapeLimits {
    pub lookup_max_reviews: u32,
    pub search_max_places: u32,
    pub search_max_reviews: u32,
    pub language: String,
}

impl ScrapeLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lookup_max_reviews: config.lookup_max_reviews,
            search_max_places: config.search_max_places,
            search_max_reviews: config.search_max_reviews,
            language: config.scrape_language.clone(),
        }
    }
}

impl Default for ScrapeLimits {
    fn default() -> Self {
        Self {
            lookup_max_reviews: 25,
            search_max_places: 15,
            search_max_reviews: 20,
            language: "en".to_string(),
        }
    }
}

// --- ReviewSource impl for the Apify Google Places crawler ---

pub struct ApifySource {
    client: ApifyClient,
    limits: ScrapeLimits,
}

impl ApifySource {
    pub fn new(client: ApifyClient, limits: ScrapeLimits) -> Self {
        Self { client, limits }
    }

    /// Actor input for a dish search. Geolocation is attached only when both
    /// coordinates were supplied.
    pub fn search_input(&self, search: &DishSearch) -> PlaceSearchInput {
        PlaceSearchInput {
            search_strings_array: vec![search.dish.clone()],
            location_query: search.location.clone(),
            max_crawled_places_per_search: self.limits.search_max_places,
            max_reviews: self.limits.search_max_reviews,
            reviews_sort: "mostRelevant".to_string(),
            scrape_reviews_personal_data: false,
            language: self.limits.language.clone(),
            custom_geolocation: search
                .coordinates()
                .map(|(lat, lng)| CustomGeolocation::point(lat, lng, search.radius)),
        }
    }
}

#[async_trait]
impl ReviewSource for ApifySource {
    async fn fetch_place(&self, url: &str) -> Result<Vec<PlaceItem>> {
        let input = PlaceLookupInput::new(url, self.limits.lookup_max_reviews, &self.limits.language);
        self.client
            .scrape_place(&input)
            .await
            .map_err(|e| PlatewiseError::Scrape(e.to_string()))
    }

    async fn search_places(&self, search: &DishSearch) -> Result<Vec<PlaceItem>> {
        let input = self.search_input(search);
        let items = self
            .client
            .search_places(&input)
            .await
            .map_err(|e| PlatewiseError::Scrape(e.to_string()))?;
        info!(dish = %search.dish, location = %search.location, count = items.len(), "Dish search scraped");
        Ok(items)
    }
}

// --- Summarizer impl for Gemini ---

#[async_trait]
impl Summarizer for Gemini {
    async fn summarize(&self, prompt: &str) -> Result<String> {
        self.complete(prompt)
            .await
            .map_err(|e| PlatewiseError::SummarizerCall(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ApifySource {
        ApifySource::new(ApifyClient::new("token".into()), ScrapeLimits::default())
    }

    #[test]
    fn search_input_without_coordinates_has_no_geolocation() {
        let input = source().search_input(&DishSearch::new("pizza", "Boston"));
        assert_eq!(input.search_strings_array, vec!["pizza".to_string()]);
        assert_eq!(input.location_query, "Boston");
        assert_eq!(input.max_crawled_places_per_search, 15);
        assert!(input.custom_geolocation.is_none());
    }

    #[test]
    fn search_input_needs_both_coordinates() {
        let mut search = DishSearch::new("pizza", "Boston");
        search.latitude = Some(42.36);
        assert!(source().search_input(&search).custom_geolocation.is_none());

        search.longitude = Some(-71.06);
        search.radius = 3;
        let geo = source().search_input(&search).custom_geolocation.unwrap();
        assert_eq!(geo.coordinates, [-71.06, 42.36]);
        assert_eq!(geo.radius_km, 3);
    }
}
