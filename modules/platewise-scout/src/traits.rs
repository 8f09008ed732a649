//! Seams to the external collaborators. The pipeline only ever talks to these
//! traits; `sources` and `resolver` hold the production implementations and
//! `testing` the in-memory ones.

use apify_client::PlaceItem;
use async_trait::async_trait;
use platewise_common::error::Result;
use platewise_common::DishSearch;

/// Crawls a maps service for place records and their reviews.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Records for one place identified by its canonical URL.
    async fn fetch_place(&self, url: &str) -> Result<Vec<PlaceItem>>;

    /// Records for every place matching a dish around a location.
    async fn search_places(&self, search: &DishSearch) -> Result<Vec<PlaceItem>>;
}

/// Text-in, text-out LLM call. The answer is untrusted free text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str) -> Result<String>;
}

/// Expands short map links into canonical place/search URLs.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<String>;
}
