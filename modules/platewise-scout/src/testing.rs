// Test doubles for the pipeline seams.
//
// One mock per trait boundary:
// - MockSummarizer (Summarizer): replies keyed by the restaurant named in the prompt
// - MockReviewSource (ReviewSource): canned crawler records, or a scrape failure
// - StaticResolver (LinkResolver): fixed short-link map
//
// Plus builders for candidates and crawler records, and a poller that waits
// for a task to settle.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use apify_client::{PlaceItem, PlaceReview};
use async_trait::async_trait;
use uuid::Uuid;

use platewise_common::error::Result;
use platewise_common::{DishSearch, PlaceCandidate, PlatewiseError, Review};

use crate::registry::{TaskRecord, TaskRegistry};
use crate::traits::{LinkResolver, ReviewSource, Summarizer};

// ---------------------------------------------------------------------------
// MockSummarizer
// ---------------------------------------------------------------------------

/// Summarizer whose reply depends on the restaurant a prompt is about.
///
/// Both prompt kinds name the restaurant in a fixed spot, so the mock can route
/// concurrent calls without caring about order. Prompts that name no
/// registered restaurant get the default reply, or an error when none is set.
pub struct MockSummarizer {
    replies: HashMap<String, String>,
    failing: HashSet<String>,
    default_reply: Option<String>,
    fail_all: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            failing: HashSet::new(),
            default_reply: None,
            fail_all: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn reply_for(mut self, restaurant: &str, reply: &str) -> Self {
        self.replies.insert(restaurant.to_string(), reply.to_string());
        self
    }

    pub fn fail_for(mut self, restaurant: &str) -> Self {
        self.failing.insert(restaurant.to_string());
        self
    }

    pub fn default_reply(mut self, reply: &str) -> Self {
        self.default_reply = Some(reply.to_string());
        self
    }

    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Every prompt received so far, in arrival order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn names(prompt: &str, restaurant: &str) -> bool {
        prompt.contains(&format!("Restaurant: {restaurant}\n"))
            || prompt.contains(&format!("reviews of {restaurant} and"))
    }
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.fail_all || self.failing.iter().any(|r| Self::names(prompt, r)) {
            return Err(PlatewiseError::SummarizerCall("mock summarizer is down".into()));
        }
        if let Some(reply) = self
            .replies
            .iter()
            .find(|(r, _)| Self::names(prompt, r))
            .map(|(_, reply)| reply.clone())
        {
            return Ok(reply);
        }
        self.default_reply
            .clone()
            .ok_or_else(|| PlatewiseError::SummarizerCall("MockSummarizer: no reply registered".into()))
    }
}

// ---------------------------------------------------------------------------
// MockReviewSource
// ---------------------------------------------------------------------------

/// Review source backed by canned crawler records.
/// Builder pattern: `.on_place()`, `.on_search()`, `.failing()`.
pub struct MockReviewSource {
    places: HashMap<String, Vec<PlaceItem>>,
    search: Option<Vec<PlaceItem>>,
    failing: bool,
    calls: Mutex<Vec<String>>,
}

impl MockReviewSource {
    pub fn new() -> Self {
        Self {
            places: HashMap::new(),
            search: None,
            failing: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_place(mut self, url: &str, items: Vec<PlaceItem>) -> Self {
        self.places.insert(url.to_string(), items);
        self
    }

    pub fn on_search(mut self, items: Vec<PlaceItem>) -> Self {
        self.search = Some(items);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// URLs passed to `fetch_place` and dishes passed to `search_places`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockReviewSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewSource for MockReviewSource {
    async fn fetch_place(&self, url: &str) -> Result<Vec<PlaceItem>> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing {
            return Err(PlatewiseError::Scrape("mock crawler run failed".into()));
        }
        self.places
            .get(url)
            .cloned()
            .ok_or_else(|| PlatewiseError::Scrape(format!("MockReviewSource: no place registered for {url}")))
    }

    async fn search_places(&self, search: &DishSearch) -> Result<Vec<PlaceItem>> {
        self.calls.lock().unwrap().push(search.dish.clone());
        if self.failing {
            return Err(PlatewiseError::Scrape("mock crawler run failed".into()));
        }
        self.search
            .clone()
            .ok_or_else(|| PlatewiseError::Scrape("MockReviewSource: no search registered".into()))
    }
}

// ---------------------------------------------------------------------------
// StaticResolver
// ---------------------------------------------------------------------------

/// Resolver with a fixed link map. Unmapped links pass through unchanged.
pub struct StaticResolver {
    links: HashMap<String, String>,
    failing: bool,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self {
            links: HashMap::new(),
            failing: false,
        }
    }

    pub fn map(mut self, short: &str, canonical: &str) -> Self {
        self.links.insert(short.to_string(), canonical.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

impl Default for StaticResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkResolver for StaticResolver {
    async fn resolve(&self, url: &str) -> Result<String> {
        if self.failing {
            return Err(PlatewiseError::Resolution(format!("could not resolve {url}")));
        }
        Ok(self.links.get(url).cloned().unwrap_or_else(|| url.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Candidate with five-star reviews built from `texts`.
pub fn place(name: &str, rating: f64, texts: &[&str]) -> PlaceCandidate {
    PlaceCandidate {
        name: name.to_string(),
        address: format!("{name} St"),
        rating,
        review_count: texts.len() as u64,
        url: format!("https://www.google.com/maps/place/{}", name.replace(' ', "+")),
        reviews: texts
            .iter()
            .map(|t| Review {
                text: t.to_string(),
                stars: 5,
            })
            .collect(),
        ..Default::default()
    }
}

/// Crawler place record with nested four-star reviews built from `texts`.
pub fn place_item(name: &str, rating: f64, texts: &[&str]) -> PlaceItem {
    PlaceItem {
        title: Some(name.to_string()),
        address: Some(format!("{name} St")),
        total_score: Some(rating),
        reviews_count: Some(texts.len() as u64),
        url: Some(format!("https://www.google.com/maps/place/{}", name.replace(' ', "+"))),
        reviews: Some(
            texts
                .iter()
                .map(|t| PlaceReview {
                    text: Some(t.to_string()),
                    stars: Some(4.0),
                    published_at_date: None,
                })
                .collect(),
        ),
        ..Default::default()
    }
}

/// Flattened crawler review record for `name`.
pub fn review_item(name: &str, text: &str, stars: f64) -> PlaceItem {
    PlaceItem {
        title: Some(name.to_string()),
        text: Some(text.to_string()),
        stars: Some(stars),
        ..Default::default()
    }
}

/// Poll the registry until the task reaches a terminal state.
///
/// Panics after five seconds so a stuck job fails the test instead of hanging it.
pub async fn wait_for_terminal(registry: &TaskRegistry, id: Uuid) -> TaskRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(record) = registry.get(id).await {
            if record.state.is_terminal() {
                return record;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("task {id} did not finish in time");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
