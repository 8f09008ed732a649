use std::future::Future;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use platewise_common::error::Result;
use platewise_common::{DishSearch, JobKind, Review, TaskState};

use crate::analyzer::{analyze_all, summarize_restaurant};
use crate::dataset::{collect_lookup, merge_items};
use crate::prompts::LOOKUP_REVIEW_LIMIT;
use crate::ranker::rank;
use crate::registry::TaskRegistry;
use crate::resolver::restaurant_name_from_url;
use crate::traits::{LinkResolver, ReviewSource, Summarizer};

/// Accepts requests, runs each as a detached background job, and records its
/// progress in the [`TaskRegistry`].
///
/// A job only ever advances through intermediate states; the terminal write
/// happens in one place, after the job future resolves. `Ok` becomes
/// `COMPLETED` with the payload, an error or a panic becomes `FAILED`.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<TaskRegistry>,
    resolver: Arc<dyn LinkResolver>,
    source: Arc<dyn ReviewSource>,
    summarizer: Arc<dyn Summarizer>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<TaskRegistry>,
        resolver: Arc<dyn LinkResolver>,
        source: Arc<dyn ReviewSource>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            registry,
            resolver,
            source,
            summarizer,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Start a single-restaurant lookup for a map link.
    pub async fn submit_lookup(&self, url: String) -> Uuid {
        let id = self.registry.create(JobKind::Lookup).await;
        let this = self.clone();
        self.launch(id, async move { this.run_lookup(id, &url).await });
        id
    }

    /// Start a dish search across many restaurants.
    pub async fn submit_search(&self, search: DishSearch) -> Uuid {
        let id = self.registry.create(JobKind::DishSearch).await;
        let this = self.clone();
        self.launch(id, async move { this.run_search(id, &search).await });
        id
    }

    fn launch<F>(&self, id: Uuid, job: F)
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        let registry = self.registry.clone();
        let span = tracing::info_span!("task", task_id = %id);

        tokio::spawn(
            async move {
                let failure = match tokio::spawn(job.in_current_span()).await {
                    Ok(Ok(result)) => match registry.complete(id, result).await {
                        Ok(()) => {
                            info!("Task completed");
                            return;
                        }
                        Err(e) => e.to_string(),
                    },
                    Ok(Err(e)) => e.to_string(),
                    Err(join_err) => format!("Task aborted: {join_err}"),
                };

                warn!(error = %failure, "Task failed");
                if let Err(e) = registry.fail(id, &failure).await {
                    error!(error = %e, "Could not record task failure");
                }
            }
            .instrument(span),
        );
    }

    async fn run_lookup(&self, id: Uuid, url: &str) -> Result<Value> {
        self.registry.advance(id, TaskState::Fetching).await?;

        let canonical = self.resolver.resolve(url).await?;
        let guessed_name = restaurant_name_from_url(&canonical);
        let items = self.source.fetch_place(&canonical).await?;

        self.registry.advance(id, TaskState::Analyzing).await?;

        let (scraped_name, reviews) = collect_lookup(items);
        let restaurant_name = scraped_name.unwrap_or(guessed_name);
        let top_reviews: Vec<Review> = reviews.into_iter().take(LOOKUP_REVIEW_LIMIT).collect();
        info!(restaurant = %restaurant_name, reviews = top_reviews.len(), "Reviews collected");

        self.registry.advance(id, TaskState::Finalizing).await?;

        let analysis =
            summarize_restaurant(self.summarizer.as_ref(), &restaurant_name, &top_reviews).await;

        Ok(json!({
            "success": true,
            "restaurant_name": restaurant_name,
            "reviews": top_reviews,
            "analysis": analysis,
        }))
    }

    async fn run_search(&self, id: Uuid, search: &DishSearch) -> Result<Value> {
        self.registry.advance(id, TaskState::Fetching).await?;

        let items = self.source.search_places(search).await?;
        let candidates = merge_items(items);
        let total_found = candidates.len();

        self.registry.advance(id, TaskState::Processing).await?;

        let shortlist = rank(candidates, &search.dish);
        info!(dish = %search.dish, total_found, shortlisted = shortlist.len(), "Shortlist ready");

        self.registry.advance(id, TaskState::Analyzing).await?;

        let restaurants = analyze_all(self.summarizer.clone(), shortlist, &search.dish).await;

        Ok(json!({
            "success": true,
            "dish": search.dish,
            "location": search.location,
            "total_found": total_found,
            "restaurants": restaurants,
        }))
    }
}
