pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{
    CustomGeolocation, PlaceItem, PlaceLookupInput, PlaceReview, PlaceSearchInput, RunData,
    StartUrl,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for compass/crawler-google-places.
const GOOGLE_PLACES_CRAWLER: &str = "compass~crawler-google-places";

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize + ?Sized>(&self, actor: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient long-polling.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        loop {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", self.base_url, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed {
                        run_id: api_resp.data.id,
                        status: api_resp.data.status,
                    });
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json&clean=true", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = resp.bytes().await?;
        let items: Vec<T> = serde_json::from_slice(&bytes)?;
        Ok(items)
    }

    /// Start a run, wait for it, and fetch its dataset.
    pub async fn run_actor<I, T>(&self, actor: &str, input: &I) -> Result<Vec<T>>
    where
        I: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let run = self.start_run(actor, input).await?;
        tracing::info!(actor, run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        if completed.default_dataset_id.is_empty() {
            return Err(ApifyError::MissingDataset(completed.id));
        }
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        self.get_dataset_items(&completed.default_dataset_id).await
    }

    /// Crawl a single place by URL end-to-end: start run, poll, fetch results.
    pub async fn scrape_place(&self, input: &PlaceLookupInput) -> Result<Vec<PlaceItem>> {
        tracing::info!(
            url = input.start_urls.first().map(|u| u.url.as_str()).unwrap_or_default(),
            max_reviews = input.max_reviews,
            "Starting Google Places lookup"
        );

        let items: Vec<PlaceItem> = self.run_actor(GOOGLE_PLACES_CRAWLER, input).await?;
        tracing::info!(count = items.len(), "Fetched place records");
        Ok(items)
    }

    /// Search places for a keyword around a location end-to-end.
    pub async fn search_places(&self, input: &PlaceSearchInput) -> Result<Vec<PlaceItem>> {
        tracing::info!(
            query = ?input.search_strings_array,
            location = %input.location_query,
            max_places = input.max_crawled_places_per_search,
            geolocated = input.custom_geolocation.is_some(),
            "Starting Google Places search"
        );

        let items: Vec<PlaceItem> = self.run_actor(GOOGLE_PLACES_CRAWLER, input).await?;
        tracing::info!(count = items.len(), "Fetched place records");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, RawQuery, State};
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;

    const TOKEN: &str = "test-token";

    /// In-process stand-in for the Apify run endpoints.
    #[derive(Clone)]
    struct FakeApify {
        final_status: &'static str,
        dataset_id: &'static str,
        items: &'static str,
        polls: Arc<AtomicUsize>,
        actors: Arc<Mutex<Vec<String>>>,
        inputs: Arc<Mutex<Vec<Value>>>,
        queries: Arc<Mutex<Vec<String>>>,
    }

    impl FakeApify {
        fn new(final_status: &'static str, dataset_id: &'static str, items: &'static str) -> Self {
            Self {
                final_status,
                dataset_id,
                items,
                polls: Arc::new(AtomicUsize::new(0)),
                actors: Arc::new(Mutex::new(Vec::new())),
                inputs: Arc::new(Mutex::new(Vec::new())),
                queries: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn run(&self, status: &str) -> Value {
            json!({"data": {"id": "run-1", "status": status, "defaultDatasetId": self.dataset_id}})
        }
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    async fn start_run(
        State(fake): State<FakeApify>,
        Path(actor): Path<String>,
        headers: HeaderMap,
        Json(input): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"type": "token-not-valid"}})));
        }
        fake.actors.lock().unwrap().push(actor);
        fake.inputs.lock().unwrap().push(input);
        (StatusCode::CREATED, Json(fake.run("RUNNING")))
    }

    async fn get_run(
        State(fake): State<FakeApify>,
        Path(_id): Path<String>,
        RawQuery(query): RawQuery,
    ) -> Json<Value> {
        fake.queries.lock().unwrap().push(query.unwrap_or_default());
        let status = if fake.polls.fetch_add(1, Ordering::SeqCst) == 0 {
            "RUNNING"
        } else {
            fake.final_status
        };
        Json(fake.run(status))
    }

    async fn dataset_items(State(fake): State<FakeApify>, Path(_id): Path<String>) -> String {
        fake.items.to_string()
    }

    async fn serve(fake: FakeApify) -> String {
        let app = Router::new()
            .route("/acts/{actor}/runs", post(start_run))
            .route("/actor-runs/{id}", get(get_run))
            .route("/datasets/{id}/items", get(dataset_items))
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    const PLACES: &str = r#"[
        {"title": "Lupe's", "totalScore": 4.6, "reviewsCount": 2,
         "reviews": [{"text": "great tacos", "stars": 5}, {"text": "ok", "stars": 3}]},
        {"title": "Tito's", "totalScore": 4.1}
    ]"#;

    fn lookup() -> PlaceLookupInput {
        PlaceLookupInput::new("https://www.google.com/maps/place/Lupe's", 10, "en")
    }

    #[tokio::test]
    async fn scrape_place_starts_polls_and_fetches_dataset() {
        let fake = FakeApify::new("SUCCEEDED", "ds-1", PLACES);
        let base = serve(fake.clone()).await;
        let client = ApifyClient::new(TOKEN.into()).with_base_url(&base);

        let items = client.scrape_place(&lookup()).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].place_name(), Some("Lupe's"));
        assert_eq!(items[0].reviews.as_ref().unwrap().len(), 2);
        assert_eq!(items[1].total_score, Some(4.1));

        assert_eq!(fake.polls.load(Ordering::SeqCst), 2);
        assert_eq!(*fake.actors.lock().unwrap(), vec![GOOGLE_PLACES_CRAWLER.to_string()]);
        let inputs = fake.inputs.lock().unwrap();
        assert_eq!(inputs[0]["startUrls"][0]["url"], "https://www.google.com/maps/place/Lupe's");
        assert_eq!(inputs[0]["maxReviews"], 10);
        assert!(fake
            .queries
            .lock()
            .unwrap()
            .iter()
            .all(|q| q.contains("waitForFinish=60")));
    }

    #[tokio::test]
    async fn terminal_run_statuses_are_failures() {
        for status in ["FAILED", "ABORTED", "TIMED-OUT"] {
            let base = serve(FakeApify::new(status, "ds-1", PLACES)).await;
            let client = ApifyClient::new(TOKEN.into()).with_base_url(&base);

            let err = client.scrape_place(&lookup()).await.unwrap_err();

            match err {
                ApifyError::RunFailed { run_id, status: got } => {
                    assert_eq!(run_id, "run-1");
                    assert_eq!(got, status);
                }
                other => panic!("expected RunFailed for {status}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn succeeded_run_without_dataset_is_an_error() {
        let base = serve(FakeApify::new("SUCCEEDED", "", PLACES)).await;
        let client = ApifyClient::new(TOKEN.into()).with_base_url(&base);

        let err = client.scrape_place(&lookup()).await.unwrap_err();

        assert!(matches!(err, ApifyError::MissingDataset(ref id) if id == "run-1"));
    }

    #[tokio::test]
    async fn rejected_token_is_an_api_error() {
        let fake = FakeApify::new("SUCCEEDED", "ds-1", PLACES);
        let base = serve(fake.clone()).await;
        let client = ApifyClient::new("wrong".into()).with_base_url(&base);

        let err = client.scrape_place(&lookup()).await.unwrap_err();

        match err {
            ApifyError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("token-not-valid"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(fake.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_dataset_is_a_parse_error() {
        let base = serve(FakeApify::new("SUCCEEDED", "ds-1", "<html>oops</html>")).await;
        let client = ApifyClient::new(TOKEN.into()).with_base_url(&base);

        let err = client.scrape_place(&lookup()).await.unwrap_err();

        assert!(matches!(err, ApifyError::Parse(_)));
    }
}
