use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

use platewise_common::DishSearch;
use platewise_scout::Orchestrator;

const MAX_RADIUS_KM: i64 = 50;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

/// All routes, served both at the root and under `/api`.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/scrape-reviews", post(scrape_reviews))
        .route("/find-restaurants", post(find_restaurants))
        .route("/status/{task_id}", get(task_status))
        .route("/wake", get(wake))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if allowed_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

// --- Handlers ---

#[derive(Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    url: String,
}

async fn scrape_reviews(
    State(state): State<AppState>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let url = body.url.trim();
    if url.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "url is required");
    }

    let task_id = state.orchestrator.submit_lookup(url.to_string()).await;
    info!(%task_id, "Lookup submitted");
    Json(json!({ "task_id": task_id })).into_response()
}

#[derive(Deserialize)]
pub struct FindRequest {
    #[serde(default)]
    dish: String,
    #[serde(default)]
    location: String,
    radius: Option<i64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl FindRequest {
    fn into_search(self) -> Result<DishSearch, &'static str> {
        let dish = self.dish.trim();
        let location = self.location.trim();
        if dish.is_empty() {
            return Err("dish is required");
        }
        if location.is_empty() {
            return Err("location is required");
        }

        let mut search = DishSearch::new(dish, location);

        if let Some(radius) = self.radius {
            if !(1..=MAX_RADIUS_KM).contains(&radius) {
                return Err("radius must be between 1 and 50 km");
            }
            search.radius = radius as u32;
        }

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    return Err("latitude must be between -90 and 90");
                }
                if !(-180.0..=180.0).contains(&lng) {
                    return Err("longitude must be between -180 and 180");
                }
                search.latitude = Some(lat);
                search.longitude = Some(lng);
            }
            (None, None) => {}
            _ => return Err("latitude and longitude must be given together"),
        }

        Ok(search)
    }
}

async fn find_restaurants(
    State(state): State<AppState>,
    payload: Result<Json<FindRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let search = match body.into_search() {
        Ok(search) => search,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let dish = search.dish.clone();
    let task_id = state.orchestrator.submit_search(search).await;
    info!(%task_id, dish = %dish, "Dish search submitted");
    Json(json!({ "task_id": task_id })).into_response()
}

async fn task_status(State(state): State<AppState>, Path(task_id): Path<String>) -> Response {
    let record = match Uuid::parse_str(&task_id) {
        Ok(id) => state.orchestrator.registry().get(id).await,
        Err(_) => None,
    };

    match record {
        Some(record) => Json(json!({
            "state": record.state,
            "result": record.result,
        }))
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Task not found"),
    }
}

async fn wake() -> Json<serde_json::Value> {
    Json(json!({ "status": "awake" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::util::ServiceExt;

    use platewise_common::TaskState;
    use platewise_scout::testing::{
        place_item, wait_for_terminal, MockReviewSource, MockSummarizer, StaticResolver,
    };
    use platewise_scout::TaskRegistry;

    use super::*;

    const PLACE_URL: &str = "https://www.google.com/maps/place/Lupe's+Tacos";

    fn app_with(origins: &[String]) -> (Router, Arc<TaskRegistry>) {
        let registry = Arc::new(TaskRegistry::new());
        let source = MockReviewSource::new()
            .on_place(PLACE_URL, vec![place_item("Lupe's Tacos", 4.5, &["carnitas!"])])
            .on_search(vec![place_item("Lupe's Tacos", 4.5, &["great taco"])]);
        let summarizer = MockSummarizer::new()
            .default_reply(r#"{"serves_dish": true, "summary": "Get the carnitas"}"#);
        let orchestrator = Orchestrator::new(
            registry.clone(),
            Arc::new(StaticResolver::new()),
            Arc::new(source),
            Arc::new(summarizer),
        );
        (build_router(AppState { orchestrator }, origins), registry)
    }

    fn app() -> (Router, Arc<TaskRegistry>) {
        app_with(&[])
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn extract_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn wake_is_served_at_root_and_under_api() {
        let (app, registry) = app();
        for uri in ["/wake", "/api/wake"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(extract_json(response).await["status"], "awake");
        }
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn lookup_round_trip_through_status() {
        let (app, registry) = app();
        let response = app
            .clone()
            .oneshot(post_json("/scrape-reviews", json!({ "url": PLACE_URL })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let task_id = extract_json(response).await["task_id"]
            .as_str()
            .unwrap()
            .to_string();

        let id = Uuid::parse_str(&task_id).unwrap();
        wait_for_terminal(&registry, id).await;

        let response = app
            .oneshot(get(&format!("/api/status/{task_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response).await;
        assert_eq!(body["state"], "COMPLETED");
        assert_eq!(body["result"]["restaurant_name"], "Lupe's Tacos");
        assert_eq!(body["result"]["analysis"]["summary"], "Get the carnitas");
    }

    #[tokio::test]
    async fn search_round_trip_through_status() {
        let (app, registry) = app();
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/find-restaurants",
                json!({ "dish": "taco", "location": "Austin", "radius": 5, "latitude": 30.27, "longitude": -97.74 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let task_id = extract_json(response).await["task_id"]
            .as_str()
            .unwrap()
            .to_string();

        let record = wait_for_terminal(&registry, Uuid::parse_str(&task_id).unwrap()).await;
        assert_eq!(record.state, TaskState::Completed);

        let body = extract_json(app.oneshot(get(&format!("/status/{task_id}"))).await.unwrap()).await;
        assert_eq!(body["result"]["dish"], "taco");
        assert_eq!(body["result"]["restaurants"][0]["name"], "Lupe's Tacos");
    }

    #[tokio::test]
    async fn status_of_unknown_task_is_404() {
        let (app, registry) = app();
        for uri in [format!("/status/{}", Uuid::new_v4()), "/status/not-a-uuid".to_string()] {
            let response = app.clone().oneshot(get(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(extract_json(response).await["error"], "Task not found");
        }
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let (app, registry) = app();
        for body in [json!({ "url": "  " }), json!({})] {
            let response = app
                .clone()
                .oneshot(post_json("/scrape-reviews", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(extract_json(response).await["error"], "url is required");
        }
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_json_is_a_json_400() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/find-restaurants")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(extract_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn search_validation() {
        let (app, registry) = app();
        let cases = [
            json!({ "dish": "", "location": "Austin" }),
            json!({ "dish": "taco", "location": " " }),
            json!({ "dish": "taco", "location": "Austin", "radius": 0 }),
            json!({ "dish": "taco", "location": "Austin", "radius": 51 }),
            json!({ "dish": "taco", "location": "Austin", "latitude": 30.0 }),
            json!({ "dish": "taco", "location": "Austin", "longitude": -97.0 }),
            json!({ "dish": "taco", "location": "Austin", "latitude": 91.0, "longitude": 0.0 }),
            json!({ "dish": "taco", "location": "Austin", "latitude": 0.0, "longitude": 181.0 }),
        ];
        for body in cases {
            let response = app
                .clone()
                .oneshot(post_json("/find-restaurants", body.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }
        assert!(registry.is_empty().await);
    }

    #[test]
    fn search_defaults_radius() {
        let request: FindRequest =
            serde_json::from_value(json!({ "dish": " pho ", "location": "Hanoi" })).unwrap();
        let search = request.into_search().unwrap();
        assert_eq!(search.dish, "pho");
        assert_eq!(search.radius, 10);
        assert!(search.coordinates().is_none());
    }

    #[tokio::test]
    async fn cors_allows_any_origin_by_default() {
        let (app, _) = app();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/find-restaurants")
            .header(header::ORIGIN, "https://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn cors_echoes_configured_origin_only() {
        let (app, _) = app_with(&["https://platewise.app".to_string()]);
        let request = Request::builder()
            .uri("/wake")
            .header(header::ORIGIN, "https://platewise.app")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://platewise.app"
        );

        let request = Request::builder()
            .uri("/wake")
            .header(header::ORIGIN, "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
