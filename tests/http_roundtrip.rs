use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use stream_stats_client::{
    ClientConfig, ClientEvent, ListQuery, Page, ReqwestTransport, RequestOptions, SortDir,
    StatsClient, Topic,
};

#[derive(Default)]
struct Hits {
    rooms: AtomicU32,
    flaky: AtomicU32,
    broken: AtomicU32,
}

async fn rooms(
    State(hits): State<Arc<Hits>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    hits.rooms.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    (
        [("x-ratelimit-remaining", "120")],
        Json(json!({
            "page": params.get("page").and_then(|p| p.parse::<u32>().ok()).unwrap_or(1),
            "page_size": params.get("page_size").and_then(|p| p.parse::<u32>().ok()).unwrap_or(10),
            "results": [{"slug": "high-rollers", "auth": auth, "sort": params.get("sort_dir")}]
        })),
    )
}

async fn flaky(State(hits): State<Arc<Hits>>) -> impl IntoResponse {
    if hits.flaky.fetch_add(1, Ordering::SeqCst) == 0 {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [("retry-after", "1")],
            Json(json!({"message": "slow down"})),
        )
            .into_response()
    } else {
        Json(json!({"features": ["leaderboards"]})).into_response()
    }
}

async fn broken(State(hits): State<Arc<Hits>>) -> impl IntoResponse {
    hits.broken.fetch_add(1, Ordering::SeqCst);
    (StatusCode::SERVICE_UNAVAILABLE, "upstream down")
}

async fn missing() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"message": "room not found"})))
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({}))
}

async fn serve() -> (String, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route("/v1/rooms", get(rooms))
        .route("/v1/features", get(flaky))
        .route("/v1/content/banners", get(broken))
        .route("/v1/rooms/{id}", get(missing))
        .route("/v1/health", get(slow))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1", addr), hits)
}

fn client(base_url: String) -> StatsClient {
    // talk to the local server directly even if a proxy is configured
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    StatsClient::with_transport(
        ClientConfig {
            base_url,
            api_key: Some("test-key".into()),
            retry_delay: Duration::from_millis(50),
            timeout: Duration::from_millis(500),
            ..ClientConfig::default()
        },
        Arc::new(ReqwestTransport::with_client(http)),
    )
}

#[tokio::test]
async fn lists_rooms_and_serves_repeats_from_cache() {
    let (base, hits) = serve().await;
    let client = client(base);
    let query = ListQuery::new().page(2, 5).sort("viewers", SortDir::Asc);

    let body = client.rooms().list(&query).await.unwrap();
    let first: Page<serde_json::Value> = serde_json::from_value(body).unwrap();
    let again = client.rooms().list(&query).await.unwrap();

    assert_eq!(first.page, 2);
    assert_eq!(first.page_size, 5);
    assert_eq!(first.results[0]["auth"], "Bearer test-key");
    assert_eq!(first.results[0]["sort"], "asc");
    assert_eq!(again["page"], 2);
    assert_eq!(hits.rooms.load(Ordering::SeqCst), 1);

    // server said 120 left
    assert_eq!(client.get_rate_limit_status().remaining, 120);
}

#[tokio::test]
async fn waits_out_retry_after_then_succeeds() {
    let (base, hits) = serve().await;
    let client = client(base);

    let started = Instant::now();
    let features = client.system().get_features().await.unwrap();

    assert_eq!(features["features"][0], "leaderboards");
    assert_eq!(hits.flaky.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn missing_room_is_a_terminal_404() {
    let (base, _hits) = serve().await;
    let client = client(base);

    let err = client.rooms().get("nope").await.unwrap_err();
    assert_eq!(err.code(), "HTTP_404");
    assert_eq!(err.to_string(), "room not found");
}

#[tokio::test]
async fn unavailable_upstream_exhausts_retries_once() {
    let (base, hits) = serve().await;
    let client = client(base);

    let errors = Arc::new(AtomicU32::new(0));
    let seen = errors.clone();
    let sub = client.on(Topic::Error, move |event| {
        if let ClientEvent::Error { code, .. } = event {
            assert_eq!(code, "HTTP_503");
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    let err = client.content().get_banners().await.unwrap_err();
    assert_eq!(err.code(), "HTTP_503");
    assert_eq!(err.to_string(), "HTTP 503");
    assert_eq!(hits.broken.load(Ordering::SeqCst), 3);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(sub.unsubscribe());
}

#[tokio::test]
async fn slow_server_times_out_without_retry() {
    let (base, _hits) = serve().await;
    let client = client(base);

    let started = Instant::now();
    let err = client
        .request("/health", RequestOptions::get().no_cache().timeout(Duration::from_millis(200)))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "TIMEOUT");
    assert!(started.elapsed() < Duration::from_secs(1));
}
