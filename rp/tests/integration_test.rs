//! Integration tests for reqpool
//!
//! Drive the scheduler and the reqwest transport against a local HTTP server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method as HttpMethod, StatusCode, Uri};
use axum::routing::{any, get};
use bytes::Bytes;
use serde_json::json;
use tokio::sync::mpsc;

use reqpool::config::HttpConfig;
use reqpool::{
    BeginEvent, ErrorInfo, HttpTransport, Method, RequestSpec, Response, ResponseBody, ResponseType, Scheduler,
    SchedulerConfig, TaskId,
};

// =============================================================================
// Test server
// =============================================================================

#[derive(Clone, Default)]
struct Load {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

async fn echo(method: HttpMethod, uri: Uri, headers: HeaderMap, body: String) -> String {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    format!("{} {} {} {}", method, uri.query().unwrap_or("-"), content_type, body)
}

async fn work(State(load): State<Load>) -> &'static str {
    let now = load.active.fetch_add(1, Ordering::SeqCst) + 1;
    load.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    load.active.fetch_sub(1, Ordering::SeqCst);
    "done"
}

async fn streamed_json() -> Body {
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![Ok(Bytes::from_static(b"{\"hello\":")), Ok(Bytes::from_static(b"\"world\"}"))];
    Body::from_stream(futures::stream::iter(chunks))
}

async fn spawn_server() -> (String, Load) {
    let load = Load::default();
    let app = Router::new()
        .route("/echo", any(echo))
        .route("/work", get(work))
        .route("/json", get(|| async { axum::Json(json!({"hello": "world"})) }))
        .route("/stream-json", get(streamed_json))
        .route("/big", get(|| async { "x".repeat(100_000) }))
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
        .route("/boom", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/forbidden", get(|| async { (StatusCode::FORBIDDEN, "no") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        )
        .with_state(load.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), load)
}

fn scheduler(max_concurrency: usize) -> Scheduler {
    let transport = HttpTransport::from_config(&HttpConfig::default()).expect("Failed to build client");
    Scheduler::new(
        SchedulerConfig {
            max_concurrency,
            ..Default::default()
        },
        Arc::new(transport),
    )
}

/// Submit one request and wait for its outcome
async fn run_one(scheduler: &Scheduler, spec: RequestSpec) -> Result<Response, ErrorInfo> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let fail_tx = tx.clone();
    let spec = spec
        .on_success(move |response| {
            let _ = tx.send(Ok(response));
        })
        .on_fail(move |error| {
            let _ = fail_tx.send(Err(error));
        });
    scheduler.submit(spec).await;
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("Timed out waiting for outcome")
        .expect("Outcome channel closed")
}

fn text(response: &Response) -> String {
    response.body.to_text()
}

// =============================================================================
// Request building
// =============================================================================

#[tokio::test]
async fn test_get_payload_becomes_query_string() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(2);

    let spec = RequestSpec::get(format!("{}/echo", base)).data(json!({"a": 1, "b": 2}));
    let response = run_one(&scheduler, spec).await.expect("request should succeed");

    assert_eq!(response.status, 200);
    assert_eq!(text(&response), "GET a=1&b=2 text/plain;charset=UTF-8 ");
}

#[tokio::test]
async fn test_get_payload_joins_existing_query() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(2);

    let spec = RequestSpec::get(format!("{}/echo?z=0", base)).data(json!({"q": "a b"}));
    let response = run_one(&scheduler, spec).await.expect("request should succeed");

    assert!(text(&response).starts_with("GET z=0&q=a%20b "));
}

#[tokio::test]
async fn test_post_payload_becomes_json_body() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(2);

    let spec = RequestSpec::post(format!("{}/echo", base)).data(json!({"name": "ada"}));
    let response = run_one(&scheduler, spec).await.expect("request should succeed");

    assert_eq!(text(&response), r#"POST - application/json {"name":"ada"}"#);
}

#[tokio::test]
async fn test_caller_content_type_wins() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(2);

    let spec = RequestSpec::new(Method::Put, format!("{}/echo", base))
        .data(json!("raw"))
        .header("content-type", "text/csv");
    let response = run_one(&scheduler, spec).await.expect("request should succeed");

    assert_eq!(text(&response), r#"PUT - text/csv "raw""#);
}

// =============================================================================
// Outcomes
// =============================================================================

#[tokio::test]
async fn test_status_errors_are_mapped() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(3);

    let not_found = run_one(&scheduler, RequestSpec::get(format!("{}/missing", base))).await.unwrap_err();
    assert_eq!(not_found.status, 404);
    assert_eq!(not_found.message.as_deref(), Some("Not found!"));

    let server = run_one(&scheduler, RequestSpec::get(format!("{}/boom", base))).await.unwrap_err();
    assert_eq!(server.status, 500);
    assert_eq!(server.message.as_deref(), Some("Internal Server Error!"));

    let forbidden = run_one(&scheduler, RequestSpec::get(format!("{}/forbidden", base))).await.unwrap_err();
    assert_eq!(forbidden.status, 403);
    assert_eq!(forbidden.message.as_deref(), Some("403 Forbidden"));
}

#[tokio::test]
async fn test_timeout_is_reported_as_408() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(1);

    let spec = RequestSpec::get(format!("{}/slow", base)).timeout(Duration::from_millis(200));
    let error = run_one(&scheduler, spec).await.unwrap_err();

    assert_eq!(error.status, 408);
    assert_eq!(error.message.as_deref(), Some("Timeout!"));
}

#[tokio::test]
async fn test_connection_refused_is_a_failure() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let scheduler = scheduler(1);
    let error = run_one(&scheduler, RequestSpec::get(format!("http://{}/", addr))).await.unwrap_err();
    assert_eq!(error.status, 0);
    assert!(error.message.is_some());
}

#[tokio::test]
async fn test_missing_url_fails_validation() {
    let scheduler = scheduler(1);
    let error = run_one(&scheduler, RequestSpec::get("")).await.unwrap_err();
    assert_eq!(error.status, -1);
}

#[tokio::test]
async fn test_json_decoding_depends_on_streaming() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(2);

    let streamed = RequestSpec::get(format!("{}/stream-json", base)).response_type(ResponseType::Json);
    let response = run_one(&scheduler, streamed).await.expect("request should succeed");
    assert_eq!(response.body, ResponseBody::Json(json!({"hello": "world"})));

    let sized = RequestSpec::get(format!("{}/json", base)).response_type(ResponseType::Json);
    let response = run_one(&scheduler, sized).await.expect("request should succeed");
    assert!(matches!(response.body, ResponseBody::Raw(_)));
    assert_eq!(text(&response), r#"{"hello":"world"}"#);
}

#[tokio::test]
async fn test_text_response_type() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(1);

    let spec = RequestSpec::get(format!("{}/work", base)).response_type(ResponseType::Text);
    let response = run_one(&scheduler, spec).await.expect("request should succeed");
    assert_eq!(response.body, ResponseBody::Text("done".to_string()));
}

// =============================================================================
// Interceptors
// =============================================================================

#[tokio::test]
async fn test_interceptors_see_begin_and_progress() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(1);

    let (begin_tx, mut begin_rx) = mpsc::unbounded_channel::<BeginEvent>();
    let (pct_tx, mut pct_rx) = mpsc::unbounded_channel::<u8>();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();

    scheduler
        .submit_with_interceptors(
            RequestSpec::get(format!("{}/big", base)).on_complete(move || {
                let _ = done_tx.send(());
            }),
            Some(Box::new(move |_id: &TaskId, event: &BeginEvent| {
                let _ = begin_tx.send(event.clone());
            })),
            Some(Box::new(move |pct: u8| {
                let _ = pct_tx.send(pct);
            })),
        )
        .await;

    tokio::time::timeout(Duration::from_secs(10), done_rx.recv()).await.unwrap();

    let begin = begin_rx.try_recv().expect("begin should fire");
    assert_eq!(begin.status, 200);
    assert_eq!(begin.content_length, Some(100_000));
    assert!(begin_rx.try_recv().is_err(), "begin fires once");

    let mut percents = Vec::new();
    while let Ok(pct) = pct_rx.try_recv() {
        percents.push(pct);
    }
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last(), Some(&100));
}

// =============================================================================
// Scheduling
// =============================================================================

#[tokio::test]
async fn test_server_never_sees_more_than_ceiling() {
    let (base, load) = spawn_server().await;
    let scheduler = scheduler(2);

    let (tx, mut rx) = mpsc::unbounded_channel::<()>();
    for _ in 0..6 {
        let tx = tx.clone();
        scheduler
            .submit(RequestSpec::get(format!("{}/work", base)).on_complete(move || {
                let _ = tx.send(());
            }))
            .await;
    }
    for _ in 0..6 {
        tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap();
    }

    assert!(load.peak.load(Ordering::SeqCst) <= 2);
    let stats = scheduler.stats().await;
    assert_eq!(stats.total_submitted, 6);
    assert_eq!(stats.total_dispatched, 6);
    assert!(stats.peak_in_flight <= 2);
}

#[tokio::test]
async fn test_mixed_outcomes_all_complete() {
    let (base, _) = spawn_server().await;
    let scheduler = scheduler(2);

    let paths = ["/work", "/missing", "/boom", "/work", "/forbidden"];
    let (tx, mut rx) = mpsc::unbounded_channel::<bool>();
    for path in paths {
        let ok_tx = tx.clone();
        let fail_tx = tx.clone();
        scheduler
            .submit(
                RequestSpec::get(format!("{}{}", base, path))
                    .on_success(move |_| {
                        let _ = ok_tx.send(true);
                    })
                    .on_fail(move |_| {
                        let _ = fail_tx.send(false);
                    }),
            )
            .await;
    }
    drop(tx);

    let mut outcomes = Vec::new();
    while let Some(ok) = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap() {
        outcomes.push(ok);
    }
    assert_eq!(outcomes.len(), paths.len());
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 2);
}
