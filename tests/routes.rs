use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use minidesk::app::{AppState, build_router};
use minidesk::error::StockError;
use minidesk::saving::{FlatFileStore, MemoryStore, ProjectStore};
use minidesk::session::MemorySessionStore;
use minidesk::stocks::QuoteSource;
use serde_json::{Value, json};
use tempfile::tempdir;
use tower::ServiceExt;

struct CannedQuotes {
    body: Value,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl QuoteSource for CannedQuotes {
    async fn daily_series(&self, _ticker: &str) -> Result<Value, StockError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

fn canned(body: Value) -> Arc<CannedQuotes> {
    Arc::new(CannedQuotes {
        body,
        calls: AtomicUsize::new(0),
    })
}

fn router_with(store: Arc<dyn ProjectStore>, quotes: Arc<dyn QuoteSource>) -> Router {
    let state = AppState::new(store, Arc::new(MemorySessionStore::default()), quotes)
        .expect("templates compile");
    build_router(Arc::new(state), Path::new("static"))
}

fn router(store: Arc<dyn ProjectStore>) -> Router {
    router_with(store, canned(json!({})))
}

fn post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, cookie, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn calculator_history_accumulates_and_clears() {
    let app = router(Arc::new(MemoryStore::default()));

    let (status, cookie, _) = send(&app, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.expect("session cookie issued on first contact");
    assert!(cookie.starts_with("session="));

    let sums = [("2", "3", "add"), ("10", "4", "subtract"), ("1.5", "2", "multiply")];
    let mut html = String::new();
    for (a, b, op) in sums {
        let form = format!("num1={}&num2={}&operator={}", a, b, op);
        let (status, _, body) = send(&app, post("/", &form, Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        html = body;
    }

    assert_eq!(html.matches("<li>").count(), 3);
    let first = html.find("2.0 + 3.0 = 5").unwrap();
    let second = html.find("10.0 - 4.0 = 6").unwrap();
    let third = html.find("1.5 × 2.0 = 3").unwrap();
    assert!(first < second && second < third);

    let (status, _, _) = send(&app, post("/", "clear=1", Some(&cookie))).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (_, _, html) = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(html.matches("<li>").count(), 0);
    assert!(html.contains("No calculations yet."));
}

#[tokio::test]
async fn calculator_errors_are_rendered_inline() {
    let app = router(Arc::new(MemoryStore::default()));

    let (status, _, html) = send(&app, post("/", "num1=1&num2=0&operator=divide", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Division by zero is not allowed."));
    assert!(html.contains("No calculations yet."));

    let (_, _, html) = send(&app, post("/", "num1=abc&num2=1&operator=add", None)).await;
    assert!(html.contains("Please enter valid numeric values."));

    let (_, _, html) = send(&app, post("/", "num1=1&num2=1&operator=power", None)).await;
    assert!(html.contains("Invalid operator selected."));
}

#[tokio::test]
async fn repeated_form_fields_use_the_first_value() {
    let app = router(Arc::new(MemoryStore::default()));

    let form = "num1=1&num1=2&num2=3&operator=add&operator=subtract";
    let (status, _, html) = send(&app, post("/", form, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("1.0 + 3.0 = 4"));
}

#[tokio::test]
async fn unreadable_form_bodies_render_inline_errors() {
    let app = router(Arc::new(MemoryStore::default()));
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("num1=1&num2=2&operator=add"))
        .unwrap();

    let (status, _, html) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Please enter valid numeric values."));
}

#[tokio::test]
async fn session_cookie_is_refreshed_on_each_response() {
    let app = router(Arc::new(MemoryStore::default()));

    let (_, cookie, _) = send(&app, get("/", None)).await;
    let cookie = cookie.unwrap();

    let response = app.clone().oneshot(get("/", Some(&cookie))).await.unwrap();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with(&format!("{};", cookie)));
    assert!(set_cookie.contains("Max-Age=86400"));
}

#[tokio::test]
async fn sessions_do_not_share_history() {
    let app = router(Arc::new(MemoryStore::default()));

    let (_, cookie, _) = send(&app, post("/", "num1=1&num2=1&operator=add", None)).await;
    let cookie = cookie.unwrap();
    let (_, other, html) = send(&app, get("/", None)).await;

    assert_ne!(other.unwrap(), cookie);
    assert!(html.contains("No calculations yet."));
}

#[tokio::test]
async fn project_cap_and_file_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("projects.txt");
    let app = router(Arc::new(FlatFileStore::new(&path)));

    for name in ["Alpha", "Beta", "Gamma"] {
        let form = format!("add_project=1&project_name={}", name);
        let (_, _, html) = send(&app, post("/projects", &form, None)).await;
        assert!(html.contains("added successfully!"));
    }

    let (_, _, html) = send(&app, post("/projects", "add_project=1&project_name=Delta", None)).await;
    assert!(html.contains("Only three projects accepted."));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Alpha\nBeta\nGamma\n");

    let (_, _, html) = send(
        &app,
        post("/projects", "update_project=1&update_index=1&updated_name=Omega", None),
    )
    .await;
    assert!(html.contains("Project updated:"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Alpha\nOmega\nGamma\n");

    let (_, _, html) = send(&app, post("/projects", "delete_index=0", None)).await;
    assert!(html.contains("deleted."));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Omega\nGamma\n");

    let (_, _, html) = send(&app, get("/projects", None)).await;
    assert!(html.contains("Omega"));
    assert!(!html.contains("Alpha"));
}

#[tokio::test]
async fn project_write_failures_roll_back() {
    let store = Arc::new(MemoryStore::failing(vec!["A".to_string(), "B".to_string()]));
    let app = router(store.clone());

    let (_, _, html) = send(&app, post("/projects", "add_project=1&project_name=C", None)).await;
    assert!(html.contains("Failed to save project."));

    let (_, _, html) = send(&app, post("/projects", "delete_index=1", None)).await;
    assert!(html.contains("Failed to delete from file."));

    let (_, _, html) = send(
        &app,
        post("/projects", "update_project=1&update_index=0&updated_name=Z", None),
    )
    .await;
    assert!(html.contains("Failed to save update."));

    assert_eq!(store.snapshot(), ["A", "B"]);
}

#[tokio::test]
async fn bad_project_requests_are_validation_errors() {
    let store = Arc::new(MemoryStore::new(vec!["A".to_string()]));
    let app = router(store.clone());

    let (_, _, html) = send(&app, post("/projects", "delete_index=abc", None)).await;
    assert!(html.contains("Invalid delete request."));

    let (_, _, html) = send(&app, post("/projects", "update_project=1&updated_name=X", None)).await;
    assert!(html.contains("Invalid update request."));

    let (_, _, html) = send(
        &app,
        post("/projects", "update_project=1&update_index=5&updated_name=X", None),
    )
    .await;
    assert!(html.contains("Invalid update."));

    let (_, _, html) = send(&app, post("/projects", "add_project=1&project_name=+++", None)).await;
    assert!(html.contains("Project name cannot be empty."));

    assert_eq!(store.snapshot(), ["A"]);
}

#[tokio::test]
async fn multi_line_project_names_are_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("projects.txt");
    let store = Arc::new(FlatFileStore::new(&path));
    let app = router(store.clone());

    for name in ["a%0Ab", "c%0Ad", "e%0Af"] {
        let form = format!("add_project=1&project_name={}", name);
        let (_, _, html) = send(&app, post("/projects", &form, None)).await;
        assert!(html.contains("Failed to save project."));
    }

    let (_, _, html) = send(&app, post("/projects", "add_project=1&project_name=Solo", None)).await;
    assert!(html.contains("added successfully!"));
    assert_eq!(store.read(), ["Solo"]);
    assert!(store.read().len() <= 3);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Solo\n");
}

#[tokio::test]
async fn stock_lookup_renders_latest_quote() {
    let quotes = canned(json!({
        "Time Series (Daily)": {
            "2024-05-01": { "1. open": "10.0", "2. high": "11.0", "3. low": "9.5", "4. close": "10.5", "5. volume": "100" },
            "2024-05-03": { "1. open": "12.0", "2. high": "13.0", "3. low": "11.5", "4. close": "12.5", "5. volume": "300" }
        }
    }));
    let app = router_with(Arc::new(MemoryStore::default()), quotes.clone());

    let (status, _, html) = send(&app, post("/stocks", "ticker=+ibm+", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("IBM on 2024-05-03"));
    assert!(html.contains("<td>300</td>"));
    assert_eq!(quotes.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stock_errors_are_classified() {
    let quotes = canned(json!({ "Note": "Thank you for using Alpha Vantage!" }));
    let app = router_with(Arc::new(MemoryStore::default()), quotes.clone());
    let (_, _, html) = send(&app, post("/stocks", "ticker=IBM", None)).await;
    assert!(html.contains("API call frequency limit reached."));

    let (_, _, html) = send(&app, post("/stocks", "ticker=", None)).await;
    assert!(html.contains("Please enter a ticker symbol."));
    assert_eq!(quotes.calls.load(Ordering::SeqCst), 1);

    let quotes = canned(json!({ "Error Message": "Invalid API call." }));
    let app = router_with(Arc::new(MemoryStore::default()), quotes);
    let (_, _, html) = send(&app, post("/stocks", "ticker=NOPE", None)).await;
    assert!(html.contains("Invalid ticker symbol or API error."));
}

#[tokio::test]
async fn pages_render_on_get() {
    let app = router(Arc::new(MemoryStore::default()));
    for uri in ["/", "/projects", "/stocks"] {
        let (status, _, html) = send(&app, get(uri, None)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(html.contains("<nav>"), "{uri}");
    }
}
