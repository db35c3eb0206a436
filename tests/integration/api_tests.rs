//! API integration tests

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use bookshelf_server::{
    api::{create_router, with_request_pipeline},
    config::AppConfig,
    middleware::ACCESS_LOG_TARGET,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer,
};

fn create_test_app() -> Router {
    create_router(AppState::new(AppConfig::default()))
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn list_books(app: &Router) -> Vec<Value> {
    let response = send(app, get_request("/books")).await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["book"]
        .as_array()
        .cloned()
        .unwrap()
}

/// Collects access log events emitted while it is the default subscriber
#[derive(Clone, Default)]
struct CapturedAccessLog(Arc<Mutex<Vec<(Level, String)>>>);

impl CapturedAccessLog {
    fn events(&self) -> Vec<(Level, String)> {
        self.0.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for CapturedAccessLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != ACCESS_LOG_TARGET {
            return;
        }
        let mut message = MessageVisitor::default();
        event.record(&mut message);
        self.0
            .lock()
            .unwrap()
            .push((*event.metadata().level(), message.0));
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

// ==================== Book Tests ====================

#[tokio::test]
async fn test_list_seeded_books() {
    let app = create_test_app();

    let books = list_books(&app).await;
    assert_eq!(
        books,
        vec![
            json!({ "id": 1, "title": "The Great Gatsby", "author": "F. Scott Fitzgerald" }),
            json!({ "id": 2, "title": "1984", "author": "George Orwell" }),
        ]
    );
}

#[tokio::test]
async fn test_get_each_book_by_id() {
    let app = create_test_app();

    for book in list_books(&app).await {
        let uri = format!("/books/{}", book["id"]);
        let response = send(&app, get_request(&uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "book": book }));
    }
}

#[tokio::test]
async fn test_get_missing_book() {
    let app = create_test_app();

    let response = send(&app, get_request("/books/42")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({ "Error": "Book not found 404" })
    );
}

#[tokio::test]
async fn test_signed_ids_do_not_match_a_book_route() {
    let app = create_test_app();

    for uri in ["/books/-1", "/books/+1", "/books/1.0"] {
        let response = send(&app, get_request(uri)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Internal server error" })
        );
    }
}

#[tokio::test]
async fn test_oversized_id_is_not_found() {
    let app = create_test_app();
    let uri = "/books/99999999999999999999";

    let response = send(&app, get_request(uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({ "Error": "Book not found 404" })
    );

    let response = send(&app, json_request("PUT", uri, json!({ "title": "T" }))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, json!({ "Error": "Book not found" }));

    let delete = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, delete).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, json!({ "Error": "Book not found" }));

    assert_eq!(list_books(&app).await.len(), 2);
}

#[tokio::test]
async fn test_create_book_then_list() {
    let app = create_test_app();

    let response = send(
        &app,
        json_request("POST", "/books", json!({ "title": "Dune", "author": "Herbert" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        json_body(response).await,
        json!({ "book": { "id": 3, "title": "Dune", "author": "Herbert" } })
    );

    let books = list_books(&app).await;
    assert_eq!(books.len(), 3);
    assert_eq!(books[2]["title"], "Dune");
    assert_eq!(books[2]["author"], "Herbert");
}

#[tokio::test]
async fn test_create_book_missing_author() {
    let app = create_test_app();

    let response = send(&app, json_request("POST", "/books", json!({ "title": "T" }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "message": "Missing title or author" })
    );
    assert_eq!(list_books(&app).await.len(), 2);
}

#[tokio::test]
async fn test_create_book_non_object_body() {
    let app = create_test_app();

    for body in [json!(null), json!(42), json!("title author")] {
        let response = send(&app, json_request("POST", "/books", body.clone())).await;
        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "{}",
            body
        );
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Internal server error" })
        );
    }

    let response = send(&app, json_request("POST", "/books", json!([1, 2]))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "message": "Missing title or author" })
    );

    assert_eq!(list_books(&app).await.len(), 2);
}

#[tokio::test]
async fn test_create_book_requires_json_content_type() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/books")
        .header("content-type", "text/plain")
        .body(Body::from(r#"{"title":"T","author":"A"}"#))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "Error": "Content-Type must be application/json" })
    );
    assert_eq!(list_books(&app).await.len(), 2);
}

#[tokio::test]
async fn test_create_book_malformed_json_is_internal_error() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/books")
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Internal server error" })
    );
}

#[tokio::test]
async fn test_update_title_only() {
    let app = create_test_app();

    let response = send(&app, json_request("PUT", "/books/2", json!({ "title": "New" }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "book": { "id": 2, "title": "New", "author": "George Orwell" } })
    );

    let response = send(&app, get_request("/books/2")).await;
    assert_eq!(json_body(response).await["book"]["title"], "New");
}

#[tokio::test]
async fn test_update_missing_book() {
    let app = create_test_app();
    let before = list_books(&app).await;

    let response = send(&app, json_request("PUT", "/books/9", json!({ "title": "New" }))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, json!({ "Error": "Book not found" }));
    assert_eq!(list_books(&app).await, before);
}

#[tokio::test]
async fn test_update_requires_json_content_type() {
    let app = create_test_app();

    let request = Request::builder()
        .method("PUT")
        .uri("/books/1")
        .body(Body::from("title=New"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "Error": "Content-Type must be application/json" })
    );
}

#[tokio::test]
async fn test_delete_book() {
    let app = create_test_app();

    let request = Request::builder()
        .method("DELETE")
        .uri("/books/2")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "message": "book deleted" }));
    assert_eq!(list_books(&app).await.len(), 1);

    let response = send(&app, get_request("/books/2")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_book() {
    let app = create_test_app();

    let request = Request::builder()
        .method("DELETE")
        .uri("/books/7")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await, json!({ "Error": "Book not found" }));
    assert_eq!(list_books(&app).await.len(), 2);
}

#[tokio::test]
async fn test_create_then_delete_scenario() {
    let app = create_test_app();

    let response = send(
        &app,
        json_request("POST", "/books", json!({ "title": "Dune", "author": "Herbert" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["book"]["id"], 3);

    let request = Request::builder()
        .method("DELETE")
        .uri("/books/2")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get_request("/books/2")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let ids: Vec<Value> = list_books(&app)
        .await
        .into_iter()
        .map(|book| book["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(1), json!(3)]);
}

// ==================== Error Boundary Tests ====================

#[tokio::test]
async fn test_unhandled_failures_are_opaque() {
    let app = create_test_app();

    let patch = Request::builder()
        .method("PATCH")
        .uri("/books/1")
        .body(Body::empty())
        .unwrap();

    for request in [get_request("/books/abc"), get_request("/authors"), patch] {
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Internal server error" })
        );
    }
}

#[tokio::test]
async fn test_handler_panic_is_caught() {
    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    let capture = CapturedAccessLog::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

    let state = AppState::new(AppConfig::default());
    let app = with_request_pipeline(Router::new().route("/explode", get(explode)), state);

    let response = send(&app, get_request("/explode")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Internal server error" })
    );

    let events = capture.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, Level::ERROR);
    assert!(events[0].1.starts_with("Server error in request"));
}

#[tokio::test]
async fn test_oversized_body_is_internal_error() {
    let mut config = AppConfig::default();
    config.server.max_body_bytes = 16;
    let app = create_router(AppState::new(config));

    let response = send(
        &app,
        json_request(
            "POST",
            "/books",
            json!({ "title": "A title that is far too long", "author": "A" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(list_books(&app).await.len(), 2);
}

// ==================== Access Log Tests ====================

#[tokio::test]
async fn test_one_access_log_line_per_request_at_status_level() {
    let capture = CapturedAccessLog::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
    let app = create_test_app();

    send(&app, get_request("/books")).await;
    send(&app, get_request("/books/99")).await;
    send(&app, get_request("/books/abc")).await;
    send(
        &app,
        json_request("POST", "/books", json!({ "title": "Dune", "author": "Herbert" })),
    )
    .await;

    let levels: Vec<Level> = capture.events().into_iter().map(|(level, _)| level).collect();
    assert_eq!(
        levels,
        vec![Level::INFO, Level::WARN, Level::ERROR, Level::INFO]
    );
}

#[tokio::test]
async fn test_access_log_fields() {
    let capture = CapturedAccessLog::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/books?source=test")
        .header("content-type", "application/json")
        .header("host", "books.example.com:5000")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(
            json!({ "title": "Dune", "author": "Herbert" }).to_string(),
        ))
        .unwrap();
    send(&app, request).await;

    let events = capture.events();
    assert_eq!(events.len(), 1);
    let (level, message) = &events[0];
    assert_eq!(*level, Level::INFO);

    let fields: Value = serde_json::from_str(
        message
            .strip_prefix("Request completed successfully: ")
            .unwrap(),
    )
    .unwrap();
    assert_eq!(fields["method"], "POST");
    assert_eq!(fields["path"], "/books");
    assert_eq!(fields["status_code"], 201);
    assert_eq!(fields["client_ip"], "203.0.113.7");
    assert_eq!(fields["host"], "books.example.com");
    assert_eq!(fields["query_params"], json!({ "source": "test" }));
    assert_eq!(fields["body"], json!({ "title": "Dune", "author": "Herbert" }));
    assert!(fields["duration_ms"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_access_log_omits_body_for_reads() {
    let capture = CapturedAccessLog::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
    let app = create_test_app();

    send(&app, get_request("/books/1")).await;

    let events = capture.events();
    assert_eq!(events.len(), 1);
    let fields: Value = serde_json::from_str(
        events[0]
            .1
            .strip_prefix("Request completed successfully: ")
            .unwrap(),
    )
    .unwrap();
    assert_eq!(fields["body"], Value::Null);
    assert_eq!(fields["client_ip"], Value::Null);
}

// ==================== Supporting Endpoints ====================

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();

    let response = send(&app, get_request("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_openapi_document_lists_book_paths() {
    let app = create_test_app();

    let response = send(&app, get_request("/api-docs/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/books"].is_object());
    assert!(body["paths"]["/books/{id}"].is_object());
}
