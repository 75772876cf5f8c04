use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use time::{macros::datetime, Duration, OffsetDateTime};
use tower::ServiceExt;

use bookshelf_app::books::{
    clock::{Clock, IdGenerator},
    store::BookStore,
    BooksModule,
};
use bookshelf_kernel::{settings::Settings, ModuleRegistry};

const START: OffsetDateTime = datetime!(2024-05-01 08:00:00 UTC);

struct TestClock(Mutex<OffsetDateTime>);

impl TestClock {
    fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
struct CountingIds(AtomicU64);

impl IdGenerator for CountingIds {
    fn next_id(&self) -> String {
        format!("id-{}", self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

struct TestApp {
    router: Router,
    clock: Arc<TestClock>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    fn with_settings(settings: Settings) -> Self {
        let clock = Arc::new(TestClock(Mutex::new(START)));
        let store = BookStore::new(clock.clone(), Arc::new(CountingIds::default()));

        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(BooksModule::new(store.into_shared())));

        Self {
            router: bookshelf_http::build_router(&registry, &settings),
            clock,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    async fn add(&self, body: Value) -> String {
        let (status, response) = self.send(Method::POST, "/books", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{response}");
        response["data"]["bookId"].as_str().unwrap().to_string()
    }
}

fn full_book(name: &str) -> Value {
    json!({
        "name": name,
        "year": 2010,
        "author": "John Doe",
        "summary": "Lorem ipsum dolor sit amet",
        "publisher": "Dicoding Indonesia",
        "pageCount": 100,
        "readPage": 25,
        "reading": false
    })
}

#[tokio::test]
async fn add_then_get_returns_full_record() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::POST, "/books", Some(full_book("Buku A")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({
            "status": "success",
            "message": "Buku berhasil ditambahkan",
            "data": {"bookId": "id-1"}
        })
    );

    let (status, body) = app.send(Method::GET, "/books/id-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(
        body["data"]["book"],
        json!({
            "id": "id-1",
            "name": "Buku A",
            "year": 2010,
            "author": "John Doe",
            "summary": "Lorem ipsum dolor sit amet",
            "publisher": "Dicoding Indonesia",
            "pageCount": 100,
            "readPage": 25,
            "finished": false,
            "reading": false,
            "insertedAt": "2024-05-01T08:00:00Z",
            "updatedAt": "2024-05-01T08:00:00Z"
        })
    );
}

#[tokio::test]
async fn add_finished_book() {
    let app = TestApp::new();
    let id = app
        .add(json!({"name": "A", "pageCount": 10, "readPage": 10}))
        .await;

    let (_, body) = app.send(Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(body["data"]["book"]["finished"], true);
    assert_eq!(body["data"]["book"]["publisher"], Value::Null);
}

#[tokio::test]
async fn add_rejections_leave_store_empty() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::POST, "/books", Some(json!({"pageCount": 10, "readPage": 1})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"status": "fail", "message": "Gagal menambahkan buku. Mohon isi nama buku"})
    );

    let (status, body) = app
        .send(Method::POST, "/books", Some(json!({"name": "", "pageCount": 10})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Gagal menambahkan buku. Mohon isi nama buku");

    let (status, body) = app
        .send(
            Method::POST,
            "/books",
            Some(json!({"name": "A", "pageCount": 10, "readPage": 11})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "status": "fail",
            "message": "Gagal menambahkan buku. readPage tidak boleh lebih besar dari pageCount"
        })
    );

    let (_, body) = app.send(Method::GET, "/books", None).await;
    assert_eq!(body, json!({"status": "success", "data": {"books": []}}));
}

#[tokio::test]
async fn malformed_payload_uses_fail_envelope() {
    let app = TestApp::new();

    let request = Request::post("/books")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "fail");
    assert!(body["message"].is_string());

    // Text fields still have to be strings.
    let (status, body) = app
        .send(Method::POST, "/books", Some(json!({"name": 5})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");

    let request = Request::post("/books")
        .body(Body::from("{\"name\": \"A\"}"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn loosely_typed_counts_are_stored_as_sent() {
    let app = TestApp::new();
    let id = app
        .add(json!({"name": "A", "year": "2010", "pageCount": 100.0, "readPage": 25.5}))
        .await;

    let (status, body) = app.send(Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let book = &body["data"]["book"];
    assert_eq!(book["year"], "2010");
    assert_eq!(book["pageCount"], 100.0);
    assert_eq!(book["readPage"], 25.5);
    assert_eq!(book["finished"], false);

    let done = app
        .add(json!({"name": "B", "pageCount": 100, "readPage": 100.0}))
        .await;
    let (_, body) = app.send(Method::GET, &format!("/books/{done}"), None).await;
    assert_eq!(body["data"]["book"]["finished"], true);
}

#[tokio::test]
async fn null_page_count_counts_as_zero() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/books",
            Some(json!({"name": "A", "readPage": 5, "pageCount": null})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Gagal menambahkan buku. readPage tidak boleh lebih besar dari pageCount"
    );

    // Without the key there is nothing to compare against.
    let id = app.add(json!({"name": "A", "readPage": 5})).await;
    let id_path = format!("/books/{id}");
    let (status, body) = app
        .send(
            Method::PUT,
            &id_path,
            Some(json!({"name": "A", "readPage": 5, "pageCount": null})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Gagal memperbarui buku. readPage tidak boleh lebih besar dari pageCount"
    );
}

#[tokio::test]
async fn list_returns_summaries_in_insertion_order() {
    let app = TestApp::new();
    let a = app.add(full_book("A")).await;
    let b = app.add(json!({"name": "B"})).await;
    let c = app.add(json!({"name": "C", "publisher": "Pub C"})).await;

    let (status, _) = app
        .send(Method::PUT, &format!("/books/{a}"), Some(json!({"name": "A2"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::DELETE, &format!("/books/{b}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, "/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["books"],
        json!([
            {"id": a, "name": "A2", "publisher": null},
            {"id": c, "name": "C", "publisher": "Pub C"}
        ])
    );
}

#[tokio::test]
async fn get_unknown_book_is_404() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/books/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"status": "fail", "message": "Buku tidak ditemukan"})
    );
}

#[tokio::test]
async fn update_replaces_fields_and_stamps_updated_at() {
    let app = TestApp::new();
    let id = app.add(full_book("Buku A")).await;
    app.clock.advance(Duration::hours(1));

    let mut changed = full_book("Buku A Revisi");
    changed["pageCount"] = json!(200);
    changed["readPage"] = json!(200);
    let (status, body) = app
        .send(Method::PUT, &format!("/books/{id}"), Some(changed))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "message": "Buku berhasil diperbarui"})
    );

    let (_, body) = app.send(Method::GET, &format!("/books/{id}"), None).await;
    let book = &body["data"]["book"];
    assert_eq!(book["id"], id.as_str());
    assert_eq!(book["name"], "Buku A Revisi");
    assert_eq!(book["finished"], true);
    assert_eq!(book["insertedAt"], "2024-05-01T08:00:00Z");
    assert_eq!(book["updatedAt"], "2024-05-01T09:00:00Z");
}

#[tokio::test]
async fn update_failures() {
    let app = TestApp::new();
    let id = app.add(full_book("Buku A")).await;

    let (status, body) = app
        .send(Method::PUT, "/books/missing", Some(full_book("X")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Gagal memperbarui buku. Buku tidak ditemukan");

    let (status, body) = app
        .send(Method::PUT, &format!("/books/{id}"), Some(json!({"year": 2020})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Gagal memperbarui buku. Mohon isi nama buku");

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/books/{id}"),
            Some(json!({"name": "A", "pageCount": 5, "readPage": 6})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "status": "fail",
            "message": "Gagal memperbarui buku. readPage tidak boleh lebih besar dari pageCount"
        })
    );

    let (_, body) = app.send(Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(body["data"]["book"]["name"], "Buku A");
}

#[tokio::test]
async fn delete_twice() {
    let app = TestApp::new();
    let id = app.add(full_book("Buku A")).await;

    let (status, body) = app.send(Method::DELETE, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "message": "Buku berhasil dihapus"})
    );

    let (status, body) = app.send(Method::DELETE, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"status": "fail", "message": "Buku gagal dihapus. Buku tidak ditemukan"})
    );

    let (status, _) = app.send(Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_prefix_moves_module_routes() {
    let mut settings = Settings::default();
    settings.server.api_prefix = "/api".to_string();
    let app = TestApp::with_settings(settings);

    let (status, _) = app.send(Method::GET, "/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, "/books", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_openapi_endpoints() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));

    let (status, doc) = app.send(Method::GET, "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/books"]["post"].is_object());
    assert!(doc["paths"]["/books/{id}"]["put"].is_object());
}
