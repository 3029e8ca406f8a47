//! End-to-end tests that drive the router against in-memory SQLite and a
//! temporary upload directory

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pagemark_common::{auth::JwtManager, config::AppConfig, db::DbPool, storage::LocalPdfStore};
use pagemark_gateway::{create_router, AppState};
use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "pagemark-test-boundary";

struct TestApp {
    router: Router,
    uploads: TempDir,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

async fn spawn_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();

    let mut config = AppConfig::default();
    // Every `sqlite::memory:` connection is its own database
    config.database.url = "sqlite::memory:".to_string();
    config.database.max_connections = 1;
    config.database.min_connections = 1;
    config.storage.upload_dir = uploads.path().to_path_buf();
    config.rate_limit.enabled = false;
    config.auth.jwt_secret = Some("integration-test-secret".to_string());
    configure(&mut config);

    let db = DbPool::new(&config.database).await.unwrap();
    db.ensure_schema().await.unwrap();

    let store = LocalPdfStore::new(&config.storage.upload_dir).await.unwrap();
    let jwt = JwtManager::new("integration-test-secret", config.auth.jwt_expiration_secs);

    let state = AppState {
        config: Arc::new(config),
        db,
        store: Arc::new(store),
        jwt: Arc::new(jwt),
    };

    TestApp {
        router: create_router(state),
        uploads,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    async fn register(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "correct horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn upload(&self, token: &str, filename: &str, content_type: &str, bytes: &[u8]) -> (StatusCode, Value) {
        self.upload_field(token, "pdf", filename, content_type, bytes).await
    }

    async fn upload_field(
        &self,
        token: &str,
        field: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/pdf/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(field, filename, content_type, bytes)))
            .unwrap();

        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Upload a generated PDF and return its uuid
    async fn upload_sample(&self, token: &str, pages: &[&str]) -> String {
        let (status, body) = self
            .upload(token, "sample.pdf", "application/pdf", &sample_pdf(pages))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["pdf"]["uuid"].as_str().unwrap().to_string()
    }

    fn stored_files(&self) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(self.uploads.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

/// Keeps consecutive `createdAt` values apart
async fn tick() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn timestamp(value: &Value) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

fn multipart_body(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// A PDF with one line of text per page
fn sample_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for line in lines {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_root_and_health_checks() {
    let app = spawn_app().await;

    let (status, body) = app.json(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "PDF Annotator API is running!");

    let (status, body) = app.json(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.json(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["database"]["status"], "up");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = spawn_app().await;

    let response = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;

    assert!(response.headers().contains_key("x-request-id"));
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_register_login_and_me() {
    let app = spawn_app().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "  Ada  ", "email": "Ada@Example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["name"], "Ada");
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ADA@example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.json(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = spawn_app().await;
    app.register("Ada", "ada@example.com").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Other", "email": "ADA@example.com", "password": "another password" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Bob", "email": "bob@example.com", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Bob", "email": "not-an-email", "password": "long enough" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let app = spawn_app().await;
    app.register("Ada", "ada@example.com").await;

    let (status, wrong_password) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_user) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "whatever123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_password["error"]["message"], "Invalid email or password");
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let app = spawn_app().await;

    let (status, _) = app.json(Method::GET, "/api/pdf/list", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.json(Method::GET, "/api/pdf/list", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_rejects_token_for_unknown_user() {
    let app = spawn_app().await;
    let jwt = JwtManager::new("integration-test-secret", 3600);
    let token = jwt.generate_token(uuid::Uuid::new_v4(), "ghost@example.com").unwrap();

    let (status, _) = app.json(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = spawn_app().await;
    app.register("Ada", "ada@example.com").await;

    let jwt = JwtManager::new("integration-test-secret", 60);
    let issued_at = chrono::Utc::now().timestamp() - 7200;
    let token = jwt
        .generate_token_at(uuid::Uuid::new_v4(), "ada@example.com", issued_at)
        .unwrap();

    let (status, body) = app.json(Method::GET, "/api/pdf/list", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "EXPIRED_TOKEN");
}

// ============================================================================
// PDFs
// ============================================================================

#[tokio::test]
async fn test_upload_list_and_stream() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let bytes = sample_pdf(&["First page", "Second page"]);

    let (status, body) = app.upload(&token, "Lecture Notes.pdf", "application/pdf", &bytes).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "PDF uploaded successfully");
    assert_eq!(body["pdf"]["filename"], "Lecture Notes.pdf");
    assert_eq!(body["pdf"]["fileSize"], bytes.len() as u64);
    assert_eq!(body["pdf"]["pageCount"], 2);
    let uuid = body["pdf"]["uuid"].as_str().unwrap().to_string();

    let stored = app.stored_files();
    assert_eq!(stored.len(), 1);
    let stored_name = stored[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(stored_name.starts_with("pdf-"));
    assert!(stored_name.ends_with(".pdf"));

    let (status, body) = app.json(Method::GET, "/api/pdf/list", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pdfs"].as_array().unwrap().len(), 1);
    assert_eq!(body["pdfs"][0]["uuid"], uuid.as_str());
    assert_eq!(body["pdfs"][0]["originalName"], "Lecture Notes.pdf");

    let response = app
        .send(
            Request::builder()
                .uri(format!("/api/pdf/{}", uuid))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(headers[header::CONTENT_LENGTH], bytes.len().to_string().as_str());
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "inline; filename=\"Lecture Notes.pdf\""
    );
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-store, must-revalidate");
    assert_eq!(headers[header::PRAGMA], "no-cache");
    assert_eq!(headers[header::EXPIRES], "0");

    let streamed = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(streamed.as_ref(), bytes.as_slice());
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;

    let older = app.upload_sample(&token, &["older"]).await;
    tick().await;
    let newer = app.upload_sample(&token, &["newer"]).await;

    let (status, body) = app.json(Method::GET, "/api/pdf/list", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<&str> = body["pdfs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|pdf| pdf["uuid"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![newer.as_str(), older.as_str()]);
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = spawn_app_with(|config| config.storage.max_upload_bytes = 4096).await;
    let token = app.register("Ada", "ada@example.com").await;

    let (status, body) = app
        .upload_field(&token, "file", "a.pdf", "application/pdf", &sample_pdf(&["x"]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No file uploaded");

    let (status, body) = app.upload(&token, "a.txt", "text/plain", b"%PDF-1.4 but text").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Only PDF files are allowed");

    let (status, body) = app.upload(&token, "fake.pdf", "application/pdf", b"PK\x03\x04 zip").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Only PDF files are allowed");

    let mut oversized = b"%PDF-1.4\n".to_vec();
    oversized.resize(8192, b' ');
    let (status, body) = app.upload(&token, "big.pdf", "application/pdf", &oversized).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");

    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_unparseable_pdf_is_stored_without_page_count() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;

    let (status, body) = app
        .upload(&token, "broken.pdf", "application/pdf", b"%PDF-1.4 not really a pdf")
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["pdf"]["pageCount"].is_null());
}

#[tokio::test]
async fn test_pdfs_are_private_to_their_owner() {
    let app = spawn_app().await;
    let ada = app.register("Ada", "ada@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let uuid = app.upload_sample(&ada, &["secret"]).await;

    let (status, body) = app.json(Method::GET, &format!("/api/pdf/{}", uuid), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "PDF not found");

    let (status, body) = app.json(Method::GET, "/api/pdf/list", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["pdfs"].as_array().unwrap().is_empty());

    let (status, _) = app.json(Method::DELETE, &format!("/api/pdf/{}", uuid), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_rename() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app.upload_sample(&token, &["page"]).await;
    let uri = format!("/api/pdf/{}/rename", uuid);

    let (status, body) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "newName": "  Chapter 1.pdf " })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "PDF renamed successfully");
    assert_eq!(body["pdf"]["uuid"], uuid.as_str());
    assert_eq!(body["pdf"]["filename"], "Chapter 1.pdf");

    let (status, body) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "newName": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid name provided");

    let (_, body) = app.json(Method::GET, "/api/pdf/list", Some(&token), None).await;
    assert_eq!(body["pdfs"][0]["originalName"], "Chapter 1.pdf");
}

#[tokio::test]
async fn test_health_reports_missing_file() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app.upload_sample(&token, &["page"]).await;
    let uri = format!("/api/pdf/{}/health", uuid);

    let (status, body) = app.json(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fileExists"], true);
    assert_eq!(body["sizeMatch"], true);
    assert_eq!(body["checksumMatch"], true);
    assert_eq!(body["fileSize"], body["databaseSize"]);

    for path in app.stored_files() {
        std::fs::remove_file(path).unwrap();
    }

    let (status, body) = app.json(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fileExists"], false);
    assert!(body.get("sizeMatch").is_none());

    let (status, body) = app.json(Method::GET, &format!("/api/pdf/{}", uuid), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "File not found on server");
}

#[tokio::test]
async fn test_search_counts_matches_per_page() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app
        .upload_sample(&token, &["Alpha beta gamma", "nothing here", "Beta BETA beta"])
        .await;

    let (status, body) = app
        .json(Method::GET, &format!("/api/pdf/{}/search?q=beta", uuid), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "beta");
    assert_eq!(body["totalMatches"], 4);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["pageNumber"], 1);
    assert_eq!(results[0]["matchCount"], 1);
    assert_eq!(results[1]["pageNumber"], 3);
    assert_eq!(results[1]["matchCount"], 3);
    assert!(results[0]["preview"].as_str().unwrap().ends_with("..."));

    let (status, _) = app
        .json(Method::GET, &format!("/api/pdf/{}/search?q=%20%20", uuid), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_of_unparseable_pdf_is_bad_request() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let (_, body) = app
        .upload(&token, "broken.pdf", "application/pdf", b"%PDF-1.4 not really a pdf")
        .await;
    let uuid = body["pdf"]["uuid"].as_str().unwrap();

    let (status, body) = app
        .json(Method::GET, &format!("/api/pdf/{}/search?q=word", uuid), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_FORMAT");
}

#[tokio::test]
async fn test_delete_cascades_to_annotations_and_file() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app.upload_sample(&token, &["one", "two"]).await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/highlight",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "highlightedText": "one" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .json(
            Method::POST,
            "/api/drawing",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 2, "drawingData": [{ "points": [1, 2] }] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .json(
            Method::POST,
            "/api/note",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "x": 10.0, "y": 20.0, "content": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.json(Method::DELETE, &format!("/api/pdf/{}", uuid), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "PDF deleted successfully");
    assert!(app.stored_files().is_empty());

    let (status, _) = app.json(Method::GET, &format!("/api/pdf/{}", uuid), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.json(Method::GET, &format!("/api/highlight/{}", uuid), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.json(Method::GET, "/api/pdf/list", Some(&token), None).await;
    assert!(body["pdfs"].as_array().unwrap().is_empty());
}

// ============================================================================
// Highlights
// ============================================================================

#[tokio::test]
async fn test_highlight_lifecycle() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app.upload_sample(&token, &["one", "two", "three"]).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/highlight",
            Some(&token),
            Some(json!({
                "pdfUuid": uuid,
                "pageNumber": 3,
                "highlightedText": "three",
                "position": { "x": 1, "y": 2, "width": 30, "height": 8 },
                "boundingBox": { "left": 1, "top": 2, "right": 31, "bottom": 10 },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Highlight created successfully");
    assert_eq!(body["highlight"]["color"], "#ffff00");
    assert_eq!(body["highlight"]["pdfUuid"], uuid.as_str());
    assert_eq!(body["highlight"]["position"]["width"], 30);
    let highlight_id = body["highlight"]["_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .json(
            Method::POST,
            "/api/highlight",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "highlightedText": "one", "color": "#00ff00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.json(Method::GET, &format!("/api/highlight/{}", uuid), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let pages: Vec<i64> = body["highlights"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["pageNumber"].as_i64().unwrap())
        .collect();
    assert_eq!(pages, vec![1, 3]);

    let uri = format!("/api/highlight/{}", highlight_id);
    let (status, body) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "comment": "key point", "color": "#ff0000" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Highlight updated successfully");
    assert_eq!(body["highlight"]["comment"], "key point");
    assert_eq!(body["highlight"]["color"], "#ff0000");
    assert_eq!(body["highlight"]["highlightedText"], "three");

    let (status, body) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "comment": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["highlight"]["comment"], Value::Null);
    assert_eq!(body["highlight"]["color"], "#ff0000");
    assert_eq!(body["highlight"]["position"]["width"], 30);

    let (status, body) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Highlight deleted successfully");

    let (status, body) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Highlight not found");
}

#[tokio::test]
async fn test_highlight_validation_and_ownership() {
    let app = spawn_app().await;
    let ada = app.register("Ada", "ada@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let uuid = app.upload_sample(&ada, &["one"]).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/highlight",
            Some(&ada),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "highlightedText": "one", "color": "yellow" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "color");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/highlight",
            Some(&ada),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 0, "highlightedText": "one" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/highlight",
            Some(&bob),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "highlightedText": "one" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "PDF not found");

    let (status, _) = app.json(Method::GET, &format!("/api/highlight/{}", uuid), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Drawings
// ============================================================================

#[tokio::test]
async fn test_drawing_lifecycle() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app.upload_sample(&token, &["one", "two"]).await;

    let stroke = json!({ "paths": [{ "color": "#000000", "points": [[0, 0], [10, 10]] }] });
    let (status, body) = app
        .json(
            Method::POST,
            "/api/drawing",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 2, "drawingData": stroke })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["drawing"]["drawingData"], stroke);
    let drawing_id = body["drawing"]["_id"].as_str().unwrap().to_string();

    tick().await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/drawing",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "drawingData": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let newer_id = body["drawing"]["_id"].as_str().unwrap().to_string();

    let (status, body) = app.json(Method::GET, &format!("/api/drawing/{}", uuid), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["drawings"][0]["_id"], newer_id.as_str());
    assert_eq!(body["drawings"][1]["_id"], drawing_id.as_str());

    let (status, body) = app
        .json(Method::GET, &format!("/api/drawing/{}/page/2", uuid), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["drawings"][0]["_id"], drawing_id.as_str());

    let (status, _) = app
        .json(Method::GET, &format!("/api/drawing/{}/page/0", uuid), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/drawing/{}", drawing_id);
    let (status, body) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Drawing not found");
}

#[tokio::test]
async fn test_drawing_data_must_be_structured() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app.upload_sample(&token, &["one"]).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/drawing",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "drawingData": "M0 0 L10 10" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "drawingData");
}

// ============================================================================
// Notes
// ============================================================================

#[tokio::test]
async fn test_note_lifecycle() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app.upload_sample(&token, &["one", "two"]).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/note",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "x": 12.5, "y": 40.0, "content": "  check this  " })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["note"]["content"], "check this");
    let note_id = body["note"]["_id"].as_str().unwrap().to_string();

    tick().await;
    let (status, _) = app
        .json(
            Method::POST,
            "/api/note",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 2, "x": 0, "y": 0, "content": "second" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.json(Method::GET, &format!("/api/note/{}", uuid), Some(&token), None).await;
    assert_eq!(body["notes"].as_array().unwrap().len(), 2);
    assert_eq!(body["notes"][0]["content"], "second");
    assert_eq!(body["notes"][1]["_id"], note_id.as_str());

    let (_, body) = app
        .json(Method::GET, &format!("/api/note/{}/page/2", uuid), Some(&token), None)
        .await;
    assert_eq!(body["notes"].as_array().unwrap().len(), 1);
    assert_eq!(body["notes"][0]["content"], "second");

    let uri = format!("/api/note/{}", note_id);
    tick().await;
    let (status, body) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "content": "updated", "x": 99.0 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"]["content"], "updated");
    assert_eq!(body["note"]["x"], 99.0);
    assert_eq!(body["note"]["y"], 40.0);
    assert!(timestamp(&body["note"]["updatedAt"]) > timestamp(&body["note"]["createdAt"]));

    let (status, body) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note deleted successfully");

    let (status, body) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "content": "too late" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Note not found");
}

#[tokio::test]
async fn test_note_validation() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app.upload_sample(&token, &["one"]).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/note",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "x": 1, "y": 1, "content": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "content");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/note",
            Some(&token),
            Some(json!({ "pdfUuid": uuid, "pageNumber": 1, "x": -5, "y": 1, "content": "note" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "x");
}

// ============================================================================
// Malformed input
// ============================================================================

async fn assert_error_body(response: Response, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], code, "{}", body);
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_malformed_bodies_get_error_body() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;

    // Missing pdfUuid
    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/highlight")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "pageNumber": 1 }).to_string()))
                .unwrap(),
        )
        .await;
    assert_error_body(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/note")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await;
    assert_error_body(response, StatusCode::BAD_REQUEST, "INVALID_FORMAT").await;

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .body(Body::from(json!({ "email": "a@b.c", "password": "x" }).to_string()))
                .unwrap(),
        )
        .await;
    assert_error_body(response, StatusCode::BAD_REQUEST, "INVALID_FORMAT").await;
}

#[tokio::test]
async fn test_malformed_path_params_get_error_body() {
    let app = spawn_app().await;
    let token = app.register("Ada", "ada@example.com").await;
    let uuid = app.upload_sample(&token, &["one"]).await;

    for uri in [
        "/api/pdf/not-a-uuid".to_string(),
        "/api/highlight/not-a-uuid".to_string(),
        format!("/api/note/{}/page/abc", uuid),
        format!("/api/drawing/{}/page/abc", uuid),
    ] {
        let response = app
            .send(
                Request::builder()
                    .uri(&uri)
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_error_body(response, StatusCode::BAD_REQUEST, "INVALID_FORMAT").await;
    }
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let app = spawn_app_with(|config| {
        config.rate_limit.enabled = true;
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 2;
    })
    .await;

    let mut statuses = Vec::new();
    for _ in 0..4 {
        let (status, _) = app.json(Method::GET, "/health", None, None).await;
        statuses.push(status);
    }

    assert_eq!(statuses[0], StatusCode::OK);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}
