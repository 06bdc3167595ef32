//! End-to-end tests against the full router with an in-process mock LLM.

use std::sync::Arc;

use amitybot_common::Config;
use amitybot_crm::CamClient;
use amitybot_kb::HashingEmbedder;
use amitybot_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};
use amitybot_web::{router::build_router, state::AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct MockLlm;

#[async_trait]
impl LlmBackend for MockLlm {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            content: "Amity offers B.Tech, MBA and BCA programmes.".into(),
            model: "mock".into(),
            prompt_tokens: 10,
            completion_tokens: 8,
        })
    }

    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::Unavailable("no embeddings".into()))
    }

    fn model_id(&self) -> &str { "mock" }
    fn backend_name(&self) -> &'static str { "mock" }
    fn is_local(&self) -> bool { true }
}

struct TestApp {
    router: Router,
    dir: TempDir,
}

async fn app() -> TestApp {
    app_with(|_| {}).await
}

async fn app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.kb.data_dir = dir.path().join("data");
    config.kb.store_dir = dir.path().join("store");
    configure(&mut config);

    let state = AppState::new(
        config,
        Arc::new(MockLlm),
        Arc::new(HashingEmbedder::new(64)),
        Arc::new(CamClient::with_fixtures()),
    )
    .await
    .unwrap();

    TestApp { router: build_router(Arc::new(state)), dir }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Names of the files currently stored in the knowledge-base directory.
    fn data_files(&self) -> Vec<String> {
        std::fs::read_dir(self.dir.path().join("data"))
            .map(|d| d.filter_map(|e| e.ok()).map(|e| e.file_name().to_string_lossy().into_owned()).collect())
            .unwrap_or_default()
    }

    /// Log in as the seeded admin and return the `Cookie` header value.
    async fn login(&self) -> String {
        let resp = self.send(form("/login", "username=admin&password=admin", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        session_cookie(&resp)
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn form(uri: &str, body: &'static str, cookie: Option<&str>) -> Request<Body> {
    let mut builder =
        Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body)).unwrap()
}

const BOUNDARY: &str = "amitybot-test-boundary";

/// Multipart body from `(name, filename, value)` parts.
fn multipart(uri: &str, parts: &[(&str, Option<&str>, &str)], cookie: Option<&str>) -> Request<Body> {
    let mut body = String::new();
    for (name, file_name, value) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match file_name {
            Some(f) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )),
            None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    let mut builder = Request::post(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body)).unwrap()
}

fn upload(file_name: &str, content: &str, cookie: &str) -> Request<Body> {
    multipart("/kb-upload", &[("file", Some(file_name), content)], Some(cookie))
}

fn session_cookie(resp: &Response) -> String {
    let raw = resp
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

async fn json_body(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_and_health() {
    let app = app().await;

    let body = json_body(app.send(get("/", None)).await).await;
    assert_eq!(body["status"], "healthy");

    let body = json_body(app.send(get("/health", None)).await).await;
    assert_eq!(body["service"], "Amity Bot API");
    assert_eq!(body["components"]["vector_store_chunks"], 0);
    assert_eq!(body["components"]["crm"], true);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = app().await;

    let body = json_body(app.send(get("/check-session", None)).await).await;
    assert_eq!(body["role"], "general");

    let cookie = app.login().await;
    assert!(cookie.starts_with("amitybot_session="));
    let body = json_body(app.send(get("/check-session", Some(&cookie))).await).await;
    assert_eq!(body["role"], "logged_in");

    let resp = app.send(post_json("/logout", json!({}), Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(app.send(get("/check-session", Some(&cookie))).await).await;
    assert_eq!(body["role"], "general");
}

#[tokio::test]
async fn test_bad_login_is_unauthorized() {
    let app = app().await;
    let resp = app.send(form("/login", "username=admin&password=nope", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(resp).await;
    assert_eq!(body["detail"], "Invalid credentials");
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_register_then_duplicate() {
    let app = app().await;
    let resp = app.send(form("/register", "username=student&password=amity2025", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_some());
    assert_eq!(json_body(resp).await["role"], "logged_in");

    let resp = app.send(form("/register", "username=student&password=other", None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["detail"], "User already exists");
}

#[tokio::test]
async fn test_admin_endpoints_require_session() {
    let app = app().await;
    for uri in ["/sync-logs", "/leads", "/leads/123"] {
        let resp = app.send(get(uri, None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
    let resp = app.send(post_json("/reindex", json!({}), None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chat_validation() {
    let app = app().await;

    let resp = app.send(post_json("/chat", json!({ "query": "   " }), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["detail"], "Query cannot be empty");

    let long = "a".repeat(1001);
    let resp = app.send(post_json("/chat", json!({ "query": long }), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.send(post_json("/chat", json!({ "nope": 1 }), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_answers_and_assigns_session() {
    let app = app().await;
    let resp = app
        .send(post_json("/chat", json!({ "query": "Which courses are offered?" }), None))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert!(!body["session_id"].as_str().unwrap().is_empty());
    assert_eq!(body["result"], "Amity offers B.Tech, MBA and BCA programmes.");
    assert_eq!(body["source_docs"], json!([]));

    let resp = app
        .send(post_json(
            "/chat",
            json!({ "query": "And the fees?", "session_id": "abc" }),
            None,
        ))
        .await;
    assert_eq!(json_body(resp).await["session_id"], "abc");
}

#[tokio::test]
async fn test_lead_tool_needs_logged_in_session() {
    let app = app().await;
    let query = json!({ "query": "What is the status of lead 123?", "role": "logged_in" });

    // the requested role is clamped to the anonymous session
    let body = json_body(app.send(post_json("/chat", query.clone(), None)).await).await;
    assert!(!body["result"].as_str().unwrap().contains("John Doe"));

    let cookie = app.login().await;
    let body = json_body(app.send(post_json("/chat", query, Some(&cookie))).await).await;
    assert!(body["result"].as_str().unwrap().contains("John Doe"));
}

#[tokio::test]
async fn test_leads_endpoints() {
    let app = app().await;
    let cookie = app.login().await;

    let body = json_body(app.send(get("/leads?counselor=priya", Some(&cookie))).await).await;
    let ids: Vec<&str> = body.as_array().unwrap().iter().map(|l| l["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["123", "789"]);

    let resp = app.send(get("/leads/999", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["detail"], "No lead found with ID: 999");

    let resp = app
        .send(post_json(
            "/leads/456/status",
            json!({ "status": "Interested", "notes": "Replied by email" }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["old_status"], "Not Responding");
    assert_eq!(body["new_status"], "Interested");

    let body = json_body(app.send(get("/leads/456", Some(&cookie))).await).await;
    assert_eq!(body["status"], "Interested");
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let app = app().await;
    let cookie = app.login().await;
    let resp = app.send(upload("setup.exe", "MZ", &cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["detail"], "Unsupported file type: .exe");
}

#[tokio::test]
async fn test_upload_reindexes_and_logs_job() {
    let app = app().await;
    let cookie = app.login().await;

    let text = "Amity University admissions for the 2025 session open in May. \
                Hostel fees are payable each semester at the accounts office.";
    let resp = app.send(upload("admissions.txt", text, &cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["file"], "admissions.txt");
    assert!(body["chunks"].as_u64().unwrap() >= 1);

    let body = json_body(app.send(get("/sync-logs", Some(&cookie))).await).await;
    let jobs = body.as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["trigger"], "upload");
    assert_eq!(jobs[0]["status"], "success");

    let resp = app
        .send(post_json("/chat", json!({ "query": "When do admissions open?" }), None))
        .await;
    let body = json_body(resp).await;
    assert_eq!(body["source_docs"][0]["source"].as_str().map(|s| s.ends_with("admissions.txt")), Some(true));
}

#[tokio::test]
async fn test_reindex_without_documents_fails_cleanly() {
    let app = app().await;
    let cookie = app.login().await;

    let resp = app.send(post_json("/reindex", json!({}), Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["status"], "error");

    let body = json_body(app.send(get("/sync-logs", Some(&cookie))).await).await;
    assert_eq!(body[0]["status"], "failed");
    assert_eq!(body[0]["trigger"], "manual");
}

#[tokio::test]
async fn test_multipart_login() {
    let app = app().await;
    let resp = app
        .send(multipart("/login", &[("username", None, "admin"), ("password", None, "admin")], None))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = session_cookie(&resp);
    assert_eq!(json_body(resp).await["role"], "logged_in");

    let body = json_body(app.send(get("/check-session", Some(&cookie))).await).await;
    assert_eq!(body["role"], "logged_in");

    let resp = app
        .send(multipart("/login", &[("username", None, "admin"), ("password", None, "wrong")], None))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_multipart_login_missing_field() {
    let app = app().await;
    let resp = app.send(multipart("/login", &[("username", None, "admin")], None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["detail"], "username and password are required");
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_short_upload_is_rejected_and_not_kept() {
    let app = app().await;
    let cookie = app.login().await;

    let resp = app.send(upload("note.txt", "Fees due in July.", &cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let detail = json_body(resp).await["detail"].as_str().unwrap().to_string();
    assert!(detail.starts_with("Document too short to index"), "{detail}");
    assert!(app.data_files().is_empty(), "{:?}", app.data_files());

    // nothing was indexed, so no sync job ran
    let body = json_body(app.send(get("/sync-logs", Some(&cookie))).await).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_reindex_error_hides_data_path() {
    let app = app().await;
    let cookie = app.login().await;
    let body = json_body(app.send(post_json("/reindex", json!({}), Some(&cookie))).await).await;
    assert_eq!(body["message"], "No documents to index");
}

#[tokio::test]
async fn test_oversized_bodies_get_json_413() {
    let app = app_with(|c| c.server.max_upload_bytes = 1024).await;
    let cookie = app.login().await;

    let resp = app.send(post_json("/chat", json!({ "query": "a".repeat(4096) }), None)).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(resp).await["status"], "error");

    let resp = app.send(upload("big.txt", &"Amity campus notice. ".repeat(200), &cookie)).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(resp).await["status"], "error");
    assert!(app.data_files().is_empty());
}
