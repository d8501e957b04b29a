use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{
    header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION, ORIGIN,
    },
    HeaderValue, Method, StatusCode,
};
use axum_test::TestServer;
use serde_json::json;

use mood2movie_api::{
    api::{build_app, create_router, AppState},
    config::Config,
    db::{HistoryStore, InMemoryHistoryStore},
    error::{AppError, AppResult},
    models::SearchHistoryEntry,
    services::{
        identity::{IdentityVerifier, VerifiedUser},
        GenerationProvider,
    },
};

const FENCED_REPLY: &str = "```json\n[\n  {\"title\": \"Up\", \"year\": \"2009\", \"reason\": \"Uplifting.\"},\n  {\"title\": \"Amelie\", \"year\": 2001, \"genre\": \"Romance\", \"rating\": \"8.3\", \"reason\": \"Whimsical.\"}\n]\n```";

/// Replies with fixed text and remembers the prompts it saw
struct StubProvider {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl StubProvider {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl GenerationProvider for StubProvider {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(AppError::Upstream)
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Takes longer than any test deadline to answer
struct SlowProvider;

#[async_trait::async_trait]
impl GenerationProvider for SlowProvider {
    async fn generate(&self, _prompt: &str) -> AppResult<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(FENCED_REPLY.to_string())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Accepts "Bearer valid-<uid>" tokens
struct StubVerifier;

#[async_trait::async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> AppResult<VerifiedUser> {
        token
            .strip_prefix("valid-")
            .map(|uid| VerifiedUser {
                uid: uid.to_string(),
                name: None,
            })
            .ok_or_else(|| AppError::Unauthorized("unknown token".to_string()))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// History store that always fails
struct BrokenStore;

#[async_trait::async_trait]
impl HistoryStore for BrokenStore {
    async fn append(&self, _entry: &SearchHistoryEntry) -> AppResult<()> {
        Err(AppError::Persistence("connection refused".to_string()))
    }

    async fn query_recent(&self, _user_id: &str, _limit: i64) -> AppResult<Vec<SearchHistoryEntry>> {
        Err(AppError::Persistence("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

fn create_test_server_with(
    provider: Arc<StubProvider>,
    history: Arc<dyn HistoryStore>,
) -> TestServer {
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(StubVerifier);
    let state = AppState::new(provider, history, Some(verifier));
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

fn create_test_server(provider: Arc<StubProvider>) -> TestServer {
    create_test_server_with(provider, Arc::new(InMemoryHistoryStore::new()))
}

fn create_full_app_server(
    provider: Arc<dyn GenerationProvider>,
    extra_vars: &[(&str, &str)],
) -> TestServer {
    let mut vars = vec![("GEMINI_API_KEY".to_string(), "test-key".to_string())];
    vars.extend(
        extra_vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    );
    let config = Config::from_vars(vars).unwrap();

    let state = AppState::new(provider, Arc::new(InMemoryHistoryStore::new()), None);
    let app = build_app(state, &config).unwrap();
    TestServer::new(app).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(StubProvider::replying("[]"));
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_recommend_returns_normalized_movies() {
    let server = create_test_server(StubProvider::replying(FENCED_REPLY));

    let response = server
        .post("/recommend")
        .json(&json!({ "mood": "  wistful  " }))
        .await;

    response.assert_status_ok();
    let movies: Vec<serde_json::Value> = response.json();
    assert_eq!(movies.len(), 2);
    assert_eq!(
        movies[0],
        json!({
            "title": "Up",
            "year": "2009",
            "genre": "Drama",
            "rating": null,
            "reason": "Uplifting."
        })
    );
    assert_eq!(movies[1]["year"], "2001");
    assert_eq!(movies[1]["rating"], "8.3");
}

#[tokio::test]
async fn test_recommend_echoes_request_id() {
    let server = create_test_server(StubProvider::replying(FENCED_REPLY));

    let response = server
        .post("/recommend")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("client-123"),
        )
        .json(&json!({ "mood": "calm" }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-request-id"), "client-123");
}

#[tokio::test]
async fn test_empty_mood_rejected_without_calling_model() {
    let provider = StubProvider::replying(FENCED_REPLY);
    let server = create_test_server(provider.clone());

    for body in [json!({ "mood": "   " }), json!({})] {
        let response = server.post("/recommend").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: serde_json::Value = response.json();
        assert_eq!(error["error"], "Empty mood");
    }

    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn test_recommend_rejects_other_methods() {
    let server = create_test_server(StubProvider::replying(FENCED_REPLY));
    let response = server.get("/recommend").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_malformed_reply_is_hidden_from_user() {
    let server = create_test_server(StubProvider::replying(
        "Here are some great picks: Up (2009), Amelie (2001)",
    ));

    let response = server
        .post("/recommend")
        .json(&json!({ "mood": "happy" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "AI returned invalid response format");
    assert!(!response.text().contains("great picks"));
}

#[tokio::test]
async fn test_object_reply_is_invalid_format() {
    let server = create_test_server(StubProvider::replying(r#"{"title":"A"}"#));

    let response = server
        .post("/recommend")
        .json(&json!({ "mood": "happy" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "AI returned invalid response format");
}

#[tokio::test]
async fn test_reply_without_valid_movies() {
    let server = create_test_server(StubProvider::replying(
        r#"[{"title":"","year":"2009","reason":"x"}]"#,
    ));

    let response = server
        .post("/recommend")
        .json(&json!({ "mood": "happy" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let error: serde_json::Value = response.json();
    assert_eq!(
        error["error"],
        "No valid movie recommendations could be generated"
    );
}

#[tokio::test]
async fn test_upstream_failure_message() {
    let server = create_test_server(StubProvider::failing("quota exceeded"));

    let response = server
        .post("/recommend")
        .json(&json!({ "mood": "happy" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "AI service temporarily unavailable");
    assert!(!response.text().contains("quota"));
}

#[tokio::test]
async fn test_history_requires_authentication() {
    let server = create_test_server(StubProvider::replying(FENCED_REPLY));

    let response = server.get("/api/history").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "Authentication required");

    let response = server
        .get("/api/history")
        .add_header(AUTHORIZATION, bearer("forged"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authenticated_searches_appear_in_history() {
    let provider = StubProvider::replying(FENCED_REPLY);
    let server = create_test_server(provider.clone());

    for mood in ["sleepy", "restless"] {
        server
            .post("/recommend")
            .add_header(AUTHORIZATION, bearer("valid-alice"))
            .json(&json!({ "mood": mood }))
            .await
            .assert_status_ok();
    }

    // Anonymous and other users' searches stay out of alice's history
    server
        .post("/recommend")
        .json(&json!({ "mood": "anonymous mood" }))
        .await
        .assert_status_ok();
    server
        .post("/recommend")
        .add_header(AUTHORIZATION, bearer("valid-bob"))
        .json(&json!({ "mood": "bob mood" }))
        .await
        .assert_status_ok();

    let response = server
        .get("/api/history")
        .add_header(AUTHORIZATION, bearer("valid-alice"))
        .await;
    response.assert_status_ok();

    let history: Vec<serde_json::Value> = response.json();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["mood"], "restless");
    assert_eq!(history[1]["mood"], "sleepy");
    assert_eq!(history[0]["movies"].as_array().unwrap().len(), 2);
    assert!(history[0]["id"].is_string());
    assert!(history[0]["timestamp"].is_string());
    assert!(history[0].get("userId").is_none());
}

#[tokio::test]
async fn test_history_capped_at_ten() {
    let server = create_test_server(StubProvider::replying(FENCED_REPLY));

    for i in 0..12 {
        server
            .post("/recommend")
            .add_header(AUTHORIZATION, bearer("valid-carol"))
            .json(&json!({ "mood": format!("mood {}", i) }))
            .await
            .assert_status_ok();
    }

    let history: Vec<serde_json::Value> = server
        .get("/api/history")
        .add_header(AUTHORIZATION, bearer("valid-carol"))
        .await
        .json();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0]["mood"], "mood 11");
}

#[tokio::test]
async fn test_signed_in_users_get_personalized_prompt() {
    let provider = StubProvider::replying(FENCED_REPLY);
    let server = create_test_server(provider.clone());

    server
        .post("/recommend")
        .json(&json!({ "mood": "bored" }))
        .await
        .assert_status_ok();
    server
        .post("/recommend")
        .add_header(AUTHORIZATION, bearer("valid-dave"))
        .json(&json!({ "mood": "bored" }))
        .await
        .assert_status_ok();
    server
        .post("/recommend")
        .json(&json!({ "mood": "bored", "personalized": true }))
        .await
        .assert_status_ok();

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains(r#"feels "bored""#));
    assert!(!prompts[0].contains("returning viewer"));
    assert!(prompts[1].contains("returning viewer"));
    assert!(prompts[2].contains("returning viewer"));
}

#[tokio::test]
async fn test_history_write_failure_still_returns_movies() {
    let server = create_test_server_with(
        StubProvider::replying(FENCED_REPLY),
        Arc::new(BrokenStore),
    );

    let response = server
        .post("/recommend")
        .add_header(AUTHORIZATION, bearer("valid-erin"))
        .json(&json!({ "mood": "hopeful" }))
        .await;
    response.assert_status_ok();
    let movies: Vec<serde_json::Value> = response.json();
    assert_eq!(movies.len(), 2);

    let response = server
        .get("/api/history")
        .add_header(AUTHORIZATION, bearer("valid-erin"))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "Failed to fetch history");
}

#[tokio::test]
async fn test_unreadable_bodies_answer_with_json_errors() {
    let provider = StubProvider::replying(FENCED_REPLY);
    let server = create_test_server(provider.clone());

    let response = server
        .post("/recommend")
        .json(&json!({ "mood": null }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "Empty mood");

    let response = server.post("/recommend").json(&json!({ "mood": 5 })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "Invalid request body");

    let response = server.post("/recommend").text("mood=happy").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "Invalid request body");

    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn test_cors_preflight_from_allowed_origin() {
    let server = create_full_app_server(
        StubProvider::replying(FENCED_REPLY),
        &[("CORS_ALLOWED_ORIGINS", "http://localhost:3000,https://mood2movie.web.app")],
    );

    let response = server
        .method(Method::OPTIONS, "/recommend")
        .add_header(ORIGIN, HeaderValue::from_static("https://mood2movie.web.app"))
        .add_header(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"))
        .await;

    let headers = response.headers();
    assert_eq!(
        headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://mood2movie.web.app"
    );
    assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
}

#[tokio::test]
async fn test_cors_preflight_from_unknown_origin() {
    let server = create_full_app_server(StubProvider::replying(FENCED_REPLY), &[]);

    let response = server
        .method(Method::OPTIONS, "/recommend")
        .add_header(ORIGIN, HeaderValue::from_static("https://evil.example"))
        .add_header(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"))
        .await;

    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_static_files_served_as_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hi there").unwrap();
    let static_dir = dir.path().to_str().unwrap().to_string();

    let server = create_full_app_server(
        StubProvider::replying(FENCED_REPLY),
        &[("STATIC_DIR", static_dir.as_str())],
    );

    let response = server.get("/hello.txt").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "hi there");

    // API routes still win over the static directory
    server.get("/health").await.assert_status_ok();
    server
        .get("/missing.txt")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_slow_generation_times_out_with_json_error() {
    let server = create_full_app_server(Arc::new(SlowProvider), &[("REQUEST_TIMEOUT_SECS", "1")]);

    let response = server
        .post("/recommend")
        .json(&json!({ "mood": "impatient" }))
        .await;

    response.assert_status(StatusCode::GATEWAY_TIMEOUT);
    let error: serde_json::Value = response.json();
    assert_eq!(error["error"], "Request timed out");
}
