//! Integration tests for the HTTP API layer.
//!
//! Runs the client against a local mock backend.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, body_string, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use invest_common::ApiConfig;
use invest_screener::api::{AuthService, RegisterRequest};
use invest_screener::{
    ApiClient, ApiError, AuthProvider, FilterCatalog, HttpScreeningService, OptionsCache,
    RatingLetter, ScreenerStore, ScreeningService, Session,
};

fn client(server: &MockServer, auth: Arc<dyn AuthProvider>) -> ApiClient {
    let config = ApiConfig {
        base_url: server.uri(),
        timeout_ms: 5_000,
    };
    ApiClient::new(&config, auth).unwrap()
}

fn empty_page() -> serde_json::Value {
    json!({ "results": [], "total_count": 0, "limit": 50, "offset": 0 })
}

/// Anonymous provider that counts auth failures.
#[derive(Default)]
struct CountingAuth {
    failures: AtomicUsize,
}

impl AuthProvider for CountingAuth {
    fn access_token(&self) -> Option<String> {
        None
    }

    fn on_auth_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Screening
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_screen_sends_token_trace_id_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/screener/"))
        .and(header("authorization", "Bearer tok"))
        .and(header_exists("x-trace-id"))
        .and(body_partial_json(json!({
            "sort_by": "ticker",
            "sort_order": "asc",
            "limit": 50,
            "offset": 50,
            "exchange": ["NYSE"],
            "rating": { "min": 2, "max": 3 },
            "pe_ratio": { "min": 5.0, "max": 20.0 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "symbol_id": "XOM.US", "ticker": "XOM", "name": "Exxon Mobil", "exchange": "NYSE" }
            ],
            "total_count": 51,
            "limit": 50,
            "offset": 50
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(Session::in_memory());
    session.begin("tok").unwrap();
    let service = HttpScreeningService::new(client(&server, session));

    let store = ScreenerStore::new(FilterCatalog::standard());
    store.hydrate_from_query_string("?exchange=NYSE&pe_ratio=5-20&page=2");
    store.set_primary_ratings(vec![RatingLetter::A, RatingLetter::B]);
    store.set_page(2);

    let response = service.screen_stocks(&store.derive_request()).await.unwrap();
    assert_eq!(response.total_count, 51);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].ticker, "XOM");
}

#[tokio::test]
async fn test_anonymous_request_has_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/screener/"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/screener/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .mount(&server)
        .await;

    let service = HttpScreeningService::new(client(&server, Arc::new(Session::in_memory())));
    let request = ScreenerStore::new(FilterCatalog::standard()).derive_request();

    let response = service.screen_stocks(&request).await.unwrap();
    assert_eq!(response.total_count, 0);
}

#[tokio::test]
async fn test_server_error_maps_to_display_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/screener/"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "detail": "maintenance" })))
        .mount(&server)
        .await;

    let service = HttpScreeningService::new(client(&server, Arc::new(CountingAuth::default())));
    let request = ScreenerStore::new(FilterCatalog::standard()).derive_request();

    let err = service.screen_stocks(&request).await.unwrap_err();
    assert_eq!(err.status(), 503);
    assert_eq!(err.detail(), Some("maintenance"));
    assert_eq!(err.user_message(), "Server error. Try again later.");
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/screener/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let service = HttpScreeningService::new(client(&server, Arc::new(CountingAuth::default())));
    let request = ScreenerStore::new(FilterCatalog::standard()).derive_request();

    let err = service.screen_stocks(&request).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let config = ApiConfig {
        base_url: "http://127.0.0.1:9".into(),
        timeout_ms: 5_000,
    };
    let client = ApiClient::new(&config, Arc::new(CountingAuth::default())).unwrap();
    let service = HttpScreeningService::new(client);
    let request = ScreenerStore::new(FilterCatalog::standard()).derive_request();

    let err = service.screen_stocks(&request).await.unwrap_err();
    assert_eq!(err.status(), 0);
    assert_eq!(err.user_message(), "Connection error. Check your internet connection.");
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rejected_token_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(Session::in_memory());
    session.begin("stale").unwrap();
    let auth = AuthService::new(client(&server, session.clone()));

    let err = auth.current_user().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_unauthorized_without_token_keeps_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Incorrect email or password" })),
        )
        .mount(&server)
        .await;

    let counting = Arc::new(CountingAuth::default());
    let auth = AuthService::new(client(&server, counting.clone()));

    let err = auth.login("ana@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.user_message(), "Incorrect email or password.");
    assert_eq!(counting.failures.load(Ordering::SeqCst), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth endpoints
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_posts_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("username=ana%40example.com&password=secret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok", "token_type": "bearer" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": 7, "username": "ana", "email": "ana@example.com" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(Session::in_memory());
    let auth = AuthService::new(client(&server, session.clone()));

    let grant = auth.login("ana@example.com", "secret").await.unwrap();
    session.begin(grant.access_token).unwrap();
    let user = auth.current_user().await.unwrap();
    session.set_user(user).unwrap();

    assert_eq!(session.user().map(|u| u.username), Some("ana".to_string()));
}

#[tokio::test]
async fn test_register_conflict_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_partial_json(json!({ "email": "ana@example.com", "username": "ana" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "detail": "Username already taken" })))
        .mount(&server)
        .await;

    let auth = AuthService::new(client(&server, Arc::new(CountingAuth::default())));
    let request = RegisterRequest {
        email: "ana@example.com".into(),
        username: "ana".into(),
        password: "secret123".into(),
        first_name: None,
        last_name: None,
    };

    let err = auth.register(&request).await.unwrap_err();
    assert_eq!(err.status(), 409);
    assert_eq!(err.user_message(), "This username is already taken.");
}

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_options_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/screener/options"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "countries": ["US"],
            "exchanges": ["NASDAQ", "NYSE"],
            "sectors": ["Energy", "Technology"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpScreeningService::new(client(&server, Arc::new(CountingAuth::default())));
    let cache = OptionsCache::new(Arc::new(service));

    let first = cache.fetch().await.unwrap();
    let second = cache.fetch().await.unwrap();

    assert_eq!(first.exchanges, vec!["NASDAQ", "NYSE"]);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!cache.state().is_loading);
}
