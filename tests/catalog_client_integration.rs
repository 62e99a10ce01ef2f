//! Integration tests for the signed catalog client against a mock API.

#![allow(clippy::unwrap_used)]

use archiver_core::catalog::{
    ApiClient, Catalog, CatalogError, Session, SignedCatalog, page_image_urls, sign_request,
};
use archiver_core::config::ApiSettings;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return socket_skip_return();
        };
        mock_server
    }};
}

const API_KEY: &str = "test-api-key";
const SECRET: &str = "test-secret";
const NONCE: &str = "test-nonce";

fn settings(server: &MockServer) -> ApiSettings {
    ApiSettings {
        base_url: server.uri(),
        api_key: API_KEY.to_string(),
        secret_key: SECRET.to_string(),
        nonce: NONCE.to_string(),
        ..ApiSettings::default()
    }
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": 200, "message": "success", "data": data}))
}

fn catalog(server: &MockServer) -> SignedCatalog {
    SignedCatalog::new(ApiClient::new(&settings(server)).unwrap(), Session::new("tok"))
}

/// Recomputes the signature from the request's own `time` header.
struct ValidSignature {
    endpoint: &'static str,
    method: &'static str,
}

impl Match for ValidSignature {
    fn matches(&self, request: &Request) -> bool {
        let header_value = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let (Some(time), Some(signature)) = (header_value("time"), header_value("signature"))
        else {
            return false;
        };
        sign_request(self.endpoint, &time, NONCE, self.method, API_KEY, SECRET)
            .is_ok_and(|expected| expected == signature)
    }
}

// ==================== Login Tests ====================

#[tokio::test]
async fn test_login_returns_session_token() {
    let mock_server = require_mock_server!();
    Mock::given(method("POST"))
        .and(path("/auth/sign-in"))
        .and(header("api-key", API_KEY))
        .and(header("nonce", NONCE))
        .and(header("app-platform", "android"))
        .and(header("accept", "application/vnd.picacomic.com.v1+json"))
        .and(header_exists("time"))
        .and(ValidSignature {
            endpoint: "auth/sign-in",
            method: "POST",
        })
        .and(body_json(json!({"email": "reader@example.com", "password": "pw"})))
        .respond_with(ok(json!({"token": "session-token"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&settings(&mock_server)).unwrap();
    let session = client.login("reader@example.com", "pw").await.unwrap();
    assert_eq!(session.token(), "session-token");
}

#[tokio::test]
async fn test_login_rejected_is_auth_error() {
    let mock_server = require_mock_server!();
    Mock::given(method("POST"))
        .and(path("/auth/sign-in"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "error": "1004",
            "message": "invalid email or password"
        })))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&settings(&mock_server)).unwrap();
    let err = client.login("reader@example.com", "wrong").await.unwrap_err();
    assert!(err.is_auth(), "expected auth error, got {err}");
    assert!(err.to_string().contains("invalid email or password"));
}

#[tokio::test]
async fn test_login_without_token_is_auth_error() {
    let mock_server = require_mock_server!();
    Mock::given(method("POST"))
        .and(path("/auth/sign-in"))
        .respond_with(ok(json!({})))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&settings(&mock_server)).unwrap();
    assert!(client.login("a", "b").await.unwrap_err().is_auth());
}

// ==================== Listing Tests ====================

#[tokio::test]
async fn test_list_episodes_signs_path_and_query() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/comics/c1/eps"))
        .and(query_param("page", "2"))
        .and(header("authorization", "tok"))
        .and(ValidSignature {
            endpoint: "comics/c1/eps?page=2",
            method: "GET",
        })
        .respond_with(ok(json!({"eps": {
            "docs": [{"_id": "e1", "title": "Ep1", "order": 1}],
            "pages": 2, "total": 41, "page": 2, "limit": 40
        }})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = catalog(&mock_server).list_episodes("c1", 2).await.unwrap();
    assert_eq!(page.total, 41);
    assert_eq!(page.pages, 2);
    assert_eq!(page.docs[0].title, "Ep1");
}

#[tokio::test]
async fn test_list_favorites_and_search() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/users/favourite"))
        .and(query_param("page", "1"))
        .respond_with(ok(json!({"comics": {
            "docs": [{"_id": "c1", "title": "Fav", "categories": ["全彩"]}],
            "pages": 3
        }})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/comics/advanced-search"))
        .and(query_param("page", "1"))
        .and(body_json(json!({"keyword": "纯爱", "sort": "dd"})))
        .respond_with(ok(json!({"comics": {
            "docs": [{"_id": "s1", "title": "Found"}],
            "pages": 1
        }})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let catalog = catalog(&mock_server);
    let favorites = catalog.list_favorites(1).await.unwrap();
    assert_eq!(favorites.pages, 3);
    assert_eq!(favorites.docs[0].id, "c1");

    let found = catalog.search_comics("纯爱", 1).await.unwrap();
    assert_eq!(found.docs[0].title, "Found");
}

#[tokio::test]
async fn test_page_image_urls_joins_media_and_stops_on_empty_page() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/comics/c1/order/3/pages"))
        .and(query_param("page", "1"))
        .respond_with(ok(json!({"pages": {"docs": [
            {"media": {"fileServer": "https://s3.example.com", "path": "a/1.jpg", "originalName": "1.jpg"}},
            {"media": {"fileServer": "https://s3.example.com", "path": "a/2.jpg", "originalName": "2.jpg"}}
        ]}, "ep": {"title": "Ep3"}})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/comics/c1/order/3/pages"))
        .and(query_param("page", "2"))
        .respond_with(ok(json!({"pages": {"docs": []}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let urls = page_image_urls(&catalog(&mock_server), "c1", 3).await.unwrap();
    assert_eq!(
        urls,
        vec![
            "https://s3.example.com/static/a/1.jpg",
            "https://s3.example.com/static/a/2.jpg"
        ]
    );
}

#[tokio::test]
async fn test_fetch_metadata_and_toggle_favorite() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/comics/c1"))
        .respond_with(ok(json!({"comic": {
            "_id": "c1", "title": "T", "author": "A", "categories": ["x"],
            "pagesCount": 40, "epsCount": 2, "finished": true,
            "updated_at": "2024-03-01T12:00:00.000Z", "isFavourite": true
        }})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/comics/c1/favourite"))
        .and(ValidSignature {
            endpoint: "comics/c1/favourite",
            method: "POST",
        })
        .respond_with(ok(json!({"action": "un_favourite"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let catalog = catalog(&mock_server);
    let detail = catalog.fetch_comic_metadata("c1").await.unwrap();
    assert!(detail.finished);
    assert!(detail.is_favourite);
    assert_eq!(detail.pages_count, 40);

    catalog.set_favorite("c1").await.unwrap();
}

// ==================== Error Mapping Tests ====================

#[tokio::test]
async fn test_non_json_error_page_is_http_status() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/users/favourite"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&mock_server)
        .await;

    let err = catalog(&mock_server).list_favorites(1).await.unwrap_err();
    assert!(matches!(err, CatalogError::HttpStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_application_error_code_is_api_error() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/comics/gone"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400, "error": "1014", "message": "comic not found"
        })))
        .mount(&mock_server)
        .await;

    let err = catalog(&mock_server)
        .fetch_comic_metadata("gone")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Api { code: 400, .. }));
}

#[tokio::test]
async fn test_expired_session_is_auth_error() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/users/favourite"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401, "error": "1005", "message": "unauthorized"
        })))
        .mount(&mock_server)
        .await;

    assert!(catalog(&mock_server).list_favorites(1).await.unwrap_err().is_auth());
}

#[tokio::test]
async fn test_missing_field_is_decode_error() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/comics/c1/eps"))
        .respond_with(ok(json!({"eps": {"docs": []}})))
        .mount(&mock_server)
        .await;

    let err = catalog(&mock_server).list_episodes("c1", 1).await.unwrap_err();
    assert!(matches!(err, CatalogError::Decode { .. }));
}
