// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end requests through the assembled application.

use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_REQUEST_HEADERS,
            ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION,
            CONTENT_TYPE, ORIGIN, WWW_AUTHENTICATE,
        },
        Method, Request, StatusCode,
    },
    response::Response,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use back_end_server::{
    api,
    auth::{Claim, SigningKey, TokenIssuer},
    config::Settings,
    identity::{IdentityStore, MemoryIdentityStore},
    startup::bootstrap,
    state::AppState,
};

const SIGNING_KEY: &str = "integration-signing-key-0123456789abcdef";
const FRONTEND: &str = "http://localhost:3000";

struct TestApp {
    router: Router,
    identity: Arc<MemoryIdentityStore>,
}

impl TestApp {
    fn new() -> Self {
        let settings = Settings::from_lookup(|name| match name {
            "JWT_SIGNING_KEY" => Some(SIGNING_KEY.to_string()),
            "FRONTEND_URL" => Some(FRONTEND.to_string()),
            "STATIC_DIR" => Some("/nonexistent/wwwroot".to_string()),
            _ => None,
        })
        .unwrap();
        let security = bootstrap(&settings).unwrap();
        let identity = Arc::new(MemoryIdentityStore::new());
        let state = AppState::new(settings, security, identity.clone());
        Self {
            router: api::app(state).unwrap(),
            identity,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

fn issuer(secret: &str) -> TokenIssuer {
    TokenIssuer::new(&SigningKey::from_secret(secret), Duration::from_secs(3600))
}

fn token_with_role(role: &str) -> String {
    issuer(SIGNING_KEY)
        .issue(&[Claim::new("email", "caller@example.com"), Claim::new("role", role)])
        .unwrap()
        .token
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header(ORIGIN, FRONTEND);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn admin_token_passes_es_admin_policy() {
    let app = TestApp::new();
    app.identity.create_user("b@example.com", "secret-1").unwrap();
    app.identity.create_user("a@example.com", "secret-2").unwrap();

    let response = app
        .send(get("/api/accounts/users", Some(&token_with_role("admin"))))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["cantidadTotalRegistros"], "2");
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND);
    let exposed = response.headers()[ACCESS_CONTROL_EXPOSE_HEADERS]
        .to_str()
        .unwrap()
        .to_lowercase();
    assert!(exposed.contains("cantidadtotalregistros"));

    let users = json_body(response).await;
    assert_eq!(users[0]["email"], "a@example.com");
    assert_eq!(users[1]["email"], "b@example.com");
}

#[tokio::test]
async fn user_role_is_forbidden_not_unauthenticated() {
    let app = TestApp::new();
    let response = app
        .send(get("/api/accounts/users", Some(&token_with_role("user"))))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
}

#[tokio::test]
async fn token_expired_one_second_ago_is_unauthenticated() {
    let app = TestApp::new();
    let short = TokenIssuer::new(&SigningKey::from_secret(SIGNING_KEY), Duration::from_secs(60));
    let issued_at = Utc::now() - chrono::Duration::seconds(61);
    let token = short
        .issue_at(&[Claim::new("role", "admin")], issued_at)
        .unwrap()
        .token;

    let response = app.send(get("/api/accounts/users", Some(&token))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(WWW_AUTHENTICATE));
}

#[tokio::test]
async fn missing_token_on_protected_endpoint_is_unauthenticated() {
    let app = TestApp::new();
    let response = app.send(get("/api/accounts/users", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(get("/api/accounts/me", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_other_key_is_unauthenticated() {
    let app = TestApp::new();
    let token = issuer("some-other-signing-key-0123456789abcdef")
        .issue(&[Claim::new("role", "admin")])
        .unwrap()
        .token;

    let response = app.send(get("/api/accounts/users", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_claims_are_unauthenticated() {
    let app = TestApp::new();
    let token = token_with_role("user");
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let forged = json!({ "role": "admin", "exp": Utc::now().timestamp() + 3600 });
    parts[1] = URL_SAFE_NO_PAD.encode(forged.to_string());

    let response = app
        .send(get("/api/accounts/users", Some(&parts.join("."))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

fn has_cors_headers(response: &Response) -> bool {
    response
        .headers()
        .keys()
        .any(|name| name.as_str().starts_with("access-control-"))
}

#[tokio::test]
async fn other_origin_is_served_without_cors_headers() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header(ORIGIN, "https://elsewhere.example")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!has_cors_headers(&response));
}

#[tokio::test]
async fn other_origin_preflight_gets_no_cors_headers() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/accounts/users")
        .header(ORIGIN, "https://elsewhere.example")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
        .header(ACCESS_CONTROL_REQUEST_HEADERS, "authorization,x-custom")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert!(!has_cors_headers(&response));
}

#[tokio::test]
async fn preflight_is_answered_before_authentication() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/accounts/make-admin")
        .header(ORIGIN, FRONTEND)
        .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], "POST");
}

#[tokio::test]
async fn anonymous_endpoint_ignores_bad_token() {
    let app = TestApp::new();
    let response = app.send(get("/health", Some("not-a-jwt"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn anonymous_endpoint_sees_valid_caller() {
    let app = TestApp::new();
    let response = app
        .send(get("/health", Some(&token_with_role("user"))))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["authenticated"], true);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = TestApp::new();
    let response = app.send(get("/api/nothing-here", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new();
    let credentials = json!({ "email": "Nora@Example.com", "password": "hunter22" });

    let response = app
        .send(post_json("/api/accounts/register", None, credentials.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(post_json("/api/accounts/login", None, credentials))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = json_body(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.send(get("/api/accounts/me", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = json_body(response).await;
    assert_eq!(me["email"], "nora@example.com");
    assert_eq!(me["isAdmin"], false);

    let wrong = json!({ "email": "nora@example.com", "password": "not-it" });
    let response = app
        .send(post_json("/api/accounts/login", None, wrong))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn granted_role_applies_to_tokens_issued_afterwards() {
    let app = TestApp::new();
    let user = app.identity.create_user("kim@example.com", "password1").unwrap();
    let credentials = json!({ "email": "kim@example.com", "password": "password1" });

    let login = |app: &TestApp| {
        let request = post_json("/api/accounts/login", None, credentials.clone());
        let router = app.router.clone();
        async move {
            let response = router.oneshot(request).await.unwrap();
            json_body(response).await["token"]
                .as_str()
                .unwrap()
                .to_string()
        }
    };

    let before = login(&app).await;
    let response = app.send(get("/api/accounts/users", Some(&before))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(post_json(
            "/api/accounts/make-admin",
            Some(&token_with_role("admin")),
            json!({ "userId": user.id }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Validation never consults the store, so the old token keeps its claims.
    let response = app.send(get("/api/accounts/users", Some(&before))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let after = login(&app).await;
    let response = app.send(get("/api/accounts/users", Some(&after))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(post_json(
            "/api/accounts/remove-admin",
            Some(&after),
            json!({ "userId": user.id }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.identity.list_users(0, 10).unwrap().0[0].claims.is_empty());
}

#[tokio::test]
async fn make_admin_for_unknown_user_is_404() {
    let app = TestApp::new();
    let response = app
        .send(post_json(
            "/api/accounts/make-admin",
            Some(&token_with_role("admin")),
            json!({ "userId": "missing" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
