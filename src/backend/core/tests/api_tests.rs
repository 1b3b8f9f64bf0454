//! HTTP-level tests driving the router with an in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use tollbooth_core::api::{build_router, AppState};
use tollbooth_core::config::Config;
use tollbooth_core::models::{NewPrincipal, Principal};
use tollbooth_core::observability;
use tollbooth_core::store::MemoryStore;

struct TestApp {
    router: Router,
    state: AppState,
    admin_token: String,
    user: Principal,
    user_token: String,
}

async fn spawn_app() -> TestApp {
    let mut config = Config::default();
    config.auth.jwt_secret = "api-test-secret".into();

    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        &config,
        observability::metrics::detached(),
    )
    .unwrap();

    let admin = state
        .principals
        .create(NewPrincipal {
            username: "root".into(),
            password: "root-pw".into(),
            is_admin: true,
        })
        .await
        .unwrap();
    let user = state
        .principals
        .create(NewPrincipal {
            username: "alice".into(),
            password: "alice-pw".into(),
            is_admin: false,
        })
        .await
        .unwrap();

    let admin_token = state.auth.issue(&admin).unwrap().access_token;
    let user_token = state.auth.issue(&user).unwrap().access_token;

    TestApp {
        router: build_router(state.clone()),
        state,
        admin_token,
        user,
        user_token,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
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
        self.send(request).await
    }

    async fn create_plan(&self, services: &str, limit: i64) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/plans",
                Some(&self.admin_token),
                Some(json!({
                    "name": "Basic",
                    "description": "Basic plan",
                    "api_permissions": services,
                    "usage_limit": limit,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Public endpoints
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_reports_storage() {
    let app = spawn_app().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let app = spawn_app().await;
    let (status, _) = app.call(Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_form_login_issues_bearer_token() {
    let app = spawn_app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=alice&password=alice-pw"))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token_type"], "bearer");

    let token = body["data"]["access_token"].as_str().unwrap().to_string();
    let (status, me) = app.call(Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["username"], "alice");
}

#[tokio::test]
async fn test_json_login_is_accepted() {
    let app = spawn_app().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/token",
            None,
            Some(json!({"username": "root", "password": "root-pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["access_token"].is_string());
}

#[tokio::test]
async fn test_bad_login_is_unauthenticated() {
    let app = spawn_app().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/token",
            None,
            Some(json!({"username": "alice", "password": "nope"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(error_code(&body), "UNAUTHENTICATED");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authentication and authorization
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = spawn_app().await;
    let (status, body) = app.call(Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHENTICATED");

    let (status, _) = app.call(Method::GET, "/me", Some("admin_token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_never_exposes_the_secret() {
    let app = spawn_app().await;
    let (status, body) = app.call(Method::GET, "/me", Some(&app.user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], app.user.id.0);
    assert!(body["data"].get("credential_secret").is_none());
    assert!(!body.to_string().contains("alice-pw"));
}

#[tokio::test]
async fn test_non_admin_cannot_manage_plans() {
    let app = spawn_app().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/plans",
            Some(&app.user_token),
            Some(json!({"name": "Pro", "allowed_services": "storage", "usage_limit": 5})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");

    let (status, _) = app.call(Method::GET, "/users", Some(&app.user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Administration
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_admin_plan_lifecycle() {
    let app = spawn_app().await;
    let id = app.create_plan("storage,compute", 3).await;

    let (status, body) = app
        .call(Method::GET, &format!("/plans/{id}"), Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["allowed_services"], "storage,compute");
    assert_eq!(body["data"]["usage_limit"], 3);

    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/plans/{id}"),
            Some(&app.admin_token),
            Some(json!({"usage_limit": 10})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["usage_limit"], 10);
    assert_eq!(body["data"]["name"], "Basic");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/plans/{id}"),
            Some(&app.admin_token),
            Some(json!({"name": "Pro"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Pro");
    assert_eq!(body["data"]["usage_limit"], 10);

    let (status, body) = app.call(Method::GET, "/plans", Some(&app.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/plans/{id}"), Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(Method::GET, &format!("/plans/{id}"), Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "PLAN_NOT_FOUND");
}

#[tokio::test]
async fn test_negative_usage_limit_is_a_validation_error() {
    let app = spawn_app().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/plans",
            Some(&app.admin_token),
            Some(json!({"name": "Bad", "allowed_services": "storage", "usage_limit": -1})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_requests_use_the_error_body() {
    let app = spawn_app().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/plans",
            Some(&app.admin_token),
            Some(json!({"name": "NoLimit", "allowed_services": "storage"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("usage_limit"));

    let (status, body) = app
        .call(Method::GET, "/plans/not-a-number", Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    let (status, body) = app
        .call(Method::GET, "/users?limit=lots", Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    let (status, body) = app
        .call(Method::POST, "/me/subscription", Some(&app.user_token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_duplicate_permission_name_conflicts() {
    let app = spawn_app().await;
    let body = json!({"name": "storage", "description": "Object storage"});

    let (status, _) = app
        .call(Method::POST, "/permissions", Some(&app.admin_token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call(Method::POST, "/permissions", Some(&app.admin_token), Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service access
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_service_calls_consume_quota_until_denied() {
    let app = spawn_app().await;
    let plan_id = app.create_plan("storage,compute", 2).await;

    let (status, body) = app
        .call(Method::POST, "/services/storage", Some(&app.user_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"]["reason"], "no active subscription");

    let (status, body) = app
        .call(
            Method::POST,
            "/me/subscription",
            Some(&app.user_token),
            Some(json!({"plan_id": plan_id})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["plan_id"], plan_id);

    for expected in 1..=2 {
        let (status, body) = app
            .call(Method::POST, "/services/storage", Some(&app.user_token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["granted"], true);
        assert_eq!(body["data"]["current_usage"], expected);
        assert_eq!(body["data"]["limit"], 2);
    }

    let (status, body) = app
        .call(Method::POST, "/services/storage", Some(&app.user_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "ACCESS_DENIED");
    assert_eq!(body["error"]["details"]["reason"], "usage limit reached");

    let stored = app.state.principals.get(app.user.id).await.unwrap();
    assert_eq!(stored.usage_count, 2);
}

#[tokio::test]
async fn test_service_outside_plan_is_denied() {
    let app = spawn_app().await;
    let plan_id = app.create_plan("storage", 5).await;
    app.call(
        Method::POST,
        "/me/subscription",
        Some(&app.user_token),
        Some(json!({"plan_id": plan_id})),
    )
    .await;

    let (status, body) = app
        .call(Method::POST, "/services/compute", Some(&app.user_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"]["reason"], "service not included in plan");
}

#[tokio::test]
async fn test_unknown_service_is_not_found() {
    let app = spawn_app().await;
    let (status, body) = app
        .call(Method::POST, "/services/teleport", Some(&app.user_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "SERVICE_NOT_FOUND");
}

#[tokio::test]
async fn test_access_query_does_not_consume() {
    let app = spawn_app().await;
    let plan_id = app.create_plan("storage", 1).await;
    app.call(
        Method::POST,
        "/me/subscription",
        Some(&app.user_token),
        Some(json!({"plan_id": plan_id})),
    )
    .await;

    for _ in 0..3 {
        let (status, body) = app
            .call(Method::GET, "/services/storage/access", Some(&app.user_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["has_access"], true);
        assert_eq!(body["data"]["current_usage"], 0);
        assert_eq!(body["data"]["limit"], 1);
    }
}

#[tokio::test]
async fn test_admin_records_usage_for_a_user() {
    let app = spawn_app().await;
    let plan_id = app.create_plan("storage", 1).await;
    app.call(
        Method::POST,
        "/me/subscription",
        Some(&app.user_token),
        Some(json!({"plan_id": plan_id})),
    )
    .await;

    let uri = format!("/users/{}/usage/storage", app.user.id.0);
    let (status, body) = app.call(Method::POST, &uri, Some(&app.admin_token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["current_usage"], 1);

    let (status, body) = app.call(Method::POST, &uri, Some(&app.admin_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"]["reason"], "usage limit reached");

    let uri = format!("/users/{}/access/storage", app.user.id.0);
    let (status, body) = app.call(Method::GET, &uri, Some(&app.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_access"], false);
    assert_eq!(body["data"]["reason"], "usage limit reached");
}

#[tokio::test]
async fn test_unsubscribe_revokes_access() {
    let app = spawn_app().await;
    let plan_id = app.create_plan("storage", 5).await;
    app.call(
        Method::POST,
        "/me/subscription",
        Some(&app.user_token),
        Some(json!({"plan_id": plan_id})),
    )
    .await;

    let (status, _) = app
        .call(Method::DELETE, "/me/subscription", Some(&app.user_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(Method::GET, "/services/storage/access", Some(&app.user_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_access"], false);
    assert_eq!(body["data"]["limit"], 0);
}
