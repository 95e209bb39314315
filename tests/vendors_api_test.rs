mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use silo_api::auth::{AuthConfig, AuthService, BRANCH_HEADER};

use common::{setup, TestApp, DEFAULT_PASSWORD};

/// Builds the same router main() serves, minus the network listener.
fn build_app(app: &TestApp) -> (Router, Arc<AuthService>) {
    let cfg = common::test_config();
    let auth_cfg = AuthConfig::new(
        cfg.jwt_secret.clone(),
        cfg.auth_issuer.clone(),
        cfg.auth_audience.clone(),
        Duration::from_secs(cfg.jwt_expiration as u64),
    )
    .expect("auth config");
    let auth_service = Arc::new(AuthService::new(auth_cfg, app.db.clone()));

    let state = silo_api::AppState {
        db: app.db.clone(),
        config: cfg,
        event_sender: app.event_sender.clone(),
        services: app.services.clone(),
    };

    let router = Router::new()
        .nest("/api/v1", silo_api::api_v1_routes())
        .nest(
            "/api/v1/auth",
            silo_api::auth::auth_routes().with_state(auth_service.clone()),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth_service.clone(),
            |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
             mut req: axum::http::Request<axum::body::Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        .with_state(state);

    (router, auth_service)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed_request(
    app: &TestApp,
    auth: &AuthService,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> Request<Body> {
    let token = auth.issue_token(&app.manager).expect("token");
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(BRANCH_HEADER, app.main_branch.to_string());
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn vendor_creation_rejects_empty_name_with_field_error() {
    let app = setup("api_vendor_empty_name").await;
    let (router, auth) = build_app(&app);

    let response = router
        .oneshot(authed_request(
            &app,
            &auth,
            "POST",
            "/api/v1/vendors",
            Some(json!({ "name": "" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(
        body["message"].as_str().unwrap().contains("name"),
        "error should name the failing field: {}",
        body
    );
}

#[tokio::test]
async fn vendor_crud_round_trip_over_http() {
    let app = setup("api_vendor_crud").await;
    let (router, auth) = build_app(&app);

    let response = router
        .clone()
        .oneshot(authed_request(
            &app,
            &auth,
            "POST",
            "/api/v1/vendors",
            Some(json!({
                "name": "Coastal Seafood",
                "code": "CS-9",
                "payment_terms": 14
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["payment_terms"], 14);
    assert_eq!(created["status"], "active");

    let response = router
        .clone()
        .oneshot(authed_request(
            &app,
            &auth,
            "GET",
            "/api/v1/vendors?search=Coastal",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // A branch-pinned vendor for another branch stays invisible
    let other_branch_vendor = json!({
        "name": "Harbor Only Meats",
        "branch_id": app.second_branch,
    });
    let response = router
        .clone()
        .oneshot(authed_request(
            &app,
            &auth,
            "POST",
            "/api/v1/vendors",
            Some(other_branch_vendor),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(authed_request(&app, &auth, "GET", "/api/v1/vendors", None))
        .await
        .unwrap();
    let listed = body_json(response).await;
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Coastal Seafood"));
    assert!(!names.contains(&"Harbor Only Meats"));
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = setup("api_vendor_unauth").await;
    let (router, _auth) = build_app(&app);

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/vendors")
                .header(BRANCH_HEADER, app.main_branch.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_issues_a_working_token() {
    let app = setup("api_login").await;
    let (router, _auth) = build_app(&app);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "username": "morgan", "password": DEFAULT_PASSWORD }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["token"].as_str().expect("token in response");

    // The issued token authenticates a scoped request
    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/vendors")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(BRANCH_HEADER, app.main_branch.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = setup("api_login_bad_password").await;
    let (router, _auth) = build_app(&app);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "username": "morgan", "password": "wrong" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
