//! HTTP surface of the gateway

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    body_json, gateway, gateway_without_backend, get_with_bearer, json_request, set_cookies,
    ADMIN_ACCESS, ADMIN_ID, OWNER_ID,
};
use gateway_api::handlers::ACCESS_DENIED;
use serde_json::json;
use tower::ServiceExt;

fn sign_up_body(email: &str) -> serde_json::Value {
    json!({
        "email": email,
        "password": common::GOOD_PASSWORD,
        "firstName": "Ray",
        "lastName": "Bradbury"
    })
}

#[tokio::test]
async fn test_health() {
    let gw = gateway().await;
    let response = gw
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_sign_up_sets_cookies() {
    let gw = gateway().await;
    let response = gw
        .app
        .oneshot(json_request("POST", "/api/v1/auth/sign-up", sign_up_body("a@x.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with("accessToken=access-token;"));
    assert!(cookies[1].starts_with("refreshToken=refresh-token;"));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let body = body_json(response).await;
    assert_eq!(body["status"], 201);
    assert_eq!(body["data"]["user"]["email"], "a@x.com");
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn test_rejection_is_server_error_with_errors() {
    let gw = gateway().await;
    let response = gw
        .app
        .oneshot(json_request("POST", "/api/v1/auth/sign-up", sign_up_body("taken@x.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(&response).is_empty());
    let body = body_json(response).await;
    assert_eq!(body["data"], serde_json::Value::Null);
    assert_eq!(body["errors"], json!(["Email is already occupied"]));
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let gw = gateway().await;
    let response = gw
        .app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/sign-in",
            json!({"email": "not-an-email", "password": "x"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], 400);
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_wrong_password() {
    let gw = gateway().await;
    let response = gw
        .app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/sign-in",
            json!({"email": "a@x.com", "password": "wrong-password"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["errors"], json!(["Invalid email, username, or password"]));
}

#[tokio::test]
async fn test_refresh_from_cookie() {
    let gw = gateway().await;
    let request = Request::post("/api/v1/auth/refresh")
        .header("cookie", "refreshToken=refresh-token")
        .body(Body::empty())
        .unwrap();
    let response = gw.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 2);
}

#[tokio::test]
async fn test_refresh_without_token() {
    let gw = gateway().await;
    let response = gw
        .app
        .oneshot(Request::post("/api/v1/auth/refresh").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_bearer_and_cookie() {
    let gw = gateway().await;

    let request = Request::get("/api/v1/users/me")
        .header("authorization", "Bearer access-token")
        .body(Body::empty())
        .unwrap();
    let response = gw.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["email"], "a@x.com");

    let request = Request::get("/api/v1/users/me")
        .header("cookie", "accessToken=access-token")
        .body(Body::empty())
        .unwrap();
    let response = gw.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_rejected_token() {
    let gw = gateway().await;
    let request = Request::get("/api/v1/users/me")
        .header("authorization", "Bearer forged")
        .body(Body::empty())
        .unwrap();
    let response = gw.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["errors"],
        json!(["Access token cannot be decrypted"])
    );
}

#[tokio::test]
async fn test_me_without_token() {
    let gw = gateway().await;
    let response = gw
        .app
        .oneshot(Request::get("/api/v1/users/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_forwards_tokens_and_clears_cookies() {
    let gw = gateway().await;
    let request = Request::post("/api/v1/auth/logout")
        .header("cookie", "accessToken=access-token; refreshToken=refresh-token")
        .body(Body::empty())
        .unwrap();
    let response = gw.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Expires=Thu, 01 Jan 1970")));

    let seen = gw.logouts.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].refresh_token, "refresh-token");
    assert_eq!(seen[0].access_token.as_deref(), Some("access-token"));
}

#[tokio::test]
async fn test_logout_without_cookies_skips_rpc() {
    let gw = gateway().await;
    let response = gw
        .app
        .oneshot(Request::post("/api/v1/auth/logout").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 2);
    assert!(gw.logouts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_logout_with_bearer_refresh_token() {
    let gw = gateway().await;
    let request = Request::post("/api/v1/auth/logout")
        .header("authorization", "Bearer refresh-token")
        .body(Body::empty())
        .unwrap();
    let response = gw.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let seen = gw.logouts.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].refresh_token, "refresh-token");
    assert_eq!(seen[0].access_token, None);
}

// ============================================================================
// User lookup by id
// ============================================================================

#[tokio::test]
async fn test_one_user_owner_allowed() {
    let gw = gateway().await;
    let uri = format!("/api/v1/users/one/{OWNER_ID}");
    let response = gw
        .app
        .oneshot(get_with_bearer(&uri, "access-token"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["id"], OWNER_ID);
}

#[tokio::test]
async fn test_one_user_admin_allowed_for_any_id() {
    let gw = gateway().await;
    let uri = format!("/api/v1/users/one/{OWNER_ID}");
    let response = gw
        .app
        .oneshot(get_with_bearer(&uri, ADMIN_ACCESS))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["user"]["id"], ADMIN_ID);
}

#[tokio::test]
async fn test_one_user_stranger_forbidden() {
    let gw = gateway().await;
    let uri = format!("/api/v1/users/one/{ADMIN_ID}");
    let response = gw
        .app
        .oneshot(get_with_bearer(&uri, "access-token"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["status"], 403);
    assert_eq!(body["errors"], json!([ACCESS_DENIED]));
}

#[tokio::test]
async fn test_one_user_requires_authentication() {
    let gw = gateway().await;
    let uri = format!("/api/v1/users/one/{OWNER_ID}");
    let response = gw
        .app
        .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_one_user_malformed_id() {
    let gw = gateway().await;
    let response = gw
        .app
        .oneshot(get_with_bearer("/api/v1/users/one/not-an-id", "access-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unreachable_backend_is_unavailable() {
    let gw = gateway_without_backend().await;
    let response = gw
        .app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/sign-in",
            json!({"email": "a@x.com", "password": common::GOOD_PASSWORD}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["errors"], json!(["Service unavailable"]));
}
