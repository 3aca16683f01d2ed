use chrono::{Duration, Utc};
use reqwest::{
    StatusCode,
    header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_REQUEST_METHOD, COOKIE, ORIGIN, SET_COOKIE,
    },
};
use serde_json::{Value, json};

use crate::support::{TestServer, config};

#[tokio::test]
async fn jwt_sets_http_only_cookie() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/jwt"))
        .json(&json!({ "email": "a@x.io", "displayName": "A" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "success": true }));

    // the issued cookie opens the guarded routes
    let token = cookie
        .trim_start_matches("token=")
        .split(';')
        .next()
        .unwrap();

    let claims = server.state.tokens.verify(token).unwrap();
    assert_eq!(claims.email, "a@x.io");
    assert_eq!(claims.extra["displayName"], "A");

    let resp = server
        .client
        .get(server.url("/my-foods/a@x.io"))
        .header(COOKIE, format!("token={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn jwt_requires_email() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/jwt"))
        .json(&json!({ "name": "nobody" }))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn logout_clears_cookie() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("HttpOnly"));

    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "success": true }));
}

#[tokio::test]
async fn guarded_routes_without_cookie() {
    let server = TestServer::start().await;

    for path in ["/my-foods/a@x.io", "/my-orders/a@x.io"] {
        let resp = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn guarded_routes_with_bad_token() {
    let server = TestServer::start().await;
    let expired = server
        .state
        .tokens
        .issue_at("a@x.io", Utc::now() - Duration::hours(6))
        .unwrap();

    for token in ["garbage".to_string(), expired] {
        let resp = server
            .client
            .get(server.url("/my-orders/a@x.io"))
            .header(COOKIE, format!("token={token}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn guarded_routes_with_other_email() {
    let server = TestServer::start().await;

    for path in ["/my-foods/a@x.io", "/my-orders/a@x.io"] {
        let resp = server
            .signed(server.client.get(server.url(path)), "b@x.io")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/foods"))
        .header(ORIGIN, "http://localhost:5173")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .send()
        .await
        .unwrap();

    assert_eq!(
        resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let resp = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/foods"))
        .header(ORIGIN, "https://evil.example")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .send()
        .await
        .unwrap();

    assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn cors_ignores_wildcard_origin() {
    let mut config = config();
    config.allowed_origins.push("*".to_string());
    let server = TestServer::start_with(config).await;

    let resp = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/foods"))
        .header(ORIGIN, "http://localhost:5173")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );

    let resp = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/foods"))
        .header(ORIGIN, "https://evil.example")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
