use super::gateway_harness::{GatewayTestServer, error_body};
use reqwest::StatusCode;
use reqwest::header::{CACHE_CONTROL, CONTENT_SECURITY_POLICY, RETRY_AFTER, X_FRAME_OPTIONS};
use serde_json::Value;

fn assert_hardened(response: &reqwest::Response) {
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert_eq!(
        headers[CONTENT_SECURITY_POLICY],
        "default-src 'none'; frame-ancestors 'none'"
    );
    assert_eq!(headers[CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn health_reports_ok_with_hardening_headers() {
    let server = GatewayTestServer::start().await;

    let response = reqwest::get(server.url("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_hardened(&response);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn error_responses_are_hardened_too() {
    let server = GatewayTestServer::start().await;

    let response = server.execute("missing").await;

    assert_hardened(&response);
    let body = error_body(response, StatusCode::NOT_FOUND).await;
    assert_eq!(body["error"], "Not found");
    assert_eq!(body["request_id"].as_str().unwrap().len(), 36);
}

#[tokio::test]
async fn unrouted_path_is_hardened_404() {
    let server = GatewayTestServer::start().await;

    let response = reqwest::get(server.url("/admin")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_hardened(&response);
}

#[tokio::test]
async fn exhausted_budget_is_429_with_retry_after() {
    let server = GatewayTestServer::start_with(|c| c.rate_limit.execute = 2).await;

    for _ in 0..2 {
        assert_eq!(server.execute("ghost").await.status(), StatusCode::NOT_FOUND);
    }
    let limited = server.execute("ghost").await;

    let retry_after: u64 = limited.headers()[RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let body = error_body(limited, StatusCode::TOO_MANY_REQUESTS).await;
    assert_eq!(body["kind"], "rate_limited");
    assert_eq!(server.audit_count("rate_limit"), 1);

    // Other endpoint classes keep their own budget.
    let listed = reqwest::get(server.url("/scripts")).await.unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
}

async fn execute_as(server: &GatewayTestServer, forwarded_for: &str) -> StatusCode {
    reqwest::Client::new()
        .post(server.url("/scripts/ghost/execute"))
        .header("X-Forwarded-For", forwarded_for)
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn forwarded_for_is_ignored_unless_trusted() {
    let server = GatewayTestServer::start_with(|c| c.rate_limit.execute = 1).await;

    assert_eq!(execute_as(&server, "203.0.113.1").await, StatusCode::NOT_FOUND);
    // Same peer address, so the spoofed header does not buy a fresh budget.
    assert_eq!(
        execute_as(&server, "203.0.113.2").await,
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn trusted_forwarded_for_separates_clients() {
    let server = GatewayTestServer::start_with(|c| {
        c.rate_limit.execute = 1;
        c.gateway.trust_forwarded_headers = true;
    })
    .await;

    assert_eq!(execute_as(&server, "203.0.113.1").await, StatusCode::NOT_FOUND);
    assert_eq!(
        execute_as(&server, "203.0.113.1").await,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(execute_as(&server, "203.0.113.2").await, StatusCode::NOT_FOUND);

    let limited: Vec<Value> = server
        .audit_events()
        .into_iter()
        .filter(|e| e["category"] == "rate_limit")
        .collect();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0]["client"], "203.0.113.1");
}
