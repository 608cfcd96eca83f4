use super::gateway_harness::{GatewayTestServer, error_body};
use reqwest::StatusCode;
use serde_json::Value;

async fn script_entry(server: &GatewayTestServer, name: &str) -> Option<Value> {
    let scripts: Vec<Value> = reqwest::get(server.url("/scripts"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    scripts.into_iter().find(|s| s["name"] == name)
}

#[tokio::test]
async fn register_execute_and_read_history() {
    let server = GatewayTestServer::start().await;

    let created = server.register("hello", "sh run.sh", "echo hello\n").await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["name"], "hello");
    assert_eq!(created["artifact"], "run.sh");
    assert_eq!(created["execution_count"], 0);

    let executed = server.execute("hello").await;
    assert_eq!(executed.status(), StatusCode::OK);
    let result: Value = executed.json().await.unwrap();
    assert_eq!(result["stdout"], "hello\n");
    assert_eq!(result["exit_code"], 0);
    assert_eq!(result["status"], "completed");
    assert_eq!(result["client"], "127.0.0.1");

    let listed = script_entry(&server, "hello").await.unwrap();
    assert_eq!(listed["execution_count"], 1);
    assert!(listed["last_executed_at"].is_string());

    let history: Vec<Value> = reqwest::get(server.url("/scripts/hello/history"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["client"], "127.0.0.1");
    assert_eq!(server.audit_count("execution"), 1);
}

#[tokio::test]
async fn non_zero_exit_is_still_200() {
    let server = GatewayTestServer::start().await;
    server
        .register("nonzero", "sh run.sh", "echo bad >&2\nexit 3\n")
        .await;

    let response = server.execute("nonzero").await;

    assert_eq!(response.status(), StatusCode::OK);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["exit_code"], 3);
    assert_eq!(result["status"], "failed");
    assert_eq!(result["stderr"], "bad\n");
}

#[tokio::test]
async fn timed_out_script_is_200_with_timeout_flag() {
    let server = GatewayTestServer::start_with(|c| c.sandbox.timeout_secs = 1).await;
    server.register("sleeper", "sh run.sh", "sleep 10\n").await;

    let started = std::time::Instant::now();
    let response = server.execute("sleeper").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(started.elapsed() < std::time::Duration::from_secs(8));
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["timed_out"], true);
    assert_eq!(result["status"], "timed_out");
    assert_eq!(
        script_entry(&server, "sleeper").await.unwrap()["execution_count"],
        1
    );
}

#[tokio::test]
async fn duplicate_registration_is_409() {
    let server = GatewayTestServer::start().await;
    let first = server.register("dup", "sh run.sh", "echo 1\n").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = server.register("dup", "sh run.sh", "echo 2\n").await;

    let body = error_body(second, StatusCode::CONFLICT).await;
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn chained_command_is_403_and_audited() {
    let server = GatewayTestServer::start().await;

    let response = server
        .register("chained", "sh run.sh; cat /etc/passwd", "echo hi\n")
        .await;

    let body = error_body(response, StatusCode::FORBIDDEN).await;
    assert_eq!(body["kind"], "policy_violation");
    assert_eq!(body["error"], "Forbidden");
    assert!(script_entry(&server, "chained").await.is_none());
    assert!(server.audit_count("policy_violation") >= 1);
    assert!(!server.workspace.path().join("scripts/chained").exists());
}

#[tokio::test]
async fn command_outside_allow_list_is_403() {
    let server = GatewayTestServer::start().await;

    let response = server.register("rev", "perl run.sh", "print 1\n").await;

    error_body(response, StatusCode::FORBIDDEN).await;
}

#[tokio::test]
async fn invalid_script_name_is_400() {
    let server = GatewayTestServer::start().await;

    let response = server.register("../escape", "sh run.sh", "echo\n").await;

    let body = error_body(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["kind"], "invalid_input");
}

#[tokio::test]
async fn unknown_script_is_404_everywhere() {
    let server = GatewayTestServer::start().await;
    let client = reqwest::Client::new();

    error_body(server.execute("ghost").await, StatusCode::NOT_FOUND).await;
    error_body(
        client
            .delete(server.url("/scripts/ghost"))
            .send()
            .await
            .unwrap(),
        StatusCode::NOT_FOUND,
    )
    .await;
    error_body(
        reqwest::get(server.url("/scripts/ghost/history"))
            .await
            .unwrap(),
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn delete_removes_script_and_directory() {
    let server = GatewayTestServer::start().await;
    server.register("gone", "sh run.sh", "echo bye\n").await;
    server.execute("gone").await;

    let response = reqwest::Client::new()
        .delete(server.url("/scripts/gone"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    error_body(server.execute("gone").await, StatusCode::NOT_FOUND).await;
    assert!(!server.workspace.path().join("scripts/gone").exists());
}

#[tokio::test]
async fn concurrent_executions_are_each_counted() {
    let server = GatewayTestServer::start().await;
    server.register("burst", "sh run.sh", "echo burst\n").await;

    let responses = execute_concurrently(&server, "burst", 5).await;

    for response in responses {
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(
        script_entry(&server, "burst").await.unwrap()["execution_count"],
        5
    );
    assert_eq!(server.audit_count("execution"), 5);
}

async fn execute_concurrently(
    server: &GatewayTestServer,
    name: &str,
    count: usize,
) -> Vec<reqwest::Response> {
    let client = reqwest::Client::new();
    let url = server.url(&format!("/scripts/{name}/execute"));
    let mut set = tokio::task::JoinSet::new();
    for _ in 0..count {
        set.spawn(client.post(url.clone()).send());
    }

    let mut responses = Vec::with_capacity(count);
    while let Some(joined) = set.join_next().await {
        responses.push(joined.unwrap().unwrap());
    }
    responses
}

#[tokio::test]
async fn descriptor_directories_are_loaded_at_startup() {
    let server = GatewayTestServer::start_with(|config| {
        let dir = config.scripts_dir().join("preloaded");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("run.sh"), "echo preloaded\n").unwrap();
        std::fs::write(
            dir.join("config.json"),
            r#"{"name": "preloaded", "description": "from disk", "command": "sh run.sh"}"#,
        )
        .unwrap();
    })
    .await;

    let result: Value = server.execute("preloaded").await.json().await.unwrap();

    assert_eq!(result["stdout"], "preloaded\n");
}
