#![allow(dead_code)]

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use sectoolbox::config::Config;
use sectoolbox::gateway::run_gateway_with_listener;
use sectoolbox::toolbox::Toolbox;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct GatewayTestServer {
    pub port: u16,
    pub workspace: TempDir,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl GatewayTestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(configure: impl FnOnce(&mut Config)) -> Self {
        let workspace = TempDir::new().expect("temp workspace should be created");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral gateway listener should expose local address")
            .port();

        let mut config = Config::for_workspace(workspace.path());
        config.config_path = workspace.path().join("config.toml");
        config.audit.log_to_tracing = false;
        config.audit.log_file = Some(workspace.path().join("audit.jsonl"));
        configure(&mut config);

        let toolbox = Toolbox::open(config)
            .await
            .expect("toolbox should open on a fresh workspace");
        let handle = tokio::spawn(run_gateway_with_listener(listener, Arc::new(toolbox)));

        wait_until_gateway_ready(port).await;

        Self {
            port,
            workspace,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    pub fn audit_log(&self) -> PathBuf {
        self.workspace.path().join("audit.jsonl")
    }

    /// Parsed audit events written so far.
    pub fn audit_events(&self) -> Vec<Value> {
        std::fs::read_to_string(self.audit_log())
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).expect("audit line should be json"))
            .collect()
    }

    pub fn audit_count(&self, category: &str) -> usize {
        self.audit_events()
            .iter()
            .filter(|event| event["category"] == category)
            .count()
    }

    pub async fn upload(&self, filename: &str, data: Vec<u8>) -> reqwest::Response {
        let form = Form::new().part("file", Part::bytes(data).file_name(filename.to_string()));
        reqwest::Client::new()
            .post(self.url("/files"))
            .multipart(form)
            .send()
            .await
            .expect("upload request should complete")
    }

    pub async fn register(&self, name: &str, command: &str, body: &str) -> reqwest::Response {
        let form = Form::new()
            .text("name", name.to_string())
            .text("description", format!("{name} integration script"))
            .text("command", command.to_string())
            .part(
                "artifact",
                Part::bytes(body.as_bytes().to_vec()).file_name("run.sh"),
            );
        reqwest::Client::new()
            .post(self.url("/scripts"))
            .multipart(form)
            .send()
            .await
            .expect("register request should complete")
    }

    pub async fn execute(&self, name: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url(&format!("/scripts/{name}/execute")))
            .send()
            .await
            .expect("execute request should complete")
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_gateway_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..40 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if matches!(health, Ok(resp) if resp.status() == StatusCode::OK) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("gateway did not become ready on port {port}");
}

/// JSON body of an error response, after checking the common shape.
pub async fn error_body(response: reqwest::Response, expected: StatusCode) -> Value {
    assert_eq!(response.status(), expected);
    let body: Value = response
        .json()
        .await
        .expect("error response should be json");
    for field in ["error", "kind", "timestamp", "request_id"] {
        assert!(body.get(field).is_some(), "missing {field} in {body}");
    }
    body
}
