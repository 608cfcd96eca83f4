use super::gateway_harness::{GatewayTestServer, error_body};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

#[tokio::test]
async fn upload_returns_verdict_metadata() {
    let server = GatewayTestServer::start().await;

    let response = server.upload("notes.txt", b"flag{gateway}".to_vec()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["filename"], "notes.txt");
    assert_eq!(body["size"], 13);
    assert_eq!(body["mime_type"], "text/plain");
    assert_eq!(body["sha256"].as_str().unwrap().len(), 64);
    assert_eq!(body["warnings"], serde_json::json!([]));
    let stored_path = body["stored_path"].as_str().unwrap();
    assert!(stored_path.ends_with("/notes.txt"));
    assert!(!stored_path.starts_with('/'));
    assert!(
        server
            .workspace
            .path()
            .join("uploads")
            .join(stored_path)
            .is_file()
    );
    assert_eq!(server.audit_count("upload"), 1);
}

#[tokio::test]
async fn traversal_filename_is_reduced_to_its_last_component() {
    let server = GatewayTestServer::start().await;

    let response = server.upload("../../etc/shadow.txt", b"x".to_vec()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["filename"], "shadow.txt");
}

#[tokio::test]
async fn warnings_do_not_block_the_upload() {
    let server = GatewayTestServer::start().await;
    let mut elf = b"\x7fELF".to_vec();
    elf.resize(512, 0);

    let response = server.upload("crackme", elf).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let warnings: Vec<&str> = body["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(warnings.contains(&"Executable file detected"));
    assert!(warnings.contains(&"Missing file extension"));
}

#[tokio::test]
async fn script_scheme_filename_is_400_and_audited() {
    let server = GatewayTestServer::start().await;

    let response = server
        .upload("javascript:alert(1).html", b"<b>hi</b>".to_vec())
        .await;

    let body = error_body(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["kind"], "invalid_input");
    assert_eq!(server.audit_count("policy_violation"), 1);
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let server = GatewayTestServer::start_with(|c| c.upload.max_upload_bytes = 1024).await;

    let response = server.upload("big.bin", vec![0x41; 2048]).await;

    let body = error_body(response, StatusCode::PAYLOAD_TOO_LARGE).await;
    assert_eq!(body["kind"], "size_limit_exceeded");
    assert_eq!(body["error"], "Payload too large");
    let stored = std::fs::read_dir(server.workspace.path().join("uploads"))
        .unwrap()
        .count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn upload_without_file_field_is_400() {
    let server = GatewayTestServer::start().await;
    let form = Form::new().text("comment", "no file here");

    let response = reqwest::Client::new()
        .post(server.url("/files"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    error_body(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn file_part_without_filename_is_400() {
    let server = GatewayTestServer::start().await;
    let form = Form::new().part("file", Part::bytes(b"anonymous".to_vec()));

    let response = reqwest::Client::new()
        .post(server.url("/files"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    error_body(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn non_multipart_body_is_400() {
    let server = GatewayTestServer::start().await;

    let response = reqwest::Client::new()
        .post(server.url("/files"))
        .body("plain body")
        .send()
        .await
        .unwrap();

    let body = error_body(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["kind"], "invalid_input");
}

#[tokio::test]
async fn concurrent_uploads_of_the_same_name_do_not_collide() {
    let server = GatewayTestServer::start().await;

    let (first, second) = tokio::join!(
        server.upload("same.txt", b"first".to_vec()),
        server.upload("same.txt", b"second".to_vec()),
    );

    let first: Value = first.json().await.unwrap();
    let second: Value = second.json().await.unwrap();
    assert_ne!(first["stored_path"], second["stored_path"]);
    assert_ne!(first["sha256"], second["sha256"]);
}
