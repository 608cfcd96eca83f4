use super::handlers::{
    handle_delete_script, handle_execute_script, handle_health, handle_list_scripts,
    handle_not_found, handle_register_script, handle_script_history, handle_upload,
};
use super::headers::security_headers;
use super::{AppState, MAX_BODY_SIZE};

use crate::config::{Config, is_public_bind};
use crate::toolbox::Toolbox;
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Open the toolbox and serve the gateway on the configured address.
pub async fn run_gateway(config: Config) -> Result<()> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;

    // ── Security: refuse public bind without explicit opt-in ──
    if is_public_bind(&host) && !config.gateway.allow_public_bind {
        anyhow::bail!(
            "Refusing to bind to {host}: the gateway would be reachable from other hosts.\n\
             Fix: use --host 127.0.0.1 (default) or set\n\
             [gateway] allow_public_bind = true in config.toml."
        );
    }

    let toolbox = Arc::new(Toolbox::open(config).await.context("open toolbox")?);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("bind gateway socket {host}:{port}"))?;

    run_gateway_with_listener(listener, toolbox).await
}

/// Serve the gateway from a pre-bound listener until Ctrl-C.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    toolbox: Arc<Toolbox>,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("get gateway listener local address")?;
    let state = AppState::new(toolbox);
    let request_timeout = Duration::from_secs(state.toolbox.config().gateway.request_timeout_secs);

    print_gateway_banner(&addr);
    tracing::info!(%addr, "gateway.listening");

    let app = build_app(state, request_timeout);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serve HTTP gateway")?;

    tracing::info!("gateway.stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler unavailable: {e}");
        std::future::pending::<()>().await;
    }
}

fn print_gateway_banner(addr: &SocketAddr) {
    println!("Gateway listening on {addr}");
    println!("  GET    /health");
    println!("  POST   /files");
    println!("  GET    /scripts");
    println!("  POST   /scripts");
    println!("  POST   /scripts/{{name}}/execute");
    println!("  DELETE /scripts/{{name}}");
    println!("  GET    /scripts/{{name}}/history");
}

/// Assemble the router.
///
/// Script execution is left out of the request timeout: the sandbox enforces
/// its own wall-clock limit and a timed-out run is still a 200.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let timeout =
        || TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout);

    let multipart_routes = Router::new()
        .route("/files", post(handle_upload))
        .route("/scripts", post(handle_register_script))
        .layer(DefaultBodyLimit::max(state.upload_body_limit()))
        .layer(timeout());

    let plain_routes = Router::new()
        .route("/health", get(handle_health))
        .route("/scripts", get(handle_list_scripts))
        .route("/scripts/{name}", delete(handle_delete_script))
        .route("/scripts/{name}/history", get(handle_script_history))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(timeout());

    let execute_routes = Router::new()
        .route("/scripts/{name}/execute", post(handle_execute_script))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE));

    Router::new()
        .merge(multipart_routes)
        .merge(plain_routes)
        .merge(execute_routes)
        .fallback(handle_not_found)
        .with_state(state)
        .layer(middleware::from_fn(security_headers))
}
