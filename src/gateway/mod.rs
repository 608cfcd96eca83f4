//! Axum HTTP gateway over the toolbox service.
//!
//! The gateway only maps HTTP onto [`Toolbox`] operations:
//! - client identification (peer address, forwarded headers when trusted)
//! - rate-limit admission before any handler work
//! - multipart decoding with a body limit slightly above the upload limit
//! - uniform JSON error bodies and hardening headers on every response

mod client;
mod handlers;
mod headers;
mod responses;
mod server;

pub use client::{ClientContext, UNKNOWN_CLIENT};
pub use responses::{ApiError, status_for};
pub use server::{build_app, run_gateway, run_gateway_with_listener};

use crate::toolbox::Toolbox;
use std::sync::Arc;

/// Body limit for routes that never carry uploads (64KB).
pub const MAX_BODY_SIZE: usize = 65_536;
/// Room for multipart boundaries and text fields on top of the upload limit.
pub const MULTIPART_OVERHEAD_BYTES: usize = 65_536;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub toolbox: Arc<Toolbox>,
    pub trust_forwarded_headers: bool,
}

impl AppState {
    pub fn new(toolbox: Arc<Toolbox>) -> Self {
        let trust_forwarded_headers = toolbox.config().gateway.trust_forwarded_headers;
        Self {
            toolbox,
            trust_forwarded_headers,
        }
    }

    /// Body limit for the multipart routes.
    pub fn upload_body_limit(&self) -> usize {
        usize::try_from(self.toolbox.config().upload.max_upload_bytes)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}
