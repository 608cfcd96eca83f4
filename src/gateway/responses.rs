use super::{AppState, ClientContext};
use crate::error::{ErrorKind, ToolboxError};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::SizeLimitExceeded => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::PolicyViolation => StatusCode::FORBIDDEN,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing error. Carries the kind and request id only; the detail
/// stays in logs and the audit trail.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    request_id: String,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, ctx: &ClientContext) -> Self {
        Self {
            kind,
            request_id: ctx.request_id.clone(),
            retry_after_secs: None,
        }
    }

    /// Map a service error, reporting internal failures on the way out.
    pub fn from_toolbox(state: &AppState, ctx: &ClientContext, err: ToolboxError) -> Self {
        let kind = err.kind();
        match &err {
            ToolboxError::Internal(inner) => {
                tracing::error!(
                    client = %ctx.client,
                    request_id = %ctx.request_id,
                    "request.failed: {inner:#}"
                );
                state
                    .toolbox
                    .report_internal(&ctx.client, &ctx.request_id, &err);
            }
            other => {
                tracing::debug!(
                    client = %ctx.client,
                    request_id = %ctx.request_id,
                    kind = %kind,
                    "request.rejected: {other}"
                );
            }
        }

        let mut api = Self::new(kind, ctx);
        if let ToolboxError::RateLimited { retry_after_secs } = err {
            api.retry_after_secs = Some(retry_after_secs);
        }
        api
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.kind.public_message(),
            "kind": self.kind,
            "timestamp": Utc::now().to_rfc3339(),
            "request_id": self.request_id,
        });
        let mut response = (status_for(self.kind), Json(body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
