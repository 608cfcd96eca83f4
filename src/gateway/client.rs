use super::AppState;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

/// Identifier used when neither a peer address nor a trusted header is
/// available (e.g. handlers driven directly in tests).
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Who is calling, and the id this request is known by in logs and audit.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub client: String,
    pub request_id: String,
}

impl ClientContext {
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl FromRequestParts<AppState> for ClientContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let forwarded = if state.trust_forwarded_headers {
            forwarded_client(&parts.headers)
        } else {
            None
        };

        Ok(Self::new(
            forwarded
                .or(peer)
                .unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
        ))
    }
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`. Values that are not an
/// IP address are ignored.
pub(super) fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let header_ip = |name: &str, first_hop: bool| {
        let raw = headers.get(name)?.to_str().ok()?;
        let candidate = if first_hop {
            raw.split(',').next()?
        } else {
            raw
        };
        candidate
            .trim()
            .parse::<IpAddr>()
            .ok()
            .map(|ip| ip.to_string())
    };

    header_ip("x-forwarded-for", true).or_else(|| header_ip("x-real-ip", false))
}
