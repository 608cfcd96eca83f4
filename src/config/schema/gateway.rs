use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway port (default: 8000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Allow binding to a non-loopback address (default: false)
    #[serde(default)]
    pub allow_public_bind: bool,
    /// Derive the client identifier from `X-Forwarded-For` / `X-Real-IP`.
    /// Only enable behind a reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
    /// Per-request timeout for everything except script execution.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
            allow_public_bind: false,
            trust_forwarded_headers: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("gateway.request_timeout_secs must be >= 1");
        }
        Ok(())
    }
}

/// True when `host` would expose the gateway beyond the local machine.
pub fn is_public_bind(host: &str) -> bool {
    !matches!(host, "127.0.0.1" | "localhost" | "::1" | "[::1]")
}
