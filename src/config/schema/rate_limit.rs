use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Fixed-window budgets per client and endpoint class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Listings, history and health checks
    #[serde(default = "default_read")]
    pub read: u32,
    #[serde(default = "default_upload")]
    pub upload: u32,
    /// Script registration and deletion
    #[serde(default = "default_mutation")]
    pub mutation: u32,
    #[serde(default = "default_execute")]
    pub execute: u32,
}

fn default_window_secs() -> u64 {
    60
}

fn default_read() -> u32 {
    60
}

fn default_upload() -> u32 {
    20
}

fn default_mutation() -> u32 {
    10
}

fn default_execute() -> u32 {
    10
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            read: default_read(),
            upload: default_upload(),
            mutation: default_mutation(),
            execute: default_execute(),
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            anyhow::bail!("rate_limit.window_secs must be >= 1");
        }
        Ok(())
    }
}
