use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Emit every audit event through `tracing`
    #[serde(default = "default_true")]
    pub log_to_tracing: bool,
    /// Optional JSON-lines file; relative paths resolve against the workspace
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_to_tracing: true,
            log_file: None,
        }
    }
}
