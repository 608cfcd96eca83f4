use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted script name; names double as directory names.
pub const MAX_SCRIPT_NAME_LEN: usize = 64;

/// A registered analysis script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub command: String,
    /// Artifact filename inside the script's own directory.
    pub artifact: String,
    pub created_at: DateTime<Utc>,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub execution_count: u64,
}

/// One row of a script's execution history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub script_name: String,
    pub executed_at: DateTime<Utc>,
    pub exit_code: i32,
    pub timed_out: bool,
    pub duration_ms: u64,
    pub client: String,
}

/// Operator-supplied registration request.
#[derive(Debug, Clone)]
pub struct ScriptUpload {
    pub name: String,
    pub description: String,
    pub command: String,
    /// Claimed filename of the artifact; sanitized before use.
    pub artifact_filename: String,
    pub artifact: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedScript {
    pub directory: String,
    pub reason: String,
}

/// Result of scanning the scripts directory for descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub registered: Vec<String>,
    pub refreshed: Vec<String>,
    pub skipped: Vec<SkippedScript>,
}

/// `[A-Za-z0-9_-]{1,64}`
pub fn is_valid_script_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_SCRIPT_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
