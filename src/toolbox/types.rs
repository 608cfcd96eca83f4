use crate::security::EntropyAssessment;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Response for an accepted upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub filename: String,
    pub size: u64,
    /// Storage key relative to the uploads root.
    pub stored_path: String,
    pub mime_type: String,
    pub sha256: String,
    pub entropy: f64,
    pub entropy_assessment: EntropyAssessment,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
    TimedOut,
}

impl ExecutionStatus {
    pub fn from_outcome(exit_code: i32, timed_out: bool) -> Self {
        if timed_out {
            Self::TimedOut
        } else if exit_code == 0 {
            Self::Completed
        } else {
            Self::Failed
        }
    }
}

/// Bounded result of one script execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub script_name: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub truncated: bool,
    pub timed_out: bool,
    pub status: ExecutionStatus,
    pub timestamp: DateTime<Utc>,
    pub client: String,
}
