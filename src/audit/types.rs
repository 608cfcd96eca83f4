use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client identifier used for events not tied to an inbound request.
pub const SYSTEM_CLIENT: &str = "system";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditCategory {
    Upload,
    Execution,
    PolicyViolation,
    RateLimit,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub category: AuditCategory,
    pub client: String,
    pub subject: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        category: AuditCategory,
        client: impl Into<String>,
        subject: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category,
            client: client.into(),
            subject: subject.into(),
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}
