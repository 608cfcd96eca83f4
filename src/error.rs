use serde::Serialize;
use thiserror::Error;

// ─── Error taxonomy ──────────────────────────────────────────────────────────

/// Stable, client-facing classification of every outcome the trust boundary
/// can report.
///
/// `Timeout` is part of the taxonomy but never travels as an error: a timed-out
/// script is a successful response carrying an `ExecutionResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    SizeLimitExceeded,
    PolicyViolation,
    InvalidInput,
    NotFound,
    Conflict,
    Timeout,
    RateLimited,
    InternalError,
}

impl ErrorKind {
    /// Generic message safe to echo to any client.
    pub fn public_message(self) -> &'static str {
        match self {
            Self::SizeLimitExceeded => "Payload too large",
            Self::PolicyViolation => "Forbidden",
            Self::InvalidInput => "Bad request",
            Self::NotFound => "Not found",
            Self::Conflict => "Conflict",
            Self::Timeout => "Execution timed out",
            Self::RateLimited => "Rate limit exceeded",
            Self::InternalError => "Internal server error",
        }
    }
}

// ─── Top-level error ─────────────────────────────────────────────────────────

/// Error returned by the toolbox service to its callers.
///
/// Expected rejections are typed variants. Everything unexpected is folded
/// into `Internal`, whose detail is audited and never shown to clients.
#[derive(Debug, Error)]
pub enum ToolboxError {
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    SizeLimitExceeded { size: u64, max: u64 },

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ToolboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SizeLimitExceeded { .. } => ErrorKind::SizeLimitExceeded,
            Self::PolicyViolation(_) => ErrorKind::PolicyViolation,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Registry errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("script {name} not found")]
    NotFound { name: String },

    #[error("script {name} already exists")]
    Conflict { name: String },

    #[error("script {name} denied by policy: {reason}")]
    PolicyViolation { name: String, reason: String },

    #[error("invalid script definition: {0}")]
    Invalid(String),

    #[error("registry storage: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<RegistryError> for ToolboxError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { name } => Self::NotFound(name),
            RegistryError::Conflict { name } => Self::Conflict(name),
            RegistryError::PolicyViolation { name, reason } => {
                Self::PolicyViolation(format!("{name}: {reason}"))
            }
            RegistryError::Invalid(message) => Self::InvalidInput(message),
            RegistryError::Storage(inner) => Self::Internal(inner),
        }
    }
}

// ─── Sandbox errors ──────────────────────────────────────────────────────────

/// Failures of the sandbox itself. A timeout or a non-zero exit is not one of
/// these; both are reported inside a successful `SandboxOutcome`.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("command denied by policy: {0}")]
    PolicyViolation(String),

    #[error("working directory unavailable: {0}")]
    WorkingDirectory(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for child: {0}")]
    Wait(#[source] std::io::Error),
}

// ─── Convenience re-exports ──────────────────────────────────────────────────

/// Shorthand result type for the toolbox service.
pub type Result<T> = std::result::Result<T, ToolboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::SizeLimitExceeded).unwrap();
        assert_eq!(json, "\"size_limit_exceeded\"");
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate_limited");
    }

    #[test]
    fn public_messages_do_not_leak_detail() {
        let err = ToolboxError::Internal(anyhow::anyhow!("open /srv/secret/db failed"));
        let message = err.kind().public_message();
        assert!(!message.contains("/srv"));
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn registry_errors_map_to_toolbox_kinds() {
        let cases = [
            (
                RegistryError::NotFound { name: "a".into() },
                ErrorKind::NotFound,
            ),
            (
                RegistryError::Conflict { name: "a".into() },
                ErrorKind::Conflict,
            ),
            (
                RegistryError::PolicyViolation {
                    name: "a".into(),
                    reason: "x".into(),
                },
                ErrorKind::PolicyViolation,
            ),
            (RegistryError::Invalid("bad".into()), ErrorKind::InvalidInput),
        ];
        for (err, kind) in cases {
            assert_eq!(ToolboxError::from(err).kind(), kind);
        }
    }

    #[test]
    fn size_limit_displays_both_bounds() {
        let err = ToolboxError::SizeLimitExceeded { size: 11, max: 10 };
        assert!(err.to_string().contains("11"));
        assert!(err.to_string().contains("10"));
    }
}
