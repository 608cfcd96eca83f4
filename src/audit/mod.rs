//! Append-only audit trail. Recording never fails the caller: a sink that
//! errors is reported through `tracing` and skipped.

mod sink;
mod types;

pub use sink::{AuditSink, JsonlSink, LogSink, MemorySink};
pub use types::{AuditCategory, AuditEvent, SYSTEM_CLIENT};

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuditLogger {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditLogger {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    /// Sinks described by the `[audit]` config section.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::new();
        if config.audit.log_to_tracing {
            sinks.push(Arc::new(LogSink::new()));
        }
        if let Some(path) = config.audit_log_path()? {
            sinks.push(Arc::new(JsonlSink::open(&path)?));
        }
        Ok(Self::new(sinks))
    }

    pub fn record(
        &self,
        category: AuditCategory,
        client: &str,
        subject: &str,
        detail: impl Into<String>,
    ) -> AuditEvent {
        let event = AuditEvent::new(category, client, subject, detail);
        for sink in &self.sinks {
            if let Err(e) = sink.record(&event) {
                tracing::error!(sink = sink.name(), audit_id = %event.id, "audit sink failed: {e:#}");
            }
        }
        event
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field(
                "sinks",
                &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
