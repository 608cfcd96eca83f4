use super::types::{AuditCategory, AuditEvent};
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<()>;

    fn name(&self) -> &str;
}

/// Emits events through `tracing`, with the level chosen by category.
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for LogSink {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        let category = event.category.as_ref();
        match event.category {
            AuditCategory::Upload | AuditCategory::Execution => {
                tracing::info!(
                    audit_id = %event.id,
                    category,
                    client = %event.client,
                    subject = %event.subject,
                    detail = %event.detail,
                    "audit.event"
                );
            }
            AuditCategory::PolicyViolation | AuditCategory::RateLimit => {
                tracing::warn!(
                    audit_id = %event.id,
                    category,
                    client = %event.client,
                    subject = %event.subject,
                    detail = %event.detail,
                    "audit.event"
                );
            }
            AuditCategory::Error => {
                tracing::error!(
                    audit_id = %event.id,
                    category,
                    client = %event.client,
                    subject = %event.subject,
                    detail = %event.detail,
                    "audit.event"
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Appends one JSON object per line.
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for JsonlSink {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event).context("Failed to serialize audit event")?;
        line.push(b'\n');
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&line)
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// Keeps events in memory; handy for embedding and for tests.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, category: AuditCategory) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.category == category)
            .count()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
