use super::super::{
    AuditConfig, GatewayConfig, PolicyConfig, RateLimitConfig, SandboxConfig, UploadConfig,
};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

impl Config {
    /// Config rooted at `workspace_dir`, used by tests and embedders that
    /// never touch `~/.sectoolbox`.
    pub fn for_workspace(workspace_dir: impl Into<PathBuf>) -> Self {
        let workspace_dir = workspace_dir.into();
        Self {
            config_path: workspace_dir.join("config.toml"),
            workspace_dir,
            ..Self::default()
        }
    }

    /// Check every section; the first failure is reported as
    /// [`ConfigError::Validation`].
    pub fn validate(&self) -> Result<()> {
        self.validate_sections()
            .map_err(|e| ConfigError::Validation(format!("{e:#}")).into())
    }

    fn validate_sections(&self) -> Result<()> {
        self.gateway.validate()?;
        self.upload.validate()?;
        self.sandbox.validate()?;
        self.policy.validate()?;
        self.rate_limit.validate()?;
        if self.workspace_dir.as_os_str().is_empty() {
            anyhow::bail!("workspace directory is not set");
        }
        Ok(())
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.workspace_dir.join("scripts")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.workspace_dir.join("uploads")
    }

    pub fn database_path(&self) -> PathBuf {
        self.workspace_dir.join("sectoolbox.db")
    }

    /// Resolved JSON-lines audit file, if one is configured.
    pub fn audit_log_path(&self) -> Result<Option<PathBuf>> {
        let Some(raw) = &self.audit.log_file else {
            return Ok(None);
        };
        let expanded = expand_path(raw)?;
        if expanded.is_absolute() {
            Ok(Some(expanded))
        } else {
            Ok(Some(self.workspace_dir.join(expanded)))
        }
    }
}

pub(super) fn expand_path(raw: &Path) -> Result<PathBuf> {
    let text = raw
        .to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", raw.display()))?;
    let expanded = shellexpand::tilde(text);
    Ok(PathBuf::from(expanded.as_ref()))
}
