use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Descriptor file kept in every script directory.
pub const DESCRIPTOR_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command: String,
}

impl ScriptDescriptor {
    pub async fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(DESCRIPTOR_FILE);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Malformed {}", path.display()))
    }

    pub async fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(DESCRIPTOR_FILE);
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize descriptor")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// The single artifact stored next to the descriptor. Directories and any
/// count other than exactly one regular file are errors.
pub async fn find_artifact(dir: &Path) -> Result<String> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?;
    let mut artifacts = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == DESCRIPTOR_FILE {
            continue;
        }
        if !file_type.is_file() {
            anyhow::bail!("unexpected entry {name:?} in {}", dir.display());
        }
        artifacts.push(name);
    }

    match artifacts.as_slice() {
        [single] => Ok(single.clone()),
        [] => anyhow::bail!("no artifact in {}", dir.display()),
        _ => anyhow::bail!(
            "expected exactly one artifact in {}, found {}",
            dir.display(),
            artifacts.len()
        ),
    }
}
