use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Where an accepted upload landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Storage key relative to the uploads root: `<uuid>/<filename>`.
    pub key: String,
    pub path: PathBuf,
    pub sha256: String,
}

/// Per-upload scratch space. Every upload gets its own uuid directory, so
/// concurrent uploads never share a path even with identical filenames.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under a fresh directory. `filename` must already be
    /// sanitized to a single path component.
    pub async fn store(&self, filename: &str, data: &[u8]) -> Result<StoredFile> {
        anyhow::ensure!(
            !filename.is_empty() && !filename.contains(['/', '\\']) && filename != "..",
            "refusing to store unsanitized filename {filename:?}"
        );

        let id = uuid::Uuid::new_v4().to_string();
        let dir = self.root.join(&id);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload dir {}", dir.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .await
                .context("restrict upload dir permissions")?;
        }

        let path = dir.join(filename);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        file.flush().await.context("flush upload")?;

        Ok(StoredFile {
            key: format!("{id}/{filename}"),
            path,
            sha256: hex::encode(Sha256::digest(data)),
        })
    }
}
