use anyhow::Result;
use serde::{Deserialize, Serialize};

/// 50 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Hard size limit; the only property that blocks storage.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// MIME types that do not raise a warning.
    #[serde(default = "crate::security::default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// File extensions (with leading dot) that do not raise a warning.
    #[serde(default = "crate::security::default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_mime_types: crate::security::default_allowed_mime_types(),
            allowed_extensions: crate::security::default_allowed_extensions(),
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            anyhow::bail!("upload.max_upload_bytes must be >= 1");
        }
        if let Some(ext) = self
            .allowed_extensions
            .iter()
            .find(|ext| !ext.starts_with('.'))
        {
            anyhow::bail!("upload.allowed_extensions entry {ext:?} must start with '.'");
        }
        Ok(())
    }
}
