use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Wall-clock budget per script execution (default: 30s)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Cap per captured stream (default: 1 MiB)
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// `PATH` handed to every child process
    #[serde(default = "default_path")]
    pub path: Vec<String>,
    /// Inherited variables passed through to children (loader and interpreter
    /// hooks are stripped regardless)
    #[serde(default = "default_passthrough_env")]
    pub passthrough_env: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_output_bytes() -> usize {
    1_048_576
}

fn default_path() -> Vec<String> {
    vec!["/usr/local/bin".into(), "/usr/bin".into(), "/bin".into()]
}

fn default_passthrough_env() -> Vec<String> {
    vec!["LANG".into(), "LC_ALL".into(), "LC_CTYPE".into(), "TERM".into(), "TZ".into()]
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            path: default_path(),
            passthrough_env: default_passthrough_env(),
        }
    }
}

impl SandboxConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("sandbox.timeout_secs must be >= 1");
        }
        if self.max_output_bytes == 0 {
            anyhow::bail!("sandbox.max_output_bytes must be >= 1");
        }
        if self.path.is_empty() {
            anyhow::bail!("sandbox.path must list at least one directory");
        }
        if let Some(dir) = self.path.iter().find(|dir| !dir.starts_with('/')) {
            anyhow::bail!("sandbox.path entry {dir:?} must be absolute");
        }
        Ok(())
    }

    pub fn joined_path(&self) -> String {
        self.path.join(":")
    }
}
