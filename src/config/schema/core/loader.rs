use super::Config;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    /// Load `~/.sectoolbox/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let sectoolbox_dir = home.join(".sectoolbox");

        if !sectoolbox_dir.exists() {
            fs::create_dir_all(&sectoolbox_dir)
                .context("Failed to create .sectoolbox directory")?;
        }

        Self::load_from(&sectoolbox_dir.join("config.toml"))
    }

    /// Load an explicit config file. The workspace is the `workspace`
    /// directory next to it. A missing file is created with defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let base_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let workspace_dir = base_dir.join("workspace");

        let config = if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            let mut config: Config = toml::from_str(&contents).map_err(|e| {
                ConfigError::Load(format!("{}: {e}", config_path.display()))
            })?;
            config.config_path = config_path.to_path_buf();
            config.workspace_dir = workspace_dir;
            config
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                workspace_dir,
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    /// Create the workspace layout the toolbox writes into.
    pub fn ensure_workspace(&self) -> Result<()> {
        for dir in [self.workspace_dir.clone(), self.scripts_dir(), self.uploads_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
