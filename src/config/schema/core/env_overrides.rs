use super::Config;
use super::types::expand_path;
use std::path::Path;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(workspace) = std::env::var("SECTOOLBOX_WORKSPACE")
            && !workspace.is_empty()
            && let Ok(expanded) = expand_path(Path::new(&workspace))
        {
            self.workspace_dir = expanded;
        }

        if let Ok(port_str) =
            std::env::var("SECTOOLBOX_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(host) =
            std::env::var("SECTOOLBOX_GATEWAY_HOST").or_else(|_| std::env::var("HOST"))
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(max_str) = std::env::var("SECTOOLBOX_MAX_UPLOAD_BYTES")
            && let Ok(max) = max_str.parse::<u64>()
            && max > 0
        {
            self.upload.max_upload_bytes = max;
        }

        if let Ok(timeout_str) = std::env::var("SECTOOLBOX_SCRIPT_TIMEOUT_SECS")
            && let Ok(timeout) = timeout_str.parse::<u64>()
            && timeout > 0
        {
            self.sandbox.timeout_secs = timeout;
        }
    }
}
