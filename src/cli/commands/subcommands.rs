use clap::Subcommand;

/// Script registry subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommands {
    /// List registered scripts that pass the current command policy
    List,
    /// Import or refresh script directories found under the workspace
    Discover,
    /// Run a registered script in the sandbox and print its result
    Run {
        /// Script name
        name: String,
    },
    /// Show recent executions of a script, newest first
    History {
        /// Script name
        name: String,

        /// Maximum number of records to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Remove a script and its execution history
    Delete {
        /// Script name
        name: String,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file and workspace locations
    Path,
}
