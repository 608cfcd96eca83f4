use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod subcommands;

pub use subcommands::{ConfigCommands, ScriptCommands};

/// `SecToolbox` - trust boundary for CTF file uploads and analysis scripts.
#[derive(Parser, Debug)]
#[command(name = "sectoolbox")]
#[command(version)]
#[command(about = "Validate uploads and run vetted analysis scripts in a sandbox.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.sectoolbox/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Run the content validator on a local file without storing it
    Validate {
        /// File to inspect
        path: PathBuf,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage registered analysis scripts
    Scripts {
        #[command(subcommand)]
        script_command: ScriptCommands,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },
}
