pub mod commands;
mod dispatch;

pub use commands::{Cli, Commands, ConfigCommands, ScriptCommands};
pub use dispatch::{CLI_CLIENT, dispatch};
