use super::commands::{Cli, Commands, ConfigCommands, ScriptCommands};
use crate::config::Config;
use crate::gateway;
use crate::security::{ContentValidator, sanitize};
use crate::toolbox::Toolbox;
use anyhow::{Context, Result};
use std::path::Path;

/// Client identifier recorded in the audit trail for CLI-driven operations.
pub const CLI_CLIENT: &str = "cli";

pub async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_init()?,
    };
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            gateway::run_gateway(config).await
        }
        Commands::Validate { path, json } => validate_file(&config, &path, json).await,
        Commands::Scripts { script_command } => run_script_command(config, script_command).await,
        Commands::Config { config_command } => show_config(&config, config_command),
    }
}

async fn validate_file(config: &Config, path: &Path, json: bool) -> Result<()> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let claimed = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let filename = sanitize(&claimed)?;
    let verdict = ContentValidator::new(&config.upload).validate(&data, &filename);

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    println!("{filename}: {}", if verdict.is_safe { "accepted" } else { "rejected" });
    println!("  size:     {} bytes", data.len());
    println!("  mime:     {}", verdict.mime_type);
    println!(
        "  entropy:  {:.3} ({})",
        verdict.entropy, verdict.entropy_assessment
    );
    for issue in &verdict.issues {
        println!("  issue:    {issue}");
    }
    for warning in &verdict.warnings {
        println!("  warning:  {warning}");
    }
    Ok(())
}

async fn run_script_command(config: Config, command: ScriptCommands) -> Result<()> {
    let toolbox = Toolbox::open(config).await?;

    match command {
        ScriptCommands::List => {
            let scripts = toolbox.list_scripts(CLI_CLIENT).await?;
            if scripts.is_empty() {
                println!("No scripts registered.");
            }
            for script in scripts {
                println!(
                    "{:<24} runs={:<5} {}  [{}]",
                    script.name, script.execution_count, script.description, script.command
                );
            }
        }
        ScriptCommands::Discover => {
            let report = toolbox.discover(CLI_CLIENT).await?;
            println!(
                "registered {}, refreshed {}, skipped {}",
                report.registered.len(),
                report.refreshed.len(),
                report.skipped.len()
            );
            for skipped in report.skipped {
                println!("  skipped {}: {}", skipped.directory, skipped.reason);
            }
        }
        ScriptCommands::Run { name } => {
            let result = toolbox.execute_script(CLI_CLIENT, &name).await?;
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            println!(
                "[{}] exit_code={} duration={}ms{}",
                result.status,
                result.exit_code,
                result.duration_ms,
                if result.truncated { " (truncated)" } else { "" }
            );
        }
        ScriptCommands::History { name, limit } => {
            for record in toolbox.history(&name).await?.into_iter().take(limit) {
                println!(
                    "{}  exit_code={:<4} timed_out={:<5} {}ms  client={}",
                    record.executed_at.to_rfc3339(),
                    record.exit_code,
                    record.timed_out,
                    record.duration_ms,
                    record.client
                );
            }
        }
        ScriptCommands::Delete { name } => {
            toolbox.delete_script(CLI_CLIENT, &name).await?;
            println!("Deleted {name}.");
        }
    }
    Ok(())
}

fn show_config(config: &Config, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            print!(
                "{}",
                toml::to_string_pretty(config).context("Failed to serialize config")?
            );
        }
        ConfigCommands::Path => {
            println!("config:    {}", config.config_path.display());
            println!("workspace: {}", config.workspace_dir.display());
            println!("database:  {}", config.database_path().display());
        }
    }
    Ok(())
}
