use crate::config::SandboxConfig;
use std::path::Path;

/// Loader and interpreter hooks that can redirect what a child executes.
const FORBIDDEN_PREFIXES: &[&str] = &["LD_", "DYLD_"];

const FORBIDDEN_VARS: &[&str] = &[
    "PYTHONPATH",
    "PYTHONHOME",
    "PYTHONSTARTUP",
    "PYTHONINSPECT",
    "PYTHONUSERBASE",
    "NODE_OPTIONS",
    "NODE_PATH",
    "BASH_ENV",
    "ENV",
    "SHELLOPTS",
    "IFS",
    "PS4",
    "PERL5LIB",
    "PERL5OPT",
    "PERLLIB",
    "RUBYLIB",
    "RUBYOPT",
    // Pinned by the sandbox itself
    "PATH",
    "HOME",
    "TMPDIR",
];

/// True for variables that must never reach a sandboxed child.
pub fn is_forbidden_var(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    FORBIDDEN_PREFIXES.iter().any(|p| upper.starts_with(p)) || FORBIDDEN_VARS.contains(&upper.as_str())
}

/// Complete environment for a child rooted at `working_dir`. `lookup`
/// resolves passthrough variables from the parent.
pub fn child_env<F>(config: &SandboxConfig, working_dir: &Path, lookup: F) -> Vec<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    let dir = working_dir.display().to_string();
    let mut env = vec![
        ("PATH".to_string(), config.joined_path()),
        ("HOME".to_string(), dir.clone()),
        ("TMPDIR".to_string(), dir),
    ];

    for name in &config.passthrough_env {
        if is_forbidden_var(name) {
            tracing::debug!(var = %name, "sandbox passthrough variable ignored");
            continue;
        }
        if let Some(value) = lookup(name) {
            env.push((name.clone(), value));
        }
    }
    env
}
