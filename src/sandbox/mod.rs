//! Bounded execution of vetted commands: no shell, scrubbed environment,
//! hard wall-clock timeout enforced on the whole process group.

mod env;
mod output;

pub use env::{child_env, is_forbidden_var};
pub use output::truncation_marker;

use crate::audit::{AuditCategory, AuditLogger};
use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::security::CommandPolicy;
use output::{SharedCapture, capture_bounded, finish};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// How long to wait for pipe readers after the child is gone.
const CAPTURE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    pub timeout: Duration,
    /// Per stream.
    pub output_cap: usize,
}

impl SandboxLimits {
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            output_cap: config.max_output_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxOutcome {
    pub stdout: String,
    pub stderr: String,
    /// `128 + signal` for signal deaths, `-1` when unknown.
    pub exit_code: i32,
    /// Capped at the timeout when `timed_out`.
    pub duration: Duration,
    pub truncated: bool,
    pub timed_out: bool,
}

pub struct Sandbox {
    config: SandboxConfig,
    policy: Arc<CommandPolicy>,
    audit: AuditLogger,
}

impl Sandbox {
    pub fn new(config: SandboxConfig, policy: Arc<CommandPolicy>, audit: AuditLogger) -> Self {
        Self {
            config,
            policy,
            audit,
        }
    }

    pub fn default_limits(&self) -> SandboxLimits {
        SandboxLimits::from_config(&self.config)
    }

    /// Run `command` inside `working_dir`. A timeout or non-zero exit is a
    /// successful outcome; only policy, setup and spawn failures are errors.
    pub async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        limits: SandboxLimits,
        client: &str,
    ) -> Result<SandboxOutcome, SandboxError> {
        let check = self.policy.check(command);
        if !check.is_permitted() {
            let reason = check.reason();
            self.audit.record(
                AuditCategory::PolicyViolation,
                client,
                command,
                format!("sandbox refused command: {reason}"),
            );
            return Err(SandboxError::PolicyViolation(reason));
        }

        let working_dir = tokio::fs::canonicalize(working_dir)
            .await
            .map_err(|e| SandboxError::WorkingDirectory(format!("{}: {e}", working_dir.display())))?;
        if !working_dir.is_dir() {
            return Err(SandboxError::WorkingDirectory(format!(
                "{} is not a directory",
                working_dir.display()
            )));
        }

        let mut argv = command.split_whitespace();
        let program = argv
            .next()
            .ok_or_else(|| SandboxError::PolicyViolation("empty command".into()))?;

        let mut cmd = Command::new(program);
        cmd.args(argv)
            .current_dir(&working_dir)
            .env_clear()
            .envs(child_env(&self.config, &working_dir, |name| {
                std::env::var(name).ok()
            }))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| SandboxError::Spawn {
            program: program.to_string(),
            source,
        })?;
        let pgid = child.id().and_then(|id| i32::try_from(id).ok());
        tracing::debug!(program, pid = ?pgid, "sandbox.spawn");

        let stdout_buf = SharedCapture::default();
        let stderr_buf = SharedCapture::default();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(capture_bounded(
                stdout,
                limits.output_cap,
                stdout_buf.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(capture_bounded(
                stderr,
                limits.output_cap,
                stderr_buf.clone(),
            )));
        }

        let waited = tokio::time::timeout(limits.timeout, child.wait()).await;
        let (status, timed_out) = match waited {
            Ok(status) => {
                let status = status.map_err(SandboxError::Wait)?;
                // Descendants left in the background must not outlive the run.
                kill_process_group(pgid);
                (status, false)
            }
            Err(_) => {
                kill_process_group(pgid);
                if let Err(e) = child.start_kill() {
                    tracing::debug!("start_kill after timeout: {e}");
                }
                (child.wait().await.map_err(SandboxError::Wait)?, true)
            }
        };

        let mut duration = started.elapsed();
        if timed_out {
            duration = duration.min(limits.timeout);
        }

        for reader in readers {
            let abort = reader.abort_handle();
            if tokio::time::timeout(CAPTURE_GRACE, reader).await.is_err() {
                tracing::warn!(program, "sandbox output reader did not finish; abandoning");
                abort.abort();
            }
        }

        let (stdout, stdout_truncated) = finish(&stdout_buf, limits.output_cap);
        let (stderr, stderr_truncated) = finish(&stderr_buf, limits.output_cap);

        Ok(SandboxOutcome {
            stdout,
            stderr,
            exit_code: exit_code(status),
            duration,
            truncated: stdout_truncated || stderr_truncated,
            timed_out,
        })
    }
}

/// SIGKILL everything still in the child's process group. An empty group
/// (`ESRCH`) is the common case once the child has exited cleanly.
fn kill_process_group(pgid: Option<i32>) {
    #[cfg(unix)]
    if let Some(pgid) = pgid {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;
        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!(pgid, "killpg failed: {e}"),
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
