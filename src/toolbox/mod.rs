//! The trust boundary as one service: every inbound operation passes through
//! here and comes back as a typed outcome.

mod types;

pub use types::{ExecutionResult, ExecutionStatus, StoredUpload};

use crate::audit::{AuditCategory, AuditLogger, SYSTEM_CLIENT};
use crate::config::Config;
use crate::error::{Result, SandboxError, ToolboxError};
use crate::sandbox::Sandbox;
use crate::scripts::{
    DiscoveryReport, ExecutionRecord, ScriptDefinition, ScriptRegistry, ScriptStore, ScriptUpload,
    SqliteScriptStore,
};
use crate::security::{
    CommandPolicy, ContentValidator, EndpointClass, RateLimiter, SanitizeError, sanitize,
};
use crate::storage::UploadStorage;
use chrono::Utc;
use std::sync::Arc;

pub struct Toolbox {
    config: Config,
    policy: Arc<CommandPolicy>,
    validator: ContentValidator,
    storage: UploadStorage,
    registry: ScriptRegistry,
    sandbox: Sandbox,
    audit: AuditLogger,
    limiter: RateLimiter,
}

impl Toolbox {
    /// Build the service from configuration: workspace layout, SQLite store,
    /// audit sinks, leftover sweep and descriptor discovery.
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        config.ensure_workspace()?;
        let store = SqliteScriptStore::open(&config.database_path()).await?;
        let audit = AuditLogger::from_config(&config)?;
        let toolbox = Self::with_components(config, Arc::new(store), audit)?;

        toolbox.registry.sweep_leftovers().await?;
        let report = toolbox.registry.discover(SYSTEM_CLIENT).await?;
        if !report.skipped.is_empty() {
            tracing::warn!(skipped = report.skipped.len(), "some script directories were not loaded");
        }
        Ok(toolbox)
    }

    /// Assemble from explicit collaborators. Does not touch the scripts
    /// directory beyond what later calls do.
    pub fn with_components(
        config: Config,
        store: Arc<dyn ScriptStore>,
        audit: AuditLogger,
    ) -> anyhow::Result<Self> {
        let policy = Arc::new(CommandPolicy::from_config(&config.policy)?);
        let registry = ScriptRegistry::new(
            store,
            config.scripts_dir(),
            policy.clone(),
            audit.clone(),
        );
        let sandbox = Sandbox::new(config.sandbox.clone(), policy.clone(), audit.clone());

        Ok(Self {
            validator: ContentValidator::new(&config.upload),
            storage: UploadStorage::new(config.uploads_dir()),
            limiter: RateLimiter::new(&config.rate_limit),
            registry,
            sandbox,
            policy,
            audit,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Record the raw detail of an internal failure under the `error`
    /// category. Clients only ever see the generic message and `request_id`.
    pub fn report_internal(&self, client: &str, request_id: &str, err: &ToolboxError) {
        if let ToolboxError::Internal(inner) = err {
            self.audit.record(
                AuditCategory::Error,
                client,
                request_id,
                format!("{inner:#}"),
            );
        }
    }

    /// Rate-limit gate run before any other work on an inbound request.
    pub fn admit(&self, client: &str, endpoint: &str, class: EndpointClass) -> Result<()> {
        let decision = self.limiter.check(client, endpoint, class);
        if decision.admitted {
            return Ok(());
        }
        let retry_after_secs = decision.retry_after.as_secs().max(1);
        self.audit.record(
            AuditCategory::RateLimit,
            client,
            endpoint,
            format!("{class} budget exhausted, retry after {retry_after_secs}s"),
        );
        Err(ToolboxError::RateLimited { retry_after_secs })
    }

    pub async fn upload(&self, client: &str, filename: &str, data: &[u8]) -> Result<StoredUpload> {
        let safe_name = sanitize(filename).map_err(|SanitizeError::ForbiddenPattern { pattern }| {
            self.audit.record(
                AuditCategory::PolicyViolation,
                client,
                "upload",
                format!("filename rejected: forbidden pattern {pattern:?}"),
            );
            ToolboxError::InvalidInput(format!("unusable filename (pattern {pattern:?})"))
        })?;

        let verdict = self.validator.validate(data, &safe_name);
        let size = data.len() as u64;
        if !verdict.is_safe {
            self.audit.record(
                AuditCategory::Upload,
                client,
                &safe_name,
                format!("rejected: {}", verdict.issues.join("; ")),
            );
            return Err(ToolboxError::SizeLimitExceeded {
                size,
                max: self.validator.max_bytes(),
            });
        }

        let stored = self.storage.store(&safe_name, data).await?;
        self.audit.record(
            AuditCategory::Upload,
            client,
            &safe_name,
            format!(
                "stored {size} bytes as {} ({}, {} warnings)",
                stored.key,
                verdict.mime_type,
                verdict.warnings.len()
            ),
        );

        Ok(StoredUpload {
            filename: safe_name,
            size,
            stored_path: stored.key,
            mime_type: verdict.mime_type,
            sha256: stored.sha256,
            entropy: verdict.entropy,
            entropy_assessment: verdict.entropy_assessment,
            warnings: verdict.warnings,
        })
    }

    pub async fn list_scripts(&self, client: &str) -> Result<Vec<ScriptDefinition>> {
        Ok(self.registry.list(client).await?)
    }

    pub async fn find_script(&self, name: &str) -> Result<ScriptDefinition> {
        Ok(self.registry.find(name).await?)
    }

    pub async fn register_script(
        &self,
        client: &str,
        upload: ScriptUpload,
    ) -> Result<ScriptDefinition> {
        if upload.artifact.len() as u64 > self.validator.max_bytes() {
            return Err(ToolboxError::SizeLimitExceeded {
                size: upload.artifact.len() as u64,
                max: self.validator.max_bytes(),
            });
        }
        Ok(self.registry.register(upload, client).await?)
    }

    pub async fn delete_script(&self, client: &str, name: &str) -> Result<()> {
        self.registry.delete(name).await?;
        tracing::info!(client, script = name, "script.deleted");
        Ok(())
    }

    pub async fn history(&self, name: &str) -> Result<Vec<ExecutionRecord>> {
        Ok(self.registry.history(name, None).await?)
    }

    pub async fn discover(&self, client: &str) -> Result<DiscoveryReport> {
        Ok(self.registry.discover(client).await?)
    }

    /// Resolve, re-validate and run a registered script.
    ///
    /// Every invocation that reaches the sandbox yields exactly one
    /// `execution` audit event and one counter update, including timeouts,
    /// non-zero exits and spawn failures.
    pub async fn execute_script(&self, client: &str, name: &str) -> Result<ExecutionResult> {
        let script = self.registry.find(name).await?;

        let check = self.policy.check(&script.command);
        if !check.is_permitted() {
            let reason = check.reason();
            self.audit.record(
                AuditCategory::PolicyViolation,
                client,
                name,
                format!("execution refused: {reason}"),
            );
            return Err(ToolboxError::PolicyViolation(format!("{name}: {reason}")));
        }

        let timestamp = Utc::now();
        let limits = self.sandbox.default_limits();
        tracing::info!(client, script = name, "execution.start");

        let run = self
            .sandbox
            .run(&script.command, &self.registry.script_dir(name), limits, client)
            .await;

        let outcome = match run {
            Ok(outcome) => outcome,
            Err(SandboxError::PolicyViolation(reason)) => {
                return Err(ToolboxError::PolicyViolation(format!("{name}: {reason}")));
            }
            Err(err) => {
                self.finish_execution(client, name, timestamp, -1, false, 0, "spawn_failed")
                    .await;
                return Err(ToolboxError::Internal(
                    anyhow::Error::new(err).context(format!("execute {name}")),
                ));
            }
        };

        let duration_ms = u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX);
        let status = ExecutionStatus::from_outcome(outcome.exit_code, outcome.timed_out);
        self.finish_execution(
            client,
            name,
            timestamp,
            outcome.exit_code,
            outcome.timed_out,
            duration_ms,
            status.as_ref(),
        )
        .await;

        Ok(ExecutionResult {
            script_name: script.name,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            exit_code: outcome.exit_code,
            duration_ms,
            truncated: outcome.truncated,
            timed_out: outcome.timed_out,
            status,
            timestamp,
            client: client.to_string(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish_execution(
        &self,
        client: &str,
        name: &str,
        timestamp: chrono::DateTime<Utc>,
        exit_code: i32,
        timed_out: bool,
        duration_ms: u64,
        status: &str,
    ) {
        let record = ExecutionRecord {
            script_name: name.to_string(),
            executed_at: timestamp,
            exit_code,
            timed_out,
            duration_ms,
            client: client.to_string(),
        };
        if let Err(e) = self.registry.record_execution(&record).await {
            tracing::warn!(script = name, "execution not recorded: {e}");
        }
        self.audit.record(
            AuditCategory::Execution,
            client,
            name,
            format!(
                "status={status} exit_code={exit_code} timed_out={timed_out} duration_ms={duration_ms}"
            ),
        );
    }
}
