use super::descriptor::{DESCRIPTOR_FILE, ScriptDescriptor, find_artifact};
use super::store::ScriptStore;
use super::types::{
    DiscoveryReport, ExecutionRecord, ScriptDefinition, ScriptUpload, SkippedScript,
    is_valid_script_name,
};
use crate::audit::{AuditCategory, AuditLogger};
use crate::error::RegistryError;
use crate::security::{CommandPolicy, sanitize};
use anyhow::Context;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const TRASH_PREFIX: &str = ".trash-";
const STAGING_PREFIX: &str = ".staging-";

type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Catalog of analysis scripts: one store row plus one directory per script.
///
/// Registration, deletion and discovery hold `write_lock` so the directory
/// tree and the store change together. Reads and execution bookkeeping do
/// not take the lock.
pub struct ScriptRegistry {
    store: Arc<dyn ScriptStore>,
    scripts_dir: PathBuf,
    policy: Arc<CommandPolicy>,
    audit: AuditLogger,
    write_lock: Mutex<()>,
}

impl ScriptRegistry {
    pub fn new(
        store: Arc<dyn ScriptStore>,
        scripts_dir: PathBuf,
        policy: Arc<CommandPolicy>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            store,
            scripts_dir,
            policy,
            audit,
            write_lock: Mutex::new(()),
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Directory holding the artifact and descriptor of `name`.
    pub fn script_dir(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(name)
    }

    /// Remove leftovers of interrupted deletions and registrations.
    pub async fn sweep_leftovers(&self) -> RegistryResult<usize> {
        let _guard = self.write_lock.lock().await;
        let mut removed = 0;
        let mut entries = match tokio::fs::read_dir(&self.scripts_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(anyhow::Error::new(e).context("list scripts dir").into()),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .context("read scripts dir entry")?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(TRASH_PREFIX) || name.starts_with(STAGING_PREFIX) {
                match tokio::fs::remove_dir_all(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!(dir = %name, "failed to sweep leftover: {e}"),
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, "scripts.sweep");
        }
        Ok(removed)
    }

    /// Registered scripts whose command still passes policy. Failing ones
    /// are reported as policy violations and left out.
    pub async fn list(&self, client: &str) -> RegistryResult<Vec<ScriptDefinition>> {
        let scripts = self.store.list().await?;
        Ok(scripts
            .into_iter()
            .filter(|script| {
                let check = self.policy.check(&script.command);
                if !check.is_permitted() {
                    self.audit.record(
                        AuditCategory::PolicyViolation,
                        client,
                        &script.name,
                        format!("listed script excluded: {}", check.reason()),
                    );
                }
                check.is_permitted()
            })
            .collect())
    }

    pub async fn find(&self, name: &str) -> RegistryResult<ScriptDefinition> {
        self.store
            .get(name)
            .await?
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    pub async fn register(
        &self,
        upload: ScriptUpload,
        client: &str,
    ) -> RegistryResult<ScriptDefinition> {
        if !is_valid_script_name(&upload.name) {
            return Err(RegistryError::Invalid(format!(
                "script name {:?} must match [A-Za-z0-9_-]{{1,64}}",
                upload.name
            )));
        }

        let check = self.policy.check(&upload.command);
        if !check.is_permitted() {
            let reason = check.reason();
            self.audit.record(
                AuditCategory::PolicyViolation,
                client,
                &upload.name,
                format!("registration rejected: {reason}"),
            );
            return Err(RegistryError::PolicyViolation {
                name: upload.name,
                reason,
            });
        }

        let artifact = sanitize(&upload.artifact_filename)
            .map_err(|e| RegistryError::Invalid(format!("artifact filename: {e}")))?;
        if artifact == DESCRIPTOR_FILE {
            return Err(RegistryError::Invalid(format!(
                "artifact may not be named {DESCRIPTOR_FILE}"
            )));
        }

        let _guard = self.write_lock.lock().await;

        let final_dir = self.script_dir(&upload.name);
        if self.store.get(&upload.name).await?.is_some()
            || tokio::fs::try_exists(&final_dir).await.unwrap_or(true)
        {
            return Err(RegistryError::Conflict { name: upload.name });
        }

        let descriptor = ScriptDescriptor {
            name: upload.name.clone(),
            description: upload.description.clone(),
            command: upload.command.clone(),
        };
        let staging = self
            .scripts_dir
            .join(format!("{STAGING_PREFIX}{}", Uuid::new_v4()));
        if let Err(e) = stage_script(&staging, &artifact, &upload.artifact, &descriptor).await {
            remove_leftover(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&staging, &final_dir).await {
            remove_leftover(&staging).await;
            return Err(anyhow::Error::new(e)
                .context("move staged script into place")
                .into());
        }

        let script = ScriptDefinition {
            id: Uuid::new_v4().to_string(),
            name: upload.name,
            description: upload.description,
            command: upload.command,
            artifact,
            created_at: Utc::now(),
            last_executed_at: None,
            execution_count: 0,
        };

        match self.store.insert(&script).await {
            Ok(true) => {}
            Ok(false) => {
                self.discard_dir(&final_dir).await;
                return Err(RegistryError::Conflict { name: script.name });
            }
            Err(e) => {
                self.discard_dir(&final_dir).await;
                return Err(e.into());
            }
        }

        self.audit.record(
            AuditCategory::Upload,
            client,
            &script.name,
            format!(
                "script registered ({} bytes artifact {})",
                upload.artifact.len(),
                script.artifact
            ),
        );
        Ok(script)
    }

    /// Roll back a script directory whose row never landed. It is renamed
    /// under the trash prefix first so a failed removal is still reclaimed
    /// by `sweep_leftovers` and never blocks the name.
    async fn discard_dir(&self, dir: &Path) {
        let trash = self
            .scripts_dir
            .join(format!("{TRASH_PREFIX}{}", Uuid::new_v4()));
        match tokio::fs::rename(dir, &trash).await {
            Ok(()) => remove_leftover(&trash).await,
            Err(e) => {
                tracing::error!(dir = %dir.display(), "failed to move rolled-back script aside: {e}");
                remove_leftover(dir).await;
            }
        }
    }

    /// Remove a script, its directory and its history as one unit.
    pub async fn delete(&self, name: &str) -> RegistryResult<()> {
        let _guard = self.write_lock.lock().await;

        if self.store.get(name).await?.is_none() {
            return Err(RegistryError::NotFound {
                name: name.to_string(),
            });
        }

        let dir = self.script_dir(name);
        let trash = self
            .scripts_dir
            .join(format!("{TRASH_PREFIX}{name}-{}", Uuid::new_v4()));
        let moved = match tokio::fs::rename(&dir, &trash).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context("move script directory aside")
                    .into());
            }
        };

        if let Err(e) = self.store.delete(name).await {
            if moved && let Err(restore) = tokio::fs::rename(&trash, &dir).await {
                tracing::error!(script = name, "failed to restore script directory: {restore}");
            }
            return Err(e.into());
        }

        if moved && let Err(e) = tokio::fs::remove_dir_all(&trash).await {
            tracing::warn!(script = name, "failed to purge script directory: {e}");
        }
        tracing::info!(script = name, "scripts.delete");
        Ok(())
    }

    pub async fn record_execution(&self, record: &ExecutionRecord) -> RegistryResult<()> {
        if self.store.record_execution(record).await? {
            Ok(())
        } else {
            Err(RegistryError::NotFound {
                name: record.script_name.clone(),
            })
        }
    }

    pub async fn history(
        &self,
        name: &str,
        limit: Option<usize>,
    ) -> RegistryResult<Vec<ExecutionRecord>> {
        self.find(name).await?;
        Ok(self.store.history(name, limit).await?)
    }

    /// Import descriptor directories the store does not know yet and refresh
    /// known scripts whose descriptor changed on disk.
    pub async fn discover(&self, client: &str) -> RegistryResult<DiscoveryReport> {
        let _guard = self.write_lock.lock().await;
        let mut report = DiscoveryReport::default();

        let mut entries = match tokio::fs::read_dir(&self.scripts_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(anyhow::Error::new(e).context("list scripts dir").into()),
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context("read scripts dir entry")?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                dirs.push((name, entry.path()));
            }
        }
        dirs.sort();

        for (dir_name, path) in dirs {
            match inspect_dir(&dir_name, &path).await {
                Ok((descriptor, artifact)) => {
                    self.apply_descriptor(client, descriptor, artifact, &mut report)
                        .await?;
                }
                Err(reason) => {
                    tracing::warn!(dir = %dir_name, %reason, "scripts.discover.skip");
                    report.skipped.push(SkippedScript {
                        directory: dir_name,
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            registered = report.registered.len(),
            refreshed = report.refreshed.len(),
            skipped = report.skipped.len(),
            "scripts.discover"
        );
        Ok(report)
    }

    async fn apply_descriptor(
        &self,
        client: &str,
        descriptor: ScriptDescriptor,
        artifact: String,
        report: &mut DiscoveryReport,
    ) -> RegistryResult<()> {
        let check = self.policy.check(&descriptor.command);
        if !check.is_permitted() {
            let reason = check.reason();
            self.audit.record(
                AuditCategory::PolicyViolation,
                client,
                &descriptor.name,
                format!("discovered script rejected: {reason}"),
            );
            report.skipped.push(SkippedScript {
                directory: descriptor.name,
                reason: format!("policy violation: {reason}"),
            });
            return Ok(());
        }

        match self.store.get(&descriptor.name).await? {
            Some(existing)
                if existing.command == descriptor.command
                    && existing.description == descriptor.description => {}
            Some(_) => {
                self.store
                    .update_descriptor(
                        &descriptor.name,
                        &descriptor.description,
                        &descriptor.command,
                    )
                    .await?;
                report.refreshed.push(descriptor.name);
            }
            None => {
                let script = ScriptDefinition {
                    id: Uuid::new_v4().to_string(),
                    name: descriptor.name,
                    description: descriptor.description,
                    command: descriptor.command,
                    artifact,
                    created_at: Utc::now(),
                    last_executed_at: None,
                    execution_count: 0,
                };
                if self.store.insert(&script).await? {
                    report.registered.push(script.name);
                }
            }
        }
        Ok(())
    }
}

async fn remove_leftover(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        tracing::warn!(dir = %dir.display(), "failed to remove leftover directory: {e}");
    }
}

async fn inspect_dir(
    dir_name: &str,
    path: &Path,
) -> std::result::Result<(ScriptDescriptor, String), String> {
    if !is_valid_script_name(dir_name) {
        return Err("directory name is not a valid script name".into());
    }
    let descriptor = ScriptDescriptor::read(path)
        .await
        .map_err(|e| format!("{e:#}"))?;
    if descriptor.name != dir_name {
        return Err(format!(
            "descriptor name {:?} does not match directory",
            descriptor.name
        ));
    }
    let artifact = find_artifact(path).await.map_err(|e| format!("{e:#}"))?;
    Ok((descriptor, artifact))
}

async fn stage_script(
    staging: &Path,
    artifact_name: &str,
    artifact: &[u8],
    descriptor: &ScriptDescriptor,
) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(staging)
        .await
        .with_context(|| format!("Failed to create {}", staging.display()))?;
    let artifact_path = staging.join(artifact_name);
    tokio::fs::write(&artifact_path, artifact)
        .await
        .with_context(|| format!("Failed to write {}", artifact_path.display()))?;
    descriptor.write(staging).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(staging, std::fs::Permissions::from_mode(0o700))
            .await
            .context("restrict script directory permissions")?;
        tokio::fs::set_permissions(&artifact_path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("restrict artifact permissions")?;
    }
    Ok(())
}
