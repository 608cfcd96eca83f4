use super::types::{ExecutionRecord, ScriptDefinition};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

/// Async persistence contract for the script catalog and its history.
pub trait ScriptStore: Send + Sync {
    /// Returns `false` when the name is already taken.
    fn insert<'a>(
        &'a self,
        script: &'a ScriptDefinition,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    fn get<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ScriptDefinition>>> + Send + 'a>>;

    fn list<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScriptDefinition>>> + Send + 'a>>;

    fn update_descriptor<'a>(
        &'a self,
        name: &'a str,
        description: &'a str,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    /// Bump the counter and append the history row in one transaction.
    /// Returns `false` when the script no longer exists.
    fn record_execution<'a>(
        &'a self,
        record: &'a ExecutionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    /// Newest first.
    fn history<'a>(
        &'a self,
        name: &'a str,
        limit: Option<usize>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ExecutionRecord>>> + Send + 'a>>;

    /// Remove the script and its history in one transaction.
    fn delete<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}

/// SQLite-backed script store using sqlx async pool.
pub struct SqliteScriptStore {
    pool: SqlitePool,
}

impl SqliteScriptStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .with_context(|| format!("Invalid database path {}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open script DB: {}", path.display()))?;

        Self::new(pool).await
    }

    /// Wrap an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        ensure_schema(&pool).await?;
        Ok(Self { pool })
    }
}

async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS scripts (
            id               TEXT PRIMARY KEY,
            name             TEXT NOT NULL UNIQUE,
            description      TEXT NOT NULL DEFAULT '',
            command          TEXT NOT NULL,
            artifact         TEXT NOT NULL,
            created_at       TEXT NOT NULL,
            last_executed_at TEXT,
            execution_count  INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await
    .context("create scripts table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS script_executions (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            script_name  TEXT NOT NULL REFERENCES scripts(name) ON DELETE CASCADE,
            executed_at  TEXT NOT NULL,
            exit_code    INTEGER NOT NULL,
            timed_out    INTEGER NOT NULL,
            duration_ms  INTEGER NOT NULL,
            client       TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("create script_executions table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_script_executions_name
             ON script_executions(script_name, id)",
    )
    .execute(pool)
    .await
    .context("create script_executions index")?;

    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp {raw}"))?
        .with_timezone(&Utc))
}

fn map_script_row(row: &SqliteRow) -> Result<ScriptDefinition> {
    let created_at: String = row.try_get("created_at")?;
    let last_executed_at: Option<String> = row.try_get("last_executed_at")?;
    let execution_count: i64 = row.try_get("execution_count")?;

    Ok(ScriptDefinition {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        command: row.try_get("command")?,
        artifact: row.try_get("artifact")?,
        created_at: parse_timestamp(&created_at)?,
        last_executed_at: last_executed_at.as_deref().map(parse_timestamp).transpose()?,
        execution_count: u64::try_from(execution_count).unwrap_or(0),
    })
}

fn map_execution_row(row: &SqliteRow) -> Result<ExecutionRecord> {
    let executed_at: String = row.try_get("executed_at")?;
    let exit_code: i64 = row.try_get("exit_code")?;
    let duration_ms: i64 = row.try_get("duration_ms")?;

    Ok(ExecutionRecord {
        script_name: row.try_get("script_name")?,
        executed_at: parse_timestamp(&executed_at)?,
        exit_code: i32::try_from(exit_code).unwrap_or(-1),
        timed_out: row.try_get("timed_out")?,
        duration_ms: u64::try_from(duration_ms).unwrap_or(0),
        client: row.try_get("client")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

const SCRIPT_COLUMNS: &str =
    "id, name, description, command, artifact, created_at, last_executed_at, execution_count";

impl ScriptStore for SqliteScriptStore {
    fn insert<'a>(
        &'a self,
        script: &'a ScriptDefinition,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let result = sqlx::query(
                "INSERT INTO scripts
                     (id, name, description, command, artifact, created_at, last_executed_at, execution_count)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(&script.id)
            .bind(&script.name)
            .bind(&script.description)
            .bind(&script.command)
            .bind(&script.artifact)
            .bind(script.created_at.to_rfc3339())
            .bind(script.last_executed_at.as_ref().map(DateTime::to_rfc3339))
            .bind(i64::try_from(script.execution_count).unwrap_or(i64::MAX))
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e).context("insert script"),
            }
        })
    }

    fn get<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ScriptDefinition>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {SCRIPT_COLUMNS} FROM scripts WHERE name = $1"
            ))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("query script by name")?;

            row.map(|r| map_script_row(&r)).transpose()
        })
    }

    fn list<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScriptDefinition>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "SELECT {SCRIPT_COLUMNS} FROM scripts ORDER BY name"
            ))
            .fetch_all(&self.pool)
            .await
            .context("list scripts")?;

            rows.iter().map(map_script_row).collect()
        })
    }

    fn update_descriptor<'a>(
        &'a self,
        name: &'a str,
        description: &'a str,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let result =
                sqlx::query("UPDATE scripts SET description = $1, command = $2 WHERE name = $3")
                    .bind(description)
                    .bind(command)
                    .bind(name)
                    .execute(&self.pool)
                    .await
                    .context("update script descriptor")?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn record_execution<'a>(
        &'a self,
        record: &'a ExecutionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let executed_at = record.executed_at.to_rfc3339();
            let mut tx = self.pool.begin().await.context("begin execution tx")?;

            let updated = sqlx::query(
                "UPDATE scripts
                 SET execution_count = execution_count + 1, last_executed_at = $1
                 WHERE name = $2",
            )
            .bind(&executed_at)
            .bind(&record.script_name)
            .execute(&mut *tx)
            .await
            .context("increment execution count")?;

            if updated.rows_affected() == 0 {
                tx.rollback().await.context("rollback execution tx")?;
                return Ok(false);
            }

            sqlx::query(
                "INSERT INTO script_executions
                     (script_name, executed_at, exit_code, timed_out, duration_ms, client)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&record.script_name)
            .bind(&executed_at)
            .bind(i64::from(record.exit_code))
            .bind(record.timed_out)
            .bind(i64::try_from(record.duration_ms).unwrap_or(i64::MAX))
            .bind(&record.client)
            .execute(&mut *tx)
            .await
            .context("append execution record")?;

            tx.commit().await.context("commit execution tx")?;
            Ok(true)
        })
    }

    fn history<'a>(
        &'a self,
        name: &'a str,
        limit: Option<usize>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ExecutionRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
            let rows = sqlx::query(
                "SELECT script_name, executed_at, exit_code, timed_out, duration_ms, client
                 FROM script_executions
                 WHERE script_name = $1
                 ORDER BY id DESC
                 LIMIT $2",
            )
            .bind(name)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("query execution history")?;

            rows.iter().map(map_execution_row).collect()
        })
    }

    fn delete<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.context("begin delete tx")?;

            sqlx::query("DELETE FROM script_executions WHERE script_name = $1")
                .bind(name)
                .execute(&mut *tx)
                .await
                .context("delete execution history")?;

            let deleted = sqlx::query("DELETE FROM scripts WHERE name = $1")
                .bind(name)
                .execute(&mut *tx)
                .await
                .context("delete script")?;

            tx.commit().await.context("commit delete tx")?;
            Ok(deleted.rows_affected() > 0)
        })
    }
}
