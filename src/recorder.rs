//! SQLite-backed usage recorder.
//!
//! Appends one row per packing decision for later analysis. Recording is
//! observability-only: it never influences packing within a call, and its
//! failures never fail the primary operation — callers log the
//! [`RecorderError`] and continue. Concurrent writers from independent
//! processes are serialized by SQLite's WAL journal; each append holds the
//! write lock only for a single INSERT plus the retention trim.
//!
//! Retention is capped: after each append, rows beyond the configured
//! `retain` count are deleted oldest-first, mirroring log rotation.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use crate::config::UsageConfig;
use crate::error::RecorderError;
use crate::models::{SelectionResult, Task, UsageRecord};

/// Maximum characters of task text retained per record.
const TASK_EXCERPT_CHARS: usize = 200;

pub struct UsageRecorder {
    pool: SqlitePool,
    retain: u32,
}

impl UsageRecorder {
    /// Open (creating if missing) the usage database and ensure the schema
    /// exists. Idempotent.
    pub async fn open(config: &UsageConfig) -> Result<Self, RecorderError> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RecorderError::CreateDir {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let recorder = Self {
            pool,
            retain: config.retain,
        };
        recorder.migrate().await?;
        Ok(recorder)
    }

    async fn migrate(&self) -> Result<(), RecorderError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                selection_id TEXT NOT NULL,
                recorded_at INTEGER NOT NULL,
                profile_name TEXT NOT NULL,
                task_excerpt TEXT NOT NULL,
                documents_json TEXT NOT NULL,
                total_bytes INTEGER NOT NULL,
                budget_bytes INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_usage_log_recorded_at ON usage_log(recorded_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append one usage record and trim retention.
    pub async fn record(&self, result: &SelectionResult, task: &Task) -> Result<(), RecorderError> {
        let documents: Vec<&str> = result
            .documents_selected
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        let documents_json = serde_json::to_string(&documents)?;
        let excerpt: String = task.raw_text.chars().take(TASK_EXCERPT_CHARS).collect();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO usage_log (selection_id, recorded_at, profile_name, task_excerpt, documents_json, total_bytes, budget_bytes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.selection_id)
        .bind(now)
        .bind(&result.profile_name)
        .bind(&excerpt)
        .bind(&documents_json)
        .bind(result.total_bytes as i64)
        .bind(result.budget_bytes as i64)
        .execute(&self.pool)
        .await?;

        // Keep the most recent `retain` rows.
        sqlx::query(
            "DELETE FROM usage_log WHERE id NOT IN (SELECT id FROM usage_log ORDER BY id DESC LIMIT ?)",
        )
        .bind(self.retain as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the most recent records, newest first.
    ///
    /// Degrades rather than fails: an unreadable database returns an empty
    /// list with a warning, and rows whose document list no longer parses
    /// are skipped and counted.
    pub async fn query_recent(&self, limit: i64) -> Vec<UsageRecord> {
        let rows = match sqlx::query(
            r#"
            SELECT recorded_at, profile_name, task_excerpt, documents_json, total_bytes, budget_bytes
            FROM usage_log
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "usage log read failed, returning no records");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        let mut malformed = 0usize;

        for row in &rows {
            let documents_json: String = row.get("documents_json");
            let documents: Vec<String> = match serde_json::from_str(&documents_json) {
                Ok(docs) => docs,
                Err(_) => {
                    malformed += 1;
                    continue;
                }
            };

            let total_bytes: i64 = row.get("total_bytes");
            let budget_bytes: i64 = row.get("budget_bytes");
            records.push(UsageRecord {
                recorded_at: row.get("recorded_at"),
                profile_name: row.get("profile_name"),
                task_excerpt: row.get("task_excerpt"),
                documents_selected: documents,
                total_bytes: total_bytes.max(0) as u64,
                budget_bytes: budget_bytes.max(0) as u64,
            });
        }

        if malformed > 0 {
            warn!(count = malformed, "skipped malformed usage records");
        }

        records
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UsageConfig;
    use crate::models::SelectedDocument;
    use std::path::Path;

    fn usage_config(dir: &Path) -> UsageConfig {
        UsageConfig {
            path: dir.join("usage.sqlite"),
            retain: 1000,
        }
    }

    fn make_result(profile: &str, docs: &[&str], total: u64) -> SelectionResult {
        SelectionResult {
            selection_id: uuid::Uuid::new_v4().to_string(),
            profile_name: profile.to_string(),
            documents_selected: docs
                .iter()
                .map(|name| SelectedDocument {
                    name: name.to_string(),
                    size_bytes: 100,
                    tier: "core".to_string(),
                    score: 1.0,
                })
                .collect(),
            total_bytes: total,
            budget_bytes: 10000,
            reduction_ratio: 0.5,
        }
    }

    #[tokio::test]
    async fn test_record_and_query_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let recorder = UsageRecorder::open(&usage_config(tmp.path())).await.unwrap();

        recorder
            .record(&make_result("backend", &["A", "B"], 200), &Task::new("build api"))
            .await
            .unwrap();

        let records = recorder.query_recent(10).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].profile_name, "backend");
        assert_eq!(records[0].documents_selected, vec!["A", "B"]);
        assert_eq!(records[0].task_excerpt, "build api");
        recorder.close().await;
    }

    #[tokio::test]
    async fn test_query_recent_newest_first() {
        let tmp = tempfile::TempDir::new().unwrap();
        let recorder = UsageRecorder::open(&usage_config(tmp.path())).await.unwrap();

        for i in 0..5 {
            recorder
                .record(
                    &make_result(&format!("profile-{}", i), &[], 0),
                    &Task::new("t"),
                )
                .await
                .unwrap();
        }

        let records = recorder.query_recent(3).await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].profile_name, "profile-4");
        assert_eq!(records[2].profile_name, "profile-2");
        recorder.close().await;
    }

    #[tokio::test]
    async fn test_retention_caps_row_count() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = UsageConfig {
            path: tmp.path().join("usage.sqlite"),
            retain: 3,
        };
        let recorder = UsageRecorder::open(&config).await.unwrap();

        for i in 0..10 {
            recorder
                .record(&make_result(&format!("p{}", i), &[], 0), &Task::new("t"))
                .await
                .unwrap();
        }

        let records = recorder.query_recent(100).await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].profile_name, "p9");
        recorder.close().await;
    }

    #[tokio::test]
    async fn test_task_excerpt_truncated() {
        let tmp = tempfile::TempDir::new().unwrap();
        let recorder = UsageRecorder::open(&usage_config(tmp.path())).await.unwrap();

        let long_task = "x".repeat(500);
        recorder
            .record(&make_result("p", &[], 0), &Task::new(long_task))
            .await
            .unwrap();

        let records = recorder.query_recent(1).await;
        assert_eq!(records[0].task_excerpt.chars().count(), 200);
        recorder.close().await;
    }

    #[tokio::test]
    async fn test_malformed_rows_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = usage_config(tmp.path());
        let recorder = UsageRecorder::open(&config).await.unwrap();

        recorder
            .record(&make_result("good", &["A"], 100), &Task::new("t"))
            .await
            .unwrap();

        // Corrupt one row's document list directly.
        sqlx::query(
            "INSERT INTO usage_log (selection_id, recorded_at, profile_name, task_excerpt, documents_json, total_bytes, budget_bytes) VALUES ('x', 0, 'bad', 't', '{not json', 0, 0)",
        )
        .execute(&recorder.pool)
        .await
        .unwrap();

        let records = recorder.query_recent(10).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].profile_name, "good");
        recorder.close().await;
    }

    #[tokio::test]
    async fn test_open_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = usage_config(tmp.path());
        let r1 = UsageRecorder::open(&config).await.unwrap();
        r1.close().await;
        let r2 = UsageRecorder::open(&config).await.unwrap();
        r2.close().await;
    }

    #[tokio::test]
    async fn test_concurrent_appends_all_recorded() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = usage_config(tmp.path());

        let mut handles = Vec::new();
        for i in 0..20 {
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                let recorder = UsageRecorder::open(&config).await.unwrap();
                recorder
                    .record(
                        &make_result(&format!("writer-{}", i), &["doc"], 100),
                        &Task::new("concurrent"),
                    )
                    .await
                    .unwrap();
                recorder.close().await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let recorder = UsageRecorder::open(&config).await.unwrap();
        let records = recorder.query_recent(100).await;
        assert_eq!(records.len(), 20);
        for record in &records {
            assert_eq!(record.documents_selected, vec!["doc"]);
        }
        recorder.close().await;
    }
}
