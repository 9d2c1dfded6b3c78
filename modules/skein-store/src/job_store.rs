use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use skein_common::{Job, JobPayload, JobStatus, QueueStats};

use crate::error::Result;

/// Retry policy applied when a job fails: linear backoff
/// (`backoff_seconds * attempt`) up to `max_attempts` total attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub backoff_seconds: i64,
    pub max_attempts: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff_seconds: 60,
            max_attempts: 3,
        }
    }
}

/// Parameters for enqueueing a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub payload: JobPayload,
    pub user_id: Option<Uuid>,
    /// Defer the first attempt. `None` means runnable immediately.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl NewJob {
    pub fn new(payload: JobPayload) -> Self {
        let user_id = match &payload {
            JobPayload::FetchFeed { user_id, .. } => Some(*user_id),
            JobPayload::AnalyzeContent { user_id, .. } => Some(*user_id),
            JobPayload::GenerateDigest { user_id, .. } => Some(*user_id),
            JobPayload::SendEmail { .. } => None,
        };
        Self {
            payload,
            user_id,
            scheduled_at: None,
        }
    }
}

/// What `fail` did with the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Returned to Pending with a pushed-forward `scheduled_at`.
    Retrying { attempt: i32 },
    /// Attempts exhausted; terminally Failed.
    Exhausted,
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    payload: serde_json::Value,
    status: String,
    user_id: Option<Uuid>,
    attempts: i32,
    max_attempts: i32,
    last_error: Option<String>,
    scheduled_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let payload: JobPayload = serde_json::from_value(self.payload)?;
        Ok(Job {
            id: self.id,
            payload,
            status: JobStatus::from_str_loose(&self.status),
            user_id: self.user_id,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            last_error: self.last_error,
            scheduled_at: self.scheduled_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
        })
    }
}

const JOB_COLUMNS: &str =
    "id, payload, status, user_id, attempts, max_attempts, last_error, \
     scheduled_at, started_at, completed_at, created_at";

/// Durable queue of typed work items. Only the dispatcher mutates job rows.
#[derive(Clone)]
pub struct JobStore {
    pool: PgPool,
    policy: RetryPolicy,
}

impl JobStore {
    pub fn new(pool: PgPool, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn enqueue(&self, job: NewJob) -> Result<Uuid> {
        let kind = job.payload.kind().to_string();
        let payload = serde_json::to_value(&job.payload)?;
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO jobs (kind, payload, user_id, max_attempts, scheduled_at)
            VALUES ($1, $2, $3, $4, coalesce($5, now()))
            RETURNING id
            "#,
        )
        .bind(&kind)
        .bind(&payload)
        .bind(job.user_id)
        .bind(self.policy.max_attempts)
        .bind(job.scheduled_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Claim the next runnable job and mark it Running in one statement.
    /// `FOR UPDATE SKIP LOCKED` makes the claim exclusive under concurrent
    /// dispatchers: two callers never receive the same job.
    pub async fn dequeue_next(&self) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs SET status = 'running', started_at = now()
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'pending' AND scheduled_at <= now()
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_job).transpose()
    }

    pub async fn complete(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', completed_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt. Below `max_attempts` the job returns to Pending
    /// with `scheduled_at` pushed forward by `backoff_seconds * attempt`;
    /// otherwise it is terminally Failed with the error kept on the row.
    pub async fn fail(&self, id: Uuid, error: &str) -> Result<FailOutcome> {
        let row = sqlx::query_as::<_, (String, i32)>(
            r#"
            UPDATE jobs SET
                attempts = attempts + 1,
                last_error = $2,
                status = CASE WHEN attempts + 1 >= max_attempts
                              THEN 'failed' ELSE 'pending' END,
                scheduled_at = CASE WHEN attempts + 1 >= max_attempts
                                    THEN scheduled_at
                                    ELSE now() + interval '1 second' * ($3 * (attempts + 1)) END,
                completed_at = CASE WHEN attempts + 1 >= max_attempts
                                    THEN now() ELSE NULL END,
                started_at = NULL
            WHERE id = $1
            RETURNING status, attempts
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(self.policy.backoff_seconds as f64)
        .fetch_one(&self.pool)
        .await?;

        Ok(match row.0.as_str() {
            "failed" => FailOutcome::Exhausted,
            _ => FailOutcome::Retrying { attempt: row.1 },
        })
    }

    /// Return Running jobs whose worker has likely crashed back to Pending.
    /// Without this sweep a crash mid-execution leaves the job stuck forever.
    pub async fn sweep_stale_running(&self, older_than_minutes: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = 'pending', started_at = NULL
            WHERE status = 'running'
              AND started_at < now() - interval '1 minute' * $1
            "#,
        )
        .bind(older_than_minutes as f64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete Completed/Failed jobs past the retention horizon.
    pub async fn cleanup(&self, retention_days: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE status IN ('completed', 'failed')
              AND coalesce(completed_at, created_at) < now() - interval '1 day' * $1
            "#,
        )
        .bind(retention_days as f64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, count(*) FROM jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => stats.pending = count,
                "running" => stats.running = count,
                "completed" => stats.completed = count,
                "failed" => stats.failed = count,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Whether a FetchFeed job for this source is already queued or running.
    /// Used by the producer to avoid piling up duplicate polls.
    pub async fn has_open_fetch_job(&self, source_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM jobs
                WHERE kind = 'fetch_feed'
                  AND status IN ('pending', 'running')
                  AND payload->>'source_id' = $1
            )
            "#,
        )
        .bind(source_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(JobRow::into_job).transpose()
    }
}
