use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use skein_common::Source;

use crate::error::Result;

#[derive(Debug, sqlx::FromRow)]
struct SourceRow {
    id: Uuid,
    user_id: Uuid,
    url: String,
    label: String,
    is_active: bool,
    etag: Option<String>,
    last_modified: Option<String>,
    last_fetched_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<SourceRow> for Source {
    fn from(r: SourceRow) -> Self {
        Source {
            id: r.id,
            user_id: r.user_id,
            url: r.url,
            label: r.label,
            is_active: r.is_active,
            etag: r.etag,
            last_modified: r.last_modified,
            last_fetched_at: r.last_fetched_at,
            created_at: r.created_at,
        }
    }
}

/// Parameters for subscribing a new feed source.
#[derive(Debug, Clone)]
pub struct NewSource {
    pub user_id: Uuid,
    pub url: String,
    pub label: String,
}

/// Subscribed feed sources and their conditional-fetch metadata.
#[derive(Clone)]
pub struct SourceStore {
    pool: PgPool,
}

impl SourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, source: NewSource) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO sources (user_id, url, label) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(source.user_id)
        .bind(&source.url)
        .bind(&source.label)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Source>> {
        let row = sqlx::query_as::<_, SourceRow>("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Source::from))
    }

    pub async fn list_active(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            "SELECT * FROM sources WHERE is_active ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Source::from).collect())
    }

    /// Active sources that are due for a poll: never fetched, or last fetched
    /// longer than `interval_minutes` ago.
    pub async fn due_for_fetch(&self, interval_minutes: i64) -> Result<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT * FROM sources
            WHERE is_active
              AND (last_fetched_at IS NULL
                   OR last_fetched_at < now() - interval '1 minute' * $1)
            ORDER BY last_fetched_at NULLS FIRST
            "#,
        )
        .bind(interval_minutes as f64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Source::from).collect())
    }

    /// Stamp a fetch attempt. Conditional metadata and `last_fetched_at` are
    /// updated after every fetch, 304s included.
    pub async fn record_fetch(
        &self,
        id: Uuid,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sources
            SET etag = $2, last_modified = $3, last_fetched_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(etag)
        .bind(last_modified)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Digest recipient for a user, if they have an enabled subscription.
    pub async fn digest_recipient(&self, user_id: Uuid) -> Result<Option<String>> {
        let email = sqlx::query_scalar::<_, String>(
            "SELECT email FROM digest_subscriptions WHERE user_id = $1 AND enabled",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(email)
    }

    /// Create or update a digest subscription.
    pub async fn upsert_digest_subscription(&self, user_id: Uuid, email: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO digest_subscriptions (user_id, email)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET email = $2, enabled = true
            "#,
        )
        .bind(user_id)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
