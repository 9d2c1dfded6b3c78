use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use skein_common::{Digest, DigestStatus, Timeframe};

use crate::error::Result;

#[derive(Debug, sqlx::FromRow)]
struct DigestRow {
    id: Uuid,
    user_id: Uuid,
    timeframe: String,
    body: String,
    referenced_content_ids: Vec<Uuid>,
    status: String,
    generated_at: DateTime<Utc>,
}

impl From<DigestRow> for Digest {
    fn from(r: DigestRow) -> Self {
        Digest {
            id: r.id,
            user_id: r.user_id,
            timeframe: Timeframe::from_str_loose(&r.timeframe),
            body: r.body,
            referenced_content_ids: r.referenced_content_ids,
            status: DigestStatus::from_str_loose(&r.status),
            generated_at: r.generated_at,
        }
    }
}

/// Parameters for recording a freshly synthesized digest.
#[derive(Debug, Clone)]
pub struct NewDigest {
    pub user_id: Uuid,
    pub timeframe: Timeframe,
    pub body: String,
    pub referenced_content_ids: Vec<Uuid>,
}

/// Generated digests. Status walks draft -> scheduled -> sent; the mail step is
/// the only thing that advances a digest to sent.
#[derive(Clone)]
pub struct DigestStore {
    pool: PgPool,
}

impl DigestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_scheduled(&self, digest: NewDigest) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO digests (user_id, timeframe, body, referenced_content_ids, status)
            VALUES ($1, $2, $3, $4, 'scheduled')
            RETURNING id
            "#,
        )
        .bind(digest.user_id)
        .bind(digest.timeframe.to_string())
        .bind(&digest.body)
        .bind(&digest.referenced_content_ids)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Digest>> {
        let row = sqlx::query_as::<_, DigestRow>("SELECT * FROM digests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Digest::from))
    }

    /// Advance a scheduled digest to sent. Sent is terminal, so the update is
    /// conditional on the current status.
    pub async fn mark_sent(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE digests SET status = 'sent' WHERE id = $1 AND status = 'scheduled'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
