use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use skein_common::{Content, ContentAnalysis, Entity, NewContent, Priority};

use crate::error::Result;

#[derive(Debug, sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    url: String,
    body: String,
    source_label: String,
    fingerprint: String,
    created_at: DateTime<Utc>,
}

impl From<ContentRow> for Content {
    fn from(r: ContentRow) -> Self {
        Content {
            id: r.id,
            user_id: r.user_id,
            title: r.title,
            url: r.url,
            body: r.body,
            source_label: r.source_label,
            fingerprint: r.fingerprint,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnalysisRow {
    summary: String,
    long_summary: String,
    entities: serde_json::Value,
    tags: Vec<String>,
    priority: String,
    confidence: f32,
}

/// Content rows and their analyses. The unique (user_id, fingerprint) index is
/// the single source of truth for dedup: inserting an existing fingerprint is a
/// benign no-op, not a fault.
#[derive(Clone)]
pub struct ContentStore {
    pool: PgPool,
}

impl ContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert new content. Returns `None` when the (user, fingerprint) pair
    /// already exists — the insert itself is the fingerprint reservation, so
    /// concurrent ingestion of overlapping sources cannot double-store.
    pub async fn insert(&self, content: NewContent) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO content (user_id, title, url, body, source_label, fingerprint)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, fingerprint) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(content.user_id)
        .bind(&content.title)
        .bind(&content.url)
        .bind(&content.body)
        .bind(&content.source_label)
        .bind(&content.fingerprint)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn exists(&self, user_id: Uuid, fingerprint: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM content WHERE user_id = $1 AND fingerprint = $2)",
        )
        .bind(user_id)
        .bind(fingerprint)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Content>> {
        let row = sqlx::query_as::<_, ContentRow>("SELECT * FROM content WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Content::from))
    }

    /// Content created at or after the cutoff, most recent first, bounded.
    pub async fn in_window(
        &self,
        user_id: Uuid,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Content>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM content
            WHERE user_id = $1 AND created_at >= $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Content::from).collect())
    }

    /// Record the analysis for one content item. The primary key on content_id
    /// makes re-delivery of the same AnalyzeContent job a no-op: `false` means
    /// an analysis was already recorded and enrichment must not run again.
    pub async fn insert_analysis(
        &self,
        content_id: Uuid,
        user_id: Uuid,
        analysis: &ContentAnalysis,
    ) -> Result<bool> {
        let entities = serde_json::to_value(&analysis.entities)?;
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO analyses
                (content_id, user_id, summary, long_summary, entities, tags, priority, confidence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (content_id) DO NOTHING
            RETURNING content_id
            "#,
        )
        .bind(content_id)
        .bind(user_id)
        .bind(&analysis.summary)
        .bind(&analysis.long_summary)
        .bind(&entities)
        .bind(&analysis.tags)
        .bind(analysis.priority.to_string())
        .bind(analysis.confidence)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted.is_some())
    }

    pub async fn get_analysis(&self, content_id: Uuid) -> Result<Option<ContentAnalysis>> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            "SELECT summary, long_summary, entities, tags, priority, confidence \
             FROM analyses WHERE content_id = $1",
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let entities: Vec<Entity> = serde_json::from_value(r.entities).unwrap_or_default();
            ContentAnalysis {
                summary: r.summary,
                long_summary: r.long_summary,
                entities,
                tags: r.tags,
                priority: Priority::from_str_loose(&r.priority),
                confidence: r.confidence,
            }
        }))
    }

    /// Short summaries for a set of content ids, keyed by id. Missing analyses
    /// are simply absent from the map.
    pub async fn summaries_for(
        &self,
        content_ids: &[Uuid],
    ) -> Result<std::collections::HashMap<Uuid, String>> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT content_id, summary FROM analyses WHERE content_id = ANY($1)",
        )
        .bind(content_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
