use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use skein_common::{ContentAnalysis, Entity};
use skein_graph::{GraphWriter, IngestStats};

/// One content item handed to digest composition.
#[derive(Debug, Clone)]
pub struct DigestItem {
    pub content_id: Uuid,
    pub title: String,
    pub summary: String,
    pub url: String,
}

/// The external summarization collaborator: text in, structured analysis out.
/// Potentially slow and rate-limited; callers budget it with a timeout.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn analyze(&self, title: &str, content: &str, url: &str) -> Result<ContentAnalysis>;

    async fn compose_digest(&self, timeframe_label: &str, items: &[DigestItem])
        -> Result<String>;
}

/// The outbound mail collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

/// Where analyzed entities get woven into the concept graph.
#[async_trait]
pub trait ConceptSink: Send + Sync {
    async fn ingest(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        entities: &[Entity],
    ) -> Result<IngestStats>;
}

#[async_trait]
impl ConceptSink for GraphWriter {
    async fn ingest(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        entities: &[Entity],
    ) -> Result<IngestStats> {
        Ok(GraphWriter::ingest(self, user_id, content_id, entities).await?)
    }
}
