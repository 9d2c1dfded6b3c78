//! Test doubles for the pipeline's external collaborators.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use skein_common::{ContentAnalysis, Entity, Priority, SkeinError};
use skein_graph::IngestStats;

use crate::traits::{ConceptSink, DigestItem, Mailer, Summarizer};

/// Summarizer returning a canned analysis, no network involved.
pub struct StaticSummarizer {
    pub analysis: ContentAnalysis,
}

impl Default for StaticSummarizer {
    fn default() -> Self {
        Self {
            analysis: ContentAnalysis {
                summary: "A short summary.".to_string(),
                long_summary: "A longer summary of the content.".to_string(),
                entities: vec![
                    Entity {
                        name: "AI".to_string(),
                        entity_type: "technology".to_string(),
                    },
                    Entity {
                        name: "Rust".to_string(),
                        entity_type: "technology".to_string(),
                    },
                ],
                tags: vec!["testing".to_string()],
                priority: Priority::Medium,
                confidence: 0.9,
            },
        }
    }
}

#[async_trait]
impl Summarizer for StaticSummarizer {
    async fn analyze(&self, _title: &str, _content: &str, _url: &str) -> Result<ContentAnalysis> {
        Ok(self.analysis.clone())
    }

    async fn compose_digest(
        &self,
        timeframe_label: &str,
        items: &[DigestItem],
    ) -> Result<String> {
        Ok(format!(
            "<h2>{timeframe_label} digest</h2><p>{} items</p>",
            items.len()
        ))
    }
}

/// Mailer that records every send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

/// Mailer that always fails, for exercising the retry path.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> Result<()> {
        Err(SkeinError::Mail("mail endpoint unavailable".to_string()).into())
    }
}

/// Concept sink that records ingests instead of talking to Neo4j.
#[derive(Default)]
pub struct RecordingConceptSink {
    pub ingests: Mutex<Vec<(Uuid, Uuid, Vec<Entity>)>>,
}

#[async_trait]
impl ConceptSink for RecordingConceptSink {
    async fn ingest(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        entities: &[Entity],
    ) -> Result<IngestStats> {
        self.ingests
            .lock()
            .unwrap()
            .push((user_id, content_id, entities.to_vec()));
        Ok(IngestStats {
            concepts: entities.len(),
            relationships: entities.len().saturating_sub(1) * entities.len(),
        })
    }
}
