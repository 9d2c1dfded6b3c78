use anyhow::Result;
use async_trait::async_trait;

use ai_client::{Claude, DigestInput};
use skein_common::{ContentAnalysis, Entity, Priority};

use crate::traits::{DigestItem, Summarizer};

/// At most this many entities are kept per analysis. Bounds the pairwise
/// relationship loop downstream.
const MAX_ENTITIES: usize = 10;

/// Summarizer backed by the Anthropic API.
pub struct ClaudeSummarizer {
    claude: Claude,
}

impl ClaudeSummarizer {
    pub fn new(api_key: &str) -> Self {
        Self {
            claude: Claude::new(api_key, ai_client::DEFAULT_MODEL),
        }
    }

    pub fn with_model(api_key: &str, model: &str) -> Self {
        Self {
            claude: Claude::new(api_key, model),
        }
    }
}

#[async_trait]
impl Summarizer for ClaudeSummarizer {
    async fn analyze(&self, title: &str, content: &str, url: &str) -> Result<ContentAnalysis> {
        let response = self.claude.analyze_content(title, content, url).await?;

        let entities = response
            .entities
            .into_iter()
            .map(|e| Entity {
                name: e.name.trim().to_string(),
                entity_type: e.entity_type.trim().to_lowercase(),
            })
            .filter(|e| !e.name.is_empty())
            .take(MAX_ENTITIES)
            .collect();

        Ok(ContentAnalysis {
            summary: response.summary,
            long_summary: response.long_summary,
            entities,
            tags: response.tags,
            priority: Priority::from_str_loose(&response.priority),
            confidence: response.confidence.clamp(0.0, 1.0) as f32,
        })
    }

    async fn compose_digest(
        &self,
        timeframe_label: &str,
        items: &[DigestItem],
    ) -> Result<String> {
        let inputs: Vec<DigestInput> = items
            .iter()
            .map(|item| DigestInput {
                title: item.title.clone(),
                summary: item.summary.clone(),
                url: item.url.clone(),
            })
            .collect();
        self.claude.compose_digest(timeframe_label, &inputs).await
    }
}
