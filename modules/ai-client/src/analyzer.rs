//! Content analysis and digest composition on top of the Claude client.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Claude;

/// Longest content slice sent for analysis. Feed articles occasionally embed
/// entire page dumps; everything past this adds cost without changing the result.
const ANALYSIS_CONTENT_CHARS: usize = 12_000;

/// What the LLM returns for one analyzed content item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResponse {
    /// 1-2 sentence summary of the content
    pub summary: String,
    /// One-paragraph summary covering the main points
    #[serde(default)]
    pub long_summary: String,
    /// Named entities mentioned in the content
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    /// 3-5 thematic tags as lowercase-with-hyphens slugs
    #[serde(default)]
    pub tags: Vec<String>,
    /// "low", "medium", or "high"
    #[serde(default = "default_priority")]
    pub priority: String,
    /// 0.0-1.0 confidence in the analysis
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// A named entity extracted from content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedEntity {
    /// Canonical name (e.g. "Rust", "Mozilla", "Ada Lovelace")
    pub name: String,
    /// "person", "organization", "technology", "topic", "place", "product", or "other"
    pub entity_type: String,
}

fn default_priority() -> String {
    "medium".to_string()
}

fn default_confidence() -> f64 {
    0.5
}

/// One content item handed to digest composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestInput {
    pub title: String,
    pub summary: String,
    pub url: String,
}

const ANALYSIS_SYSTEM_PROMPT: &str = "\
You analyze saved articles and feed items for a personal knowledge base. \
Extract what the reader would want indexed: a crisp summary, the named \
entities (people, organizations, technologies, topics, places, products), \
a few thematic tags, and how important this item is relative to everyday \
reading (priority low/medium/high). Be conservative with entities — only \
names actually present in the text.";

const DIGEST_SYSTEM_PROMPT: &str = "\
You write periodic reading digests. Given a list of saved items with \
summaries, produce a short narrative digest in HTML: an overall theme \
paragraph, then a grouped rundown of the items with links. Plain <h2>, <p>, \
<ul>, <a> markup only. Do not invent items that are not in the list.";

impl Claude {
    /// Analyze one content item into summary, entities, tags, and priority.
    pub async fn analyze_content(
        &self,
        title: &str,
        content: &str,
        url: &str,
    ) -> Result<AnalysisResponse> {
        let content: String = content.chars().take(ANALYSIS_CONTENT_CHARS).collect();
        let user_prompt = format!("Title: {title}\nURL: {url}\n\nContent:\n{content}");
        self.extract(ANALYSIS_SYSTEM_PROMPT, user_prompt).await
    }

    /// Compose a digest body from the selected items. Returns HTML.
    pub async fn compose_digest(
        &self,
        timeframe_label: &str,
        items: &[DigestInput],
    ) -> Result<String> {
        let mut listing = String::new();
        for item in items {
            listing.push_str(&format!(
                "- {} ({})\n  {}\n",
                item.title, item.url, item.summary
            ));
        }
        let user_prompt = format!(
            "Write the {timeframe_label} digest for these {} items:\n\n{listing}",
            items.len()
        );
        self.chat_completion(DIGEST_SYSTEM_PROMPT, user_prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StructuredOutput;

    #[test]
    fn analysis_schema_is_an_object_with_expected_fields() {
        let schema = AnalysisResponse::schema();
        let properties = schema["properties"].as_object().expect("object schema");
        for field in ["summary", "entities", "tags", "priority", "confidence"] {
            assert!(properties.contains_key(field), "missing field {field}");
        }
    }

    #[test]
    fn analysis_response_tolerates_minimal_json() {
        let parsed: AnalysisResponse =
            serde_json::from_str(r#"{"summary": "Short."}"#).unwrap();
        assert_eq!(parsed.summary, "Short.");
        assert!(parsed.entities.is_empty());
        assert_eq!(parsed.priority, "medium");
        assert!((parsed.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn analysis_response_parses_full_payload() {
        let parsed: AnalysisResponse = serde_json::from_str(
            r#"{
                "summary": "S",
                "long_summary": "L",
                "entities": [{"name": "Rust", "entity_type": "technology"}],
                "tags": ["systems-programming"],
                "priority": "high",
                "confidence": 0.92
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.entities[0].name, "Rust");
        assert_eq!(parsed.priority, "high");
    }
}
