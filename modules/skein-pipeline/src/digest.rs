use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use skein_common::{Digest, Timeframe};
use skein_store::{ContentStore, DigestStore, NewDigest};

use crate::traits::{DigestItem, Summarizer};

/// Upper bound on content items woven into one digest.
const DIGEST_MAX_ITEMS: i64 = 50;

/// Selects a time window of content and synthesizes it into a digest.
pub struct DigestSynthesizer {
    content_store: ContentStore,
    digest_store: DigestStore,
    summarizer: Arc<dyn Summarizer>,
}

impl DigestSynthesizer {
    pub fn new(
        content_store: ContentStore,
        digest_store: DigestStore,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            content_store,
            digest_store,
            summarizer,
        }
    }

    /// Generate a digest for the user's content since the timeframe cutoff.
    /// Returns `None` — and writes nothing — when the window is empty. The
    /// stored digest references exactly the selected content ids and starts in
    /// Scheduled status; only the mail step advances it to Sent.
    pub async fn generate(
        &self,
        user_id: Uuid,
        timeframe: Timeframe,
    ) -> Result<Option<Digest>> {
        let cutoff = timeframe.cutoff_from(Utc::now());
        let window = self
            .content_store
            .in_window(user_id, cutoff, DIGEST_MAX_ITEMS)
            .await?;

        if window.is_empty() {
            info!(%user_id, %timeframe, "No content in window; skipping digest");
            return Ok(None);
        }

        let content_ids: Vec<Uuid> = window.iter().map(|c| c.id).collect();
        let summaries = self.content_store.summaries_for(&content_ids).await?;

        let items: Vec<DigestItem> = window
            .iter()
            .map(|content| DigestItem {
                content_id: content.id,
                title: content.title.clone(),
                summary: summaries
                    .get(&content.id)
                    .cloned()
                    .unwrap_or_else(|| snippet(&content.body)),
                url: content.url.clone(),
            })
            .collect();

        let body = self
            .summarizer
            .compose_digest(&timeframe.to_string(), &items)
            .await?;

        let id = self
            .digest_store
            .insert_scheduled(NewDigest {
                user_id,
                timeframe,
                body,
                referenced_content_ids: content_ids,
            })
            .await?;

        let digest = self
            .digest_store
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("digest {id} vanished after insert"))?;

        info!(%user_id, %timeframe, items = items.len(), "Digest generated");
        Ok(Some(digest))
    }
}

/// Fallback summary for content that was never analyzed: the first slice of
/// the body.
fn snippet(body: &str) -> String {
    let mut out: String = body.chars().take(280).collect();
    if out.len() < body.len() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_long_bodies() {
        let body = "x".repeat(500);
        let s = snippet(&body);
        assert!(s.chars().count() == 281 && s.ends_with('…'));
    }

    #[test]
    fn snippet_keeps_short_bodies_intact() {
        assert_eq!(snippet("short body"), "short body");
    }
}
