use chrono::{DateTime, Utc};
use neo4rs::query;
use tracing::debug;
use uuid::Uuid;

use skein_common::Entity;

use crate::{GraphClient, INITIAL_STRENGTH, STRENGTH_STEP};

/// Write-side wrapper for the concept graph. Used by the analyze handler only.
pub struct GraphWriter {
    client: GraphClient,
}

/// What one ingest call touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub concepts: usize,
    pub relationships: usize,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Weave one content item's entities into the user's concept graph.
    ///
    /// Concepts are MERGEd on (user_id, name, concept_type): created with
    /// frequency 1, or incremented by 1 per mention. Every unordered pair of
    /// distinct entities then gets a RELATES_TO edge in both directions,
    /// created at 0.5 and strengthened by 0.1 when the pair co-occurs again in
    /// a different content item. The edge remembers the last contributing
    /// content_id, so re-delivering the same content is strength-neutral.
    ///
    /// Both statements are single batched UNWINDs — one round trip for all
    /// concepts, one for all pairs, regardless of entity count.
    pub async fn ingest(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        entities: &[Entity],
    ) -> Result<IngestStats, neo4rs::Error> {
        let entities = dedupe_entities(entities);
        if entities.is_empty() {
            return Ok(IngestStats::default());
        }

        let now = format_datetime(&Utc::now());
        let names: Vec<String> = entities.iter().map(|e| e.name.clone()).collect();
        let types: Vec<String> = entities.iter().map(|e| e.entity_type.clone()).collect();
        let ids: Vec<String> = entities
            .iter()
            .map(|_| Uuid::new_v4().to_string())
            .collect();

        let q = query(
            "UNWIND range(0, size($names) - 1) AS i
             MERGE (c:Concept {user_id: $user_id, name: $names[i], concept_type: $types[i]})
             ON CREATE SET
                 c.id = $ids[i],
                 c.frequency = 1,
                 c.first_seen = datetime($now),
                 c.last_seen = datetime($now)
             ON MATCH SET
                 c.frequency = c.frequency + 1,
                 c.last_seen = datetime($now)",
        )
        .param("user_id", user_id.to_string())
        .param("names", names.clone())
        .param("types", types.clone())
        .param("ids", ids)
        .param("now", now.as_str());

        self.client.graph.run(q).await?;

        // All ordered pairs of distinct entities — directed edges both ways for
        // each unordered pair. Entity lists are capped upstream, so k² stays small.
        let mut from_names = Vec::new();
        let mut from_types = Vec::new();
        let mut to_names = Vec::new();
        let mut to_types = Vec::new();
        for i in 0..entities.len() {
            for j in 0..entities.len() {
                if i == j {
                    continue;
                }
                from_names.push(names[i].clone());
                from_types.push(types[i].clone());
                to_names.push(names[j].clone());
                to_types.push(types[j].clone());
            }
        }

        let relationships = from_names.len();
        if relationships > 0 {
            let q = query(
                "UNWIND range(0, size($from_names) - 1) AS i
                 MATCH (a:Concept {user_id: $user_id, name: $from_names[i], concept_type: $from_types[i]})
                 MATCH (b:Concept {user_id: $user_id, name: $to_names[i], concept_type: $to_types[i]})
                 MERGE (a)-[r:RELATES_TO]->(b)
                 ON CREATE SET
                     r.strength = $initial,
                     r.rel_type = 'co_occurrence',
                     r.content_id = $content_id,
                     r.created_at = datetime($now)
                 ON MATCH SET
                     r.strength = r.strength +
                         (CASE WHEN r.content_id = $content_id THEN 0.0 ELSE $step END),
                     r.content_id = $content_id",
            )
            .param("user_id", user_id.to_string())
            .param("from_names", from_names)
            .param("from_types", from_types)
            .param("to_names", to_names)
            .param("to_types", to_types)
            .param("content_id", content_id.to_string())
            .param("initial", INITIAL_STRENGTH)
            .param("step", STRENGTH_STEP)
            .param("now", now.as_str());

            self.client.graph.run(q).await?;
        }

        debug!(
            %user_id,
            %content_id,
            concepts = entities.len(),
            relationships,
            "Concept graph ingest complete"
        );

        Ok(IngestStats {
            concepts: entities.len(),
            relationships,
        })
    }
}

/// Drop duplicate (name, type) mentions within one content item so a single
/// item never double-counts a concept.
fn dedupe_entities(entities: &[Entity]) -> Vec<Entity> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for entity in entities {
        let name = entity.name.trim();
        if name.is_empty() {
            continue;
        }
        let key = (name.to_lowercase(), entity.entity_type.to_lowercase());
        if seen.insert(key) {
            out.push(Entity {
                name: name.to_string(),
                entity_type: entity.entity_type.trim().to_lowercase(),
            });
        }
    }
    out
}

/// Format a DateTime<Utc> as a local datetime string without timezone offset.
/// Neo4j's datetime() requires "YYYY-MM-DDThh:mm:ss" format (no +00:00 suffix).
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, entity_type: &str) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
        }
    }

    #[test]
    fn dedupe_drops_repeat_mentions_case_insensitively() {
        let entities = vec![
            entity("Rust", "technology"),
            entity("rust", "Technology"),
            entity("Rust", "organization"),
        ];
        let deduped = dedupe_entities(&entities);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name, "Rust");
        assert_eq!(deduped[0].entity_type, "technology");
    }

    #[test]
    fn dedupe_drops_blank_names() {
        let entities = vec![entity("  ", "technology"), entity("Tokio", "technology")];
        let deduped = dedupe_entities(&entities);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].name, "Tokio");
    }
}
