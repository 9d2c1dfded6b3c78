use neo4rs::query;
use serde::Serialize;
use uuid::Uuid;

use crate::GraphClient;

/// Node/edge caps for a single concept-map response.
const NODE_LIMIT: i64 = 500;
const EDGE_LIMIT: i64 = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct ConceptNode {
    pub id: Uuid,
    pub name: String,
    pub concept_type: String,
    pub frequency: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptEdge {
    pub from: Uuid,
    pub to: Uuid,
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptMap {
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
}

/// Read-only wrapper for the concept graph, consumed by the visualization API.
pub struct GraphReader {
    client: GraphClient,
}

impl GraphReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// The user's concept map at a given abstraction level (0–100).
    ///
    /// The level translates into a minimum mention frequency:
    /// `floor(level/100 * max_frequency)` — 0 shows everything, 100 only the
    /// most-mentioned concepts. An optional case-insensitive name substring
    /// narrows the node set, and edges survive only when both endpoints do.
    pub async fn concept_map(
        &self,
        user_id: Uuid,
        abstraction_level: u8,
        search: Option<&str>,
    ) -> Result<ConceptMap, neo4rs::Error> {
        let max_frequency = self.max_frequency(user_id).await?;
        let level = abstraction_level.min(100) as f64;
        let min_frequency = (level / 100.0 * max_frequency as f64).floor() as i64;
        let needle = search.unwrap_or("").trim().to_lowercase();

        let q = query(
            "MATCH (c:Concept {user_id: $user_id})
             WHERE c.frequency >= $min_frequency
               AND ($q = '' OR toLower(c.name) CONTAINS $q)
             RETURN c
             ORDER BY c.frequency DESC, c.name
             LIMIT $limit",
        )
        .param("user_id", user_id.to_string())
        .param("min_frequency", min_frequency)
        .param("q", needle.as_str())
        .param("limit", NODE_LIMIT);

        let mut nodes = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            if let Some(node) = row_to_concept(&row) {
                nodes.push(node);
            }
        }

        let q = query(
            "MATCH (a:Concept {user_id: $user_id})-[r:RELATES_TO]->(b:Concept {user_id: $user_id})
             WHERE a.frequency >= $min_frequency AND b.frequency >= $min_frequency
               AND ($q = '' OR (toLower(a.name) CONTAINS $q AND toLower(b.name) CONTAINS $q))
             RETURN a.id AS from_id, b.id AS to_id, r.strength AS strength
             LIMIT $limit",
        )
        .param("user_id", user_id.to_string())
        .param("min_frequency", min_frequency)
        .param("q", needle.as_str())
        .param("limit", EDGE_LIMIT);

        let mut edges = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            let from_str: String = row.get("from_id").unwrap_or_default();
            let to_str: String = row.get("to_id").unwrap_or_default();
            let strength: f64 = row.get("strength").unwrap_or(0.0);
            if let (Ok(from), Ok(to)) = (Uuid::parse_str(&from_str), Uuid::parse_str(&to_str)) {
                edges.push(ConceptEdge { from, to, strength });
            }
        }

        Ok(ConceptMap { nodes, edges })
    }

    /// Highest mention frequency across the user's concepts. 0 when the user
    /// has no graph yet.
    pub async fn max_frequency(&self, user_id: Uuid) -> Result<i64, neo4rs::Error> {
        let q = query(
            "MATCH (c:Concept {user_id: $user_id})
             RETURN coalesce(max(c.frequency), 0) AS max_frequency",
        )
        .param("user_id", user_id.to_string());

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            return Ok(row.get("max_frequency").unwrap_or(0));
        }
        Ok(0)
    }

    /// Mention frequency of one concept. 0 when it does not exist.
    pub async fn concept_frequency(
        &self,
        user_id: Uuid,
        name: &str,
        concept_type: &str,
    ) -> Result<i64, neo4rs::Error> {
        let q = query(
            "MATCH (c:Concept {user_id: $user_id, name: $name, concept_type: $concept_type})
             RETURN c.frequency AS frequency",
        )
        .param("user_id", user_id.to_string())
        .param("name", name)
        .param("concept_type", concept_type);

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            return Ok(row.get("frequency").unwrap_or(0));
        }
        Ok(0)
    }

    /// Strength of the directed edge between two concepts, if present.
    pub async fn relationship_strength(
        &self,
        user_id: Uuid,
        from_name: &str,
        to_name: &str,
    ) -> Result<Option<f64>, neo4rs::Error> {
        let q = query(
            "MATCH (a:Concept {user_id: $user_id, name: $from_name})
                   -[r:RELATES_TO]->
                   (b:Concept {user_id: $user_id, name: $to_name})
             RETURN r.strength AS strength
             LIMIT 1",
        )
        .param("user_id", user_id.to_string())
        .param("from_name", from_name)
        .param("to_name", to_name);

        let mut stream = self.client.graph.execute(q).await?;
        if let Some(row) = stream.next().await? {
            return Ok(Some(row.get("strength").unwrap_or(0.0)));
        }
        Ok(None)
    }
}

fn row_to_concept(row: &neo4rs::Row) -> Option<ConceptNode> {
    let n: neo4rs::Node = row.get("c").ok()?;
    let id_str: String = n.get("id").ok()?;
    let id = Uuid::parse_str(&id_str).ok()?;
    let name: String = n.get("name").unwrap_or_default();
    let concept_type: String = n.get("concept_type").unwrap_or_default();
    let frequency: i64 = n.get("frequency").unwrap_or(0);
    Some(ConceptNode {
        id,
        name,
        concept_type,
        frequency,
    })
}
