use neo4rs::query;
use tracing::info;

use crate::GraphClient;

/// Run idempotent schema migrations: constraints and indexes.
/// Concept identity (user_id, name, concept_type) is enforced by always writing
/// through MERGE; the id constraint guards API consumers that address concepts
/// by UUID.
pub async fn migrate(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    let statements = [
        "CREATE CONSTRAINT concept_id_unique IF NOT EXISTS \
         FOR (c:Concept) REQUIRE c.id IS UNIQUE",
        "CREATE INDEX concept_user_name_idx IF NOT EXISTS \
         FOR (c:Concept) ON (c.user_id, c.name)",
        "CREATE INDEX concept_user_freq_idx IF NOT EXISTS \
         FOR (c:Concept) ON (c.user_id, c.frequency)",
    ];

    for statement in &statements {
        g.run(query(statement)).await?;
    }

    info!("Graph schema migrations complete");
    Ok(())
}
