//! Integration tests against a real Neo4j via testcontainers.
//! Run with `cargo test -- --ignored` (requires Docker).

use uuid::Uuid;

use skein_common::Entity;
use skein_graph::testutil::neo4j_container;
use skein_graph::{GraphReader, GraphWriter};

fn entity(name: &str, entity_type: &str) -> Entity {
    Entity {
        name: name.to_string(),
        entity_type: entity_type.to_string(),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn frequency_counts_mentions_across_content() {
    let (_neo4j, client) = neo4j_container().await;
    skein_graph::migrate::migrate(&client).await.unwrap();
    let writer = GraphWriter::new(client.clone());
    let reader = GraphReader::new(client);
    let user = Uuid::new_v4();

    let content_a = Uuid::new_v4();
    let content_b = Uuid::new_v4();
    writer
        .ingest(user, content_a, &[entity("AI", "technology")])
        .await
        .unwrap();
    writer
        .ingest(user, content_b, &[entity("AI", "technology")])
        .await
        .unwrap();

    assert_eq!(
        reader.concept_frequency(user, "AI", "technology").await.unwrap(),
        2
    );

    // A different user's graph is untouched.
    assert_eq!(
        reader
            .concept_frequency(Uuid::new_v4(), "AI", "technology")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_mentions_within_one_content_count_once() {
    let (_neo4j, client) = neo4j_container().await;
    skein_graph::migrate::migrate(&client).await.unwrap();
    let writer = GraphWriter::new(client.clone());
    let reader = GraphReader::new(client);
    let user = Uuid::new_v4();

    writer
        .ingest(
            user,
            Uuid::new_v4(),
            &[entity("Tokio", "technology"), entity("tokio", "technology")],
        )
        .await
        .unwrap();

    assert_eq!(
        reader
            .concept_frequency(user, "Tokio", "technology")
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
#[ignore = "requires docker"]
async fn relationship_strength_starts_at_half_and_steps_by_tenth() {
    let (_neo4j, client) = neo4j_container().await;
    skein_graph::migrate::migrate(&client).await.unwrap();
    let writer = GraphWriter::new(client.clone());
    let reader = GraphReader::new(client);
    let user = Uuid::new_v4();

    let pair = [entity("Rust", "technology"), entity("Mozilla", "organization")];

    writer.ingest(user, Uuid::new_v4(), &pair).await.unwrap();
    let strength = reader
        .relationship_strength(user, "Rust", "Mozilla")
        .await
        .unwrap()
        .expect("edge exists");
    assert!((strength - 0.5).abs() < 1e-9, "first co-occurrence: {strength}");

    // Edges are created in both directions.
    let reverse = reader
        .relationship_strength(user, "Mozilla", "Rust")
        .await
        .unwrap()
        .expect("reverse edge exists");
    assert!((reverse - 0.5).abs() < 1e-9);

    // Two more co-occurrences in other content items: 0.5 + 0.1 * 2.
    writer.ingest(user, Uuid::new_v4(), &pair).await.unwrap();
    writer.ingest(user, Uuid::new_v4(), &pair).await.unwrap();
    let strength = reader
        .relationship_strength(user, "Rust", "Mozilla")
        .await
        .unwrap()
        .unwrap();
    assert!((strength - 0.7).abs() < 1e-9, "after two repeats: {strength}");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn redelivered_content_does_not_inflate_strength() {
    let (_neo4j, client) = neo4j_container().await;
    skein_graph::migrate::migrate(&client).await.unwrap();
    let writer = GraphWriter::new(client.clone());
    let reader = GraphReader::new(client);
    let user = Uuid::new_v4();
    let content = Uuid::new_v4();

    let pair = [entity("Rust", "technology"), entity("Mozilla", "organization")];
    writer.ingest(user, content, &pair).await.unwrap();
    writer.ingest(user, content, &pair).await.unwrap();

    let strength = reader
        .relationship_strength(user, "Rust", "Mozilla")
        .await
        .unwrap()
        .unwrap();
    assert!(
        (strength - 0.5).abs() < 1e-9,
        "same content twice must be strength-neutral: {strength}"
    );
}

#[tokio::test]
#[ignore = "requires docker"]
async fn concept_map_filters_by_abstraction_level_and_search() {
    let (_neo4j, client) = neo4j_container().await;
    skein_graph::migrate::migrate(&client).await.unwrap();
    let writer = GraphWriter::new(client.clone());
    let reader = GraphReader::new(client);
    let user = Uuid::new_v4();

    // "AI" mentioned in 4 items, "Rust" in 2 of them, "Niche" once.
    for i in 0..4 {
        let mut entities = vec![entity("AI", "technology")];
        if i < 2 {
            entities.push(entity("Rust", "technology"));
        }
        if i == 0 {
            entities.push(entity("Niche", "topic"));
        }
        writer.ingest(user, Uuid::new_v4(), &entities).await.unwrap();
    }

    // Level 0: everything visible, edges included.
    let map = reader.concept_map(user, 0, None).await.unwrap();
    assert_eq!(map.nodes.len(), 3);
    assert!(!map.edges.is_empty());

    // Level 60 with max frequency 4 -> threshold 2: "Niche" disappears, and
    // with it every edge touching it.
    let map = reader.concept_map(user, 60, None).await.unwrap();
    let names: Vec<&str> = map.nodes.iter().map(|n| n.name.as_str()).collect();
    assert!(names.contains(&"AI"));
    assert!(names.contains(&"Rust"));
    assert!(!names.contains(&"Niche"));
    let surviving: std::collections::HashSet<Uuid> = map.nodes.iter().map(|n| n.id).collect();
    assert!(map
        .edges
        .iter()
        .all(|e| surviving.contains(&e.from) && surviving.contains(&e.to)));

    // Level 100: only the most-mentioned concept survives.
    let map = reader.concept_map(user, 100, None).await.unwrap();
    assert_eq!(map.nodes.len(), 1);
    assert_eq!(map.nodes[0].name, "AI");
    assert!(map.edges.is_empty());

    // Search narrows by case-insensitive substring.
    let map = reader.concept_map(user, 0, Some("ru")).await.unwrap();
    assert_eq!(map.nodes.len(), 1);
    assert_eq!(map.nodes[0].name, "Rust");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn migrate_is_idempotent() {
    let (_neo4j, client) = neo4j_container().await;
    skein_graph::migrate::migrate(&client).await.unwrap();
    skein_graph::migrate::migrate(&client).await.unwrap();
}
