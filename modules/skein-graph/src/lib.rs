//! Per-user concept graph on Neo4j. Concepts are identified by
//! (user_id, name, concept_type) and carry a monotonically increasing mention
//! frequency; RELATES_TO edges accumulate co-occurrence strength. All writes go
//! through MERGE so increments serialize in the store rather than racing in
//! application code.

pub mod client;
pub mod migrate;
pub mod reader;
#[cfg(feature = "test-utils")]
pub mod testutil;
pub mod writer;

pub use client::GraphClient;
pub use reader::{ConceptEdge, ConceptMap, ConceptNode, GraphReader};
pub use writer::{GraphWriter, IngestStats};

/// Strength assigned to a co-occurrence edge on first creation.
pub const INITIAL_STRENGTH: f64 = 0.5;

/// Strength added when the same pair co-occurs in another content item.
pub const STRENGTH_STEP: f64 = 0.1;
