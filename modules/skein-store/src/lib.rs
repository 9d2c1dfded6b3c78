//! Postgres persistence for the ingestion pipeline: job queue, deduplicated
//! content, feed sources, and digests. All mutation paths are single-statement
//! upserts or conditional updates so concurrent dispatcher instances are safe.

pub mod content_store;
pub mod digest_store;
pub mod error;
pub mod job_store;
pub mod source_store;

pub use content_store::ContentStore;
pub use digest_store::{DigestStore, NewDigest};
pub use error::{Result, StoreError};
pub use job_store::{FailOutcome, JobStore, NewJob, RetryPolicy};
pub use source_store::{NewSource, SourceStore};

use sqlx::postgres::PgPoolOptions;
pub use sqlx::PgPool;

/// Connect to Postgres with a small pool.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
