//! The background processing core: a batch dispatcher that drains the job
//! queue and routes each job to its handler — feed polling with conditional
//! fetch, content dedup and analysis, concept-graph ingestion, and digest
//! synthesis and delivery.

pub mod digest;
pub mod dispatcher;
pub mod fetcher;
pub mod handlers;
pub mod mailer;
pub mod summarizer;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use digest::DigestSynthesizer;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use fetcher::{FeedFetchOutcome, FeedFetcher};
pub use handlers::JobRunner;
pub use mailer::{NoopMailer, WebhookMailer};
pub use summarizer::ClaudeSummarizer;
pub use traits::{ConceptSink, DigestItem, Mailer, Summarizer};
