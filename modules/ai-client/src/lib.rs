//! Anthropic API client for content analysis and digest composition.

pub mod analyzer;
pub mod claude;
mod structured;

pub use analyzer::{AnalysisResponse, DigestInput, ExtractedEntity};
pub use claude::{Claude, DEFAULT_MODEL};
pub use structured::StructuredOutput;
