pub mod config;
pub mod error;
pub mod fingerprint;
pub mod types;

pub use config::Config;
pub use error::SkeinError;
pub use fingerprint::fingerprint;
pub use types::*;
