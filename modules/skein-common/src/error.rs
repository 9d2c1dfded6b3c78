use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkeinError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
