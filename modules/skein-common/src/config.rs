use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Summarizer
    pub anthropic_api_key: String,

    // Mail (optional — NoopMailer when unset)
    pub mail_webhook_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub digest_from_email: String,

    // Trigger endpoint
    pub trigger_secret: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Job processing
    pub max_jobs_per_run: u32,
    pub job_max_attempts: i32,
    pub job_backoff_seconds: i64,
    pub job_retention_days: i64,
    pub stale_running_minutes: i64,
    pub feed_fetch_interval_minutes: i64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            neo4j_uri: required_env("NEO4J_URI"),
            neo4j_user: required_env("NEO4J_USER"),
            neo4j_password: required_env("NEO4J_PASSWORD"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            mail_webhook_url: env::var("MAIL_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
            mail_api_key: env::var("MAIL_API_KEY").ok().filter(|v| !v.is_empty()),
            digest_from_email: env::var("DIGEST_FROM_EMAIL")
                .unwrap_or_else(|_| "digests@skein.local".to_string()),
            trigger_secret: required_env("TRIGGER_SECRET"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: parsed_env("WEB_PORT", 3000),
            max_jobs_per_run: parsed_env("MAX_JOBS_PER_RUN", 25),
            job_max_attempts: parsed_env("JOB_MAX_ATTEMPTS", 3),
            job_backoff_seconds: parsed_env("JOB_BACKOFF_SECONDS", 60),
            job_retention_days: parsed_env("JOB_RETENTION_DAYS", 7),
            stale_running_minutes: parsed_env("STALE_RUNNING_MINUTES", 30),
            feed_fetch_interval_minutes: parsed_env("FEED_FETCH_INTERVAL_MINUTES", 60),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got '{v}'")),
        Err(_) => default,
    }
}
