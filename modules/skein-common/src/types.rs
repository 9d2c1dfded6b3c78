use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Job types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl JobStatus {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    FetchFeed,
    AnalyzeContent,
    GenerateDigest,
    SendEmail,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::FetchFeed => write!(f, "fetch_feed"),
            JobKind::AnalyzeContent => write!(f, "analyze_content"),
            JobKind::GenerateDigest => write!(f, "generate_digest"),
            JobKind::SendEmail => write!(f, "send_email"),
        }
    }
}

/// Kind-specific job payload. The tag doubles as the `kind` column in the store,
/// so dispatch is exhaustive at compile time rather than a string switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    FetchFeed {
        source_id: Uuid,
        user_id: Uuid,
    },
    AnalyzeContent {
        content_id: Uuid,
        user_id: Uuid,
        title: String,
        content: String,
        url: String,
    },
    GenerateDigest {
        user_id: Uuid,
        timeframe: Timeframe,
    },
    SendEmail {
        to: String,
        subject: String,
        html: String,
        digest_id: Uuid,
    },
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::FetchFeed { .. } => JobKind::FetchFeed,
            JobPayload::AnalyzeContent { .. } => JobKind::AnalyzeContent,
            JobPayload::GenerateDigest { .. } => JobKind::GenerateDigest,
            JobPayload::SendEmail { .. } => JobKind::SendEmail,
        }
    }
}

/// A unit of deferred work.
///
/// Status only moves Pending -> Running -> {Completed | Failed}; a failed attempt
/// below `max_attempts` is returned to Pending with `scheduled_at` pushed forward.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub user_id: Option<Uuid>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Outcome of one dispatcher batch run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: u32,
    pub completed: u32,
    pub retried: u32,
    pub failed: u32,
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processed={} completed={} retried={} failed={}",
            self.processed, self.completed, self.retried, self.failed
        )
    }
}

// --- Digest timeframes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Weekly,
    Monthly,
    Quarterly,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeframe::Weekly => write!(f, "weekly"),
            Timeframe::Monthly => write!(f, "monthly"),
            Timeframe::Quarterly => write!(f, "quarterly"),
        }
    }
}

impl Timeframe {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "monthly" => Timeframe::Monthly,
            "quarterly" => Timeframe::Quarterly,
            _ => Timeframe::Weekly,
        }
    }

    /// Lookback cutoff for digest selection. Weekly is day-based; monthly and
    /// quarterly use calendar months so "one month ago" lands on the same day.
    pub fn cutoff_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Timeframe::Weekly => now - chrono::Duration::days(7),
            Timeframe::Monthly => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - chrono::Duration::days(30)),
            Timeframe::Quarterly => now
                .checked_sub_months(Months::new(3))
                .unwrap_or(now - chrono::Duration::days(90)),
        }
    }
}

// --- Content ---

/// A deduplicated unit of ingested text. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub url: String,
    pub body: String,
    pub source_label: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContent {
    pub user_id: Uuid,
    pub title: String,
    pub url: String,
    pub body: String,
    pub source_label: String,
    pub fingerprint: String,
}

// --- Analysis ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl Priority {
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "high" | "critical" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

/// A named, typed entity extracted from one piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub entity_type: String,
}

/// Enrichment result for one Content. Created once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub summary: String,
    pub long_summary: String,
    pub entities: Vec<Entity>,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub confidence: f32,
}

// --- Sources ---

/// A subscribed ingestion endpoint. `etag`/`last_modified` feed the conditional
/// request headers on the next poll and are updated after every fetch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub label: String,
    pub is_active: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A single entry parsed out of a feed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: Option<DateTime<Utc>>,
}

// --- Digests ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestStatus {
    Draft,
    Scheduled,
    Sent,
}

impl std::fmt::Display for DigestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestStatus::Draft => write!(f, "draft"),
            DigestStatus::Scheduled => write!(f, "scheduled"),
            DigestStatus::Sent => write!(f, "sent"),
        }
    }
}

impl DigestStatus {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "draft" => DigestStatus::Draft,
            "sent" => DigestStatus::Sent,
            _ => DigestStatus::Scheduled,
        }
    }
}

/// A generated periodic summary. Draft -> Scheduled -> Sent; Sent is terminal,
/// and a failed send leaves the digest at Scheduled for retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub timeframe: Timeframe,
    pub body: String,
    pub referenced_content_ids: Vec<Uuid>,
    pub status: DigestStatus,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_tag_matches_kind_string() {
        let payload = JobPayload::FetchFeed {
            source_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "fetch_feed");
        assert_eq!(json["kind"], payload.kind().to_string());
    }

    #[test]
    fn payload_round_trips_through_store_column() {
        let payload = JobPayload::GenerateDigest {
            user_id: Uuid::new_v4(),
            timeframe: Timeframe::Monthly,
        };
        let json = serde_json::to_value(&payload).unwrap();
        let back: JobPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), JobKind::GenerateDigest);
    }

    #[test]
    fn weekly_cutoff_is_seven_days() {
        let now = Utc::now();
        let cutoff = Timeframe::Weekly.cutoff_from(now);
        assert_eq!((now - cutoff).num_days(), 7);
    }

    #[test]
    fn monthly_cutoff_uses_calendar_months() {
        let now = "2026-03-31T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let cutoff = Timeframe::Monthly.cutoff_from(now);
        // No Feb 31st — chrono clamps to the end of February.
        assert_eq!(cutoff.to_rfc3339(), "2026-02-28T12:00:00+00:00");
    }

    #[test]
    fn quarterly_cutoff_is_three_months() {
        let now = "2026-08-06T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let cutoff = Timeframe::Quarterly.cutoff_from(now);
        assert_eq!(cutoff.to_rfc3339(), "2026-05-06T00:00:00+00:00");
    }

    #[test]
    fn priority_parses_loosely() {
        assert_eq!(Priority::from_str_loose("HIGH"), Priority::High);
        assert_eq!(Priority::from_str_loose("critical"), Priority::High);
        assert_eq!(Priority::from_str_loose("unknown"), Priority::Medium);
    }
}
