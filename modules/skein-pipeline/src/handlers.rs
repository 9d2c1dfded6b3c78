use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, info};
use uuid::Uuid;

use skein_common::{Job, JobPayload, NewContent, Timeframe};
use skein_store::{ContentStore, DigestStore, JobStore, NewJob, SourceStore};

use crate::digest::DigestSynthesizer;
use crate::fetcher::{entry_fingerprint, FeedFetcher};
use crate::traits::{ConceptSink, Mailer, Summarizer};

/// Routes one claimed job to its handler. Stateless apart from the shared
/// stores and collaborators; safe to call from overlapping batch runs.
pub struct JobRunner {
    job_store: JobStore,
    content_store: ContentStore,
    source_store: SourceStore,
    digest_store: DigestStore,
    fetcher: FeedFetcher,
    summarizer: Arc<dyn Summarizer>,
    mailer: Arc<dyn Mailer>,
    graph: Arc<dyn ConceptSink>,
    digests: DigestSynthesizer,
}

impl JobRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_store: JobStore,
        content_store: ContentStore,
        source_store: SourceStore,
        digest_store: DigestStore,
        fetcher: FeedFetcher,
        summarizer: Arc<dyn Summarizer>,
        mailer: Arc<dyn Mailer>,
        graph: Arc<dyn ConceptSink>,
    ) -> Self {
        let digests = DigestSynthesizer::new(
            content_store.clone(),
            digest_store.clone(),
            summarizer.clone(),
        );
        Self {
            job_store,
            content_store,
            source_store,
            digest_store,
            fetcher,
            summarizer,
            mailer,
            graph,
            digests,
        }
    }

    /// Execute one job. Errors are caught at the dispatcher boundary and turn
    /// into a failed attempt; they never abort the batch.
    pub async fn run(&self, job: &Job) -> Result<()> {
        match &job.payload {
            JobPayload::FetchFeed { source_id, user_id } => {
                self.fetch_feed(*source_id, *user_id).await
            }
            JobPayload::AnalyzeContent {
                content_id,
                user_id,
                title,
                content,
                url,
            } => {
                self.analyze_content(*content_id, *user_id, title, content, url)
                    .await
            }
            JobPayload::GenerateDigest { user_id, timeframe } => {
                self.generate_digest(*user_id, *timeframe).await
            }
            JobPayload::SendEmail {
                to,
                subject,
                html,
                digest_id,
            } => self.send_email(to, subject, html, *digest_id).await,
        }
    }

    /// Poll a source, store new entries, and enqueue analysis for each.
    /// Dedup makes re-polling cheap: entries already fingerprinted for this
    /// user are skipped without touching the queue.
    async fn fetch_feed(&self, source_id: Uuid, user_id: Uuid) -> Result<()> {
        let source = self
            .source_store
            .get(source_id)
            .await?
            .ok_or_else(|| anyhow!("source {source_id} not found"))?;

        if !source.is_active {
            info!(%source_id, "Source inactive; skipping fetch");
            return Ok(());
        }

        let outcome = self.fetcher.fetch(&source).await?;

        // Conditional metadata and last_fetched_at move forward on every
        // successful poll, 304s included.
        self.source_store
            .record_fetch(
                source.id,
                outcome.etag.as_deref(),
                outcome.last_modified.as_deref(),
            )
            .await?;

        if outcome.not_modified {
            return Ok(());
        }

        let mut stored = 0usize;
        let mut duplicates = 0usize;
        for entry in &outcome.entries {
            let fingerprint = entry_fingerprint(entry);
            let inserted = self
                .content_store
                .insert(NewContent {
                    user_id,
                    title: entry.title.clone(),
                    url: entry.link.clone(),
                    body: entry.description.clone(),
                    source_label: source.label.clone(),
                    fingerprint,
                })
                .await?;

            match inserted {
                Some(content_id) => {
                    stored += 1;
                    self.job_store
                        .enqueue(NewJob::new(JobPayload::AnalyzeContent {
                            content_id,
                            user_id,
                            title: entry.title.clone(),
                            content: entry.description.clone(),
                            url: entry.link.clone(),
                        }))
                        .await?;
                }
                None => {
                    duplicates += 1;
                    debug!(link = %entry.link, "Entry already ingested");
                }
            }
        }

        info!(%source_id, stored, duplicates, "Feed processed");
        Ok(())
    }

    /// Analyze one content item and weave its entities into the concept graph.
    /// The analysis row is the idempotency reservation: on re-delivery the
    /// insert is a no-op and enrichment is skipped, so graph counters are not
    /// inflated by at-least-once delivery.
    async fn analyze_content(
        &self,
        content_id: Uuid,
        user_id: Uuid,
        title: &str,
        content: &str,
        url: &str,
    ) -> Result<()> {
        let analysis = self.summarizer.analyze(title, content, url).await?;

        let newly_recorded = self
            .content_store
            .insert_analysis(content_id, user_id, &analysis)
            .await?;
        if !newly_recorded {
            info!(%content_id, "Analysis already recorded; skipping graph ingest");
            return Ok(());
        }

        let stats = self
            .graph
            .ingest(user_id, content_id, &analysis.entities)
            .await?;

        info!(
            %content_id,
            concepts = stats.concepts,
            relationships = stats.relationships,
            "Content analyzed"
        );
        Ok(())
    }

    /// Synthesize a digest and, when the user has a subscription, enqueue its
    /// delivery. Without a subscription the digest stays Scheduled.
    async fn generate_digest(&self, user_id: Uuid, timeframe: Timeframe) -> Result<()> {
        let Some(digest) = self.digests.generate(user_id, timeframe).await? else {
            return Ok(());
        };

        let Some(recipient) = self.source_store.digest_recipient(user_id).await? else {
            info!(%user_id, "No digest subscription; leaving digest scheduled");
            return Ok(());
        };

        self.job_store
            .enqueue(NewJob::new(JobPayload::SendEmail {
                to: recipient,
                subject: format!("Your {timeframe} digest"),
                html: digest.body.clone(),
                digest_id: digest.id,
            }))
            .await?;
        Ok(())
    }

    /// Deliver a digest email. A failed send propagates, the job retries, and
    /// the digest stays Scheduled; only a successful send advances it to Sent.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        digest_id: Uuid,
    ) -> Result<()> {
        self.mailer.send(to, subject, html).await?;
        self.digest_store.mark_sent(digest_id).await?;
        info!(%digest_id, to, "Digest delivered");
        Ok(())
    }
}
