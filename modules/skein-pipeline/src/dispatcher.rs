use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use skein_common::{BatchReport, Config, JobKind, JobPayload, QueueStats};
use skein_store::{FailOutcome, JobStore, NewJob, SourceStore};

use crate::handlers::JobRunner;

/// Knobs for one dispatcher instance.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Jobs drained per trigger invocation, bounding batch wall time.
    pub max_jobs_per_run: u32,
    /// Running jobs older than this are presumed crashed and swept to Pending.
    pub stale_running_minutes: i64,
    /// Completed/Failed jobs older than this are deleted.
    pub retention_days: i64,
    /// Minimum minutes between polls of the same source.
    pub fetch_interval_minutes: i64,
}

impl DispatcherConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_jobs_per_run: config.max_jobs_per_run,
            stale_running_minutes: config.stale_running_minutes,
            retention_days: config.job_retention_days,
            fetch_interval_minutes: config.feed_fetch_interval_minutes,
        }
    }
}

/// Pulls jobs from the store and routes them by kind. Designed for periodic
/// trigger invocations rather than a resident worker: each call drains up to
/// `max_jobs_per_run` and exits. Overlapping invocations are safe because the
/// claim in `dequeue_next` is exclusive.
pub struct Dispatcher {
    job_store: JobStore,
    source_store: SourceStore,
    runner: Arc<JobRunner>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        job_store: JobStore,
        source_store: SourceStore,
        runner: JobRunner,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            job_store,
            source_store,
            runner: Arc::new(runner),
            config,
        }
    }

    /// One trigger invocation: enqueue due feed polls, drain the queue up to
    /// the batch bound, then sweep crashed jobs and expired history.
    ///
    /// Per-job failures are caught here and recorded on the job; only
    /// infrastructure errors (store unreachable) escape to the caller.
    pub async fn run_batch(&self) -> Result<(BatchReport, QueueStats)> {
        let scheduled = self.schedule_feed_fetches().await?;
        if scheduled > 0 {
            info!(scheduled, "Enqueued feed polls for due sources");
        }

        let mut report = BatchReport::default();
        while report.processed < self.config.max_jobs_per_run {
            let Some(job) = self.job_store.dequeue_next().await? else {
                break;
            };
            report.processed += 1;

            let kind = job.payload.kind();
            let budget = job_timeout(kind);
            let outcome = tokio::time::timeout(budget, self.runner.run(&job)).await;

            match outcome {
                Ok(Ok(())) => {
                    self.job_store.complete(job.id).await?;
                    report.completed += 1;
                }
                Ok(Err(e)) => {
                    self.record_failure(&mut report, &job, &format!("{e:#}"))
                        .await?;
                }
                Err(_) => {
                    let message =
                        format!("timed out after {}s", budget.as_secs());
                    self.record_failure(&mut report, &job, &message).await?;
                }
            }
        }

        let swept = self
            .job_store
            .sweep_stale_running(self.config.stale_running_minutes)
            .await?;
        if swept > 0 {
            warn!(swept, "Recovered stale running jobs");
        }

        let removed = self.job_store.cleanup(self.config.retention_days).await?;
        if removed > 0 {
            info!(removed, "Cleaned up expired jobs");
        }

        let stats = self.job_store.stats().await?;
        info!(%report, "Batch complete");
        Ok((report, stats))
    }

    async fn record_failure(
        &self,
        report: &mut BatchReport,
        job: &skein_common::Job,
        message: &str,
    ) -> Result<()> {
        warn!(
            job_id = %job.id,
            kind = %job.payload.kind(),
            error = message,
            "Job failed"
        );
        match self.job_store.fail(job.id, message).await? {
            FailOutcome::Retrying { attempt } => {
                info!(job_id = %job.id, attempt, "Job rescheduled");
                report.retried += 1;
            }
            FailOutcome::Exhausted => {
                warn!(job_id = %job.id, "Job retries exhausted");
                report.failed += 1;
            }
        }
        Ok(())
    }

    /// Producer step: one FetchFeed job per active source that is due and has
    /// no poll already queued or running.
    async fn schedule_feed_fetches(&self) -> Result<u32> {
        let due = self
            .source_store
            .due_for_fetch(self.config.fetch_interval_minutes)
            .await?;

        let mut scheduled = 0;
        for source in due {
            if self.job_store.has_open_fetch_job(source.id).await? {
                continue;
            }
            self.job_store
                .enqueue(NewJob::new(JobPayload::FetchFeed {
                    source_id: source.id,
                    user_id: source.user_id,
                }))
                .await?;
            scheduled += 1;
        }
        Ok(scheduled)
    }

    /// Assemble a production dispatcher: stores over the pool, the Claude
    /// summarizer, webhook or noop mail depending on config, and the Neo4j
    /// concept graph as the sink.
    pub fn from_parts(
        config: &Config,
        pool: skein_store::PgPool,
        graph: skein_graph::GraphClient,
    ) -> Dispatcher {
        let policy = skein_store::RetryPolicy {
            backoff_seconds: config.job_backoff_seconds,
            max_attempts: config.job_max_attempts,
        };
        let job_store = JobStore::new(pool.clone(), policy);
        let content_store = skein_store::ContentStore::new(pool.clone());
        let source_store = SourceStore::new(pool.clone());
        let digest_store = skein_store::DigestStore::new(pool);

        let summarizer: Arc<dyn crate::traits::Summarizer> =
            Arc::new(crate::summarizer::ClaudeSummarizer::new(&config.anthropic_api_key));

        let mailer: Arc<dyn crate::traits::Mailer> = match &config.mail_webhook_url {
            Some(endpoint) => Arc::new(crate::mailer::WebhookMailer::new(
                endpoint.clone(),
                config.mail_api_key.clone(),
                config.digest_from_email.clone(),
            )),
            None => Arc::new(crate::mailer::NoopMailer),
        };

        let sink: Arc<dyn crate::traits::ConceptSink> =
            Arc::new(skein_graph::GraphWriter::new(graph));

        let runner = JobRunner::new(
            job_store.clone(),
            content_store,
            source_store.clone(),
            digest_store,
            crate::fetcher::FeedFetcher::new(),
            summarizer,
            mailer,
            sink,
        );

        Dispatcher::new(
            job_store,
            source_store,
            runner,
            DispatcherConfig::from_config(config),
        )
    }
}

/// Per-kind execution budget. A job that blows its budget fails (and retries)
/// instead of hanging the batch.
fn job_timeout(kind: JobKind) -> Duration {
    match kind {
        JobKind::FetchFeed => Duration::from_secs(30),
        JobKind::AnalyzeContent => Duration::from_secs(120),
        JobKind::GenerateDigest => Duration::from_secs(180),
        JobKind::SendEmail => Duration::from_secs(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_timeout_budget() {
        for kind in [
            JobKind::FetchFeed,
            JobKind::AnalyzeContent,
            JobKind::GenerateDigest,
            JobKind::SendEmail,
        ] {
            assert!(job_timeout(kind) >= Duration::from_secs(30));
        }
    }
}
