use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle, time};
use tracing::{debug, error, info, instrument, warn};

use stronghold_types::errors::{AppError, ApplicationError};

use crate::{
    config::Config,
    events::{EventPublisher, publish_events},
    jobs::{
        Job,
        handler::{JobHandlerContext, JobRegistry},
    },
    uow::UnitOfWorkProvider,
};

/// Polls the job store, runs due jobs and prunes finished ones.
pub struct JobWorker {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
    registry: Arc<dyn JobRegistry>,
    config: Arc<Config>,
    publisher: Arc<dyn EventPublisher>,
}

impl JobWorker {
    pub fn new(
        uow_provider: Arc<dyn UnitOfWorkProvider>,
        registry: Arc<dyn JobRegistry>,
        config: Arc<Config>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            uow_provider,
            registry,
            config,
            publisher,
        }
    }

    /// Spawns `worker_count` polling loops plus the pruning loop. They stop once
    /// `shutdown` turns true.
    pub fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.config.worker_count + 1);

        for worker_id in 0..self.config.worker_count {
            let worker = self.clone();
            let mut shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                let mut interval =
                    time::interval(Duration::from_millis(worker.config.worker_poll_interval_ms));
                info!(worker_id, "Job worker started");

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = worker.process_due_jobs().await {
                                error!(worker_id, error = %e, "Error while processing jobs");
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!(worker_id, "Job worker stopped");
            }));
        }

        let worker = self.clone();
        let mut shutdown = shutdown;
        handles.push(tokio::spawn(async move {
            let mut interval =
                time::interval(Duration::from_secs(worker.config.prune_interval_secs.max(1)));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = worker.prune_finished_jobs().await {
                            error!(error = %e, "Error while pruning jobs");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
                if *shutdown.borrow() {
                    break;
                }
            }
        }));

        handles
    }

    /// Runs up to `job_batch_size` due jobs, one by one.
    /// Each job is claimed right before it runs, so its lease covers only its own
    /// execution. Returns how many jobs were claimed.
    pub async fn process_due_jobs(&self) -> Result<usize, ApplicationError> {
        let mut processed = 0;
        while (processed as i64) < self.config.job_batch_size {
            let Some(job) = self.claim_next_job().await? else {
                break;
            };
            processed += 1;

            if let Err(e) = self.execute(&job).await {
                if let Err(failure_err) = self.handle_failure(&job, e).await {
                    error!(
                        job_id = %job.id,
                        key = %job.key,
                        error = %failure_err,
                        "Could not record job failure"
                    );
                }
            }
        }

        if processed > 0 {
            debug!(count = processed, "Processed due jobs");
        }
        Ok(processed)
    }

    async fn claim_next_job(&self) -> Result<Option<Job>, ApplicationError> {
        let uow = self.uow_provider.begin().await?;
        let now = uow.now();
        let mut jobs = uow
            .jobs()
            .find_and_lock_due_jobs(now, 1, self.config.job_lease_secs)
            .await?;
        uow.commit().await?;
        Ok(jobs.pop())
    }

    /// Runs the handler and marks the job completed in the same transaction.
    #[instrument(skip_all, fields(job_id = %job.id, key = %job.key, attempt = job.attempts))]
    async fn execute(&self, job: &Job) -> Result<(), ApplicationError> {
        let handler = self.registry.get_handler(&job.task)?;
        let uow = self.uow_provider.begin().await?;
        let ctx = JobHandlerContext {
            uow,
            config: self.config.clone(),
        };

        let timeout = Duration::from_secs(self.config.job_timeout_secs);
        let outcome = match time::timeout(timeout, handler.handle(&ctx, job)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::JobTimeout(job.key.to_string()).into()),
        };
        let outcome = match outcome {
            Ok(()) => {
                ctx.uow
                    .jobs()
                    .mark_as_completed(job.id, job.attempts, ctx.uow.now())
                    .await
            }
            Err(e) => Err(e),
        };

        let JobHandlerContext { uow, .. } = ctx;
        match outcome {
            Ok(false) => {
                // The lease ran out and another worker owns the job now.
                warn!("Job lease lost, discarding this run");
                uow.rollback().await?;
                Ok(())
            }
            Ok(true) => {
                let events = uow.events().drain();
                uow.commit().await?;
                publish_events(self.publisher.as_ref(), events);
                debug!("Job completed");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(error = %rollback_err, "Rollback after job failure failed");
                }
                Err(e)
            }
        }
    }

    /// Reschedules a failed job with backoff, or fails it for good.
    async fn handle_failure(&self, job: &Job, err: ApplicationError) -> Result<(), ApplicationError> {
        let uow = self.uow_provider.begin().await?;
        let now = uow.now();
        let message = err.to_string();

        if err.is_retryable() && job.can_retry() {
            let run_at = now + job.backoff.delay_for(job.attempts);
            warn!(
                job_id = %job.id,
                key = %job.key,
                attempt = job.attempts,
                max_attempts = job.max_attempts,
                %run_at,
                error = %message,
                "Job failed, retrying"
            );
            if !uow
                .jobs()
                .schedule_retry(job.id, job.attempts, run_at, &message)
                .await?
            {
                warn!(job_id = %job.id, key = %job.key, "Job lease lost, retry not recorded");
            }
        } else {
            if matches!(err, ApplicationError::Game(_)) {
                error!(job_id = %job.id, key = %job.key, error = %message, "Job hit a broken invariant");
            } else {
                error!(
                    job_id = %job.id,
                    key = %job.key,
                    attempts = job.attempts,
                    error = %message,
                    "Job failed permanently"
                );
            }
            if !uow
                .jobs()
                .mark_as_failed(job.id, job.attempts, now, &message)
                .await?
            {
                warn!(job_id = %job.id, key = %job.key, "Job lease lost, failure not recorded");
            }
        }

        uow.commit().await
    }

    /// Applies the retention policies for completed and failed jobs.
    pub async fn prune_finished_jobs(&self) -> Result<u64, ApplicationError> {
        let uow = self.uow_provider.begin().await?;
        let now = uow.now();
        let pruned = uow
            .jobs()
            .prune(
                now,
                &self.config.completed_job_retention,
                &self.config.failed_job_retention,
            )
            .await?;
        uow.commit().await?;

        if pruned > 0 {
            debug!(pruned, "Pruned finished jobs");
        }
        Ok(pruned)
    }
}
