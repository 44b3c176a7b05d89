/*!
 * Batch scheduling of translation requests.
 *
 * Pending indices are split into batches. Every index of a batch runs the
 * whole handler chain in its own task, with at most `worker_count` tasks
 * active at once. Progress is checkpointed after every batch and whenever
 * enough successes have accumulated since the last checkpoint.
 */

use std::sync::Arc;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::Semaphore;

use crate::errors::AppError;
use crate::session::SessionManager;
use crate::subtitle_processor::SourceCatalog;

use super::pipeline::TranslationPipeline;
use super::request::{RequestStatus, TranslationRequest};
use super::run_context::{RunContext, RunStats};

/// Callback receiving `(processed, total)` after each finished request
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Scheduler sizing
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Concurrent requests
    pub worker_count: usize,
    /// Indices dispatched together between checkpoints
    pub batch_size: usize,
    /// Successes that trigger a checkpoint inside a batch
    pub save_interval: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 6,
            batch_size: 12,
            save_interval: 30,
        }
    }
}

/// Drives pending indices through the pipeline
pub struct BatchScheduler {
    pipeline: Arc<TranslationPipeline>,
    catalog: Arc<SourceCatalog>,
    session: Arc<SessionManager>,
    languages: Vec<String>,
    config: SchedulerConfig,
    progress_callback: Option<ProgressCallback>,
}

impl BatchScheduler {
    pub fn new(
        pipeline: TranslationPipeline,
        catalog: Arc<SourceCatalog>,
        session: Arc<SessionManager>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            catalog,
            languages: session.languages().to_vec(),
            session,
            config,
            progress_callback: None,
        }
    }

    /// Report progress after each finished request
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Translate `pending` and return the run statistics.
    ///
    /// Per-request failures never stop the run. A fatal error (a failed
    /// checkpoint or translation log write) stops dispatching, a last
    /// checkpoint is attempted and the error is returned.
    pub async fn run(&self, pending: Vec<usize>, ctx: Arc<RunContext>) -> Result<RunStats, AppError> {
        let total = pending.len();
        if total == 0 {
            info!("Nothing to translate");
            return Ok(ctx.finish(0, false));
        }

        let worker_count = self.config.worker_count.max(1);
        let batch_size = self.config.batch_size.max(1);
        let save_interval = self.config.save_interval.max(1);
        let semaphore = Arc::new(Semaphore::new(worker_count));

        info!(
            "Translating {} entries into {} with {} workers (batches of {})",
            total,
            self.languages.join(","),
            worker_count,
            batch_size
        );

        let batch_count = total.div_ceil(batch_size);
        let mut processed = 0usize;
        let mut since_flush = 0usize;
        let mut interrupted = false;

        for (batch_number, batch) in pending.chunks(batch_size).enumerate() {
            if ctx.is_cancelled() {
                warn!("Run cancelled, {} entries left untranslated", total - processed);
                interrupted = true;
                break;
            }
            if ctx.has_fatal() {
                break;
            }
            debug!("Processing batch {} of {}", batch_number + 1, batch_count);

            let mut tasks = FuturesUnordered::new();
            for &index in batch {
                let handle = tokio::spawn(Self::process_index(
                    index,
                    Arc::clone(&self.pipeline),
                    Arc::clone(&self.catalog),
                    self.languages.clone(),
                    Arc::clone(&semaphore),
                    Arc::clone(&ctx),
                ));
                tasks.push(async move { (index, handle.await) });
            }

            while let Some((index, joined)) = tasks.next().await {
                let status = match joined {
                    Ok(status) => status,
                    Err(e) => {
                        error!("Worker for entry {} crashed: {}", index, e);
                        let mut lost = TranslationRequest::new(index, "", "", Vec::<String>::new());
                        lost.mark_failed(format!("worker crashed: {}", e));
                        ctx.record_outcome(&lost);
                        RequestStatus::Failed
                    }
                };

                processed += 1;
                if let Some(callback) = &self.progress_callback {
                    callback(processed, total);
                }

                if status == RequestStatus::Succeeded {
                    since_flush += 1;
                    if since_flush >= save_interval {
                        self.checkpoint(&ctx);
                        since_flush = 0;
                    }
                }
            }

            self.checkpoint(&ctx);
            since_flush = 0;
        }

        if let Some(err) = ctx.take_fatal() {
            error!("Run {} aborted: {}", ctx.run_id(), err);
            if let Err(flush_err) = self.session.checkpoint(ctx.run_id(), ctx.usage()) {
                error!("Final checkpoint failed: {}", flush_err);
            }
            return Err(err);
        }

        let stats = ctx.finish(total, interrupted);
        info!("Run finished: {}", stats);
        Ok(stats)
    }

    fn checkpoint(&self, ctx: &RunContext) {
        if let Err(e) = self.session.checkpoint(ctx.run_id(), ctx.usage()) {
            ctx.report_fatal(e);
        }
    }

    async fn process_index(
        index: usize,
        pipeline: Arc<TranslationPipeline>,
        catalog: Arc<SourceCatalog>,
        languages: Vec<String>,
        semaphore: Arc<Semaphore>,
        ctx: Arc<RunContext>,
    ) -> RequestStatus {
        let text = catalog.text(index).unwrap_or_default().to_string();
        let mut request = TranslationRequest::new(index, text, catalog.context(index), &languages);

        match semaphore.acquire_owned().await {
            Ok(_permit) => pipeline.process(&mut request, &ctx).await,
            Err(e) => request.mark_failed(format!("scheduler: {}", e)),
        }

        ctx.record_outcome(&request);
        request.status()
    }
}
