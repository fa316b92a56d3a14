//! Classification polling loop.
//!
//! The shared store is the work queue: records sit in `RAW` until a worker
//! cycle submits them to the classifier and merges the results back. The
//! loop is the top-level fault boundary — per-batch failures back off and
//! retry, they never terminate a service-mode worker. Because every store
//! write is an idempotent merge, a crash between writing a batch and the
//! next poll just re-submits the unconfirmed subset (at-least-once, never
//! lost).
//!
//! One cycle:
//! 1. Poll up to `classifier.batch_size` `RAW` records.
//! 2. Empty → drain mode stops, service mode idles and re-polls.
//! 3. Otherwise one classification request covers the whole batch.
//! 4. Every valid response entry is merged (`RAW → CLASSIFIED`); codes the
//!    response omits stay `RAW` for a later cycle.
//! 5. Failures map to a backoff through [`FailureKind`], as policy data.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use sqlx::SqlitePool;

use crate::classifier::{ClassifierClient, ClassifierError, GroqClient};
use crate::config::{Config, WorkerConfig};
use crate::db;
use crate::models::Status;
use crate::registry;

/// How the loop treats an empty queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// One-shot job: stop once the queue is empty.
    Drain,
    /// Long-running service: idle and keep polling.
    Service,
}

/// Closed set of recoverable cycle failures. Each kind carries its backoff;
/// none of them discards the batch — unwritten codes remain `RAW`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    MalformedResponse,
    Transient,
}

impl FailureKind {
    pub fn backoff(&self, config: &WorkerConfig) -> Duration {
        let secs = match self {
            FailureKind::RateLimited => config.rate_limit_backoff_secs,
            FailureKind::MalformedResponse => config.retry_backoff_secs,
            FailureKind::Transient => config.retry_backoff_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Result of one poll-classify-merge cycle.
#[derive(Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Queue was empty.
    Idle,
    /// A batch went through the classifier. `requeued` codes were requested
    /// but not answered (or failed to write) and remain `RAW`.
    Classified { written: u64, requeued: u64 },
    /// The cycle failed recoverably; the whole batch remains `RAW`.
    Failed(FailureKind),
}

pub struct Worker {
    pool: SqlitePool,
    client: Box<dyn ClassifierClient>,
    batch_size: usize,
    backoff: WorkerConfig,
}

impl Worker {
    pub fn new(
        pool: SqlitePool,
        client: Box<dyn ClassifierClient>,
        batch_size: usize,
        backoff: WorkerConfig,
    ) -> Self {
        Self {
            pool,
            client,
            batch_size,
            backoff,
        }
    }

    /// Run one cycle. Store and classifier failures are contained here and
    /// reported as [`CycleOutcome::Failed`] — the caller decides pacing.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let batch = match registry::find_by_status(&self.pool, Status::Raw, self.batch_size).await {
            Ok(batch) => batch,
            Err(e) => {
                eprintln!("Warning: queue poll failed: {}", e);
                return CycleOutcome::Failed(FailureKind::Transient);
            }
        };

        if batch.is_empty() {
            return CycleOutcome::Idle;
        }

        let codes: Vec<String> = batch.iter().map(|r| r.code.clone()).collect();

        let results = match self.client.classify(&codes).await {
            Ok(results) => results,
            Err(ClassifierError::RateLimited) => {
                return CycleOutcome::Failed(FailureKind::RateLimited);
            }
            Err(e @ ClassifierError::MalformedResponse(_)) => {
                eprintln!("Warning: {}", e);
                return CycleOutcome::Failed(FailureKind::MalformedResponse);
            }
            Err(e) => {
                eprintln!("Warning: {}", e);
                return CycleOutcome::Failed(FailureKind::Transient);
            }
        };

        let requested: HashSet<&str> = codes.iter().map(String::as_str).collect();
        let mut written = 0u64;

        for result in &results {
            if !requested.contains(result.input.as_str()) {
                eprintln!(
                    "Warning: classifier answered for unrequested code '{}'",
                    result.input
                );
                continue;
            }
            match registry::merge_classification(
                &self.pool,
                result,
                self.client.agent(),
                Status::Classified,
            )
            .await
            {
                Ok(()) => written += 1,
                Err(e) => {
                    // Stays RAW; re-submitted next cycle.
                    eprintln!(
                        "Warning: could not store classification for '{}': {}",
                        result.input, e
                    );
                }
            }
        }

        let requeued = (codes.len() as u64).saturating_sub(written);
        CycleOutcome::Classified { written, requeued }
    }

    /// Run the loop until the queue drains (drain mode), the process is
    /// interrupted, or forever (service mode). Interruption is checked at
    /// cycle boundaries only, so a batch is never abandoned half-merged.
    pub async fn run(&self, mode: WorkerMode) -> Result<()> {
        let shutdown = Arc::new(AtomicBool::new(false));
        {
            let flag = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    flag.store(true, Ordering::SeqCst);
                }
            });
        }

        let mut cycles = 0u64;
        let mut total_written = 0u64;

        loop {
            if shutdown.load(Ordering::SeqCst) {
                println!("  interrupted — stopping at batch boundary");
                break;
            }

            cycles += 1;
            match self.run_cycle().await {
                CycleOutcome::Idle => match mode {
                    WorkerMode::Drain => {
                        println!("  queue drained");
                        break;
                    }
                    WorkerMode::Service => {
                        tokio::time::sleep(Duration::from_secs(self.backoff.idle_backoff_secs))
                            .await;
                    }
                },
                CycleOutcome::Classified { written, requeued } => {
                    total_written += written;
                    println!("  batch: {} classified, {} requeued", written, requeued);
                    // Mandatory pacing even on success so the API is never
                    // hit back-to-back.
                    tokio::time::sleep(Duration::from_secs(self.backoff.pacing_secs)).await;
                }
                CycleOutcome::Failed(kind) => {
                    let delay = kind.backoff(&self.backoff);
                    eprintln!(
                        "Warning: cycle failed ({:?}); backing off {}s",
                        kind,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        println!("  cycles: {}", cycles);
        println!("  classified: {}", total_written);
        println!("ok");
        Ok(())
    }
}

/// Entry point for `skuh classify`.
pub async fn run_classify(config: &Config, drain: bool) -> Result<()> {
    if !config.classifier.is_enabled() {
        bail!("Classifier provider is disabled. Set [classifier] provider in config.");
    }

    // Startup connectivity and credentials are the only fatal class.
    let client = GroqClient::new(&config.classifier)?;
    let pool = db::connect(config).await?;

    println!("classify");
    println!("  agent: {}", client.agent());
    println!("  batch size: {}", config.classifier.batch_size);

    let worker = Worker::new(
        pool.clone(),
        Box::new(client),
        config.classifier.batch_size,
        config.worker.clone(),
    );
    let mode = if drain {
        WorkerMode::Drain
    } else {
        WorkerMode::Service
    };
    worker.run(mode).await?;

    pool.close().await;
    Ok(())
}
