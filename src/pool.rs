//! Fixed-size worker pool fed with batches over a shared job queue.
//!
//! ```text
//!   coordinator ──jobs (chunks of batches, partition order)──▶ worker 0..n
//!        ▲                                                        │
//!        └──────────── events (ready / init failure / batch done) ┘
//! ```
//!
//! Workers are scoped threads, so they borrow the renderer, content and
//! config instead of sharing owned copies. Each one owns its template and
//! error log; nothing mutable is shared between them besides the filesystem.

use crate::{
    config::GenerationConfig,
    content::Content,
    error::{Error, Result},
    partition::{self, Batch},
    render::Renderer,
    worker::{BatchResult, Worker},
};
use serde::Serialize;
use std::{
    panic::{self, AssertUnwindSafe},
    path::Path,
    sync::{
        Mutex, PoisonError,
        mpsc::{self, Receiver, Sender},
    },
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, info_span, warn};

/// Messages sent from workers to the coordinator.
enum WorkerEvent {
    Ready,
    InitFailed(Error),
    BatchDone { worker: usize, batch: Batch, result: BatchResult },
}

/// Counts gathered once every dispatched batch has returned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoolOutcome {
    /// Summed batch results
    pub totals: BatchResult,

    /// Number of batches dispatched
    pub batches: usize,

    /// Number of workers started
    pub workers: usize,

    /// Wall time from dispatch to drain
    pub elapsed: Duration,
}

impl PoolOutcome {
    /// Returns processed documents per second of wall time.
    #[must_use]
    pub fn docs_per_second(&self) -> f64 {
        throughput(self.totals.processed, self.elapsed)
    }
}

/// Live progress accounting, fed in completion order.
#[derive(Debug)]
pub(crate) struct Progress {
    total_documents: usize,
    started: Instant,
    totals: BatchResult,
    completed_batches: usize,
}

impl Progress {
    pub(crate) fn new(total_documents: usize) -> Self {
        Self {
            total_documents,
            started: Instant::now(),
            totals: BatchResult::default(),
            completed_batches: 0,
        }
    }

    /// Accounts for one finished batch and returns the current rate.
    pub(crate) fn record(&mut self, result: BatchResult) -> f64 {
        self.totals.merge(result);
        self.completed_batches += 1;
        self.docs_per_second()
    }

    pub(crate) fn docs_per_second(&self) -> f64 {
        throughput(self.totals.processed, self.started.elapsed())
    }

    pub(crate) const fn totals(&self) -> BatchResult {
        self.totals
    }

    pub(crate) const fn completed_batches(&self) -> usize {
        self.completed_batches
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Documents per second, zero when no time has elapsed.
pub(crate) fn throughput(documents: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        documents as f64 / secs
    } else {
        0.0
    }
}

/// Dispatches one run's batches to a fixed number of workers.
pub(crate) struct WorkerPool<'a, R: Renderer> {
    config: &'a GenerationConfig,
    renderer: &'a R,
    content: &'a Content,
}

impl<'a, R: Renderer> WorkerPool<'a, R> {
    pub(crate) const fn new(config: &'a GenerationConfig, renderer: &'a R, content: &'a Content) -> Self {
        Self {
            config,
            renderer,
            content,
        }
    }

    /// Runs every batch of the configured partition against `run_dir`.
    ///
    /// Blocks until each dispatched batch has reported back.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A worker thread cannot be spawned
    /// - Any worker fails to initialize
    /// - A batch result never arrives because its worker died
    pub(crate) fn run(&self, run_dir: &Path) -> Result<PoolOutcome> {
        let batches = partition::partition(self.config.num_documents, self.config.batch_size);
        let chunks = partition::dispatch_chunks(&batches, self.config.chunksize);
        let workers = self.config.worker_count();

        info!(
            "Dispatching {} batches ({} per job) to {} workers",
            batches.len(),
            self.config.chunksize,
            workers
        );

        let (job_tx, job_rx) = mpsc::channel::<Vec<Batch>>();
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();
        let jobs = Mutex::new(job_rx);
        let mut progress = Progress::new(self.config.num_documents);

        let (config, renderer, content) = (self.config, self.renderer, self.content);

        let outcome = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            let mut spawn_error = None;

            for id in 0..workers {
                let events = event_tx.clone();
                let jobs = &jobs;

                let spawned = thread::Builder::new()
                    .name(format!("docbatch-worker-{id}"))
                    .spawn_scoped(scope, move || {
                        worker_loop(id, renderer, config, content, run_dir, jobs, &events);
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        spawn_error = Some(Error::Pool {
                            message: format!("worker {id}: {e}"),
                        });
                        break;
                    }
                }
            }
            drop(event_tx);

            let outcome = match spawn_error {
                Some(e) => {
                    drop(job_tx);
                    Err(e)
                }
                None => coordinate(handles.len(), job_tx, &event_rx, chunks, &mut progress),
            };

            let panicked = handles
                .into_iter()
                .map(thread::ScopedJoinHandle::join)
                .filter(std::result::Result::is_err)
                .count();
            if panicked > 0 {
                error!("{} worker(s) terminated abnormally", panicked);
            }

            outcome
        })?;

        let elapsed = progress.elapsed();
        debug!(
            "Pool drained: {} batches, {} documents in {:.2}s",
            outcome,
            progress.totals().processed + progress.totals().failed,
            elapsed.as_secs_f64()
        );

        Ok(PoolOutcome {
            totals: progress.totals(),
            batches: batches.len(),
            workers,
            elapsed,
        })
    }
}

/// Waits for the pool to become ready, dispatches every chunk and drains results.
///
/// Returns the number of batches whose results were received.
fn coordinate(
    workers: usize,
    job_tx: Sender<Vec<Batch>>,
    events: &Receiver<WorkerEvent>,
    chunks: Vec<Vec<Batch>>,
    progress: &mut Progress,
) -> Result<usize> {
    let mut ready = 0;
    while ready < workers {
        match events.recv() {
            Ok(WorkerEvent::Ready) => ready += 1,
            Ok(WorkerEvent::InitFailed(e)) => {
                error!("{}", e);
                return Err(e);
            }
            Ok(WorkerEvent::BatchDone { .. }) => {}
            Err(_) => break,
        }
    }

    if ready < workers {
        return Err(Error::Pool {
            message: format!("only {ready} of {workers} workers became ready"),
        });
    }

    debug!("{} workers ready", ready);

    let dispatched: usize = chunks.iter().map(Vec::len).sum();
    for chunk in chunks {
        if job_tx.send(chunk).is_err() {
            break;
        }
    }
    drop(job_tx);

    let mut received = 0;
    while received < dispatched {
        match events.recv() {
            Ok(WorkerEvent::BatchDone {
                worker,
                batch,
                result,
            }) => {
                received += 1;
                let rate = progress.record(result);
                let done = progress.totals();
                debug!(
                    "Worker {} returned batch [{}, {})",
                    worker, batch.lo, batch.hi
                );
                info!(
                    "Progress: {}/{} ({} failed, {:.2} docs/s)",
                    done.processed + done.failed,
                    progress.total_documents,
                    done.failed,
                    rate
                );
            }
            Ok(_) => {}
            Err(_) => {
                return Err(Error::WorkerLost {
                    missing: dispatched - received,
                    dispatched,
                });
            }
        }
    }

    debug_assert_eq!(progress.completed_batches(), dispatched);
    Ok(received)
}

/// Body of one worker thread: initialize once, then process jobs until the
/// queue closes.
fn worker_loop<R: Renderer>(
    id: usize,
    renderer: &R,
    config: &GenerationConfig,
    content: &Content,
    run_dir: &Path,
    jobs: &Mutex<Receiver<Vec<Batch>>>,
    events: &Sender<WorkerEvent>,
) {
    let _span = info_span!("worker", id).entered();

    let init = panic::catch_unwind(AssertUnwindSafe(|| {
        Worker::init(id, renderer, config, run_dir)
    }));

    let mut worker = match init {
        Ok(Ok(worker)) => {
            let _ = events.send(WorkerEvent::Ready);
            worker
        }
        Ok(Err(e)) => {
            let _ = events.send(WorkerEvent::InitFailed(e));
            return;
        }
        Err(_) => {
            let _ = events.send(WorkerEvent::InitFailed(Error::worker_init(
                id,
                "panicked during initialization",
            )));
            return;
        }
    };

    loop {
        let job = jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();

        let Ok(chunk) = job else {
            break;
        };

        for batch in chunk {
            let result = worker.process_batch(batch, content);
            let event = WorkerEvent::BatchDone {
                worker: worker.id(),
                batch,
                result,
            };
            if events.send(event).is_err() {
                warn!("Coordinator stopped listening, worker {} exiting", id);
                return;
            }
        }
    }

    debug!("Worker {} shutting down", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::{STUB_TEMPLATE, StubRenderer};

    fn create_test_config(num_documents: usize, batch_size: usize, workers: usize) -> GenerationConfig {
        GenerationConfig::builder()
            .num_documents(num_documents)
            .batch_size(batch_size)
            .shard_size(4)
            .max_workers(workers)
            .template_name(STUB_TEMPLATE)
            .build()
            .unwrap()
    }

    #[test]
    fn test_pool_processes_every_document() {
        let temp = assert_fs::TempDir::new().unwrap();
        let renderer = StubRenderer::new();
        let config = create_test_config(23, 4, 3);
        let content = Content::placeholder();

        let outcome = WorkerPool::new(&config, &renderer, &content)
            .run(temp.path())
            .unwrap();

        assert_eq!(outcome.batches, 6);
        assert_eq!(outcome.workers, 3);
        assert_eq!(outcome.totals.processed, 23);
        assert_eq!(outcome.totals.failed, 0);
        assert_eq!(renderer.calls(), 23);
        assert!(temp.path().join("00005/doc_00000022.pdf").exists());
    }

    #[test]
    fn test_pool_with_chunked_dispatch() {
        let temp = assert_fs::TempDir::new().unwrap();
        let renderer = StubRenderer::failing_on([0, 9]);
        let config = GenerationConfig::builder()
            .num_documents(10)
            .batch_size(3)
            .chunksize(2)
            .max_workers(2)
            .template_name(STUB_TEMPLATE)
            .build()
            .unwrap();
        let content = Content::placeholder();

        let outcome = WorkerPool::new(&config, &renderer, &content)
            .run(temp.path())
            .unwrap();

        assert_eq!(outcome.batches, 4);
        assert_eq!(outcome.totals.processed, 8);
        assert_eq!(outcome.totals.failed, 2);
    }

    #[test]
    fn test_pool_with_zero_documents() {
        let temp = assert_fs::TempDir::new().unwrap();
        let renderer = StubRenderer::new();
        let config = create_test_config(0, 4, 2);
        let content = Content::placeholder();

        let outcome = WorkerPool::new(&config, &renderer, &content)
            .run(temp.path())
            .unwrap();

        assert_eq!(outcome.batches, 0);
        assert_eq!(outcome.totals, BatchResult::default());
        assert_eq!(outcome.docs_per_second(), 0.0);
    }

    #[test]
    fn test_init_failure_is_fatal() {
        let temp = assert_fs::TempDir::new().unwrap();
        let renderer = StubRenderer::new();
        let config = GenerationConfig::builder()
            .num_documents(8)
            .max_workers(2)
            .template_name("missing.html")
            .build()
            .unwrap();
        let content = Content::placeholder();

        let result = WorkerPool::new(&config, &renderer, &content).run(temp.path());

        assert!(matches!(result, Err(Error::WorkerInit { .. })));
        assert_eq!(renderer.calls(), 0);
    }

    #[test]
    fn test_lost_batch_is_fatal() {
        let temp = assert_fs::TempDir::new().unwrap();
        let renderer = StubRenderer::panicking_on([3]);
        let config = create_test_config(8, 2, 2);
        let content = Content::placeholder();

        let result = WorkerPool::new(&config, &renderer, &content).run(temp.path());

        match result {
            Err(Error::WorkerLost {
                missing,
                dispatched,
            }) => {
                assert_eq!(missing, 1);
                assert_eq!(dispatched, 4);
            }
            other => panic!("expected a lost batch, got {other:?}"),
        }
        assert!(temp.path().join("00001/doc_00000007.pdf").exists());
    }

    #[test]
    fn test_progress_accounting() {
        let mut progress = Progress::new(10);
        progress.record(BatchResult {
            processed: 3,
            failed: 1,
            skipped: 0,
        });
        progress.record(BatchResult {
            processed: 6,
            failed: 0,
            skipped: 6,
        });

        assert_eq!(progress.completed_batches(), 2);
        assert_eq!(progress.totals().processed, 9);
        assert_eq!(progress.totals().failed, 1);
        assert_eq!(progress.totals().skipped, 6);
    }

    #[test]
    fn test_throughput() {
        assert_eq!(throughput(50, Duration::from_secs(2)), 25.0);
        assert_eq!(throughput(50, Duration::ZERO), 0.0);
    }
}
