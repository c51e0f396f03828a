//! Work dispatcher and extraction worker pool.
//!
//! The dispatcher seeds a [`JobQueue`] with every frontier URL followed by one
//! [`Job::Terminate`] per worker, starts the workers, and waits on the queue's
//! join barrier. Each worker owns one browser session and loops
//! `pull → parse → publish → mark done` until it pulls a sentinel. A job that
//! fails (error or panic) is marked done without publishing anything.

use crate::config::Timings;
use crate::error::{HarvestError, HarvestResult};
use crate::parser;
use crate::progress::{Progress, ProgressEventKind};
use crate::record::Record;
use crate::renderer::{BrowserSession, Renderer};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{info, warn};

/// One unit of dispatched work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// A review page to extract.
    Url(String),
    /// Tells the worker that pulls it to stop.
    Terminate,
}

/// Bounded multi-consumer job queue with a join barrier.
///
/// Every job put on the queue must be marked done exactly once with
/// [`JobQueue::task_done`]; [`JobQueue::join`] resolves once the number of
/// outstanding jobs drops to zero.
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    rx: Mutex<mpsc::Receiver<Job>>,
    pending: watch::Sender<usize>,
    done: AtomicUsize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (pending, _) = watch::channel(0);
        Self {
            tx,
            rx: Mutex::new(rx),
            pending,
            done: AtomicUsize::new(0),
        }
    }

    /// Enqueue a job, waiting for room if the queue is full.
    pub async fn put(&self, job: Job) -> HarvestResult<()> {
        self.pending.send_modify(|n| *n += 1);
        if self.tx.send(job).await.is_err() {
            self.pending.send_modify(|n| *n -= 1);
            return Err(HarvestError::Join("job queue closed".into()));
        }
        Ok(())
    }

    /// Take the next job. Waits while the queue is empty.
    pub async fn get(&self) -> Option<Job> {
        self.rx.lock().await.recv().await
    }

    /// Mark one previously pulled job as finished.
    pub fn task_done(&self) {
        let mut underflow = false;
        self.pending.send_if_modified(|n| {
            if *n == 0 {
                underflow = true;
                return false;
            }
            *n -= 1;
            true
        });
        if underflow {
            warn!("task_done called more times than jobs were queued");
            return;
        }
        self.done.fetch_add(1, Ordering::SeqCst);
    }

    /// Jobs queued and not yet marked done.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Jobs marked done so far.
    pub fn done_count(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Wait until every queued job has been marked done.
    pub async fn join(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Per-worker tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub extracted: usize,
    pub failed: usize,
}

/// What the dispatcher hands to the aggregator once the barrier releases.
pub struct DispatchOutcome {
    /// Records published by the workers, in arrival order.
    pub results: mpsc::UnboundedReceiver<Record>,
    /// Workers that actually ran.
    pub workers: usize,
    /// Jobs marked done, sentinels included.
    pub jobs_done: usize,
    /// URL jobs that produced no record.
    pub jobs_failed: usize,
}

/// Runs the extraction phase over a fixed number of browser sessions.
pub struct WorkerPool {
    workers: usize,
    timings: Timings,
    progress: Progress,
}

impl WorkerPool {
    pub fn new(workers: usize, timings: Timings, progress: Progress) -> Self {
        Self {
            workers,
            timings,
            progress,
        }
    }

    /// Extract every URL and return once the join barrier releases.
    ///
    /// Sessions are opened before any job is queued. A worker whose session
    /// cannot be opened is not started and gets no sentinel; if no session
    /// opens at all the phase fails with [`HarvestError::NoSessions`].
    pub async fn dispatch(
        &self,
        renderer: &dyn Renderer,
        urls: Vec<String>,
    ) -> HarvestResult<DispatchOutcome> {
        let mut sessions = Vec::with_capacity(self.workers);
        for worker in 0..self.workers {
            match renderer.new_session().await {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(worker, "failed to open browser session: {e:#}"),
            }
        }
        if sessions.is_empty() {
            return Err(HarvestError::NoSessions);
        }
        let workers = sessions.len();
        if workers < self.workers {
            warn!("running with {workers} of {} workers", self.workers);
        }

        let queue = Arc::new(JobQueue::new(urls.len() + workers));
        let url_count = urls.len();
        for url in urls {
            queue.put(Job::Url(url)).await?;
        }
        for _ in 0..workers {
            queue.put(Job::Terminate).await?;
        }
        info!("queued {url_count} urls for {workers} workers");
        self.progress.emit(ProgressEventKind::JobsQueued {
            urls: url_count,
            workers,
        });

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(workers);
        for (id, session) in sessions.into_iter().enumerate() {
            handles.push(tokio::spawn(run_worker(
                id,
                session,
                Arc::clone(&queue),
                results_tx.clone(),
                self.timings.clone(),
                self.progress.clone(),
            )));
        }
        drop(results_tx);

        queue.join().await;

        let mut jobs_failed = 0;
        for handle in handles {
            match handle.await {
                Ok(stats) => jobs_failed += stats.failed,
                Err(e) => return Err(HarvestError::Join(e.to_string())),
            }
        }

        Ok(DispatchOutcome {
            results: results_rx,
            workers,
            jobs_done: queue.done_count(),
            jobs_failed,
        })
    }
}

/// Worker loop. The whole loop, first pull included, sits inside one fault
/// boundary: a job can fail, the worker cannot.
async fn run_worker(
    id: usize,
    mut session: Box<dyn BrowserSession>,
    queue: Arc<JobQueue>,
    results: mpsc::UnboundedSender<Record>,
    timings: Timings,
    progress: Progress,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    while let Some(job) = queue.get().await {
        let url = match job {
            Job::Terminate => {
                queue.task_done();
                break;
            }
            Job::Url(url) => url,
        };

        info!(worker = id, "processing {url}");
        let outcome = AssertUnwindSafe(parser::parse(session.as_mut(), &url, &timings))
            .catch_unwind()
            .await;
        let failure = match outcome {
            Ok(Ok(record)) => {
                let _ = results.send(record);
                None
            }
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(panic) => Some(panic_message(panic.as_ref())),
        };

        match failure {
            None => {
                stats.extracted += 1;
                progress.emit(ProgressEventKind::RecordExtracted {
                    worker: id,
                    url,
                });
                queue.task_done();
                tokio::time::sleep(timings.job_pause).await;
            }
            Some(reason) => {
                warn!(worker = id, "error with {url}: {reason}");
                stats.failed += 1;
                progress.emit(ProgressEventKind::JobFailed {
                    worker: id,
                    url,
                    reason,
                });
                queue.task_done();
            }
        }
    }

    if let Err(e) = session.close().await {
        warn!(worker = id, "failed to close browser session: {e:#}");
    }
    stats
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
