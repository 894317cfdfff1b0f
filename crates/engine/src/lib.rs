//! The scheduler: a fixed-size worker pool that drives each job through the
//! transcribe → chunk → embed workflow.
//!
//! Guarantees, in the order they matter:
//! - activities execute at least once, but their *durable* effect lands at
//!   most once (output and completion marker commit in one store
//!   transaction, and marked activities are skipped);
//! - transient failures retry with bounded exponential backoff, permanent
//!   ones fail the job immediately;
//! - a restarted process resumes every non-terminal job from the first
//!   unmarked activity;
//! - cancellation is observed within one heartbeat interval.

mod activity;
mod config;
mod workflow;

pub use activity::Activity;
pub use config::{EngineConfig, RetryPolicy};

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use murmur_chunker::{Chunker, TopicOracle};
use murmur_embedder::Embedder;
use murmur_progress::ProgressBus;
use murmur_store::JobStore;
use murmur_transcribe::Transcriber;

pub struct Engine<S, T, O, E> {
    inner: Arc<Inner<S, T, O, E>>,
    queue_tx: mpsc::UnboundedSender<i64>,
    shutdown: CancellationToken,
}

impl<S, T, O, E> Clone for Engine<S, T, O, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            queue_tx: self.queue_tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

pub(crate) struct Inner<S, T, O, E> {
    pub(crate) store: Arc<S>,
    pub(crate) transcriber: T,
    pub(crate) chunker: Chunker<O>,
    pub(crate) embedder: Arc<E>,
    pub(crate) bus: ProgressBus,
    pub(crate) config: EngineConfig,
}

impl<S, T, O, E> Engine<S, T, O, E>
where
    S: JobStore,
    T: Transcriber + 'static,
    O: TopicOracle + 'static,
    E: Embedder + 'static,
{
    pub fn new(
        config: EngineConfig,
        store: Arc<S>,
        transcriber: T,
        chunker: Chunker<O>,
        embedder: Arc<E>,
        bus: ProgressBus,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let inner = Arc::new(Inner {
            store,
            transcriber,
            chunker,
            embedder,
            bus,
            config,
        });

        tokio::spawn(dispatch(
            Arc::clone(&inner),
            queue_rx,
            shutdown.clone(),
        ));

        Self {
            inner,
            queue_tx,
            shutdown,
        }
    }

    /// Queue a job for execution. FIFO; the job sits in `pending` until a
    /// worker slot frees up. Returns `false` once the engine is shut down.
    pub fn start(&self, job_id: i64) -> bool {
        self.queue_tx.send(job_id).is_ok()
    }

    /// Re-enqueue every non-terminal job. Called once at startup; running it
    /// again is harmless because marked activities are skipped.
    pub async fn recover(&self) -> Result<usize, murmur_store::Error> {
        let jobs = self.inner.store.list_resumable_jobs().await?;
        let mut queued = 0;
        for job in jobs {
            tracing::info!(job_id = job.id, status = %job.status, "recovering_job");
            if self.start(job.id) {
                queued += 1;
            }
        }
        Ok(queued)
    }

    /// Stop admitting work. Activities already running keep their worker
    /// slot until they finish their current attempt.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn dispatch<S, T, O, E>(
    inner: Arc<Inner<S, T, O, E>>,
    mut queue_rx: mpsc::UnboundedReceiver<i64>,
    shutdown: CancellationToken,
) where
    S: JobStore,
    T: Transcriber + 'static,
    O: TopicOracle + 'static,
    E: Embedder + 'static,
{
    let slots = Arc::new(Semaphore::new(inner.config.worker_pool_size));

    loop {
        let job_id = tokio::select! {
            _ = shutdown.cancelled() => break,
            job = queue_rx.recv() => match job {
                Some(job_id) => job_id,
                None => break,
            },
        };

        // Admission is strictly FIFO: the next job is not pulled until this
        // one holds a worker slot.
        let permit = tokio::select! {
            _ = shutdown.cancelled() => break,
            permit = Arc::clone(&slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let inner = Arc::clone(&inner);
        tokio::spawn(async move {
            let _slot = permit;
            workflow::run(&inner, job_id).await;
        });
    }

    tracing::debug!("dispatcher_stopped");
}
