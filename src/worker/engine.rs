use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, RecvError, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::error::{Error, WorkerError};
use crate::merkle::{Hash32, LeafMode, NodeHasher, ProofOutcome};
use crate::worker::config::WorkerConfig;
use crate::worker::protocol::{JobId, JobIdSource, JobRun, ProofRequest, ProofResponse};

struct Job {
    id: JobId,
    request: ProofRequest,
    reply: Sender<ProofResponse>,
}

struct Running {
    jobs: Sender<Job>,
    joins: Vec<JoinHandle<()>>,
}

/// Computes Merkle inclusion proofs on dedicated threads.
///
/// Jobs go through one bounded queue shared by `threads` workers. Each job carries
/// a correlation id and its own reply channel, so any number of callers may have
/// jobs in flight at once. A panicking job takes its thread down; its caller sees
/// [`WorkerError::Disconnected`] and can [`restart`](Self::restart) the worker.
pub struct MerkleProofWorker {
    config: WorkerConfig,
    ids: JobIdSource,
    running: Option<Running>,
}

impl MerkleProofWorker {
    pub fn spawn(config: WorkerConfig) -> Result<Self, Error> {
        config.validate()?;
        let running = start(&config)?;
        info!(
            threads = config.threads,
            queue = config.queue_capacity,
            "proof worker started"
        );
        Ok(Self {
            config,
            ids: JobIdSource::new(1),
            running: Some(running),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Queue a job without waiting for its result.
    pub fn submit(&self, request: ProofRequest) -> Result<PendingProof, WorkerError> {
        let running = self.running.as_ref().ok_or(WorkerError::Disconnected)?;
        let id = self.ids.fetch();
        let (reply, response) = flume::bounded(1);
        let leaves = request.leaves.len();
        running
            .jobs
            .try_send(Job { id, request, reply })
            .map_err(|err| match err {
                TrySendError::Full(_) => WorkerError::QueueFull,
                TrySendError::Disconnected(_) => WorkerError::Disconnected,
            })?;
        debug!(job = %id, leaves, "proof job queued");
        Ok(PendingProof {
            id,
            response,
            timeout: self.config.response_timeout,
        })
    }

    /// Compute the proof for `leaf` without blocking the calling task.
    ///
    /// Inside a tokio runtime the timeout needs the time driver enabled. Polled
    /// outside any runtime, the wait falls back to [`PendingProof::wait_blocking`].
    pub async fn prove(
        &self,
        leaves: Vec<Hash32>,
        leaf: Hash32,
    ) -> Result<ProofOutcome, WorkerError> {
        self.submit(ProofRequest::new(leaves, leaf))?.wait().await
    }

    /// Blocking counterpart of [`prove`](Self::prove) for threads outside a runtime.
    pub fn prove_blocking(
        &self,
        leaves: Vec<Hash32>,
        leaf: Hash32,
    ) -> Result<ProofOutcome, WorkerError> {
        self.submit(ProofRequest::new(leaves, leaf))?.wait_blocking()
    }

    /// True while every worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| running.joins.iter().all(|join| !join.is_finished()))
    }

    /// Close the queue and wait for the threads to drain it.
    pub fn shutdown(&mut self) {
        if let Some(running) = self.running.take() {
            drop(running.jobs);
            join_handles(running.joins);
            info!("proof worker shut down");
        }
    }

    /// Replace the worker threads with fresh ones.
    ///
    /// Old threads are detached rather than joined, since a stalled thread is the
    /// usual reason to restart. They exit once their current job ends.
    pub fn restart(&mut self) -> Result<(), Error> {
        if let Some(old) = self.running.take() {
            let alive = old.joins.iter().filter(|join| !join.is_finished()).count();
            warn!(detached = alive, "restarting proof worker");
        }
        self.running = Some(start(&self.config)?);
        info!(threads = self.config.threads, "proof worker restarted");
        Ok(())
    }
}

impl Drop for MerkleProofWorker {
    fn drop(&mut self) {
        // Closing the queue is enough; threads finish queued jobs and exit.
        self.running.take();
    }
}

/// Handle to one queued job.
#[derive(Debug)]
pub struct PendingProof {
    id: JobId,
    response: Receiver<ProofResponse>,
    timeout: Duration,
}

impl PendingProof {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub async fn wait(self) -> Result<ProofOutcome, WorkerError> {
        // tokio's timer panics without a runtime; no executor means nothing to yield to.
        if tokio::runtime::Handle::try_current().is_err() {
            return self.wait_blocking();
        }
        match tokio::time::timeout(self.timeout, self.response.recv_async()).await {
            Ok(Ok(response)) => accept(self.id, response),
            Ok(Err(RecvError::Disconnected)) => Err(WorkerError::Disconnected),
            Err(_) => Err(WorkerError::Timeout(self.timeout)),
        }
    }

    pub fn wait_blocking(self) -> Result<ProofOutcome, WorkerError> {
        match self.response.recv_timeout(self.timeout) {
            Ok(response) => accept(self.id, response),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
            Err(RecvTimeoutError::Timeout) => Err(WorkerError::Timeout(self.timeout)),
        }
    }
}

fn accept(expected: JobId, response: ProofResponse) -> Result<ProofOutcome, WorkerError> {
    if response.id != expected {
        return Err(WorkerError::CorrelationMismatch {
            expected,
            got: response.id,
        });
    }
    Ok(response.result?)
}

fn start(config: &WorkerConfig) -> Result<Running, Error> {
    let (jobs, queue) = flume::bounded::<Job>(config.queue_capacity);
    let mut joins = Vec::with_capacity(config.threads);
    for index in 0..config.threads {
        let worker_queue = queue.clone();
        let worker_hasher = config.hasher.clone();
        let mode = config.leaf_mode;
        let join = thread::Builder::new()
            .name(format!("levelguard-proof-{index}"))
            .spawn(move || worker_loop(index, worker_queue, worker_hasher, mode))
            .map_err(|e| Error::Spawn(e.to_string()))?;
        joins.push(join);
    }
    Ok(Running { jobs, joins })
}

fn worker_loop(index: usize, queue: Receiver<Job>, hasher: Arc<dyn NodeHasher>, mode: LeafMode) {
    debug!(worker = index, "proof thread started");
    while let Ok(Job { id, request, reply }) = queue.recv() {
        let mut run = JobRun::new(id);
        let result = run.execute(request, &hasher, mode);
        match &result {
            Ok(outcome) => debug!(job = %id, found = outcome.found(), "proof job done"),
            Err(err) => warn!(job = %id, error = %err, "proof job failed"),
        }
        if reply.send(ProofResponse { id, result }).is_ok() {
            run.responded();
        } else {
            debug!(job = %id, "caller dropped before the response arrived");
        }
    }
    debug!(worker = index, "proof thread stopped");
}

fn join_handles(joins: Vec<JoinHandle<()>>) {
    for handle in joins {
        let _ = handle.join();
    }
}
