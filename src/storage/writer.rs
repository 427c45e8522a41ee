//! Ordered, fire-and-forget writes.
//!
//! Callers enqueue whole values and move on. One drain task applies them in
//! enqueue order, so a slow write never lands after a newer one. Writes to
//! the same key that are waiting together collapse into the newest.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::SharedStorage;

enum Job {
    Set { key: String, value: Value },
    Flush(oneshot::Sender<()>),
}

/// Clones share one queue and one drain task.
#[derive(Clone)]
pub struct StorageWriter {
    storage: SharedStorage,
    jobs: mpsc::UnboundedSender<Job>,
    /// The queue's receiving end until the drain task takes it.
    idle: Arc<Mutex<Option<mpsc::UnboundedReceiver<Job>>>>,
}

impl StorageWriter {
    pub fn new(storage: SharedStorage) -> Self {
        let (jobs, receiver) = mpsc::unbounded_channel();
        StorageWriter {
            storage,
            jobs,
            idle: Arc::new(Mutex::new(Some(receiver))),
        }
    }

    /// Queues a write and returns at once. Outside a tokio runtime the write
    /// waits in the queue until the writer is next used inside one.
    pub fn set(&self, key: &str, value: Value) {
        let job = Job::Set {
            key: key.to_string(),
            value,
        };
        if self.jobs.send(job).is_err() {
            warn!(%key, "storage writer stopped, write dropped");
            return;
        }
        self.ensure_started();
    }

    /// Resolves once every write queued before this call has been applied
    /// or has failed.
    pub async fn flush(&self) {
        if !self.ensure_started() {
            return;
        }
        let (done, finished) = oneshot::channel();
        if self.jobs.send(Job::Flush(done)).is_ok() {
            let _ = finished.await;
        }
    }

    /// Spawns the drain task on the current runtime unless it already runs.
    /// Returns whether it is running.
    fn ensure_started(&self) -> bool {
        let Ok(mut idle) = self.idle.lock() else {
            warn!("storage writer lock poisoned");
            return false;
        };
        let Some(receiver) = idle.take() else {
            return true;
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(drain(Arc::clone(&self.storage), receiver));
                debug!("storage writer started");
                true
            }
            Err(_) => {
                *idle = Some(receiver);
                false
            }
        }
    }
}

async fn drain(storage: SharedStorage, mut jobs: mpsc::UnboundedReceiver<Job>) {
    while let Some(first) = jobs.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = jobs.try_recv() {
            batch.push(next);
        }
        let skip = superseded(&batch);
        for (job, skip) in batch.into_iter().zip(skip) {
            match job {
                Job::Set { key, .. } if skip => debug!(%key, "write superseded while queued"),
                Job::Set { key, value } => match storage.set(&key, value).await {
                    Ok(()) => debug!(%key, "storage write applied"),
                    Err(err) => warn!(error = %err, %key, "storage write failed"),
                },
                Job::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }
    debug!("storage writer finished");
}

/// A write is superseded by a later write to the same key with no flush
/// between them.
fn superseded(batch: &[Job]) -> Vec<bool> {
    batch
        .iter()
        .enumerate()
        .map(|(i, job)| match job {
            Job::Set { key, .. } => batch[i + 1..]
                .iter()
                .take_while(|later| !matches!(later, Job::Flush(_)))
                .any(|later| matches!(later, Job::Set { key: other, .. } if other == key)),
            Job::Flush(_) => false,
        })
        .collect()
}
