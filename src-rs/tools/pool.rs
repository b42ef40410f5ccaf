use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tracing::{debug, warn};

type Job = BoxFuture<'static, ()>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Fixed number of tokio workers draining one FIFO queue.
///
/// Must be created inside a tokio runtime. Clones share the same workers.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(AsyncMutex::new(receiver));

        for worker in 0..size {
            let receiver = receiver.clone();
            tokio::spawn(async move {
                loop {
                    let job = { receiver.lock().await.recv().await };
                    match job {
                        Some(job) => job.await,
                        None => break,
                    }
                }
                debug!(worker, "worker stopped");
            });
        }

        Self {
            inner: Arc::new(PoolInner {
                sender: Mutex::new(Some(sender)),
                size,
            }),
        }
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Queues `task` and waits for its output.
    pub async fn run<F, T>(&self, task: F) -> Result<T, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = async move {
            let outcome = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .map_err(|payload| PoolError::Panicked(panic_message(payload)));
            let _ = tx.send(outcome);
        }
        .boxed();

        {
            let guard = self.inner.sender.lock().map_err(|_| PoolError::Closed)?;
            let sender = guard.as_ref().ok_or(PoolError::Closed)?;
            sender.send(job).map_err(|_| PoolError::Closed)?;
        }

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(error = %err, "pooled task failed");
                Err(err)
            }
            Err(_) => Err(PoolError::Closed),
        }
    }

    /// Stops accepting work. Queued jobs still run.
    pub fn close(&self) {
        if let Ok(mut guard) = self.inner.sender.lock() {
            guard.take();
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
