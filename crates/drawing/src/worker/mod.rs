//! Fixed-size pool of raster worker threads
//!
//! Each worker owns a job channel and takes one task at a time. Idle workers
//! announce themselves on a shared queue; `dispatch` waits on that queue, so
//! a busy worker is never handed a second task. Task inputs and outputs are
//! moved across the channel, nothing is shared.

mod task;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info};

pub use task::{RasterOutput, RasterTask, RasterTaskError};

/// Error type for worker pool operations
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker {index} panicked while running a task: {message}")]
    TaskPanicked { index: usize, message: String },
    #[error("Worker {index} disconnected")]
    Disconnected { index: usize },
    #[error("Worker pool is shut down")]
    PoolClosed,
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A unit of work that can be moved to a worker thread
pub trait WorkerTask: Send + 'static {
    type Output: Send + 'static;

    fn run(self) -> Self::Output;

    /// Short name for logs
    fn label(&self) -> &'static str;
}

struct Job<T: WorkerTask> {
    task: T,
    reply: oneshot::Sender<Result<T::Output, WorkerError>>,
}

struct Worker<T: WorkerTask> {
    jobs: Sender<Job<T>>,
    thread: Option<JoinHandle<()>>,
}

/// Pool of stateless workers sized to the host's parallelism
pub struct WorkerPool<T: WorkerTask> {
    workers: Vec<Worker<T>>,
    idle: Mutex<mpsc::UnboundedReceiver<usize>>,
}

impl<T: WorkerTask> WorkerPool<T> {
    /// Spawn `size` workers (at least one)
    pub fn new(size: usize) -> Result<Self, WorkerError> {
        let size = size.max(1);
        let (idle_tx, idle_rx) = mpsc::unbounded_channel();
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            let (jobs_tx, jobs_rx) = unbounded::<Job<T>>();
            let idle_tx = idle_tx.clone();
            let thread = thread::Builder::new()
                .name(format!("raster-worker-{index}"))
                .spawn(move || worker_loop(index, jobs_rx, idle_tx))?;
            workers.push(Worker {
                jobs: jobs_tx,
                thread: Some(thread),
            });
        }

        info!("started worker pool with {} workers", size);
        Ok(Self {
            workers,
            idle: Mutex::new(idle_rx),
        })
    }

    /// Pool with one worker per available CPU
    pub fn with_available_parallelism() -> Result<Self, WorkerError> {
        let size = thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(size)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Run a task on the next idle worker.
    ///
    /// Waits until a worker is free. A panic inside the task fails only this
    /// call; the worker stays in the pool.
    pub async fn dispatch(&self, task: T) -> Result<T::Output, WorkerError> {
        let index = {
            let mut idle = self.idle.lock().await;
            idle.recv().await.ok_or(WorkerError::PoolClosed)?
        };
        let worker = self.workers.get(index).ok_or(WorkerError::PoolClosed)?;

        debug!("dispatching {} to worker {}", task.label(), index);
        let (reply, response) = oneshot::channel();
        worker
            .jobs
            .send(Job { task, reply })
            .map_err(|_| WorkerError::Disconnected { index })?;

        response
            .await
            .map_err(|_| WorkerError::Disconnected { index })?
    }
}

impl<T: WorkerTask> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        // Closing each job channel ends that worker's loop
        let threads: Vec<JoinHandle<()>> = self
            .workers
            .drain(..)
            .filter_map(|mut worker| worker.thread.take())
            .collect();
        for thread in threads {
            if thread.join().is_err() {
                error!("worker thread exited abnormally");
            }
        }
    }
}

fn worker_loop<T: WorkerTask>(
    index: usize,
    jobs: Receiver<Job<T>>,
    idle: mpsc::UnboundedSender<usize>,
) {
    if idle.send(index).is_err() {
        return;
    }
    for Job { task, reply } in jobs.iter() {
        let label = task.label();
        let result = panic::catch_unwind(AssertUnwindSafe(move || task.run())).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            error!("worker {} panicked running {}: {}", index, label, message);
            WorkerError::TaskPanicked { index, message }
        });

        // Back in the idle queue before the caller sees the result
        if idle.send(index).is_err() {
            break;
        }
        // The caller may have stopped waiting; the result is simply dropped
        let _ = reply.send(result);
    }
    debug!("worker {} stopped", index);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    enum TestTask {
        Double(u32),
        Panic,
        Sleep(Arc<AtomicUsize>, Arc<AtomicUsize>),
    }

    impl WorkerTask for TestTask {
        type Output = u32;

        fn run(self) -> u32 {
            match self {
                TestTask::Double(n) => n * 2,
                TestTask::Panic => panic!("task failed"),
                TestTask::Sleep(running, peak) => {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    0
                }
            }
        }

        fn label(&self) -> &'static str {
            "test"
        }
    }

    #[tokio::test]
    async fn test_dispatch_returns_output() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.dispatch(TestTask::Double(21)).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_panic_does_not_wedge_pool() {
        let pool = WorkerPool::new(1).unwrap();

        let err = pool.dispatch(TestTask::Panic).await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::TaskPanicked { index: 0, ref message } if message == "task failed"
        ));

        // The single worker is still usable
        assert_eq!(pool.dispatch(TestTask::Double(4)).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_one_task_per_worker() {
        let pool = WorkerPool::new(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..6).map(|_| pool.dispatch(TestTask::Sleep(running.clone(), peak.clone())));
        let results = futures_util::future::join_all(tasks).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_zero_size_pool_has_one_worker() {
        let pool = WorkerPool::<TestTask>::new(0).unwrap();
        assert_eq!(pool.size(), 1);
    }
}
