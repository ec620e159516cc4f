// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::BoxFuture;
use crate::error::{EtaError, Result};
use log::{debug, error};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Opaque unit of work run by the pool.
pub type Task = BoxFuture<'static, ()>;

#[derive(Clone, Default)]
struct WorkerCounters {
    inflight: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    panicked: Arc<AtomicUsize>,
}

struct WorkerHandle {
    id: usize,
    counters: WorkerCounters,
}

#[derive(Debug, Serialize)]
pub struct WorkerMetrics {
    pub worker_id: usize,
    pub inflight: usize,
    pub completed: usize,
    pub panicked: usize,
}

impl WorkerHandle {
    fn metrics(&self) -> WorkerMetrics {
        WorkerMetrics {
            worker_id: self.id,
            inflight: self.counters.inflight.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }
}

/// Fixed set of workers draining one shared, unbounded task queue.
///
/// At most `capacity` tasks run at once no matter how many are queued.
/// Dropping the pool (or calling [`WorkerPool::shutdown`]) closes the queue;
/// workers finish everything already submitted before exiting.
pub struct WorkerPool {
    tx: StdMutex<Option<mpsc::UnboundedSender<Task>>>,
    queued: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    peak_running: Arc<AtomicUsize>,
    workers: Vec<WorkerHandle>,
    joins: StdMutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `capacity` workers on the current tokio runtime.
    pub fn new(capacity: usize) -> Result<Arc<Self>> {
        if capacity == 0 {
            return Err(EtaError::InvalidConfig(
                "worker pool capacity must be >= 1".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel::<Task>();
        let rx = Arc::new(Mutex::new(rx));
        let queued = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicUsize::new(0));
        let peak_running = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(capacity);
        let mut joins = Vec::with_capacity(capacity);
        for id in 0..capacity {
            let counters = WorkerCounters::default();
            joins.push(tokio::spawn(run_worker(
                id,
                rx.clone(),
                counters.clone(),
                queued.clone(),
                running.clone(),
                peak_running.clone(),
            )));
            workers.push(WorkerHandle { id, counters });
        }
        debug!("worker pool started with {} workers", capacity);

        Ok(Arc::new(Self {
            tx: StdMutex::new(Some(tx)),
            queued,
            running,
            peak_running,
            workers,
            joins: StdMutex::new(joins),
        }))
    }

    pub fn capacity(&self) -> usize {
        self.workers.len()
    }

    /// Enqueues a zero-argument task and returns immediately.
    pub fn submit<F, Fut>(&self, task: F) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.submit_task(Box::pin(async move { task().await }))
    }

    pub fn submit_task(&self, task: Task) -> Result<()> {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        let tx = guard.as_ref().ok_or(EtaError::PoolClosed)?;
        self.queued.fetch_add(1, Ordering::SeqCst);
        if tx.send(task).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(EtaError::PoolClosed);
        }
        Ok(())
    }

    /// Closes the queue and waits until every queued task has run.
    pub async fn shutdown(&self) {
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        let joins = std::mem::take(&mut *self.joins.lock().unwrap_or_else(|e| e.into_inner()));
        for join in joins {
            if let Err(e) = join.await {
                error!("worker exited abnormally: {:?}", e);
            }
        }
        debug!("worker pool shut down");
    }

    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Highest number of tasks ever observed running at once.
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }

    pub fn worker_metrics(&self) -> Vec<WorkerMetrics> {
        self.workers.iter().map(|w| w.metrics()).collect()
    }
}

async fn run_worker(
    id: usize,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>,
    counters: WorkerCounters,
    queued: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    peak_running: Arc<AtomicUsize>,
) {
    loop {
        let task = rx.lock().await.recv().await;
        let Some(task) = task else {
            debug!("worker {} queue closed, exiting", id);
            break;
        };
        queued.fetch_sub(1, Ordering::SeqCst);
        counters.inflight.fetch_add(1, Ordering::Relaxed);
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        peak_running.fetch_max(now, Ordering::SeqCst);

        // A panicking task surfaces as a JoinError; the worker keeps going.
        match tokio::spawn(task).await {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!("worker {} task failed: {:?}", id, e);
                counters.panicked.fetch_add(1, Ordering::Relaxed);
            }
        }

        running.fetch_sub(1, Ordering::SeqCst);
        counters.inflight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[test]
    fn rejects_zero_capacity() {
        assert!(matches!(WorkerPool::new(0), Err(EtaError::InvalidConfig(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn runs_every_task_once_within_capacity() {
        for capacity in [1, 2, 5] {
            for count in [0usize, 1, 7, 40] {
                let pool = WorkerPool::new(capacity).unwrap();
                let hits = Arc::new(AtomicUsize::new(0));
                for _ in 0..count {
                    let hits = hits.clone();
                    pool.submit(move || async move {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        hits.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                }
                pool.shutdown().await;

                assert_eq!(hits.load(Ordering::SeqCst), count);
                assert!(pool.peak_running() <= capacity);
                let completed: usize = pool.worker_metrics().iter().map(|m| m.completed).sum();
                assert_eq!(completed, count);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn saturates_capacity_under_load() {
        let pool = WorkerPool::new(3).unwrap();
        for _ in 0..12 {
            pool.submit(|| tokio::time::sleep(Duration::from_millis(20))).unwrap();
        }
        pool.shutdown().await;
        assert_eq!(pool.peak_running(), 3);
    }

    #[tokio::test]
    async fn submit_never_blocks_on_busy_workers() {
        let pool = WorkerPool::new(1).unwrap();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        pool.submit(move || async move {
            let _ = release_rx.await;
        })
        .unwrap();
        for _ in 0..1000 {
            pool.submit(|| async {}).unwrap();
        }
        assert!(pool.queued() >= 1000);
        release_tx.send(()).unwrap();
        pool.shutdown().await;
        assert_eq!(pool.queued(), 0);
    }

    #[tokio::test]
    async fn panicking_task_does_not_kill_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = oneshot::channel();
        pool.submit(|| async {
            if true {
                panic!("boom");
            }
        })
        .unwrap();
        pool.submit(move || async move {
            let _ = tx.send(42);
        })
        .unwrap();
        assert_eq!(rx.await.unwrap(), 42);
        pool.shutdown().await;

        let metrics = pool.worker_metrics();
        assert_eq!(metrics[0].panicked, 1);
        assert_eq!(metrics[0].completed, 1);
    }

    #[tokio::test]
    async fn submit_after_shutdown_fails() {
        let pool = WorkerPool::new(2).unwrap();
        pool.shutdown().await;
        assert!(matches!(pool.submit(|| async {}), Err(EtaError::PoolClosed)));
    }

    #[tokio::test]
    async fn metrics_serialize_per_worker() {
        let pool = WorkerPool::new(2).unwrap();
        let json = serde_json::to_value(pool.worker_metrics()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[1]["worker_id"], 1);
    }
}
