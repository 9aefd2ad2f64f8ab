//! Worker pool for concurrent fan-out with a join barrier.
//!
//! Spawns N persistent tokio tasks that pull work items from a bounded
//! async-channel. Results are sent to an unbounded channel for consumption
//! by the caller, either one at a time or all at once via
//! [`WorkerPool::join`].
//!
//! `async-channel`'s `Receiver` is `Clone`, so each worker gets its own
//! handle and no worker can starve the others while blocked on `recv()`.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Hard safety-net timeout per work item. Set well above the per-provider
/// timeouts so it only fires when those somehow fail.
const SAFETY_TIMEOUT: Duration = Duration::from_secs(120);

/// A pool of worker tasks that process items concurrently.
///
/// - Natural backpressure when all workers are busy
/// - Clean shutdown by dropping the work sender
/// - A panicking or hung item costs one result, never the pool
///
/// ```ignore
/// let pool = WorkerPool::start(4, providers, |p| async move { p.count(&title).await });
/// let results = pool.join().await;
/// ```
pub struct WorkerPool<R: Send + 'static> {
    result_rx: mpsc::UnboundedReceiver<R>,
    _handles: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> WorkerPool<R> {
    /// Spawn `n` workers (at least one), submit all items, and return a pool
    /// for receiving results.
    ///
    /// Items that panic or exceed the safety timeout produce no result; the
    /// worker moves on to the next item.
    pub fn start<W, F, Fut>(n: usize, items: Vec<W>, process_fn: F) -> Self
    where
        W: Send + 'static,
        F: Fn(W) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let n = n.max(1);
        let (work_tx, work_rx) = async_channel::bounded::<W>(n);
        let (result_tx, result_rx) = mpsc::unbounded_channel::<R>();
        let process_fn = Arc::new(process_fn);

        let handles: Vec<JoinHandle<()>> = (0..n)
            .map(|_| {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let process_fn = process_fn.clone();
                tokio::spawn(async move {
                    while let Ok(item) = work_rx.recv().await {
                        let fut = AssertUnwindSafe(process_fn(item)).catch_unwind();
                        match tokio::time::timeout(SAFETY_TIMEOUT, fut).await {
                            Ok(Ok(r)) => {
                                if result_tx.send(r).is_err() {
                                    break; // Receiver dropped
                                }
                            }
                            Ok(Err(_)) => {
                                log::warn!("Worker pool: item panicked, skipping");
                            }
                            Err(_) => {
                                log::debug!(
                                    "Worker pool: item timed out after {}s, skipping",
                                    SAFETY_TIMEOUT.as_secs()
                                );
                            }
                        }
                    }
                })
            })
            .collect();

        // Drop our copy of result_tx so the channel closes when all workers finish
        drop(result_tx);

        tokio::spawn(async move {
            for item in items {
                if work_tx.send(item).await.is_err() {
                    break;
                }
            }
            // work_tx dropped here -> channel closes -> workers drain and stop
        });

        Self {
            result_rx,
            _handles: handles,
        }
    }

    /// Receive the next result. Returns `None` when all items have been
    /// processed and all workers have shut down.
    pub async fn recv(&mut self) -> Option<R> {
        self.result_rx.recv().await
    }

    /// Wait for every item to finish and return the results in completion
    /// order.
    pub async fn join(mut self) -> Vec<R> {
        let mut results = Vec::new();
        while let Some(r) = self.recv().await {
            results.push(r);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_collects_every_result() {
        let pool = WorkerPool::start(3, (1..=10).collect(), |n: u32| async move { n * 2 });
        let mut results = pool.join().await;
        results.sort();
        assert_eq!(results, (1..=10).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn panicking_item_does_not_abort_join() {
        let pool = WorkerPool::start(2, vec![1u32, 2, 3], |n| async move {
            if n == 2 {
                panic!("boom");
            }
            n
        });
        let mut results = pool.join().await;
        results.sort();
        assert_eq!(results, vec![1, 3]);
    }

    #[tokio::test]
    async fn zero_workers_still_runs() {
        let pool = WorkerPool::start(0, vec![5u32], |n| async move { n });
        assert_eq!(pool.join().await, vec![5]);
    }
}
