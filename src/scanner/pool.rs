//! Bounded fan-out/fan-in over tokio tasks
//!
//! Each submitted future owns the identity of the work it performs (the
//! endpoint or the candidate) and hands it back inside its output, so results
//! are attributed correctly whatever order the tasks finish in.

use crate::scanner::ScanProgress;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Results gathered by one [`WorkerPool::run`]
#[derive(Debug)]
pub struct PoolOutput<T> {
    pub results: Vec<T>,
    pub submitted: usize,
    pub interrupted: bool,
}

/// Runs at most `limit` tasks at once on the multi-threaded runtime
#[derive(Debug, Clone)]
pub struct WorkerPool {
    limit: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(limit: usize, cancel: CancellationToken) -> Self {
        Self {
            limit: limit.max(1),
            cancel,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Spawn `task(item)` for every item, never more than `limit` in flight.
    ///
    /// Cancellation stops submission, aborts whatever is still running and
    /// returns the results collected so far with `interrupted` set.
    pub async fn run<I, F, Fut, T>(&self, items: I, progress: &ScanProgress, task: F) -> PoolOutput<T>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut tasks = JoinSet::new();
        let mut output = PoolOutput {
            results: Vec::new(),
            submitted: 0,
            interrupted: false,
        };

        for item in items {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    output.interrupted = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let work = task(item);
            tasks.spawn(async move {
                let _permit = permit;
                work.await
            });
            output.submitted += 1;

            while let Some(joined) = tasks.try_join_next() {
                collect(joined, &mut output.results, progress);
            }
        }

        while !output.interrupted {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => output.interrupted = true,
                joined = tasks.join_next() => match joined {
                    Some(joined) => collect(joined, &mut output.results, progress),
                    None => break,
                },
            }
        }

        if output.interrupted {
            log::debug!("Pool cancelled with {} task(s) in flight", tasks.len());
            tasks.abort_all();
            // Tasks that finished before the abort landed still report Ok
            while let Some(joined) = tasks.join_next().await {
                if let Ok(value) = joined {
                    progress.record();
                    output.results.push(value);
                }
            }
        }

        output
    }
}

fn collect<T>(joined: Result<T, JoinError>, results: &mut Vec<T>, progress: &ScanProgress) {
    match joined {
        Ok(value) => {
            progress.record();
            results.push(value);
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
            log::warn!("Worker task failed: {}", e);
            progress.record();
        }
    }
}
