//! A fixed-width pool of async tasks with settle-all semantics.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Runs at most `limit` jobs at once.
///
/// Every job's result is kept, whether it returned or panicked, so one bad
/// job never takes its siblings down. Dropping the pool aborts whatever is
/// still queued or running.
#[derive(Debug)]
pub struct BoundedPool<T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<T>,
    limit: usize,
}

impl<T: Send + 'static> BoundedPool<T> {
    /// Create a pool admitting `limit` concurrent jobs (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            tasks: JoinSet::new(),
            limit,
        }
    }

    /// Maximum number of jobs running at once.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Jobs not yet collected.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether every job has been collected.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Queue a job. It starts once a permit is free.
    pub fn spawn<F>(&mut self, job: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            // The semaphore is never closed; acquisition can only wait.
            let _permit = permits.acquire_owned().await;
            job.await
        });
    }

    /// The next job to finish, in completion order.
    pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
        self.tasks.join_next().await
    }

    /// Wait for every job and return all results, in completion order.
    pub async fn settle_all(mut self) -> Vec<Result<T, JoinError>> {
        let mut settled = Vec::with_capacity(self.tasks.len());
        while let Some(result) = self.tasks.join_next().await {
            settled.push(result);
        }
        settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut pool = BoundedPool::new(3);

        for n in 0..10usize {
            let (running, peak) = (running.clone(), peak.clone());
            pool.spawn(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                n
            });
        }

        let mut done: Vec<usize> = pool
            .settle_all()
            .await
            .into_iter()
            .map(|r| r.expect("job"))
            .collect();
        done.sort_unstable();

        assert_eq!(done, (0..10).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_abort_siblings() {
        let mut pool = BoundedPool::new(2);
        pool.spawn(async { 1 });
        pool.spawn(async { panic!("decoder exploded") });
        pool.spawn(async { 3 });

        let settled = pool.settle_all().await;
        let ok: Vec<i32> = settled.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
        assert_eq!(ok.len(), 2);
        assert_eq!(settled.iter().filter(|r| r.is_err()).count(), 1);
    }

    #[tokio::test]
    async fn test_dropping_pool_aborts_running_jobs() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut pool = BoundedPool::new(1);
        pool.spawn(async move {
            let _held = tx;
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;

        drop(pool);
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        let pool: BoundedPool<()> = BoundedPool::new(0);
        assert_eq!(pool.limit(), 1);
        assert!(pool.is_empty());
    }
}
