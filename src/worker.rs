//! Scoped-thread worker pool: partitions a unit of work into disjoint chunks,
//! runs one scoped thread per chunk (the "Threaded" phase), and lets the
//! caller reduce the per-chunk results serially (the "AfterThreaded" phase).
//!
//! No additional crate dependency: `std::thread::scope` is sufficient for
//! the partition-own-shadow-state-then-serially-reduce shape every
//! concurrent component in this crate needs.

use crate::error::{ReconError, Result};

/// Number of worker threads to use, plus the historical FDK thread cap.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    thread_count: usize,
}

impl WorkerPool {
    /// An unrestricted worker pool sized to `thread_count`, the host default
    /// used everywhere outside the FDK front-end (i.e. for PPBin/PPBP).
    pub fn new(thread_count: usize) -> Self {
        WorkerPool { thread_count: thread_count.max(1) }
    }

    /// The historical FDK front-end cap: `min(8, available_parallelism)`
    /// (`original_source/applications/pctfdk/pctfdk.cxx`).
    pub fn default_for_fdk() -> Self {
        let available = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        WorkerPool::new(available.min(crate::constants::FDK_THREAD_CAP))
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Splits `len` items into `self.thread_count` contiguous, disjoint
    /// ranges (the last range absorbs the remainder).
    pub fn partition(&self, len: usize) -> Vec<std::ops::Range<usize>> {
        if len == 0 {
            return Vec::new();
        }
        let n = self.thread_count.min(len).max(1);
        let base = len / n;
        let rem = len % n;
        let mut ranges = Vec::with_capacity(n);
        let mut start = 0;
        for i in 0..n {
            let extra = if i < rem { 1 } else { 0 };
            let end = start + base + extra;
            ranges.push(start..end);
            start = end;
        }
        ranges
    }

    /// Runs `work` once per chunk of `items`, each chunk on its own scoped
    /// thread, and returns the per-chunk results in order once all threads
    /// join. The first error raised by any worker is propagated to the
    /// caller after the join point.
    pub fn map_chunks<T, R, F>(&self, items: &[T], work: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&[T], usize) -> Result<R> + Sync,
    {
        let ranges = self.partition(items.len());
        std::thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .iter()
                .enumerate()
                .map(|(chunk_id, range)| {
                    let chunk = &items[range.clone()];
                    let work = &work;
                    scope.spawn(move || work(chunk, chunk_id))
                })
                .collect();

            let mut results = Vec::with_capacity(handles.len());
            let mut first_error: Option<ReconError> = None;
            for h in handles {
                match h.join() {
                    Ok(Ok(r)) => results.push(r),
                    Ok(Err(e)) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                    Err(_) => {
                        if first_error.is_none() {
                            first_error = Some(ReconError::numerical("worker thread panicked"));
                        }
                    }
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(results),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_covers_all_items_disjointly() {
        let pool = WorkerPool::new(4);
        let ranges = pool.partition(10);
        let mut covered = vec![false; 10];
        for r in &ranges {
            for i in r.clone() {
                assert!(!covered[i], "index {i} covered twice");
                covered[i] = true;
            }
        }
        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn map_chunks_propagates_first_error() {
        let pool = WorkerPool::new(4);
        let items: Vec<i32> = (0..8).collect();
        let result: Result<Vec<i32>> = pool.map_chunks(&items, |chunk, id| {
            if id == 2 {
                Err(ReconError::numerical("boom"))
            } else {
                Ok(chunk.iter().sum())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn default_for_fdk_never_exceeds_cap() {
        let pool = WorkerPool::default_for_fdk();
        assert!(pool.thread_count() <= crate::constants::FDK_THREAD_CAP);
    }
}
