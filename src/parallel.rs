//! Fixed-size worker pool for data-parallel kernels over index ranges.

use std::num::NonZeroUsize;

/// A fixed-size pool of worker threads for data-parallel array passes.
///
/// The worker count is captured at construction and never changes. Each
/// dispatch blocks until every kernel has returned; if a kernel panics, the
/// first panic is resumed on the caller after all in-flight kernels finish,
/// so the pass is all-or-nothing from the caller's perspective.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with an explicit worker count (at least 1).
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .expect("worker pool construction failed");
        Self { pool, workers }
    }

    /// Create a pool sized to the available hardware parallelism.
    pub fn with_hardware_threads() -> Self {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::new(workers)
    }

    /// Number of worker threads in this pool.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `kernel` over `data`, one contiguous chunk per worker.
    ///
    /// Worker `j` of `t` receives `data[n*j/t .. n*(j+1)/t]`; chunk sizes
    /// differ by at most one element and empty chunks are skipped. The kernel
    /// gets the chunk's start offset into `data` alongside the exclusive
    /// mutable sub-slice, so peers can never write each other's cells.
    pub fn for_each_chunk_mut<T, K>(&self, data: &mut [T], kernel: K)
    where
        T: Send,
        K: Fn(usize, &mut [T]) + Sync,
    {
        let n = data.len();
        let t = self.workers;
        let kernel = &kernel;

        self.pool.scope(|scope| {
            let mut rest = data;
            let mut lo = 0;
            for j in 0..t {
                let hi = n * (j + 1) / t;
                if hi == lo {
                    continue;
                }
                let (chunk, tail) = rest.split_at_mut(hi - lo);
                rest = tail;
                let offset = lo;
                lo = hi;
                scope.spawn(move |_| kernel(offset, chunk));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// The partition rule, replicated for inspection.
    fn chunk_bounds(n: usize, t: usize) -> Vec<(usize, usize)> {
        (0..t)
            .map(|j| (n * j / t, n * (j + 1) / t))
            .filter(|(lo, hi)| lo != hi)
            .collect()
    }

    #[test]
    fn test_partition_covers_range() {
        for &(n, t) in &[(0, 4), (1, 4), (7, 3), (100, 8), (13, 16)] {
            let bounds = chunk_bounds(n, t);
            let mut expected = 0;
            for &(lo, hi) in &bounds {
                assert_eq!(lo, expected, "chunks must be contiguous");
                assert!(hi > lo, "empty chunks must be skipped");
                expected = hi;
            }
            assert_eq!(expected, n, "chunks must cover [0, n)");
        }
    }

    #[test]
    fn test_partition_is_balanced() {
        let bounds = chunk_bounds(103, 8);
        let sizes: Vec<usize> = bounds.iter().map(|(lo, hi)| hi - lo).collect();
        let min = *sizes.iter().min().unwrap();
        let max = *sizes.iter().max().unwrap();
        assert!(max - min <= 1, "chunk sizes differ by at most one");
    }

    #[test]
    fn test_kernel_sees_every_element_once() {
        let pool = WorkerPool::new(4);
        let mut data = vec![0u64; 1000];
        pool.for_each_chunk_mut(&mut data, |lo, chunk| {
            for (k, x) in chunk.iter_mut().enumerate() {
                *x += (lo + k) as u64;
            }
        });
        for (i, &x) in data.iter().enumerate() {
            assert_eq!(x, i as u64);
        }
    }

    #[test]
    fn test_dispatch_blocks_until_done() {
        let pool = WorkerPool::new(8);
        let counter = AtomicUsize::new(0);
        let mut data = vec![(); 256];
        pool.for_each_chunk_mut(&mut data, |_, chunk| {
            counter.fetch_add(chunk.len(), Ordering::SeqCst);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 256);
    }

    #[test]
    fn test_empty_input() {
        let pool = WorkerPool::new(4);
        let mut data: Vec<u32> = Vec::new();
        pool.for_each_chunk_mut(&mut data, |_, _| {
            panic!("no kernel should run for empty input");
        });
    }

    #[test]
    #[should_panic(expected = "kernel failure")]
    fn test_kernel_panic_propagates() {
        let pool = WorkerPool::new(4);
        let mut data = vec![0u8; 64];
        pool.for_each_chunk_mut(&mut data, |lo, _| {
            if lo == 0 {
                panic!("kernel failure");
            }
        });
    }
}
