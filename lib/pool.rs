//! Simple scoped thread pool for index-parallel phases.
//!
//! Work is split into contiguous chunks of indices that are handed out through
//! a single-producer, multiple-consumer channel, so that the load between
//! threads balances itself. Workers borrow their inputs for the duration of a
//! single call and are joined before it returns.

use std::ops::Range;
use crossbeam::{ channel, thread };
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    /// Returned when a worker thread panics.
    #[error("error in worker pool: a worker thread panicked")]
    WorkerPanicked,

    /// Returned when work can't be enqueued.
    #[error("error in worker pool: failed to enqueue work: closed sender channel")]
    ClosedSenderChannel,
}
use PoolError::*;
pub type PoolResult<T> = Result<T, PoolError>;

/// A pool of `nthreads` workers, spawned anew for each call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkerPool {
    nthreads: usize,
}

impl WorkerPool {
    /// Create a new pool of `nthreads` threads (at least one).
    pub fn new(nthreads: usize) -> Self { Self { nthreads: nthreads.max(1) } }

    /// Create a new pool with the number of threads equal to the number of
    /// logical CPU cores available in the current system.
    pub fn new_cpus() -> Self { Self::new(num_cpus::get()) }

    /// Create a new pool with the number of threads equal to the number of
    /// physical CPU cores available in the current system.
    pub fn new_physical() -> Self { Self::new(num_cpus::get_physical()) }

    pub fn nthreads(&self) -> usize { self.nthreads }

    /// Evaluate `f` on every index in `0..n`, returning the results in index
    /// order.
    pub fn map<R, F>(&self, n: usize, chunk: usize, f: F) -> PoolResult<Vec<R>>
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        let chunk = chunk.max(1);
        if self.nthreads == 1 || n <= chunk {
            return Ok((0..n).map(f).collect());
        }
        let (tx_in, rx_in) = channel::unbounded::<Range<usize>>();
        let (tx_out, rx_out) = channel::unbounded::<(usize, Vec<R>)>();
        for start in (0..n).step_by(chunk) {
            tx_in.send(start..(start + chunk).min(n))
                .map_err(|_| ClosedSenderChannel)?;
        }
        drop(tx_in);
        let f = &f;
        let mut parts: Vec<(usize, Vec<R>)>
            = thread::scope(|s| {
                for _ in 0..self.nthreads {
                    let worker_receiver = rx_in.clone();
                    let worker_sender = tx_out.clone();
                    s.spawn(move |_| {
                        for range in worker_receiver.iter() {
                            let start = range.start;
                            let out: Vec<R> = range.map(f).collect();
                            if worker_sender.send((start, out)).is_err() {
                                break;
                            }
                        }
                    });
                }
                drop(tx_out);
                rx_out.iter().collect()
            })
            .map_err(|_| WorkerPanicked)?;
        parts.sort_by_key(|(start, _)| *start);
        Ok(parts.into_iter().flat_map(|(_, out)| out).collect())
    }

    /// Set `out[i] = f(i)` for every index. Each slot is written by exactly
    /// one worker.
    pub fn fill<R, F>(&self, out: &mut [R], chunk: usize, f: F) -> PoolResult<()>
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        let chunk = chunk.max(1);
        if self.nthreads == 1 || out.len() <= chunk {
            out.iter_mut().enumerate().for_each(|(i, o)| { *o = f(i); });
            return Ok(());
        }
        let (tx, rx) = channel::unbounded::<(usize, &mut [R])>();
        for (k, part) in out.chunks_mut(chunk).enumerate() {
            tx.send((k * chunk, part)).map_err(|_| ClosedSenderChannel)?;
        }
        drop(tx);
        let f = &f;
        thread::scope(|s| {
            for _ in 0..self.nthreads {
                let worker_receiver = rx.clone();
                s.spawn(move |_| {
                    for (start, part) in worker_receiver.iter() {
                        part.iter_mut().enumerate()
                            .for_each(|(k, o)| { *o = f(start + k); });
                    }
                });
            }
        })
        .map_err(|_| WorkerPanicked)
    }
}

impl Default for WorkerPool {
    fn default() -> Self { Self::new_cpus() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_preserves_order() {
        let pool = WorkerPool::new(4);
        let out = pool.map(1000, 7, |i| i * i).unwrap();
        assert_eq!(out, (0..1000).map(|i| i * i).collect::<Vec<usize>>());
    }

    #[test]
    fn fill_writes_every_slot() {
        let pool = WorkerPool::new(3);
        let mut out = vec![0.0; 257];
        pool.fill(&mut out, 10, |i| i as f64 * 0.5).unwrap();
        assert!(out.iter().enumerate().all(|(i, x)| *x == i as f64 * 0.5));
    }

    #[test]
    fn single_thread_inline() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.nthreads(), 1);
        assert_eq!(pool.map(5, 2, |i| i + 1).unwrap(), vec![1, 2, 3, 4, 5]);
    }
}
