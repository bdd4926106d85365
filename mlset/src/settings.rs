//! Tuning parameters shared by classification and compression
use std::sync::Arc;

use crate::Error;

/// Thread pool used for per-element and per-descriptor passes
///
/// Most users will use the global Rayon pool, but it's possible to provide
/// your own as well.  Without the `parallel` feature, work always runs on the
/// calling thread.
#[derive(Debug)]
pub enum ThreadPool {
    /// User-provided pool
    #[cfg(feature = "parallel")]
    Custom(rayon::ThreadPool),
    /// Global Rayon pool
    Global,
}

impl ThreadPool {
    /// Builds a custom pool with the given number of workers
    ///
    /// Without the `parallel` feature, this returns [`ThreadPool::Global`].
    pub fn new(threads: usize) -> Result<Self, Error> {
        #[cfg(feature = "parallel")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))?;
            Ok(ThreadPool::Custom(pool))
        }
        #[cfg(not(feature = "parallel"))]
        {
            let _ = threads;
            Ok(ThreadPool::Global)
        }
    }

    /// Runs a function across the thread pool
    pub fn run<F: FnOnce() -> V + Send, V: Send>(&self, f: F) -> V {
        match self {
            #[cfg(feature = "parallel")]
            ThreadPool::Custom(p) => p.install(f),
            ThreadPool::Global => f(),
        }
    }

    /// Returns the number of threads in the pool
    pub fn thread_count(&self) -> usize {
        match self {
            #[cfg(feature = "parallel")]
            ThreadPool::Custom(p) => p.current_num_threads(),
            #[cfg(feature = "parallel")]
            ThreadPool::Global => rayon::current_num_threads(),
            #[cfg(not(feature = "parallel"))]
            ThreadPool::Global => 1,
        }
    }
}

/// Settings for classification, compression, and quadrature queries
#[derive(Clone, Debug)]
pub struct Settings {
    /// Thread pool to use
    ///
    /// If this is `None`, every pass runs on the calling thread.  The pool is
    /// shared by every context and classifier holding these settings.
    pub threads: Option<Arc<ThreadPool>>,

    /// Measure below which a region is treated as empty during compression
    pub tolerance: f64,

    /// Polynomial order requested from the cut-quadrature provider
    pub order: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threads: None,
            tolerance: 1e-12,
            order: 1,
        }
    }
}

impl Settings {
    /// Builds default settings running on a new pool of `threads` workers
    ///
    /// If `threads` is 0, passes run on the calling thread.
    pub fn with_threads(threads: usize) -> Result<Self, Error> {
        let threads = match threads {
            0 => None,
            n => Some(Arc::new(ThreadPool::new(n)?)),
        };
        Ok(Self {
            threads,
            ..Default::default()
        })
    }

    /// Evaluates `f` for every index in `0..n`, collecting results in order
    pub(crate) fn map_indices<T, F>(&self, n: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match &self.threads {
            #[cfg(feature = "parallel")]
            Some(pool) => {
                use rayon::prelude::*;
                pool.run(|| (0..n).into_par_iter().map(f).collect())
            }
            _ => (0..n).map(f).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn map_indices_preserves_order() {
        for threads in [0, 4] {
            let settings = Settings::with_threads(threads).unwrap();
            let out = settings.map_indices(100, |i| i * 2);
            assert_eq!(out, (0..100).map(|i| i * 2).collect::<Vec<_>>());
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn passes_reuse_one_pool() {
        let settings = Settings::with_threads(3).unwrap();
        let pool = settings.threads.clone().unwrap();
        assert_eq!(pool.thread_count(), 3);

        let copy = settings.clone();
        assert!(Arc::ptr_eq(copy.threads.as_ref().unwrap(), &pool));
        for s in [&settings, &copy] {
            let sizes = s.map_indices(32, |_| rayon::current_num_threads());
            assert!(sizes.iter().all(|n| *n == 3), "ran off the pool");
        }
    }
}
