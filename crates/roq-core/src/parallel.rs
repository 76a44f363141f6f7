//! Parallel candidate evaluation
//!
//! Scoring a greedy round means one oracle call plus one projection per
//! candidate point, with no shared mutable state between candidates. This
//! module fans that map out over a Rayon pool and gathers the results in
//! input order; the reduction (argmax) and the basis update stay on the
//! calling thread. Enable with the `parallel` feature flag (on by default).
//!
//! ## Performance Considerations
//!
//! Parallelization adds overhead, so it's most beneficial when a single
//! oracle call is expensive or the candidate set is large. For toy oracles
//! on short grids the sequential path is often faster.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::types::{RoqError, RoqResult};

/// Order-preserving map over candidate items
pub struct CandidatePool {
    parallel: bool,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for CandidatePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidatePool")
            .field("parallel", &self.parallel)
            .field("workers", &self.workers())
            .finish()
    }
}

impl CandidatePool {
    /// Evaluate on the calling thread only
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    /// Pool with `workers` dedicated threads, or Rayon's global pool when
    /// `workers == 0`. Falls back to sequential when `parallel` is false or
    /// the crate was built without the `parallel` feature.
    pub fn new(parallel: bool, workers: usize) -> RoqResult<Self> {
        if !parallel {
            return Ok(Self::sequential());
        }
        #[cfg(feature = "parallel")]
        {
            let pool = if workers > 0 {
                Some(
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(workers)
                        .thread_name(|i| format!("roq-candidate-{}", i))
                        .build()
                        .map_err(|e| RoqError::Config(format!("failed to build worker pool: {}", e)))?,
                )
            } else {
                None
            };
            Ok(Self { parallel: true, pool })
        }
        #[cfg(not(feature = "parallel"))]
        {
            let _ = workers;
            tracing::warn!("built without the `parallel` feature; evaluating candidates sequentially");
            Ok(Self::sequential())
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Number of worker threads that will run a map.
    pub fn workers(&self) -> usize {
        if !self.parallel {
            return 1;
        }
        #[cfg(feature = "parallel")]
        {
            match &self.pool {
                Some(pool) => pool.current_num_threads(),
                None => rayon::current_num_threads(),
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Apply `f` to every item, returning results in input order.
    ///
    /// Each call is independent; an error in one item is returned in its
    /// slot and never affects its siblings.
    pub fn map<I, T, F>(&self, items: &[I], f: F) -> Vec<T>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send,
    {
        if !self.parallel {
            return items.iter().map(f).collect();
        }
        #[cfg(feature = "parallel")]
        {
            match &self.pool {
                Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
                None => items.par_iter().map(&f).collect(),
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            items.iter().map(f).collect()
        }
    }
}

impl Default for CandidatePool {
    fn default() -> Self {
        Self::sequential()
    }
}
