//! Bounded parallel evaluation of latent-point batches.

use rayon::prelude::*;
use tn_types::{LatentPoint, TnError, TnResult};

/// Evaluation fan-out for gradient probes and escape candidates, bounded by
/// a configured worker count.
///
/// `workers == 0` keeps everything on the calling thread. Results come back
/// in input order regardless of scheduling, so parallel evaluation never
/// changes which candidate wins a downstream tie-break.
pub struct EvalPool {
    pool: Option<rayon::ThreadPool>,
}

impl EvalPool {
    pub fn new(workers: usize) -> TnResult<Self> {
        let pool = if workers == 0 {
            None
        } else {
            let built = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| TnError::Internal(format!("failed to build evaluation pool: {e}")))?;
            Some(built)
        };
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.as_ref().map_or(0, |p| p.current_num_threads())
    }

    /// Score every point with `f`, preserving input order.
    ///
    /// All evaluations complete before this returns (the aggregation step is
    /// a barrier); on failure the error with the smallest input index wins.
    pub fn score_batch<F>(&self, points: &[LatentPoint], f: &F) -> TnResult<Vec<f64>>
    where
        F: Fn(&LatentPoint) -> TnResult<f64> + Send + Sync,
    {
        let results: Vec<TnResult<f64>> = match &self.pool {
            Some(pool) => pool.install(|| points.par_iter().map(f).collect()),
            None => points.iter().map(f).collect(),
        };
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize) -> Vec<LatentPoint> {
        (0..n).map(|i| LatentPoint::new(vec![i as f64])).collect()
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let batch = points(17);
        let f = |p: &LatentPoint| Ok(p.coords()[0] * 2.0);

        let sequential = EvalPool::new(0).unwrap().score_batch(&batch, &f).unwrap();
        let parallel = EvalPool::new(4).unwrap().score_batch(&batch, &f).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(sequential[5], 10.0);
    }

    #[test]
    fn first_failure_by_index_wins() {
        let batch = points(6);
        let f = |p: &LatentPoint| {
            let x = p.coords()[0];
            if x >= 2.0 {
                Err(TnError::Internal(format!("boom at {x}")))
            } else {
                Ok(x)
            }
        };

        let err = EvalPool::new(3).unwrap().score_batch(&batch, &f).unwrap_err();
        match err {
            TnError::Internal(message) => assert_eq!(message, "boom at 2"),
            other => panic!("expected Internal, got {other:?}"),
        }
    }

    #[test]
    fn zero_workers_reports_sequential() {
        assert_eq!(EvalPool::new(0).unwrap().workers(), 0);
        assert_eq!(EvalPool::new(2).unwrap().workers(), 2);
    }
}
