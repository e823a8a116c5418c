//! Bounded global search over one objective.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use bh_optimizer::StopFlag;
use bh_types::{config_error, BhResult, Objective, SearchConfig, SearchError, SearchOutcome};
use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::{error, info, warn};

use crate::deadline::SearchDeadline;
use crate::fpenv::FpEnvGuard;
use crate::optimizer::{BasinHoppingOptimizer, GlobalOptimizer, OptimizerReport};

type WorkerResult = thread::Result<Result<OptimizerReport, bh_optimizer::OptimizeError>>;

/// Runs one global search per call under a wall-clock deadline.
///
/// The optimizer executes on a dedicated worker thread with floating-point
/// traps masked. When the deadline passes first, the worker's stop flag is
/// raised and the worker is left to wind down on its own; the outcome is
/// `timeout` regardless of what it later produces.
#[derive(Clone)]
pub struct SearchRunner {
    optimizer: Arc<dyn GlobalOptimizer>,
}

impl SearchRunner {
    pub fn new(optimizer: Arc<dyn GlobalOptimizer>) -> Self {
        Self { optimizer }
    }

    /// Basin-hopping configured from `config`.
    pub fn from_config(config: &SearchConfig) -> BhResult<Self> {
        let optimizer = BasinHoppingOptimizer::from_config(config)
            .map_err(|e| config_error!("invalid search configuration: {e}"))?;
        Ok(Self::new(Arc::new(optimizer)))
    }

    pub fn run(
        &self,
        objective: Arc<dyn Objective>,
        initial: Vec<f64>,
        config: &SearchConfig,
    ) -> SearchOutcome {
        let name = objective.name().to_string();
        info!("Starting search for {} (dim {})", name, objective.dim());

        let started = Instant::now();
        let stop = StopFlag::new();
        let (tx, rx) = bounded::<WorkerResult>(1);
        let deadline = SearchDeadline::arm(config.timeout());

        let spawned = {
            let optimizer = Arc::clone(&self.optimizer);
            let stop = stop.clone();
            thread::Builder::new()
                .name(format!("search-{name}"))
                .spawn(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        let _fp = FpEnvGuard::mask_traps();
                        optimizer.minimize(objective.as_ref(), &initial, &stop)
                    }));
                    // the receiver is gone once the search was abandoned
                    let _ = tx.send(result);
                })
        };
        if let Err(e) = spawned {
            error!("Could not start search worker for {}: {}", name, e);
            return SearchOutcome::errored(
                name,
                started.elapsed(),
                SearchError::Optimizer {
                    message: format!("failed to spawn search worker: {e}"),
                }
                .to_string(),
            );
        }

        let received = deadline.wait(&rx);
        let elapsed = started.elapsed();

        match received {
            Ok(Ok(Ok(report))) => {
                let outcome = SearchOutcome::completed(name, report.fun, report.x, elapsed)
                    .with_counts(report.evaluations, report.iterations);
                info!(
                    "Search for {} finished: {} ({} evaluations)",
                    outcome.name,
                    outcome.status,
                    report.evaluations
                );
                outcome
            }
            Ok(Ok(Err(e))) => {
                let err = SearchError::Optimizer {
                    message: e.to_string(),
                };
                error!("Search for {} failed: {}", name, err);
                SearchOutcome::errored(name, elapsed, err.to_string())
            }
            Ok(Err(payload)) => {
                let err = SearchError::Panicked {
                    message: panic_message(payload.as_ref()),
                };
                error!("Search for {} failed: {}", name, err);
                SearchOutcome::errored(name, elapsed, err.to_string())
            }
            Err(RecvTimeoutError::Timeout) => {
                stop.raise();
                let err = SearchError::Timeout {
                    timeout_seconds: config.timeout_secs,
                };
                warn!("Search for {} abandoned: {}", name, err);
                SearchOutcome::timed_out(name, elapsed, err.to_string())
            }
            Err(RecvTimeoutError::Disconnected) => {
                let err = SearchError::Panicked {
                    message: "search worker exited without a result".to_string(),
                };
                error!("Search for {} failed: {}", name, err);
                SearchOutcome::errored(name, elapsed, err.to_string())
            }
        }
    }
}

impl fmt::Debug for SearchRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchRunner").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bh_optimizer::OptimizeError;
    use bh_types::SearchStatus;
    use std::time::Duration;

    pub(crate) struct Constant {
        pub name: &'static str,
        pub dim: usize,
        pub value: f64,
    }

    impl Objective for Constant {
        fn name(&self) -> &str {
            self.name
        }

        fn dim(&self) -> usize {
            self.dim
        }

        fn evaluate(&self, _x: &[f64]) -> f64 {
            self.value
        }
    }

    /// Never converges; only the stop flag ends it.
    pub(crate) struct Spinner;

    impl GlobalOptimizer for Spinner {
        fn minimize(
            &self,
            _objective: &dyn Objective,
            _x0: &[f64],
            stop: &StopFlag,
        ) -> Result<OptimizerReport, OptimizeError> {
            let mut iterations = 0;
            while !stop.is_raised() {
                iterations += 1;
                thread::sleep(Duration::from_millis(5));
            }
            Err(OptimizeError::Interrupted { iterations })
        }
    }

    struct Failing;

    impl GlobalOptimizer for Failing {
        fn minimize(
            &self,
            _objective: &dyn Objective,
            _x0: &[f64],
            _stop: &StopFlag,
        ) -> Result<OptimizerReport, OptimizeError> {
            Err(OptimizeError::Numerical {
                message: "line search bracket did not close".to_string(),
            })
        }
    }

    struct Panicking;

    impl GlobalOptimizer for Panicking {
        fn minimize(
            &self,
            _objective: &dyn Objective,
            _x0: &[f64],
            _stop: &StopFlag,
        ) -> Result<OptimizerReport, OptimizeError> {
            panic!("objective blew up")
        }
    }

    struct ReportsTraps;

    impl GlobalOptimizer for ReportsTraps {
        fn minimize(
            &self,
            _objective: &dyn Objective,
            x0: &[f64],
            _stop: &StopFlag,
        ) -> Result<OptimizerReport, OptimizeError> {
            let fun = if FpEnvGuard::traps_masked() { 0.0 } else { 1.0 };
            Ok(OptimizerReport {
                x: x0.to_vec(),
                fun,
                evaluations: 0,
                iterations: 0,
            })
        }
    }

    fn constant(value: f64) -> Arc<dyn Objective> {
        Arc::new(Constant {
            name: "const_fn",
            dim: 2,
            value,
        })
    }

    fn fast_config() -> SearchConfig {
        SearchConfig::default()
            .with_max_iter(3)
            .with_seed(42)
            .with_timeout_secs(30.0)
    }

    #[test]
    fn test_zero_objective_is_sat() {
        let config = fast_config();
        let runner = SearchRunner::from_config(&config).unwrap();
        let objective = constant(0.0);
        let outcome = runner.run(Arc::clone(&objective), objective.initial_point(), &config);
        assert_eq!(outcome.status, SearchStatus::Satisfied);
        assert_eq!(outcome.value, Some(0.0));
        assert_eq!(outcome.model.as_ref().map(Vec::len), Some(2));
        assert_eq!(outcome.iterations, Some(3));
        assert!(outcome.to_csv_line().starts_with("const_fn,sat,"));
        assert!(outcome.to_csv_line().ends_with(",0.0"));
    }

    #[test]
    fn test_nonzero_objective_is_unsat() {
        let config = fast_config();
        let runner = SearchRunner::from_config(&config).unwrap();
        let objective = constant(1.5);
        let outcome = runner.run(Arc::clone(&objective), objective.initial_point(), &config);
        assert_eq!(outcome.status, SearchStatus::Unsatisfied);
        assert!(outcome.to_csv_line().ends_with(",1.5"));
    }

    #[test]
    fn test_nan_objective_is_unsat() {
        let config = fast_config();
        let runner = SearchRunner::from_config(&config).unwrap();
        let objective = constant(f64::NAN);
        let outcome = runner.run(Arc::clone(&objective), objective.initial_point(), &config);
        assert_eq!(outcome.status, SearchStatus::Unsatisfied);
        assert!(outcome.value.unwrap().is_nan());
    }

    #[test]
    fn test_deadline_classifies_timeout() {
        let config = fast_config().with_timeout_secs(0.2);
        let runner = SearchRunner::new(Arc::new(Spinner));
        let outcome = runner.run(constant(1.0), vec![0.0; 2], &config);
        assert_eq!(outcome.status, SearchStatus::TimedOut);
        assert_eq!(outcome.value, None);
        assert!(outcome.elapsed >= Duration::from_millis(200));
        assert!(outcome.elapsed < Duration::from_secs(10));
        assert!(outcome.to_csv_line().ends_with(",INF"));
        assert!(outcome.error.unwrap().contains("timeout"));
    }

    #[test]
    fn test_oversized_budget_never_expires() {
        let config = fast_config().with_timeout_secs(1e20);
        let runner = SearchRunner::from_config(&config).unwrap();
        let objective = constant(0.0);
        let outcome = runner.run(Arc::clone(&objective), objective.initial_point(), &config);
        assert_eq!(outcome.status, SearchStatus::Satisfied);
        assert_eq!(outcome.value, Some(0.0));
    }

    #[test]
    fn test_optimizer_failure_is_error() {
        let config = fast_config();
        let runner = SearchRunner::new(Arc::new(Failing));
        let outcome = runner.run(constant(1.0), vec![0.0; 2], &config);
        assert_eq!(outcome.status, SearchStatus::Errored);
        assert_eq!(outcome.value, None);
        assert!(outcome.error.unwrap().contains("bracket"));
    }

    #[test]
    fn test_worker_panic_is_error() {
        let config = fast_config();
        let runner = SearchRunner::new(Arc::new(Panicking));
        let outcome = runner.run(constant(1.0), vec![0.0; 2], &config);
        assert_eq!(outcome.status, SearchStatus::Errored);
        assert!(outcome.error.unwrap().contains("objective blew up"));
    }

    #[test]
    fn test_worker_runs_with_traps_masked() {
        let config = fast_config();
        let runner = SearchRunner::new(Arc::new(ReportsTraps));
        let outcome = runner.run(constant(1.0), vec![0.0; 2], &config);
        assert_eq!(outcome.status, SearchStatus::Satisfied);
    }

    struct SlowSphere;

    impl Objective for SlowSphere {
        fn name(&self) -> &str {
            "slow_fn"
        }

        fn dim(&self) -> usize {
            3
        }

        fn evaluate(&self, x: &[f64]) -> f64 {
            thread::sleep(Duration::from_millis(2));
            x.iter().map(|xi| xi * xi).sum::<f64>() + 1.0
        }
    }

    #[test]
    fn test_basin_hopping_stops_at_deadline() {
        let config = SearchConfig::default().with_seed(3).with_timeout_secs(1.0);
        let runner = SearchRunner::from_config(&config).unwrap();
        let objective: Arc<dyn Objective> = Arc::new(SlowSphere);
        let outcome = runner.run(Arc::clone(&objective), objective.initial_point(), &config);
        assert_eq!(outcome.status, SearchStatus::TimedOut);
        assert!(outcome.elapsed >= Duration::from_secs(1), "{:?}", outcome.elapsed);
        assert!(outcome.elapsed < Duration::from_secs(10));
        assert!(outcome.to_csv_line().starts_with("slow_fn,timeout,"));
        assert!(outcome.to_csv_line().ends_with(",INF"));
    }

    #[test]
    fn test_elapsed_includes_wait_for_deadline_slot() {
        let (armed_tx, armed_rx) = bounded(1);
        let holder = thread::spawn(move || {
            let _held = SearchDeadline::arm(Duration::from_secs(5));
            armed_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(150));
        });
        armed_rx.recv().unwrap();

        let runner = SearchRunner::new(Arc::new(Failing));
        let outcome = runner.run(constant(1.0), vec![0.0; 2], &fast_config());
        holder.join().unwrap();
        assert_eq!(outcome.status, SearchStatus::Errored);
        assert!(outcome.elapsed >= Duration::from_millis(100), "{:?}", outcome.elapsed);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = fast_config().with_step_size(-1.0);
        assert!(SearchRunner::from_config(&config).is_err());
    }
}
