//! The global optimizer as seen by the search runner.

use bh_optimizer::{BasinHopping, BasinHoppingOptions, OptimizeError, PowellOptions, StopFlag};
use bh_types::{Objective, SearchConfig};

/// Best point reported by a finished global search.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerReport {
    pub x: Vec<f64>,
    pub fun: f64,
    pub evaluations: usize,
    pub iterations: usize,
}

/// A global minimization routine run on the search worker thread.
///
/// Implementations should poll `stop` regularly and return promptly once it
/// is raised; the result of a stopped search is discarded.
pub trait GlobalOptimizer: Send + Sync {
    fn minimize(
        &self,
        objective: &dyn Objective,
        x0: &[f64],
        stop: &StopFlag,
    ) -> Result<OptimizerReport, OptimizeError>;
}

/// Basin-hopping with a Powell local minimizer.
#[derive(Debug, Clone)]
pub struct BasinHoppingOptimizer {
    inner: BasinHopping,
}

impl BasinHoppingOptimizer {
    pub fn from_config(config: &SearchConfig) -> Result<Self, OptimizeError> {
        BasinHopping::new(options_from_config(config)).map(|inner| Self { inner })
    }

    pub fn options(&self) -> &BasinHoppingOptions {
        self.inner.options()
    }
}

impl GlobalOptimizer for BasinHoppingOptimizer {
    fn minimize(
        &self,
        objective: &dyn Objective,
        x0: &[f64],
        stop: &StopFlag,
    ) -> Result<OptimizerReport, OptimizeError> {
        let result = self.inner.minimize(|x| objective.evaluate(x), x0, stop)?;
        Ok(OptimizerReport {
            x: result.x,
            fun: result.fun,
            evaluations: result.nfev,
            iterations: result.iterations,
        })
    }
}

fn options_from_config(config: &SearchConfig) -> BasinHoppingOptions {
    // local limits reach Powell only on request; otherwise it keeps its own defaults
    let local = if config.honor_local_limits {
        PowellOptions {
            max_iter: Some(config.max_local_iter),
            ftol: config.rel_tolerance,
            ..PowellOptions::default()
        }
    } else {
        PowellOptions::default()
    };

    BasinHoppingOptions {
        niter: config.max_iter,
        temperature: config.temperature,
        step_size: config.step_size,
        interval: config.interval,
        seed: config.seed,
        target_value: config.stop_on_zero.then_some(0.0),
        local,
        ..BasinHoppingOptions::default()
    }
}
