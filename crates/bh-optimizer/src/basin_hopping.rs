//! Basin-hopping global search.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OptimizeError, OptimizeResult};
use crate::powell::{powell, LocalMinimum, PowellOptions};
use crate::stop::StopFlag;

/// Options for [`BasinHopping`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinHoppingOptions {
    /// Number of basin-hopping iterations after the initial local minimization.
    pub niter: usize,
    /// Metropolis temperature. Zero accepts only non-increasing steps.
    pub temperature: f64,
    /// Initial half-width of the uniform perturbation.
    pub step_size: f64,
    /// Iterations between step-size adjustments.
    pub interval: usize,
    /// Acceptance rate the step-size adjustment aims for.
    pub target_accept_rate: f64,
    /// Multiplicative step-size adjustment factor, in (0, 1).
    pub step_factor: f64,
    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Stop early once the best value is at or below this target.
    pub target_value: Option<f64>,
    /// Options for every local minimization.
    pub local: PowellOptions,
}

impl Default for BasinHoppingOptions {
    fn default() -> Self {
        Self {
            niter: 100,
            temperature: 1.0,
            step_size: 0.5,
            interval: 50,
            target_accept_rate: 0.5,
            step_factor: 0.9,
            seed: None,
            target_value: None,
            local: PowellOptions::default(),
        }
    }
}

/// Best point found by a basin-hopping run.
#[derive(Debug, Clone, PartialEq)]
pub struct BasinHoppingResult {
    pub x: Vec<f64>,
    pub fun: f64,
    /// Basin-hopping iterations performed.
    pub iterations: usize,
    /// Objective evaluations across all local minimizations.
    pub nfev: usize,
    /// Local minimizations that hit a cap before converging.
    pub minimization_failures: usize,
    /// Step size after the last adjustment.
    pub final_step_size: f64,
    /// `true` when the run ended early on `target_value`.
    pub reached_target: bool,
}

/// Basin-hopping driver.
///
/// Each iteration perturbs the current point uniformly within
/// `[-step_size, step_size]` per coordinate, refines it with Powell's method
/// and accepts the new local minimum with probability
/// `min(1, exp(-(f_new - f_old) / T))`. Every `interval` iterations the step
/// size shrinks or grows by `step_factor` depending on whether the observed
/// acceptance rate exceeds `target_accept_rate`. The lowest local minimum
/// seen is returned, whether or not it was accepted.
#[derive(Debug, Clone)]
pub struct BasinHopping {
    options: BasinHoppingOptions,
}

impl BasinHopping {
    pub fn new(options: BasinHoppingOptions) -> OptimizeResult<Self> {
        validate(&options)?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &BasinHoppingOptions {
        &self.options
    }

    /// Run the search from `x0`.
    ///
    /// Returns [`OptimizeError::Interrupted`] once `stop` is raised; errors
    /// from a local minimization end the run.
    pub fn minimize<F>(&self, f: F, x0: &[f64], stop: &StopFlag) -> OptimizeResult<BasinHoppingResult>
    where
        F: Fn(&[f64]) -> f64,
    {
        if x0.is_empty() {
            return Err(OptimizeError::InvalidInput {
                context: "basinhopping: empty initial guess".to_string(),
            });
        }
        let opts = &self.options;
        let mut rng = match opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut tally = Tally::default();
        let initial = tally.record(powell(&f, x0, &opts.local, stop)?);

        let mut x_current = initial.x;
        let mut f_current = initial.fun;
        let mut x_best = x_current.clone();
        let mut f_best = f_current;

        let mut step_size = opts.step_size;
        let mut nstep = 0usize;
        let mut naccept = 0usize;
        let mut iterations = 0usize;
        let mut reached_target = target_reached(opts.target_value, f_best);

        while !reached_target && iterations < opts.niter {
            if stop.is_raised() {
                return Err(OptimizeError::Interrupted { iterations });
            }

            nstep += 1;
            if nstep % opts.interval == 0 {
                let accept_rate = naccept as f64 / nstep as f64;
                if accept_rate > opts.target_accept_rate {
                    step_size /= opts.step_factor;
                } else {
                    step_size *= opts.step_factor;
                }
                debug!(step_size, accept_rate, "adjusted basin-hopping step size");
            }

            let x_trial: Vec<f64> = x_current
                .iter()
                .map(|&xi| xi + step_size * (2.0 * rng.random::<f64>() - 1.0))
                .collect();
            let local = tally.record(powell(&f, &x_trial, &opts.local, stop)?);
            iterations += 1;

            if local.fun < f_best {
                debug!(iteration = iterations, fun = local.fun, "new best basin");
                f_best = local.fun;
                x_best = local.x.clone();
            }

            if metropolis_accept(f_current, local.fun, opts.temperature, &mut rng) {
                naccept += 1;
                x_current = local.x;
                f_current = local.fun;
            }

            reached_target = target_reached(opts.target_value, f_best);
        }

        Ok(BasinHoppingResult {
            x: x_best,
            fun: f_best,
            iterations,
            nfev: tally.nfev,
            minimization_failures: tally.failures,
            final_step_size: step_size,
            reached_target,
        })
    }
}

#[derive(Default)]
struct Tally {
    nfev: usize,
    failures: usize,
}

impl Tally {
    fn record(&mut self, local: LocalMinimum) -> LocalMinimum {
        self.nfev += local.nfev;
        if !local.converged {
            self.failures += 1;
        }
        local
    }
}

fn target_reached(target: Option<f64>, best: f64) -> bool {
    matches!(target, Some(t) if best <= t)
}

/// Metropolis criterion. NaN minima are never accepted.
fn metropolis_accept<R: Rng>(f_old: f64, f_new: f64, temperature: f64, rng: &mut R) -> bool {
    if f_new.is_nan() {
        return false;
    }
    let beta = if temperature != 0.0 {
        1.0 / temperature
    } else {
        f64::INFINITY
    };
    let prod = -(f_new - f_old) * beta;
    // f64::min ignores a NaN operand, so equal values at T = 0 give w = 1
    let w = 0.0_f64.min(prod).exp();
    w >= rng.random::<f64>()
}

fn validate(options: &BasinHoppingOptions) -> OptimizeResult<()> {
    let invalid = |parameter: &str, message: String| {
        Err(OptimizeError::InvalidParameter {
            parameter: parameter.to_string(),
            message,
        })
    };
    if !(options.temperature.is_finite() && options.temperature >= 0.0) {
        return invalid(
            "temperature",
            format!("must be finite and non-negative, got {}", options.temperature),
        );
    }
    if !(options.step_size.is_finite() && options.step_size > 0.0) {
        return invalid(
            "step_size",
            format!("must be finite and positive, got {}", options.step_size),
        );
    }
    if options.interval == 0 {
        return invalid("interval", "must be at least 1".to_string());
    }
    if !(options.step_factor > 0.0 && options.step_factor < 1.0) {
        return invalid(
            "step_factor",
            format!("must lie in (0, 1), got {}", options.step_factor),
        );
    }
    Ok(())
}
