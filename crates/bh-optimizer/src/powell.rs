//! Powell's direction set method for derivative-free minimization.

use serde::{Deserialize, Serialize};
use std::cell::Cell;

use crate::error::{OptimizeError, OptimizeResult};
use crate::line_search::line_search;
use crate::stop::StopFlag;

/// Options for [`powell`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowellOptions {
    /// Iteration cap. When both caps are `None` each defaults to `1000 * n`.
    pub max_iter: Option<usize>,
    /// Function evaluation cap.
    pub max_fev: Option<usize>,
    /// Relative tolerance of each line search (scaled by 100 internally).
    pub xtol: f64,
    /// Relative decrease in `f` below which the run is considered converged.
    pub ftol: f64,
}

impl Default for PowellOptions {
    fn default() -> Self {
        Self {
            max_iter: None,
            max_fev: None,
            xtol: 1e-4,
            ftol: 1e-4,
        }
    }
}

impl PowellOptions {
    fn caps(&self, n: usize) -> (usize, usize) {
        match (self.max_iter, self.max_fev) {
            (None, None) => (n * 1000, n * 1000),
            (Some(iter), None) => (iter, usize::MAX),
            (None, Some(fev)) => (usize::MAX, fev),
            (Some(iter), Some(fev)) => (iter, fev),
        }
    }
}

/// Result of a local minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMinimum {
    pub x: Vec<f64>,
    pub fun: f64,
    pub iterations: usize,
    pub nfev: usize,
    /// `false` when a cap ended the run before the tolerance was met.
    pub converged: bool,
}

/// Minimize `f` from `x0` by successive line searches along a direction set.
///
/// Starts from the coordinate directions; after each sweep the direction of
/// largest decrease is replaced by the net displacement when that promises
/// further progress. Objective values may be NaN or infinite.
///
/// Returns [`OptimizeError::Interrupted`] once `stop` is raised.
pub fn powell<F>(
    f: F,
    x0: &[f64],
    options: &PowellOptions,
    stop: &StopFlag,
) -> OptimizeResult<LocalMinimum>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    if n == 0 {
        return Err(OptimizeError::InvalidInput {
            context: "powell: empty initial guess".to_string(),
        });
    }
    let (max_iter, max_fev) = options.caps(n);
    let line_tol = options.xtol * 100.0;

    let nfev = Cell::new(0usize);
    let mut eval = |x: &[f64]| -> f64 {
        if stop.is_raised() {
            return f64::NAN;
        }
        nfev.set(nfev.get() + 1);
        f(x)
    };

    let mut x = x0.to_vec();
    let mut fval = eval(&x);
    let mut x1 = x.clone();

    let mut directions: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut d = vec![0.0; n];
            d[i] = 1.0;
            d
        })
        .collect();

    let mut iterations = 0;
    let mut converged = false;

    loop {
        if stop.is_raised() {
            return Err(OptimizeError::Interrupted { iterations });
        }

        let fx = fval;
        let mut bigind = 0;
        let mut delta = 0.0;

        for (i, direction) in directions.iter().enumerate() {
            let fx2 = fval;
            let (f_new, x_new, _) = line_search(&mut eval, &x, direction, fval, line_tol)?;
            fval = f_new;
            x = x_new;
            if fx2 - fval > delta {
                delta = fx2 - fval;
                bigind = i;
            }
        }
        iterations += 1;

        if 2.0 * (fx - fval) <= options.ftol * (fx.abs() + fval.abs()) + 1e-20 {
            converged = true;
            break;
        }
        if nfev.get() >= max_fev || iterations >= max_iter {
            break;
        }
        if fx.is_nan() && fval.is_nan() {
            break;
        }

        // Extrapolated point along the net displacement of this sweep.
        let displacement: Vec<f64> = x.iter().zip(&x1).map(|(a, b)| a - b).collect();
        let extrapolated: Vec<f64> = x.iter().zip(&x1).map(|(a, b)| 2.0 * a - b).collect();
        x1 = x.clone();
        let fx2 = eval(&extrapolated);

        if fx > fx2 {
            let mut t = 2.0 * (fx + fx2 - 2.0 * fval);
            let temp = fx - fval - delta;
            t *= temp * temp;
            let temp = fx - fx2;
            t -= delta * temp * temp;
            if t < 0.0 {
                let (f_new, x_new, step) = line_search(&mut eval, &x, &displacement, fval, line_tol)?;
                fval = f_new;
                x = x_new;
                if step.iter().any(|&s| s != 0.0) {
                    directions[bigind] = directions[n - 1].clone();
                    directions[n - 1] = step;
                }
            }
        }
    }

    Ok(LocalMinimum {
        x,
        fun: fval,
        iterations,
        nfev: nfev.get(),
        converged,
    })
}
