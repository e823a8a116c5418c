//! One-dimensional minimization along a search direction.

use crate::error::{OptimizeError, OptimizeResult};

const GOLD: f64 = 1.618034;
const VERY_SMALL: f64 = 1e-21;
const GROW_LIMIT: f64 = 110.0;
const BRACKET_MAX_ITER: usize = 1000;

const CGOLD: f64 = 0.381_966_0;
const MIN_TOL: f64 = 1e-11;
const BRENT_MAX_ITER: usize = 500;

/// A downhill bracket: `fb` is below both `fa` and `fc`, with `xb` between `xa` and `xc`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bracket {
    pub xa: f64,
    pub xb: f64,
    pub xc: f64,
    pub fa: f64,
    pub fb: f64,
    pub fc: f64,
}

/// Expand downhill from `[xa, xb]` until the function turns up.
///
/// Parabolic extrapolation, capped at `GROW_LIMIT` times the last interval.
pub(crate) fn bracket<G>(g: &mut G, xa: f64, xb: f64, max_iter: usize) -> OptimizeResult<Bracket>
where
    G: FnMut(f64) -> f64,
{
    let (mut xa, mut xb) = (xa, xb);
    let mut fa = g(xa);
    let mut fb = g(xb);
    if fa < fb {
        std::mem::swap(&mut xa, &mut xb);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut xc = xb + GOLD * (xb - xa);
    let mut fc = g(xc);

    let mut iter = 0;
    while fc < fb {
        let tmp1 = (xb - xa) * (fb - fc);
        let tmp2 = (xb - xc) * (fb - fa);
        let val = tmp2 - tmp1;
        let denom = if val.abs() < VERY_SMALL {
            2.0 * VERY_SMALL
        } else {
            2.0 * val
        };
        let mut w = xb - ((xb - xc) * tmp2 - (xb - xa) * tmp1) / denom;
        let wlim = xb + GROW_LIMIT * (xc - xb);

        if iter > max_iter {
            return Err(OptimizeError::Numerical {
                message: format!("line search bracket did not close after {max_iter} iterations"),
            });
        }
        iter += 1;

        let mut fw;
        if (w - xc) * (xb - w) > 0.0 {
            fw = g(w);
            if fw < fc {
                xa = xb;
                xb = w;
                fa = fb;
                fb = fw;
                break;
            } else if fw > fb {
                xc = w;
                fc = fw;
                break;
            }
            w = xc + GOLD * (xc - xb);
            fw = g(w);
        } else if (w - wlim) * (wlim - xc) >= 0.0 {
            w = wlim;
            fw = g(w);
        } else if (w - wlim) * (xc - w) > 0.0 {
            fw = g(w);
            if fw < fc {
                xb = xc;
                xc = w;
                w = xc + GOLD * (xc - xb);
                fb = fc;
                fc = fw;
                fw = g(w);
            }
        } else {
            w = xc + GOLD * (xc - xb);
            fw = g(w);
        }
        xa = xb;
        xb = xc;
        xc = w;
        fa = fb;
        fb = fc;
        fc = fw;
    }

    Ok(Bracket {
        xa,
        xb,
        xc,
        fa,
        fb,
        fc,
    })
}

/// Brent's method inside a bracket. Returns `(x_min, f_min)`.
pub(crate) fn brent<G>(g: &mut G, bracket: Bracket, tol: f64) -> (f64, f64)
where
    G: FnMut(f64) -> f64,
{
    let mut x = bracket.xb;
    let mut w = x;
    let mut v = x;
    let mut fx = bracket.fb;
    let mut fw = fx;
    let mut fv = fx;
    let (mut a, mut b) = if bracket.xa < bracket.xc {
        (bracket.xa, bracket.xc)
    } else {
        (bracket.xc, bracket.xa)
    };
    let mut deltax: f64 = 0.0;
    let mut rat: f64 = 0.0;

    for _ in 0..BRENT_MAX_ITER {
        let tol1 = tol * x.abs() + MIN_TOL;
        let tol2 = 2.0 * tol1;
        let xmid = 0.5 * (a + b);
        if (x - xmid).abs() < tol2 - 0.5 * (b - a) {
            break;
        }

        if deltax.abs() <= tol1 {
            deltax = if x >= xmid { a - x } else { b - x };
            rat = CGOLD * deltax;
        } else {
            // parabolic step
            let tmp1 = (x - w) * (fx - fv);
            let mut tmp2 = (x - v) * (fx - fw);
            let mut p = (x - v) * tmp2 - (x - w) * tmp1;
            tmp2 = 2.0 * (tmp2 - tmp1);
            if tmp2 > 0.0 {
                p = -p;
            }
            tmp2 = tmp2.abs();
            let dx_temp = deltax;
            deltax = rat;
            if p > tmp2 * (a - x) && p < tmp2 * (b - x) && p.abs() < (0.5 * tmp2 * dx_temp).abs() {
                rat = p / tmp2;
                let u = x + rat;
                if (u - a) < tol2 || (b - u) < tol2 {
                    rat = if xmid - x >= 0.0 { tol1 } else { -tol1 };
                }
            } else {
                deltax = if x >= xmid { a - x } else { b - x };
                rat = CGOLD * deltax;
            }
        }

        let u = if rat.abs() < tol1 {
            if rat >= 0.0 {
                x + tol1
            } else {
                x - tol1
            }
        } else {
            x + rat
        };
        let fu = g(u);

        if fu > fx {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                w = u;
                fv = fw;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        } else {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            w = x;
            x = u;
            fv = fw;
            fw = fx;
            fx = fu;
        }
    }

    (x, fx)
}

/// Minimize `f` along `direction` from `x`.
///
/// Returns `(f_new, x_new, step)` where `step = x_new - x`. A zero direction
/// returns the inputs unchanged.
pub(crate) fn line_search<F>(
    f: &mut F,
    x: &[f64],
    direction: &[f64],
    fx: f64,
    tol: f64,
) -> OptimizeResult<(f64, Vec<f64>, Vec<f64>)>
where
    F: FnMut(&[f64]) -> f64,
{
    if direction.iter().all(|&d| d == 0.0) {
        return Ok((fx, x.to_vec(), vec![0.0; x.len()]));
    }

    let mut point = vec![0.0; x.len()];
    let mut along = |alpha: f64| -> f64 {
        for ((p, xi), di) in point.iter_mut().zip(x).zip(direction) {
            *p = xi + alpha * di;
        }
        f(&point)
    };

    let bracket = bracket(&mut along, 0.0, 1.0, BRACKET_MAX_ITER)?;
    let (alpha, f_min) = brent(&mut along, bracket, tol);

    let step: Vec<f64> = direction.iter().map(|d| alpha * d).collect();
    let x_new: Vec<f64> = x.iter().zip(&step).map(|(xi, s)| xi + s).collect();
    Ok((f_min, x_new, step))
}
