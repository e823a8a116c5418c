//! # bh-optimizer
//!
//! Derivative-free global minimization for bhsat.
//!
//! Provides basin-hopping (random perturbation, local refinement, Metropolis
//! acceptance with an adaptive step size) on top of Powell's direction-set
//! method, plus a [`StopFlag`] that lets a watchdog abandon a running search.

mod basin_hopping;
mod error;
mod line_search;
mod powell;
mod stop;

pub use basin_hopping::{BasinHopping, BasinHoppingOptions, BasinHoppingResult};
pub use error::{OptimizeError, OptimizeResult};
pub use powell::{powell, LocalMinimum, PowellOptions};
pub use stop::StopFlag;
