//! The seam between the search machinery and an objective function.

/// A scalar objective of fixed dimensionality.
///
/// Implementations must be callable from the search worker thread; a handle
/// may outlive the search that used it when that search is abandoned.
pub trait Objective: Send + Sync {
    /// Identifier used in result lines.
    fn name(&self) -> &str;

    /// Number of coordinates `evaluate` expects.
    fn dim(&self) -> usize;

    /// Evaluate at `x`. NaN and infinities are legitimate results.
    fn evaluate(&self, x: &[f64]) -> f64;

    /// Starting point of every search: `dim` zeros.
    fn initial_point(&self) -> Vec<f64> {
        vec![0.0; self.dim()]
    }
}
