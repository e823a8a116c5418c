//! Search configuration shared by every search in a batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::config_error;
use crate::errors::BhResult;

/// Knobs for the bounded basin-hopping search.
///
/// Built once at startup (defaults, then an optional JSON file, then command
/// line overrides) and shared read-only by all searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Wall-clock budget per function, in seconds.
    pub timeout_secs: f64,

    /// Number of basin-hopping (global) iterations.
    pub max_iter: usize,

    /// Iteration cap for the local minimizer. Only applied with `honor_local_limits`.
    pub max_local_iter: usize,

    /// Relative tolerance for the local minimizer. Only applied with `honor_local_limits`.
    pub rel_tolerance: f64,

    /// Metropolis acceptance temperature.
    pub temperature: f64,

    /// Initial perturbation step size.
    pub step_size: f64,

    /// Number of iterations between step-size adjustments.
    pub interval: usize,

    /// Pass `max_local_iter`/`rel_tolerance` through to the local minimizer.
    pub honor_local_limits: bool,

    /// Seed for the perturbation RNG; `None` draws from the OS.
    pub seed: Option<u64>,

    /// Stop a search as soon as an objective value of zero is found.
    pub stop_on_zero: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600.0,
            max_iter: 100,
            max_local_iter: 100_000,
            rel_tolerance: 1e-8,
            temperature: 1.0,
            step_size: 0.5,
            interval: 50,
            honor_local_limits: false,
            seed: None,
            stop_on_zero: false,
        }
    }
}

impl SearchConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> BhResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Wall-clock budget as a `Duration`.
    ///
    /// Budgets beyond what `Duration` can hold saturate to `Duration::MAX`;
    /// non-positive or NaN budgets give zero.
    pub fn timeout(&self) -> Duration {
        if !(self.timeout_secs > 0.0) {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::MAX)
    }

    pub fn with_timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_iter(mut self, n: usize) -> Self {
        self.max_iter = n;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_interval(mut self, interval: usize) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_local_limits(mut self, honor: bool) -> Self {
        self.honor_local_limits = honor;
        self
    }

    pub fn with_stop_on_zero(mut self, stop: bool) -> Self {
        self.stop_on_zero = stop;
        self
    }

    /// Reject values the optimizer cannot work with.
    pub fn validate(&self) -> BhResult<()> {
        if !(self.timeout_secs.is_finite() && self.timeout_secs > 0.0) {
            return Err(config_error!(
                "timeout_secs must be a positive number of seconds, got {}",
                self.timeout_secs
            ));
        }
        if !(self.temperature.is_finite() && self.temperature >= 0.0) {
            return Err(config_error!(
                "temperature must be finite and non-negative, got {}",
                self.temperature
            ));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(config_error!(
                "step_size must be finite and positive, got {}",
                self.step_size
            ));
        }
        if self.interval == 0 {
            return Err(config_error!("interval must be at least 1"));
        }
        if self.max_local_iter == 0 {
            return Err(config_error!("max_local_iter must be at least 1"));
        }
        if !(self.rel_tolerance.is_finite() && self.rel_tolerance > 0.0) {
            return Err(config_error!(
                "rel_tolerance must be finite and positive, got {}",
                self.rel_tolerance
            ));
        }
        Ok(())
    }
}

/// Compact one-line summary, e.g. `TO:600.0,GITER:100,...`.
impl fmt::Display for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TO:{:?},GITER:{},LITER:{},FTOL:{:?},TEMP:{:?},STEP:{:?},IVAL:{}",
            self.timeout_secs,
            self.max_iter,
            self.max_local_iter,
            self.rel_tolerance,
            self.temperature,
            self.step_size,
            self.interval
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BhError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_budget_and_knobs() {
        let config = SearchConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(600));
        assert_eq!(config.max_iter, 100);
        assert_eq!(config.max_local_iter, 100_000);
        assert_eq!(config.rel_tolerance, 1e-8);
        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.step_size, 0.5);
        assert_eq!(config.interval, 50);
        assert!(!config.honor_local_limits);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_display_is_compact_summary() {
        let config = SearchConfig::default();
        assert_eq!(
            config.to_string(),
            "TO:600.0,GITER:100,LITER:100000,FTOL:1e-8,TEMP:1.0,STEP:0.5,IVAL:50"
        );
    }

    #[test]
    fn test_builder_chain() {
        let config = SearchConfig::default()
            .with_timeout_secs(1.0)
            .with_max_iter(10)
            .with_temperature(0.5)
            .with_step_size(1.5)
            .with_interval(5)
            .with_seed(7)
            .with_local_limits(true)
            .with_stop_on_zero(true);
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.max_iter, 10);
        assert_eq!(config.seed, Some(7));
        assert!(config.honor_local_limits);
        assert!(config.stop_on_zero);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad = [
            SearchConfig::default().with_timeout_secs(0.0),
            SearchConfig::default().with_timeout_secs(f64::NAN),
            SearchConfig::default().with_temperature(-1.0),
            SearchConfig::default().with_step_size(0.0),
            SearchConfig::default().with_interval(0),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(BhError::Config(_))),
                "expected rejection for {config:?}"
            );
        }
    }

    #[test]
    fn test_oversized_timeout_saturates() {
        let config = SearchConfig::default().with_timeout_secs(1e20);
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::MAX);
        assert_eq!(
            SearchConfig::default().with_timeout_secs(f64::MAX).timeout(),
            Duration::MAX
        );
        assert_eq!(
            SearchConfig::default().with_timeout_secs(-1.0).timeout(),
            Duration::ZERO
        );
    }

    #[test]
    fn test_zero_temperature_is_allowed() {
        assert!(SearchConfig::default().with_temperature(0.0).validate().is_ok());
    }

    #[test]
    fn test_loads_partial_json_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"timeout_secs": 2.5, "seed": 42}}"#).unwrap();

        let config = SearchConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_iter, 100);
    }

    #[test]
    fn test_json_with_unknown_field_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"timeout": 2}}"#).unwrap();

        let err = SearchConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, BhError::Serialization(_)));
    }

    #[test]
    fn test_json_with_invalid_value_fails_validation() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"step_size": -0.5}}"#).unwrap();

        let err = SearchConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, BhError::Config(_)));
    }
}
