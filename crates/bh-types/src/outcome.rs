//! Per-function search outcomes and their output formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Value printed when a search produced no objective value.
pub const UNBOUNDED_SENTINEL: &str = "INF";

/// Final classification of one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchStatus {
    #[serde(rename = "sat")]
    Satisfied,
    #[serde(rename = "unsat")]
    Unsatisfied,
    #[serde(rename = "timeout")]
    TimedOut,
    #[serde(rename = "error")]
    Errored,
}

impl SearchStatus {
    /// Classify a completed search by its best value: exactly zero is satisfiable.
    pub fn from_best_value(value: f64) -> Self {
        if value == 0.0 {
            Self::Satisfied
        } else {
            Self::Unsatisfied
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Satisfied => "sat",
            Self::Unsatisfied => "unsat",
            Self::TimedOut => "timeout",
            Self::Errored => "error",
        }
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one bounded search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub name: String,
    pub status: SearchStatus,
    /// Best objective value; `None` for timeouts and errors.
    pub value: Option<f64>,
    pub elapsed: Duration,
    /// Point at which `value` was reached.
    pub model: Option<Vec<f64>>,
    pub evaluations: Option<usize>,
    pub iterations: Option<usize>,
    /// Failure description for timeouts and errors.
    pub error: Option<String>,
}

impl SearchOutcome {
    /// Outcome of a search that returned a best point.
    pub fn completed(name: impl Into<String>, value: f64, model: Vec<f64>, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            status: SearchStatus::from_best_value(value),
            value: Some(value),
            elapsed,
            model: Some(model),
            evaluations: None,
            iterations: None,
            error: None,
        }
    }

    pub fn timed_out(name: impl Into<String>, elapsed: Duration, error: impl Into<String>) -> Self {
        Self::without_value(name, SearchStatus::TimedOut, elapsed, error)
    }

    pub fn errored(name: impl Into<String>, elapsed: Duration, error: impl Into<String>) -> Self {
        Self::without_value(name, SearchStatus::Errored, elapsed, error)
    }

    fn without_value(
        name: impl Into<String>,
        status: SearchStatus,
        elapsed: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            value: None,
            elapsed,
            model: None,
            evaluations: None,
            iterations: None,
            error: Some(error.into()),
        }
    }

    pub fn with_counts(mut self, evaluations: usize, iterations: usize) -> Self {
        self.evaluations = Some(evaluations);
        self.iterations = Some(iterations);
        self
    }

    /// Elapsed seconds with exactly three decimals.
    pub fn elapsed_display(&self) -> String {
        format!("{:.3}", self.elapsed.as_secs_f64())
    }

    /// Best value as printed in result lines: shortest round-trip decimal, or `INF`.
    pub fn value_display(&self) -> String {
        match self.value {
            Some(v) => format!("{v:?}"),
            None => UNBOUNDED_SENTINEL.to_string(),
        }
    }

    /// `name,status,elapsed,value`
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{}",
            self.name,
            self.status,
            self.elapsed_display(),
            self.value_display()
        )
    }

    /// One JSON object carrying the full outcome.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let record = OutcomeRecord {
            name: &self.name,
            status: self.status,
            elapsed_seconds: self.elapsed.as_secs_f64(),
            value: self.value_display(),
            model: self.model.as_deref(),
            evaluations: self.evaluations,
            iterations: self.iterations,
            error: self.error.as_deref(),
        };
        serde_json::to_string(&record)
    }
}

// The value travels as a string so NaN/inf and the INF sentinel survive JSON.
#[derive(Serialize)]
struct OutcomeRecord<'a> {
    name: &'a str,
    status: SearchStatus,
    elapsed_seconds: f64,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}
