//! Sequential batch over every function in the descriptor file.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use bh_types::{
    load_descriptors, BhResult, SearchConfig, SearchOutcome, SearchStatus, DESCRIPTOR_FILE_NAME,
};
use tracing::info;

use crate::library::{NativeLibrary, ObjectiveRegistry};
use crate::runner::SearchRunner;

/// Result line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `name,status,elapsed,value`
    #[default]
    Csv,
    /// One JSON object per line.
    Json,
}

impl OutputFormat {
    pub fn render(&self, outcome: &SearchOutcome) -> BhResult<String> {
        match self {
            Self::Csv => Ok(outcome.to_csv_line()),
            Self::Json => Ok(outcome.to_json_line()?),
        }
    }
}

/// Counts per status over one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub satisfied: usize,
    pub unsatisfied: usize,
    pub timed_out: usize,
    pub errored: usize,
    pub total_elapsed: Duration,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &SearchOutcome) {
        match outcome.status {
            SearchStatus::Satisfied => self.satisfied += 1,
            SearchStatus::Unsatisfied => self.unsatisfied += 1,
            SearchStatus::TimedOut => self.timed_out += 1,
            SearchStatus::Errored => self.errored += 1,
        }
        self.total_elapsed += outcome.elapsed;
    }

    pub fn total(&self) -> usize {
        self.satisfied + self.unsatisfied + self.timed_out + self.errored
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} functions: {} sat, {} unsat, {} timeout, {} error in {:.3}s",
            self.total(),
            self.satisfied,
            self.unsatisfied,
            self.timed_out,
            self.errored,
            self.total_elapsed.as_secs_f64()
        )
    }
}

/// Runs the bounded search over every registered objective, in order.
#[derive(Debug)]
pub struct BatchDriver {
    registry: ObjectiveRegistry,
    runner: SearchRunner,
    config: SearchConfig,
    format: OutputFormat,
}

impl BatchDriver {
    pub fn new(registry: ObjectiveRegistry, config: SearchConfig) -> BhResult<Self> {
        config.validate()?;
        let runner = SearchRunner::from_config(&config)?;
        Ok(Self {
            registry,
            runner,
            config,
            format: OutputFormat::default(),
        })
    }

    /// Read the descriptor file in `lib_dir`, load the objective library next
    /// to it and bind every descriptor.
    ///
    /// Fails before any search runs if either file cannot be read or any
    /// descriptor has no matching entry point.
    pub fn from_lib_dir<P: AsRef<Path>>(lib_dir: P, config: SearchConfig) -> BhResult<Self> {
        let lib_dir = lib_dir.as_ref();
        let descriptors = load_descriptors(lib_dir.join(DESCRIPTOR_FILE_NAME))?;
        info!("Read {} function descriptors", descriptors.len());
        let library = NativeLibrary::open_in(lib_dir)?;
        let registry = ObjectiveRegistry::resolve(&library, &descriptors)?;
        Self::new(registry, config)
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_runner(mut self, runner: SearchRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn registry(&self) -> &ObjectiveRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search every objective and write one line per function to `out`,
    /// flushing after each.
    pub fn run_all<W: Write>(&self, out: &mut W) -> BhResult<BatchSummary> {
        info!("Running batch of {} functions with {}", self.registry.len(), self.config);
        let mut summary = BatchSummary::default();

        for objective in self.registry.iter() {
            let initial = objective.initial_point();
            let outcome = self.runner.run(objective.clone(), initial, &self.config);
            writeln!(out, "{}", self.format.render(&outcome)?)?;
            out.flush()?;
            summary.record(&outcome);
        }

        info!("Batch complete: {}", summary);
        Ok(summary)
    }
}
