//! Orchestration for bhsat: binds native objectives, runs one bounded
//! basin-hopping search per function and reports sat/unsat/timeout/error.

pub mod batch;
pub mod deadline;
pub mod fpenv;
pub mod library;
pub mod optimizer;
pub mod runner;

pub use batch::{BatchDriver, BatchSummary, OutputFormat};
pub use deadline::SearchDeadline;
pub use fpenv::FpEnvGuard;
pub use library::{
    library_file_name, NativeLibrary, NativeObjective, ObjectiveRegistry, ObjectiveSource,
    RawObjectiveFn,
};
pub use optimizer::{BasinHoppingOptimizer, GlobalOptimizer, OptimizerReport};
pub use runner::SearchRunner;
