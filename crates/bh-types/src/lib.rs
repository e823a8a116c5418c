pub mod config;
pub mod descriptor;
pub mod errors;
pub mod objective;
pub mod outcome;

pub use config::*;
pub use descriptor::*;
pub use errors::*;
pub use objective::*;
pub use outcome::*;
