#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;
pub mod task;

pub use error::CliError;
pub use executor::ExecutorError;
pub use task::TaskError;
