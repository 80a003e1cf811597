pub mod config;
pub mod outcome;
pub mod task;

pub use config::*;
pub use outcome::*;
pub use task::*;
