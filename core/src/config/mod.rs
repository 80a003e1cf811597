mod load;
mod types;

pub use load::{get_tasker_data_dir, load_default, load_from_str};
pub use types::{AppConfig, ExecutionConfig, LoggingConfig};
