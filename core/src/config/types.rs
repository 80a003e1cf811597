use serde::{Deserialize, Serialize};

use crate::executor::{ExecuteOpts, ExperienceType};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "warn" or "tasker_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    // stdout belongs to the task display; diagnostics stay off the console unless asked for
    false
}

fn default_logging_file() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// Defaults for every batch the host runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Worker cap; unset means available parallelism.
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Live display refresh rate; unset means 4 per second.
    #[serde(default)]
    pub refresh_per_second: Option<f64>,

    #[serde(default)]
    pub no_compress_tasks: bool,

    #[serde(default)]
    pub quiet: bool,

    /// Unset picks the progress display on interactive terminals.
    #[serde(default)]
    pub experience: Option<ExperienceType>,
}

impl ExecutionConfig {
    pub fn to_execute_opts(&self) -> ExecuteOpts {
        ExecuteOpts {
            experience: self.experience,
            quiet: self.quiet,
            max_threads: self.max_threads.filter(|n| *n > 0),
            refresh_per_second: self.refresh_per_second.filter(|hz| *hz > 0.0),
            no_compress_tasks: self.no_compress_tasks,
            ..ExecuteOpts::default()
        }
    }
}
