use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// How a batch is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceType {
    /// Plain lines for failed and warning tasks only.
    Simple,
    /// Live multi-row progress display.
    #[serde(rename = "progress", alias = "progressbar")]
    ProgressBar,
}

impl FromStr for ExperienceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "progress" | "progressbar" => Ok(Self::ProgressBar),
            other => Err(anyhow::anyhow!(
                "unknown experience '{other}' (expected 'simple' or 'progress')"
            )),
        }
    }
}

/// Options shared by every scheduler entry point.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOpts {
    /// `None` picks the progress display when the destination is interactive.
    pub experience: Option<ExperienceType>,

    /// Suppress per-task error and warning lines.
    pub quiet: bool,

    /// Worker cap; `None` means available parallelism.
    pub max_threads: Option<usize>,

    /// Live display refresh rate; `None` means 4 per second.
    pub refresh_per_second: Option<f64>,

    /// Transforms only: always give every task its own slot and log file.
    pub no_compress_tasks: bool,

    /// Transforms only: capture transform errors in the output instead of failing the task.
    pub return_exceptions: bool,

    /// Set from outside to stop workers from claiming further tasks.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ExecuteOpts {
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

/// Worker count when the caller sets no cap.
pub fn available_parallelism() -> usize {
    num_cpus::get().max(1)
}
