//! Per-task status handles and the renderers behind them.
//!
//! Task bodies only see [`Status`]. The runner drives the richer [`InternalStatus`] it gets
//! from a slot's [`StatusFactory`], and hands each finished task to the active
//! [`CompletionReporter`].

use std::path::Path;
use std::sync::Mutex;

use crate::executor::types::TaskSummary;
use crate::output::text;

pub mod live;
pub mod silent;

pub use live::{LiveOptions, LiveRenderer};
pub use silent::{SilentReporter, SilentStatusFactory};

/// Handle through which a running task reports progress.
pub trait Status: Send + Sync {
    fn set_title(&self, title: &str);

    /// Report progress; `step` is zero based and only meaningful once a step count is set.
    /// Returns `false` when the task should stop.
    fn on_progress(&self, step: Option<usize>, status: Option<&str>) -> bool;

    fn on_info(&self, value: &str, verbose: bool);

    /// Buffer a message for the task's log file.
    fn log(&self, message: &str);
}

pub trait InternalStatus: Status {
    /// `Some` switches the row into "(i of n)" mode; once set it stays fixed for the task.
    fn set_num_steps(&self, num_steps: Option<usize>);

    /// Buffered log messages joined by newlines.
    fn log_messages(&self) -> String;

    fn as_status(&self) -> &dyn Status;
}

/// One per concurrent slot. Dropping the handle returned by `create` ends the task's row.
pub trait StatusFactory: Send + Sync {
    fn create(&self, display: &str) -> Box<dyn InternalStatus + '_>;

    /// Show the slot as idle between tasks (queue workers).
    fn reset(&self, title: &str);

    /// Retire the slot.
    fn stop(&self);
}

/// Observes every completed task exactly once.
pub trait CompletionReporter: Sync {
    fn on_complete(&self, task: &TaskSummary<'_>);
}

#[derive(Debug, Default)]
pub struct LogBuffer {
    messages: Mutex<Vec<String>>,
}

impl LogBuffer {
    pub fn push(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
    }

    pub fn joined(&self) -> String {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .join("\n")
    }
}

/// `"<display>: <result>[ (<short desc>)]"`
pub(crate) fn completion_text(task: &TaskSummary<'_>) -> String {
    match task.short_desc {
        Some(short_desc) if !short_desc.is_empty() => {
            format!("{}: {} ({})", task.display, task.result, short_desc)
        }
        _ => format!("{}: {}", task.display, task.result),
    }
}

/// Plain path on headless destinations, a "View Log" hyperlink otherwise.
pub(crate) fn log_reference(path: &Path, is_headless: bool) -> String {
    if is_headless {
        path.display().to_string()
    } else {
        text::ansi_hyperlink(&text::file_url(path), "View Log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_log_buffer_joins_lines() {
        let buffer = LogBuffer::default();
        assert_eq!(buffer.joined(), "");
        buffer.push("one");
        buffer.push("two");
        assert_eq!(buffer.joined(), "one\ntwo");
    }

    #[test]
    fn test_completion_text() {
        let path = PathBuf::from("/tmp/x.log");
        let mut summary = TaskSummary {
            display: "build",
            result: -1,
            short_desc: None,
            log_filename: Some(&path),
        };
        assert_eq!(completion_text(&summary), "build: -1");

        summary.short_desc = Some("compile failed");
        assert_eq!(completion_text(&summary), "build: -1 (compile failed)");
    }

    #[test]
    fn test_log_reference() {
        let path = PathBuf::from("/tmp/x.log");
        assert_eq!(log_reference(&path, true), "/tmp/x.log");
        assert!(log_reference(&path, false).contains("file:///tmp/x.log"));
    }
}
