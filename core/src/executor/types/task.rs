use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::output::DEFAULT_COLUMNS;

/// Result recorded when the task machinery itself failed (as opposed to the task's own logic).
pub const CATASTROPHIC_TASK_FAILURE_RESULT: i32 = -123;

pub const DISPLAY_COLUMN_WIDTH: usize = DEFAULT_COLUMNS / 2;
pub const STATUS_COLUMN_WIDTH: usize = DEFAULT_COLUMNS * 3 / 10;

/// Lock shared by tasks that must never execute at the same time.
pub type ExecutionLock = Arc<Mutex<()>>;

/// One unit of dispatchable work plus its outcome slots.
///
/// `display`, `context` and `execution_lock` are filled in by the caller. The remaining fields
/// are written once by the runner that executes the record.
#[derive(Debug)]
pub struct TaskData<C> {
    pub display: String,
    pub context: C,
    pub execution_lock: Option<ExecutionLock>,

    pub result: Option<i32>,
    pub short_desc: Option<String>,
    pub execution_time: Option<Duration>,
    pub log_filename: Option<PathBuf>,
}

impl<C> TaskData<C> {
    pub fn new(display: impl Into<String>, context: C) -> Self {
        Self {
            display: display.into(),
            context,
            execution_lock: None,
            result: None,
            short_desc: None,
            execution_time: None,
            log_filename: None,
        }
    }

    pub fn with_lock(mut self, lock: ExecutionLock) -> Self {
        self.execution_lock = Some(lock);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// Borrow the caller-owned fields immutably and the outcome slots mutably, so the context
    /// can be lent to callbacks while the runner records the outcome.
    pub(crate) fn split(&mut self) -> TaskRef<'_, C> {
        let TaskData {
            display,
            context,
            execution_lock,
            result,
            short_desc,
            execution_time,
            log_filename,
        } = self;

        TaskRef {
            display: display.as_str(),
            context,
            execution_lock: execution_lock.as_ref(),
            outcome: TaskOutcome {
                result,
                short_desc,
                execution_time,
                log_filename,
            },
        }
    }
}

pub(crate) struct TaskRef<'a, C> {
    pub display: &'a str,
    pub context: &'a C,
    pub execution_lock: Option<&'a ExecutionLock>,
    pub outcome: TaskOutcome<'a>,
}

pub(crate) struct TaskOutcome<'a> {
    pub result: &'a mut Option<i32>,
    pub short_desc: &'a mut Option<String>,
    pub execution_time: &'a mut Option<Duration>,
    pub log_filename: &'a mut Option<PathBuf>,
}

/// Read-only view of a completed task, handed to completion reporters.
#[derive(Debug, Clone, Copy)]
pub struct TaskSummary<'a> {
    pub display: &'a str,
    pub result: i32,
    pub short_desc: Option<&'a str>,
    pub log_filename: Option<&'a Path>,
}
