use std::any::Any;
use std::cell::Cell;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::{ExecutorError, TaskError};
use crate::executor::status::{CompletionReporter, InternalStatus, StatusFactory};
use crate::executor::types::{
    ExecutionLock, PrepareFn, TaskRef, TaskSummary, CATASTROPHIC_TASK_FAILURE_RESULT,
};

const WAITING_STATUS: &str = "Waiting...";

thread_local! {
    static RUNNING_TASK: Cell<bool> = const { Cell::new(false) };
}

fn running_task() -> bool {
    RUNNING_TASK.with(Cell::get)
}

/// Keeps the panic hook from printing panics raised inside a task runner while alive. Those
/// panics are recorded in the task's log instead; every other panic still reaches the previous
/// hook. The previous hook is reinstalled on drop.
pub(crate) struct QuietTaskPanics {
    restore: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl QuietTaskPanics {
    pub fn install() -> Self {
        let previous: Arc<dyn Fn(&panic::PanicHookInfo<'_>) + Sync + Send> =
            Arc::from(panic::take_hook());
        let fallback = Arc::clone(&previous);

        panic::set_hook(Box::new(move |info| {
            if !running_task() {
                fallback(info);
            }
        }));

        Self {
            restore: Some(Box::new(move || {
                drop(panic::take_hook());
                panic::set_hook(Box::new(move |info| previous(info)));
            })),
        }
    }
}

impl Drop for QuietTaskPanics {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
        }
    }
}

/// Everything a runner needs besides the task itself.
pub(crate) struct RunContext<'r> {
    /// Batch description, used in catastrophic failure descriptions.
    pub desc: &'r str,
    pub factory: &'r dyn StatusFactory,
    pub reporter: &'r dyn CompletionReporter,
    pub is_debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initializing,
    Preparing,
    WaitingForLock,
    Executing,
}

enum Failure {
    Task(TaskError),
    Panic(String),
}

/// Drive one task through init, prepare, the optional execution lock and execute.
///
/// Finalization always runs: buffered status messages are appended to the task's log, the
/// elapsed time is recorded and the reporter sees the task exactly once. A task that returns
/// `TaskError::Interrupted` gets no result and is not reported; the interruption is returned
/// so the scheduler can unwind the batch.
pub(crate) fn execute_task<'a, 'f, C, I>(
    run: &RunContext<'_>,
    task: TaskRef<'a, C>,
    init: I,
) -> Result<(), ExecutorError>
where
    I: FnOnce(&'a C) -> Result<(PathBuf, PrepareFn<'f>), TaskError>,
{
    let TaskRef {
        display: task_name,
        context,
        execution_lock,
        outcome,
    } = task;

    let started = Instant::now();
    let status = run.factory.create(task_name);

    let mut phase = Phase::Initializing;
    let was_running = RUNNING_TASK.with(|flag| flag.replace(true));
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        run_phases(
            task_name,
            context,
            execution_lock,
            init,
            &*status,
            outcome.log_filename,
            &mut phase,
        )
    }));
    RUNNING_TASK.with(|flag| flag.set(was_running));

    let mut interrupted = false;
    let failure = match attempt {
        Ok(Ok((result, short_desc))) => {
            *outcome.result = Some(result);
            *outcome.short_desc = short_desc;
            None
        }
        Ok(Err(TaskError::Interrupted)) => {
            interrupted = true;
            None
        }
        Ok(Err(err)) => Some(Failure::Task(err)),
        Err(payload) => Some(Failure::Panic(panic_message(payload.as_ref()))),
    };

    if let Some(failure) = failure {
        let (result, short_desc) = match &failure {
            Failure::Task(TaskError::Transform(_)) => (1, format!("{task_name} failed")),
            _ => (
                CATASTROPHIC_TASK_FAILURE_RESULT,
                format!("{} failed", run.desc),
            ),
        };

        let error = describe_failure(&failure, run.is_debug);
        if result == CATASTROPHIC_TASK_FAILURE_RESULT {
            warn!(task = task_name, phase = ?phase, error = %error, "task failed catastrophically");
        } else {
            debug!(task = task_name, phase = ?phase, "task failed");
        }

        record_failure(outcome.log_filename, &error);
        *outcome.result = Some(result);
        *outcome.short_desc = Some(short_desc);
    }

    let log_messages = status.log_messages();
    drop(status);

    // the log file exists once the task is finished, even when nothing was written to it
    match outcome.log_filename.as_deref() {
        Some(path) => {
            let content = if log_messages.is_empty() {
                String::new()
            } else {
                format!("\n\n{log_messages}\n")
            };
            if let Err(e) = append(path, &content) {
                warn!(task = task_name, error = %e, "failed to finalize task log");
            }
        }
        None if !log_messages.is_empty() => {
            debug!(task = task_name, "dropping status log; no log file")
        }
        None => {}
    }

    let elapsed = started.elapsed();
    *outcome.execution_time = Some(elapsed);

    if interrupted {
        debug!(task = task_name, phase = ?phase, "task interrupted");
        return Err(ExecutorError::interrupted());
    }

    let result = outcome.result.unwrap_or(CATASTROPHIC_TASK_FAILURE_RESULT);
    debug!(task = task_name, result, elapsed_ms = elapsed.as_millis() as u64, "task completed");

    run.reporter.on_complete(&TaskSummary {
        display: task_name,
        result,
        short_desc: outcome.short_desc.as_deref(),
        log_filename: outcome.log_filename.as_deref(),
    });

    Ok(())
}

fn run_phases<'a, 'f, C, I>(
    task_name: &str,
    context: &'a C,
    execution_lock: Option<&ExecutionLock>,
    init: I,
    status: &dyn InternalStatus,
    log_filename: &mut Option<PathBuf>,
    phase: &mut Phase,
) -> Result<(i32, Option<String>), TaskError>
where
    I: FnOnce(&'a C) -> Result<(PathBuf, PrepareFn<'f>), TaskError>,
{
    debug!(task = task_name, phase = ?phase);
    let (log_path, prepare) = init(context)?;
    *log_filename = Some(log_path);

    *phase = Phase::Preparing;
    debug!(task = task_name, phase = ?phase);
    let on_simple_status = |value: &str| {
        status.on_progress(None, Some(value));
    };
    let (num_steps, execute) = prepare(&on_simple_status)?.into_parts();

    let _guard = match execution_lock {
        Some(lock) => {
            *phase = Phase::WaitingForLock;
            debug!(task = task_name, phase = ?phase);
            on_simple_status(WAITING_STATUS);
            Some(lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
        }
        None => None,
    };

    *phase = Phase::Executing;
    debug!(task = task_name, phase = ?phase, num_steps);
    if num_steps.is_some() {
        status.set_num_steps(num_steps);
    }

    Ok(execute(status.as_status())?.into_parts())
}

fn describe_failure(failure: &Failure, is_debug: bool) -> String {
    match failure {
        Failure::Task(err) => {
            let full = format!("{err:?}");
            let message = if is_debug { full.clone() } else { err.to_string() };
            let message = message.trim();

            if message.is_empty() {
                full.trim().to_string()
            } else {
                message.to_string()
            }
        }
        Failure::Panic(message) => format!("panic: {message}"),
    }
}

/// Write `error` to the task's log, creating a fresh log file if the task never got one.
fn record_failure(log_filename: &mut Option<PathBuf>, error: &str) {
    match log_filename.as_deref() {
        Some(path) => {
            if let Err(e) = append(path, &format!("\n\n{error}\n")) {
                warn!(path = %path.display(), error = %e, "failed to append failure to task log");
            }
        }
        None => match create_fallback_log(error) {
            Ok(path) => *log_filename = Some(path),
            Err(e) => warn!(error = %e, "failed to create fallback task log"),
        },
    }
}

fn create_fallback_log(content: &str) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("tasker-")
        .suffix(".log")
        .tempfile()?;
    file.write_all(content.as_bytes())?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

fn append(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(content.as_bytes())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
