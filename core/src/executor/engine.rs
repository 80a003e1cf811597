use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::{ExecutorError, TaskError};
use crate::output::Scope;

use super::experience::{with_experience, Experience};
use super::runner::{execute_task, panic_message, RunContext};
use super::status::StatusFactory;
use super::types::{available_parallelism, ExecuteOpts, PrepareFn, TaskData, TaskRef};

/// Which task a worker claimed, and on which worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Claim {
    pub index: usize,
    pub worker: usize,
}

/// How status slots map onto tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotMode {
    /// One slot per task; retired as soon as its task completes.
    PerTask,
    /// One slot per worker, reused for every task that worker claims.
    PerWorker,
}

/// Execute `tasks` and record each task's result, short description, execution time and log
/// file.
///
/// `init` receives a task's context and returns its log file path plus the prepare callable.
/// A single task, or `max_threads == Some(1)`, runs sequentially on the calling thread in input
/// order; otherwise a bounded pool of worker threads claims tasks in input order. The batch
/// outcome lands in `scope`'s result; individual task failures never surface as `Err`.
pub fn execute_tasks<'a, 'f, C, I>(
    scope: &Scope,
    desc: &str,
    tasks: &'a mut [TaskData<C>],
    init: I,
    opts: &ExecuteOpts,
) -> Result<(), ExecutorError>
where
    C: Sync,
    I: Fn(&'a C) -> Result<(PathBuf, PrepareFn<'f>), TaskError> + Sync,
{
    let num_tasks = tasks.len();

    with_experience(scope, desc, Some(num_tasks), num_tasks, opts, |experience| {
        let sequential = num_tasks == 1 || opts.max_threads == Some(1);
        let num_workers = if sequential {
            1
        } else {
            opts.max_threads
                .unwrap_or_else(available_parallelism)
                .min(num_tasks)
        };

        dispatch_tasks(
            desc,
            tasks,
            |_, context| init(context),
            experience,
            num_workers,
            SlotMode::PerTask,
            opts,
        )
    })
}

/// Run `tasks` on `num_workers` workers; a single worker runs on the calling thread.
pub(crate) fn dispatch_tasks<'a, 'f, C, I>(
    desc: &str,
    tasks: &'a mut [TaskData<C>],
    init: I,
    experience: &Experience<'_>,
    num_workers: usize,
    mode: SlotMode,
    opts: &ExecuteOpts,
) -> Result<(), ExecutorError>
where
    C: Sync,
    I: Fn(Claim, &'a C) -> Result<(PathBuf, PrepareFn<'f>), TaskError> + Sync,
{
    let slots: Vec<Mutex<Option<TaskRef<'a, C>>>> = tasks
        .iter_mut()
        .map(|task| Mutex::new(Some(task.split())))
        .collect();

    info!(desc, tasks = slots.len(), workers = num_workers, ?mode, "dispatching tasks");

    let cursor = AtomicUsize::new(0);
    let interrupted = AtomicBool::new(false);

    let worker = |worker: usize| -> Result<(), ExecutorError> {
        let outcome = run_claims(
            desc,
            &slots,
            &cursor,
            &interrupted,
            &init,
            experience,
            worker,
            mode,
            opts,
        );

        if mode == SlotMode::PerWorker {
            if let Some(factory) = experience.factories.get(worker) {
                factory.stop();
            }
        }

        if outcome.is_err() {
            interrupted.store(true, Ordering::SeqCst);
        }
        outcome
    };

    if num_workers <= 1 {
        worker(0)
    } else {
        run_workers(num_workers, worker)
    }
}

fn run_claims<'a, 'f, C, I>(
    desc: &str,
    slots: &[Mutex<Option<TaskRef<'a, C>>>],
    cursor: &AtomicUsize,
    interrupted: &AtomicBool,
    init: &I,
    experience: &Experience<'_>,
    worker: usize,
    mode: SlotMode,
    opts: &ExecuteOpts,
) -> Result<(), ExecutorError>
where
    I: Fn(Claim, &'a C) -> Result<(PathBuf, PrepareFn<'f>), TaskError> + Sync,
{
    loop {
        if interrupted.load(Ordering::SeqCst) {
            return Ok(());
        }
        if opts.is_cancelled() {
            debug!(worker, "cancellation requested");
            return Err(ExecutorError::interrupted());
        }

        let index = cursor.fetch_add(1, Ordering::SeqCst);
        let Some(slot) = slots.get(index) else {
            return Ok(());
        };
        let Some(task) = slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        else {
            continue;
        };

        let claim = Claim { index, worker };
        let factory: &dyn StatusFactory = match mode {
            SlotMode::PerTask => experience.factories[index].as_ref(),
            SlotMode::PerWorker => experience.factories[worker].as_ref(),
        };

        let run = RunContext {
            desc,
            factory,
            reporter: experience.reporter,
            is_debug: experience.is_debug,
        };

        let outcome = execute_task(&run, task, |context| init(claim, context));

        if mode == SlotMode::PerTask {
            factory.stop();
        }

        outcome?;
    }
}

/// Run `worker(0..num_workers)` on scoped OS threads and join them all.
///
/// The first error wins; a worker thread that panicked is reported as `ExecutorError::Worker`.
pub(crate) fn run_workers<F>(num_workers: usize, worker: F) -> Result<(), ExecutorError>
where
    F: Fn(usize) -> Result<(), ExecutorError> + Sync,
{
    std::thread::scope(|s| {
        let worker = &worker;
        let mut first_error: Option<ExecutorError> = None;

        let handles: Vec<_> = (0..num_workers)
            .map(|index| {
                std::thread::Builder::new()
                    .name(format!("tasker-worker-{index}"))
                    .spawn_scoped(s, move || worker(index))
            })
            .collect();

        for handle in handles {
            let outcome = match handle {
                Ok(handle) => match handle.join() {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(ExecutorError::Worker(panic_message(payload.as_ref()))),
                },
                Err(e) => Err(ExecutorError::Io(e)),
            };

            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })
}
