use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::{ExecutorError, TaskError};
use crate::output::Scope;

use super::engine::{dispatch_tasks, Claim, SlotMode};
use super::experience::with_experience;
use super::run_dir::RunDirectory;
use super::status::Status;
use super::types::{
    available_parallelism, ExecuteFn, ExecuteOpts, ExecutionOutcome, PrepareFn, PrepareOutcome,
    TaskData, TransformFn, TransformOutcome,
};

/// Output slot of one transformed task: `None` when the task failed without its error being
/// captured.
pub type TransformResult<T> = Option<Result<T, TaskError>>;

type Slot<T> = Mutex<TransformResult<T>>;

/// Thread count and dispatch strategy for a transform batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ThreadPlan {
    pub num_threads: usize,
    /// Share one slot and log file per worker instead of one per task.
    pub compressed: bool,
}

pub(crate) fn plan_threads(
    num_tasks: usize,
    parallelism: usize,
    max_threads: Option<usize>,
    no_compress_tasks: bool,
) -> ThreadPlan {
    let mut num_threads = num_tasks.min(parallelism);
    if let Some(max_threads) = max_threads.filter(|n| *n > 0) {
        num_threads = num_threads.min(max_threads);
    }

    let compressed = !(no_compress_tasks || num_threads < parallelism || num_threads == 1);
    ThreadPlan {
        num_threads,
        compressed,
    }
}

/// Transform every task's context into a value, returned index-aligned with `tasks`.
///
/// `prepare` receives the context and a simple-status callback and returns the transform,
/// optionally with a step count. With `opts.return_exceptions` a failing transform stores its
/// error in the output slot and the task gets result `-1`; otherwise the error is classified by
/// the runner and the slot stays `None`. Interruptions are never captured.
///
/// When there are at least as many tasks as available parallelism the batch is "compressed":
/// each worker keeps one status row and one log file for all the tasks it claims.
pub fn transform_tasks_ex<'a, 'f, C, T, P>(
    scope: &Scope,
    desc: &str,
    tasks: &'a mut [TaskData<C>],
    prepare: P,
    opts: &ExecuteOpts,
) -> Result<Vec<TransformResult<T>>, ExecutorError>
where
    C: Sync,
    T: Send,
    P: Fn(&'a C, &dyn Fn(&str)) -> Result<PrepareOutcome<TransformFn<'f, T>>, TaskError> + Sync,
{
    let run_dir = RunDirectory::create(scope)?;

    let num_tasks = tasks.len();
    let plan = plan_threads(
        num_tasks,
        available_parallelism(),
        opts.max_threads,
        opts.no_compress_tasks,
    );
    debug!(num_tasks, ?plan, "planned transform batch");

    let results: Vec<Slot<T>> = (0..num_tasks).map(|_| Mutex::new(None)).collect();
    let return_exceptions = opts.return_exceptions;

    let (num_slots, mode) = if plan.compressed {
        (plan.num_threads, SlotMode::PerWorker)
    } else {
        (num_tasks, SlotMode::PerTask)
    };
    let num_workers = if num_tasks == 1 { 1 } else { plan.num_threads };

    let init = |claim: Claim, context: &'a C| {
        let log_slot = match mode {
            SlotMode::PerTask => claim.index,
            SlotMode::PerWorker => claim.worker,
        };
        let slot = &results[claim.index];
        let prepare = &prepare;

        let prepare_fn: PrepareFn<'_> = Box::new(move |on_status| {
            let outcome = prepare(context, on_status)?;
            Ok(outcome.map(|transform| wrap_transform(transform, slot, return_exceptions)))
        });

        Ok::<_, TaskError>((run_dir.log_path(log_slot), prepare_fn))
    };

    let outcome = with_experience(scope, desc, Some(num_tasks), num_slots, opts, |experience| {
        dispatch_tasks(desc, tasks, init, experience, num_workers, mode, opts)
    });

    drop(run_dir);
    outcome?;

    Ok(results
        .into_iter()
        .map(|slot| slot.into_inner().unwrap_or_else(PoisonError::into_inner))
        .collect())
}

/// Single-step form of [`transform_tasks_ex`]: `transform` runs directly with the context and
/// the task's status handle.
pub fn transform_tasks<'a, C, T, F>(
    scope: &Scope,
    desc: &str,
    tasks: &'a mut [TaskData<C>],
    transform: F,
    opts: &ExecuteOpts,
) -> Result<Vec<TransformResult<T>>, ExecutorError>
where
    C: Sync,
    T: Send,
    F: Fn(&'a C, &dyn Status) -> Result<TransformOutcome<T>, TaskError> + Sync,
{
    let transform = &transform;

    transform_tasks_ex(
        scope,
        desc,
        tasks,
        move |context: &'a C, _on_status: &dyn Fn(&str)| {
            let transform_fn: TransformFn<'_, T> =
                Box::new(move |status| transform(context, status));
            Ok(PrepareOutcome::Simple(transform_fn))
        },
        opts,
    )
}

fn wrap_transform<'x, T>(
    transform: TransformFn<'x, T>,
    slot: &'x Slot<T>,
    return_exceptions: bool,
) -> ExecuteFn<'x> {
    Box::new(move |status| {
        let store = |value: Result<T, TaskError>| {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        };

        match transform(status) {
            Ok(outcome) => {
                let (value, return_code, short_desc) = outcome.into_parts();
                store(Ok(value));
                Ok(ExecutionOutcome::Described(return_code, short_desc))
            }
            Err(err) if return_exceptions && !err.is_interrupted() => {
                let message = err.to_string();
                store(Err(err));
                Ok(ExecutionOutcome::Described(-1, Some(message)))
            }
            Err(err) => Err(err),
        }
    })
}
