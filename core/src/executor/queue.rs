use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::error::{ExecutorError, TaskError};
use crate::output::Scope;

use super::engine::run_workers;
use super::experience::{with_experience, Experience};
use super::run_dir::RunDirectory;
use super::runner::{execute_task, panic_message, RunContext};
use super::status::StatusFactory;
use super::types::{
    available_parallelism, ExecuteFn, ExecuteOpts, ExecutionOutcome, PrepareFn, PrepareOutcome,
    QueueExecuteFn, QueuePrepareFn, TaskData,
};

/// Row title shown while a worker waits for work.
pub const IDLE_TITLE: &str = "Waiting for tasks...";

struct QueueItem<'env> {
    description: String,
    prepare: QueuePrepareFn<'env>,
}

/// Handle for submitting work to a running [`yield_queue_executor`].
///
/// Dropping the handle closes the queue; workers finish what is queued and exit.
pub struct Enqueue<'env> {
    sender: Sender<QueueItem<'env>>,
}

impl<'env> Enqueue<'env> {
    /// Submit a task. `prepare` receives a simple-status callback and returns the execute
    /// callable, optionally with a step count; execute returns an optional short description.
    pub fn enqueue<F>(&self, description: impl Into<String>, prepare: F)
    where
        F: FnOnce(&dyn Fn(&str)) -> Result<PrepareOutcome<QueueExecuteFn<'env>>, TaskError>
            + Send
            + 'env,
    {
        let description = description.into();
        debug!(task = %description, "enqueued");

        let item = QueueItem {
            description,
            prepare: Box::new(prepare),
        };
        if let Err(e) = self.sender.send(item) {
            let item = e.into_inner();
            warn!(task = %item.description, "queue is closed; task dropped");
        }
    }
}

/// Run `body` with an [`Enqueue`] handle while a pool of workers executes submitted tasks in
/// FIFO order.
///
/// The pool has `opts.max_threads` workers (available parallelism by default), each owning one
/// status row and one log file. When `body` returns, the queue is closed and drained before the
/// workers are joined. Queue tasks always succeed with result `0` unless they fail.
pub fn yield_queue_executor<'env, R>(
    scope: &Scope,
    desc: &str,
    opts: &ExecuteOpts,
    body: impl FnOnce(&Enqueue<'env>) -> R,
) -> Result<R, ExecutorError> {
    let run_dir = RunDirectory::create(scope)?;
    let num_workers = opts
        .max_threads
        .filter(|n| *n > 0)
        .unwrap_or_else(available_parallelism);

    let (sender, receiver) = crossbeam_channel::unbounded::<QueueItem<'env>>();

    let outcome = with_experience(scope, desc, None, num_workers, opts, |experience| {
        info!(desc, workers = num_workers, "starting queue executor");
        let interrupted = AtomicBool::new(false);

        let worker = |worker: usize| -> Result<(), ExecutorError> {
            let factory = experience.factories[worker].as_ref();
            factory.reset(IDLE_TITLE);

            let outcome = drain_queue(
                desc,
                &receiver,
                &run_dir,
                experience,
                factory,
                worker,
                &interrupted,
                opts,
            );
            factory.stop();

            if outcome.is_err() {
                interrupted.store(true, Ordering::SeqCst);
            }
            outcome
        };

        std::thread::scope(|s| {
            let pool = s.spawn(|| run_workers(num_workers, worker));

            // the handle drops at the end of this block, also when `body` panics
            let output = {
                let enqueue = Enqueue { sender };
                body(&enqueue)
            };

            pool.join()
                .unwrap_or_else(|payload| {
                    Err(ExecutorError::Worker(panic_message(payload.as_ref())))
                })
                .map(|()| output)
        })
    });

    drop(run_dir);
    outcome
}

fn drain_queue(
    desc: &str,
    receiver: &Receiver<QueueItem<'_>>,
    run_dir: &RunDirectory<'_>,
    experience: &Experience<'_>,
    factory: &dyn StatusFactory,
    worker: usize,
    interrupted: &AtomicBool,
    opts: &ExecuteOpts,
) -> Result<(), ExecutorError> {
    let run = RunContext {
        desc,
        factory,
        reporter: experience.reporter,
        is_debug: experience.is_debug,
    };

    for item in receiver.iter() {
        if interrupted.load(Ordering::SeqCst) {
            return Ok(());
        }
        if opts.is_cancelled() {
            debug!(worker, "cancellation requested");
            return Err(ExecutorError::interrupted());
        }

        let QueueItem {
            description,
            prepare,
        } = item;
        let mut task = TaskData::new(description, ());
        let log_path = run_dir.log_path(worker);

        execute_task(&run, task.split(), move |_| {
            Ok((log_path, into_prepare_fn(prepare)))
        })?;

        factory.reset(IDLE_TITLE);
    }

    Ok(())
}

fn into_prepare_fn<'env>(prepare: QueuePrepareFn<'env>) -> PrepareFn<'env> {
    Box::new(move |on_status| {
        let outcome = prepare(on_status)?;
        Ok(outcome.map(|execute: QueueExecuteFn<'env>| -> ExecuteFn<'env> {
            Box::new(move |status| {
                let short_desc = execute(status)?;
                Ok(ExecutionOutcome::Described(0, short_desc))
            })
        }))
    })
}
