//! Task execution engine.
//!
//! Runs many independent tasks across a bounded pool of OS threads while rendering progress and
//! writing one log file per task (or per worker).
//!
//! # Architecture
//!
//! ```text
//! &mut [TaskData<C>] ──► execute_tasks / transform_tasks ──► dispatch_tasks
//!                                                              │  shared cursor
//! Enqueue ──► yield_queue_executor ──► FIFO + condvar          ▼
//!                                        │              worker threads
//!                                        ▼                     │
//!                                   execute_task: init → prepare → lock → execute
//!                                        │
//!                                        ▼
//!                     StatusFactory (silent | live) + CompletionReporter
//!                                        │
//!                                        ▼
//!                        ResultAggregator ──► Scope result + DONE summary
//! ```
//!
//! Task failures never surface as `Err`: they are classified into the task's result code
//! (`1` for transform errors, [`CATASTROPHIC_TASK_FAILURE_RESULT`] for anything else) and
//! escalated into the enclosing scope. Only interruption and infrastructure failures are
//! returned as [`ExecutorError`](crate::error::ExecutorError).

pub mod aggregate;
mod engine;
pub(crate) mod experience;
mod queue;
pub mod run_dir;
pub(crate) mod runner;
pub mod status;
mod transform;
pub mod types;

pub use aggregate::{Counters, ResultAggregator};
pub use engine::execute_tasks;
pub use queue::{yield_queue_executor, Enqueue, IDLE_TITLE};
pub use run_dir::RunDirectory;
pub use status::{CompletionReporter, InternalStatus, Status, StatusFactory};
pub use transform::{transform_tasks, transform_tasks_ex, TransformResult};
pub use types::{
    available_parallelism, ExecuteFn, ExecuteOpts, ExecutionLock, ExecutionOutcome,
    ExperienceType, PrepareFn, PrepareOutcome, QueueExecuteFn, QueuePrepareFn, TaskData,
    TaskSummary, TransformFn, TransformOutcome, CATASTROPHIC_TASK_FAILURE_RESULT,
};
