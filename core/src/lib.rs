//! tasker-core: run many independent units of work across a bounded pool of worker threads
//! while rendering a coherent progress display and producing per-task logs.

pub mod config;
pub mod error;
pub mod executor;
pub mod output;

pub use error::{CliError, ExecutorError, TaskError};
pub use executor::{
    execute_tasks, transform_tasks, transform_tasks_ex, yield_queue_executor, Enqueue,
    ExecuteFn, ExecuteOpts, ExecutionLock, ExecutionOutcome, ExperienceType, PrepareFn,
    PrepareOutcome, QueueExecuteFn, QueuePrepareFn, Status, TaskData, TaskSummary, TransformFn,
    TransformOutcome, TransformResult, CATASTROPHIC_TASK_FAILURE_RESULT,
};
pub use output::{BufferSink, Capabilities, OutputSink, Scope, ScopeFlags, StdoutSink};
