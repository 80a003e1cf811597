#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tasker_core::{
    BufferSink, ExecuteFn, ExecuteOpts, ExecutionOutcome, ExperienceType, PrepareFn,
    PrepareOutcome, Scope, ScopeFlags, TaskData,
};

/// Top-level scope writing into a headless buffer.
pub fn headless_scope(heading: &str) -> (Scope, BufferSink) {
    let sink = BufferSink::new();
    let scope = Scope::create(Arc::new(sink.clone()), heading, ScopeFlags::default());
    (scope, sink)
}

pub fn tasks<C>(contexts: impl IntoIterator<Item = C>) -> Vec<TaskData<C>> {
    contexts
        .into_iter()
        .enumerate()
        .map(|(index, context)| TaskData::new(format!("task {index}"), context))
        .collect()
}

pub fn simple_opts(max_threads: Option<usize>) -> ExecuteOpts {
    ExecuteOpts {
        experience: Some(ExperienceType::Simple),
        max_threads,
        ..ExecuteOpts::default()
    }
}

pub fn log_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("task-{index}.log"))
}

/// Prepare callable whose execute logs one line and returns `code`.
pub fn prepare_returning(code: i32) -> PrepareFn<'static> {
    Box::new(move |_on_status| {
        let execute: ExecuteFn<'static> = Box::new(move |status| {
            status.log(&format!("returning {code}"));
            Ok(ExecutionOutcome::Simple(code))
        });
        Ok(PrepareOutcome::Simple(execute))
    })
}

/// Prepare callable whose execute returns `code` without touching its log.
pub fn prepare_silent(code: i32) -> PrepareFn<'static> {
    Box::new(move |_on_status| {
        let execute: ExecuteFn<'static> = Box::new(move |_| Ok(ExecutionOutcome::Simple(code)));
        Ok(PrepareOutcome::Simple(execute))
    })
}

pub fn live_opts(max_threads: Option<usize>) -> ExecuteOpts {
    ExecuteOpts {
        experience: Some(ExperienceType::ProgressBar),
        max_threads,
        ..ExecuteOpts::default()
    }
}

/// Replace the elapsed time in every `DONE! (<result>, <time>...)` line with `<time>`.
pub fn scrub_elapsed(content: &str) -> String {
    const MARKER: &str = "DONE! (";

    let mut out = String::new();
    let mut rest = content;
    while let Some(start) = rest.find(MARKER) {
        let (head, tail) = rest.split_at(start + MARKER.len());
        out.push_str(head);

        let Some(result_end) = tail.find(", ") else {
            rest = tail;
            continue;
        };
        out.push_str(&tail[..result_end + 2]);
        out.push_str("<time>");

        let after = &tail[result_end + 2..];
        let time_end = after.find([',', ')']).unwrap_or(after.len());
        rest = &after[time_end..];
    }
    out.push_str(rest);
    out
}
