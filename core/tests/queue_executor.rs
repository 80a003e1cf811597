mod common;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use common::{headless_scope, scrub_elapsed, simple_opts};
use pretty_assertions::assert_eq;
use tasker_core::{
    yield_queue_executor, ExecuteOpts, ExecutorError, PrepareOutcome, QueueExecuteFn, TaskError,
};

#[test]
fn test_queue_runs_every_enqueued_task() {
    let (scope, sink) = headless_scope("Run");
    let seen = Mutex::new(Vec::new());

    let count = yield_queue_executor(&scope, "Queue", &simple_opts(Some(3)), |enqueue| {
        for index in 0..10usize {
            let seen = &seen;
            enqueue.enqueue(format!("item {index}"), move |_on_status| {
                let execute: QueueExecuteFn<'_> = Box::new(move |status| {
                    status.set_title(&format!("item {index}"));
                    seen.lock().unwrap().push(index);
                    Ok(Some(format!("handled {index}")))
                });
                Ok(PrepareOutcome::Simple(execute))
            });
        }
        10
    })
    .unwrap();
    assert_eq!(scope.finish(), 0);

    let mut seen = seen.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(count, 10);
    assert_eq!(seen, (0..10).collect::<Vec<_>>());
    assert_eq!(
        scrub_elapsed(&sink.contents()),
        "Run...\n  Queue...DONE! (0, <time>, 10 items succeeded, no items with errors, no items with warnings)\nDONE! (0, <time>)\n"
    );
}

#[test]
fn test_single_worker_is_fifo() {
    let (scope, _sink) = headless_scope("Run");
    let seen = Mutex::new(Vec::new());

    yield_queue_executor(&scope, "Queue", &simple_opts(Some(1)), |enqueue| {
        for index in 0..6usize {
            let seen = &seen;
            enqueue.enqueue(format!("item {index}"), move |_| {
                seen.lock().unwrap().push(index);
                let execute: QueueExecuteFn<'_> = Box::new(|_| Ok(None));
                Ok(PrepareOutcome::Simple(execute))
            });
        }
    })
    .unwrap();

    assert_eq!(seen.into_inner().unwrap(), (0..6).collect::<Vec<_>>());
}

#[test]
fn test_failed_queue_task_warns_and_keeps_logs() {
    let (scope, sink) = headless_scope("Run");

    yield_queue_executor(&scope, "Queue", &simple_opts(Some(2)), |enqueue| {
        enqueue.enqueue("good", |_| {
            let execute: QueueExecuteFn<'static> = Box::new(|_| Ok(None));
            Ok(PrepareOutcome::Simple(execute))
        });
        enqueue.enqueue("bad", |_| {
            let execute: QueueExecuteFn<'static> =
                Box::new(|_| Err(TaskError::transform("rejected")));
            Ok(PrepareOutcome::Simple(execute))
        });
    })
    .unwrap();

    assert_eq!(scope.result(), 1);

    let output = sink.contents();
    assert!(output.contains("WARNING: bad: 1 (bad failed) ["));
    assert!(output.contains("1 item succeeded, no items with errors, 1 item with warnings"));

    let marker = "The temporary directory '";
    let start = output.find(marker).unwrap() + marker.len();
    let end = start + output[start..].find('\'').unwrap();
    std::fs::remove_dir_all(&output[start..end]).unwrap();
}

#[test]
fn test_cancelled_queue_reports_interrupt() {
    let (scope, _sink) = headless_scope("Run");
    let opts = ExecuteOpts {
        cancel: Some(Arc::new(AtomicBool::new(true))),
        ..simple_opts(Some(2))
    };

    let outcome = yield_queue_executor(&scope, "Queue", &opts, |enqueue| {
        enqueue.enqueue("never", |_| {
            let execute: QueueExecuteFn<'static> = Box::new(|_| Ok(None));
            Ok(PrepareOutcome::Simple(execute))
        });
        "body finished"
    });

    assert!(matches!(outcome, Err(ExecutorError::Interrupted { .. })));
}
