use crate::executor::aggregate::ResultAggregator;
use crate::executor::types::TaskSummary;
use crate::output::Scope;

use super::{completion_text, log_reference, CompletionReporter, InternalStatus, LogBuffer};
use super::{Status, StatusFactory};

/// Status handle that only keeps log messages.
#[derive(Debug, Default)]
pub struct SilentStatus {
    log: LogBuffer,
}

impl Status for SilentStatus {
    fn set_title(&self, _title: &str) {}

    fn on_progress(&self, _step: Option<usize>, _status: Option<&str>) -> bool {
        true
    }

    fn on_info(&self, _value: &str, _verbose: bool) {}

    fn log(&self, message: &str) {
        self.log.push(message);
    }
}

impl InternalStatus for SilentStatus {
    fn set_num_steps(&self, _num_steps: Option<usize>) {}

    fn log_messages(&self) -> String {
        self.log.joined()
    }

    fn as_status(&self) -> &dyn Status {
        self
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentStatusFactory;

impl StatusFactory for SilentStatusFactory {
    fn create(&self, _display: &str) -> Box<dyn InternalStatus + '_> {
        Box::new(SilentStatus::default())
    }

    fn reset(&self, _title: &str) {}

    fn stop(&self) {}
}

/// Writes one plain line per failed or warning task through the batch scope.
pub struct SilentReporter<'s> {
    scope: &'s Scope,
    aggregator: &'s ResultAggregator<'s>,
    quiet: bool,
}

impl<'s> SilentReporter<'s> {
    pub fn new(scope: &'s Scope, aggregator: &'s ResultAggregator<'s>, quiet: bool) -> Self {
        Self {
            scope,
            aggregator,
            quiet,
        }
    }
}

impl CompletionReporter for SilentReporter<'_> {
    fn on_complete(&self, task: &TaskSummary<'_>) {
        self.aggregator.record(task.result);

        if self.quiet || task.result == 0 {
            return;
        }

        let Some(log_filename) = task.log_filename.filter(|path| path.is_file()) else {
            return;
        };

        let line = format!(
            "{} [{}]",
            completion_text(task),
            log_reference(log_filename, self.scope.capabilities().is_headless)
        );

        if task.result < 0 {
            self.scope.write_error(&line);
        } else {
            self.scope.write_warning(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::aggregate::Counters;
    use crate::output::{BufferSink, ScopeFlags};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_silent_status_keeps_log_only() {
        let factory = SilentStatusFactory;
        let status = factory.create("task");
        status.set_title("ignored");
        status.set_num_steps(Some(3));
        assert!(status.on_progress(Some(1), Some("working")));
        status.log("first");
        status.log("second");
        assert_eq!(status.log_messages(), "first\nsecond");
    }

    #[test]
    fn test_reporter_writes_failures_with_log_path() {
        let log = tempfile::NamedTempFile::new().unwrap();
        let sink = BufferSink::new();
        let scope = Scope::create(Arc::new(sink.clone()), "Run", ScopeFlags::default());
        let counters = Mutex::new(Counters::default());
        let aggregator = ResultAggregator::new(&scope, &counters);
        let reporter = SilentReporter::new(&scope, &aggregator, false);

        for (display, result) in [("ok", 0), ("warn", 2), ("bad", -5)] {
            reporter.on_complete(&TaskSummary {
                display,
                result,
                short_desc: None,
                log_filename: Some(log.path()),
            });
        }

        let content = sink.contents();
        assert!(!content.contains("ok: 0"));
        assert!(content.contains(&format!("WARNING: warn: 2 [{}]", log.path().display())));
        assert!(content.contains(&format!("ERROR: bad: -5 [{}]", log.path().display())));
        assert_eq!(scope.result(), -5);
    }

    #[test]
    fn test_reporter_quiet_still_counts() {
        let sink = BufferSink::new();
        let scope = Scope::create(Arc::new(sink.clone()), "Run", ScopeFlags::default());
        let counters = Mutex::new(Counters::default());
        let aggregator = ResultAggregator::new(&scope, &counters);
        let reporter = SilentReporter::new(&scope, &aggregator, true);

        reporter.on_complete(&TaskSummary {
            display: "bad",
            result: -1,
            short_desc: None,
            log_filename: None,
        });

        assert_eq!(sink.contents(), "Run...");
        assert_eq!(scope.result(), -1);
        assert_eq!(counters.lock().unwrap().errors, 1);
    }
}
