use std::sync::Mutex;

use crate::output::{text, Scope, SuffixFn};

/// Per-batch outcome counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub succeeded: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl Counters {
    pub fn total(&self) -> usize {
        self.succeeded + self.warnings + self.errors
    }
}

/// Folds task results into the batch counters and the batch scope's result.
///
/// Counting and escalation happen in one critical section: the first error replaces any
/// success or warning, a warning only replaces success, and nothing downgrades an error.
pub struct ResultAggregator<'s> {
    scope: &'s Scope,
    counters: &'s Mutex<Counters>,
}

impl<'s> ResultAggregator<'s> {
    pub fn new(scope: &'s Scope, counters: &'s Mutex<Counters>) -> Self {
        Self { scope, counters }
    }

    /// Record one completed task and return the counts including it.
    pub fn record(&self, result: i32) -> Counters {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = self.scope.result();
        if result < 0 {
            counters.errors += 1;
            if current >= 0 {
                self.scope.set_result(result);
            }
        } else if result > 0 {
            counters.warnings += 1;
            if current == 0 {
                self.scope.set_result(result);
            }
        } else {
            counters.succeeded += 1;
        }

        *counters
    }

    pub fn snapshot(&self) -> Counters {
        snapshot(self.counters)
    }
}

fn snapshot(counters: &Mutex<Counters>) -> Counters {
    *counters
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// `DONE!` suffixes for a batch scope: succeeded, with errors, with warnings.
pub fn summary_suffixes(counters: &Mutex<Counters>) -> Vec<SuffixFn<'_>> {
    vec![
        Box::new(move || {
            format!(
                "{} succeeded",
                text::count_noun("item", snapshot(counters).succeeded)
            )
        }),
        Box::new(move || {
            format!(
                "{} with errors",
                text::count_noun("item", snapshot(counters).errors)
            )
        }),
        Box::new(move || {
            format!(
                "{} with warnings",
                text::count_noun("item", snapshot(counters).warnings)
            )
        }),
    ]
}

/// Live aggregate row text: `"3 succeeded, 1 failed, 0 warnings"`. Non-zero counts are colored
/// when `supports_colors` is set.
pub fn progress_summary(counters: &Counters, supports_colors: bool) -> String {
    let warning_noun = if counters.warnings == 1 {
        "warning"
    } else {
        "warnings"
    };

    [
        (text::SUCCESS_COLOR_ON, counters.succeeded, "succeeded"),
        (text::ERROR_COLOR_ON, counters.errors, "failed"),
        (text::WARNING_COLOR_ON, counters.warnings, warning_noun),
    ]
    .into_iter()
    .map(|(color_on, count, noun)| {
        if count == 0 || !supports_colors {
            format!("{count} {noun}")
        } else {
            format!("{color_on}{count}{} {noun}", text::COLOR_OFF)
        }
    })
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{BufferSink, ScopeFlags};
    use std::sync::Arc;

    fn scope() -> Scope {
        Scope::create(Arc::new(BufferSink::new()), "Run", ScopeFlags::default())
    }

    #[test]
    fn test_record_counts_each_class() {
        let scope = scope();
        let counters = Mutex::new(Counters::default());
        let aggregator = ResultAggregator::new(&scope, &counters);

        aggregator.record(0);
        aggregator.record(0);
        aggregator.record(4);
        let counts = aggregator.record(-2);

        assert_eq!(
            counts,
            Counters {
                succeeded: 2,
                warnings: 1,
                errors: 1
            }
        );
        assert_eq!(counts.total(), 4);
        assert_eq!(aggregator.snapshot(), counts);
    }

    #[test]
    fn test_error_outranks_warning_in_any_order() {
        let orders: [[i32; 4]; 4] = [[0, 1, -1, 1], [-1, 1, 1, 0], [1, 1, 0, -1], [1, -1, 0, 1]];

        for order in orders {
            let scope = scope();
            let counters = Mutex::new(Counters::default());
            let aggregator = ResultAggregator::new(&scope, &counters);
            for result in order {
                aggregator.record(result);
            }
            assert_eq!(scope.result(), -1, "order {order:?}");
        }
    }

    #[test]
    fn test_first_error_and_first_warning_win() {
        let scope = scope();
        let counters = Mutex::new(Counters::default());
        let aggregator = ResultAggregator::new(&scope, &counters);

        aggregator.record(3);
        aggregator.record(5);
        assert_eq!(scope.result(), 3);

        aggregator.record(-7);
        aggregator.record(-1);
        aggregator.record(2);
        assert_eq!(scope.result(), -7);
    }

    #[test]
    fn test_summary_suffixes() {
        let counters = Mutex::new(Counters {
            succeeded: 5,
            warnings: 1,
            errors: 0,
        });
        let suffixes: Vec<String> = summary_suffixes(&counters).iter().map(|f| f()).collect();
        assert_eq!(
            suffixes,
            vec![
                "5 items succeeded".to_string(),
                "no items with errors".to_string(),
                "1 item with warnings".to_string(),
            ]
        );
    }

    #[test]
    fn test_progress_summary() {
        let counters = Counters {
            succeeded: 3,
            warnings: 1,
            errors: 0,
        };
        assert_eq!(
            progress_summary(&counters, false),
            "3 succeeded, 0 failed, 1 warning"
        );
        assert_eq!(
            progress_summary(&counters, true),
            format!(
                "{}3{} succeeded, 0 failed, {}1{} warning",
                text::SUCCESS_COLOR_ON,
                text::COLOR_OFF,
                text::WARNING_COLOR_ON,
                text::COLOR_OFF
            )
        );
    }
}
