use std::sync::Mutex;

use tracing::debug;

use crate::executor::aggregate::{summary_suffixes, Counters, ResultAggregator};
use crate::executor::status::{
    CompletionReporter, LiveOptions, LiveRenderer, SilentReporter, SilentStatusFactory,
    StatusFactory,
};
use crate::executor::types::{ExecuteOpts, ExperienceType};
use crate::output::{text, Scope};

/// The slots and reporter a scheduler dispatches through.
pub(crate) struct Experience<'r> {
    pub factories: Vec<Box<dyn StatusFactory + 'r>>,
    pub reporter: &'r dyn CompletionReporter,
    pub is_debug: bool,
}

/// Heading for a batch scope. Fixed-size batches get their item count appended.
pub(crate) fn batch_heading(desc: &str, num_tasks: Option<usize>) -> String {
    let Some(num_tasks) = num_tasks else {
        return desc.to_string();
    };

    let desc = desc.strip_suffix("...").unwrap_or(desc);
    let items = text::count_noun("item", num_tasks);

    if desc.is_empty() {
        format!("{items}...")
    } else {
        format!("{desc} ({items})...")
    }
}

pub(crate) fn resolve_experience(scope: &Scope, requested: Option<ExperienceType>) -> ExperienceType {
    requested.unwrap_or(if scope.capabilities().is_interactive {
        ExperienceType::ProgressBar
    } else {
        ExperienceType::Simple
    })
}

/// Open the batch scope, build the renderer for `num_slots` concurrent slots and run `body`
/// inside it. The scope's `DONE!` line carries the succeeded/errors/warnings counts.
///
/// `num_tasks` is `None` for open-ended batches: the heading is used as-is and the total row
/// has no denominator.
pub(crate) fn with_experience<R>(
    scope: &Scope,
    desc: &str,
    num_tasks: Option<usize>,
    num_slots: usize,
    opts: &ExecuteOpts,
    body: impl FnOnce(&Experience<'_>) -> R,
) -> R {
    let experience_type = resolve_experience(scope, opts.experience);
    debug!(?experience_type, ?num_tasks, num_slots, "starting batch");

    let counters = Mutex::new(Counters::default());
    let heading = batch_heading(desc, num_tasks);

    scope.nested(&heading, summary_suffixes(&counters), |nested| {
        let aggregator = ResultAggregator::new(nested, &counters);

        match experience_type {
            ExperienceType::Simple => {
                let reporter = SilentReporter::new(nested, &aggregator, opts.quiet);
                let experience = Experience {
                    factories: (0..num_slots)
                        .map(|_| Box::new(SilentStatusFactory) as Box<dyn StatusFactory>)
                        .collect(),
                    reporter: &reporter,
                    is_debug: nested.is_debug(),
                };
                body(&experience)
            }
            ExperienceType::ProgressBar => nested.yield_stdout(|context| {
                let renderer = LiveRenderer::new(
                    context,
                    &aggregator,
                    num_tasks,
                    LiveOptions {
                        quiet: opts.quiet,
                        verbose: nested.is_verbose(),
                        refresh_per_second: opts.refresh_per_second,
                        capabilities: nested.capabilities(),
                    },
                );

                let experience = Experience {
                    factories: (0..num_slots)
                        .map(|_| Box::new(renderer.factory()) as Box<dyn StatusFactory + '_>)
                        .collect(),
                    reporter: &renderer,
                    is_debug: nested.is_debug(),
                };
                let output = body(&experience);
                drop(experience);
                output
            }),
        }
    })
}
