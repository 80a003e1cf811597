use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::warn;

use crate::executor::aggregate::{progress_summary, ResultAggregator};
use crate::executor::runner::QuietTaskPanics;
use crate::executor::types::{TaskSummary, DISPLAY_COLUMN_WIDTH, STATUS_COLUMN_WIDTH};
use crate::output::text::{bounded_ljust, Decoration};
use crate::output::{Capabilities, StdoutContext};

use super::{completion_text, log_reference, CompletionReporter, InternalStatus, LogBuffer};
use super::{Status, StatusFactory};

pub const DEFAULT_REFRESH_PER_SECOND: f64 = 4.0;

const TOTAL_PROGRESS_TITLE: &str = "Total Progress";

#[derive(Debug, Clone, Copy)]
pub struct LiveOptions {
    pub quiet: bool,
    pub verbose: bool,
    pub refresh_per_second: Option<f64>,
    pub capabilities: Capabilities,
}

fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| fallback())
}

fn spinner_style() -> ProgressStyle {
    style(
        "{prefix} {spinner:.green} [{elapsed_precise}] {msg}",
        ProgressStyle::default_spinner,
    )
}

fn bar_style() -> ProgressStyle {
    style(
        "{prefix} {bar:30.cyan/blue} {pos:>4}/{len:4} [{elapsed_precise}] {msg}",
        ProgressStyle::default_bar,
    )
}

fn row_title(line_prefix: &str, title: &str) -> String {
    bounded_ljust(&format!("{line_prefix}  {title}"), DISPLAY_COLUMN_WIDTH)
}

/// Live multi-row display: one row per slot plus a "Total Progress" row.
///
/// Draws to stdout at the configured refresh rate. On a non-interactive destination the rows
/// are hidden and completion banners go straight to the scope's sink. While rows are drawn,
/// panics caught by task runners are not echoed to stderr.
pub struct LiveRenderer<'r> {
    context: &'r StdoutContext,
    aggregator: &'r ResultAggregator<'r>,
    multi: MultiProgress,
    total: ProgressBar,
    options: LiveOptions,
    hidden: bool,
    tick: Duration,
    _quiet_panics: Option<QuietTaskPanics>,
}

impl<'r> LiveRenderer<'r> {
    pub fn new(
        context: &'r StdoutContext,
        aggregator: &'r ResultAggregator<'r>,
        num_tasks: Option<usize>,
        options: LiveOptions,
    ) -> Self {
        let hz = options
            .refresh_per_second
            .filter(|hz| *hz > 0.0)
            .unwrap_or(DEFAULT_REFRESH_PER_SECOND);
        let hidden = !options.capabilities.is_interactive;

        let target = if hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stdout_with_hz(hz.round().clamp(1.0, 60.0) as u8)
        };
        let multi = MultiProgress::with_draw_target(target);

        let total = match num_tasks {
            Some(n) => ProgressBar::new(n as u64).with_style(bar_style()),
            None => ProgressBar::new_spinner().with_style(spinner_style()),
        };
        let total = multi.add(total);
        total.set_prefix(bounded_ljust(
            &format!("{}{TOTAL_PROGRESS_TITLE}", context.line_prefix()),
            DISPLAY_COLUMN_WIDTH,
        ));

        let tick = Duration::from_secs_f64(1.0 / hz);
        if !hidden {
            total.enable_steady_tick(tick);
        }

        Self {
            context,
            aggregator,
            multi,
            total,
            options,
            hidden,
            tick,
            _quiet_panics: (!hidden).then(QuietTaskPanics::install),
        }
    }

    pub fn factory(&self) -> LiveStatusFactory<'_> {
        LiveStatusFactory {
            renderer: self,
            bar: Mutex::new(None),
        }
    }

    /// Print a line above the rows without disturbing them.
    fn print_above(&self, line: &str) {
        if self.hidden {
            let sink = self.context.sink();
            sink.write(&format!("{line}\n"));
            sink.flush();
        } else if let Err(e) = self.multi.println(line) {
            warn!(error = %e, "failed to print above progress rows");
        }
    }
}

impl CompletionReporter for LiveRenderer<'_> {
    fn on_complete(&self, task: &TaskSummary<'_>) {
        let capabilities = self.options.capabilities;

        if !self.options.quiet && task.result != 0 {
            let decoration = if task.result < 0 {
                Decoration::Error
            } else {
                Decoration::Warning
            };

            let suffix = match task.log_filename.filter(|path| path.is_file()) {
                Some(path) => format!(" [{}]", log_reference(path, capabilities.is_headless)),
                None => String::new(),
            };

            self.print_above(&format!(
                "{}{}{}{}",
                self.context.line_prefix(),
                decoration.prefix(capabilities.supports_colors),
                completion_text(task),
                suffix
            ));
            self.context.persist();
        }

        let counts = self.aggregator.record(task.result);

        // pad on the visible width; color codes must not be cut
        let plain = progress_summary(&counts, false);
        let padding = STATUS_COLUMN_WIDTH.saturating_sub(plain.chars().count());
        let summary = progress_summary(&counts, capabilities.supports_colors);

        self.total.inc(1);
        self.total
            .set_message(format!("{summary}{}", " ".repeat(padding)));
    }
}

impl Drop for LiveRenderer<'_> {
    fn drop(&mut self) {
        self.total.finish_and_clear();
        if let Err(e) = self.multi.clear() {
            warn!(error = %e, "failed to clear progress rows");
        }
    }
}

/// One display row, created the first time its slot runs a task.
pub struct LiveStatusFactory<'r> {
    renderer: &'r LiveRenderer<'r>,
    bar: Mutex<Option<ProgressBar>>,
}

impl LiveStatusFactory<'_> {
    fn row(&self) -> Option<ProgressBar> {
        if self.renderer.options.quiet {
            return None;
        }

        let mut bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        Some(
            bar.get_or_insert_with(|| {
                self.renderer
                    .multi
                    .add(ProgressBar::new_spinner().with_style(spinner_style()))
            })
            .clone(),
        )
    }

    fn show_title(&self, bar: &ProgressBar, title: &str) {
        bar.set_style(spinner_style());
        bar.set_position(0);
        bar.set_prefix(row_title(self.renderer.context.line_prefix(), title));
        bar.set_message("");
    }
}

impl StatusFactory for LiveStatusFactory<'_> {
    fn create(&self, display: &str) -> Box<dyn InternalStatus + '_> {
        let bar = self.row();
        if let Some(bar) = &bar {
            self.show_title(bar, display);
            bar.reset_elapsed();
            if !self.renderer.hidden {
                bar.enable_steady_tick(self.renderer.tick);
            }
        }

        Box::new(LiveStatus {
            renderer: self.renderer,
            bar,
            steps: Mutex::new(StepState::default()),
            log: LogBuffer::default(),
        })
    }

    fn reset(&self, title: &str) {
        if let Some(bar) = self.row() {
            bar.disable_steady_tick();
            self.show_title(&bar, title);
        }
    }

    fn stop(&self) {
        let bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(bar) = bar {
            bar.finish_and_clear();
            self.renderer.multi.remove(&bar);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct StepState {
    num_steps: Option<usize>,
    current_step: Option<usize>,
}

pub struct LiveStatus<'r> {
    renderer: &'r LiveRenderer<'r>,
    bar: Option<ProgressBar>,
    steps: Mutex<StepState>,
    log: LogBuffer,
}

impl LiveStatus<'_> {
    fn steps(&self) -> std::sync::MutexGuard<'_, StepState> {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Status for LiveStatus<'_> {
    fn set_title(&self, title: &str) {
        if let Some(bar) = &self.bar {
            bar.set_prefix(row_title(self.renderer.context.line_prefix(), title));
        }
    }

    fn on_progress(&self, step: Option<usize>, status: Option<&str>) -> bool {
        let mut steps = self.steps();

        if let Some(step) = step {
            if steps.num_steps.is_some() {
                steps.current_step = Some(step);
            } else {
                warn!(step, "progress step reported without a step count");
            }
        }

        let status = status.unwrap_or_default();
        let message = match (steps.num_steps, steps.current_step) {
            (Some(num_steps), Some(current)) => {
                format!("({} of {}) {}", current + 1, num_steps, status)
            }
            _ => status.to_string(),
        };

        if let Some(bar) = &self.bar {
            if let Some(current) = steps.current_step {
                bar.set_position(current as u64);
            }
            bar.set_message(bounded_ljust(&message, STATUS_COLUMN_WIDTH));
        }

        true
    }

    fn on_info(&self, value: &str, verbose: bool) {
        if verbose && !self.renderer.options.verbose {
            return;
        }

        let decoration = if verbose {
            Decoration::Verbose
        } else {
            Decoration::Info
        };

        self.renderer.print_above(&format!(
            "{}{}{}",
            self.renderer.context.line_prefix(),
            decoration.prefix(self.renderer.options.capabilities.supports_colors),
            value
        ));
        self.renderer.context.persist();
    }

    fn log(&self, message: &str) {
        self.log.push(message);
    }
}

impl InternalStatus for LiveStatus<'_> {
    fn set_num_steps(&self, num_steps: Option<usize>) {
        let mut steps = self.steps();

        match num_steps {
            None => *steps = StepState::default(),
            Some(_) if steps.num_steps.is_some() => {
                warn!("step count is already set for this task; ignoring");
                return;
            }
            Some(n) => {
                steps.num_steps = Some(n);
                steps.current_step = Some(0);
            }
        }

        if let Some(bar) = &self.bar {
            match steps.num_steps {
                Some(n) => {
                    bar.set_style(bar_style());
                    bar.set_length(n as u64);
                }
                None => bar.set_style(spinner_style()),
            }
            bar.set_position(0);
        }
    }

    fn log_messages(&self) -> String {
        self.log.joined()
    }

    fn as_status(&self) -> &dyn Status {
        self
    }
}

impl Drop for LiveStatus<'_> {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            bar.disable_steady_tick();
        }
    }
}
