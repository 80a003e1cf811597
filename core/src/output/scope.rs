use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::sink::{Capabilities, OutputSink};
use super::text::{self, Decoration};

const INDENT_WIDTH: usize = 2;

/// Output verbosity of a scope tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeFlags {
    pub verbose: bool,
    pub debug: bool,
}

impl ScopeFlags {
    pub fn new(verbose: bool, debug: bool) -> Self {
        // debug output implies verbose output
        Self {
            verbose: verbose || debug,
            debug,
        }
    }
}

/// Produces a `DONE! (...)` suffix when a scope closes.
pub type SuffixFn<'a> = Box<dyn Fn() -> String + 'a>;

struct ScopeInner {
    sink: Arc<dyn OutputSink>,
    write_lock: Arc<Mutex<()>>,
    heading: String,
    indent: usize,
    flags: ScopeFlags,
    result: AtomicI32,
    wrote_content: AtomicBool,
    closed: AtomicBool,
    started: Instant,
    parent: Option<Arc<ScopeInner>>,
}

impl ScopeInner {
    /// Terminate the heading line if nothing has been written below it yet.
    fn begin_content(&self, out: &mut String) {
        if !self.wrote_content.swap(true, Ordering::SeqCst) {
            out.push('\n');
        }
    }
}

/// Hierarchical output context: a heading line, indented content, a `DONE!` line carrying
/// the scope's result code, and nested child scopes whose results bubble up by severity.
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    /// Open a top-level scope and write its heading.
    pub fn create(sink: Arc<dyn OutputSink>, heading: &str, flags: ScopeFlags) -> Self {
        let inner = Arc::new(ScopeInner {
            sink,
            write_lock: Arc::new(Mutex::new(())),
            heading: normalize_heading(heading),
            indent: 0,
            flags,
            result: AtomicI32::new(0),
            wrote_content: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            started: Instant::now(),
            parent: None,
        });

        let scope = Self { inner };
        scope.write_raw(&scope.inner.heading);
        scope
    }

    /// Run `body` inside a nested scope. The child's `DONE!` line is written (and its result
    /// merged into this scope) even when `body` unwinds.
    pub fn nested<'s, R>(
        &self,
        heading: &str,
        suffixes: Vec<SuffixFn<'s>>,
        body: impl FnOnce(&Scope) -> R,
    ) -> R {
        let heading = normalize_heading(heading);
        let indent = self.inner.indent + INDENT_WIDTH;

        {
            let _guard = self.lock_output();
            let mut out = String::new();
            self.inner.begin_content(&mut out);
            out.push_str(&" ".repeat(indent));
            out.push_str(&heading);
            self.inner.sink.write(&out);
            self.inner.sink.flush();
        }

        let child = Scope {
            inner: Arc::new(ScopeInner {
                sink: self.inner.sink.clone(),
                write_lock: self.inner.write_lock.clone(),
                heading,
                indent,
                flags: self.inner.flags,
                result: AtomicI32::new(0),
                wrote_content: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                started: Instant::now(),
                parent: Some(self.inner.clone()),
            }),
        };

        let guard = CloseOnDrop {
            scope: &child,
            suffixes,
        };
        let output = body(guard.scope);
        drop(guard);
        output
    }

    /// Close a top-level scope and return its final result.
    pub fn finish(self) -> i32 {
        self.close(&[]);
        self.result()
    }

    pub fn result(&self) -> i32 {
        self.inner.result.load(Ordering::SeqCst)
    }

    pub fn set_result(&self, result: i32) {
        self.inner.result.store(result, Ordering::SeqCst);
    }

    pub fn heading(&self) -> &str {
        &self.inner.heading
    }

    pub fn is_verbose(&self) -> bool {
        self.inner.flags.verbose
    }

    pub fn is_debug(&self) -> bool {
        self.inner.flags.debug
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.sink.capabilities()
    }

    pub fn sink(&self) -> Arc<dyn OutputSink> {
        self.inner.sink.clone()
    }

    /// Whitespace that aligns content written inside this scope.
    pub fn line_prefix(&self) -> String {
        " ".repeat(self.inner.indent + INDENT_WIDTH)
    }

    pub fn write_line(&self, content: &str) {
        self.write_content(content.to_string());
    }

    pub fn write_success(&self, content: &str) {
        self.write_decorated(Decoration::Success, content);
    }

    /// Writes an error and escalates this scope's result to `-1` unless it already holds an
    /// error.
    pub fn write_error(&self, content: &str) {
        self.write_decorated(Decoration::Error, content);
        let _ = self
            .inner
            .result
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| (r >= 0).then_some(-1));
    }

    /// Writes a warning and escalates this scope's result to `1` if it is still successful.
    pub fn write_warning(&self, content: &str) {
        self.write_decorated(Decoration::Warning, content);
        let _ = self
            .inner
            .result
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst);
    }

    pub fn write_info(&self, content: &str) {
        self.write_decorated(Decoration::Info, content);
    }

    pub fn write_verbose(&self, content: &str) {
        if self.is_verbose() {
            self.write_decorated(Decoration::Verbose, content);
        }
    }

    pub fn write_debug(&self, content: &str) {
        if self.is_debug() {
            self.write_decorated(Decoration::Debug, content);
        }
    }

    /// Hand the undecorated destination to `body`, e.g. for a live progress display.
    ///
    /// When `body` leaves nothing behind (`persist_content` unset) on an interactive
    /// destination, the cursor is moved back onto this scope's heading line so the `DONE!`
    /// suffix lands where it would have without the display.
    pub fn yield_stdout<R>(&self, body: impl FnOnce(&StdoutContext) -> R) -> R {
        let had_content = self.inner.wrote_content.load(Ordering::SeqCst);
        let capabilities = self.capabilities();

        {
            let _guard = self.lock_output();
            let mut out = String::new();
            self.inner.begin_content(&mut out);
            self.inner.sink.write(&out);
            self.inner.sink.flush();
        }

        let context = StdoutContext {
            sink: self.inner.sink.clone(),
            line_prefix: self.line_prefix(),
            persist_content: AtomicBool::new(false),
        };

        let output = body(&context);

        let persisted = context.persist_content.load(Ordering::SeqCst);
        let _guard = self.lock_output();
        if capabilities.is_interactive {
            self.inner.sink.write("\r");
        }
        if !persisted && !had_content && capabilities.is_interactive {
            self.inner.sink.write(&format!(
                "\x1b[1A{}{}",
                " ".repeat(self.inner.indent),
                self.inner.heading
            ));
            self.inner.wrote_content.store(false, Ordering::SeqCst);
        }
        self.inner.sink.flush();

        output
    }

    fn write_decorated(&self, decoration: Decoration, content: &str) {
        let supports_colors = self.capabilities().supports_colors;
        self.write_content(decoration.decorate(content, supports_colors));
    }

    fn write_content(&self, content: String) {
        let prefix = self.line_prefix();
        let _guard = self.lock_output();

        let mut out = String::new();
        self.inner.begin_content(&mut out);

        let leading = content.len() - content.trim_start_matches('\n').len();
        out.push_str(&content[..leading]);
        for line in content[leading..].trim_end_matches('\n').split('\n') {
            if !line.is_empty() {
                out.push_str(&prefix);
            }
            out.push_str(line);
            out.push('\n');
        }

        self.inner.sink.write(&out);
        self.inner.sink.flush();
    }

    fn write_raw(&self, content: &str) {
        let _guard = self.lock_output();
        self.inner.sink.write(content);
        self.inner.sink.flush();
    }

    fn lock_output(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn close(&self, suffixes: &[SuffixFn<'_>]) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let result = self.result();
        let supports_colors = self.capabilities().supports_colors;

        let mut parts = vec![
            display_result(result, supports_colors),
            text::format_elapsed(self.inner.started.elapsed()),
        ];
        parts.extend(suffixes.iter().map(|suffix| suffix()));

        {
            let _guard = self.lock_output();
            let mut out = String::new();
            if self.inner.wrote_content.load(Ordering::SeqCst) {
                out.push_str(&" ".repeat(self.inner.indent));
            }
            out.push_str(&format!("DONE! ({})\n", parts.join(", ")));
            self.inner.sink.write(&out);
            self.inner.sink.flush();
        }

        if let Some(parent) = &self.inner.parent {
            let _ = parent
                .result
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                    let escalate = (result < 0 && current >= 0) || (result > 0 && current == 0);
                    escalate.then_some(result)
                });
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.inner.parent.is_none() {
            self.close(&[]);
        }
    }
}

struct CloseOnDrop<'a, 's> {
    scope: &'a Scope,
    suffixes: Vec<SuffixFn<'s>>,
}

impl Drop for CloseOnDrop<'_, '_> {
    fn drop(&mut self) {
        self.scope.close(&self.suffixes);
    }
}

/// Raw access to a scope's destination, see [`Scope::yield_stdout`].
pub struct StdoutContext {
    sink: Arc<dyn OutputSink>,
    line_prefix: String,
    persist_content: AtomicBool,
}

impl StdoutContext {
    pub fn sink(&self) -> &Arc<dyn OutputSink> {
        &self.sink
    }

    pub fn line_prefix(&self) -> &str {
        &self.line_prefix
    }

    /// Keep whatever was written through this context on screen.
    pub fn persist(&self) {
        self.persist_content.store(true, Ordering::SeqCst);
    }

    pub fn is_persisted(&self) -> bool {
        self.persist_content.load(Ordering::SeqCst)
    }
}

fn normalize_heading(heading: &str) -> String {
    if heading.ends_with("...") {
        heading.to_string()
    } else {
        format!("{heading}...")
    }
}

fn display_result(result: i32, supports_colors: bool) -> String {
    if !supports_colors {
        return result.to_string();
    }

    let color_on = match result {
        r if r < 0 => text::ERROR_COLOR_ON,
        r if r > 0 => text::WARNING_COLOR_ON,
        _ => text::SUCCESS_COLOR_ON,
    };
    format!("{color_on}{result}{}", text::COLOR_OFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::sink::BufferSink;
    use pretty_assertions::assert_eq;

    fn scrub(content: &str) -> String {
        let mut out = String::new();
        for (index, piece) in content.split("DONE! (").enumerate() {
            if index == 0 {
                out.push_str(piece);
                continue;
            }
            out.push_str("DONE! (");
            // "<result>, <time>, ..." -> "<result>, <time>, ..."
            let mut fields = piece.splitn(3, ", ");
            let result = fields.next().unwrap_or_default();
            let rest = fields.next().unwrap_or_default();
            let tail = fields.next();
            out.push_str(result);
            out.push_str(", <time>");
            match tail {
                Some(tail) => {
                    out.push_str(", ");
                    out.push_str(tail);
                }
                None => {
                    let close = rest.find(')').unwrap_or(rest.len());
                    out.push_str(&rest[close..]);
                }
            }
        }
        out
    }

    #[test]
    fn test_nested_scope_without_content() {
        let sink = BufferSink::new();
        let scope = Scope::create(Arc::new(sink.clone()), "Outer", ScopeFlags::default());
        scope.nested("Inner", vec![Box::new(|| "extra".to_string())], |_| {});
        assert_eq!(scope.finish(), 0);

        assert_eq!(
            scrub(&sink.contents()),
            "Outer...\n  Inner...DONE! (0, <time>, extra)\nDONE! (0, <time>)\n"
        );
    }

    #[test]
    fn test_nested_scope_with_content() {
        let sink = BufferSink::new();
        let scope = Scope::create(Arc::new(sink.clone()), "Outer", ScopeFlags::default());
        scope.nested("Inner", Vec::new(), |inner| {
            inner.write_line("line one");
            inner.write_warning("careful");
        });
        assert_eq!(scope.finish(), 1);

        assert_eq!(
            scrub(&sink.contents()),
            "Outer...\n  Inner...\n    line one\n    WARNING: careful\n  DONE! (1, <time>)\nDONE! (1, <time>)\n"
        );
    }

    #[test]
    fn test_result_bubbles_by_severity() {
        let scope = Scope::create(Arc::new(BufferSink::new()), "Outer", ScopeFlags::default());
        scope.nested("error", Vec::new(), |inner| inner.set_result(-3));
        scope.nested("warning", Vec::new(), |inner| inner.set_result(2));
        assert_eq!(scope.result(), -3);

        let scope = Scope::create(Arc::new(BufferSink::new()), "Outer", ScopeFlags::default());
        scope.nested("warning", Vec::new(), |inner| inner.set_result(2));
        scope.nested("warning", Vec::new(), |inner| inner.set_result(5));
        assert_eq!(scope.result(), 2);
    }

    #[test]
    fn test_write_error_keeps_existing_error() {
        let scope = Scope::create(Arc::new(BufferSink::new()), "Outer", ScopeFlags::default());
        scope.set_result(-123);
        scope.write_error("boom");
        assert_eq!(scope.result(), -123);
    }

    #[test]
    fn test_verbose_and_debug_are_filtered() {
        let sink = BufferSink::new();
        let scope = Scope::create(Arc::new(sink.clone()), "Outer", ScopeFlags::new(true, false));
        scope.write_verbose("shown");
        scope.write_debug("hidden");
        drop(scope);

        let content = sink.contents();
        assert!(content.contains("VERBOSE: shown"));
        assert!(!content.contains("hidden"));
    }
}
