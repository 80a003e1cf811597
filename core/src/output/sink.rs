use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::warn;

/// Column count assumed when the destination does not report one.
pub const DEFAULT_COLUMNS: usize = 180;

const COLUMNS_ENV_VAR: &str = "COLUMNS";
const INTERACTIVE_ENV_VAR: &str = "TASKER_IS_INTERACTIVE";
const HEADLESS_ENV_VAR: &str = "TASKER_IS_HEADLESS";
const COLORS_ENV_VAR: &str = "TASKER_SUPPORTS_COLORS";

/// What the output destination can do.
///
/// Built once per run and handed to the sink; renderers query it instead of probing the
/// terminal themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub columns: usize,
    pub is_interactive: bool,
    pub is_headless: bool,
    pub supports_colors: bool,
}

impl Capabilities {
    /// Capabilities of a plain, non-interactive destination (files, pipes, test buffers).
    pub fn headless() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            is_interactive: false,
            is_headless: true,
            supports_colors: false,
        }
    }

    /// Inspect stdout, honoring the environment overrides.
    pub fn detect_stdout() -> Self {
        Self::from_parts(atty::is(atty::Stream::Stdout), |name| std::env::var(name).ok())
    }

    fn from_parts(is_tty: bool, env: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| env(name).map(|v| v.trim() != "0");

        let columns = env(COLUMNS_ENV_VAR)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_COLUMNS);

        let is_interactive = flag(INTERACTIVE_ENV_VAR).unwrap_or(is_tty);
        let is_headless = flag(HEADLESS_ENV_VAR).unwrap_or(!is_interactive);
        let supports_colors = flag(COLORS_ENV_VAR).unwrap_or(is_interactive);

        Self {
            columns,
            is_interactive,
            is_headless,
            supports_colors,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::headless()
    }
}

/// Destination for everything the engine prints.
pub trait OutputSink: Send + Sync {
    fn write(&self, content: &str);
    fn flush(&self);
    fn capabilities(&self) -> Capabilities;
}

/// Writes to the process stdout.
pub struct StdoutSink {
    capabilities: Capabilities,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities::detect_stdout(),
        }
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for StdoutSink {
    fn write(&self, content: &str) {
        write_logged(&mut std::io::stdout().lock(), content);
    }

    fn flush(&self) {
        if let Err(e) = std::io::stdout().flush() {
            warn!(error = %e, "failed to flush stdout");
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

fn write_logged(out: &mut impl Write, content: &str) {
    if let Err(e) = out.write_all(content.as_bytes()) {
        warn!(error = %e, "failed to write to stdout");
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Clone, Default)]
pub struct BufferSink {
    content: Arc<Mutex<String>>,
    capabilities: Capabilities,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            content: Arc::default(),
            capabilities,
        }
    }

    pub fn contents(&self) -> String {
        self.content
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl OutputSink for BufferSink {
    fn write(&self, content: &str) {
        let mut buffer = self
            .content
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        buffer.push_str(content);
    }

    fn flush(&self) {}

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
