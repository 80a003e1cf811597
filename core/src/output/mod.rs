//! Terminal-facing output: destination sinks and their capabilities, nested `DONE!` scopes,
//! and the text helpers shared by the renderers.

mod scope;
mod sink;
pub mod text;

pub use scope::{Scope, ScopeFlags, StdoutContext, SuffixFn};
pub use sink::{BufferSink, Capabilities, OutputSink, StdoutSink, DEFAULT_COLUMNS};
