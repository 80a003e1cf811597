use thiserror::Error;

/// Failure raised by a task callback (init, prepare, execute or transform).
///
/// The variant decides how the runner classifies the failure:
/// `Transform` is the task's own logic failing and maps to result `1`; `Io` and `Other` mean
/// the task machinery broke and map to the catastrophic sentinel; `Interrupted` is never
/// classified and unwinds the whole batch.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Transform(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),

    #[error("interrupted")]
    Interrupted,
}

impl TaskError {
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform(message.into())
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
