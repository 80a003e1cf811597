use thiserror::Error;

/// Batch-level failures returned by the schedulers.
///
/// Individual task failures never surface here; they are folded into the task's result code.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The batch was cancelled, either by a task returning `TaskError::Interrupted` or through
    /// the caller's cancellation flag.
    #[error("execution interrupted")]
    Interrupted { reported: bool },

    /// A pool thread died outside the task runner's guard.
    #[error("worker failed: {0}")]
    Worker(String),
}

impl ExecutorError {
    pub fn interrupted() -> Self {
        Self::Interrupted { reported: false }
    }

    /// Mark the error as already shown to the user so outer handlers do not print it again.
    pub fn into_reported(self) -> Self {
        match self {
            Self::Interrupted { .. } => Self::Interrupted { reported: true },
            other => other,
        }
    }

    pub fn already_reported(&self) -> bool {
        matches!(self, Self::Interrupted { reported: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_reporting_flag() {
        let err = ExecutorError::interrupted();
        assert!(!err.already_reported());
        assert!(err.into_reported().already_reported());
    }

    #[test]
    fn test_worker_error_is_never_reported() {
        let err = ExecutorError::Worker("boom".to_string()).into_reported();
        assert!(!err.already_reported());
        assert_eq!(err.to_string(), "worker failed: boom");
    }
}
