use crate::error::TaskError;
use crate::executor::status::Status;

/// What a prepare callback hands back: the execute callable, optionally with a step count that
/// switches the task's row into "(i of n)" mode.
pub enum PrepareOutcome<F> {
    Simple(F),
    WithSteps(usize, F),
}

impl<F> PrepareOutcome<F> {
    pub fn from_parts(num_steps: Option<usize>, func: F) -> Self {
        match num_steps {
            Some(n) => Self::WithSteps(n, func),
            None => Self::Simple(func),
        }
    }

    pub fn into_parts(self) -> (Option<usize>, F) {
        match self {
            Self::Simple(func) => (None, func),
            Self::WithSteps(n, func) => (Some(n), func),
        }
    }

    pub fn map<G>(self, f: impl FnOnce(F) -> G) -> PrepareOutcome<G> {
        let (num_steps, func) = self.into_parts();
        PrepareOutcome::from_parts(num_steps, f(func))
    }
}

/// Result code of an execute callable, with an optional one-line description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Simple(i32),
    Described(i32, Option<String>),
}

impl ExecutionOutcome {
    pub fn into_parts(self) -> (i32, Option<String>) {
        match self {
            Self::Simple(code) => (code, None),
            Self::Described(code, short_desc) => (code, short_desc),
        }
    }
}

impl From<i32> for ExecutionOutcome {
    fn from(code: i32) -> Self {
        Self::Simple(code)
    }
}

/// Value produced by a transform, optionally enriched with a return code and description.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome<T> {
    Value(T),
    Complete {
        value: T,
        return_code: Option<i32>,
        short_desc: Option<String>,
    },
}

impl<T> TransformOutcome<T> {
    /// `(value, return code, short description)`; a missing return code means success.
    pub fn into_parts(self) -> (T, i32, Option<String>) {
        match self {
            Self::Value(value) => (value, 0, None),
            Self::Complete {
                value,
                return_code,
                short_desc,
            } => (value, return_code.unwrap_or(0), short_desc),
        }
    }
}

impl<T> From<T> for TransformOutcome<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

pub type ExecuteFn<'a> =
    Box<dyn FnOnce(&dyn Status) -> Result<ExecutionOutcome, TaskError> + 'a>;

pub type PrepareFn<'a> =
    Box<dyn FnOnce(&dyn Fn(&str)) -> Result<PrepareOutcome<ExecuteFn<'a>>, TaskError> + 'a>;

pub type TransformFn<'a, T> =
    Box<dyn FnOnce(&dyn Status) -> Result<TransformOutcome<T>, TaskError> + 'a>;

/// Queue tasks return an optional short description; their result code is always `0`.
pub type QueueExecuteFn<'a> =
    Box<dyn FnOnce(&dyn Status) -> Result<Option<String>, TaskError> + 'a>;

pub type QueuePrepareFn<'a> = Box<
    dyn FnOnce(&dyn Fn(&str)) -> Result<PrepareOutcome<QueueExecuteFn<'a>>, TaskError> + Send + 'a,
>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_outcome_parts() {
        let (steps, value) = PrepareOutcome::WithSteps(3, "f").map(str::len).into_parts();
        assert_eq!(steps, Some(3));
        assert_eq!(value, 1);

        let (steps, _) = PrepareOutcome::Simple(()).into_parts();
        assert_eq!(steps, None);
    }

    #[test]
    fn test_transform_outcome_parts() {
        assert_eq!(TransformOutcome::from(4).into_parts(), (4, 0, None));

        let complete = TransformOutcome::Complete {
            value: "v",
            return_code: None,
            short_desc: Some("note".to_string()),
        };
        assert_eq!(complete.into_parts(), ("v", 0, Some("note".to_string())));
    }

    #[test]
    fn test_execution_outcome_from_code() {
        assert_eq!(ExecutionOutcome::from(2).into_parts(), (2, None));
    }
}
