use thiserror::Error;

/// A required editable field is missing or malformed.
///
/// Raised before any store mutation is attempted, so a failed submission
/// leaves the task collection untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("invalid {field} {value:?}: expected {expected}")]
    Malformed {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{date} {time} is not a valid calendar date-time")]
    OutOfRange { date: String, time: String },
}

/// A category or filter name outside the fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownCategory {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("no task id left after {0}")]
    IdsExhausted(u64),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
