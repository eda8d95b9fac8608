//! Error types for Quiver.
//!
//! Errors fall into two classes. Recoverable errors (`Persistence`, `Query`)
//! leave prior state intact. Fatal errors (`Bridge`, `ContractViolation`)
//! signal a desynchronization bug or malformed caller input and abort the
//! operation that raised them.

use alloc::string::String;
use core::fmt;

/// Result type alias for Quiver operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Failures while evaluating a live query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryError {
    /// The predicate could not be evaluated against a record.
    PredicateEvaluationFailed { message: String },
}

/// Failures of the change bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeError {
    /// A diff script does not transform the pre-change projection into the
    /// post-change projection.
    InconsistentDiff { message: String },
}

/// Error types for Quiver operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Durability failure while checkpointing or opening a store.
    Persistence { message: String },
    /// Live query evaluation failure.
    Query(QueryError),
    /// Change bridge failure.
    Bridge(BridgeError),
    /// Malformed caller input, e.g. an out-of-range mutation target.
    ContractViolation { message: String },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::PredicateEvaluationFailed { message } => {
                write!(f, "Predicate evaluation failed: {}", message)
            }
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::InconsistentDiff { message } => {
                write!(f, "Inconsistent diff: {}", message)
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Persistence { message } => write!(f, "Persistence error: {}", message),
            Error::Query(err) => write!(f, "{}", err),
            Error::Bridge(err) => write!(f, "{}", err),
            Error::ContractViolation { message } => {
                write!(f, "Contract violation: {}", message)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for QueryError {}

#[cfg(feature = "std")]
impl std::error::Error for BridgeError {}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<BridgeError> for Error {
    fn from(err: BridgeError) -> Self {
        Error::Bridge(err)
    }
}

impl Error {
    /// Creates a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Error::Persistence {
            message: message.into(),
        }
    }

    /// Creates a predicate evaluation error.
    pub fn predicate_failed(message: impl Into<String>) -> Self {
        Error::Query(QueryError::PredicateEvaluationFailed {
            message: message.into(),
        })
    }

    /// Creates an inconsistent diff error.
    pub fn inconsistent_diff(message: impl Into<String>) -> Self {
        Error::Bridge(BridgeError::InconsistentDiff {
            message: message.into(),
        })
    }

    /// Creates a contract violation error.
    pub fn contract_violation(message: impl Into<String>) -> Self {
        Error::ContractViolation {
            message: message.into(),
        }
    }

    /// Returns true for errors that indicate a bug or malformed input rather
    /// than a recoverable condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Bridge(_) | Error::ContractViolation { .. })
    }
}
