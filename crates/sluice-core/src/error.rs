use crate::pipeline::PipelineState;
use std::fmt;
use thiserror::Error as ThisError;

/// Boxed failure reported by a native engine or a close handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

///
/// Error
///
/// Structured error with a stable classification.
/// Every failure the core surfaces to a terminal caller is one of these.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,

    /// Original engine failure, passed through unchanged.
    #[source]
    pub source: Option<BoxError>,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
            source: None,
        }
    }

    /// Construct a pipeline lifecycle violation.
    pub(crate) fn invalid_state(state: PipelineState, action: &'static str) -> Self {
        Self {
            class: ErrorClass::InvalidState,
            origin: ErrorOrigin::Pipeline,
            message: format!("stream has already been linked, consumed or closed ({state}): cannot {action}"),
            detail: Some(ErrorDetail::InvalidState { state }),
            source: None,
        }
    }

    /// Construct a mapper failure for a predicate the engine cannot express.
    pub(crate) fn unsupported_predicate(kind: impl Into<String>) -> Self {
        let kind = kind.into();

        Self {
            class: ErrorClass::Unsupported,
            origin: ErrorOrigin::Mapper,
            message: format!("predicate type [{kind}] is not supported"),
            detail: Some(ErrorDetail::UnsupportedPredicate { kind }),
            source: None,
        }
    }

    /// Construct a fail-fast error for an operation this core never renders.
    pub(crate) fn unsupported_operation(operation: &'static str) -> Self {
        Self {
            class: ErrorClass::Unsupported,
            origin: ErrorOrigin::Render,
            message: format!("operation [{operation}] is not supported"),
            detail: Some(ErrorDetail::UnsupportedOperation { operation }),
            source: None,
        }
    }

    /// Wrap a native engine failure without altering it.
    pub(crate) fn engine(source: BoxError) -> Self {
        Self {
            class: ErrorClass::Engine,
            origin: ErrorOrigin::Engine,
            message: format!("native query execution failed: {source}"),
            detail: None,
            source: Some(source),
        }
    }

    /// Construct a render-origin invariant violation.
    pub(crate) fn render_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Render,
            message.into(),
        )
    }

    /// Construct a predicate-origin shape violation.
    pub(crate) fn predicate_shape(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Predicate,
            message.into(),
        )
    }

    /// Aggregate close handler failures collected during `close`.
    pub(crate) fn close_handlers(failures: Vec<String>) -> Self {
        Self {
            class: ErrorClass::Internal,
            origin: ErrorOrigin::Pipeline,
            message: format!(
                "{} close handler(s) failed: {}",
                failures.len(),
                failures.join("; ")
            ),
            detail: Some(ErrorDetail::CloseHandlers { failures }),
            source: None,
        }
    }

    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self.class, ErrorClass::InvalidState)
    }

    #[must_use]
    pub const fn is_unsupported_predicate(&self) -> bool {
        matches!(self.detail, Some(ErrorDetail::UnsupportedPredicate { .. }))
    }

    #[must_use]
    pub const fn is_unsupported_operation(&self) -> bool {
        matches!(self.detail, Some(ErrorDetail::UnsupportedOperation { .. }))
    }

    #[must_use]
    pub const fn is_engine(&self) -> bool {
        matches!(self.class, ErrorClass::Engine)
    }

    /// Kind label of the predicate that failed to map, if any.
    #[must_use]
    pub fn unsupported_predicate_kind(&self) -> Option<&str> {
        match &self.detail {
            Some(ErrorDetail::UnsupportedPredicate { kind }) => Some(kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`Error`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("pipeline is {state}")]
    InvalidState { state: PipelineState },

    #[error("unsupported predicate: {kind}")]
    UnsupportedPredicate { kind: String },

    #[error("unsupported operation: {operation}")]
    UnsupportedOperation { operation: &'static str },

    #[error("close handlers failed: {}", failures.join("; "))]
    CloseHandlers { failures: Vec<String> },
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    InvalidState,
    Unsupported,
    Engine,
    Internal,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidState => "invalid_state",
            Self::Unsupported => "unsupported",
            Self::Engine => "engine",
            Self::Internal => "internal",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Predicate,
    Pipeline,
    Mapper,
    Merge,
    Render,
    Engine,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Predicate => "predicate",
            Self::Pipeline => "pipeline",
            Self::Mapper => "mapper",
            Self::Merge => "merge",
            Self::Render => "render",
            Self::Engine => "engine",
        };
        write!(f, "{label}")
    }
}
