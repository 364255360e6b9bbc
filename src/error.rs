//! Error types for the mediator.

use std::fmt;

use thiserror::Error;

/// Boxed error raised by user code (handlers, behaviors, processors).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single field-level failure reported by a [`Validator`](crate::pipeline::Validator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Name of the offending field.
    pub field: String,
    /// Human readable failure message.
    pub message: String,
}

impl ValidationFailure {
    /// Create a new validation failure.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Main error type for all mediator operations.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// No handler registered for the request or stream request type.
    #[error("Handler not found for {0}")]
    HandlerNotFound(&'static str),

    /// A second handler was registered for a single-handler message type.
    #[error("Duplicate handler registered for {0}")]
    DuplicateHandler(&'static str),

    /// One or more validators rejected the request.
    #[error("Validation failed: {}", join_display(.0))]
    ValidationFailed(Vec<ValidationFailure>),

    /// Every failure collected while publishing a notification.
    #[error("{} notification handler(s) failed: {}", .0.len(), join_display(.0))]
    AggregateNotificationFailure(Vec<MediatorError>),

    /// The cancellation signal fired before or during processing.
    #[error("Operation canceled")]
    Canceled,

    /// A type-erased value is not a registered message of the expected kind.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure raised by a handler, behavior or processor.
    #[error(transparent)]
    Handler(BoxError),
}

impl MediatorError {
    /// Wrap an arbitrary user error.
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        MediatorError::Handler(err.into())
    }

    /// Build a user error from a plain message.
    pub fn message(msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        MediatorError::Handler(msg.into())
    }

    /// Whether this error is a cancellation.
    #[inline]
    pub fn is_canceled(&self) -> bool {
        matches!(self, MediatorError::Canceled)
    }

    /// Downcast the wrapped user error, if this is a [`MediatorError::Handler`].
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            MediatorError::Handler(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Individual failures of an aggregate, or an empty slice.
    pub fn failures(&self) -> &[MediatorError] {
        match self {
            MediatorError::AggregateNotificationFailure(errors) => errors,
            _ => &[],
        }
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using MediatorError.
pub type Result<T> = std::result::Result<T, MediatorError>;
