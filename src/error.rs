//! Error types for the streaming JSON parser.

use crate::types::ValueKind;
use thiserror::Error;

/// Error reported by a fragment producer.
///
/// A producer terminates its sequence by yielding one `Err` item; the
/// parser surfaces it to every open sink as [`PathStreamError::Stream`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct FragmentError(pub String);

impl FragmentError {
    pub fn new(message: impl Into<String>) -> Self {
        FragmentError(message.into())
    }
}

/// Main error type for path subscriptions.
///
/// Errors are cloneable so that a single failure (a producer fault, a
/// dispose) can close every affected sink with the same value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathStreamError {
    /// The producer yielded an error, or ended before the root value
    /// was complete. Closes every open sink.
    #[error("stream failed: {message}")]
    Stream { message: String },

    /// A subscription collided with an existing sink of a different kind.
    /// The existing sink is closed with this error and the colliding call
    /// receives it.
    #[error("kind conflict at \"{path}\": sink is {existing}, requested {requested}")]
    KindConflict {
        path: String,
        existing: ValueKind,
        requested: ValueKind,
    },

    /// The root value completed without the parse ever visiting this path.
    #[error("path \"{path}\" was never visited")]
    PathNotFound { path: String },

    /// A delegate hit a locally invalid character sequence. Only the
    /// affected sink closes; sibling paths keep streaming.
    #[error("invalid value at \"{path}\": {message}")]
    Parse { path: String, message: String },

    /// Operation attempted after `dispose()`, or a new subscription after
    /// a stream fault.
    #[error("parser disposed")]
    Disposed,
}

impl PathStreamError {
    /// The path this error pertains to, if it is path-scoped.
    pub fn path(&self) -> Option<&str> {
        match self {
            PathStreamError::KindConflict { path, .. }
            | PathStreamError::PathNotFound { path }
            | PathStreamError::Parse { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether this error takes down the whole parse rather than a
    /// single sink.
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            PathStreamError::Stream { .. } | PathStreamError::Disposed
        )
    }
}

impl From<FragmentError> for PathStreamError {
    fn from(err: FragmentError) -> Self {
        PathStreamError::Stream { message: err.0 }
    }
}
