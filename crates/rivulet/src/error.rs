#![forbid(unsafe_code)]

//! Error types.
//!
//! [`StreamError`] is the payload of the error terminal of a stream. It is
//! cheap to clone so a single rejection (for example a settled [`Promise`])
//! can be delivered to many independent subscriptions.
//!
//! [`Promise`]: crate::promise::Promise

use std::fmt;
use std::rc::Rc;

/// Error delivered through a stream's error terminal.
#[derive(Clone)]
pub struct StreamError {
    message: Rc<str>,
    source: Option<Rc<dyn std::error::Error>>,
}

impl StreamError {
    /// Create an error carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Rc::from(message.into()),
            source: None,
        }
    }

    /// Wrap an arbitrary error; its `Display` output becomes the message.
    #[must_use]
    pub fn from_error<E: std::error::Error + 'static>(err: E) -> Self {
        Self {
            message: Rc::from(err.to_string()),
            source: Some(Rc::new(err)),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamError")
            .field("message", &self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref()
    }
}

/// Two stream errors are equal when their messages are equal.
impl PartialEq for StreamError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Eq for StreamError {}

impl From<&str> for StreamError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for StreamError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Error from [`Promise::wait`](crate::promise::Promise::wait).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The promise has not settled yet.
    Pending,
    /// The promise settled with a rejection.
    Rejected(StreamError),
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "promise is still pending"),
            Self::Rejected(err) => write!(f, "promise rejected: {err}"),
        }
    }
}

impl std::error::Error for WaitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pending => None,
            Self::Rejected(err) => Some(err),
        }
    }
}

/// Errors from `init_logging` (the `logging` feature).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    InvalidFilter(String),
    /// A global subscriber was already installed.
    AlreadyInitialized,
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter(msg) => write!(f, "invalid log filter: {msg}"),
            Self::AlreadyInitialized => write!(f, "a global tracing subscriber is already set"),
        }
    }
}

impl std::error::Error for LoggingError {}
