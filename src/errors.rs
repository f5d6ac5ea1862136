//! Error types shared across the application.

use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Requested workspace, message, or delay does not exist.
    NotFound(String),
    /// Internal contract broken by a caller; indicates a bug upstream.
    InvariantViolation(String),
    /// Targeting or layout evaluation failure.
    Evaluation(String),
    /// Rendering or view lifecycle failure.
    Present(String),
    /// Analytics emission failure.
    Track(String),
    /// No component supports the requested type or action.
    Unsupported(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// A collaborator panicked while handling one event.
    Panicked(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            Self::Evaluation(msg) => write!(f, "evaluation: {msg}"),
            Self::Present(msg) => write!(f, "present: {msg}"),
            Self::Track(msg) => write!(f, "track: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("invalid json: {err}"))
    }
}

/// Run `f`, turning a panic inside it into `AppError::Panicked`.
///
/// Used around calls into host-provided collaborators made from background
/// tasks and from the host's event callback.
///
/// # Errors
///
/// Returns the error of `f`, or `AppError::Panicked` with the panic message.
pub fn catch_panic<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let msg = if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_owned()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_owned()
        };
        Err(AppError::Panicked(msg))
    })
}
