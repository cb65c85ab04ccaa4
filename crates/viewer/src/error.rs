//! Viewer-level error taxonomy.
//!
//! Engine failures are folded into a small set of user-facing reasons.
//! Transient reasons (network, timeout, single-page render failures) are
//! candidates for automatic retry; structural reasons (bad format, missing
//! file, password) surface immediately because retrying cannot fix them.

use paperview_engine::EngineError;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ViewerError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("invalid document format: {0}")]
    InvalidFormat(String),

    #[error("document not found: {0}")]
    MissingDocument(String),

    #[error("document requires a password")]
    PasswordRequired,

    #[error("failed to render page {page}: {reason}")]
    RenderFailure { page: u32, reason: String },

    #[error("rendering engine unavailable: {0}")]
    EngineUnavailable(String),
}

impl ViewerError {
    /// Stable machine-readable reason code, suitable for logs and telemetry.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ViewerError::Network(_) => "network",
            ViewerError::Timeout(_) => "timeout",
            ViewerError::InvalidFormat(_) => "invalid-document-format",
            ViewerError::MissingDocument(_) => "missing-document",
            ViewerError::PasswordRequired => "password-required",
            ViewerError::RenderFailure { .. } => "render-failure",
            ViewerError::EngineUnavailable(_) => "engine-unavailable",
        }
    }

    /// Whether a retry of the same operation could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ViewerError::Network(_) | ViewerError::Timeout(_) | ViewerError::RenderFailure { .. }
        )
    }

    /// Classify an engine failure that occurred while opening a document.
    pub(crate) fn from_engine_open(err: EngineError) -> Self {
        match err {
            EngineError::Io(io_err) => match io_err.kind() {
                io::ErrorKind::NotFound => ViewerError::MissingDocument(io_err.to_string()),
                io::ErrorKind::TimedOut => ViewerError::Timeout(io_err.to_string()),
                _ => ViewerError::Network(io_err.to_string()),
            },
            EngineError::Parse(parse_err) => ViewerError::InvalidFormat(parse_err.to_string()),
            EngineError::Encrypted => ViewerError::PasswordRequired,
            EngineError::Empty => ViewerError::InvalidFormat("document has no pages".into()),
            EngineError::InvalidHandle(handle) => {
                ViewerError::EngineUnavailable(format!("stale document handle {handle}"))
            }
            EngineError::PageOutOfRange { page, page_count } => ViewerError::RenderFailure {
                page,
                reason: format!("page out of range (document has {page_count})"),
            },
            EngineError::Backend(message) => ViewerError::EngineUnavailable(message),
        }
    }

    /// Classify an engine failure that occurred while rendering one page.
    ///
    /// A single page failing to paint is always a render failure from the
    /// viewer's perspective; it does not condemn the whole document.
    pub(crate) fn from_engine_render(page: u32, err: EngineError) -> Self {
        ViewerError::RenderFailure { page, reason: err.to_string() }
    }
}
