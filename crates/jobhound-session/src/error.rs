//! Session error types.

use jobhound_browser::BrowserError;
use thiserror::Error;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised while establishing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The login page could not be driven
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// The credential file could not be written
    #[error("credential I/O error: {0}")]
    CredentialIo(#[from] std::io::Error),

    /// The credential could not be encoded
    #[error("credential format error: {0}")]
    CredentialFormat(#[from] serde_json::Error),

    /// A [`QrCodeSink`](crate::QrCodeSink) refused the code
    #[error("QR code delivery failed: {0}")]
    Delivery(String),
}
