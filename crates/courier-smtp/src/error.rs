//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket or TLS stream I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS configuration or handshake error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The server answered with a non-success reply.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 535).
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// The server sent something that is not a well-formed reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Envelope address rejected before it reached the wire.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// The server closed the connection mid-reply.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Feature not advertised by the server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }
}
