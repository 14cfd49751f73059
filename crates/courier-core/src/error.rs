//! Error types for the core library.

use thiserror::Error;

use crate::generation::GenerationError;
use crate::settings::SettingsError;
use crate::template::TemplateError;
use crate::transport::TransportError;
use crate::validation::ValidationError;

/// Any failure of the composition and delivery pipeline.
///
/// Each variant wraps the component error unchanged so callers can tell
/// which phase failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed address, URL, port, hostname or message field.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Template lookup or loading failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Settings file could not be read or written.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The completion provider failed or answered nonsense.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// SMTP delivery failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Operator input could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
