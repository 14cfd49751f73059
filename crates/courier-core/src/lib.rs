//! # courier-core
//!
//! Composition and delivery pipeline for `courier`.
//!
//! This crate provides:
//! - **Templates**: a catalog of static HTML messages with literal
//!   placeholder substitution
//! - **Settings**: a sectioned key/value file holding transport and
//!   provider credentials, flushed atomically
//! - **Generation**: drafting a subject and HTML body with a text-completion
//!   provider
//! - **Review**: the generate → present → confirm loop run before a draft
//!   is accepted
//! - **Composer**: turns either strategy into a validated [`Message`]
//! - **Transport**: connect → STARTTLS → AUTH → send → QUIT over SMTP

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod composer;
mod error;
pub mod generation;
pub mod message;
pub mod review;
pub mod settings;
pub mod template;
pub mod transport;
pub mod validation;

pub use composer::MessageComposer;
pub use error::{Error, Result};
pub use generation::{
    CompletionProvider, GenerationClient, GenerationError, GenerationRequest, GenerationResult,
    OpenAiProvider,
};
pub use message::Message;
pub use review::{ReviewLoop, ReviewState};
pub use settings::{ProviderCredentials, SettingsError, SettingsStore, TransportCredentials};
pub use template::{Bindings, Rendered, Template, TemplateError, TemplateStore};
pub use transport::{LiveSession, MailTransport, SmtpSession, TransportError};
pub use validation::{EmailAddress, ValidationError};
