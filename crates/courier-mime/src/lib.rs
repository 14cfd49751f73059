//! # courier-mime
//!
//! Serializes outgoing mail: ordered headers, RFC 2047 encoded words for
//! non-ASCII header text, and a `multipart/alternative` body carrying a
//! plain-text and an HTML rendition of the same content.
//!
//! ```ignore
//! use courier_mime::{AlternativeMessage, Headers};
//!
//! let mut headers = Headers::new();
//! headers.add("From", "alice@example.com");
//! headers.add("To", "bob@example.org");
//! headers.add_encoded("Subject", "Grüße")?;
//!
//! let bytes = AlternativeMessage::new(headers, "Hello", "<p>Hello</p>")
//!     .with_boundary("b1")
//!     .to_bytes()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod content_type;
mod encoding;
mod error;
mod header;

pub use builder::AlternativeMessage;
pub use content_type::ContentType;
pub use encoding::{encode_base64_wrapped, encode_rfc2047};
pub use error::{Error, Result};
pub use header::Headers;
