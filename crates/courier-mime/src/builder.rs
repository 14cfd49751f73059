//! `multipart/alternative` message serialization.

use crate::content_type::ContentType;
use crate::encoding::encode_base64_wrapped;
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt::Write as _;

/// `=` followed by `_` never occurs in base64 output, so this boundary
/// cannot collide with an encoded part.
const DEFAULT_BOUNDARY: &str = "=_courier_alternative";

/// RFC 2046 limit on boundary length.
const MAX_BOUNDARY_LENGTH: usize = 70;

/// Headers required on every outgoing message.
const REQUIRED_HEADERS: [&str; 3] = ["From", "To", "Subject"];

/// A message with a plain-text and an HTML rendition of one body.
#[derive(Debug, Clone)]
pub struct AlternativeMessage {
    headers: Headers,
    text: String,
    html: String,
    boundary: String,
}

impl AlternativeMessage {
    /// Creates a message from top-level headers and both renditions.
    #[must_use]
    pub fn new(headers: Headers, text: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            headers,
            text: text.into(),
            html: html.into(),
            boundary: DEFAULT_BOUNDARY.to_string(),
        }
    }

    /// Overrides the multipart boundary.
    #[must_use]
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    /// Serializes to RFC 5322 bytes with CRLF line endings.
    ///
    /// Both parts are base64 encoded, so arbitrary UTF-8 and long lines in
    /// the HTML survive any relay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] if From/To/Subject are absent, or
    /// [`Error::InvalidBoundary`] if the boundary is unusable.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        for name in REQUIRED_HEADERS {
            if !self.headers.contains(name) {
                return Err(Error::MissingHeader(name.to_string()));
            }
        }
        self.check_boundary()?;

        let boundary = &self.boundary;
        let mut out = String::new();
        out.push_str(&self.headers.to_string());
        out.push_str("MIME-Version: 1.0\r\n");
        let _ = write!(
            out,
            "Content-Type: {}\r\n",
            ContentType::multipart_alternative(boundary.as_str())
        );
        out.push_str("\r\n");

        for (content_type, body) in [
            (ContentType::text_plain(), &self.text),
            (ContentType::text_html(), &self.html),
        ] {
            let _ = write!(out, "--{boundary}\r\n");
            let _ = write!(out, "Content-Type: {content_type}\r\n");
            out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
            out.push_str(&encode_base64_wrapped(body.as_bytes()));
        }
        let _ = write!(out, "--{boundary}--\r\n");

        Ok(out.into_bytes())
    }

    fn check_boundary(&self) -> Result<()> {
        let boundary = &self.boundary;
        if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LENGTH {
            return Err(Error::InvalidBoundary(format!(
                "length must be 1-{MAX_BOUNDARY_LENGTH}"
            )));
        }
        if !boundary.chars().all(|c| c.is_ascii_graphic() && c != '"') {
            return Err(Error::InvalidBoundary(boundary.clone()));
        }
        Ok(())
    }
}
