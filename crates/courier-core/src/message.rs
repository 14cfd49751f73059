//! The finished message handed from composition to delivery.

use chrono::{DateTime, TimeZone};
use courier_mime::{AlternativeMessage, Headers};
use std::fmt;
use tracing::debug;

use crate::validation::{EmailAddress, ValidationError};

/// One message for one recipient.
///
/// Construction through [`Message::new`] guarantees a non-empty subject and
/// body; the addresses are validated by their type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender: EmailAddress,
    recipient: EmailAddress,
    subject: String,
    body: String,
}

impl Message {
    /// Creates a message.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptySubject`] or
    /// [`ValidationError::EmptyBody`] if either is blank.
    pub fn new(
        sender: EmailAddress,
        recipient: EmailAddress,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let subject = subject.into();
        let body = body.into();

        if subject.trim().is_empty() {
            return Err(ValidationError::EmptySubject);
        }
        if body.trim().is_empty() {
            return Err(ValidationError::EmptyBody);
        }

        Ok(Self {
            sender,
            recipient,
            subject,
            body,
        })
    }

    /// Envelope and `From` address.
    #[must_use]
    pub const fn sender(&self) -> &EmailAddress {
        &self.sender
    }

    /// Envelope and `To` address.
    #[must_use]
    pub const fn recipient(&self) -> &EmailAddress {
        &self.recipient
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// HTML body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Plain-text rendition of the HTML body, used as the first
    /// alternative part. Falls back to the raw body if conversion fails.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match htmd::convert(&self.body) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => self.body.clone(),
            Err(e) => {
                debug!("HTML to text conversion failed, sending raw body: {e}");
                self.body.clone()
            }
        }
    }

    /// Serializes to RFC 5322 bytes: `From`/`To`/`Subject`/`Date`/
    /// `Message-ID` headers and a `multipart/alternative` body.
    ///
    /// # Errors
    ///
    /// Returns an error if a header value cannot be encoded (for example a
    /// subject containing a line break).
    pub fn to_mime<Tz>(&self, date: &DateTime<Tz>) -> courier_mime::Result<Vec<u8>>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let mut headers = Headers::new();
        headers.add("From", self.sender.as_str())?;
        headers.add("To", self.recipient.as_str())?;
        headers.add_encoded("Subject", &self.subject)?;
        headers.add_date(date)?;
        headers.add(
            "Message-ID",
            format!("<{}@{}>", uuid::Uuid::new_v4(), self.sender.domain()),
        )?;

        AlternativeMessage::new(headers, self.plain_text(), self.body.as_str()).to_bytes()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn addr(s: &str) -> EmailAddress {
        EmailAddress::parse(s).unwrap()
    }

    #[test]
    fn rejects_blank_subject_or_body() {
        assert_eq!(
            Message::new(addr("a@x.com"), addr("b@y.com"), "  ", "<p>x</p>"),
            Err(ValidationError::EmptySubject)
        );
        assert_eq!(
            Message::new(addr("a@x.com"), addr("b@y.com"), "Hi", "\n"),
            Err(ValidationError::EmptyBody)
        );
    }

    #[test]
    fn mime_has_headers_and_both_parts() {
        let message = Message::new(
            addr("a@x.com"),
            addr("b@y.com"),
            "Welcome aboard",
            "<h1>Hello</h1><p>Glad you are here.</p>",
        )
        .unwrap();

        let bytes = message.to_mime(&Utc::now()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("From: a@x.com\r\nTo: b@y.com\r\nSubject: Welcome aboard\r\n"));
        assert!(text.contains("\r\nDate: "));
        assert!(text.contains("\r\nMessage-ID: <"));
        assert!(text.contains("@x.com>\r\n"));
        assert!(text.contains("multipart/alternative"));
        assert!(text.contains("text/plain"));
        assert!(text.contains("text/html"));
    }

    #[test]
    fn subject_with_line_break_is_refused() {
        let message =
            Message::new(addr("a@x.com"), addr("b@y.com"), "Hi\r\nBcc: c@z.com", "<p>x</p>")
                .unwrap();
        assert!(message.to_mime(&Utc::now()).is_err());
    }

    #[test]
    fn plain_text_drops_markup() {
        let message =
            Message::new(addr("a@x.com"), addr("b@y.com"), "Hi", "<p>Hello <b>there</b></p>")
                .unwrap();
        let text = message.plain_text();
        assert!(text.contains("Hello"));
        assert!(!text.contains("<p>"));
    }
}
