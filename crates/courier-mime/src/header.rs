//! Header block construction.

use crate::encoding::encode_rfc2047;
use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone};
use std::fmt;

/// Ordered header fields; emitted in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header whose value is already wire-safe ASCII.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the name is not a token or the
    /// value contains CR or LF.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = checked_name(name.into())?;
        let value = value.into();

        if value.contains(['\r', '\n']) {
            return Err(Error::InvalidHeader(format!(
                "{name} value contains a line break"
            )));
        }

        self.fields.push((name, value));
        Ok(())
    }

    /// Appends free text, RFC 2047 encoding it if needed. Long encoded
    /// text is folded over several lines.
    ///
    /// # Errors
    ///
    /// Same as [`Headers::add`].
    pub fn add_encoded(&mut self, name: impl Into<String>, text: &str) -> Result<()> {
        let name = checked_name(name.into())?;
        if text.contains(['\r', '\n']) {
            return Err(Error::InvalidHeader(format!(
                "{name} value contains a line break"
            )));
        }
        self.fields.push((name, encode_rfc2047(text, "utf-8")));
        Ok(())
    }

    /// Appends a `Date` header in RFC 2822 format.
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares the signature of [`Headers::add`].
    pub fn add_date<Tz>(&mut self, date: &DateTime<Tz>) -> Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.add("Date", date.to_rfc2822())
    }

    /// Gets the first value for a header (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates fields in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

fn checked_name(name: String) -> Result<String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_graphic() && c != ':') {
        return Err(Error::InvalidHeader(format!("bad header name: {name:?}")));
    }
    Ok(name)
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn keeps_insertion_order() {
        let mut headers = Headers::new();
        headers.add("From", "a@x.com").unwrap();
        headers.add("To", "b@y.com").unwrap();
        assert_eq!(headers.to_string(), "From: a@x.com\r\nTo: b@y.com\r\n");
        assert_eq!(headers.get("from"), Some("a@x.com"));
    }

    #[test]
    fn rejects_header_injection() {
        let mut headers = Headers::new();
        assert!(headers.add("Subject", "hi\r\nBcc: x@y.z").is_err());
        assert!(headers.add_encoded("Subject", "hi\nthere").is_err());
        assert!(headers.add("Bad Name", "x").is_err());
        assert!(headers.add("", "x").is_err());
    }

    #[test]
    fn long_encoded_subject_is_folded() {
        let mut headers = Headers::new();
        let subject = "Ünïcödé ".repeat(12);
        headers.add_encoded("Subject", &subject).unwrap();

        let block = headers.to_string();
        let lines: Vec<&str> = block.trim_end().split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines[0].starts_with("Subject: =?utf-8?B?"));
        for line in &lines[1..] {
            assert!(line.starts_with(" =?utf-8?B?"), "{line}");
        }
        assert!(lines.iter().all(|line| line.len() <= 76));
        assert!(headers.add_encoded("Bad:Name", "x").is_err());
    }

    #[test]
    fn date_is_rfc2822() {
        let mut headers = Headers::new();
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 9, 30, 0)
            .unwrap();
        headers.add_date(&date).unwrap();
        assert_eq!(headers.get("Date"), Some("Mon, 19 Oct 2026 09:30:00 +0000"));
    }
}
