//! Input validation for addresses, URLs, ports and hosts.
//!
//! These checks run at the input boundary; the rest of the pipeline only
//! sees values that already passed them.

use std::fmt;
use std::str::FromStr;

use url::Url;

/// Validation error for operator-supplied values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address format is invalid.
    InvalidEmail,
    /// URL is not an absolute http(s) URL with a host.
    InvalidUrl,
    /// Port is not a number in 1-65535.
    InvalidPort,
    /// Hostname does not resolve.
    UnknownHost,
    /// Subject is empty.
    EmptySubject,
    /// Body is empty.
    EmptyBody,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "Please enter a valid email address",
            Self::InvalidUrl => "Please enter a valid http(s) URL",
            Self::InvalidPort => "Please enter a valid TCP port number (1-65535)",
            Self::UnknownHost => "Please enter a resolvable SMTP server hostname",
            Self::EmptySubject => "Message subject is empty",
            Self::EmptyBody => "Message body is empty",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "email",
            Self::InvalidUrl => "url",
            Self::InvalidPort => "port",
            Self::UnknownHost => "server",
            Self::EmptySubject => "subject",
            Self::EmptyBody => "body",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// A syntactically valid `local@domain` address with a dotted domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses and validates an address; surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmail`] if the format is invalid.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let email = input.trim();
        if is_valid_email(email) {
            Ok(Self(email.to_string()))
        } else {
            Err(ValidationError::InvalidEmail)
        }
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl FromStr for EmailAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_valid_email(email: &str) -> bool {
    if email
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | ',' | ';'))
    {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain must be dotted with no empty labels
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

/// Parses an absolute `http`/`https` URL with a host.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidUrl`] otherwise.
pub fn parse_http_url(input: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(input.trim()).map_err(|_| ValidationError::InvalidUrl)?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url),
        _ => Err(ValidationError::InvalidUrl),
    }
}

/// Parses a TCP port in 1-65535.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidPort`] otherwise.
pub fn parse_port(input: &str) -> Result<u16, ValidationError> {
    match input.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ValidationError::InvalidPort),
    }
}

/// Checks that `host` resolves to at least one address.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownHost`] if resolution fails or yields
/// nothing.
pub async fn resolve_host(host: &str) -> Result<(), ValidationError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ValidationError::UnknownHost);
    }
    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|_| ValidationError::UnknownHost)?;
    if addrs.next().is_some() {
        Ok(())
    } else {
        Err(ValidationError::UnknownHost)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(EmailAddress::parse("user@example.com").is_ok());
        assert!(EmailAddress::parse("user.name+tag@sub.example.com").is_ok());
        assert_eq!(
            EmailAddress::parse("  b@y.com ").unwrap().as_str(),
            "b@y.com"
        );
    }

    #[test]
    fn test_invalid_email() {
        for bad in [
            "",
            "user",
            "@example.com",
            "user@",
            "user@example",
            "user@@example.com",
            "user@example..com",
            "user name@example.com",
            "user@example.com>",
        ] {
            assert_eq!(
                EmailAddress::parse(bad),
                Err(ValidationError::InvalidEmail),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_domain() {
        let addr: EmailAddress = "a@x.com".parse().unwrap();
        assert_eq!(addr.domain(), "x.com");
    }

    #[test]
    fn test_url() {
        assert!(parse_http_url("https://example.com/path?q=1").is_ok());
        assert!(parse_http_url("http://localhost:8080").is_ok());
        assert_eq!(
            parse_http_url("ftp://example.com"),
            Err(ValidationError::InvalidUrl)
        );
        assert_eq!(parse_http_url("example.com"), Err(ValidationError::InvalidUrl));
        assert_eq!(parse_http_url(""), Err(ValidationError::InvalidUrl));
    }

    #[test]
    fn test_port() {
        assert_eq!(parse_port("587"), Ok(587));
        assert_eq!(parse_port(" 25 "), Ok(25));
        assert_eq!(parse_port("65535"), Ok(65535));
        assert_eq!(parse_port("0"), Err(ValidationError::InvalidPort));
        assert_eq!(parse_port("65536"), Err(ValidationError::InvalidPort));
        assert_eq!(parse_port("smtp"), Err(ValidationError::InvalidPort));
    }

    #[tokio::test]
    async fn test_resolve_host() {
        assert!(resolve_host("localhost").await.is_ok());
        assert_eq!(resolve_host("").await, Err(ValidationError::UnknownHost));
        assert_eq!(
            resolve_host("no-such-host.invalid").await,
            Err(ValidationError::UnknownHost)
        );
    }

    #[test]
    fn test_messages_name_field() {
        assert_eq!(ValidationError::InvalidPort.field(), "port");
        assert!(ValidationError::InvalidEmail.to_string().contains("email"));
    }
}
