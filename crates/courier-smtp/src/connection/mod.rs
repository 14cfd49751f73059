//! Connection management and the type-state client.

mod client;
mod stream;

pub use client::{
    Authenticated, Client, Closing, Connected, Data, MailTransaction, RecipientAdded, Rejected,
    SmtpConnection, Transition,
};
pub use stream::{SmtpStream, connect};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// What the server told us about itself.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Hostname from the greeting.
    pub hostname: String,
    /// Extensions from the most recent EHLO.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server advertised an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS was advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the advertised SASL mechanisms we understand.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Picks PLAIN unless the server only offers LOGIN.
    #[must_use]
    pub fn preferred_mechanism(&self) -> AuthMechanism {
        let offered = self.auth_mechanisms();
        if !offered.contains(&AuthMechanism::Plain) && offered.contains(&AuthMechanism::Login) {
            AuthMechanism::Login
        } else {
            AuthMechanism::Plain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "mx.example.com".into(),
            extensions: lines.iter().map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn prefers_plain() {
        let server = info(&["AUTH LOGIN PLAIN", "STARTTLS"]);
        assert_eq!(server.preferred_mechanism(), AuthMechanism::Plain);
        assert!(server.supports_starttls());
    }

    #[test]
    fn falls_back_to_login() {
        let server = info(&["AUTH LOGIN"]);
        assert_eq!(server.preferred_mechanism(), AuthMechanism::Login);
    }

    #[test]
    fn defaults_to_plain_without_auth_line() {
        let server = info(&["8BITMIME"]);
        assert!(server.auth_mechanisms().is_empty());
        assert_eq!(server.preferred_mechanism(), AuthMechanism::Plain);
        assert!(!server.supports_starttls());
    }
}
