//! Command serialization.

use crate::types::{Address, AuthMechanism};

/// Commands the submission client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO with the client's name
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS
    StartTls,
    /// AUTH, optionally with an initial response (SASL-IR)
    Auth {
        /// Mechanism
        mechanism: AuthMechanism,
        /// Base64 initial response
        initial_response: Option<String>,
    },
    /// A bare base64 line answering a 334 challenge
    AuthResponse(String),
    /// MAIL FROM
    MailFrom {
        /// Reverse path
        from: Address,
    },
    /// RCPT TO
    RcptTo {
        /// Forward path
        to: Address,
    },
    /// DATA
    Data,
    /// QUIT
    Quit,
}

impl Command {
    /// Serializes the command, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response: Some(resp),
            } => format!("AUTH {} {resp}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {}", mechanism.as_str()),
            Self::AuthResponse(resp) => resp.clone(),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        };

        let mut buf = line.into_bytes();
        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns true if the serialized form carries secret material and must
    /// not be logged.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::AuthResponse(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wire(cmd: &Command) -> String {
        String::from_utf8(cmd.serialize()).unwrap()
    }

    #[test]
    fn envelope_commands() {
        let from = Address::new("alice@example.com").unwrap();
        let to = Address::new("bob@example.org").unwrap();
        assert_eq!(
            wire(&Command::MailFrom { from }),
            "MAIL FROM:<alice@example.com>\r\n"
        );
        assert_eq!(wire(&Command::RcptTo { to }), "RCPT TO:<bob@example.org>\r\n");
    }

    #[test]
    fn auth_with_and_without_initial_response() {
        let plain = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AGFsaWNlAHNlY3JldA==".into()),
        };
        assert_eq!(wire(&plain), "AUTH PLAIN AGFsaWNlAHNlY3JldA==\r\n");
        assert!(plain.is_sensitive());

        let login = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(wire(&login), "AUTH LOGIN\r\n");
    }

    #[test]
    fn simple_commands() {
        assert_eq!(
            wire(&Command::Ehlo {
                hostname: "localhost".into()
            }),
            "EHLO localhost\r\n"
        );
        assert_eq!(wire(&Command::StartTls), "STARTTLS\r\n");
        assert_eq!(wire(&Command::Data), "DATA\r\n");
        assert_eq!(wire(&Command::Quit), "QUIT\r\n");
        assert!(!Command::Quit.is_sensitive());
    }
}
