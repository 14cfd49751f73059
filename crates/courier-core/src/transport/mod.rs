//! Authenticated SMTP delivery of a finished [`Message`].
//!
//! [`MailTransport`] drives an [`SmtpSession`] through a fixed sequence:
//!
//! ```text
//! connect → handshake → upgrade (STARTTLS) → authenticate → transmit → close
//! ```
//!
//! A failing step skips the rest, but `close` is always attempted.

mod live;

pub use live::LiveSession;

use std::fmt::Display;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use courier_smtp::Address;
use tracing::{debug, info, warn};

use crate::message::Message;
use crate::settings::TransportCredentials;

const REDACTED: &str = "********";

/// Delivery failures, by phase.
///
/// Messages never contain the SMTP password.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// TCP connect to the relay failed.
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// Greeting, EHLO or STARTTLS failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The relay rejected the credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The envelope or message content was rejected.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// One SMTP conversation, step by step.
///
/// Steps are called at most once each, in declaration order.
#[allow(async_fn_in_trait)]
pub trait SmtpSession {
    /// Opens the TCP connection.
    async fn connect(&mut self, server: &str, port: u16) -> courier_smtp::Result<()>;

    /// Reads the greeting and sends EHLO.
    async fn handshake(&mut self) -> courier_smtp::Result<()>;

    /// Issues STARTTLS and repeats EHLO over TLS.
    async fn upgrade(&mut self, server: &str) -> courier_smtp::Result<()>;

    /// Authenticates with the relay.
    async fn authenticate(&mut self, username: &str, password: &str) -> courier_smtp::Result<()>;

    /// Sends MAIL FROM, RCPT TO and DATA with `data` as content.
    async fn transmit(
        &mut self,
        from: &Address,
        to: &Address,
        data: &[u8],
    ) -> courier_smtp::Result<()>;

    /// Sends QUIT if a conversation is open.
    async fn close(&mut self) -> courier_smtp::Result<()>;
}

/// Delivers messages over an [`SmtpSession`].
#[derive(Debug)]
pub struct MailTransport<S> {
    session: S,
}

impl<S: SmtpSession> MailTransport<S> {
    /// Wraps a session.
    pub const fn new(session: S) -> Self {
        Self { session }
    }

    /// Returns the underlying session.
    pub fn into_inner(self) -> S {
        self.session
    }

    /// Delivers `message` using `credentials`.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] of the first failing step. A failure
    /// of the final `close` is logged and does not fail an otherwise
    /// successful delivery.
    pub async fn deliver(
        &mut self,
        credentials: &TransportCredentials,
        message: &Message,
    ) -> Result<(), TransportError> {
        let secrets = Secrets::of(credentials);

        let data = message
            .to_mime(&Local::now())
            .map_err(|e| TransportError::Delivery(e.to_string()))?;
        let from = Address::new(message.sender().as_str())
            .map_err(|e| TransportError::Delivery(secrets.redact(&e)))?;
        let to = Address::new(message.recipient().as_str())
            .map_err(|e| TransportError::Delivery(secrets.redact(&e)))?;

        let outcome = self.run(credentials, &secrets, &from, &to, &data).await;

        if let Err(e) = self.session.close().await {
            warn!(error = %secrets.redact(&e), "QUIT failed");
        }

        if outcome.is_ok() {
            info!(
                server = %credentials.server,
                recipient = %message.recipient(),
                bytes = data.len(),
                "message delivered"
            );
        }
        outcome
    }

    async fn run(
        &mut self,
        credentials: &TransportCredentials,
        secrets: &Secrets,
        from: &Address,
        to: &Address,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let server = credentials.server.as_str();

        debug!(server, port = credentials.port, "connecting");
        self.session
            .connect(server, credentials.port)
            .await
            .map_err(|e| TransportError::Connect(secrets.redact(&e)))?;

        debug!("greeting and EHLO");
        self.session
            .handshake()
            .await
            .map_err(|e| TransportError::Handshake(secrets.redact(&e)))?;

        debug!("STARTTLS");
        self.session
            .upgrade(server)
            .await
            .map_err(|e| TransportError::Handshake(secrets.redact(&e)))?;

        debug!(username = %credentials.username, "authenticating");
        self.session
            .authenticate(&credentials.username, &credentials.password)
            .await
            .map_err(|e| TransportError::Auth(secrets.redact(&e)))?;

        debug!("sending envelope and content");
        self.session
            .transmit(from, to, data)
            .await
            .map_err(|e| TransportError::Delivery(secrets.redact(&e)))
    }
}

/// Every form in which the password can reach the wire: plain, as an
/// AUTH LOGIN response and inside an AUTH PLAIN payload.
struct Secrets(Vec<String>);

impl Secrets {
    fn of(credentials: &TransportCredentials) -> Self {
        let password = credentials.password.as_str();
        if password.is_empty() {
            return Self(Vec::new());
        }
        let plain = format!("\0{}\0{password}", credentials.username);
        // Longest first, so a short password cannot break up an encoded form.
        Self(vec![
            STANDARD.encode(plain),
            STANDARD.encode(password),
            password.to_string(),
        ])
    }

    fn redact(&self, error: &impl Display) -> String {
        self.0
            .iter()
            .fold(error.to_string(), |text, secret| text.replace(secret.as_str(), REDACTED))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::validation::EmailAddress;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        Connect,
        Handshake,
        Upgrade,
        Authenticate,
        Transmit,
        Close,
    }

    #[derive(Default)]
    struct FakeSession {
        calls: Vec<Step>,
        fail_at: Option<Step>,
        reply_text: Option<String>,
        sent: Vec<u8>,
    }

    impl FakeSession {
        fn failing_at(step: Step) -> Self {
            Self {
                fail_at: Some(step),
                ..Self::default()
            }
        }

        fn step(&mut self, step: Step) -> courier_smtp::Result<()> {
            self.calls.push(step);
            if self.fail_at == Some(step) {
                let text = self
                    .reply_text
                    .clone()
                    .unwrap_or_else(|| "5.7.8 credentials hunter2 rejected".into());
                Err(courier_smtp::Error::smtp_error(535, text))
            } else {
                Ok(())
            }
        }
    }

    impl SmtpSession for FakeSession {
        async fn connect(&mut self, _server: &str, _port: u16) -> courier_smtp::Result<()> {
            self.step(Step::Connect)
        }

        async fn handshake(&mut self) -> courier_smtp::Result<()> {
            self.step(Step::Handshake)
        }

        async fn upgrade(&mut self, _server: &str) -> courier_smtp::Result<()> {
            self.step(Step::Upgrade)
        }

        async fn authenticate(&mut self, _user: &str, _pass: &str) -> courier_smtp::Result<()> {
            self.step(Step::Authenticate)
        }

        async fn transmit(
            &mut self,
            _from: &Address,
            _to: &Address,
            data: &[u8],
        ) -> courier_smtp::Result<()> {
            self.sent = data.to_vec();
            self.step(Step::Transmit)
        }

        async fn close(&mut self) -> courier_smtp::Result<()> {
            self.step(Step::Close)
        }
    }

    fn credentials() -> TransportCredentials {
        TransportCredentials {
            server: "smtp.example.com".into(),
            port: 587,
            username: "alice@example.com".into(),
            password: "hunter2".into(),
        }
    }

    fn message() -> Message {
        Message::new(
            EmailAddress::parse("alice@example.com").unwrap(),
            EmailAddress::parse("bob@example.org").unwrap(),
            "Hello",
            "<p>Hi Bob</p>",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn runs_every_step_in_order() {
        let mut transport = MailTransport::new(FakeSession::default());
        transport.deliver(&credentials(), &message()).await.unwrap();

        let session = transport.into_inner();
        assert_eq!(
            session.calls,
            vec![
                Step::Connect,
                Step::Handshake,
                Step::Upgrade,
                Step::Authenticate,
                Step::Transmit,
                Step::Close,
            ]
        );
        let sent = String::from_utf8(session.sent).unwrap();
        assert!(sent.contains("Subject: Hello\r\n"));
    }

    #[tokio::test]
    async fn auth_failure_skips_transmit_and_still_closes() {
        let mut transport = MailTransport::new(FakeSession::failing_at(Step::Authenticate));
        let err = transport
            .deliver(&credentials(), &message())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Auth(_)));
        assert!(!err.to_string().contains("hunter2"));

        let session = transport.into_inner();
        assert!(!session.calls.contains(&Step::Transmit));
        assert_eq!(session.calls.last(), Some(&Step::Close));
    }

    #[tokio::test]
    async fn encoded_password_never_echoed() {
        let login = STANDARD.encode("hunter2");
        let plain = STANDARD.encode("\0alice@example.com\0hunter2");
        let mut session = FakeSession::failing_at(Step::Authenticate);
        session.reply_text = Some(format!("5.7.8 bad response {login} to AUTH PLAIN {plain}"));

        let mut transport = MailTransport::new(session);
        let err = transport
            .deliver(&credentials(), &message())
            .await
            .unwrap_err();

        let text = err.to_string();
        assert!(!text.contains(&login), "{text}");
        assert!(!text.contains(&plain), "{text}");
        assert!(text.contains("bad response ******** to AUTH PLAIN ********"));
    }

    #[test]
    fn empty_password_redacts_nothing() {
        let mut creds = credentials();
        creds.password = String::new();
        let secrets = Secrets::of(&creds);
        assert_eq!(secrets.redact(&"535 rejected"), "535 rejected");
    }

    #[tokio::test]
    async fn maps_each_phase() {
        let cases = [
            (Step::Connect, "connect"),
            (Step::Handshake, "handshake"),
            (Step::Upgrade, "handshake"),
            (Step::Transmit, "delivery"),
        ];
        for (step, expected) in cases {
            let mut transport = MailTransport::new(FakeSession::failing_at(step));
            let err = transport
                .deliver(&credentials(), &message())
                .await
                .unwrap_err();
            let phase = match err {
                TransportError::Connect(_) => "connect",
                TransportError::Handshake(_) => "handshake",
                TransportError::Auth(_) => "auth",
                TransportError::Delivery(_) => "delivery",
            };
            assert_eq!(phase, expected, "failure at {step:?}");
            assert_eq!(transport.into_inner().calls.last(), Some(&Step::Close));
        }
    }

    #[tokio::test]
    async fn close_failure_after_success_is_not_an_error() {
        let mut transport = MailTransport::new(FakeSession::failing_at(Step::Close));
        assert!(transport.deliver(&credentials(), &message()).await.is_ok());
    }
}
