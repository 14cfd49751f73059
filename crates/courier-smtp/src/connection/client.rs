//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::debug;

/// Greeting read, EHLO possibly sent, not yet authenticated.
#[derive(Debug)]
pub struct Connected;

/// AUTH accepted.
#[derive(Debug)]
pub struct Authenticated;

/// MAIL FROM accepted.
#[derive(Debug)]
pub struct MailTransaction;

/// At least one RCPT TO accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// DATA accepted, server waiting for content.
#[derive(Debug)]
pub struct Data;

/// A command was refused; only QUIT remains.
#[derive(Debug)]
pub struct Closing;

/// SMTP client whose state parameter limits the commands available.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Outcome of a state-changing command: the client in its next state, or
/// the reason it failed together with the client in its previous state.
pub type Transition<Next, Prev> = std::result::Result<Client<Next>, Rejected<Prev>>;

/// A failed command.
///
/// When the server answered with a refusal the connection is still usable
/// and `client` is handed back, so the caller can QUIT or try something
/// else. I/O, TLS and protocol failures leave no usable client.
#[derive(Debug)]
pub struct Rejected<S> {
    /// Why the command failed.
    pub error: Error,
    /// The client in the state it had before the command.
    pub client: Option<Client<S>>,
}

impl<S> Rejected<S> {
    fn new(error: Error, client: Client<S>) -> Self {
        let usable = matches!(error, Error::SmtpError { .. } | Error::NotSupported(_));
        Self {
            error,
            client: usable.then_some(client),
        }
    }
}

impl<S> Rejected<S> {
    /// Splits into the error and, when the connection is still usable, a
    /// client that can only QUIT.
    #[must_use]
    pub fn into_parts(self) -> (Error, Option<Client<Closing>>) {
        (self.error, self.client.map(Client::transition))
    }
}

impl<S> From<Rejected<S>> for Error {
    fn from(rejected: Rejected<S>) -> Self {
        rejected.error
    }
}

/// Accessors shared by every state.
pub trait SmtpConnection {
    /// Returns what the server advertised.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Reads the 220 greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the server refuses service.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::smtp_error(
                greeting.code.as_u16(),
                greeting.message_text(),
            ));
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns the client inside [`Rejected`] if the server refuses EHLO.
    pub async fn ehlo(mut self, client_hostname: &str) -> Transition<Connected, Connected> {
        let outcome = self.send_ehlo(client_hostname).await;
        self.settle(outcome)
    }

    /// Upgrades to TLS with STARTTLS and repeats EHLO on the encrypted
    /// channel, since capabilities may differ after the upgrade.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotSupported`] if STARTTLS was not advertised,
    /// or when the server refuses it; both hand the client back. A failed
    /// TLS handshake consumes the connection.
    pub async fn starttls(mut self, hostname: &str) -> Transition<Connected, Connected> {
        if !self.server_info.supports_starttls() {
            return Err(Rejected::new(Error::NotSupported("STARTTLS".into()), self));
        }

        if let Err(error) = self.expect_success(Command::StartTls).await {
            return Err(Rejected::new(error, self));
        }

        let Self {
            stream,
            server_info,
            ..
        } = self;
        let stream = match stream.upgrade_to_tls(hostname).await {
            Ok(stream) => stream,
            Err(error) => {
                return Err(Rejected {
                    error,
                    client: None,
                });
            }
        };
        debug!(server = %hostname, "TLS established");

        let mut client = Self {
            stream,
            server_info,
            _state: PhantomData,
        };
        let outcome = client.send_ehlo(hostname).await;
        client.settle(outcome)
    }

    /// Authenticates with the mechanism the server prefers
    /// (see [`ServerInfo::preferred_mechanism`]).
    ///
    /// # Errors
    ///
    /// Returns the client inside [`Rejected`] if the server rejects the
    /// credentials.
    pub async fn authenticate(
        self,
        username: &str,
        password: &str,
    ) -> Transition<Authenticated, Connected> {
        match self.server_info.preferred_mechanism() {
            AuthMechanism::Plain => self.auth_plain(username, password).await,
            AuthMechanism::Login => self.auth_login(username, password).await,
        }
    }

    /// AUTH PLAIN with an initial response.
    ///
    /// # Errors
    ///
    /// Returns the client inside [`Rejected`] if the server rejects the
    /// credentials.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Transition<Authenticated, Connected> {
        let encoded = STANDARD.encode(format!("\0{username}\0{password}"));
        let outcome = self
            .expect_success(Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(encoded),
            })
            .await;
        self.settle(outcome)
    }

    /// AUTH LOGIN: username and password each answer a 334 challenge.
    ///
    /// # Errors
    ///
    /// Returns the client inside [`Rejected`] if the server rejects either
    /// step.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Transition<Authenticated, Connected> {
        let outcome = self.login_exchange(username, password).await;
        self.settle(outcome)
    }

    async fn login_exchange(&mut self, username: &str, password: &str) -> Result<()> {
        self.expect_code(
            Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            },
            ReplyCode::AUTH_CONTINUE,
        )
        .await?;
        self.expect_code(
            Command::AuthResponse(STANDARD.encode(username)),
            ReplyCode::AUTH_CONTINUE,
        )
        .await?;
        self.expect_success(Command::AuthResponse(STANDARD.encode(password)))
            .await
    }

    async fn send_ehlo(&mut self, hostname: &str) -> Result<()> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: hostname.to_string(),
            })
            .await?;
        ensure_success(&reply)?;

        // The first line echoes the server name; capabilities follow.
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(())
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns the client inside [`Rejected`] if the server rejects the
    /// sender.
    pub async fn mail_from(mut self, from: Address) -> Transition<MailTransaction, Authenticated> {
        let outcome = self.expect_success(Command::MailFrom { from }).await;
        self.settle(outcome)
    }
}

impl Client<MailTransaction> {
    /// Adds the recipient.
    ///
    /// # Errors
    ///
    /// Returns the client inside [`Rejected`] if the server rejects the
    /// recipient.
    pub async fn rcpt_to(mut self, to: Address) -> Transition<RecipientAdded, MailTransaction> {
        let outcome = self.expect_success(Command::RcptTo { to }).await;
        self.settle(outcome)
    }
}

impl Client<RecipientAdded> {
    /// Sends DATA and waits for 354.
    ///
    /// # Errors
    ///
    /// Returns the client inside [`Rejected`] if the server does not
    /// answer 354.
    pub async fn data(mut self) -> Transition<Data, RecipientAdded> {
        let outcome = self.expect_code(Command::Data, ReplyCode::START_DATA).await;
        self.settle(outcome)
    }
}

impl Client<Data> {
    /// Sends the message body and the terminating `.` line.
    ///
    /// Lines are normalized to CRLF and lines starting with `.` are
    /// dot-stuffed.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] if writing fails or the server rejects the
    /// message. After a rejection the server is back in command state.
    pub async fn send_message(mut self, message: &[u8]) -> Transition<Connected, Data> {
        let outcome = self.transmit(message).await;
        self.settle(outcome)
    }

    async fn transmit(&mut self, message: &[u8]) -> Result<()> {
        self.stream.write_all(&dot_stuff(message)).await?;

        let reply = read_reply(&mut self.stream).await?;
        ensure_success(&reply)?;
        debug!("message accepted: {}", reply.message_text());
        Ok(())
    }
}

impl<S> Client<S> {
    /// Sends QUIT. Available in every state.
    ///
    /// # Errors
    ///
    /// Returns an error if the server answers with anything but 221/2xx.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }
        Ok(())
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        let data = cmd.serialize();
        if cmd.is_sensitive() {
            debug!("C: <credentials>");
        } else {
            debug!("C: {}", String::from_utf8_lossy(&data).trim_end());
        }
        self.stream.write_all(&data).await?;
        read_reply(&mut self.stream).await
    }

    async fn expect_success(&mut self, cmd: Command) -> Result<()> {
        let reply = self.send_command(cmd).await?;
        ensure_success(&reply)
    }

    async fn expect_code(&mut self, cmd: Command, expected: ReplyCode) -> Result<()> {
        let reply = self.send_command(cmd).await?;
        ensure_code(&reply, expected)
    }

    /// Moves to state `T` on success, or hands `self` back on failure.
    fn settle<T>(self, outcome: Result<()>) -> Transition<T, S> {
        match outcome {
            Ok(()) => Ok(self.transition()),
            Err(error) => Err(Rejected::new(error, self)),
        }
    }

    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }
        let is_last = is_last_reply_line(&line);
        lines.push(line);
        if is_last {
            break;
        }
    }

    let reply = parse_reply(&lines)?;
    debug!("S: {} {}", reply.code, reply.message_text());
    Ok(reply)
}

fn ensure_success(reply: &Reply) -> Result<()> {
    if reply.is_success() {
        Ok(())
    } else {
        Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()))
    }
}

fn ensure_code(reply: &Reply, expected: ReplyCode) -> Result<()> {
    if reply.code == expected {
        Ok(())
    } else {
        Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()))
    }
}

/// CRLF-normalizes `message`, dot-stuffs it and appends `.\r\n`.
fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 64);
    let body = message.strip_suffix(b"\n").unwrap_or(message);
    let body = body.strip_suffix(b"\r").unwrap_or(body);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}
