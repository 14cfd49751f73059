//! [`SmtpSession`] over a real network connection.

use std::mem;

use courier_smtp::connection::{SmtpStream, connect};
use courier_smtp::{Address, Authenticated, Client, Closing, Connected, Error, Rejected};
use tracing::debug;

use super::SmtpSession;

/// Name sent with EHLO.
const CLIENT_HOSTNAME: &str = "localhost";

#[derive(Debug, Default)]
enum Stage {
    #[default]
    Idle,
    Stream(SmtpStream),
    Connected(Client<Connected>),
    Authenticated(Client<Authenticated>),
    Refused(Client<Closing>),
    Closed,
}

impl Stage {
    const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Stream(_) => "connected",
            Self::Connected(_) => "greeted",
            Self::Authenticated(_) => "authenticated",
            Self::Refused(_) => "refused",
            Self::Closed => "closed",
        }
    }
}

/// A session backed by `courier-smtp`.
///
/// Each step consumes the client from the previous one. When the server
/// refuses a step the client is kept, so a later
/// [`close`](SmtpSession::close) still sends QUIT.
#[derive(Debug, Default)]
pub struct LiveSession {
    stage: Stage,
}

impl LiveSession {
    /// Creates an unconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn take(&mut self) -> Stage {
        mem::replace(&mut self.stage, Stage::Closed)
    }

    /// Puts `stage` back and reports `step` as out of order.
    fn misplaced(&mut self, step: &str, stage: Stage) -> Error {
        let error = Error::Protocol(format!("{step} called while {}", stage.name()));
        self.stage = stage;
        error
    }

    /// Keeps the client if the connection survived and returns the error.
    fn refused<S>(&mut self, rejected: Rejected<S>) -> Error {
        let (error, client) = rejected.into_parts();
        if let Some(client) = client {
            self.stage = Stage::Refused(client);
        }
        error
    }
}


impl SmtpSession for LiveSession {
    async fn connect(&mut self, server: &str, port: u16) -> courier_smtp::Result<()> {
        match self.take() {
            Stage::Idle => {
                self.stage = Stage::Stream(connect(server, port).await?);
                debug!(server, port, "TCP connected");
                Ok(())
            }
            other => Err(self.misplaced("connect", other)),
        }
    }

    async fn handshake(&mut self) -> courier_smtp::Result<()> {
        match self.take() {
            Stage::Stream(stream) => {
                let client = Client::from_stream(stream).await?;
                match client.ehlo(CLIENT_HOSTNAME).await {
                    Ok(client) => {
                        self.stage = Stage::Connected(client);
                        Ok(())
                    }
                    Err(rejected) => Err(self.refused(rejected)),
                }
            }
            other => Err(self.misplaced("handshake", other)),
        }
    }

    async fn upgrade(&mut self, server: &str) -> courier_smtp::Result<()> {
        match self.take() {
            Stage::Connected(client) => {
                match client.starttls(server).await {
                    Ok(client) => {
                        self.stage = Stage::Connected(client);
                        Ok(())
                    }
                    Err(rejected) => Err(self.refused(rejected)),
                }
            }
            other => Err(self.misplaced("upgrade", other)),
        }
    }

    async fn authenticate(&mut self, username: &str, password: &str) -> courier_smtp::Result<()> {
        match self.take() {
            Stage::Connected(client) => {
                match client.authenticate(username, password).await {
                    Ok(client) => {
                        self.stage = Stage::Authenticated(client);
                        Ok(())
                    }
                    Err(rejected) => Err(self.refused(rejected)),
                }
            }
            other => Err(self.misplaced("authenticate", other)),
        }
    }

    async fn transmit(
        &mut self,
        from: &Address,
        to: &Address,
        data: &[u8],
    ) -> courier_smtp::Result<()> {
        match self.take() {
            Stage::Authenticated(client) => {
                let client = match client.mail_from(from.clone()).await {
                    Ok(client) => client,
                    Err(rejected) => return Err(self.refused(rejected)),
                };
                let client = match client.rcpt_to(to.clone()).await {
                    Ok(client) => client,
                    Err(rejected) => return Err(self.refused(rejected)),
                };
                let client = match client.data().await {
                    Ok(client) => client,
                    Err(rejected) => return Err(self.refused(rejected)),
                };
                match client.send_message(data).await {
                    Ok(client) => {
                        self.stage = Stage::Connected(client);
                        Ok(())
                    }
                    Err(rejected) => Err(self.refused(rejected)),
                }
            }
            other => Err(self.misplaced("transmit", other)),
        }
    }

    async fn close(&mut self) -> courier_smtp::Result<()> {
        match self.take() {
            Stage::Connected(client) => client.quit().await,
            Stage::Authenticated(client) => client.quit().await,
            Stage::Refused(client) => client.quit().await,
            Stage::Idle | Stage::Stream(_) | Stage::Closed => Ok(()),
        }
    }
}
