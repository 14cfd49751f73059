//! # courier-smtp
//!
//! A small SMTP submission client (RFC 5321) used by `courier` to hand one
//! finished message to a relay.
//!
//! The client walks the usual submission sequence:
//!
//! ```ignore
//! use courier_smtp::{Address, Client};
//! use courier_smtp::connection::connect;
//!
//! let stream = connect("smtp.example.com", 587).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.ehlo("localhost").await?;
//! let client = client.starttls("smtp.example.com").await?;
//! let client = client.authenticate("user@example.com", "secret").await?;
//!
//! let client = client.mail_from(Address::new("user@example.com")?).await?;
//! let client = client.rcpt_to(Address::new("friend@example.org")?).await?;
//! let client = client.data().await?;
//! let client = client.send_message(b"Subject: Hi\r\n\r\nHello\r\n").await?;
//! client.quit().await?;
//! ```
//!
//! ## Connection States
//!
//! Type-state markers keep commands in protocol order:
//!
//! ```text
//! Connected ── authenticate() ──→ Authenticated ── mail_from() ──→ MailTransaction
//!                                                                      │
//!            Connected ←── send_message() ── Data ←── data() ── RecipientAdded
//! ```
//!
//! A refused command returns a [`Rejected`] that converts into [`Error`] with
//! `?`. When the server answered, it also carries the client back so the
//! session can still end with QUIT:
//!
//! ```ignore
//! match client.authenticate("user@example.com", "wrong").await {
//!     Ok(client) => { /* continue */ }
//!     Err(rejected) => {
//!         let (error, client) = rejected.into_parts();
//!         if let Some(client) = client {
//!             client.quit().await?;
//!         }
//!         return Err(error);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Closing, Connected, Data, MailTransaction, RecipientAdded, Rejected,
    ServerInfo, SmtpConnection, Transition,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
