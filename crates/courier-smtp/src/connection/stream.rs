//! Line-oriented stream over TCP, optionally upgraded to TLS.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// Longest reply line accepted, CRLF included (RFC 5321 §4.5.3.1.5).
pub const MAX_REPLY_LINE: usize = 512;

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP, before STARTTLS.
    Tcp(BufReader<TcpStream>),
    /// After a successful STARTTLS.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

impl SmtpStream {
    /// Reads one line with the trailing CRLF removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] on EOF, [`Error::Protocol`] for
    /// a line longer than [`MAX_REPLY_LINE`], or an I/O error.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        let limit = MAX_REPLY_LINE as u64;
        let read = match self {
            Self::Tcp(reader) => reader.take(limit).read_until(b'\n', &mut buf).await?,
            Self::Tls(reader) => (&mut **reader).take(limit).read_until(b'\n', &mut buf).await?,
        };
        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        if buf.len() >= MAX_REPLY_LINE && buf.last() != Some(&b'\n') {
            return Err(Error::Protocol(format!(
                "reply line longer than {MAX_REPLY_LINE} octets"
            )));
        }
        Ok(String::from_utf8_lossy(&buf)
            .trim_end_matches(['\r', '\n'])
            .to_string())
    }

    /// Writes and flushes `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
        }
        Ok(())
    }

    /// Runs the TLS handshake over the existing TCP socket.
    ///
    /// # Errors
    ///
    /// Returns an error if already encrypted, the hostname is not a valid
    /// server name, or the handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let tcp_stream = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::Protocol("stream is already TLS".into())),
        };

        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|_| Error::Protocol(format!("invalid TLS server name: {hostname}")))?;

        let tls_stream = tls_connector().connect(server_name, tcp_stream).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls_stream))))
    }
}

/// Opens a plain TCP connection to `hostname:port`.
///
/// # Errors
///
/// Returns an error if name resolution or the connect fails.
pub async fn connect(hostname: &str, port: u16) -> Result<SmtpStream> {
    let stream = TcpStream::connect((hostname, port)).await?;
    Ok(SmtpStream::Tcp(BufReader::new(stream)))
}

fn tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
