//! TCP and TLS byte streams.
//!
//! [`Transport`] is the stream a [`Connection`](crate::Connection) owns when
//! it dials out itself. Tests and embedders can hand a `Connection` any other
//! `AsyncRead + AsyncWrite` stream instead.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig as TlsClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::error::TransportError;

/// A connected plain or TLS stream.
pub enum Transport {
    /// Plain TCP.
    Tcp(TcpStream),
    /// Client-side TLS over TCP.
    Tls(Box<TlsStream<TcpStream>>),
}

impl Transport {
    /// Open a plain TCP connection.
    pub async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        Ok(Self::Tcp(Self::dial(host, port).await?))
    }

    /// Open a TLS connection, verifying the server as `host`.
    pub async fn connect_tls(
        host: &str,
        port: u16,
        connector: &TlsConnector,
    ) -> Result<Self, TransportError> {
        let server_name = ServerName::try_from(host)
            .map_err(|_| TransportError::InvalidServerName(host.to_string()))?
            .to_owned();

        let stream = Self::dial(host, port).await?;
        let tls = connector.connect(server_name, stream).await?;
        debug!(host, port, "TLS handshake complete");
        Ok(Self::Tls(Box::new(tls)))
    }

    async fn dial(host: &str, port: u16) -> Result<TcpStream, TransportError> {
        let stream = TcpStream::connect((host, port)).await?;
        if let Err(e) = Self::enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        debug!(host, port, "connected");
        Ok(stream)
    }

    fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));

        sock.set_tcp_keepalive(&keepalive)
    }

    /// Returns true for TLS connections.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp(stream) => f.debug_tuple("Tcp").field(stream).finish(),
            Transport::Tls(_) => f.write_str("Tls(..)"),
        }
    }
}

/// A TLS connector trusting the platform's root certificates.
pub fn native_tls_connector() -> Result<TlsConnector, TransportError> {
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(rustls_native_certs::load_native_certs()?);
    debug!(added, ignored, "loaded platform root certificates");

    let config = TlsClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
