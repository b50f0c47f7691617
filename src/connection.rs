//! Async connection driver.
//!
//! [`Connection`] owns a byte stream and an [`Engine`]. It reads the stream,
//! hands events to subscribers and writes whatever the engine or the
//! subscribers want sent. Lines are handled strictly one at a time: all of a
//! line's events are delivered and its commands written before the next
//! line is looked at.
//!
//! # Example
//!
//! ```no_run
//! use slirc_engine::{ClientConfig, Connection, Event, Outbox};
//!
//! # async fn run() -> Result<(), slirc_engine::TransportError> {
//! let config = ClientConfig::new("irc.libera.chat", "Addybot");
//! let mut conn = Connection::connect(config).await?;
//!
//! conn.subscribe(|event: &Event, out: &mut Outbox| {
//!     if let Event::Online = event {
//!         out.join("#bots");
//!     }
//! });
//!
//! conn.connect_as().await?;
//! conn.run().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_rustls::TlsConnector;
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::directory::Directory;
use crate::dispatch::Action;
use crate::encode::{ensure_crlf, Command};
use crate::engine::Engine;
use crate::error::TransportError;
use crate::event::Event;
use crate::transport::{native_tls_connector, Transport};

const READ_CHUNK: usize = 4096;

/// Receives every event a connection produces.
///
/// Commands pushed into the [`Outbox`] are written once the handler
/// returns, before the next event is delivered.
pub trait Handler: Send {
    /// Handle one event.
    fn handle(&mut self, event: &Event, out: &mut Outbox);
}

impl<F> Handler for F
where
    F: FnMut(&Event, &mut Outbox) + Send,
{
    fn handle(&mut self, event: &Event, out: &mut Outbox) {
        self(event, out)
    }
}

/// Commands queued by a [`Handler`].
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    commands: Vec<Command>,
}

impl Outbox {
    /// Queue a command.
    pub fn send(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Queue a caller-formatted line.
    pub fn raw(&mut self, line: impl Into<String>) {
        self.send(Command::Raw(line.into()));
    }

    /// Queue a JOIN.
    pub fn join(&mut self, channel: impl Into<String>) {
        self.send(Command::Join(channel.into()));
    }

    /// Queue a PRIVMSG.
    pub fn privmsg(&mut self, target: impl Into<String>, text: impl Into<String>) {
        self.send(Command::Privmsg {
            target: target.into(),
            text: text.into(),
        });
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A client connection over any async byte stream.
pub struct Connection<S = Transport> {
    stream: S,
    engine: Engine,
    handlers: Vec<Box<dyn Handler>>,
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("engine", &self.engine)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl Connection<Transport> {
    /// Dial the server named in `config`, using TLS if it asks for it.
    ///
    /// TLS connections trust the platform's root certificates.
    pub async fn connect(config: ClientConfig) -> Result<Self, TransportError> {
        Self::connect_with(config, None).await
    }

    /// Dial the server named in `config` with a caller-supplied TLS connector.
    ///
    /// The connector is only used when `config.tls` is set. Without one, TLS
    /// connections trust the platform's root certificates.
    pub async fn connect_with(
        config: ClientConfig,
        connector: Option<&TlsConnector>,
    ) -> Result<Self, TransportError> {
        let engine = Engine::new(&config)?;
        let stream = if config.tls {
            let native;
            let connector = match connector {
                Some(connector) => connector,
                None => {
                    native = native_tls_connector()?;
                    &native
                }
            };
            Transport::connect_tls(&config.server, config.port, connector).await?
        } else {
            Transport::connect(&config.server, config.port).await?
        };
        info!(server = %config.server, port = config.port, tls = stream.is_tls(), "connected");
        Ok(Self::new(stream, engine))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream.
    pub fn new(stream: S, engine: Engine) -> Self {
        Self {
            stream,
            engine,
            handlers: Vec::new(),
        }
    }

    /// Add a closure subscriber.
    ///
    /// Subscribers are called in the order they were added.
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: FnMut(&Event, &mut Outbox) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Add a [`Handler`] subscriber.
    pub fn add_handler<H: Handler + 'static>(&mut self, handler: H) {
        self.handlers.push(Box::new(handler));
    }

    /// The protocol engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Channels the client is in.
    pub fn directory(&self) -> &Directory {
        self.engine.directory()
    }

    /// The underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Send NICK and USER.
    pub async fn connect_as(&mut self) -> Result<(), TransportError> {
        for command in self.engine.registration() {
            self.send_command(&command).await?;
        }
        Ok(())
    }

    /// Write `line` exactly as given.
    pub async fn write(&mut self, line: &str) -> Result<(), TransportError> {
        self.write_line(line).await?;
        self.deliver(Event::PacketWritten(line.to_string())).await
    }

    /// Write `line`, terminated with exactly one CRLF.
    pub async fn send(&mut self, line: &str) -> Result<(), TransportError> {
        self.write(&ensure_crlf(line)).await
    }

    /// Encode and write a command.
    pub async fn send_command(&mut self, command: &Command) -> Result<(), TransportError> {
        self.write(&command.to_line()).await
    }

    /// Join a channel.
    pub async fn join(&mut self, channel: &str) -> Result<(), TransportError> {
        self.send_command(&Command::Join(channel.to_string())).await
    }

    /// Send a PRIVMSG.
    pub async fn privmsg(&mut self, target: &str, text: &str) -> Result<(), TransportError> {
        self.send_command(&Command::Privmsg {
            target: target.to_string(),
            text: text.to_string(),
        })
        .await
    }

    /// Send QUIT and close the stream. Every channel is forgotten.
    pub async fn quit(&mut self, reason: Option<&str>) -> Result<(), TransportError> {
        self.send_command(&Command::Quit(reason.map(str::to_string)))
            .await?;
        self.engine.quit_sent();
        self.stream.shutdown().await?;
        info!("quit sent, connection closed");
        Ok(())
    }

    /// Read and handle lines until the server closes the connection.
    ///
    /// Per-line protocol errors are logged and skipped. I/O errors end the
    /// loop.
    pub async fn run(&mut self) -> Result<(), TransportError> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                self.engine.close();
                info!("connection closed by peer");
                return Ok(());
            }
            trace!(bytes = n, "received");

            let lines: Vec<_> = self.engine.framer_mut().feed(&chunk[..n]).collect();
            for line in lines {
                let actions = match line {
                    Ok(line) => self.engine.handle_line(&line),
                    Err(err) => {
                        warn!(error = %err, "dropping line");
                        continue;
                    }
                };
                self.perform(actions).await?;
            }
        }
    }

    async fn perform(&mut self, actions: Vec<Action>) -> Result<(), TransportError> {
        for action in actions {
            match action {
                Action::Emit(event) => self.deliver(event).await?,
                Action::Send(command) => self.send_command(&command).await?,
                Action::Error(err) => warn!(error = %err, "protocol error"),
            }
        }
        Ok(())
    }

    /// Deliver `event` to every handler, then write what they queued.
    ///
    /// Each written line produces a `PacketWritten` event that goes through
    /// the same queue.
    async fn deliver(&mut self, event: Event) -> Result<(), TransportError> {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let mut out = Outbox::default();
            for handler in &mut self.handlers {
                handler.handle(&event, &mut out);
            }

            for command in out.commands {
                let line = command.to_line();
                self.write_line(&line).await?;
                queue.push_back(Event::PacketWritten(line));
            }
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let (bytes, _, unmappable) = self.engine.encoding().encode(line);
        if unmappable {
            warn!(
                encoding = self.engine.encoding().name(),
                "line has characters the encoding cannot represent"
            );
        }
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        debug!(line = line.trim_end(), "sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{duplex, DuplexStream};
    use tokio::net::TcpListener;

    fn connection(nick: &str) -> (Connection<DuplexStream>, DuplexStream) {
        let (client, server) = duplex(4096);
        let engine = Engine::new(&ClientConfig::new("test", nick)).unwrap();
        (Connection::new(client, engine), server)
    }

    async fn read_all(mut server: DuplexStream) -> String {
        let mut out = String::new();
        server.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_connect_as_writes_registration() {
        let (mut conn, server) = connection("bot");
        conn.connect_as().await.unwrap();
        drop(conn);
        assert_eq!(
            read_all(server).await,
            "NICK bot\r\nUSER bot bot bot :bot\r\n"
        );
    }

    #[tokio::test]
    async fn test_send_terminates_once() {
        let (mut conn, server) = connection("bot");
        conn.send("JOIN #a").await.unwrap();
        conn.send("JOIN #b\r\n").await.unwrap();
        conn.write("PART #c").await.unwrap();
        drop(conn);
        assert_eq!(read_all(server).await, "JOIN #a\r\nJOIN #b\r\nPART #c");
    }

    #[tokio::test]
    async fn test_packet_written_is_delivered() {
        let (mut conn, _server) = connection("bot");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        conn.subscribe(move |event: &Event, _: &mut Outbox| {
            if let Event::PacketWritten(line) = event {
                sink.lock().unwrap().push(line.clone());
            }
        });

        conn.join("#rust").await.unwrap();
        assert_eq!(*seen.lock().unwrap(), ["JOIN #rust\r\n"]);
    }

    #[tokio::test]
    async fn test_subscriber_reply_written_before_next_line() {
        let (mut conn, mut server) = connection("bot");
        conn.subscribe(|event: &Event, out: &mut Outbox| {
            if let Event::Online = event {
                out.join("#bots");
            }
        });

        server
            .write_all(b":srv 001 bot :Welcome\r\nPING :tok\r\n")
            .await
            .unwrap();
        server.shutdown().await.unwrap();

        conn.run().await.unwrap();
        drop(conn);
        assert_eq!(read_all(server).await, "JOIN #bots\r\nPONG :tok\r\n");
    }

    #[tokio::test]
    async fn test_quit_clears_directory() {
        let (mut conn, mut server) = connection("bot");
        server.write_all(b":bot!b@h JOIN #a\r\n").await.unwrap();
        server.shutdown().await.unwrap();
        conn.run().await.unwrap();
        assert!(conn.directory().contains("#a"));

        conn.quit(Some("bye")).await.unwrap();
        assert!(conn.directory().is_empty());
        assert_eq!(read_all(server).await, "QUIT :bye\r\n");
    }

    #[tokio::test]
    async fn test_tls_without_connector_stays_tls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let _ = sock.write_all(b":srv NOTICE * :plain text\r\n").await;
            }
        });

        // A plaintext server must fail the handshake, not yield a TCP session.
        let config = ClientConfig::new("127.0.0.1", "bot")
            .with_port(port)
            .with_tls(true);
        match Connection::connect_with(config, None).await {
            Ok(conn) => panic!("tls requested, got {:?}", conn.get_ref()),
            Err(err) => assert!(!matches!(err, TransportError::Config(_))),
        }
    }

    #[tokio::test]
    async fn test_unmappable_characters_are_still_written() {
        let (client, mut server) = duplex(4096);
        let config = ClientConfig::new("test", "bot").with_encoding("latin1");
        let mut conn = Connection::new(client, Engine::new(&config).unwrap());

        conn.privmsg("#a", "caf\u{e9} \u{2603}").await.unwrap();
        drop(conn);

        let mut out = Vec::new();
        server.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"PRIVMSG #a :caf\xe9 &#9731;\r\n");
    }
}
