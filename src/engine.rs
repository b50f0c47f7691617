//! The sans-IO protocol engine.
//!
//! [`Engine`] chains the pipeline together: bytes go through the
//! [`LineFramer`], each line through [`Message::parse`] and the
//! [`Dispatcher`], and the result comes back as [`Action`]s. Nothing here
//! touches a socket, so the whole protocol can be driven from tests or any
//! runtime.
//!
//! # Example
//!
//! ```
//! use slirc_engine::{Action, ClientConfig, Command, Engine, Event};
//!
//! let config = ClientConfig::new("irc.example.net", "bot");
//! let mut engine = Engine::new(&config).unwrap();
//!
//! let actions = engine.feed(b":irc.example.net 001 bot :Welcome\r\nPING :x\r\n");
//! assert_eq!(actions[0], Action::Emit(Event::Online));
//! assert!(actions.contains(&Action::Send(Command::Pong("x".into()))));
//! assert!(engine.is_registered());
//! ```

use encoding::Encoding;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::directory::Directory;
use crate::dispatch::{Action, Dispatcher, RegistrationState};
use crate::encode::Command;
use crate::error::ProtocolError;
use crate::event::Event;
use crate::line::LineFramer;
use crate::message::Message;

/// Framing, parsing and dispatch for one connection.
#[derive(Debug)]
pub struct Engine {
    config: ClientConfig,
    framer: LineFramer,
    dispatcher: Dispatcher,
}

impl Engine {
    /// Build an engine from `config`.
    ///
    /// Fails if the configured encoding label is unknown.
    pub fn new(config: &ClientConfig) -> Result<Self, ProtocolError> {
        let mut framer = LineFramer::with_encoding(&config.encoding)?;
        if let Some(limit) = config.max_line_len {
            framer = framer.with_max_line_len(limit);
        }

        Ok(Self {
            config: config.clone(),
            framer,
            dispatcher: Dispatcher::new(config.nickname.as_str(), config.auto_pong),
        })
    }

    /// The configuration this engine was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The client's own nickname.
    pub fn nick(&self) -> &str {
        self.dispatcher.nick()
    }

    /// Current registration state.
    pub fn state(&self) -> RegistrationState {
        self.dispatcher.state()
    }

    /// Returns true once the server has welcomed the client.
    pub fn is_registered(&self) -> bool {
        self.dispatcher.is_registered()
    }

    /// Channels the client is in.
    pub fn directory(&self) -> &Directory {
        self.dispatcher.directory()
    }

    /// Encoding used for lines in both directions.
    pub fn encoding(&self) -> &'static Encoding {
        self.framer.encoding()
    }

    /// The NICK and USER commands that open the session.
    pub fn registration(&self) -> [Command; 2] {
        self.config.registration()
    }

    /// The framer, for callers that interleave I/O between lines.
    pub fn framer_mut(&mut self) -> &mut LineFramer {
        &mut self.framer
    }

    /// Feed raw bytes and handle every line they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Action> {
        let lines: Vec<_> = self.framer.feed(bytes).collect();

        let mut actions = Vec::new();
        for line in lines {
            match line {
                Ok(line) => actions.extend(self.handle_line(&line)),
                Err(err) => actions.push(Action::Error(err)),
            }
        }
        actions
    }

    /// Parse and dispatch one framed line.
    ///
    /// Every line ends with [`Event::PacketRead`], whether or not it could
    /// be handled. A failure shows up as an [`Action::Error`] before it.
    pub fn handle_line(&mut self, line: &str) -> Vec<Action> {
        trace!(line, "read");

        let mut actions = match Message::parse(line) {
            Ok(msg) => match self.dispatcher.dispatch(&msg) {
                Ok(actions) => actions,
                Err(cause) => {
                    debug!(line, error = %cause, "dispatch failed");
                    vec![Action::Error(ProtocolError::Dispatch {
                        string: line.to_string(),
                        cause,
                    })]
                }
            },
            Err(cause) => {
                debug!(line, error = %cause, "unparseable line");
                vec![Action::Error(ProtocolError::InvalidMessage {
                    string: line.to_string(),
                    cause,
                })]
            }
        };

        actions.push(Action::Emit(Event::PacketRead(line.to_string())));
        actions
    }

    /// Record that the client sent QUIT: every channel is forgotten.
    pub fn quit_sent(&mut self) {
        self.dispatcher.clear_channels();
    }

    /// The connection closed. Drops any partial line and returns its size.
    pub fn close(&mut self) -> usize {
        let dropped = self.framer.discard();
        if dropped > 0 {
            debug!(dropped, "discarding partial line at close");
        }
        dropped
    }
}
