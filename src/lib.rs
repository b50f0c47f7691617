//! # slirc-engine
//!
//! A client-side IRC protocol engine for bots.
//!
//! ## Features
//!
//! - Incremental CRLF line framing with configurable encoding and size limit
//! - Parsing of prefixed lines and bare `PING`s into messages
//! - Event dispatch with channel tracking (topic, mode, creation time)
//! - Command encoding with guaranteed CRLF termination
//! - Optional Tokio connection driver over TCP or TLS

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! The [`Engine`] is sans-IO: feed it bytes, act on what it returns.
//!
//! ```rust
//! use slirc_engine::{Action, ClientConfig, Engine, Event};
//!
//! let mut engine = Engine::new(&ClientConfig::new("irc.example.net", "bot")).unwrap();
//!
//! for action in engine.feed(b":bot!b@h JOIN #rust\r\n") {
//!     match action {
//!         Action::Emit(Event::JoinedChannel(channel)) => println!("joined {}", channel.name()),
//!         Action::Emit(_) => {}
//!         Action::Send(command) => println!("would send {}", command),
//!         Action::Error(err) => eprintln!("{}", err),
//!     }
//! }
//! assert!(engine.directory().contains("#rust"));
//! ```
//!
//! With the `tokio` feature, [`Connection`] drives an engine over a socket
//! and calls subscribers for every event.
//!
//! ## Acknowledgments
//!
//! This project was inspired by the architectural patterns established by
//! [Aaron Weiss (aatxe)](https://github.com/aatxe) in the
//! [irc](https://github.com/aatxe/irc) crate.

pub mod config;
pub mod directory;
pub mod dispatch;
pub mod encode;
pub mod engine;
pub mod error;
pub mod event;
pub mod line;
pub mod message;
pub mod response;
pub mod user;

pub use self::config::{ClientConfig, DEFAULT_PORT};
pub use self::directory::{Channel, Directory};
pub use self::dispatch::{Action, Dispatcher, RegistrationState};
pub use self::encode::{ensure_crlf, Command, IrcEncode};
pub use self::engine::Engine;
pub use self::error::{DispatchError, MessageParseError, ProtocolError, TransportError};
pub use self::event::Event;
pub use self::line::{LineFramer, Lines, MAX_IRC_LINE_LEN};
pub use self::message::{Message, Opcode};
pub use self::response::Response;
pub use self::user::User;

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod connection;
#[cfg(feature = "tokio")]
pub use self::connection::{Connection, Handler, Outbox};

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod transport;
#[cfg(feature = "tokio")]
pub use self::transport::{native_tls_connector, Transport};
