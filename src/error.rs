//! Error types for the IRC protocol engine.
//!
//! Errors are split by how far they reach:
//! - [`MessageParseError`] and [`DispatchError`] concern a single line.
//! - [`ProtocolError`] wraps those (plus framing limits) with the offending
//!   line; the engine reports them and moves on to the next line.
//! - [`TransportError`] is fatal for a connection and ends its read loop.

use thiserror::Error;

use crate::response::Response;

/// Per-line protocol errors. None of these abort the read loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A framed line matched no recognized grammar.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw line.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },

    /// A parsed message could not be applied to the engine state.
    #[error("cannot dispatch message: {string}")]
    Dispatch {
        /// The raw line.
        string: String,
        /// The underlying dispatch error.
        #[source]
        cause: DispatchError,
    },

    /// A line exceeded the configured framing limit and was discarded.
    #[error("message too long: {actual} bytes (limit {limit})")]
    MessageTooLong {
        /// Bytes seen for the discarded line.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The configured text encoding label is not known.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
}

/// Errors encountered when parsing a line into a [`Message`](crate::Message).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Line is neither prefixed nor a PING.
    #[error("unrecognized line: {0}")]
    Unrecognized(String),

    /// Prefixed line has no opcode after the sender.
    #[error("missing opcode")]
    MissingOpcode,

    /// PING line did not have exactly one argument.
    #[error("malformed PING: {0}")]
    MalformedPing(String),

    /// All-digit opcode that does not fit a reply code.
    #[error("invalid numeric opcode: {0}")]
    InvalidNumeric(String),
}

/// Errors raised while applying a message to the engine state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchError {
    /// The message refers to a channel the client is not in.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// A numeric reply did not have the expected argument shape.
    #[error("malformed {} reply: {payload:?}", .response.name())]
    MalformedNumeric {
        /// The reply being handled.
        response: Response,
        /// The trailing text that failed to parse.
        payload: String,
    },

    /// A command arrived without a parameter it cannot do without.
    #[error("{command} without {parameter}")]
    MissingParameter {
        /// The command being handled.
        command: &'static str,
        /// What was missing.
        parameter: &'static str,
    },
}

/// Fatal connection errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// I/O error during connect, read or write.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Host name is not usable as a TLS server name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// The engine could not be built from the supplied configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ProtocolError),
}
