//! Outgoing commands and their wire encoding.
//!
//! [`Command`] covers the directives a bot sends. [`IrcEncode`] writes a
//! command straight into any [`Write`] implementor, always terminated with
//! exactly one CRLF.
//!
//! # Example
//!
//! ```
//! use slirc_engine::encode::{Command, IrcEncode};
//!
//! let cmd = Command::Privmsg { target: "#channel".into(), text: "Hello!".into() };
//! let mut buf = Vec::new();
//! cmd.encode(&mut buf).unwrap();
//!
//! assert_eq!(&buf, b"PRIVMSG #channel :Hello!\r\n");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};

/// A trait for encoding IRC protocol elements directly to a byte stream.
pub trait IrcEncode {
    /// Encode this value to the given writer.
    ///
    /// Returns the number of bytes written on success.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the write fails.
    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<usize>;

    /// Encode this value to a new `Vec<u8>`.
    #[must_use]
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(512); // IRC max line length
        let _ = self.encode(&mut buf);
        buf
    }
}

/// A directive sent by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// `NICK <nick>`
    Nick(String),
    /// `USER <user> <host> <server> :<realname>`
    User {
        /// Username (ident).
        user: String,
        /// Host name field.
        host: String,
        /// Server name field.
        server: String,
        /// Real name / GECOS.
        realname: String,
    },
    /// `JOIN <channel>`
    Join(String),
    /// `PRIVMSG <target> :<text>`
    Privmsg {
        /// Nick or channel.
        target: String,
        /// Message text.
        text: String,
    },
    /// `PONG :<token>`
    Pong(String),
    /// `KICK <channel> <user>[ :<reason>]`
    Kick {
        /// Channel to kick from.
        channel: String,
        /// Nick to kick.
        user: String,
        /// Optional reason; omitted from the line when absent or empty.
        reason: Option<String>,
    },
    /// `TOPIC <channel> :<text>`
    Topic {
        /// Channel whose topic is set.
        channel: String,
        /// New topic.
        text: String,
    },
    /// `QUIT[ :<reason>]`
    Quit(Option<String>),
    /// A caller-formatted line, sent as is apart from CRLF termination.
    Raw(String),
}

impl Command {
    /// The `NICK` and `USER` pair sent at registration.
    ///
    /// Each USER field falls back to `nick` when missing or empty.
    pub fn registration(
        nick: &str,
        user: Option<&str>,
        host: Option<&str>,
        server: Option<&str>,
        realname: Option<&str>,
    ) -> [Command; 2] {
        let or_nick = |field: Option<&str>| match field {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => nick.to_string(),
        };
        [
            Command::Nick(nick.to_string()),
            Command::User {
                user: or_nick(user),
                host: or_nick(host),
                server: or_nick(server),
                realname: or_nick(realname),
            },
        ]
    }

    /// The encoded line, CRLF included.
    pub fn to_line(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

/// Terminate `line` with exactly one CRLF.
///
/// Trailing CR/LF characters already present are folded into the single
/// terminator, so applying this twice is the same as applying it once.
pub fn ensure_crlf(line: &str) -> Cow<'_, str> {
    if line.ends_with("\r\n") && !line[..line.len() - 2].ends_with(['\r', '\n']) {
        return Cow::Borrowed(line);
    }
    let mut owned = line.trim_end_matches(['\r', '\n']).to_string();
    owned.push_str("\r\n");
    Cow::Owned(owned)
}

/// Cut an argument at its first CR or LF so it cannot start a second line.
pub(crate) fn sanitize(arg: &str) -> &str {
    match arg.find(['\r', '\n']) {
        Some(end) => &arg[..end],
        None => arg,
    }
}

fn write_str<W: Write>(w: &mut W, s: &str) -> io::Result<usize> {
    w.write_all(s.as_bytes())?;
    Ok(s.len())
}

/// Write a command with space-separated arguments.
fn write_cmd<W: Write>(w: &mut W, cmd: &str, args: &[&str]) -> io::Result<usize> {
    let mut written = write_str(w, cmd)?;

    for arg in args {
        written += write_str(w, " ")?;
        written += write_str(w, sanitize(arg))?;
    }

    Ok(written)
}

/// Write a command with a freeform (always colon-prefixed) trailing argument.
fn write_cmd_freeform<W: Write>(w: &mut W, cmd: &str, args: &[&str]) -> io::Result<usize> {
    let Some((last, middle)) = args.split_last() else {
        return write_str(w, cmd);
    };

    let mut written = write_cmd(w, cmd, middle)?;
    written += write_str(w, " :")?;
    written += write_str(w, sanitize(last))?;
    Ok(written)
}

impl IrcEncode for Command {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<usize> {
        let written = match self {
            Command::Nick(nick) => write_cmd(w, "NICK", &[nick])?,
            Command::User {
                user,
                host,
                server,
                realname,
            } => write_cmd_freeform(w, "USER", &[user, host, server, realname])?,
            Command::Join(channel) => write_cmd(w, "JOIN", &[channel])?,
            Command::Privmsg { target, text } => write_cmd_freeform(w, "PRIVMSG", &[target, text])?,
            Command::Pong(token) => write_cmd_freeform(w, "PONG", &[token])?,
            Command::Kick {
                channel,
                user,
                reason: Some(reason),
            } if !reason.is_empty() => write_cmd_freeform(w, "KICK", &[channel, user, reason])?,
            Command::Kick { channel, user, .. } => write_cmd(w, "KICK", &[channel, user])?,
            Command::Topic { channel, text } => write_cmd_freeform(w, "TOPIC", &[channel, text])?,
            Command::Quit(Some(reason)) if !reason.is_empty() => {
                write_cmd_freeform(w, "QUIT", &[reason])?
            }
            Command::Quit(_) => write_str(w, "QUIT")?,
            Command::Raw(line) => return write_str(w, &ensure_crlf(line)),
        };

        Ok(written + write_str(w, "\r\n")?)
    }
}

impl fmt::Display for Command {
    /// The line without its CRLF terminator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_line().trim_end_matches("\r\n"))
    }
}
