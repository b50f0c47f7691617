use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;
use crate::response::Response;
use crate::user::User;

use super::nom_parser::ParsedLine;

/// The command part of a line: a numeric reply code or a command word.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    /// Numeric reply, e.g. `001` parses to `Numeric(1)`.
    Numeric(u16),
    /// Uppercase command word, e.g. `JOIN`.
    Command(String),
}

impl Opcode {
    /// Classify a raw opcode token.
    ///
    /// A token is numeric if and only if every character is an ASCII digit;
    /// anything else is kept as an uppercased command word.
    pub fn parse(token: &str) -> Result<Self, MessageParseError> {
        if token.is_empty() {
            return Err(MessageParseError::MissingOpcode);
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            token
                .parse::<u16>()
                .map(Opcode::Numeric)
                .map_err(|_| MessageParseError::InvalidNumeric(token.to_string()))
        } else {
            Ok(Opcode::Command(token.to_ascii_uppercase()))
        }
    }

    /// The known reply this opcode stands for, if any.
    pub fn response(&self) -> Option<Response> {
        match self {
            Opcode::Numeric(code) => Response::from_code(*code),
            Opcode::Command(_) => None,
        }
    }

    /// The command word, if this is not a numeric.
    pub fn command(&self) -> Option<&str> {
        match self {
            Opcode::Command(word) => Some(word),
            Opcode::Numeric(_) => None,
        }
    }

    /// Returns true for numeric reply codes.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Opcode::Numeric(_))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Numeric(code) => write!(f, "{:03}", code),
            Opcode::Command(word) => f.write_str(word),
        }
    }
}

/// One parsed line.
///
/// Fields that are absent from the line are empty strings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Sender token without the leading `:`, e.g. `nick!user@host`.
    pub sender: String,
    /// Numeric or textual opcode.
    pub opcode: Opcode,
    /// Third field (target nick or channel) without a leading `:`.
    pub recipient: String,
    /// Rest of the line with one leading `:` removed.
    pub trailing: String,
}

impl Message {
    /// Parse a single line. Trailing CR/LF characters are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use slirc_engine::message::{Message, Opcode};
    ///
    /// let msg = Message::parse(":nick!u@h PRIVMSG #rust :hi there").unwrap();
    /// assert_eq!(msg.opcode, Opcode::Command("PRIVMSG".into()));
    /// assert_eq!(msg.recipient, "#rust");
    /// assert_eq!(msg.trailing, "hi there");
    /// ```
    pub fn parse(line: &str) -> Result<Message, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        if line.starts_with(':') {
            let parsed = ParsedLine::parse_prefixed(line)?;
            Ok(Message {
                sender: parsed.sender.to_string(),
                opcode: Opcode::parse(parsed.opcode)?,
                recipient: strip_colon(parsed.recipient.unwrap_or_default()).to_string(),
                trailing: strip_colon(parsed.trailing.unwrap_or_default()).to_string(),
            })
        } else if line.starts_with("PING") {
            let token = ParsedLine::parse_ping(line)?;
            Ok(Message {
                sender: String::new(),
                opcode: Opcode::Command("PING".to_string()),
                recipient: String::new(),
                trailing: strip_colon(token).to_string(),
            })
        } else {
            Err(MessageParseError::Unrecognized(line.to_string()))
        }
    }

    /// The sender as a [`User`], or `None` for lines without a sender.
    pub fn user(&self) -> Option<User> {
        if self.sender.is_empty() {
            None
        } else {
            Some(User::parse(&self.sender))
        }
    }

    /// Returns true if the opcode is the given command word.
    pub fn is_command(&self, word: &str) -> bool {
        self.opcode.command() == Some(word)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}

/// Remove a single leading `:` marker.
pub(crate) fn strip_colon(s: &str) -> &str {
    s.strip_prefix(':').unwrap_or(s)
}
