//! Message senders.

use std::fmt;

use crate::encode::Command;

/// A sender split on the first `!` into nick and host.
///
/// Server senders (no `!`) have no host. Values are rebuilt from every
/// message and carry no identity beyond their fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    nick: String,
    host: Option<String>,
}

impl User {
    /// A user known only by nick.
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            host: None,
        }
    }

    /// Split a sender token such as `nick!user@host`.
    ///
    /// ```
    /// use slirc_engine::User;
    ///
    /// let user = User::parse("dan!~d@example.org");
    /// assert_eq!(user.nick(), "dan");
    /// assert_eq!(user.host(), Some("~d@example.org"));
    /// assert!(user.matches_nick("dan"));
    /// ```
    pub fn parse(sender: &str) -> Self {
        let sender = sender.strip_prefix(':').unwrap_or(sender);
        match sender.split_once('!') {
            Some((nick, host)) => Self {
                nick: nick.to_string(),
                host: Some(host.to_string()),
            },
            None => Self::new(sender),
        }
    }

    /// Nickname (or server name for server senders).
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Everything after the `!`, usually `user@host`.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns true if this user goes by `nick`.
    pub fn matches_nick(&self, nick: &str) -> bool {
        self.nick == nick
    }

    /// PRIVMSG addressed to this user.
    pub fn message(&self, text: impl Into<String>) -> Command {
        Command::Privmsg {
            target: self.nick.clone(),
            text: text.into(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{}!{}", self.nick, host),
            None => f.write_str(&self.nick),
        }
    }
}
