//! Client configuration.

use crate::encode::Command;
use crate::line::MAX_IRC_LINE_LEN;

/// Plain-text IRC port.
pub const DEFAULT_PORT: u16 = 6667;

/// Everything needed to open a connection and register.
///
/// The USER fields fall back to the nickname when unset.
///
/// ```
/// use slirc_engine::ClientConfig;
///
/// let config = ClientConfig::new("irc.libera.chat", "Addybot")
///     .with_port(6697)
///     .with_tls(true)
///     .with_realname("Addy the bot");
/// let [nick, user] = config.registration();
/// assert_eq!(nick.to_string(), "NICK Addybot");
/// assert_eq!(user.to_string(), "USER Addybot Addybot Addybot :Addy the bot");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientConfig {
    /// Server host name.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Wrap the connection in TLS.
    pub tls: bool,
    /// Nickname to register with.
    pub nickname: String,
    /// USER username field.
    pub username: Option<String>,
    /// USER hostname field.
    pub hostname: Option<String>,
    /// USER servername field.
    pub servername: Option<String>,
    /// USER realname field.
    pub realname: Option<String>,
    /// Answer server PINGs automatically.
    pub auto_pong: bool,
    /// Longest accepted line in bytes, `None` for no limit.
    pub max_line_len: Option<usize>,
    /// Encoding label for decoding and encoding lines.
    pub encoding: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: DEFAULT_PORT,
            tls: false,
            nickname: String::new(),
            username: None,
            hostname: None,
            servername: None,
            realname: None,
            auto_pong: true,
            max_line_len: Some(MAX_IRC_LINE_LEN),
            encoding: "utf-8".to_string(),
        }
    }
}

impl ClientConfig {
    /// Configuration for `server` with defaults for everything but the nick.
    pub fn new(server: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            nickname: nickname.into(),
            ..Self::default()
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable TLS.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Set the USER username field.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the USER hostname field.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the USER servername field.
    pub fn with_servername(mut self, servername: impl Into<String>) -> Self {
        self.servername = Some(servername.into());
        self
    }

    /// Set the USER realname field.
    pub fn with_realname(mut self, realname: impl Into<String>) -> Self {
        self.realname = Some(realname.into());
        self
    }

    /// Turn automatic PONG replies on or off.
    pub fn with_auto_pong(mut self, auto_pong: bool) -> Self {
        self.auto_pong = auto_pong;
        self
    }

    /// Set or remove the line length limit.
    pub fn with_max_line_len(mut self, limit: Option<usize>) -> Self {
        self.max_line_len = limit;
        self
    }

    /// Set the encoding label.
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    /// The NICK and USER commands for this configuration.
    pub fn registration(&self) -> [Command; 2] {
        Command::registration(
            &self.nickname,
            self.username.as_deref(),
            self.hostname.as_deref(),
            self.servername.as_deref(),
            self.realname.as_deref(),
        )
    }
}
