//! Sans-IO message dispatch.
//!
//! [`Dispatcher`] applies parsed messages to the registration state and the
//! channel [`Directory`], and describes the outcome as a list of
//! [`Action`]s. It performs no I/O: the caller delivers the events and
//! writes the commands.
//!
//! # Example
//!
//! ```
//! use slirc_engine::dispatch::{Action, Dispatcher};
//! use slirc_engine::{Command, Event, Message};
//!
//! let mut dispatcher = Dispatcher::new("bot", true);
//!
//! let ping = Message::parse("PING :irc.example.net").unwrap();
//! let actions = dispatcher.dispatch(&ping).unwrap();
//! assert_eq!(
//!     actions,
//!     [
//!         Action::Emit(Event::Ping("irc.example.net".into())),
//!         Action::Send(Command::Pong("irc.example.net".into())),
//!     ]
//! );
//! ```

use tracing::debug;

use crate::directory::{Channel, Directory};
use crate::encode::Command;
use crate::error::{DispatchError, ProtocolError};
use crate::event::Event;
use crate::message::{strip_colon, Message, Opcode};
use crate::response::Response;
use crate::user::User;

/// Whether the server has welcomed the client yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegistrationState {
    /// No `RPL_WELCOME` received.
    #[default]
    Unregistered,
    /// `RPL_WELCOME` received.
    Registered,
}

/// Work produced by handling a line.
///
/// The caller performs actions in order: events go to subscribers, commands
/// go to the server, errors are reported.
#[derive(Debug, PartialEq)]
pub enum Action {
    /// Deliver this event to subscribers.
    Emit(Event),
    /// Write this command to the server.
    Send(Command),
    /// The line could not be handled.
    Error(ProtocolError),
}

impl Action {
    /// The event, if this is an emit action.
    pub fn event(&self) -> Option<&Event> {
        match self {
            Action::Emit(event) => Some(event),
            _ => None,
        }
    }

    /// The command, if this is a send action.
    pub fn command(&self) -> Option<&Command> {
        match self {
            Action::Send(command) => Some(command),
            _ => None,
        }
    }
}

/// Applies messages to connection state.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    nick: String,
    auto_pong: bool,
    state: RegistrationState,
    directory: Directory,
}

impl Dispatcher {
    /// A dispatcher for a client registering as `nick`.
    pub fn new(nick: impl Into<String>, auto_pong: bool) -> Self {
        Self {
            nick: nick.into(),
            auto_pong,
            state: RegistrationState::Unregistered,
            directory: Directory::new(),
        }
    }

    /// The client's own nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Current registration state.
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// Returns true once `RPL_WELCOME` has been received.
    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    /// Channels the client is in.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Forget every tracked channel.
    pub(crate) fn clear_channels(&mut self) {
        self.directory.clear();
    }

    /// Handle one message.
    ///
    /// On error no state has been changed.
    pub fn dispatch(&mut self, msg: &Message) -> Result<Vec<Action>, DispatchError> {
        match &msg.opcode {
            Opcode::Numeric(code) => match Response::from_code(*code) {
                Some(Response::RPL_WELCOME) => Ok(self.welcome()),
                Some(response) => self.channel_reply(response, &msg.trailing),
                None => Ok(unhandled(msg)),
            },
            Opcode::Command(word) => match word.as_str() {
                "JOIN" => self.join(msg),
                "KICK" => self.kick(msg),
                "NOTICE" => Ok(notice(msg)),
                "PING" => Ok(self.ping(msg)),
                "PRIVMSG" => Ok(self.privmsg(msg)),
                "TOPIC" => Ok(self.topic(msg)),
                "QUIT" => Ok(self.quit(msg)),
                _ => Ok(unhandled(msg)),
            },
        }
    }

    fn welcome(&mut self) -> Vec<Action> {
        if self.is_registered() {
            debug!("ignoring repeated RPL_WELCOME");
            return Vec::new();
        }
        self.state = RegistrationState::Registered;
        debug!(nick = %self.nick, "registered");
        vec![Action::Emit(Event::Online)]
    }

    /// `<channel> <value>` numerics: topic, mode and creation time.
    fn channel_reply(
        &mut self,
        response: Response,
        payload: &str,
    ) -> Result<Vec<Action>, DispatchError> {
        let malformed = || DispatchError::MalformedNumeric {
            response,
            payload: payload.to_string(),
        };

        let (name, value) = payload.split_once(' ').ok_or_else(malformed)?;
        if name.is_empty() {
            return Err(malformed());
        }
        let value = strip_colon(value);

        debug!(%response, channel = name, "channel reply");

        let mut actions = Vec::with_capacity(2);
        let channel = match response {
            Response::RPL_TOPIC => {
                let channel = self.directory.get_or_insert(name);
                channel.update_topic(value);
                let channel = channel.clone();
                actions.push(Action::Emit(Event::TopicUpdated {
                    sender: None,
                    channel: channel.clone(),
                    topic: value.to_string(),
                }));
                channel
            }
            Response::RPL_CREATIONTIME => {
                let timestamp = value.trim().parse::<i64>().map_err(|_| malformed())?;
                self.update_channel(name, |channel| {
                    channel.update_creation_timestamp(timestamp)
                })
            }
            Response::RPL_CHANNELMODEIS => {
                self.update_channel(name, |channel| channel.update_mode(value))
            }
            Response::RPL_WELCOME => return Err(malformed()),
        };

        actions.push(Action::Emit(Event::ReceivedReply {
            channel,
            response,
            text: value.to_string(),
        }));
        Ok(actions)
    }

    /// Apply `update` to a tracked channel, or to a transient one if the
    /// client is not in it. Returns a snapshot either way.
    fn update_channel(&mut self, name: &str, update: impl FnOnce(&mut Channel)) -> Channel {
        match self.directory.get_mut(name) {
            Some(channel) => {
                update(channel);
                channel.clone()
            }
            None => {
                let mut channel = Channel::new(name);
                update(&mut channel);
                channel
            }
        }
    }

    fn join(&mut self, msg: &Message) -> Result<Vec<Action>, DispatchError> {
        let user = User::parse(&msg.sender);
        let name = msg.recipient.as_str();
        if name.is_empty() {
            return Err(DispatchError::MissingParameter {
                command: "JOIN",
                parameter: "channel",
            });
        }

        if user.matches_nick(&self.nick) {
            let channel = self.directory.insert(name).clone();
            debug!(channel = name, "joined channel");
            return Ok(vec![Action::Emit(Event::JoinedChannel(channel))]);
        }

        let channel = self.directory.channel(name)?.clone();
        Ok(vec![Action::Emit(Event::UserJoined { channel, user })])
    }

    fn kick(&mut self, msg: &Message) -> Result<Vec<Action>, DispatchError> {
        let sender = User::parse(&msg.sender);
        let name = msg.recipient.as_str();
        let (nick, reason) = match msg.trailing.split_once(' ') {
            Some((nick, reason)) => (nick, strip_colon(reason)),
            None => (msg.trailing.as_str(), ""),
        };
        if name.is_empty() {
            return Err(DispatchError::MissingParameter {
                command: "KICK",
                parameter: "channel",
            });
        }
        if nick.is_empty() {
            return Err(DispatchError::MissingParameter {
                command: "KICK",
                parameter: "nick",
            });
        }

        if nick == self.nick {
            let channel = self
                .directory
                .remove(name)
                .ok_or_else(|| DispatchError::UnknownChannel(name.to_string()))?;
            debug!(channel = name, by = %sender, "kicked from channel");
            return Ok(vec![Action::Emit(Event::Kicked {
                sender,
                channel,
                reason: reason.to_string(),
            })]);
        }

        let channel = self.directory.channel(name)?.clone();
        Ok(vec![Action::Emit(Event::UserKicked {
            channel,
            sender,
            nick: nick.to_string(),
            reason: reason.to_string(),
        })])
    }

    fn ping(&self, msg: &Message) -> Vec<Action> {
        let mut actions = vec![Action::Emit(Event::Ping(msg.trailing.clone()))];
        if self.auto_pong {
            actions.push(Action::Send(Command::Pong(msg.trailing.clone())));
        }
        actions
    }

    fn privmsg(&self, msg: &Message) -> Vec<Action> {
        let sender = User::parse(&msg.sender);
        let text = msg.trailing.clone();

        let event = if msg.recipient == self.nick {
            Event::PrivateMessage { sender, text }
        } else {
            let channel = self
                .directory
                .channel(&msg.recipient)
                .cloned()
                .unwrap_or_else(|_| Channel::new(msg.recipient.as_str()));
            Event::ChannelMessage {
                sender,
                text,
                channel,
            }
        };
        vec![Action::Emit(event)]
    }

    fn topic(&mut self, msg: &Message) -> Vec<Action> {
        let name = msg.recipient.as_str();
        let topic = msg.trailing.as_str();

        let channel = self.update_channel(name, |channel| channel.update_topic(topic));

        vec![Action::Emit(Event::TopicUpdated {
            sender: Some(User::parse(&msg.sender)),
            channel,
            topic: topic.to_string(),
        })]
    }

    fn quit(&mut self, msg: &Message) -> Vec<Action> {
        if User::parse(&msg.sender).matches_nick(&self.nick) {
            debug!(channels = self.directory.len(), "own QUIT, clearing directory");
            self.directory.clear();
        }
        unhandled(msg)
    }
}

fn notice(msg: &Message) -> Vec<Action> {
    vec![Action::Emit(Event::Notice {
        sender: User::parse(&msg.sender),
        text: msg.trailing.clone(),
    })]
}

fn unhandled(msg: &Message) -> Vec<Action> {
    vec![Action::Emit(Event::Unhandled(msg.clone()))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MessageParseError;

    fn dispatch(d: &mut Dispatcher, line: &str) -> Result<Vec<Action>, DispatchError> {
        d.dispatch(&Message::parse(line).unwrap())
    }

    fn events(d: &mut Dispatcher, line: &str) -> Vec<Event> {
        dispatch(d, line)
            .unwrap()
            .into_iter()
            .filter_map(|a| match a {
                Action::Emit(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    fn joined(channels: &[&str]) -> Dispatcher {
        let mut d = Dispatcher::new("bot", true);
        for name in channels {
            dispatch(&mut d, &format!(":bot!b@h JOIN {}", name)).unwrap();
        }
        d
    }

    #[test]
    fn test_error_actions_compare_causes() {
        let invalid = |cause| {
            Action::Error(ProtocolError::InvalidMessage {
                string: ":x".into(),
                cause,
            })
        };
        assert_eq!(
            invalid(MessageParseError::MissingOpcode),
            invalid(MessageParseError::MissingOpcode)
        );
        // Same display text, different cause.
        assert_ne!(
            invalid(MessageParseError::MissingOpcode),
            invalid(MessageParseError::EmptyMessage)
        );
    }

    #[test]
    fn test_online_only_once() {
        let mut d = Dispatcher::new("bot", true);
        assert_eq!(d.state(), RegistrationState::Unregistered);
        assert_eq!(events(&mut d, ":srv 001 bot :Welcome"), [Event::Online]);
        assert!(d.is_registered());
        assert!(events(&mut d, ":srv 001 bot :Welcome again").is_empty());
    }

    #[test]
    fn test_own_join_tracks_channel() {
        let mut d = Dispatcher::new("bot", true);
        let evs = events(&mut d, ":bot!b@h JOIN #chan");
        assert_eq!(evs, [Event::JoinedChannel(Channel::new("#chan"))]);
        assert!(d.directory().contains("#chan"));
    }

    #[test]
    fn test_peer_join() {
        let mut d = joined(&["#chan"]);
        let evs = events(&mut d, ":other!u@h JOIN #chan");
        assert_eq!(
            evs,
            [Event::UserJoined {
                channel: Channel::new("#chan"),
                user: User::parse("other!u@h"),
            }]
        );
    }

    #[test]
    fn test_peer_join_unknown_channel() {
        let mut d = Dispatcher::new("bot", true);
        assert_eq!(
            dispatch(&mut d, ":other!u@h JOIN #elsewhere").unwrap_err(),
            DispatchError::UnknownChannel("#elsewhere".into())
        );
        assert!(d.directory().is_empty());
    }

    #[test]
    fn test_own_kick_removes_channel() {
        let mut d = joined(&["#chan"]);
        dispatch(&mut d, ":srv 332 bot #chan :the topic").unwrap();
        let evs = events(&mut d, ":op!u@h KICK #chan bot :bye now");
        match &evs[..] {
            [Event::Kicked {
                sender,
                channel,
                reason,
            }] => {
                assert_eq!(sender.nick(), "op");
                assert_eq!(channel.topic(), "the topic");
                assert_eq!(reason, "bye now");
            }
            other => panic!("unexpected events: {:?}", other),
        }
        assert!(!d.directory().contains("#chan"));
    }

    #[test]
    fn test_peer_kick() {
        let mut d = joined(&["#chan"]);
        let evs = events(&mut d, ":op!u@h KICK #chan victim :flooding");
        assert_eq!(
            evs,
            [Event::UserKicked {
                channel: Channel::new("#chan"),
                sender: User::parse("op!u@h"),
                nick: "victim".into(),
                reason: "flooding".into(),
            }]
        );
        assert!(d.directory().contains("#chan"));
    }

    #[test]
    fn test_kick_without_reason() {
        let mut d = joined(&["#chan"]);
        let evs = events(&mut d, ":op!u@h KICK #chan :victim");
        assert!(matches!(&evs[0], Event::UserKicked { nick, reason, .. } if nick == "victim" && reason.is_empty()));
    }

    #[test]
    fn test_membership_lines_missing_parameters() {
        let mut d = joined(&["#a"]);
        assert_eq!(
            dispatch(&mut d, ":bot!b@h JOIN").unwrap_err(),
            DispatchError::MissingParameter {
                command: "JOIN",
                parameter: "channel",
            }
        );
        assert_eq!(
            dispatch(&mut d, ":op!o@h KICK #a").unwrap_err(),
            DispatchError::MissingParameter {
                command: "KICK",
                parameter: "nick",
            }
        );
        assert!(matches!(
            dispatch(&mut d, ":op!o@h KICK"),
            Err(DispatchError::MissingParameter { parameter: "channel", .. })
        ));
        assert_eq!(d.directory().len(), 1);
        assert!(d.directory().contains("#a"));
    }

    #[test]
    fn test_kick_unknown_channel() {
        let mut d = Dispatcher::new("bot", true);
        assert_eq!(
            dispatch(&mut d, ":op!u@h KICK #nowhere bot :x").unwrap_err(),
            DispatchError::UnknownChannel("#nowhere".into())
        );
    }

    #[test]
    fn test_ping_auto_pong() {
        let mut d = Dispatcher::new("bot", true);
        let actions = dispatch(&mut d, "PING :tok").unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].event(), Some(&Event::Ping("tok".into())));
        assert_eq!(actions[1].command(), Some(&Command::Pong("tok".into())));

        let mut d = Dispatcher::new("bot", false);
        let actions = dispatch(&mut d, "PING :tok").unwrap();
        assert_eq!(actions, [Action::Emit(Event::Ping("tok".into()))]);
    }

    #[test]
    fn test_private_and_channel_messages() {
        let mut d = joined(&["#chan"]);
        let evs = events(&mut d, ":friend!f@h PRIVMSG bot :psst");
        assert_eq!(
            evs,
            [Event::PrivateMessage {
                sender: User::parse("friend!f@h"),
                text: "psst".into(),
            }]
        );

        let evs = events(&mut d, ":friend!f@h PRIVMSG #chan :hello all");
        assert!(matches!(&evs[0], Event::ChannelMessage { channel, text, .. }
            if channel.name() == "#chan" && text == "hello all"));

        // Not joined: transient channel, directory untouched.
        let evs = events(&mut d, ":friend!f@h PRIVMSG #other :hi");
        assert!(matches!(&evs[0], Event::ChannelMessage { channel, .. } if channel.name() == "#other"));
        assert!(!d.directory().contains("#other"));
    }

    #[test]
    fn test_notice() {
        let mut d = Dispatcher::new("bot", true);
        let evs = events(&mut d, ":irc.example.net NOTICE * :*** Checking ident");
        assert_eq!(
            evs,
            [Event::Notice {
                sender: User::new("irc.example.net"),
                text: "*** Checking ident".into(),
            }]
        );
    }

    #[test]
    fn test_topic_change() {
        let mut d = joined(&["#chan"]);
        let evs = events(&mut d, ":op!u@h TOPIC #chan :fresh topic");
        match &evs[..] {
            [Event::TopicUpdated {
                sender: Some(sender),
                channel,
                topic,
            }] => {
                assert_eq!(sender.nick(), "op");
                assert_eq!(channel.topic(), "fresh topic");
                assert_eq!(topic, "fresh topic");
            }
            other => panic!("unexpected events: {:?}", other),
        }
        assert_eq!(d.directory().channel("#chan").unwrap().topic(), "fresh topic");

        let evs = events(&mut d, ":op!u@h TOPIC #untracked :x");
        assert!(matches!(&evs[0], Event::TopicUpdated { channel, .. } if channel.topic() == "x"));
        assert!(!d.directory().contains("#untracked"));
    }

    #[test]
    fn test_rpl_topic() {
        let mut d = joined(&["#chan"]);
        let evs = events(&mut d, ":srv 332 bot #chan :Welcome: read the rules");
        assert_eq!(evs.len(), 2);
        assert!(matches!(&evs[0], Event::TopicUpdated { sender: None, topic, .. }
            if topic == "Welcome: read the rules"));
        assert!(matches!(&evs[1], Event::ReceivedReply { response: Response::RPL_TOPIC, text, .. }
            if text == "Welcome: read the rules"));
        assert_eq!(
            d.directory().channel("#chan").unwrap().topic(),
            "Welcome: read the rules"
        );
    }

    #[test]
    fn test_rpl_creationtime_and_mode() {
        let mut d = joined(&["#chan"]);
        let evs = events(&mut d, ":srv 329 bot #chan 1700000000");
        assert!(matches!(&evs[..], [Event::ReceivedReply { channel, response: Response::RPL_CREATIONTIME, .. }]
            if channel.creation_timestamp() == 1_700_000_000));

        let evs = events(&mut d, ":srv 324 bot #chan +nt");
        assert!(matches!(&evs[..], [Event::ReceivedReply { channel, text, .. }]
            if channel.mode() == "+nt" && text == "+nt"));
    }

    #[test]
    fn test_channel_reply_for_untracked_channel() {
        let mut d = Dispatcher::new("bot", true);
        let evs = events(&mut d, ":srv 324 bot #notjoined +nt");
        assert!(matches!(&evs[..], [Event::ReceivedReply { channel, .. }]
            if channel.name() == "#notjoined" && channel.mode() == "+nt"));

        let evs = events(&mut d, ":srv 329 bot #other 1700000000");
        assert!(matches!(&evs[..], [Event::ReceivedReply { channel, .. }]
            if channel.creation_timestamp() == 1_700_000_000));
        assert!(d.directory().is_empty());

        // 332 still tracks the channel it names.
        events(&mut d, ":srv 332 bot #late :topic");
        assert_eq!(d.directory().channel("#late").unwrap().topic(), "topic");
    }

    #[test]
    fn test_malformed_numerics() {
        let mut d = joined(&["#chan"]);
        assert_eq!(
            dispatch(&mut d, ":srv 332 bot :#chan").unwrap_err(),
            DispatchError::MalformedNumeric {
                response: Response::RPL_TOPIC,
                payload: "#chan".into(),
            }
        );
        assert!(matches!(
            dispatch(&mut d, ":srv 329 bot #chan yesterday"),
            Err(DispatchError::MalformedNumeric {
                response: Response::RPL_CREATIONTIME,
                ..
            })
        ));
        assert!(matches!(
            dispatch(&mut d, ":srv 329 bot #fresh soon"),
            Err(DispatchError::MalformedNumeric { .. })
        ));
        assert!(!d.directory().contains("#fresh"));
        assert_eq!(d.directory().channel("#chan").unwrap().creation_timestamp(), 0);
    }

    #[test]
    fn test_own_quit_clears_directory() {
        let mut d = joined(&["#a", "#b"]);
        let evs = events(&mut d, ":other!u@h QUIT :Ping timeout");
        assert!(matches!(&evs[0], Event::Unhandled(_)));
        assert_eq!(d.directory().len(), 2);

        let evs = events(&mut d, ":bot!b@h QUIT :Client Quit");
        assert!(matches!(&evs[0], Event::Unhandled(msg) if msg.is_command("QUIT")));
        assert!(d.directory().is_empty());
    }

    #[test]
    fn test_unhandled() {
        let mut d = Dispatcher::new("bot", true);
        let evs = events(&mut d, ":srv 375 bot :- MOTD -");
        assert!(matches!(&evs[0], Event::Unhandled(msg) if msg.opcode == Opcode::Numeric(375)));
        let evs = events(&mut d, ":other!u@h MODE #chan +o bot");
        assert!(matches!(&evs[0], Event::Unhandled(_)));
    }
}
