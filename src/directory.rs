//! Channels the client currently occupies.
//!
//! The [`Directory`] is owned by the engine and only the dispatcher mutates
//! it. Callers read it through shared references or receive owned
//! [`Channel`] snapshots inside events.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::encode::Command;
use crate::error::DispatchError;

/// A channel and the state the server has reported for it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel {
    name: String,
    topic: String,
    mode: String,
    creation_timestamp: i64,
}

impl Channel {
    /// A channel with no reported state.
    ///
    /// Values built this way outside the engine are transient: they can
    /// address a channel but are never tracked.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: String::new(),
            mode: String::new(),
            creation_timestamp: 0,
        }
    }

    /// Channel name, case preserved as received.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current topic, empty until one is received.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Mode string from `RPL_CHANNELMODEIS`, empty until received.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Unix creation time from `RPL_CREATIONTIME`, 0 until received.
    pub fn creation_timestamp(&self) -> i64 {
        self.creation_timestamp
    }

    /// Creation time as a UTC timestamp, if one has been received.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        if self.creation_timestamp == 0 {
            return None;
        }
        DateTime::from_timestamp(self.creation_timestamp, 0)
    }

    /// PRIVMSG to this channel.
    pub fn message(&self, text: impl Into<String>) -> Command {
        Command::Privmsg {
            target: self.name.clone(),
            text: text.into(),
        }
    }

    /// KICK `user` from this channel.
    pub fn kick(&self, user: impl Into<String>, reason: Option<&str>) -> Command {
        Command::Kick {
            channel: self.name.clone(),
            user: user.into(),
            reason: reason.map(str::to_string),
        }
    }

    /// TOPIC change for this channel.
    pub fn set_topic(&self, text: impl Into<String>) -> Command {
        Command::Topic {
            channel: self.name.clone(),
            text: text.into(),
        }
    }

    pub(crate) fn update_topic(&mut self, topic: &str) {
        self.topic = topic.to_string();
    }

    pub(crate) fn update_mode(&mut self, mode: &str) {
        self.mode = mode.to_string();
    }

    pub(crate) fn update_creation_timestamp(&mut self, timestamp: i64) {
        self.creation_timestamp = timestamp;
    }
}

/// Joined channels keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    channels: HashMap<String, Channel>,
}

impl Directory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a tracked channel.
    pub fn channel(&self, name: &str) -> Result<&Channel, DispatchError> {
        self.channels
            .get(name)
            .ok_or_else(|| DispatchError::UnknownChannel(name.to_string()))
    }

    /// Returns true if the client is in `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Iterate over tracked channels in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Number of tracked channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if no channel is tracked.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Start tracking `name`, replacing any stale entry.
    pub(crate) fn insert(&mut self, name: &str) -> &mut Channel {
        let slot = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| Channel::new(name));
        *slot = Channel::new(name);
        slot
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(name)
    }

    pub(crate) fn get_or_insert(&mut self, name: &str) -> &mut Channel {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Channel::new(name))
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Channel> {
        self.channels.remove(name)
    }

    pub(crate) fn clear(&mut self) {
        self.channels.clear();
    }
}
