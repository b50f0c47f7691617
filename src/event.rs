//! Events delivered to subscribers.

use crate::directory::Channel;
use crate::message::Message;
use crate::response::Response;
use crate::user::User;

/// Something that happened on the connection.
///
/// Channels inside events are snapshots taken when the event was produced;
/// later updates to the directory do not show through them.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Event {
    /// Registration finished (first `RPL_WELCOME`).
    Online,
    /// The client joined `channel`.
    JoinedChannel(Channel),
    /// The client was kicked from `channel`, which is no longer tracked.
    Kicked {
        /// Who kicked.
        sender: User,
        /// Last known state of the channel.
        channel: Channel,
        /// Kick reason, possibly empty.
        reason: String,
    },
    /// A NOTICE addressed to the client or one of its channels.
    Notice {
        /// Sending user or server.
        sender: User,
        /// Notice text.
        text: String,
    },
    /// Server keepalive probe with its token.
    Ping(String),
    /// A PRIVMSG sent directly to the client.
    PrivateMessage {
        /// Who sent it.
        sender: User,
        /// Message text.
        text: String,
    },
    /// A PRIVMSG sent to a channel.
    ChannelMessage {
        /// Who sent it.
        sender: User,
        /// Message text.
        text: String,
        /// The tracked channel, or a transient one if the client is not in it.
        channel: Channel,
    },
    /// A channel topic was reported or changed.
    TopicUpdated {
        /// Who changed it; `None` when the server reported it on join.
        sender: Option<User>,
        /// Channel the topic belongs to.
        channel: Channel,
        /// The topic text.
        topic: String,
    },
    /// A known channel numeric arrived.
    ReceivedReply {
        /// Channel the reply is about.
        channel: Channel,
        /// Which reply.
        response: Response,
        /// Value part of the reply.
        text: String,
    },
    /// Someone else joined a tracked channel.
    UserJoined {
        /// The channel.
        channel: Channel,
        /// Who joined.
        user: User,
    },
    /// Someone else was kicked from a tracked channel.
    UserKicked {
        /// The channel.
        channel: Channel,
        /// Who kicked.
        sender: User,
        /// Nick of the kicked user.
        nick: String,
        /// Kick reason, possibly empty.
        reason: String,
    },
    /// A parsed message with no specific handling.
    Unhandled(Message),
    /// A line was read, terminator removed. Follows the line's other events.
    PacketRead(String),
    /// A line was written, exactly as sent.
    PacketWritten(String),
}

impl Event {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Online => "online",
            Event::JoinedChannel(_) => "joined_channel",
            Event::Kicked { .. } => "kicked",
            Event::Notice { .. } => "notice",
            Event::Ping(_) => "ping",
            Event::PrivateMessage { .. } => "private_message",
            Event::ChannelMessage { .. } => "channel_message",
            Event::TopicUpdated { .. } => "topic_updated",
            Event::ReceivedReply { .. } => "received_reply",
            Event::UserJoined { .. } => "user_joined",
            Event::UserKicked { .. } => "user_kicked",
            Event::Unhandled(_) => "unhandled",
            Event::PacketRead(_) => "packet_read",
            Event::PacketWritten(_) => "packet_written",
        }
    }

    /// The channel this event concerns, if any.
    pub fn channel(&self) -> Option<&Channel> {
        match self {
            Event::JoinedChannel(channel)
            | Event::Kicked { channel, .. }
            | Event::ChannelMessage { channel, .. }
            | Event::TopicUpdated { channel, .. }
            | Event::ReceivedReply { channel, .. }
            | Event::UserJoined { channel, .. }
            | Event::UserKicked { channel, .. } => Some(channel),
            _ => None,
        }
    }
}
