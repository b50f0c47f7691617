//! IRC numeric replies understood by the engine.
//!
//! Servers send many more numerics than these; anything not listed here is
//! still parsed (as [`Opcode::Numeric`](crate::message::Opcode::Numeric)) and
//! surfaced as an unhandled message.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol, section 5

#![allow(non_camel_case_types)]

/// IRC server response code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum Response {
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 324 - Channel mode string
    RPL_CHANNELMODEIS = 324,
    /// 329 - Channel creation time
    RPL_CREATIONTIME = 329,
    /// 332 - Channel topic
    RPL_TOPIC = 332,
}

impl Response {
    /// Returns the numeric code as u16
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Creates a Response from a numeric code
    pub fn from_code(code: u16) -> Option<Response> {
        Some(match code {
            1 => Response::RPL_WELCOME,
            324 => Response::RPL_CHANNELMODEIS,
            329 => Response::RPL_CREATIONTIME,
            332 => Response::RPL_TOPIC,
            _ => return None,
        })
    }

    /// Symbolic name, e.g. `RPL_TOPIC`.
    pub fn name(&self) -> &'static str {
        match self {
            Response::RPL_WELCOME => "RPL_WELCOME",
            Response::RPL_CHANNELMODEIS => "RPL_CHANNELMODEIS",
            Response::RPL_CREATIONTIME => "RPL_CREATIONTIME",
            Response::RPL_TOPIC => "RPL_TOPIC",
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.code())
    }
}
