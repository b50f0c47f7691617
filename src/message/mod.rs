//! Parsed IRC lines.

mod nom_parser;
mod types;

pub(crate) use self::types::strip_colon;
pub use self::types::{Message, Opcode};
