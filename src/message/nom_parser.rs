//! Nom-based line grammar.
//!
//! Two shapes are recognized:
//!
//! ```text
//! :<sender> <opcode>[ <recipient>[ <rest...>]]
//! PING <token>
//! ```
//!
//! Fields are split on single spaces, so the fourth field keeps any spaces
//! it contains. Everything else is rejected.

use nom::{
    bytes::complete::{tag, take_till, take_till1},
    character::complete::{char, multispace0, multispace1},
    combinator::{eof, opt, rest},
    error::{context, VerboseError, VerboseErrorKind},
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

const OPCODE_CONTEXT: &str = "parsing opcode";

/// A field up to the next space, possibly empty.
fn field(input: &str) -> ParseResult<&str, &str> {
    take_till(|c| c == ' ')(input)
}

/// A non-empty field up to the next space.
fn field1(input: &str) -> ParseResult<&str, &str> {
    take_till1(|c| c == ' ')(input)
}

fn parse_prefixed(input: &str) -> ParseResult<&str, ParsedLine<'_>> {
    let (input, sender) = context("parsing sender", preceded(char(':'), field1))(input)?;
    let (input, opcode) = context(OPCODE_CONTEXT, preceded(char(' '), field1))(input)?;
    let (input, recipient) = opt(preceded(char(' '), field))(input)?;
    let (input, trailing) = opt(preceded(char(' '), rest))(input)?;

    Ok((
        input,
        ParsedLine {
            sender,
            opcode,
            recipient,
            trailing,
        },
    ))
}

fn parse_ping(input: &str) -> ParseResult<&str, &str> {
    let (input, _) = tag("PING")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, token) =
        context("parsing PING token", take_till1(|c: char| c.is_whitespace()))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, token))
}

/// The fields of one line, borrowed from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedLine<'a> {
    /// Sender without the `:` marker.
    pub sender: &'a str,
    /// Raw opcode token.
    pub opcode: &'a str,
    /// Third field, if the line has one.
    pub recipient: Option<&'a str>,
    /// Everything after the third field, if present.
    pub trailing: Option<&'a str>,
}

impl<'a> ParsedLine<'a> {
    /// Parse a prefixed line.
    pub fn parse_prefixed(input: &'a str) -> Result<Self, MessageParseError> {
        match parse_prefixed(input) {
            Ok((_, line)) => Ok(line),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let in_opcode = e
                    .errors
                    .iter()
                    .any(|(_, kind)| matches!(kind, VerboseErrorKind::Context(OPCODE_CONTEXT)));
                if in_opcode {
                    Err(MessageParseError::MissingOpcode)
                } else {
                    Err(MessageParseError::Unrecognized(input.to_string()))
                }
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::Unrecognized(input.to_string())),
        }
    }

    /// Parse a `PING <token>` line, returning the token.
    pub fn parse_ping(input: &'a str) -> Result<&'a str, MessageParseError> {
        parse_ping(input)
            .map(|(_, token)| token)
            .map_err(|_| MessageParseError::MalformedPing(input.to_string()))
    }
}
