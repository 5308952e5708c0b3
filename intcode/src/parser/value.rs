//! Parse instruction operands of the assembler syntax.
//!
//! An operand is an optional mode specifier (`P:` or `R:`) followed by either
//! a number literal or a `*label` reference.

use nom::{
    branch::alt,
    character::complete::{alpha1, char},
    combinator::{map, opt},
    error::context,
    sequence::{preceded, terminated},
    IResult,
};
use parse_display::Display;

use super::{literal::parse_word, parse_identifier, ParseError};
use crate::constants::Word;

/// The value of an operand
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub(crate) enum Value<'a> {
    #[display("{0}")]
    Literal(Word),

    #[display("*{0}")]
    Label(&'a str),
}

/// An instruction operand as written in the source
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Argument<'a> {
    pub specifier: Option<&'a str>,
    pub value: Value<'a>,
}

impl<'a> Argument<'a> {
    #[cfg(test)]
    pub(crate) fn immediate(value: Value<'a>) -> Self {
        Self {
            specifier: None,
            value,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_specifier(specifier: &'a str, value: Value<'a>) -> Self {
        Self {
            specifier: Some(specifier),
            value,
        }
    }
}

impl std::fmt::Display for Argument<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(specifier) = self.specifier {
            write!(f, "{specifier}:")?;
        }
        write!(f, "{}", self.value)
    }
}

fn parse_value<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Value<'a>, Error> {
    alt((
        map(preceded(char('*'), parse_identifier), Value::Label),
        map(parse_word, Value::Literal),
    ))(input)
}

/// Parse an instruction operand
pub(crate) fn parse_argument<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Argument<'a>, Error> {
    let (input, specifier) = opt(terminated(alpha1, char(':')))(input)?;
    let (input, value) = context("expected a number or a *label", parse_value)(input)?;
    Ok((input, Argument { specifier, value }))
}
