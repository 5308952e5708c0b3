//! Assembler line parsing
//!
//! This module parses whole source lines, including the label definitions, the
//! comments and the line content itself (either an instruction or a
//! directive). Like the rest of the parser, it does zero copy over the input.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, not_line_ending, space0, space1},
    combinator::{all_consuming, opt, peek},
    error::{context, VerboseError},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded, terminated},
    Finish, IResult, Offset,
};

use super::{
    literal::parse_word,
    location::{Locatable, Located},
    parse_identifier,
    value::{parse_argument, Argument},
    ParseError, SyntaxError,
};
use crate::constants::Word;

/// Holds the content of a line
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LineContent<'a> {
    /// An instruction, with its mnemonic and list of operands
    Instruction {
        mnemonic: &'a str,
        arguments: Vec<Argument<'a>>,
    },

    /// A directive, with its name and argument
    Directive { directive: &'a str, argument: Word },
}

impl std::fmt::Display for LineContent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineContent::Instruction {
                mnemonic,
                arguments,
            } => {
                write!(f, "{mnemonic:4}")?;
                for argument in arguments {
                    write!(f, " {argument}")?;
                }
                Ok(())
            }
            LineContent::Directive {
                directive,
                argument,
            } => write!(f, ".{directive} {argument}"),
        }
    }
}

/// Holds a whole line, with the label definitions (if any), the content (if
/// any) and the comment (if any).
///
/// Note that the `Default::default()` implementation represents an empty line.
#[derive(Debug, PartialEq, Eq, Default)]
pub(crate) struct Line<'a> {
    pub symbols: Vec<&'a str>,
    pub content: Option<LineContent<'a>>,
    comment: Option<&'a str>,
}

impl std::fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut had_something = false;
        for symbol in &self.symbols {
            write!(f, "{symbol}: ")?;
            had_something = true;
        }

        if let Some(ref content) = self.content {
            if !had_something {
                write!(f, "    ")?;
            }
            write!(f, "{content}")?;
            had_something = true;
        }

        if let Some(comment) = self.comment {
            if had_something {
                write!(f, "\t{comment}")?;
            } else {
                write!(f, "{comment}")?;
            }
        }

        Ok(())
    }
}

impl<'a> Line<'a> {
    #[cfg(test)] // Only used in tests for now
    pub(crate) fn comment(mut self, comment: &'a str) -> Self {
        self.comment = Some(comment);
        self
    }

    #[cfg(test)] // Only used in tests for now
    pub(crate) fn symbol(mut self, symbol: &'a str) -> Self {
        self.symbols.push(symbol);
        self
    }

    #[cfg(test)] // Only used in tests for now
    pub(crate) fn directive(mut self, directive: &'a str, argument: Word) -> Self {
        self.content = Some(LineContent::Directive {
            directive,
            argument,
        });
        self
    }

    #[cfg(test)] // Only used in tests for now
    pub(crate) fn instruction(mut self, mnemonic: &'a str, arguments: Vec<Argument<'a>>) -> Self {
        self.content = Some(LineContent::Instruction {
            mnemonic,
            arguments,
        });
        self
    }
}

/// A parsed assembler source
#[derive(Debug, PartialEq, Eq, Default)]
pub struct Program<'a> {
    pub(crate) lines: Vec<Located<Line<'a>>>,
}

/// Parses a directive
fn parse_directive_line<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, LineContent<'a>, Error> {
    let (input, _) = char('.')(input)?;
    let (input, directive) = parse_identifier(input)?;
    let (input, _) = space1(input)?;
    let (input, argument) = context("expected a number", parse_word)(input)?;
    Ok((
        input,
        LineContent::Directive {
            directive,
            argument,
        },
    ))
}

/// Parses the separator between two operands: a comma or some blanks
fn parse_separator<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, Error> {
    alt((delimited(space0, tag(","), space0), space1))(input)
}

/// Parses an instruction
fn parse_instruction_line<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, LineContent<'a>, Error> {
    let (input, mnemonic) = parse_identifier(input)?;
    let (input, arguments) = opt(preceded(
        space1,
        separated_list1(parse_separator, parse_argument),
    ))(input)?;
    let arguments = arguments.unwrap_or_default();
    Ok((
        input,
        LineContent::Instruction {
            mnemonic,
            arguments,
        },
    ))
}

/// Parses the content of a line: an instruction or a directive
fn parse_line_content<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, LineContent<'a>, Error> {
    alt((parse_directive_line, parse_instruction_line))(input)
}

/// Parses an inline comment
fn parse_comment<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, Error> {
    let (input, _) = peek(tag("#"))(input)?;
    not_line_ending(input)
}

/// Parses a label definition
fn parse_symbol_definition<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, Error> {
    let (input, symbol) = parse_identifier(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char(':')(input)?;
    Ok((input, symbol))
}

/// Parses a whole line
fn parse_line<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Line<'a>, Error> {
    let (input, _) = space0(input)?;

    // Extract the list of label definitions
    let (input, symbols) = many0(terminated(parse_symbol_definition, space0))(input)?;

    // Extract the line content
    let (input, content) = opt(parse_line_content)(input)?;
    let (input, _) = space0(input)?;

    // Extract the comment
    let (input, comment) = opt(parse_comment)(input)?;

    Ok((
        input,
        Line {
            symbols,
            content,
            comment,
        },
    ))
}

/// Parse an assembler source, line by line
///
/// # Errors
///
/// Fails on the first line which could not be parsed.
pub fn parse_assembly(input: &str) -> Result<Program<'_>, SyntaxError> {
    let mut lines = Vec::new();

    for line in input.split('\n') {
        let start = input.offset(line);
        let location = start..start + line.len();
        let line = line.strip_suffix('\r').unwrap_or(line);

        let (_, parsed) = all_consuming(parse_line::<VerboseError<&str>>)(line)
            .finish()
            .map_err(|e| SyntaxError::from_verbose(input, &e))?;
        lines.push(parsed.with_location(location));
    }

    Ok(Program { lines })
}
