//! Program parsing logic
//!
//! Two syntaxes are handled here: the comma-separated program images, and the
//! line-oriented assembler sources. The parsing is done by the `nom` library.

use nom::bytes::complete::take_while1;
use nom::character::complete::{char, multispace0};
use nom::combinator::{all_consuming, cut, verify};
use nom::error::{context, VerboseError};
use nom::multi::separated_list1;
use nom::sequence::delimited;
use nom::{Finish, IResult};

use crate::constants::Word;

mod errors;
pub(crate) mod line;
pub(crate) mod literal;
pub mod location;
pub(crate) mod value;

pub use errors::{ParseError, SyntaxError};
pub use line::{parse_assembly, Program};
pub use location::Located;

fn is_identifier_char(c: char) -> bool {
    is_start_identifier_char(c) || c.is_ascii_digit()
}

fn is_start_identifier_char(c: char) -> bool {
    c == '_' || c.is_ascii_lowercase() || c.is_ascii_uppercase()
}

/// Parse a C-like identifier
pub(crate) fn parse_identifier<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, Error> {
    verify(take_while1(is_identifier_char), |f: &str| {
        f.chars()
            .next()
            .filter(|&c| is_start_identifier_char(c))
            .is_some()
    })(input)
}

/// Parse the words of a program image
fn parse_image<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Vec<Word>, Error> {
    delimited(
        multispace0,
        separated_list1(
            delimited(multispace0, char(','), multispace0),
            cut(context("expected a number", literal::parse_word)),
        ),
        multispace0,
    )(input)
}

/// Parse a program image: comma-separated signed integers.
///
/// Whitespace around the numbers is ignored, trailing newlines included.
///
/// # Errors
///
/// This function will return an error if the image is empty or holds
/// anything else than numbers separated by commas.
pub fn parse(input: &str) -> Result<Vec<Word>, SyntaxError> {
    let (_, image) = all_consuming(parse_image::<VerboseError<&str>>)(input)
        .finish()
        .map_err(|e| SyntaxError::from_verbose(input, &e))?;
    Ok(image)
}
