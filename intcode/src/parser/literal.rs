//! Parse number literals.
//!
//! Only signed base 10 literals are supported, which is all the program format
//! uses.

use nom::{
    character::complete::{digit1, one_of},
    combinator::{map_res, opt, recognize},
    sequence::pair,
    IResult,
};

use super::ParseError;
use crate::constants::Word;

/// Parse a decimal number, with an optional sign
pub(crate) fn parse_word<'a, Error: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Word, Error> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<Word>()
    })(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    type R<'a> = IResult<&'a str, Word, ()>;

    #[test]
    fn parse_word_test() {
        assert_eq!(parse_word("100"), R::Ok(("", 100)));
        assert_eq!(parse_word("-42,"), R::Ok((",", -42)));
        assert_eq!(parse_word("+7"), R::Ok(("", 7)));
        assert_eq!(parse_word("0"), R::Ok(("", 0)));
        assert_eq!(
            parse_word("9223372036854775807"),
            R::Ok(("", Word::MAX))
        ); // Upper boundary
        assert!(parse_word::<()>("9223372036854775808").is_err()); // Out of bounds
        assert!(parse_word::<()>("-").is_err());
        assert!(parse_word::<()>("abc").is_err());
        assert!(parse_word::<()>("").is_err());
    }
}
