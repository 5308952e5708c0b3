use std::num::ParseIntError;

use miette::{Diagnostic, SourceSpan};
use nom::error::{VerboseError, VerboseErrorKind};
use nom::Offset;
use thiserror::Error;

pub trait ParseError<I>:
    nom::error::ParseError<I>
    + nom::error::FromExternalError<I, ParseIntError>
    + nom::error::ContextError<I>
{
}

impl<I, E> ParseError<I> for E where
    E: nom::error::ParseError<I>
        + nom::error::FromExternalError<I, ParseIntError>
        + nom::error::ContextError<I>
{
}

/// A program or an assembler source could not be parsed
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("{message}")]
#[diagnostic(code(intcode::syntax))]
pub struct SyntaxError {
    pub message: String,

    #[label("here")]
    pub span: SourceSpan,
}

impl SyntaxError {
    /// Offset of the error in the parsed source
    #[must_use]
    pub fn offset(&self) -> usize {
        self.span.offset()
    }

    /// Build an error out of the `nom` error stack.
    ///
    /// The innermost error gives the location, the outermost context gives the
    /// message.
    pub(crate) fn from_verbose(source: &str, error: &VerboseError<&str>) -> Self {
        let Some((input, kind)) = error.errors.first() else {
            return Self {
                message: String::from("invalid input"),
                span: (0, 0).into(),
            };
        };

        let message = error
            .errors
            .iter()
            .rev()
            .find_map(|(_, kind)| match kind {
                VerboseErrorKind::Context(ctx) => Some((*ctx).to_string()),
                _ => None,
            })
            .unwrap_or_else(|| match kind {
                VerboseErrorKind::Char(c) => format!("expected '{c}'"),
                VerboseErrorKind::Nom(nom::error::ErrorKind::Eof) => {
                    String::from("unexpected trailing input")
                }
                VerboseErrorKind::Nom(_) | VerboseErrorKind::Context(_) => {
                    String::from("unexpected input")
                }
            });

        let offset = source.offset(input);
        let length = input
            .find(|c: char| c == ',' || c.is_whitespace())
            .unwrap_or(input.len());

        Self {
            message,
            span: (offset, length).into(),
        }
    }
}
