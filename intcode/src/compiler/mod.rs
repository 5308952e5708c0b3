//! Assembler back-end
//!
//! Compiling happens in two passes: the layout pass places the labels and the
//! lines in memory, then the fill pass encodes each line, now that every
//! label address is known.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::{
    constants::{Address, Word},
    parser::{parse_assembly, Program, SyntaxError},
};

pub use self::{
    layout::MemoryLayoutError,
    memory::{InstructionCompilationError, MemoryFillError},
};

pub(crate) mod layout;
pub(crate) mod memory;

/// An assembled program
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assembly {
    /// The memory image, ready to be loaded in a machine
    pub words: Vec<Word>,

    /// Map of labels to addresses
    pub labels: BTreeMap<String, Address>,
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words.iter().format(","))
    }
}

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum CompilationError {
    #[error("could not layout memory")]
    #[diagnostic(code(intcode::layout))]
    MemoryLayout(#[from] MemoryLayoutError),

    #[error("could not fill memory")]
    #[diagnostic(code(intcode::fill))]
    MemoryFill(#[from] MemoryFillError),
}

impl CompilationError {
    /// Location of the offending line in the source
    #[must_use]
    pub fn location(&self) -> &Range<usize> {
        match self {
            CompilationError::MemoryLayout(e) => e.location(),
            CompilationError::MemoryFill(e) => e.location(),
        }
    }
}

/// Compile a parsed assembler source
///
/// # Errors
///
/// This function will return an error if a label is defined twice, used but
/// never defined, or if an instruction can't be encoded.
#[tracing::instrument(skip(program))]
pub fn compile(program: &Program) -> Result<Assembly, CompilationError> {
    let layout = self::layout::layout_memory(&program.lines)?;
    let words = self::memory::fill_memory(&layout)?;
    debug!(
        lines = program.lines.len(),
        words = words.len(),
        labels = layout.labels.len(),
        "Compiled program"
    );

    let labels = layout
        .labels
        .iter()
        .map(|(label, address)| ((*label).to_owned(), *address))
        .collect();

    Ok(Assembly { words, labels })
}

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compilation(#[from] CompilationError),
}

/// Parse and compile an assembler source
///
/// # Errors
///
/// This function will return an error if the source can't be parsed or
/// compiled.
pub fn assemble(source: &str) -> Result<Assembly, AssembleError> {
    let program = parse_assembly(source)?;
    Ok(compile(&program)?)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn assemble_test() {
        let source = indoc! {"
            # Read a number and print it twice
            start:  in P:*n
                    out P:*n, P:*n
            again:  jz 0 *end
            end:    halt
            n:      .word 0
        "};

        // `out` takes a single operand
        assert!(assemble(source).is_err());

        let source = indoc! {"
            # Read a number and print it twice
            start:  in P:*n
                    out P:*n
                    out P:*n
                    jz 0 *end
            end:    halt
            n:      .word 0
        "};

        let assembly = assemble(source).unwrap();
        assert_eq!(assembly.words, vec![3, 10, 4, 10, 4, 10, 1106, 0, 9, 99, 0]);
        insta::assert_snapshot!(assembly, @"3,10,4,10,4,10,1106,0,9,99,0");
    }

    #[test]
    fn labels_test() {
        let source = indoc! {"
            a: b: add 1, 2, P:*c
            c: .word 0
        "};

        let assembly = assemble(source).unwrap();
        assert_eq!(
            assembly.labels,
            BTreeMap::from([
                (String::from("a"), 0),
                (String::from("b"), 0),
                (String::from("c"), 4),
            ])
        );
        assert_eq!(assembly.words, vec![1101, 1, 2, 4, 0]);
    }

    #[test]
    fn unknown_label_test() {
        let source = "out 1\nout *nowhere\n";
        let err = assemble(source).unwrap_err();
        let AssembleError::Compilation(err) = err else {
            panic!("expected a compilation error, got {err:?}");
        };
        assert_eq!(err.location(), &(6..18));
        assert_eq!(
            err,
            CompilationError::MemoryFill(MemoryFillError::UnknownLabel {
                label: String::from("nowhere"),
                location: 6..18,
            })
        );
    }

    #[test]
    fn duplicate_label_test() {
        let source = "x: .word 1\nx: .word 2";
        let err = assemble(source).unwrap_err();
        assert_eq!(
            err,
            AssembleError::Compilation(CompilationError::MemoryLayout(
                MemoryLayoutError::DuplicateLabel {
                    label: String::from("x"),
                    location: 11..21,
                }
            ))
        );
    }

    #[test]
    fn syntax_error_test() {
        let err = assemble("add 1 2 P:3\nout !\n").unwrap_err();
        assert!(matches!(err, AssembleError::Syntax(_)));
    }
}
