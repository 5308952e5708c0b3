use std::ops::Range;

use thiserror::Error;
use tracing::{debug, span, trace, Level};

use crate::{
    constants::{Address, Word},
    parser::{
        line::LineContent,
        value::{Argument, Value},
    },
    runtime::{Instruction, Mode, Opcode},
};

use super::layout::{Labels, Layout, Placement};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryFillError {
    #[error("unknown label {label}")]
    UnknownLabel {
        label: String,
        location: Range<usize>,
    },

    #[error("could not compile instruction")]
    InstructionCompilation {
        location: Range<usize>,
        source: InstructionCompilationError,
    },
}

impl MemoryFillError {
    #[must_use]
    pub fn location(&self) -> &Range<usize> {
        match self {
            MemoryFillError::UnknownLabel { location, .. }
            | MemoryFillError::InstructionCompilation { location, .. } => location,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstructionCompilationError {
    #[error("unknown mnemonic {0}")]
    UnknownMnemonic(String),

    #[error("invalid number of arguments for {opcode}: expected {expected}, got {got}")]
    InvalidArgumentNumber {
        opcode: Opcode,
        expected: usize,
        got: usize,
    },

    #[error("invalid mode specifier {0}: (expected P or R)")]
    InvalidModeSpecifier(String),

    #[error("the destination of {0} can not be an immediate value")]
    ImmediateWrite(Opcode),

    #[error("address {0} does not fit in a word")]
    AddressOverflow(Address),
}

/// Lookup a mnemonic, aliases included
fn parse_mnemonic(mnemonic: &str) -> Result<Opcode, InstructionCompilationError> {
    match mnemonic {
        "arb" => Ok(Opcode::Cr),
        _ => mnemonic
            .parse()
            .map_err(|_| InstructionCompilationError::UnknownMnemonic(mnemonic.to_owned())),
    }
}

fn parse_mode(specifier: Option<&str>) -> Result<Mode, InstructionCompilationError> {
    match specifier {
        None => Ok(Mode::Immediate),
        Some("P") => Ok(Mode::Position),
        Some("R") => Ok(Mode::Relative),
        Some(other) => Err(InstructionCompilationError::InvalidModeSpecifier(
            other.to_owned(),
        )),
    }
}

#[tracing::instrument(level = "trace")]
fn compile_instruction(
    mnemonic: &str,
    arguments: &[(Option<&str>, Word)],
) -> Result<Vec<Word>, InstructionCompilationError> {
    let opcode = parse_mnemonic(mnemonic)?;

    if arguments.len() != opcode.arity() {
        return Err(InstructionCompilationError::InvalidArgumentNumber {
            opcode,
            expected: opcode.arity(),
            got: arguments.len(),
        });
    }

    let modes = arguments
        .iter()
        .map(|(specifier, _)| parse_mode(*specifier))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(index) = opcode.destination() {
        if modes[index] == Mode::Immediate {
            return Err(InstructionCompilationError::ImmediateWrite(opcode));
        }
    }

    let instruction = Instruction::new(opcode, &modes);
    let mut words = Vec::with_capacity(instruction.length());
    words.push(instruction.encode());
    words.extend(arguments.iter().map(|(_, value)| *value));
    Ok(words)
}

/// Resolve the value of an operand
fn evaluate(
    labels: &Labels,
    value: &Value,
    location: &Range<usize>,
) -> Result<Word, MemoryFillError> {
    match value {
        Value::Literal(word) => Ok(*word),
        Value::Label(label) => {
            let address =
                *labels
                    .get(label)
                    .ok_or_else(|| MemoryFillError::UnknownLabel {
                        label: (*label).to_owned(),
                        location: location.clone(),
                    })?;
            Word::try_from(address).map_err(|_| MemoryFillError::InstructionCompilation {
                location: location.clone(),
                source: InstructionCompilationError::AddressOverflow(address),
            })
        }
    }
}

fn compile_placement(labels: &Labels, placement: &Placement) -> Result<Vec<Word>, MemoryFillError> {
    match placement {
        Placement::Reserved(size) => Ok(vec![0; *size]),

        // Only .word directives make it this far
        Placement::Line(LineContent::Directive { argument, .. }, _) => Ok(vec![*argument]),

        Placement::Line(
            content @ LineContent::Instruction {
                mnemonic,
                arguments,
            },
            location,
        ) => {
            let span = span!(Level::TRACE, "line", content = %content);
            let _guard = span.enter();

            let arguments = arguments
                .iter()
                .enumerate()
                .map(|(index, Argument { specifier, value })| {
                    trace!("argument {} evaluation: {}", index, value);
                    Ok((*specifier, evaluate(labels, value, location)?))
                })
                .collect::<Result<Vec<_>, _>>()?;

            compile_instruction(mnemonic, &arguments).map_err(|source| {
                MemoryFillError::InstructionCompilation {
                    location: location.clone(),
                    source,
                }
            })
        }
    }
}

/// Fill the memory image, following the layout
#[tracing::instrument(skip(layout))]
pub(crate) fn fill_memory(layout: &Layout) -> Result<Vec<Word>, MemoryFillError> {
    debug!(
        placements = layout.placements.len(),
        labels = ?layout.labels,
        "Filling memory"
    );

    let mut memory = Vec::with_capacity(layout.size);
    for placement in &layout.placements {
        let words = compile_placement(&layout.labels, placement)?;
        trace!(address = memory.len(), ?words, "Filling cells");
        memory.extend(words);
    }

    Ok(memory)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn compile_instruction_test() {
        assert_eq!(
            compile_instruction("add", &[(Some("P"), 4), (None, 3), (Some("R"), -1)]),
            Ok(vec![21_001, 4, 3, -1])
        );
        assert_eq!(compile_instruction("in", &[(Some("R"), 0)]), Ok(vec![203, 0]));
        assert_eq!(compile_instruction("out", &[(None, 7)]), Ok(vec![104, 7]));
        assert_eq!(compile_instruction("arb", &[(None, 7)]), Ok(vec![109, 7]));
        assert_eq!(compile_instruction("halt", &[]), Ok(vec![99]));
    }

    #[test]
    fn compile_instruction_error_test() {
        assert_eq!(
            compile_instruction("jmp", &[(None, 1)]),
            Err(InstructionCompilationError::UnknownMnemonic(String::from(
                "jmp"
            )))
        );
        assert_eq!(
            compile_instruction("jz", &[(None, 1)]),
            Err(InstructionCompilationError::InvalidArgumentNumber {
                opcode: Opcode::Jz,
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            compile_instruction("out", &[(Some("X"), 1)]),
            Err(InstructionCompilationError::InvalidModeSpecifier(
                String::from("X")
            ))
        );
        assert_eq!(
            compile_instruction("eq", &[(None, 1), (None, 2), (None, 3)]),
            Err(InstructionCompilationError::ImmediateWrite(Opcode::Eq))
        );
        assert_eq!(
            compile_instruction("in", &[(None, 3)]),
            Err(InstructionCompilationError::ImmediateWrite(Opcode::In))
        );
    }
}
