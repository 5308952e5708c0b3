use thiserror::Error;

use crate::constants::Word;

use super::memory::MemoryError;

/// Fatal conditions raised while executing an instruction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Exception {
    #[error("invalid opcode {0}")]
    InvalidOpcode(Word),

    #[error("invalid addressing mode {mode} in instruction {instruction}")]
    InvalidMode { instruction: Word, mode: Word },

    #[error("immediate mode used as a write target in instruction {instruction}")]
    ImmediateWrite { instruction: Word },

    #[error("invalid memory access ({0})")]
    InvalidMemoryAccess(#[from] MemoryError),

    #[error("invalid jump target {0}")]
    InvalidJumpTarget(Word),
}

impl Exception {
    /// Numeric code of the exception
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Exception::InvalidOpcode(_) => 1,
            Exception::InvalidMode { .. } => 2,
            Exception::ImmediateWrite { .. } => 3,
            Exception::InvalidMemoryAccess(_) => 4,
            Exception::InvalidJumpTarget(_) => 5,
        }
    }
}
