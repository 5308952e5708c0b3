//! Addressing modes and operand resolution.
//!
//! Operands are resolved in two steps: first compute the effective address of
//! the parameter (which may grow the memory), then read or write the cell at
//! that address. No reference into the memory is held across a growth.

use parse_display::Display;

use crate::constants::{Address, Word};

use super::exception::Exception;
use super::memory::{to_address, Memory};

/// How an instruction parameter designates its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Mode {
    /// The parameter is the address of the operand
    #[default]
    #[display("P:")]
    Position,

    /// The parameter is the operand itself
    #[display("")]
    Immediate,

    /// The parameter is an offset from the relative base
    #[display("R:")]
    Relative,
}

impl Mode {
    /// Decode a single mode digit
    ///
    /// # Errors
    ///
    /// Fails if the digit does not name a mode. `instruction` is only used to
    /// report the error.
    pub fn from_digit(digit: Word, instruction: Word) -> Result<Self, Exception> {
        match digit {
            0 => Ok(Self::Position),
            1 => Ok(Self::Immediate),
            2 => Ok(Self::Relative),
            mode => Err(Exception::InvalidMode { instruction, mode }),
        }
    }

    /// The digit encoding this mode in an instruction word
    #[must_use]
    pub const fn digit(self) -> Word {
        match self {
            Self::Position => 0,
            Self::Immediate => 1,
            Self::Relative => 2,
        }
    }

    /// Compute the effective address of the parameter stored at `slot`
    pub(crate) fn resolve(
        self,
        memory: &mut Memory,
        slot: Address,
        relative_base: Word,
    ) -> Result<Address, Exception> {
        let address = match self {
            Self::Position => to_address(memory.read(slot)?)?,
            Self::Immediate => slot,
            Self::Relative => to_address(relative_base.wrapping_add(memory.read(slot)?))?,
        };
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::MemoryError;

    #[test]
    fn from_digit_test() {
        assert_eq!(Mode::from_digit(0, 1), Ok(Mode::Position));
        assert_eq!(Mode::from_digit(1, 1), Ok(Mode::Immediate));
        assert_eq!(Mode::from_digit(2, 1), Ok(Mode::Relative));
        assert_eq!(
            Mode::from_digit(3, 301),
            Err(Exception::InvalidMode {
                instruction: 301,
                mode: 3
            })
        );
    }

    #[test]
    fn resolve_test() {
        let mut memory = Memory::from(vec![1, 5, -3]);

        assert_eq!(Mode::Position.resolve(&mut memory, 1, 0), Ok(5));
        assert_eq!(Mode::Immediate.resolve(&mut memory, 1, 0), Ok(1));
        assert_eq!(Mode::Relative.resolve(&mut memory, 2, 10), Ok(7));
        assert_eq!(
            Mode::Relative.resolve(&mut memory, 2, 0),
            Err(Exception::InvalidMemoryAccess(MemoryError::InvalidAddress(-3)))
        );
    }

    #[test]
    fn resolve_grows_memory_test() {
        let mut memory = Memory::from(vec![1]);
        // The parameter slot itself lies past the end and reads as zero
        assert_eq!(Mode::Position.resolve(&mut memory, 4, 0), Ok(0));
        assert_eq!(memory.len(), 5);
    }
}
