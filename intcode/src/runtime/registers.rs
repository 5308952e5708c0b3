use parse_display::Display;

use crate::constants::{Address, Word};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
#[display("%ip = {ip}, %rb = {relative_base}")]
pub struct Registers {
    /// Instruction pointer
    pub ip: Address,

    /// Relative base, added to the operands of relative-mode parameters
    pub relative_base: Word,
}

impl Registers {
    /// Move the instruction pointer forward
    pub(crate) fn advance(&mut self, length: usize) {
        self.ip += length;
    }

    /// Adjust the relative base by an offset
    pub(crate) fn offset_base(&mut self, offset: Word) {
        self.relative_base = self.relative_base.wrapping_add(offset);
    }
}
