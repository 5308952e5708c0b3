use std::fmt;

use parse_display::{Display, FromStr};
use tracing::debug;

use crate::constants::{Address, Word, MAX_PARAMETERS};

use super::{arguments::Mode, exception::Exception, memory::Memory, Machine};

/// The closed set of operations understood by the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr)]
pub enum Opcode {
    /// Add two values
    #[display("add")]
    Add,

    /// Multiply two values
    #[display("mul")]
    Mul,

    /// Read a value from the input queue
    #[display("in")]
    In,

    /// Write a value to the output queue
    #[display("out")]
    Out,

    /// Jump if the value is not zero
    #[display("jnz")]
    Jnz,

    /// Jump if the value is zero
    #[display("jz")]
    Jz,

    /// Store 1 if the first value is strictly less than the second, 0 otherwise
    #[display("lt")]
    Lt,

    /// Store 1 if both values are equal, 0 otherwise
    #[display("eq")]
    Eq,

    /// Adjust the relative base
    #[display("cr")]
    Cr,

    /// Stop the machine
    #[display("halt")]
    Halt,
}

impl Opcode {
    /// Every opcode, in numeric order
    pub const ALL: [Opcode; 10] = [
        Opcode::Add,
        Opcode::Mul,
        Opcode::In,
        Opcode::Out,
        Opcode::Jnz,
        Opcode::Jz,
        Opcode::Lt,
        Opcode::Eq,
        Opcode::Cr,
        Opcode::Halt,
    ];

    /// Lookup an opcode from the two low decimal digits of an instruction
    #[must_use]
    pub const fn from_code(code: Word) -> Option<Self> {
        let opcode = match code {
            1 => Opcode::Add,
            2 => Opcode::Mul,
            3 => Opcode::In,
            4 => Opcode::Out,
            5 => Opcode::Jnz,
            6 => Opcode::Jz,
            7 => Opcode::Lt,
            8 => Opcode::Eq,
            9 => Opcode::Cr,
            99 => Opcode::Halt,
            _ => return None,
        };
        Some(opcode)
    }

    #[must_use]
    pub const fn code(self) -> Word {
        match self {
            Opcode::Add => 1,
            Opcode::Mul => 2,
            Opcode::In => 3,
            Opcode::Out => 4,
            Opcode::Jnz => 5,
            Opcode::Jz => 6,
            Opcode::Lt => 7,
            Opcode::Eq => 8,
            Opcode::Cr => 9,
            Opcode::Halt => 99,
        }
    }

    /// Number of parameters following the instruction word
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::Lt | Opcode::Eq => 3,
            Opcode::Jnz | Opcode::Jz => 2,
            Opcode::In | Opcode::Out | Opcode::Cr => 1,
            Opcode::Halt => 0,
        }
    }

    /// Index of the parameter written by the instruction, if any
    #[must_use]
    pub const fn destination(self) -> Option<usize> {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::Lt | Opcode::Eq => Some(2),
            Opcode::In => Some(0),
            Opcode::Out | Opcode::Jnz | Opcode::Jz | Opcode::Cr | Opcode::Halt => None,
        }
    }
}

/// A decoded instruction word: the opcode and one addressing mode per parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    modes: [Mode; MAX_PARAMETERS],
}

/// What the machine should do once an instruction executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Move the instruction pointer past the instruction
    Advance(usize),

    /// Set the instruction pointer to an absolute address
    Jump(Address),

    /// Input queue is empty, stay on this instruction
    Suspend,

    /// Stop for good
    Halt,
}

/// Decode an instruction word
///
/// The two low decimal digits give the opcode, the following digits give the
/// addressing mode of each parameter, least significant first. Missing digits
/// mean position mode, digits past the last parameter are ignored.
///
/// # Errors
///
/// Fails if the opcode is unknown or if a mode digit is invalid.
pub fn decode(word: Word) -> Result<Instruction, Exception> {
    let opcode = Opcode::from_code(word % 100).ok_or(Exception::InvalidOpcode(word))?;

    let mut modes = [Mode::Position; MAX_PARAMETERS];
    let mut digits = word / 100;
    for mode in modes.iter_mut().take(opcode.arity()) {
        *mode = Mode::from_digit(digits % 10, word)?;
        digits /= 10;
    }

    Ok(Instruction { opcode, modes })
}

impl Instruction {
    #[must_use]
    pub fn new(opcode: Opcode, modes: &[Mode]) -> Self {
        let mut all = [Mode::Position; MAX_PARAMETERS];
        for (slot, mode) in all.iter_mut().zip(modes) {
            *slot = *mode;
        }
        Self { opcode, modes: all }
    }

    /// Addressing modes of the parameters
    #[must_use]
    pub fn modes(&self) -> &[Mode] {
        &self.modes[..self.opcode.arity()]
    }

    /// Number of words taken by the instruction, parameters included
    #[must_use]
    pub const fn length(&self) -> usize {
        1 + self.opcode.arity()
    }

    /// Encode the instruction back to a word
    #[must_use]
    pub fn encode(&self) -> Word {
        self.modes()
            .iter()
            .rev()
            .fold(0, |acc, mode| acc * 10 + mode.digit())
            * 100
            + self.opcode.code()
    }

    /// Execute the instruction on a machine
    ///
    /// The instruction must be the one at the machine's instruction pointer.
    #[tracing::instrument(skip(machine), level = "trace")]
    pub(crate) fn execute(&self, machine: &mut Machine) -> Result<Flow, Exception> {
        use Opcode::{Add, Cr, Eq, Halt, In, Jnz, Jz, Lt, Mul, Out};

        let flow = match self.opcode {
            Add => {
                let a = machine.load(self, 0)?;
                let b = machine.load(self, 1)?;
                let res = a.wrapping_add(b);
                debug!("{} + {} = {}", a, b, res);
                machine.store(self, 2, res)?;
                Flow::Advance(self.length())
            }

            Mul => {
                let a = machine.load(self, 0)?;
                let b = machine.load(self, 1)?;
                let res = a.wrapping_mul(b);
                debug!("{} * {} = {}", a, b, res);
                machine.store(self, 2, res)?;
                Flow::Advance(self.length())
            }

            In => {
                // Suspending must leave the memory untouched
                if let Some(&value) = machine.input.front() {
                    machine.store(self, 0, value)?;
                    machine.input.pop_front();
                    debug!("Read input {}", value);
                    Flow::Advance(self.length())
                } else {
                    debug!("Input queue is empty");
                    Flow::Suspend
                }
            }

            Out => {
                let value = machine.load(self, 0)?;
                debug!("Write output {}", value);
                machine.output.push_back(value);
                Flow::Advance(self.length())
            }

            Jnz | Jz => {
                let value = machine.load(self, 0)?;
                if (value != 0) == (self.opcode == Jnz) {
                    let target = machine.load(self, 1)?;
                    let target =
                        Address::try_from(target).map_err(|_| Exception::InvalidJumpTarget(target))?;
                    debug!("Jumping to address {}", target);
                    Flow::Jump(target)
                } else {
                    Flow::Advance(self.length())
                }
            }

            Lt => {
                let a = machine.load(self, 0)?;
                let b = machine.load(self, 1)?;
                debug!("{} < {} = {}", a, b, a < b);
                machine.store(self, 2, Word::from(a < b))?;
                Flow::Advance(self.length())
            }

            Eq => {
                let a = machine.load(self, 0)?;
                let b = machine.load(self, 1)?;
                debug!("{} == {} = {}", a, b, a == b);
                machine.store(self, 2, Word::from(a == b))?;
                Flow::Advance(self.length())
            }

            Cr => {
                let offset = machine.load(self, 0)?;
                machine.registers.offset_base(offset);
                debug!(
                    offset,
                    base = machine.registers.relative_base,
                    "Adjusted relative base"
                );
                Flow::Advance(self.length())
            }

            Halt => Flow::Halt,
        };

        Ok(flow)
    }
}

/// An instruction together with its raw parameters, as found in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    pub instruction: Instruction,
    pub parameters: Vec<Word>,
}

/// Decode the instruction at an address without touching the memory
///
/// # Errors
///
/// Fails if the cell does not hold a valid instruction.
pub fn disassemble(memory: &Memory, address: Address) -> Result<Disassembly, Exception> {
    let instruction = decode(memory.get(address))?;
    let parameters = (1..=instruction.opcode.arity())
        .map(|offset| memory.get(address + offset))
        .collect();
    Ok(Disassembly {
        instruction,
        parameters,
    })
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:4}", self.instruction.opcode.to_string())?;
        for (mode, parameter) in self.instruction.modes().iter().zip(&self.parameters) {
            write!(f, " {mode}{parameter}")?;
        }
        Ok(())
    }
}
