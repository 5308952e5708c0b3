use std::collections::VecDeque;

use parse_display::Display;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::constants::{Address, Word};
use crate::parser::SyntaxError;

mod arguments;
mod exception;
mod instructions;
mod memory;
mod registers;

pub use self::arguments::Mode;
pub use self::exception::Exception;
pub use self::instructions::{decode, disassemble, Disassembly, Instruction, Opcode};
pub use self::memory::{to_address, Memory, MemoryError};
pub use self::registers::Registers;

use self::instructions::Flow;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("fault at address {address}: {exception}")]
    Fault {
        address: Address,
        #[source]
        exception: Exception,
    },

    #[error("machine is halted")]
    Halted,
}

impl MachineError {
    /// The exception which stopped the machine, if any
    #[must_use]
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            Self::Fault { exception, .. } => Some(exception),
            Self::Halted => None,
        }
    }
}

type Result<T> = std::result::Result<T, MachineError>;

/// Execution state of a machine
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
pub enum Status {
    /// Ready to execute the next instruction
    #[default]
    #[display("running")]
    Running,

    /// Blocked on an `in` instruction with an empty input queue
    #[display("suspended")]
    Suspended,

    /// Executed a `halt` instruction
    #[display("halted")]
    Halted,

    /// Stopped on an exception
    #[display("faulted")]
    Faulted,
}

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An instruction was executed
    Continue,

    /// The next instruction needs an input which is not there yet
    Suspended,

    /// The machine stopped
    Halted,
}

#[derive(Default, Clone)]
pub struct Machine {
    pub registers: Registers,
    pub memory: Memory,
    pub cycles: usize,
    pub(crate) input: VecDeque<Word>,
    pub(crate) output: VecDeque<Word>,
    status: Status,
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Machine {{ status: {}, registers: {:?}, memory: [{} cells] }}",
            self.status,
            self.registers,
            self.memory.len()
        )
    }
}

impl From<Vec<Word>> for Machine {
    fn from(image: Vec<Word>) -> Self {
        Self {
            memory: image.into(),
            ..Default::default()
        }
    }
}

impl std::str::FromStr for Machine {
    type Err = SyntaxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        crate::parser::parse(s).map(Self::from)
    }
}

impl Machine {
    /// Build a machine from an initial memory image
    #[must_use]
    pub fn new(image: &[Word]) -> Self {
        Self {
            memory: image.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether the machine stopped for good, normally or not
    #[must_use]
    pub fn is_halted(&self) -> bool {
        matches!(self.status, Status::Halted | Status::Faulted)
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.status == Status::Suspended
    }

    /// Values waiting to be read by `in` instructions
    #[must_use]
    pub fn pending_input(&self) -> &VecDeque<Word> {
        &self.input
    }

    /// Queue a value for the next `in` instruction
    pub fn push_input(&mut self, value: Word) {
        self.input.push_back(value);
    }

    /// Values written since the output was last drained
    #[must_use]
    pub fn pending_output(&self) -> &VecDeque<Word> {
        &self.output
    }

    /// Drain the output queue
    pub fn take_output(&mut self) -> VecDeque<Word> {
        std::mem::take(&mut self.output)
    }

    /// Replace the input queue and run until the machine halts or suspends.
    ///
    /// Returns the values written during this call only.
    ///
    /// # Errors
    ///
    /// Fails if the machine was already halted or if an instruction raised an
    /// exception. In the latter case the machine is left faulted and the values
    /// written before the exception stay available through [`Self::take_output`].
    #[tracing::instrument(skip_all)]
    pub fn run<I: IntoIterator<Item = Word>>(&mut self, input: I) -> Result<VecDeque<Word>> {
        self.input = input.into_iter().collect();
        self.output.clear();
        self.drive()
    }

    /// Append values to the input queue and resume execution.
    ///
    /// Behaves like [`Self::run`], except that values still pending from
    /// previous calls are kept in front of the new ones.
    ///
    /// # Errors
    ///
    /// See [`Self::run`].
    #[tracing::instrument(skip_all)]
    pub fn resume_with<I: IntoIterator<Item = Word>>(
        &mut self,
        input: I,
    ) -> Result<VecDeque<Word>> {
        self.input.extend(input);
        self.output.clear();
        self.drive()
    }

    fn drive(&mut self) -> Result<VecDeque<Word>> {
        if self.is_halted() {
            return Err(MachineError::Halted);
        }

        debug!(input = ?self.input, registers = %self.registers, "Resuming machine");
        loop {
            match self.step()? {
                Step::Continue => {}
                Step::Suspended | Step::Halted => break,
            }
        }
        debug!(output = ?self.output, status = %self.status, "Machine yielded");

        Ok(self.take_output())
    }

    /// Fetch, decode and execute a single instruction
    ///
    /// # Errors
    ///
    /// Fails if the machine was already halted or if the instruction raised an
    /// exception, which leaves the machine faulted.
    #[tracing::instrument(skip(self), level = "trace", fields(ip = self.registers.ip))]
    pub fn step(&mut self) -> Result<Step> {
        if self.is_halted() {
            return Err(MachineError::Halted);
        }

        let address = self.registers.ip;
        if address >= self.memory.len() {
            debug!(address, "Instruction pointer ran past the end of memory");
            self.status = Status::Halted;
            return Ok(Step::Halted);
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(disassembly) = disassemble(&self.memory, address) {
                debug!(address, "Executing instruction \"{}\"", disassembly);
            }
        }

        let flow = match decode(self.memory.get(address)).and_then(|i| i.execute(self)) {
            Ok(flow) => flow,
            Err(exception) => {
                warn!(address, %exception, "Machine faulted");
                self.status = Status::Faulted;
                return Err(MachineError::Fault { address, exception });
            }
        };

        let step = match flow {
            Flow::Advance(length) => {
                self.registers.advance(length);
                Step::Continue
            }

            Flow::Jump(target) => {
                self.registers.ip = target;
                Step::Continue
            }

            Flow::Suspend => {
                trace!(address, "Suspending on input");
                self.status = Status::Suspended;
                return Ok(Step::Suspended);
            }

            Flow::Halt => {
                debug!(address, "Halting");
                Step::Halted
            }
        };

        self.status = if step == Step::Halted {
            Status::Halted
        } else {
            Status::Running
        };
        self.cycles += 1;
        Ok(step)
    }

    /// Effective address of a parameter of the current instruction
    fn parameter_address(
        &mut self,
        instruction: &Instruction,
        index: usize,
    ) -> std::result::Result<Address, Exception> {
        let slot = self.registers.ip + 1 + index;
        instruction.modes()[index].resolve(&mut self.memory, slot, self.registers.relative_base)
    }

    /// Read the operand of a parameter of the current instruction
    pub(crate) fn load(
        &mut self,
        instruction: &Instruction,
        index: usize,
    ) -> std::result::Result<Word, Exception> {
        let address = self.parameter_address(instruction, index)?;
        Ok(self.memory.read(address)?)
    }

    /// Write the operand of a parameter of the current instruction
    pub(crate) fn store(
        &mut self,
        instruction: &Instruction,
        index: usize,
        value: Word,
    ) -> std::result::Result<(), Exception> {
        if instruction.modes()[index] == Mode::Immediate {
            return Err(Exception::ImmediateWrite {
                instruction: instruction.encode(),
            });
        }

        let address = self.parameter_address(instruction, index)?;
        trace!(address, value, "Storing value");
        self.memory.write(address, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn add_test() {
        let mut machine = Machine::new(&[1, 0, 0, 0, 99]);
        let output = machine.run([]).unwrap();

        assert!(output.is_empty());
        assert_eq!(machine.status(), Status::Halted);
        assert_eq!(machine.memory.as_slice(), &[2, 0, 0, 0, 99]);
        assert_eq!(machine.cycles, 2);
    }

    #[test]
    fn step_test() {
        let mut machine = Machine::new(&[1002, 4, 3, 4, 33]);

        assert_eq!(machine.registers.ip, 0);
        assert_eq!(machine.step(), Ok(Step::Continue));
        assert_eq!(machine.registers.ip, 4);
        assert_eq!(machine.memory.get(4), 99);

        assert_eq!(machine.step(), Ok(Step::Halted));
        assert_eq!(machine.registers.ip, 4);
        assert!(machine.is_halted());
        assert_eq!(machine.step(), Err(MachineError::Halted));
    }

    #[test]
    fn echo_test() {
        let mut machine = Machine::new(&[3, 0, 4, 0, 99]);
        let output = machine.run([42]).unwrap();
        assert_eq!(output, [42]);
        assert!(machine.is_halted());
    }

    #[test]
    fn suspend_test() {
        let mut machine = Machine::new(&[3, 0, 4, 0, 99]);

        let output = machine.run([]).unwrap();
        assert!(output.is_empty());
        assert!(machine.is_suspended());
        assert_eq!(machine.registers.ip, 0);
        assert_eq!(machine.memory.as_slice(), &[3, 0, 4, 0, 99]);
        assert_eq!(machine.cycles, 0);

        let output = machine.run([7]).unwrap();
        assert_eq!(output, [7]);
        assert!(machine.is_halted());
        assert_eq!(machine.cycles, 3);
    }

    #[test]
    fn run_replaces_input_test() {
        // Reads two values and prints their sum
        let mut machine = Machine::new(&[3, 11, 3, 12, 1, 11, 12, 13, 4, 13, 99, 0, 0, 0]);

        assert!(machine.run([1]).unwrap().is_empty());
        assert!(machine.is_suspended());

        // The first value was consumed, the new queue replaces what was left
        assert_eq!(machine.run([2]).unwrap(), [3]);
    }

    #[test]
    fn resume_with_appends_input_test() {
        let mut machine = Machine::new(&[3, 11, 3, 12, 1, 11, 12, 13, 4, 13, 99, 0, 0, 0]);
        machine.push_input(40);
        assert_eq!(machine.pending_input(), &[40]);
        assert_eq!(machine.resume_with([2]).unwrap(), [42]);
    }

    #[test]
    fn output_is_per_call_test() {
        // out 1, in, out 2, halt
        let mut machine = Machine::new(&[104, 1, 3, 9, 104, 2, 99, 0, 0, 0]);
        assert_eq!(machine.run([]).unwrap(), [1]);
        assert_eq!(machine.run([5]).unwrap(), [2]);
        assert_eq!(machine.memory.get(9), 5);
    }

    #[test]
    fn invalid_opcode_test() {
        let mut machine = Machine::new(&[104, 7, 42, 99]);
        let err = machine.run([]).unwrap_err();
        assert_eq!(
            err,
            MachineError::Fault {
                address: 2,
                exception: Exception::InvalidOpcode(42)
            }
        );
        assert_eq!(machine.status(), Status::Faulted);
        assert!(machine.is_halted());

        // Output produced before the fault is kept
        assert_eq!(machine.take_output(), [7]);
        assert_eq!(machine.run([]), Err(MachineError::Halted));
    }

    #[test]
    fn negative_address_test() {
        let mut machine = Machine::new(&[1, -1, 0, 0, 99]);
        let err = machine.run([]).unwrap_err();
        assert_eq!(
            err.exception(),
            Some(&Exception::InvalidMemoryAccess(MemoryError::InvalidAddress(
                -1
            )))
        );
    }

    #[test]
    fn immediate_write_test() {
        let mut machine = Machine::new(&[11_101, 1, 1, 3, 99]);
        let err = machine.run([]).unwrap_err();
        assert_eq!(
            err.exception(),
            Some(&Exception::ImmediateWrite {
                instruction: 11_101
            })
        );
    }

    #[test]
    fn run_past_end_test() {
        let mut machine = Machine::new(&[1101, 2, 5, 3]);
        assert!(machine.run([]).unwrap().is_empty());
        assert!(machine.is_halted());
        assert_eq!(machine.memory.as_slice(), &[1101, 2, 5, 7]);
    }

    #[test]
    fn from_str_test() {
        let machine: Machine = "1,9,10,3,\n2,3,11,0,99,30,40,50\n".parse().unwrap();
        assert_eq!(machine.memory.len(), 12);
        assert!("1,,2".parse::<Machine>().is_err());
    }
}
