use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use intcode::constants::Word;
use intcode::Machine;

use crate::interactive::run_interactive;

#[derive(Parser, Debug)]
#[clap(allow_negative_numbers = true)]
pub struct DebugOpt {
    /// Program file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// The file is an assembler source, not a program image. This makes its
    /// labels available in the debugger
    #[clap(short, long, action = ArgAction::SetTrue)]
    assembly: bool,

    /// Values to queue before starting. Can be used multiple times.
    #[clap(short = 'i', long = "input", value_parser, value_delimiter = ',')]
    inputs: Vec<Word>,
}

impl DebugOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let assembly = super::load(&self.input, self.assembly)?;
        let mut machine = Machine::from(assembly.words);
        for value in self.inputs {
            machine.push_input(value);
        }

        run_interactive(&mut machine, assembly.labels)
    }
}
