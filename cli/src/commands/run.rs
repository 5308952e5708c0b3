use std::collections::VecDeque;
use std::io::{BufRead, Write};

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use intcode::constants::Word;
use intcode::runtime::MachineError;
use intcode::Machine;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[clap(allow_negative_numbers = true)]
pub struct RunOpt {
    /// Program file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// The file is an assembler source, not a program image
    #[clap(short, long, action = ArgAction::SetTrue)]
    assembly: bool,

    /// Values to feed to the program. Can be used multiple times.
    #[clap(short = 'i', long = "input", value_parser, value_delimiter = ',')]
    inputs: Vec<Word>,

    /// Read and write text: output values are printed as ASCII characters, and
    /// input lines are fed as ASCII codes
    #[clap(long, action = ArgAction::SetTrue)]
    ascii: bool,

    /// Read more input from the terminal when the program waits for some
    #[clap(short = 'I', long, action = ArgAction::SetTrue)]
    interactive: bool,
}

/// Print output values, as numbers or as text
fn print_output(output: impl IntoIterator<Item = Word>, ascii: bool) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    for value in output {
        match u8::try_from(value) {
            Ok(byte) if ascii && byte.is_ascii() => write!(stdout, "{}", char::from(byte))?,
            _ => writeln!(stdout, "{value}")?,
        }
    }
    stdout.flush()
}

/// Split a run result into the values written and the outcome.
///
/// On a fault, the values written before it are taken from the machine.
fn drain(
    machine: &mut Machine,
    result: Result<VecDeque<Word>, MachineError>,
) -> (Vec<Word>, Result<(), MachineError>) {
    match result {
        Ok(output) => (output.into(), Ok(())),
        Err(e) => (machine.take_output().into(), Err(e)),
    }
}

/// Convert an input line to values
fn parse_input(line: &str, ascii: bool) -> anyhow::Result<Vec<Word>> {
    if ascii {
        return Ok(line
            .bytes()
            .chain(std::iter::once(b'\n'))
            .map(Word::from)
            .collect());
    }

    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Word>()
                .map_err(|e| anyhow::anyhow!("invalid input value {s:?}: {e}"))
        })
        .collect()
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let assembly = super::load(&self.input, self.assembly)?;
        let mut machine = Machine::from(assembly.words);

        info!("Running program");
        let result = machine.run(self.inputs);
        let (output, result) = drain(&mut machine, result);
        print_output(output, self.ascii)?;
        result?;

        let mut lines = std::io::stdin().lock().lines();
        while machine.is_suspended() {
            if !self.interactive {
                warn!("Program is waiting for more input, use --interactive to provide some");
                break;
            }

            let Some(line) = lines.next() else {
                warn!("End of input while the program is waiting for more");
                break;
            };

            let values = match parse_input(&line?, self.ascii) {
                Ok(values) => values,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };

            debug!(?values, "Resuming program");
            let result = machine.resume_with(values);
            let (output, result) = drain(&mut machine, result);
            print_output(output, self.ascii)?;
            result?;
        }

        info!(
            registers = %machine.registers,
            cycles = machine.cycles,
            status = %machine.status(),
            "End of program"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_input_test() {
        assert_eq!(parse_input("1, -2 3", false).unwrap(), vec![1, -2, 3]);
        assert_eq!(parse_input("", false).unwrap(), Vec::<Word>::new());
        assert_eq!(parse_input("AB", true).unwrap(), vec![65, 66, 10]);
        assert!(parse_input("1 x", false).is_err());
    }

    #[test]
    fn drain_test() {
        let mut machine = Machine::new(&[104, 1, 104, 2, 42]);
        let result = machine.run([]);
        let (output, result) = drain(&mut machine, result);
        assert_eq!(output, vec![1, 2]);
        assert!(matches!(result, Err(MachineError::Fault { address: 4, .. })));

        let mut machine = Machine::new(&[3, 0, 4, 0, 99]);
        let result = machine.run([9]);
        assert_eq!(drain(&mut machine, result), (vec![9], Ok(())));
    }
}
