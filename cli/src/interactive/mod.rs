//! This module implements the TTY interactive debugger.
//!
//! It is mainly based on two crates:
//!   - rustyline, to handle the line-editting logic
//!   - clap, to handle the parsing of those interactive commands
//!
//! Using Parser to do this is a bit of a hack, and requires some weird options
//! to have it working but works nonetheless.

use std::collections::{BTreeMap, HashSet};

use clap::Parser;
use intcode::constants::{self as C, Word};
use intcode::runtime::{disassemble, Step};
use intcode::Machine;
use rustyline::history::DefaultHistory;
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};

mod helper;
mod parse;
use self::helper::RunHelper;

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command."#;

#[derive(Parser, Clone, Debug)]
#[clap(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
    allow_negative_numbers = true,
)]
/// Debugger commands
enum Command {
    /// Execute the next instructions
    #[command(alias = "s")]
    Step {
        /// Number of steps to execute
        #[clap(value_parser, default_value = "1")]
        number: u64,
    },

    /// Exit the debugger
    Exit,

    /// Show the state of registers
    Registers {
        #[clap(value_parser)]
        register: Option<parse::Register>,
    },

    /// Show the content of a block in memory
    Memory {
        /// The address to show. Can be a number, a `*label`, or a register with
        /// an optional offset (`%rb+3`).
        #[clap(value_parser)]
        address: parse::Address,

        /// Number of memory cells to show.
        #[clap(value_parser, default_value = "1")]
        number: usize,
    },

    /// Set a value in memory
    Set {
        /// The address to set
        #[clap(value_parser)]
        address: parse::Address,

        /// The value to set
        #[clap(value_parser)]
        value: Word,
    },

    /// Queue values for the next input instructions
    Input {
        #[clap(value_parser, required = true)]
        values: Vec<Word>,
    },

    /// Show and drain the values written by the program
    Output,

    /// Show the next few instructions
    List {
        /// Number of instructions to show.
        #[clap(value_parser, default_value = "10")]
        number: usize,
    },

    /// Set a breakpoint
    Break {
        /// The address where to set the breakpoint
        #[clap(value_parser)]
        address: parse::Address,
    },

    /// Remove a breakpoint
    Unbreak {
        /// The address of the breakpoint to remove
        #[clap(value_parser)]
        address: parse::Address,
    },

    /// Continue the program until the next breakpoint, input request or halt
    Continue,

    /// Show informations about the current debugging session
    Info {
        #[clap(subcommand)]
        sub: Option<InfoCommand>,
    },
}

#[derive(Parser, Clone, Debug)]
enum InfoCommand {
    /// List active breakpoints
    Breakpoints,

    /// List program labels
    Labels,

    /// Show the number of instructions executed since the beginning of the program
    Cycles,
}

/// Holds informations about a debugging session
#[derive(Debug, Default)]
struct Session {
    /// List of active breakpoints
    breakpoints: HashSet<C::Address>,

    /// Map of labels in program
    labels: BTreeMap<String, C::Address>,

    /// Current address for the `list` command
    list_address: Option<C::Address>,
}

impl Session {
    fn new(labels: BTreeMap<String, C::Address>) -> Session {
        Session {
            labels,
            ..Default::default()
        }
    }

    /// Add a breakpoint
    fn add_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.insert(address) {
            info!(address, "Setting a breakpoint");
        } else {
            warn!(address, "A breakpoint was already set");
        }
    }

    /// Remove a breakpoint
    fn remove_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.remove(&address) {
            info!(address, "Removing breakpoint");
        } else {
            warn!(address, "No breakpoint was set here");
        }
    }

    /// Checks if the given address has a breakpoint
    fn has_breakpoint(&self, address: C::Address) -> bool {
        self.breakpoints.contains(&address)
    }

    /// Reset the `list` command (after running an instruction)
    fn reset_list(&mut self) {
        self.list_address = None;
    }

    /// Display the list of breakpoints
    fn display_breakpoints(&self, machine: &Machine) {
        match self.breakpoints.len() {
            0 => info!("No breakpoints"),
            1 => info!("1 breakpoint:"),
            x => info!("{} breakpoints:", x),
        }

        // We want them to be sorted by address for readability
        let mut bp: Vec<_> = self.breakpoints.iter().copied().collect();
        bp.sort_unstable();
        for addr in bp {
            self.display_instruction(machine, addr);
        }
    }

    /// Display an instruction at specified address, and returns its length
    fn display_instruction(&self, machine: &Machine, address: C::Address) -> usize {
        // First, display the labels on the line if any
        self.labels
            .iter()
            .filter(|(_, &a)| a == address)
            .for_each(|(label, _)| info!("          {}:", label));

        // Then compute what is supposed to show in the gutter
        let is_current_line = machine.registers.ip == address;
        let has_breakpoint = self.has_breakpoint(address);

        let gutter = match (has_breakpoint, is_current_line) {
            (true, true) => "B>",
            (true, false) => "B ",
            (false, true) => " >",
            (false, false) => "  ",
        };

        // Cells which do not hold a valid instruction are shown as raw data
        if let Ok(disassembly) = disassemble(&machine.memory, address) {
            info!("{:<2} {:>5}    {}", gutter, address, disassembly);
            disassembly.instruction.length()
        } else {
            let word = machine.memory.get(address);
            info!("{:<2} {:>5}    .word {}", gutter, address, word);
            1
        }
    }

    /// Display the next `number` instructions, continuing the previous listing
    fn list(&mut self, machine: &Machine, number: usize) {
        let mut address = self.list_address.unwrap_or(machine.registers.ip);
        for _ in 0..number {
            address += self.display_instruction(machine, address);
        }
        self.list_address = Some(address);
    }

    /// Display the list of labels
    fn display_labels(&self) {
        match self.labels.len() {
            0 => info!("No labels"),
            1 => info!("1 label:"),
            x => info!("{} labels:", x),
        }

        for (label, &addr) in &self.labels {
            info!("  {} => {}", label, addr);
        }
    }

    /// Display the number of instructions executed
    fn display_cycles(machine: &Machine) {
        info!("Cycles: {}", machine.cycles);
    }
}

/// Execute one instruction, logging why the machine stopped if it did.
///
/// Returns `false` if execution should stop there.
fn step(machine: &mut Machine, halted: &mut bool) -> bool {
    match machine.step() {
        Ok(Step::Continue) => true,
        Ok(Step::Suspended) => {
            info!(
                address = machine.registers.ip,
                "Waiting for input. Use \"input\" to provide some"
            );
            false
        }
        Ok(Step::Halted) => {
            info!(cycles = machine.cycles, "Program halted");
            *halted = true;
            false
        }
        Err(e) => {
            warn!(error = &e as &dyn std::error::Error, "Halted");
            *halted = true;
            false
        }
    }
}

#[allow(clippy::too_many_lines)]
pub(crate) fn run_interactive(
    machine: &mut Machine,
    labels: BTreeMap<String, C::Address>,
) -> anyhow::Result<()> {
    info!("Running in interactive mode. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let h: RunHelper<Command> = RunHelper::new(labels.keys().cloned());
    let mut session = Session::new(labels);

    let mut rl: Editor<RunHelper<Command>, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(h));

    let mut last_command: Option<Command> = None;
    let mut halted = machine.is_halted();

    'read: loop {
        // A macro to unwrap an error, log it and continue the loop
        macro_rules! warn_and_continue {
            ($e:expr) => {
                match $e {
                    Ok(o) => o,
                    Err(e) => {
                        tracing::warn!(error = %e);
                        continue 'read;
                    }
                }
            };
        }

        let Ok(readline) = rl.readline(">> ") else {
            info!("EOF, exitting");
            return Ok(());
        };

        let command = if readline.is_empty() {
            if let Some(command) = &last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                continue 'read;
            }
        } else {
            let Ok(words) = shell_words::split(readline.as_str()) else {
                warn!("Invalid input");
                continue 'read;
            };

            let command = warn_and_continue!(Command::try_parse_from(words));
            last_command = Some(command.clone());
            command
        };

        debug!("Executing command: {:?}", command);

        match (command, halted) {
            (Command::Exit, _) => break,
            (Command::Step { number }, false) => {
                session.reset_list();

                for _ in 0..number {
                    if !step(machine, &mut halted) {
                        continue 'read;
                    }
                }
            }

            (Command::Registers { register }, _) => {
                if let Some(register) = register {
                    info!("Register {} = {}", register, register.get(machine));
                } else {
                    info!("Registers: {}", machine.registers);
                }
            }

            (Command::Memory { address, number }, _) => {
                let address = warn_and_continue!(address.evaluate(machine, &session.labels));
                for address in address..address.saturating_add(number) {
                    info!(address, value = machine.memory.get(address));
                }
            }

            (Command::Set { address, value }, false) => {
                let address = warn_and_continue!(address.evaluate(machine, &session.labels));
                info!("Setting memory at address {address} to {value}");
                warn_and_continue!(machine.memory.write(address, value));
            }

            (Command::Input { values }, false) => {
                for value in values {
                    machine.push_input(value);
                }
                info!(input = ?machine.pending_input(), "Input queued");
            }

            (Command::Output, _) => {
                let output = machine.take_output();
                if output.is_empty() {
                    info!("No output");
                }
                for value in output {
                    info!(value, "Output");
                }
            }

            (Command::List { number }, _) => {
                session.list(machine, number);
            }

            (Command::Break { address }, false) => {
                let address = warn_and_continue!(address.evaluate(machine, &session.labels));
                session.add_breakpoint(address);
            }

            (Command::Unbreak { address }, false) => {
                let address = warn_and_continue!(address.evaluate(machine, &session.labels));
                session.remove_breakpoint(address);
            }

            (Command::Continue, false) => {
                session.reset_list();

                while step(machine, &mut halted) {
                    if session.has_breakpoint(machine.registers.ip) {
                        info!(address = machine.registers.ip, "Stopped at a breakpoint");
                        break;
                    }
                }
            }

            (Command::Info { sub }, _) => match sub {
                Some(InfoCommand::Breakpoints) => {
                    session.display_breakpoints(machine);
                }
                Some(InfoCommand::Labels) => {
                    session.display_labels();
                }
                Some(InfoCommand::Cycles) => {
                    Session::display_cycles(machine);
                }
                None => {
                    session.display_breakpoints(machine);
                    info!("–");
                    session.display_labels();
                    info!("–");
                    Session::display_cycles(machine);
                }
            },

            (_, true) => {
                // Machine is halted but the user asked to continue, we just warn
                warn!("Machine is halted. Use \"exit\" to quit");
            }
        }
    }

    Ok(())
}
