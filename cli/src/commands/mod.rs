use std::process::exit;

use anyhow::Context;
use camino::Utf8Path;
use clap::Parser;
use intcode::compiler::{AssembleError, Assembly};
use intcode::{assemble, parse};
use tracing::{debug, error, info};

mod amplify;
mod assemble;
mod completion;
mod debug;
mod network;
mod run;

#[derive(Parser, Debug)]
pub enum Subcommand {
    /// Run a program
    Run(self::run::RunOpt),

    /// Assemble a source file to a program image
    Assemble(self::assemble::AssembleOpt),

    /// Run a program as a chain of amplifiers
    Amplify(self::amplify::AmplifyOpt),

    /// Run a program on a network of machines
    Network(self::network::NetworkOpt),

    /// Run a program in the interactive debugger
    Debug(self::debug::DebugOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Self::Run(opt) => opt.exec(),
            Self::Assemble(opt) => opt.exec(),
            Self::Amplify(opt) => opt.exec(),
            Self::Network(opt) => opt.exec(),
            Self::Debug(opt) => opt.exec(),
            Self::Completion(opt) => opt.exec(),
        }
    }
}

/// Read a program from a file, either as a program image or as an assembler
/// source.
///
/// Syntax and compilation errors are reported with the offending part of the
/// source, and end the process.
pub(crate) fn load(path: &Utf8Path, assembly: bool) -> anyhow::Result<Assembly> {
    info!(%path, "Reading program");
    let source =
        std::fs::read_to_string(path).with_context(|| format!("could not read {path}"))?;

    if !assembly {
        debug!("Parsing program image");
        return match parse(&source) {
            Ok(words) => Ok(Assembly {
                words,
                ..Assembly::default()
            }),
            Err(e) => {
                let report = miette::Report::new(e)
                    .with_source_code(miette::NamedSource::new(path, source));
                eprintln!("{report:?}");
                exit(1);
            }
        };
    }

    debug!("Assembling program");
    match assemble(&source) {
        Ok(assembly) => {
            debug!(words = assembly.words.len(), labels = assembly.labels.len(), "Assembled");
            Ok(assembly)
        }

        Err(AssembleError::Syntax(e)) => {
            let report = miette::Report::new(e)
                .with_source_code(miette::NamedSource::new(path, source));
            eprintln!("{report:?}");
            exit(1);
        }

        Err(AssembleError::Compilation(e)) => {
            let mut last_error = &e as &dyn std::error::Error;
            for error in anyhow::Chain::new(&e) {
                error!("{}", error);
                last_error = error;
            }

            let msg = format!("{last_error}");
            let labels = vec![miette::LabeledSpan::at(e.location().clone(), msg)];
            let report = miette::miette!(labels = labels, "Failed to compile program")
                .with_source_code(miette::NamedSource::new(path, source));
            eprintln!("{report:?}");
            exit(1);
        }
    }
}
