use std::io::Write;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::info;

#[derive(Parser, Debug)]
pub struct AssembleOpt {
    /// Assembler source file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Where to write the program image. Defaults to the standard output
    #[clap(short, long, value_parser, value_hint = ValueHint::FilePath)]
    output: Option<Utf8PathBuf>,
}

impl AssembleOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let assembly = super::load(&self.input, true)?;

        for (label, address) in &assembly.labels {
            info!(address, "Label {label}");
        }

        if let Some(path) = self.output {
            std::fs::write(&path, format!("{assembly}\n"))
                .with_context(|| format!("could not write {path}"))?;
            info!(%path, words = assembly.words.len(), "Program written");
        } else {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{assembly}")?;
        }

        Ok(())
    }
}
