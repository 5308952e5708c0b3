use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use intcode::constants::Word;
use intcode::orchestration::{max_signal, Pipeline};
use tracing::info;

#[derive(Parser, Debug)]
#[clap(allow_negative_numbers = true)]
pub struct AmplifyOpt {
    /// Program file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// The file is an assembler source, not a program image
    #[clap(short, long, action = ArgAction::SetTrue)]
    assembly: bool,

    /// Phase settings, one per amplifier
    #[clap(short, long, value_parser, value_delimiter = ',', required = true)]
    phases: Vec<Word>,

    /// Loop the output of the last amplifier back into the first one
    #[clap(short, long, action = ArgAction::SetTrue)]
    feedback: bool,

    /// Try every ordering of the phase settings and keep the best one
    #[clap(short, long, action = ArgAction::SetTrue)]
    search: bool,

    /// Signal fed to the first amplifier
    #[clap(long, value_parser, default_value = "0", conflicts_with = "search")]
    signal: Word,
}

impl AmplifyOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let assembly = super::load(&self.input, self.assembly)?;

        if self.search {
            let (signal, phases) = max_signal(&assembly.words, &self.phases, self.feedback)?;
            info!(?phases, "Best phase settings");
            println!("{signal}");
            return Ok(());
        }

        let mut pipeline = Pipeline::new(&assembly.words, &self.phases);
        let signal = if self.feedback {
            pipeline.run_feedback(self.signal)?
        } else {
            pipeline.run(self.signal)?
        };

        info!(phases = ?pipeline.phases(), halted = pipeline.is_halted(), "Pipeline done");
        println!("{signal}");
        Ok(())
    }
}
