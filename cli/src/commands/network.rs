use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use intcode::constants::{Word, IDLE_INPUT, MAILBOX_ADDRESS, NETWORK_SIZE};
use intcode::orchestration::{Network, NetworkConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[clap(allow_negative_numbers = true)]
pub struct NetworkOpt {
    /// Program file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// The file is an assembler source, not a program image
    #[clap(short, long, action = ArgAction::SetTrue)]
    assembly: bool,

    /// Number of machines
    #[clap(long, value_parser, default_value_t = NETWORK_SIZE)]
    size: usize,

    /// Address of the mailbox
    #[clap(long, value_parser, default_value_t = MAILBOX_ADDRESS)]
    mailbox: Word,

    /// Value fed to machines waiting for a packet
    #[clap(long, value_parser, default_value_t = IDLE_INPUT)]
    idle: Word,

    /// Give up after that many rounds
    #[clap(long, value_parser)]
    max_rounds: Option<usize>,

    /// Stop on the first packet sent to the mailbox
    #[clap(long, action = ArgAction::SetTrue)]
    first: bool,
}

impl NetworkOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let assembly = super::load(&self.input, self.assembly)?;
        let config = NetworkConfig {
            size: self.size,
            mailbox: self.mailbox,
            idle_input: self.idle,
            max_rounds: self.max_rounds,
        };

        info!(?config, "Booting network");
        let mut network = Network::new(&assembly.words, config);

        let y = if self.first {
            let packet = network.first_mailbox_packet()?;
            info!(%packet, "First packet");
            packet.y
        } else {
            network.run_until_repeat()?
        };

        info!(rounds = network.rounds(), "Network stopped");
        println!("{y}");
        Ok(())
    }
}
