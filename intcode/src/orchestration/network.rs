use std::collections::HashSet;

use parse_display::Display;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::constants::{Address, Word, IDLE_INPUT, MAILBOX_ADDRESS, NETWORK_SIZE, PACKET_LENGTH};
use crate::runtime::{Machine, MachineError};

/// Settings of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Number of machines
    pub size: usize,

    /// Destination address of the mailbox
    pub mailbox: Word,

    /// Value fed to machines waiting for a packet
    pub idle_input: Word,

    /// Give up after that many rounds
    pub max_rounds: Option<usize>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            size: NETWORK_SIZE,
            mailbox: MAILBOX_ADDRESS,
            idle_input: IDLE_INPUT,
            max_rounds: None,
        }
    }
}

/// A packet travelling on the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("({x}, {y})")]
pub struct Packet {
    pub x: Word,
    pub y: Word,
}

/// What happened during a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundReport {
    /// No machine had a packet to read nor sent anything
    pub idle: bool,

    /// Number of packets sent during the round
    pub packets: usize,

    /// The mailbox packet delivered to the first machine at the start of the round
    pub redelivered: Option<Packet>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("machine {address} failed")]
    Machine {
        address: Address,
        #[source]
        source: MachineError,
    },

    #[error("machine {address} halted")]
    Halted { address: Address },

    #[error("machine {address} sent a packet to unknown address {destination}")]
    InvalidDestination { address: Address, destination: Word },

    #[error("machine {address} sent a truncated packet of {length} values")]
    TruncatedPacket { address: Address, length: usize },

    #[error("network is idle with an empty mailbox after {round} rounds")]
    Deadlock { round: usize },

    #[error("no result after {0} rounds")]
    RoundLimit(usize),
}

/// A set of machines exchanging packets
///
/// Each machine writes packets as triples of words: the destination address,
/// then the X and Y values. Packets sent to the mailbox address are kept aside,
/// and the last one is handed to the first machine whenever the whole network
/// goes idle.
#[derive(Debug)]
pub struct Network {
    machines: Vec<Machine>,
    config: NetworkConfig,
    mailbox: Option<Packet>,
    first_packet: Option<Packet>,
    idle: bool,
    rounds: usize,
}

impl Network {
    /// Boot the machines, each one receiving its own address as first input
    #[must_use]
    pub fn new(image: &[Word], config: NetworkConfig) -> Self {
        let machines = (0..config.size)
            .map(|address| {
                let mut machine = Machine::new(image);
                machine.push_input(Word::try_from(address).unwrap_or(Word::MAX));
                machine
            })
            .collect();

        Self {
            machines,
            config,
            mailbox: None,
            first_packet: None,
            idle: false,
            rounds: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    #[must_use]
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// Last packet received by the mailbox
    #[must_use]
    pub fn mailbox(&self) -> Option<Packet> {
        self.mailbox
    }

    /// Number of rounds run so far
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Route a packet to its destination
    fn send(
        &mut self,
        address: Address,
        destination: Word,
        packet: Packet,
    ) -> Result<(), NetworkError> {
        if destination == self.config.mailbox {
            trace!(address, %packet, "Packet for the mailbox");
            self.first_packet.get_or_insert(packet);
            self.mailbox = Some(packet);
            return Ok(());
        }

        let machine = Address::try_from(destination)
            .ok()
            .and_then(|destination| self.machines.get_mut(destination))
            .ok_or(NetworkError::InvalidDestination {
                address,
                destination,
            })?;

        trace!(address, destination, %packet, "Routing packet");
        machine.push_input(packet.x);
        machine.push_input(packet.y);
        Ok(())
    }

    /// Resume every machine once, in address order, and route the packets they
    /// sent.
    ///
    /// If the previous round was idle, the mailbox packet is first delivered to
    /// the first machine.
    ///
    /// # Errors
    ///
    /// Fails if a machine faults or halts, sends a malformed packet, if the
    /// network went idle with nothing in the mailbox, or once the round limit
    /// is reached.
    #[tracing::instrument(skip(self), fields(round = self.rounds + 1))]
    pub fn round(&mut self) -> Result<RoundReport, NetworkError> {
        if let Some(limit) = self.config.max_rounds {
            if self.rounds >= limit {
                return Err(NetworkError::RoundLimit(limit));
            }
        }

        let mut report = RoundReport {
            idle: true,
            ..RoundReport::default()
        };

        if self.idle {
            let packet = self.mailbox.ok_or(NetworkError::Deadlock { round: self.rounds })?;
            if let Some(machine) = self.machines.first_mut() {
                debug!(%packet, "Network is idle, delivering the mailbox packet");
                machine.push_input(packet.x);
                machine.push_input(packet.y);
                report.redelivered = Some(packet);
            }
        }

        self.rounds += 1;

        for address in 0..self.machines.len() {
            let idle_input = self.config.idle_input;
            let machine = &mut self.machines[address];

            let starving = machine.pending_input().is_empty();
            if starving {
                machine.push_input(idle_input);
            }

            let output = machine
                .resume_with([])
                .map_err(|source| NetworkError::Machine { address, source })?;

            if machine.is_halted() {
                return Err(NetworkError::Halted { address });
            }

            report.idle &= starving && output.is_empty();

            let output = Vec::from(output);
            let packets = output.chunks_exact(PACKET_LENGTH);
            if !packets.remainder().is_empty() {
                return Err(NetworkError::TruncatedPacket {
                    address,
                    length: packets.remainder().len(),
                });
            }

            for chunk in packets {
                let &[destination, x, y] = chunk else {
                    continue;
                };
                self.send(address, destination, Packet { x, y })?;
                report.packets += 1;
            }
        }

        self.idle = report.idle;
        Ok(report)
    }

    /// Run until the first packet reaches the mailbox
    ///
    /// # Errors
    ///
    /// See [`Self::round`].
    #[tracing::instrument(skip(self))]
    pub fn first_mailbox_packet(&mut self) -> Result<Packet, NetworkError> {
        loop {
            if let Some(packet) = self.first_packet {
                info!(%packet, rounds = self.rounds, "First packet reached the mailbox");
                return Ok(packet);
            }

            self.round()?;
        }
    }

    /// Run until a Y value delivered from the mailbox to the first machine gets
    /// delivered a second time, and return it.
    ///
    /// # Errors
    ///
    /// See [`Self::round`].
    #[tracing::instrument(skip(self))]
    pub fn run_until_repeat(&mut self) -> Result<Word, NetworkError> {
        let mut delivered = HashSet::new();
        loop {
            let report = self.round()?;
            if let Some(packet) = report.redelivered {
                if !delivered.insert(packet.y) {
                    info!(
                        y = packet.y,
                        rounds = self.rounds,
                        "Mailbox delivered the same value twice"
                    );
                    return Ok(packet.y);
                }
            }
        }
    }
}
