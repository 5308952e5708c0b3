//! Drivers connecting several machines together
//!
//! Machines never share anything: the drivers below move words from the
//! output queue of a machine to the input queue of another one, stepping each
//! machine in turn.

mod network;
mod pipeline;

pub use self::network::{Network, NetworkConfig, NetworkError, Packet, RoundReport};
pub use self::pipeline::{max_signal, Pipeline, PipelineError};
