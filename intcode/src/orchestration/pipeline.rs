use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info};

use crate::constants::Word;
use crate::runtime::{Machine, MachineError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("amplifier {index} failed")]
    Machine {
        index: usize,
        #[source]
        source: MachineError,
    },

    #[error("amplifier {index} did not produce any signal")]
    NoSignal { index: usize },

    #[error("no phase setting given")]
    Empty,
}

/// A chain of machines running the same program, each one feeding the next
#[derive(Debug, Clone)]
pub struct Pipeline {
    machines: Vec<Machine>,
    phases: Vec<Word>,
}

impl Pipeline {
    /// Boot one machine per phase setting, each one primed with its phase
    #[must_use]
    pub fn new(image: &[Word], phases: &[Word]) -> Self {
        let machines = phases
            .iter()
            .map(|&phase| {
                let mut machine = Machine::new(image);
                machine.push_input(phase);
                machine
            })
            .collect();

        Self {
            machines,
            phases: phases.to_vec(),
        }
    }

    #[must_use]
    pub fn phases(&self) -> &[Word] {
        &self.phases
    }

    #[must_use]
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    /// Whether every machine of the chain halted
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.machines.iter().all(Machine::is_halted)
    }

    /// Pass a signal through every machine once, returning the last signal
    /// produced by the last machine.
    ///
    /// # Errors
    ///
    /// Fails if the chain is empty, if a machine faults or halted already, or
    /// if a machine yields without writing any signal.
    pub fn run(&mut self, signal: Word) -> Result<Word, PipelineError> {
        if self.machines.is_empty() {
            return Err(PipelineError::Empty);
        }

        let mut signal = signal;
        for (index, machine) in self.machines.iter_mut().enumerate() {
            let output = machine
                .resume_with([signal])
                .map_err(|source| PipelineError::Machine { index, source })?;
            signal = *output.back().ok_or(PipelineError::NoSignal { index })?;
            debug!(index, signal, status = %machine.status(), "Amplifier yielded");
        }

        Ok(signal)
    }

    /// Loop the signal of the last machine back into the first one until
    /// every machine halted.
    ///
    /// # Errors
    ///
    /// See [`Self::run`]. A machine halting before the others makes the next
    /// pass fail.
    #[tracing::instrument(skip(self), fields(phases = ?self.phases))]
    pub fn run_feedback(&mut self, signal: Word) -> Result<Word, PipelineError> {
        let mut signal = signal;
        let mut rounds = 0;
        loop {
            signal = self.run(signal)?;
            rounds += 1;

            if self.is_halted() {
                debug!(rounds, signal, "Feedback loop halted");
                return Ok(signal);
            }
        }
    }
}

/// Try every ordering of the phase settings and keep the one giving the
/// strongest signal, starting from a zero input signal.
///
/// # Errors
///
/// Fails if no phase is given, or as soon as one ordering fails to run.
#[tracing::instrument(skip(image))]
pub fn max_signal(
    image: &[Word],
    phases: &[Word],
    feedback: bool,
) -> Result<(Word, Vec<Word>), PipelineError> {
    let mut best: Option<(Word, Vec<Word>)> = None;

    for ordering in phases.iter().copied().permutations(phases.len()) {
        let mut pipeline = Pipeline::new(image, &ordering);
        let signal = if feedback {
            pipeline.run_feedback(0)?
        } else {
            pipeline.run(0)?
        };

        let stronger = match &best {
            Some((max, _)) => signal > *max,
            None => true,
        };

        if stronger {
            debug!(signal, ?ordering, "Found a stronger signal");
            best = Some((signal, ordering));
        }
    }

    let best = best.ok_or(PipelineError::Empty)?;
    info!(signal = best.0, phases = ?best.1, "Strongest signal");
    Ok(best)
}
