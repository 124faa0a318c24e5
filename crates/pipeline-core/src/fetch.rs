//! Fetch stage: walks the instruction region and stages one instruction at a
//! time into the queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::api::TraceEvent;
use crate::execute::helpers::{address_word, operands, parse_literal};
use crate::fault::Fault;
use crate::isa::Opcode;
use crate::queue::InstructionQueue;
use crate::state::{Register, RegisterFile};
use crate::store::ProgramStore;
use crate::tracer::Tracer;

/// Fetch unit state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    /// Ready to stage the instruction at `IP`.
    Fetching,
    /// Waiting for the execute stage to take the staged instruction.
    WaitingForDrain,
    /// Nothing further will be fetched.
    Done,
}

/// Producer half of the pipeline. Owns the instruction pointer.
#[derive(Debug)]
pub(crate) struct FetchUnit {
    store: Arc<ProgramStore>,
    queue: Arc<InstructionQueue>,
    registers: Arc<RegisterFile>,
    halted: Arc<AtomicBool>,
    cycle: Duration,
    ip: usize,
    state: FetchState,
}

impl FetchUnit {
    /// Creates a unit positioned at address 0.
    #[must_use]
    pub(crate) fn new(
        store: Arc<ProgramStore>,
        queue: Arc<InstructionQueue>,
        registers: Arc<RegisterFile>,
        halted: Arc<AtomicBool>,
        cycle: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            registers,
            halted,
            cycle,
            ip: 0,
            state: FetchState::Fetching,
        }
    }

    /// Runs until the instruction region is exhausted, a jump leaves it, or
    /// the halted flag is raised. The queue is closed on every exit.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MalformedLiteral`] for a non-numeric `JMP` target.
    /// The jump itself is still staged so the execute stage reports the fault
    /// in program order.
    pub(crate) fn run(&mut self, tracer: &Tracer<'_>) -> Result<FetchState, Fault> {
        let result = self.fetch_all(tracer);
        self.state = FetchState::Done;
        self.queue.close();
        tracing::trace!(ip = self.ip, "fetch stage done");
        result.map(|()| self.state)
    }

    fn fetch_all(&mut self, tracer: &Tracer<'_>) -> Result<(), Fault> {
        loop {
            if self.halted.load(Ordering::Acquire) {
                return Ok(());
            }
            let Some(record) = self.store.fetch(self.ip) else {
                return Ok(());
            };
            if !self.queue.is_empty() {
                self.state = FetchState::WaitingForDrain;
                tracing::trace!(ip = self.ip, "fetch stage waiting for drain");
                if !self.queue.wait_until_drained() || self.halted.load(Ordering::Acquire) {
                    return Ok(());
                }
            }
            self.state = FetchState::Fetching;

            let address = self.ip;
            let target = match record.opcode() {
                Opcode::Jmp => {
                    Some(operands::<1>(&record).and_then(|[target]| parse_literal(target)))
                }
                _ => None,
            };

            if self.queue.push(record.clone(), address).is_err() {
                return Ok(());
            }
            tracing::trace!(address, instruction = %record, "staged");
            tracer.emit_with(|| TraceEvent::Fetched { address, record });

            match target {
                None => self.ip += 1,
                Some(Ok(target)) => match usize::try_from(target) {
                    Ok(target) => self.ip = target,
                    // Nothing to fetch below zero; execute reports the jump.
                    Err(_) => return Ok(()),
                },
                Some(Err(fault)) => return Err(fault),
            }
            self.registers.write(Register::IP, address_word(self.ip));

            if !self.cycle.is_zero() {
                thread::sleep(self.cycle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{FetchState, FetchUnit};
    use crate::api::TraceEvent;
    use crate::fault::Fault;
    use crate::isa::Program;
    use crate::queue::InstructionQueue;
    use crate::state::{Register, RegisterFile};
    use crate::store::ProgramStore;
    use crate::tracer::Tracer;

    struct Rig {
        queue: Arc<InstructionQueue>,
        registers: Arc<RegisterFile>,
        halted: Arc<AtomicBool>,
        unit: FetchUnit,
    }

    fn rig(source: &str) -> Rig {
        let store = Arc::new(ProgramStore::new(
            Program::parse(source).expect("valid program"),
        ));
        let queue = Arc::new(InstructionQueue::new());
        let registers = Arc::new(RegisterFile::new());
        let halted = Arc::new(AtomicBool::new(false));
        let unit = FetchUnit::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&registers),
            Arc::clone(&halted),
            Duration::ZERO,
        );
        Rig {
            queue,
            registers,
            halted,
            unit,
        }
    }

    #[test]
    fn single_instruction_is_staged_then_queue_closes() {
        let mut rig = rig("HLT");
        let state = rig.unit.run(&Tracer::disabled()).expect("fetch succeeds");
        assert_eq!(state, FetchState::Done);
        assert_eq!(rig.registers.read(Register::IP), 1);
        assert!(rig.queue.is_closed());
        assert_eq!(rig.queue.pop_wait().map(|entry| entry.address), Some(0));
        assert_eq!(rig.queue.pop_wait(), None);
    }

    #[test]
    fn jump_past_end_stops_fetching() {
        let mut rig = rig("JMP 9\nHLT");
        rig.unit.run(&Tracer::disabled()).expect("fetch succeeds");
        assert_eq!(rig.registers.read(Register::IP), 9);
        let staged: Vec<usize> = std::iter::from_fn(|| rig.queue.pop_wait())
            .map(|entry| entry.address)
            .collect();
        assert_eq!(staged, [0]);
    }

    #[test]
    fn malformed_jump_target_is_staged_and_reported() {
        let mut rig = rig("JMP here\nHLT");
        assert_eq!(
            rig.unit.run(&Tracer::disabled()),
            Err(Fault::malformed_literal("here"))
        );
        assert_eq!(rig.queue.stats().pushed, 1);
        assert!(rig.queue.is_closed());
    }

    #[test]
    fn raised_halted_flag_stops_before_first_push() {
        let mut rig = rig("MOV AX 1\nHLT");
        rig.halted.store(true, Ordering::Release);
        rig.unit.run(&Tracer::disabled()).expect("fetch succeeds");
        assert_eq!(rig.queue.stats().pushed, 0);
        assert_eq!(rig.registers.read(Register::IP), 0);
    }

    #[test]
    fn rejected_push_emits_no_fetch_event() {
        let mut rig = rig("MOV AX 1\nHLT");
        rig.queue.shutdown();
        let mut events: Vec<TraceEvent> = Vec::new();
        rig.unit
            .run(&Tracer::new(&mut events))
            .expect("fetch succeeds");
        assert!(events.is_empty());
        assert_eq!(rig.queue.stats().pushed, 0);
    }

    #[test]
    fn fetch_events_follow_accepted_pushes() {
        let mut rig = rig("JMP 5\nHLT");
        let mut events: Vec<TraceEvent> = Vec::new();
        let tracer = Tracer::new(&mut events);
        rig.unit.run(&tracer).expect("fetch succeeds");
        assert_eq!(rig.queue.pop_wait().map(|entry| entry.address), Some(0));
        drop(tracer);
        let fetched: Vec<usize> = events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Fetched { address, .. } => Some(*address),
                _ => None,
            })
            .collect();
        assert_eq!(fetched, [0]);
    }
}
