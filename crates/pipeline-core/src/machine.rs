//! Coordinating machine: owns the shared state and runs both stages.

use std::panic;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crate::api::{MachineConfig, MachineSnapshot, RunOutcome, StopReason, TraceSink};
use crate::execute::ExecuteUnit;
use crate::fault::Fault;
use crate::fetch::FetchUnit;
use crate::isa::{Program, ProgramError};
use crate::queue::{InstructionQueue, QueueStats};
use crate::state::{RegisterFile, RegisterSnapshot, RunState};
use crate::store::ProgramStore;
use crate::tracer::Tracer;

/// Two-stage pipelined machine.
///
/// A machine runs once. Later `run` calls return the latched result of the
/// first run without touching state.
#[derive(Debug)]
pub struct Machine {
    config: MachineConfig,
    registers: Arc<RegisterFile>,
    store: Arc<ProgramStore>,
    queue: Arc<InstructionQueue>,
    halted: Arc<AtomicBool>,
    run_state: RunState,
    retired: u64,
}

impl Machine {
    /// Loads a tokenized program with every register cleared.
    #[must_use]
    pub fn new(program: Program, config: MachineConfig) -> Self {
        Self {
            config,
            registers: Arc::new(RegisterFile::new()),
            store: Arc::new(ProgramStore::new(program)),
            queue: Arc::new(InstructionQueue::new()),
            halted: Arc::new(AtomicBool::new(false)),
            run_state: RunState::Ready,
            retired: 0,
        }
    }

    /// Tokenizes newline-separated source and loads it.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProgramError`] in the source.
    pub fn from_source(source: &str, config: MachineConfig) -> Result<Self, ProgramError> {
        Ok(Self::new(Program::parse(source)?, config))
    }

    /// Runs the program to completion, halt or fault.
    ///
    /// # Errors
    ///
    /// Returns the first fault in program order.
    pub fn run(&mut self) -> Result<RunOutcome, Fault> {
        self.run_with(&Tracer::disabled())
    }

    /// Runs like [`Machine::run`], dispatching trace events to `sink`.
    ///
    /// # Errors
    ///
    /// Returns the first fault in program order.
    pub fn run_traced<S>(&mut self, sink: &mut S) -> Result<RunOutcome, Fault>
    where
        S: TraceSink + Send,
    {
        self.run_with(&Tracer::new(sink))
    }

    fn run_with(&mut self, tracer: &Tracer<'_>) -> Result<RunOutcome, Fault> {
        if let Some(latched) = self.latched_result() {
            return latched;
        }

        let mut fetch = FetchUnit::new(
            Arc::clone(&self.store),
            Arc::clone(&self.queue),
            Arc::clone(&self.registers),
            Arc::clone(&self.halted),
            self.config.fetch_cycle,
        );
        let mut execute = ExecuteUnit::new(
            Arc::clone(&self.store),
            Arc::clone(&self.queue),
            Arc::clone(&self.registers),
            Arc::clone(&self.halted),
        )
        .with_cycle(self.config.execute_cycle)
        .with_step_limit(self.config.step_limit)
        .with_snapshots(self.config.snapshot_on_retire);

        tracing::info!(
            instructions = self.store.program_len(),
            traced = tracer.is_enabled(),
            "starting pipeline"
        );
        let (fetched, executed) = thread::scope(|scope| {
            let fetcher = scope.spawn(|| fetch.run(tracer));
            let executor = scope.spawn(|| execute.run(tracer));
            (
                fetcher.join().unwrap_or_else(|payload| panic::resume_unwind(payload)),
                executor.join().unwrap_or_else(|payload| panic::resume_unwind(payload)),
            )
        });
        self.retired = execute.retired();

        // The execute stage sees every staged instruction in program order, so
        // its verdict wins over a fetch-side decode failure further ahead.
        if let Err(fault) = &fetched {
            tracing::debug!(%fault, "fetch fault superseded by execute verdict");
        }
        self.run_state = match &executed {
            Ok(StopReason::Completed) => RunState::Completed,
            Ok(StopReason::Halted) => RunState::Halted,
            Err(fault) => RunState::FaultLatched(fault.clone()),
        };
        executed.map(|stop| RunOutcome {
            stop,
            retired: self.retired,
        })
    }

    fn latched_result(&self) -> Option<Result<RunOutcome, Fault>> {
        let stop = match &self.run_state {
            RunState::Ready => return None,
            RunState::Completed => StopReason::Completed,
            RunState::Halted => StopReason::Halted,
            RunState::FaultLatched(fault) => return Some(Err(fault.clone())),
        };
        Some(Ok(RunOutcome {
            stop,
            retired: self.retired,
        }))
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn run_state(&self) -> &RunState {
        &self.run_state
    }

    /// Copies every register.
    #[must_use]
    pub fn registers(&self) -> RegisterSnapshot {
        self.registers.snapshot()
    }

    /// Length of the instruction region.
    #[must_use]
    pub fn program_len(&self) -> usize {
        self.store.program_len()
    }

    /// Returns the instruction queue counters.
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Captures registers, queue contents and program store.
    #[must_use]
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            registers: self.registers.snapshot(),
            queue: self.queue.entries(),
            memory: self.store.cells(),
        }
    }
}
