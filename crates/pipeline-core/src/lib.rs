//! Two-stage pipelined register machine.
//!
//! A fetch stage walks a tokenized program and stages one instruction at a
//! time; an execute stage retires staged instructions against a shared
//! register file and program store. Both stages run on their own thread.

/// Fault taxonomy for tokenization and execution failures.
pub mod fault;
pub use fault::{Fault, FaultClass};

/// Opcode table, instruction records and program tokenization.
pub mod isa;
pub use isa::{InstructionRecord, Opcode, Program, ProgramError, OPCODE_TABLE};

/// Register set and machine lifecycle state.
pub mod state;
pub use state::{Register, RegisterClass, RegisterFile, RegisterSnapshot, RunState, REGISTER_COUNT};

/// Instruction region plus stack tail.
pub mod store;
pub use store::{Cell, ProgramStore};

/// Depth-limited FIFO between the two stages.
pub mod queue;
pub use queue::{InstructionQueue, QueueClosed, QueueEntry, QueueStats, QUEUE_DEPTH};

/// Fetch stage.
pub mod fetch;
pub use fetch::FetchState;

/// Execute stage and instruction handlers.
pub mod execute;
pub use execute::{BusCycle, BusSource};

/// Host-facing configuration, outcome, snapshot and trace contracts.
pub mod api;
pub use api::{MachineConfig, MachineSnapshot, RunOutcome, StopReason, TraceEvent, TraceSink};

/// Coordinating machine.
pub mod machine;
pub use machine::Machine;

mod tracer;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
