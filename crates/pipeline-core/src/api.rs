//! Host-facing contracts: configuration, run outcomes, snapshots and trace
//! hooks.

use std::time::Duration;

use crate::execute::BusCycle;
use crate::isa::InstructionRecord;
use crate::queue::QueueEntry;
use crate::state::RegisterSnapshot;
use crate::store::Cell;
use crate::Fault;

/// Top-level configuration for a machine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MachineConfig {
    /// Maximum number of instructions a single run may retire. `None` runs
    /// until the program halts, completes or faults.
    pub step_limit: Option<u64>,
    /// Simulated latency of one fetch.
    pub fetch_cycle: Duration,
    /// Simulated latency of one execute.
    pub execute_cycle: Duration,
    /// Attach a full machine snapshot to every retirement event.
    pub snapshot_on_retire: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            step_limit: None,
            fetch_cycle: Duration::ZERO,
            execute_cycle: Duration::ZERO,
            snapshot_on_retire: true,
        }
    }
}

impl MachineConfig {
    /// Returns a copy with the given step budget.
    #[must_use]
    pub const fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Returns a copy with the given per-stage latencies.
    #[must_use]
    pub const fn with_cycles(mut self, fetch: Duration, execute: Duration) -> Self {
        self.fetch_cycle = fetch;
        self.execute_cycle = execute;
        self
    }
}

/// Why a run stopped without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StopReason {
    /// The last fetched instruction retired and nothing further was fetched.
    Completed,
    /// `HLT` retired.
    Halted,
}

/// Aggregated outcome of one `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Stop reason.
    pub stop: StopReason,
    /// Number of instructions retired, including `HLT`.
    pub retired: u64,
}

/// Point-in-time view of all machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineSnapshot {
    /// Every register across all classes.
    pub registers: RegisterSnapshot,
    /// Staged queue entries in FIFO order.
    pub queue: Vec<QueueEntry>,
    /// Program store cells in address order.
    pub memory: Vec<Cell>,
}

/// Trace events in the order each stage produces them. Events from the two
/// stages may interleave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// Fetch stage staged an instruction. Sent only once the queue has
    /// accepted it; a later halt or fault may still discard it unexecuted.
    Fetched {
        /// Address the instruction was read from.
        address: usize,
        /// Staged instruction.
        record: InstructionRecord,
    },
    /// Execute stage retired an instruction.
    Retired {
        /// 1-based retirement number within the run.
        serial: u64,
        /// Address the instruction was fetched from.
        address: usize,
        /// Retired instruction.
        record: InstructionRecord,
        /// Transfer driven by the instruction, if it moves data.
        bus: Option<BusCycle>,
        /// State after retirement, when `snapshot_on_retire` is set.
        snapshot: Option<Box<MachineSnapshot>>,
    },
    /// `HLT` stopped the machine.
    Halted {
        /// Instructions retired during the run.
        retired: u64,
    },
    /// The program ran off the end of the instruction region.
    Completed {
        /// Instructions retired during the run.
        retired: u64,
    },
    /// A fault stopped the machine.
    Faulted {
        /// Raised fault.
        fault: Fault,
        /// Address of the faulting instruction, when one was executing.
        address: Option<usize>,
    },
}

/// Sink trait for trace hooks.
pub trait TraceSink {
    /// Records an event.
    fn on_event(&mut self, event: TraceEvent);
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{MachineConfig, TraceEvent, TraceSink};

    #[test]
    fn machine_config_default_matches_documented_contract() {
        let config = MachineConfig::default();
        assert_eq!(config.step_limit, None);
        assert_eq!(config.fetch_cycle, Duration::ZERO);
        assert_eq!(config.execute_cycle, Duration::ZERO);
        assert!(config.snapshot_on_retire);
    }

    #[test]
    fn builders_override_individual_fields() {
        let config = MachineConfig::default()
            .with_step_limit(64)
            .with_cycles(Duration::from_millis(1), Duration::from_millis(20));
        assert_eq!(config.step_limit, Some(64));
        assert_eq!(config.fetch_cycle, Duration::from_millis(1));
        assert_eq!(config.execute_cycle, Duration::from_millis(20));
    }

    #[test]
    fn vec_sink_records_in_order() {
        let mut sink: Vec<TraceEvent> = Vec::new();
        sink.on_event(TraceEvent::Completed { retired: 1 });
        sink.on_event(TraceEvent::Halted { retired: 2 });
        assert_eq!(
            sink,
            [
                TraceEvent::Completed { retired: 1 },
                TraceEvent::Halted { retired: 2 }
            ]
        );
    }
}
