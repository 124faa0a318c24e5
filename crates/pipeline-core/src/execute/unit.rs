//! Execute stage loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::helpers::address_word;
use super::{execute_instruction, ExecuteContext, Flow};
use crate::api::{MachineSnapshot, StopReason, TraceEvent};
use crate::fault::Fault;
use crate::queue::InstructionQueue;
use crate::state::{Register, RegisterFile};
use crate::store::ProgramStore;
use crate::tracer::Tracer;

/// Consumer half of the pipeline. Owns `FLAGS` parity and the `IR` latch.
#[derive(Debug)]
pub struct ExecuteUnit {
    store: Arc<ProgramStore>,
    queue: Arc<InstructionQueue>,
    registers: Arc<RegisterFile>,
    halted: Arc<AtomicBool>,
    cycle: Duration,
    step_limit: Option<u64>,
    snapshot_on_retire: bool,
    retired: u64,
    current: Option<usize>,
}

impl ExecuteUnit {
    /// Creates a unit that has retired nothing yet.
    #[must_use]
    pub fn new(
        store: Arc<ProgramStore>,
        queue: Arc<InstructionQueue>,
        registers: Arc<RegisterFile>,
        halted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            queue,
            registers,
            halted,
            cycle: Duration::ZERO,
            step_limit: None,
            snapshot_on_retire: false,
            retired: 0,
            current: None,
        }
    }

    /// Sets the simulated per-instruction latency.
    #[must_use]
    pub const fn with_cycle(mut self, cycle: Duration) -> Self {
        self.cycle = cycle;
        self
    }

    /// Sets the retirement budget.
    #[must_use]
    pub const fn with_step_limit(mut self, limit: Option<u64>) -> Self {
        self.step_limit = limit;
        self
    }

    /// Attaches a machine snapshot to every retirement event.
    #[must_use]
    pub const fn with_snapshots(mut self, enabled: bool) -> Self {
        self.snapshot_on_retire = enabled;
        self
    }

    /// Instructions retired so far.
    #[must_use]
    pub const fn retired(&self) -> u64 {
        self.retired
    }

    /// Runs until the queue is closed and drained, `HLT` retires, or an
    /// instruction faults. On every exit the halted flag is raised and the
    /// queue shut down so the fetch stage stops.
    ///
    /// # Errors
    ///
    /// Returns the first fault raised by an instruction, or
    /// [`Fault::StepLimitExceeded`] when the budget runs out.
    pub fn run(&mut self, tracer: &Tracer<'_>) -> Result<StopReason, Fault> {
        let result = self.execute_all(tracer);
        self.halted.store(true, Ordering::Release);
        self.queue.shutdown();

        let retired = self.retired;
        match &result {
            Ok(StopReason::Completed) => {
                tracing::info!(retired, "program completed");
                tracer.emit_with(|| TraceEvent::Completed { retired });
            }
            Ok(StopReason::Halted) => {
                tracing::info!(retired, "machine halted");
                tracer.emit_with(|| TraceEvent::Halted { retired });
            }
            Err(fault) => {
                tracing::warn!(address = ?self.current, %fault, "execute stage faulted");
                tracer.emit_with(|| TraceEvent::Faulted {
                    fault: fault.clone(),
                    address: self.current,
                });
            }
        }
        result
    }

    fn execute_all(&mut self, tracer: &Tracer<'_>) -> Result<StopReason, Fault> {
        while let Some(entry) = self.queue.pop_wait() {
            if let Some(limit) = self.step_limit {
                if self.retired >= limit {
                    self.current = None;
                    return Err(Fault::StepLimitExceeded { limit });
                }
            }
            self.current = Some(entry.address);
            self.registers
                .write(Register::IR, address_word(entry.address));

            let effect = execute_instruction(
                &entry.record,
                ExecuteContext {
                    registers: &self.registers,
                    store: &self.store,
                },
            )?;
            self.retired += 1;
            if effect.flow == Flow::Continue {
                self.registers
                    .update(Register::FLAGS, |flags| flags.wrapping_add(1) % 2);
            }

            tracing::debug!(
                serial = self.retired,
                address = entry.address,
                instruction = %entry.record,
                "retired"
            );
            tracer.emit_with(|| TraceEvent::Retired {
                serial: self.retired,
                address: entry.address,
                record: entry.record.clone(),
                bus: effect.bus,
                snapshot: self.snapshot_on_retire.then(|| Box::new(self.capture())),
            });

            if effect.flow == Flow::Halt {
                return Ok(StopReason::Halted);
            }
            if !self.cycle.is_zero() {
                thread::sleep(self.cycle);
            }
        }
        Ok(StopReason::Completed)
    }

    fn capture(&self) -> MachineSnapshot {
        MachineSnapshot {
            registers: self.registers.snapshot(),
            queue: self.queue.entries(),
            memory: self.store.cells(),
        }
    }
}
