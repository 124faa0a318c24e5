//! Console rendering of trace events.

use std::io::{self, Write};

use pipeline_core::{BusCycle, BusSource, MachineSnapshot, RegisterClass, TraceEvent, TraceSink};

/// Trace sink that writes each retirement with its bus cycle and, when the
/// event carries one, the machine snapshot.
///
/// The first write error stops further output and is returned by
/// [`ConsoleTracer::finish`].
#[derive(Debug)]
pub struct ConsoleTracer<W> {
    out: W,
    error: Option<io::Error>,
    fault_address: Option<usize>,
}

impl<W: Write> ConsoleTracer<W> {
    /// Creates a tracer writing to `out`.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            error: None,
            fault_address: None,
        }
    }

    /// Address of the instruction that faulted, if the run faulted there.
    #[must_use]
    pub const fn fault_address(&self) -> Option<usize> {
        self.fault_address
    }

    /// Flushes and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns the first write error seen while tracing.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> TraceSink for ConsoleTracer<W> {
    fn on_event(&mut self, event: TraceEvent) {
        if let TraceEvent::Faulted { address, .. } = &event {
            self.fault_address = *address;
        }
        if self.error.is_some() {
            return;
        }
        if let Err(error) = render_event(&mut self.out, &event) {
            self.error = Some(error);
        }
    }
}

/// Writes one event. Fetch events are not printed.
///
/// # Errors
///
/// Propagates write errors from `out`.
pub fn render_event(out: &mut impl Write, event: &TraceEvent) -> io::Result<()> {
    match event {
        TraceEvent::Fetched { .. } => {}
        TraceEvent::Retired {
            serial,
            address,
            record,
            bus,
            snapshot,
        } => {
            writeln!(out, "-----------------------------------------")?;
            writeln!(out, "{serial} : {record} (address {address})")?;
            if let Some(cycle) = bus {
                render_bus(out, cycle)?;
            }
            if let Some(snapshot) = snapshot {
                render_snapshot(out, snapshot)?;
            }
        }
        TraceEvent::Halted { retired } => {
            writeln!(out, "--- Halted after {retired} instructions. ---")?;
        }
        TraceEvent::Completed { retired } => {
            writeln!(out, "--- Program ends after {retired} instructions. ---")?;
        }
        TraceEvent::Faulted { fault, address } => match address {
            Some(address) => writeln!(out, "--- Fault at address {address}: {fault} ---")?,
            None => writeln!(out, "--- Fault: {fault} ---")?,
        },
    }
    Ok(())
}

fn render_bus(out: &mut impl Write, cycle: &BusCycle) -> io::Result<()> {
    let source = match cycle.source {
        BusSource::Register(reg) => reg.name(),
        BusSource::Immediate => "\\",
    };
    writeln!(out, "address bus:")?;
    writeln!(out, "  destination: {}", cycle.destination.name())?;
    writeln!(out, "  source: {source}")?;
    writeln!(out, "data bus:")?;
    writeln!(out, "  data: {}", cycle.data)?;
    writeln!(out, "control bus:")?;
    writeln!(out, "  read: {}", cycle.read)?;
    writeln!(out, "  write: {}", cycle.write)
}

/// Writes registers by class, then the queue, then memory.
///
/// # Errors
///
/// Propagates write errors from `out`.
pub fn render_snapshot(out: &mut impl Write, snapshot: &MachineSnapshot) -> io::Result<()> {
    writeln!(out, "registers:")?;
    for class in [
        RegisterClass::Execution,
        RegisterClass::Bus,
        RegisterClass::Control,
    ] {
        for (reg, value) in snapshot.registers.class(class) {
            writeln!(out, "  {}: {value}", reg.name())?;
        }
    }
    writeln!(out, "queue:")?;
    for entry in &snapshot.queue {
        writeln!(out, "  [{}] {}", entry.address, entry.record)?;
    }
    writeln!(out, "memory:")?;
    for (address, cell) in snapshot.memory.iter().enumerate() {
        writeln!(out, "  [{address}]: {cell}")?;
    }
    Ok(())
}
