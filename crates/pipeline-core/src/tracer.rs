use parking_lot::Mutex;

use crate::api::{TraceEvent, TraceSink};

/// Shares one optional sink between the two pipeline stages.
pub struct Tracer<'a> {
    sink: Option<Mutex<&'a mut (dyn TraceSink + Send)>>,
}

impl<'a> Tracer<'a> {
    pub const fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn new(sink: &'a mut (dyn TraceSink + Send)) -> Self {
        Self {
            sink: Some(Mutex::new(sink)),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Builds and dispatches an event only when a sink is attached.
    pub fn emit_with(&self, event: impl FnOnce() -> TraceEvent) {
        if let Some(sink) = &self.sink {
            let event = event();
            sink.lock().on_event(event);
        }
    }
}
