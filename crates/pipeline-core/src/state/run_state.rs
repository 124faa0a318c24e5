use crate::Fault;

/// Lifecycle of a machine across `run` calls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    /// Constructed and not yet run.
    #[default]
    Ready,
    /// The last instruction retired and no further instruction was fetched.
    Completed,
    /// `HLT` retired.
    Halted,
    /// A fault stopped the run; no further progress is possible.
    FaultLatched(Fault),
}

impl RunState {
    /// Returns the latched fault, if this state is fault-latched.
    #[must_use]
    pub const fn latched_fault(&self) -> Option<&Fault> {
        match self {
            Self::FaultLatched(cause) => Some(cause),
            Self::Ready | Self::Completed | Self::Halted => None,
        }
    }

    /// Returns true once the machine has stopped for any reason.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Ready)
    }
}
