//! Bus cycle records describing each retired transfer.

use std::fmt;

use crate::state::Register;

/// Where the word on the data bus came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusSource {
    /// Read from an execution register.
    Register(Register),
    /// Literal operand carried by the instruction.
    Immediate,
}

/// One register transfer driven by a data-moving or arithmetic instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusCycle {
    /// Address bus source.
    pub source: BusSource,
    /// Address bus destination register.
    pub destination: Register,
    /// Operand word on the data bus.
    pub data: i16,
    /// Read strobe.
    pub read: bool,
    /// Write strobe.
    pub write: bool,
}

impl BusCycle {
    /// Read-modify-write transfer of `data` from `source` into `destination`.
    #[must_use]
    pub const fn transfer(source: BusSource, destination: Register, data: i16) -> Self {
        Self {
            source,
            destination,
            data,
            read: true,
            write: true,
        }
    }
}

impl fmt::Display for BusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register(reg) => f.write_str(reg.name()),
            Self::Immediate => f.write_str("imm"),
        }
    }
}
