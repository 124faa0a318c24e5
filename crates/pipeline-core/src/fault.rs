use thiserror::Error;

/// Fault classes used for diagnostics aggregation and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Program text could not be tokenized into instruction records.
    Decode,
    /// An operand named a register outside the addressed class.
    Register,
    /// Arithmetic operand or result violation.
    Arithmetic,
    /// Stack tail misuse.
    Stack,
    /// Control-flow target violation.
    Control,
    /// Configured step budget exhausted.
    Budget,
}

/// Fatal run faults. Every fault stops the current run; effects committed by
/// earlier instructions are kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum Fault {
    /// Mnemonic does not name an instruction of the machine.
    #[error("invalid instruction: {mnemonic}")]
    UnknownOpcode {
        /// Mnemonic as written.
        mnemonic: String,
    },
    /// Opcode was given the wrong number of operands.
    #[error("{opcode} expects {expected} operand(s), found {found}")]
    OperandCount {
        /// Mnemonic of the offending instruction.
        opcode: &'static str,
        /// Operand count required by the opcode.
        expected: usize,
        /// Operand count present in the source line.
        found: usize,
    },
    /// Operand names a register that is not present in the addressed class.
    #[error("invalid register for {operation}: {name}")]
    UnknownRegister {
        /// Register name as written.
        name: String,
        /// Operation that attempted the access.
        operation: &'static str,
    },
    /// Operand expected to be a decimal integer failed to parse.
    #[error("malformed literal: {text:?}")]
    MalformedLiteral {
        /// Operand text as written.
        text: String,
    },
    /// `DIV` with a zero divisor.
    #[error("division by zero")]
    DivideByZero,
    /// `POP` with an empty stack.
    #[error("stack underflow")]
    StackUnderflow,
    /// `JMP` target outside the instruction region.
    #[error("invalid jump address: {target} (program has {len} instructions)")]
    InvalidJumpTarget {
        /// Decoded jump target.
        target: i64,
        /// Length of the instruction region.
        len: usize,
    },
    /// The configured step budget ran out before the program stopped.
    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded {
        /// Configured limit.
        limit: u64,
    },
}

impl Fault {
    /// Returns the diagnostics fault class for this fault.
    #[must_use]
    pub const fn class(&self) -> FaultClass {
        match self {
            Self::UnknownOpcode { .. } | Self::OperandCount { .. } => FaultClass::Decode,
            Self::UnknownRegister { .. } => FaultClass::Register,
            Self::MalformedLiteral { .. } | Self::DivideByZero => FaultClass::Arithmetic,
            Self::StackUnderflow => FaultClass::Stack,
            Self::InvalidJumpTarget { .. } => FaultClass::Control,
            Self::StepLimitExceeded { .. } => FaultClass::Budget,
        }
    }

    pub(crate) fn unknown_register(name: &str, operation: &'static str) -> Self {
        Self::UnknownRegister {
            name: name.to_owned(),
            operation,
        }
    }

    pub(crate) fn malformed_literal(text: &str) -> Self {
        Self::MalformedLiteral {
            text: text.to_owned(),
        }
    }
}
