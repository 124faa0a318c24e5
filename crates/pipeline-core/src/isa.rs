//! Instruction set: opcode table, instruction records and program tokenization.
//!
//! Source lines have the form `OPCODE [OPERAND [OPERAND]]` with operands
//! separated by whitespace. Mnemonics and register names are case-sensitive.
//! Operands stay textual; whether an operand names a register or a literal is
//! decided by the execute stage against the execution register class.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::fault::Fault;

/// Closed set of opcodes understood by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Opcode {
    /// `MOV reg, src`: copy a register or literal into a register.
    Mov,
    /// `ADD reg, src`: add a register or literal into a register.
    Add,
    /// `SUB reg, lit`: subtract a literal from a register.
    Sub,
    /// `MUL lit`: multiply `AX` by a literal.
    Mul,
    /// `DIV lit`: divide `AX` by a literal.
    Div,
    /// `PUSH reg`: append a register value to the stack tail.
    Push,
    /// `POP reg`: remove the stack tail into a register.
    Pop,
    /// `JMP addr`: continue fetching at an absolute address.
    Jmp,
    /// `HLT`: stop the machine.
    Hlt,
}

/// Mnemonic table in dispatch order.
pub const OPCODE_TABLE: &[(&str, Opcode)] = &[
    ("MOV", Opcode::Mov),
    ("ADD", Opcode::Add),
    ("SUB", Opcode::Sub),
    ("MUL", Opcode::Mul),
    ("DIV", Opcode::Div),
    ("PUSH", Opcode::Push),
    ("POP", Opcode::Pop),
    ("JMP", Opcode::Jmp),
    ("HLT", Opcode::Hlt),
];

impl Opcode {
    /// Resolves a mnemonic to its opcode.
    #[must_use]
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find(|(name, _)| *name == mnemonic)
            .map(|(_, opcode)| *opcode)
    }

    /// Returns the canonical mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Mov => "MOV",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Push => "PUSH",
            Self::Pop => "POP",
            Self::Jmp => "JMP",
            Self::Hlt => "HLT",
        }
    }

    /// Number of operands the opcode takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Hlt => 0,
            Self::Mul | Self::Div | Self::Push | Self::Pop | Self::Jmp => 1,
            Self::Mov | Self::Add | Self::Sub => 2,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One tokenized instruction: an opcode plus its textual operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionRecord {
    opcode: Opcode,
    operands: Vec<String>,
}

impl InstructionRecord {
    /// Builds a record, checking the operand count against the opcode.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OperandCount`] when the number of operands does not
    /// match [`Opcode::arity`].
    pub fn new<I, S>(opcode: Opcode, operands: I) -> Result<Self, Fault>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let operands: Vec<String> = operands.into_iter().map(Into::into).collect();
        if operands.len() != opcode.arity() {
            return Err(Fault::OperandCount {
                opcode: opcode.mnemonic(),
                expected: opcode.arity(),
                found: operands.len(),
            });
        }
        Ok(Self { opcode, operands })
    }

    /// Tokenizes one source line.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownOpcode`] for an unrecognised (or missing)
    /// mnemonic and [`Fault::OperandCount`] for a wrong operand count.
    pub fn parse(line: &str) -> Result<Self, Fault> {
        let mut tokens = line.split_whitespace();
        let mnemonic = tokens.next().unwrap_or_default();
        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| Fault::UnknownOpcode {
            mnemonic: mnemonic.to_owned(),
        })?;
        Self::new(opcode, tokens)
    }

    /// Returns the opcode.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns all operands in source order.
    #[must_use]
    pub fn operands(&self) -> &[String] {
        &self.operands
    }

    /// Returns the operand at `index`, if present.
    #[must_use]
    pub fn operand(&self, index: usize) -> Option<&str> {
        self.operands.get(index).map(String::as_str)
    }
}

impl fmt::Display for InstructionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

impl FromStr for InstructionRecord {
    type Err = Fault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Tokenization failure with the 1-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {fault}")]
pub struct ProgramError {
    /// 1-based line number within the supplied source.
    pub line: usize,
    /// Underlying decode fault.
    #[source]
    pub fault: Fault,
}

/// Ordered instruction records addressed from zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Program {
    records: Vec<InstructionRecord>,
}

impl Program {
    /// Wraps already-tokenized records.
    #[must_use]
    pub const fn new(records: Vec<InstructionRecord>) -> Self {
        Self { records }
    }

    /// Tokenizes one record per supplied line. Every line must hold an
    /// instruction.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProgramError`] in line order.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, ProgramError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .enumerate()
            .map(|(idx, line)| {
                InstructionRecord::parse(line.as_ref())
                    .map_err(|fault| ProgramError { line: idx + 1, fault })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Tokenizes newline-separated source, skipping blank lines. Reported
    /// line numbers refer to `source`, while addresses count instructions only.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProgramError`] in line order.
    pub fn parse(source: &str) -> Result<Self, ProgramError> {
        source
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                InstructionRecord::parse(line).map_err(|fault| ProgramError { line: idx + 1, fault })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when the program holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record at `address`.
    #[must_use]
    pub fn get(&self, address: usize) -> Option<&InstructionRecord> {
        self.records.get(address)
    }

    /// Consumes the program, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<InstructionRecord> {
        self.records
    }
}

impl FromStr for Program {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
