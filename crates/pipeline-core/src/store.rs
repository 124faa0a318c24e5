//! Program store: the instruction region followed by the stack tail.

use std::fmt;

use parking_lot::RwLock;

use crate::isa::{InstructionRecord, Program};

/// One addressable cell of the program store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Cell {
    /// Instruction loaded with the program.
    Instruction(InstructionRecord),
    /// Word appended to the stack tail by `PUSH`.
    Data(i16),
}

impl Cell {
    /// Returns the instruction held by this cell, if any.
    #[must_use]
    pub const fn instruction(&self) -> Option<&InstructionRecord> {
        match self {
            Self::Instruction(record) => Some(record),
            Self::Data(_) => None,
        }
    }

    /// Returns the data word held by this cell, if any.
    #[must_use]
    pub const fn data(&self) -> Option<i16> {
        match self {
            Self::Instruction(_) => None,
            Self::Data(value) => Some(*value),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruction(record) => record.fmt(f),
            Self::Data(value) => value.fmt(f),
        }
    }
}

/// Shared program store.
///
/// Addresses `0..program_len()` hold the instruction region, which never
/// changes after construction. The stack tail grows above it, so `PUSH` and
/// `POP` cannot disturb a cell the fetch unit may still address.
#[derive(Debug)]
pub struct ProgramStore {
    cells: RwLock<Vec<Cell>>,
    program_len: usize,
}

impl ProgramStore {
    /// Loads a program into a fresh store with an empty stack tail.
    #[must_use]
    pub fn new(program: Program) -> Self {
        let cells: Vec<Cell> = program
            .into_records()
            .into_iter()
            .map(Cell::Instruction)
            .collect();
        let program_len = cells.len();
        Self {
            cells: RwLock::new(cells),
            program_len,
        }
    }

    /// Length of the instruction region.
    #[must_use]
    pub const fn program_len(&self) -> usize {
        self.program_len
    }

    /// Total number of cells, instruction region plus stack tail.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    /// Returns true when the store holds no cells at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }

    /// Number of words on the stack tail.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.len() - self.program_len
    }

    /// Reads the instruction at `address`. Stack cells are never fetchable.
    #[must_use]
    pub fn fetch(&self, address: usize) -> Option<InstructionRecord> {
        if address >= self.program_len {
            return None;
        }
        self.cells
            .read()
            .get(address)
            .and_then(Cell::instruction)
            .cloned()
    }

    /// Appends a word to the stack tail.
    pub fn push(&self, value: i16) {
        self.cells.write().push(Cell::Data(value));
    }

    /// Removes the word at the top of the stack tail. Returns `None` when the
    /// tail is empty; instruction cells are never removed.
    pub fn pop(&self) -> Option<i16> {
        let mut cells = self.cells.write();
        if cells.len() <= self.program_len {
            return None;
        }
        cells.pop().and_then(|cell| cell.data())
    }

    /// Copies every cell in address order.
    #[must_use]
    pub fn cells(&self) -> Vec<Cell> {
        self.cells.read().clone()
    }
}
