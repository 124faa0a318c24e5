//! Line parser: strips comments and blank lines, then tokenizes each
//! remaining line into an instruction record.

use std::path::Path;

use pipeline_core::{InstructionRecord, Program};

use crate::errors::{LoadError, SourceLoc};

/// Comment marker; the rest of the line is ignored.
pub const COMMENT_CHAR: char = ';';

/// A tokenized program with the source location of every instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProgram {
    /// Tokenized instructions, addressed from zero.
    pub program: Program,
    /// Location of each instruction, indexed by address.
    pub locations: Vec<SourceLoc>,
}

impl LoadedProgram {
    /// Returns the source location of the instruction at `address`.
    #[must_use]
    pub fn location_of(&self, address: usize) -> Option<&SourceLoc> {
        self.locations.get(address)
    }
}

/// Returns the code part of a line and the 1-indexed column where it starts,
/// or `None` for blank and comment-only lines.
#[must_use]
pub fn code_span(line: &str) -> Option<(&str, usize)> {
    let code = line
        .split_once(COMMENT_CHAR)
        .map_or(line, |(code, _)| code);
    let trimmed = code.trim_start();
    if trimmed.trim_end().is_empty() {
        return None;
    }
    let column = code[..code.len() - trimmed.len()].chars().count() + 1;
    Some((trimmed.trim_end(), column))
}

/// Tokenizes program text read from `file`. Addresses count instructions
/// only; locations keep the line numbers of `text`.
///
/// # Errors
///
/// Returns the first [`LoadError::Decode`] in line order.
pub fn parse_program(file: &Path, text: &str) -> Result<LoadedProgram, LoadError> {
    let mut records = Vec::new();
    let mut locations = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let Some((code, column)) = code_span(line) else {
            continue;
        };
        let location = SourceLoc::new(file.to_path_buf(), idx + 1, column);
        let record = InstructionRecord::parse(code).map_err(|fault| LoadError::Decode {
            location: location.clone(),
            fault,
        })?;
        records.push(record);
        locations.push(location);
    }

    Ok(LoadedProgram {
        program: Program::new(records),
        locations,
    })
}
