//! Located diagnostics for program loading and runtime faults.
//!
//! Every diagnostic renders to stderr in the usual compiler style:
//! ```text
//! demo.p86:10:5: error: invalid instruction: LEA
//! ```

use std::fmt;
use std::path::PathBuf;

use pipeline_core::Fault;
use thiserror::Error;

/// A source location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    /// File path.
    pub file: PathBuf,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
}

impl SourceLoc {
    /// Creates a new source location.
    #[must_use]
    pub const fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }

    /// Formats as `file:line:column`.
    #[must_use]
    pub fn format_location(&self) -> String {
        format!("{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_location())
    }
}

/// Failure to turn an input file into a runnable program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The input could not be read.
    #[error("{}: I/O error: {message}", path.display())]
    Io {
        /// Input path.
        path: PathBuf,
        /// Rendered I/O error.
        message: String,
    },
    /// A line failed to tokenize.
    #[error("{location}: {fault}")]
    Decode {
        /// Location of the offending line.
        location: SourceLoc,
        /// Tokenizer fault.
        #[source]
        fault: Fault,
    },
}

impl LoadError {
    /// Returns the source location, if the error has one.
    #[must_use]
    pub const fn location(&self) -> Option<&SourceLoc> {
        match self {
            Self::Io { .. } => None,
            Self::Decode { location, .. } => Some(location),
        }
    }

    /// Formats the error for stderr output.
    #[must_use]
    pub fn format_for_stderr(&self) -> String {
        match self {
            Self::Io { path, message } => {
                format!("{}: error: I/O error: {message}", path.display())
            }
            Self::Decode { location, fault } => format!("{location}: error: {fault}"),
        }
    }
}

/// Formats a runtime fault, located at the faulting instruction when known.
#[must_use]
pub fn format_fault_for_stderr(fault: &Fault, location: Option<&SourceLoc>) -> String {
    location.map_or_else(
        || format!("error: {fault}"),
        |loc| format!("{loc}: error: {fault}"),
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pipeline_core::Fault;

    use super::{format_fault_for_stderr, LoadError, SourceLoc};

    #[test]
    fn source_loc_format() {
        let loc = SourceLoc::new(PathBuf::from("main.p86"), 10, 5);
        assert_eq!(loc.format_location(), "main.p86:10:5");
        assert_eq!(loc.to_string(), "main.p86:10:5");
    }

    #[test]
    fn decode_error_renders_compiler_style() {
        let error = LoadError::Decode {
            location: SourceLoc::new(PathBuf::from("demo.p86"), 7, 3),
            fault: Fault::UnknownOpcode {
                mnemonic: "LEA".into(),
            },
        };
        assert_eq!(
            error.format_for_stderr(),
            "demo.p86:7:3: error: invalid instruction: LEA"
        );
        assert_eq!(error.to_string(), "demo.p86:7:3: invalid instruction: LEA");
        assert_eq!(error.location().map(|loc| loc.line), Some(7));
    }

    #[test]
    fn io_error_has_no_location() {
        let error = LoadError::Io {
            path: PathBuf::from("missing.p86"),
            message: "not found".into(),
        };
        assert_eq!(error.location(), None);
        assert_eq!(
            error.format_for_stderr(),
            "missing.p86: error: I/O error: not found"
        );
    }

    #[test]
    fn runtime_faults_use_the_same_shape() {
        let loc = SourceLoc::new(PathBuf::from("a.p86"), 2, 1);
        assert_eq!(
            format_fault_for_stderr(&Fault::DivideByZero, Some(&loc)),
            "a.p86:2:1: error: division by zero"
        );
        assert_eq!(
            format_fault_for_stderr(&Fault::StackUnderflow, None),
            "error: stack underflow"
        );
    }
}
