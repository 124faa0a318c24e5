//! Built-in reference program.

use std::path::PathBuf;

use pipeline_core::Program;

use crate::errors::SourceLoc;
use crate::parser::LoadedProgram;

/// Pseudo-path shown in diagnostics for the built-in program.
pub const DEMO_PATH: &str = "<demo>";

/// Loads, adds, jumps over one instruction, scales, then round-trips a value
/// through the stack before halting.
pub const DEMO_PROGRAM: &[&str] = &[
    "MOV AX 15",
    "MOV BX AX",
    "ADD AX BX",
    "SUB AX 5",
    "JMP 6",
    "ADD DX 8",
    "MUL 2",
    "DIV 10",
    "PUSH BX",
    "POP AX",
    "HLT",
];

/// Returns the reference program with one location per line.
///
/// # Errors
///
/// Never fails for the built-in text; the error path exists so callers treat
/// the demo like any loaded file.
pub fn demo_program() -> Result<LoadedProgram, pipeline_core::ProgramError> {
    let program = Program::from_lines(DEMO_PROGRAM.iter().copied())?;
    let locations = (1..=DEMO_PROGRAM.len())
        .map(|line| SourceLoc::new(PathBuf::from(DEMO_PATH), line, 1))
        .collect();
    Ok(LoadedProgram { program, locations })
}

#[cfg(test)]
mod tests {
    use pipeline_core::{Machine, MachineConfig, Register, StopReason};

    use super::{demo_program, DEMO_PROGRAM};

    #[test]
    fn demo_halts_with_expected_registers() {
        let loaded = demo_program().expect("demo tokenizes");
        assert_eq!(loaded.program.len(), DEMO_PROGRAM.len());
        assert_eq!(loaded.location_of(4).map(|loc| loc.line), Some(5));

        let mut machine = Machine::new(loaded.program, MachineConfig::default());
        let outcome = machine.run().expect("demo halts");
        assert_eq!(outcome.stop, StopReason::Halted);
        assert_eq!(outcome.retired, 10);
        assert_eq!(machine.registers().get(Register::AX), 15);
    }
}
