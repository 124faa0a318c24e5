//! Shared machine state: register file and run lifecycle.

/// Register set, ownership classes and the shared register file.
pub mod registers;
/// Machine lifecycle state.
pub mod run_state;

pub use registers::{Register, RegisterClass, RegisterFile, RegisterSnapshot, REGISTER_COUNT};
pub use run_state::RunState;
