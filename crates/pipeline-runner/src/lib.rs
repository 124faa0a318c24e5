//! Program loading, diagnostics and console tracing for the pipeline machine.

use tracing_subscriber as _;

/// Built-in reference program.
pub mod demo;
/// Located load and runtime diagnostics.
pub mod errors;
/// File reading and tokenization.
pub mod loader;
/// Comment stripping and line tokenization.
pub mod parser;
/// Trace sink that renders events as text.
pub mod printer;
