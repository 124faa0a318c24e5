//! Runs the reference program and prints each retirement with its bus cycle.

use std::process::ExitCode;

use parking_lot as _;
use pipeline_core::{Machine, MachineConfig, Register, TraceEvent};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const PROGRAM: &[&str] = &[
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

fn main() -> ExitCode {
    let program = match pipeline_core::Program::from_lines(PROGRAM) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };
    let mut machine = Machine::new(program, MachineConfig::default());
    let mut events: Vec<TraceEvent> = Vec::new();
    let outcome = machine.run_traced(&mut events);

    for event in &events {
        if let TraceEvent::Retired {
            serial,
            address,
            record,
            bus,
            ..
        } = event
        {
            match bus {
                Some(cycle) => println!(
                    "#{serial:<3} {address:>3}  {record} {} -> {} data={}",
                    cycle.source,
                    cycle.destination.name(),
                    cycle.data
                ),
                None => println!("#{serial:<3} {address:>3}  {record}"),
            }
        }
    }

    let regs = machine.registers();
    for reg in [Register::AX, Register::BX, Register::CX, Register::DX] {
        println!("{:<5} {}", reg.name(), regs.get(reg));
    }

    match outcome {
        Ok(outcome) => {
            println!("stopped: {:?} after {} instructions", outcome.stop, outcome.retired);
            ExitCode::SUCCESS
        }
        Err(fault) => {
            eprintln!("fault: {fault}");
            ExitCode::FAILURE
        }
    }
}
