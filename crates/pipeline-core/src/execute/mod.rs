//! Execute stage: opcode dispatch and instruction handlers.
//!
//! Handlers validate every operand before touching shared state, so a
//! faulting instruction leaves registers and the program store unchanged.
//! `FLAGS` parity and `IR` latching belong to the execute unit, not to the
//! handlers.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    unknown_lints,
    missing_docs
)]

mod bus;
pub(crate) mod helpers;
mod unit;

pub use bus::{BusCycle, BusSource};
pub(crate) use unit::ExecuteUnit;

use helpers::{destination, operands, parse_literal, source_value, to_word};

use crate::fault::Fault;
use crate::isa::{InstructionRecord, Opcode};
use crate::state::{Register, RegisterFile};
use crate::store::ProgramStore;

/// Whether the execute stage keeps going after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Halt,
}

/// Committed effect of one instruction, reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExecuteEffect {
    pub flow: Flow,
    pub bus: Option<BusCycle>,
}

impl ExecuteEffect {
    const fn transfer(bus: BusCycle) -> Self {
        Self {
            flow: Flow::Continue,
            bus: Some(bus),
        }
    }

    const fn quiet() -> Self {
        Self {
            flow: Flow::Continue,
            bus: None,
        }
    }
}

/// Shared state a handler may touch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExecuteContext<'a> {
    pub registers: &'a RegisterFile,
    pub store: &'a ProgramStore,
}

/// Dispatches one instruction to its handler.
pub(crate) fn execute_instruction(
    record: &InstructionRecord,
    ctx: ExecuteContext<'_>,
) -> Result<ExecuteEffect, Fault> {
    match record.opcode() {
        Opcode::Mov => execute_mov(record, ctx),
        Opcode::Add => execute_add(record, ctx),
        Opcode::Sub => execute_sub(record, ctx),
        Opcode::Mul => execute_mul(record, ctx),
        Opcode::Div => execute_div(record, ctx),
        Opcode::Push => execute_push(record, ctx),
        Opcode::Pop => execute_pop(record, ctx),
        Opcode::Jmp => execute_jmp(record, ctx),
        Opcode::Hlt => Ok(ExecuteEffect {
            flow: Flow::Halt,
            bus: None,
        }),
    }
}

fn execute_mov(record: &InstructionRecord, ctx: ExecuteContext<'_>) -> Result<ExecuteEffect, Fault> {
    let [dest, src] = operands::<2>(record)?;
    let dest = destination(dest, "MOV")?;
    let (source, value) = source_value(ctx.registers, src)?;
    ctx.registers.write(dest, value);
    Ok(ExecuteEffect::transfer(BusCycle::transfer(source, dest, value)))
}

fn execute_add(record: &InstructionRecord, ctx: ExecuteContext<'_>) -> Result<ExecuteEffect, Fault> {
    let [dest, src] = operands::<2>(record)?;
    let dest = destination(dest, "ADD")?;
    let (source, value) = source_value(ctx.registers, src)?;
    ctx.registers.update(dest, |current| current.wrapping_add(value));
    Ok(ExecuteEffect::transfer(BusCycle::transfer(source, dest, value)))
}

/// `SUB` only takes a literal source. A register name in the source position
/// is a malformed literal, and the literal is checked before the destination.
fn execute_sub(record: &InstructionRecord, ctx: ExecuteContext<'_>) -> Result<ExecuteEffect, Fault> {
    let [dest, src] = operands::<2>(record)?;
    let value = to_word(parse_literal(src)?);
    let dest = destination(dest, "SUB")?;
    ctx.registers.update(dest, |current| current.wrapping_sub(value));
    Ok(ExecuteEffect::transfer(BusCycle::transfer(
        BusSource::Immediate,
        dest,
        value,
    )))
}

fn execute_mul(record: &InstructionRecord, ctx: ExecuteContext<'_>) -> Result<ExecuteEffect, Fault> {
    let [src] = operands::<1>(record)?;
    let value = to_word(parse_literal(src)?);
    ctx.registers
        .update(Register::AX, |current| current.wrapping_mul(value));
    Ok(ExecuteEffect::transfer(BusCycle::transfer(
        BusSource::Immediate,
        Register::AX,
        value,
    )))
}

fn execute_div(record: &InstructionRecord, ctx: ExecuteContext<'_>) -> Result<ExecuteEffect, Fault> {
    let [src] = operands::<1>(record)?;
    let divisor = parse_literal(src)?;
    if divisor == 0 {
        return Err(Fault::DivideByZero);
    }
    ctx.registers.update(Register::AX, |current| {
        to_word(i32::from(current) / divisor)
    });
    Ok(ExecuteEffect::transfer(BusCycle::transfer(
        BusSource::Immediate,
        Register::AX,
        to_word(divisor),
    )))
}

fn execute_push(record: &InstructionRecord, ctx: ExecuteContext<'_>) -> Result<ExecuteEffect, Fault> {
    let [reg] = operands::<1>(record)?;
    let reg = destination(reg, "PUSH")?;
    ctx.store.push(ctx.registers.read(reg));
    ctx.registers.update(Register::SP, |sp| sp.wrapping_add(1));
    Ok(ExecuteEffect::quiet())
}

fn execute_pop(record: &InstructionRecord, ctx: ExecuteContext<'_>) -> Result<ExecuteEffect, Fault> {
    let [reg] = operands::<1>(record)?;
    let reg = destination(reg, "POP")?;
    if ctx.registers.read(Register::SP) <= 0 {
        return Err(Fault::StackUnderflow);
    }
    let value = ctx.store.pop().ok_or(Fault::StackUnderflow)?;
    ctx.registers.update(Register::SP, |sp| sp.wrapping_sub(1));
    ctx.registers.write(reg, value);
    Ok(ExecuteEffect::quiet())
}

/// Redirection already happened at fetch; this only validates the target.
fn execute_jmp(record: &InstructionRecord, ctx: ExecuteContext<'_>) -> Result<ExecuteEffect, Fault> {
    let [target] = operands::<1>(record)?;
    let target = parse_literal(target)?;
    let len = ctx.store.program_len();
    if target < 0 || target as usize >= len {
        return Err(Fault::InvalidJumpTarget {
            target: i64::from(target),
            len,
        });
    }
    Ok(ExecuteEffect::quiet())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{execute_instruction, ExecuteContext, Flow};
    use crate::execute::{BusCycle, BusSource};
    use crate::fault::Fault;
    use crate::isa::{InstructionRecord, Program};
    use crate::state::{Register, RegisterFile};
    use crate::store::ProgramStore;

    struct Fixture {
        registers: RegisterFile,
        store: ProgramStore,
    }

    impl Fixture {
        fn new(program: &str) -> Self {
            Self {
                registers: RegisterFile::new(),
                store: ProgramStore::new(Program::parse(program).expect("valid program")),
            }
        }

        fn run(&self, line: &str) -> Result<super::ExecuteEffect, Fault> {
            let record = InstructionRecord::parse(line).expect("valid line");
            execute_instruction(
                &record,
                ExecuteContext {
                    registers: &self.registers,
                    store: &self.store,
                },
            )
        }
    }

    #[test]
    fn mov_reads_register_or_literal_and_reports_bus_cycle() {
        let fx = Fixture::new("HLT");
        let effect = fx.run("MOV AX 15").expect("mov literal");
        assert_eq!(
            effect.bus,
            Some(BusCycle::transfer(BusSource::Immediate, Register::AX, 15))
        );
        let effect = fx.run("MOV BX AX").expect("mov register");
        assert_eq!(
            effect.bus,
            Some(BusCycle::transfer(
                BusSource::Register(Register::AX),
                Register::BX,
                15
            ))
        );
        assert_eq!(fx.registers.read(Register::BX), 15);
    }

    #[rstest]
    #[case("ADD AX 1", i16::MAX, i16::MIN)]
    #[case("SUB AX 1", i16::MIN, i16::MAX)]
    #[case("MUL 2", 20_000, -25_536)]
    #[case("DIV 10", 15, 1)]
    #[case("DIV -1", i16::MIN, i16::MIN)]
    #[case("DIV 4", -7, -1)]
    fn arithmetic_wraps_into_sixteen_bits(
        #[case] line: &str,
        #[case] before: i16,
        #[case] after: i16,
    ) {
        let fx = Fixture::new("HLT");
        fx.registers.write(Register::AX, before);
        fx.run(line).expect("arithmetic succeeds");
        assert_eq!(fx.registers.read(Register::AX), after);
    }

    #[test]
    fn sub_rejects_register_source_as_malformed_literal() {
        let fx = Fixture::new("HLT");
        assert_eq!(fx.run("SUB AX BX"), Err(Fault::malformed_literal("BX")));
        assert_eq!(
            fx.run("SUB QX 1"),
            Err(Fault::unknown_register("QX", "SUB"))
        );
    }

    #[rstest]
    #[case("MUL x", "x")]
    #[case("MUL AX", "AX")]
    #[case("DIV AX", "AX")]
    #[case("DIV 1e3", "1e3")]
    fn mul_and_div_take_literals_only(#[case] line: &str, #[case] text: &str) {
        let fx = Fixture::new("HLT");
        fx.registers.write(Register::AX, 12);
        assert_eq!(fx.run(line).err(), Some(Fault::malformed_literal(text)));
        assert_eq!(fx.registers.read(Register::AX), 12);
    }

    #[test]
    fn destinations_must_be_execution_registers() {
        let fx = Fixture::new("HLT");
        assert_eq!(fx.run("MOV IP 3"), Err(Fault::unknown_register("IP", "MOV")));
        assert_eq!(fx.run("ADD CS 3"), Err(Fault::unknown_register("CS", "ADD")));
        assert_eq!(fx.run("PUSH IR"), Err(Fault::unknown_register("IR", "PUSH")));
        assert_eq!(fx.run("POP XX"), Err(Fault::unknown_register("XX", "POP")));
    }

    #[test]
    fn div_by_zero_leaves_ax_untouched() {
        let fx = Fixture::new("HLT");
        fx.registers.write(Register::AX, 30);
        assert_eq!(fx.run("DIV 0"), Err(Fault::DivideByZero));
        assert_eq!(fx.registers.read(Register::AX), 30);
    }

    #[test]
    fn push_then_pop_restores_register_and_stack_pointer() {
        let fx = Fixture::new("HLT");
        fx.registers.write(Register::BX, -4);
        fx.run("PUSH BX").expect("push");
        assert_eq!(fx.registers.read(Register::SP), 1);
        assert_eq!(fx.store.stack_depth(), 1);
        fx.registers.write(Register::BX, 0);
        fx.run("POP BX").expect("pop");
        assert_eq!(fx.registers.read(Register::BX), -4);
        assert_eq!(fx.registers.read(Register::SP), 0);
        assert_eq!(fx.store.stack_depth(), 0);
    }

    #[test]
    fn pop_underflow_changes_nothing() {
        let fx = Fixture::new("HLT");
        fx.registers.write(Register::AX, 7);
        assert_eq!(fx.run("POP AX"), Err(Fault::StackUnderflow));
        assert_eq!(fx.registers.read(Register::AX), 7);
        assert_eq!(fx.registers.read(Register::SP), 0);
        assert_eq!(fx.store.len(), 1);

        // A forged stack pointer cannot reach into the instruction region.
        fx.registers.write(Register::SP, 3);
        assert_eq!(fx.run("POP AX"), Err(Fault::StackUnderflow));
        assert_eq!(fx.registers.read(Register::SP), 3);
        assert_eq!(fx.store.len(), 1);
    }

    #[rstest]
    #[case("JMP 0", None)]
    #[case("JMP 2", None)]
    #[case("JMP 3", Some(Fault::InvalidJumpTarget { target: 3, len: 3 }))]
    #[case("JMP -1", Some(Fault::InvalidJumpTarget { target: -1, len: 3 }))]
    #[case("JMP end", Some(Fault::malformed_literal("end")))]
    fn jmp_validates_against_instruction_region(
        #[case] line: &str,
        #[case] fault: Option<Fault>,
    ) {
        let fx = Fixture::new("MOV AX 1\nJMP 0\nHLT");
        assert_eq!(fx.run(line).err(), fault);
    }

    #[test]
    fn hlt_requests_halt_without_bus_cycle() {
        let fx = Fixture::new("HLT");
        let effect = fx.run("HLT").expect("hlt never faults");
        assert_eq!(effect.flow, Flow::Halt);
        assert_eq!(effect.bus, None);
    }
}
