//! Operand decoding helpers shared by the fetch and execute stages.

#![allow(clippy::pedantic, clippy::nursery, unknown_lints, missing_docs)]

use crate::execute::BusSource;
use crate::fault::Fault;
use crate::isa::InstructionRecord;
use crate::state::{Register, RegisterClass, RegisterFile};

/// Parses a decimal literal: optional sign, digits, nothing else. Values are
/// 32-bit; callers truncate into a word when storing.
pub fn parse_literal(text: &str) -> Result<i32, Fault> {
    text.parse::<i32>()
        .map_err(|_| Fault::malformed_literal(text))
}

/// Truncates a 32-bit value into a 16-bit register word.
pub const fn to_word(value: i32) -> i16 {
    value as i16
}

/// Truncates an instruction address into a 16-bit register word.
pub const fn address_word(address: usize) -> i16 {
    address as u16 as i16
}

/// Borrows exactly `N` operands from a record.
pub fn operands<const N: usize>(record: &InstructionRecord) -> Result<&[String; N], Fault> {
    <&[String; N]>::try_from(record.operands()).map_err(|_| Fault::OperandCount {
        opcode: record.opcode().mnemonic(),
        expected: N,
        found: record.operands().len(),
    })
}

/// Resolves a destination operand in the execution register class.
pub fn destination(name: &str, operation: &'static str) -> Result<Register, Fault> {
    Register::resolve_in(RegisterClass::Execution, name, operation)
}

/// Resolves a register-or-literal source operand. Names outside the
/// execution class are read as literals.
pub fn source_value(registers: &RegisterFile, text: &str) -> Result<(BusSource, i16), Fault> {
    match Register::from_name(text).filter(|reg| reg.class() == RegisterClass::Execution) {
        Some(reg) => Ok((BusSource::Register(reg), registers.read(reg))),
        None => Ok((BusSource::Immediate, to_word(parse_literal(text)?))),
    }
}

#[cfg(test)]
mod tests {
    use super::{address_word, operands, parse_literal, source_value, to_word};
    use crate::execute::BusSource;
    use crate::fault::Fault;
    use crate::isa::InstructionRecord;
    use crate::state::{Register, RegisterFile};

    #[test]
    fn literals_are_strict_decimal() {
        assert_eq!(parse_literal("15"), Ok(15));
        assert_eq!(parse_literal("-5"), Ok(-5));
        assert_eq!(parse_literal("+7"), Ok(7));
        for text in ["", "5x", "0x10", " 5", "AX", "99999999999"] {
            assert_eq!(parse_literal(text), Err(Fault::malformed_literal(text)));
        }
    }

    #[test]
    fn words_truncate_to_sixteen_bits() {
        assert_eq!(to_word(32_768), i16::MIN);
        assert_eq!(to_word(65_537), 1);
        assert_eq!(to_word(-1), -1);
        assert_eq!(address_word(6), 6);
        assert_eq!(address_word(65_535), -1);
    }

    #[test]
    fn operands_enforces_arity() {
        let record = InstructionRecord::parse("MOV AX 1").expect("valid");
        assert_eq!(operands::<2>(&record).map(|[d, s]| (d.as_str(), s.as_str())), Ok(("AX", "1")));
        assert_eq!(
            operands::<1>(&record),
            Err(Fault::OperandCount {
                opcode: "MOV",
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn bus_registers_are_not_readable_as_sources() {
        let registers = RegisterFile::new();
        registers.write(Register::BX, 9);
        assert_eq!(
            source_value(&registers, "BX"),
            Ok((BusSource::Register(Register::BX), 9))
        );
        assert_eq!(
            source_value(&registers, "IP"),
            Err(Fault::malformed_literal("IP"))
        );
        assert_eq!(source_value(&registers, "-3"), Ok((BusSource::Immediate, -3)));
    }
}
