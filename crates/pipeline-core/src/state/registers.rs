use parking_lot::Mutex;

use crate::fault::Fault;

/// Number of named registers across all classes.
pub const REGISTER_COUNT: usize = 15;

/// Ownership class of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterClass {
    /// General-purpose, pointer and flag registers written by the execute unit.
    Execution,
    /// Segment registers and `IP`, written by the fetch unit.
    Bus,
    /// The instruction register held by the coordinating machine.
    Control,
}

impl RegisterClass {
    /// Returns true when `name` names a register of this class.
    #[must_use]
    pub fn contains(self, name: &str) -> bool {
        Register::from_name(name).is_some_and(|reg| reg.class() == self)
    }

    /// Registers of this class in declaration order.
    pub fn registers(self) -> impl Iterator<Item = Register> {
        Register::ALL.into_iter().filter(move |reg| reg.class() == self)
    }
}

/// Named 16-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs, clippy::upper_case_acronyms)]
pub enum Register {
    AX = 0,
    BX = 1,
    CX = 2,
    DX = 3,
    SP = 4,
    BP = 5,
    SI = 6,
    DI = 7,
    FLAGS = 8,
    CS = 9,
    DS = 10,
    SS = 11,
    ES = 12,
    IP = 13,
    IR = 14,
}

impl Register {
    /// Every register, execution class first, then bus, then control.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::AX,
        Self::BX,
        Self::CX,
        Self::DX,
        Self::SP,
        Self::BP,
        Self::SI,
        Self::DI,
        Self::FLAGS,
        Self::CS,
        Self::DS,
        Self::SS,
        Self::ES,
        Self::IP,
        Self::IR,
    ];

    /// Returns the array index for this register.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the register name as written in programs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AX => "AX",
            Self::BX => "BX",
            Self::CX => "CX",
            Self::DX => "DX",
            Self::SP => "SP",
            Self::BP => "BP",
            Self::SI => "SI",
            Self::DI => "DI",
            Self::FLAGS => "FLAGS",
            Self::CS => "CS",
            Self::DS => "DS",
            Self::SS => "SS",
            Self::ES => "ES",
            Self::IP => "IP",
            Self::IR => "IR",
        }
    }

    /// Returns the owning class.
    #[must_use]
    pub const fn class(self) -> RegisterClass {
        match self {
            Self::AX
            | Self::BX
            | Self::CX
            | Self::DX
            | Self::SP
            | Self::BP
            | Self::SI
            | Self::DI
            | Self::FLAGS => RegisterClass::Execution,
            Self::CS | Self::DS | Self::SS | Self::ES | Self::IP => RegisterClass::Bus,
            Self::IR => RegisterClass::Control,
        }
    }

    /// Resolves a register by exact name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reg| reg.name() == name)
    }

    /// Resolves a register by name within one class.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownRegister`] tagged with `operation` when the name
    /// is unknown or belongs to another class.
    pub fn resolve_in(
        class: RegisterClass,
        name: &str,
        operation: &'static str,
    ) -> Result<Self, Fault> {
        Self::from_name(name)
            .filter(|reg| reg.class() == class)
            .ok_or_else(|| Fault::unknown_register(name, operation))
    }
}

/// Point-in-time copy of every register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterSnapshot {
    values: [i16; REGISTER_COUNT],
}

impl RegisterSnapshot {
    /// Reads one register from the snapshot.
    #[must_use]
    pub const fn get(&self, reg: Register) -> i16 {
        self.values[reg.index()]
    }

    /// Iterates `(register, value)` pairs in [`Register::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, i16)> + '_ {
        Register::ALL.into_iter().map(|reg| (reg, self.get(reg)))
    }

    /// Iterates the registers of one class.
    pub fn class(&self, class: RegisterClass) -> impl Iterator<Item = (Register, i16)> + '_ {
        self.iter().filter(move |(reg, _)| reg.class() == class)
    }
}

/// Shared register file. The register set is fixed; names outside it are
/// rejected rather than created.
#[derive(Debug, Default)]
pub struct RegisterFile {
    values: Mutex<[i16; REGISTER_COUNT]>,
}

impl RegisterFile {
    /// Creates a register file with every register cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `name` names a register of any class.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        Register::from_name(name).is_some()
    }

    /// Reads a register by name.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownRegister`] for an unregistered name.
    pub fn get(&self, name: &str) -> Result<i16, Fault> {
        let reg = Register::from_name(name).ok_or_else(|| Fault::unknown_register(name, "read"))?;
        Ok(self.read(reg))
    }

    /// Writes a register by name.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownRegister`] for an unregistered name.
    pub fn set(&self, name: &str, value: i16) -> Result<(), Fault> {
        let reg =
            Register::from_name(name).ok_or_else(|| Fault::unknown_register(name, "write"))?;
        self.write(reg, value);
        Ok(())
    }

    /// Reads a register.
    #[must_use]
    pub fn read(&self, reg: Register) -> i16 {
        self.values.lock()[reg.index()]
    }

    /// Writes a register.
    pub fn write(&self, reg: Register, value: i16) {
        self.values.lock()[reg.index()] = value;
    }

    /// Applies `update` to a register under one lock acquisition and returns
    /// the stored value.
    pub fn update(&self, reg: Register, update: impl FnOnce(i16) -> i16) -> i16 {
        let mut values = self.values.lock();
        let slot = &mut values[reg.index()];
        *slot = update(*slot);
        *slot
    }

    /// Copies every register.
    #[must_use]
    pub fn snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            values: *self.values.lock(),
        }
    }
}
