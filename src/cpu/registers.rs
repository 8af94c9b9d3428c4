//! 6502 register file.
//!
//! The processor has six architectural registers:
//! - A: 8-bit accumulator
//! - X, Y: 8-bit index registers
//! - SP: 8-bit stack pointer (offset into page $01)
//! - PC: 16-bit program counter
//! - P: status flags, eight named bits packed as `NV-BDIZC`
//!
//! Every setter takes a wide integer and rejects values outside the
//! register's width instead of truncating them.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Stack pointer value after power-on.
pub const POWER_ON_SP: u8 = 0xFD;

/// Names a register, for error reporting and generic access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    A,
    X,
    Y,
    Sp,
    Pc,
}

impl Register {
    /// All registers in display order.
    pub const ALL: [Register; 5] = [Register::A, Register::X, Register::Y, Register::Sp, Register::Pc];

    /// Largest value the register can hold.
    pub const fn max_value(self) -> u32 {
        match self {
            Register::Pc => 0xFFFF,
            _ => 0xFF,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::A => "A",
            Register::X => "X",
            Register::Y => "Y",
            Register::Sp => "SP",
            Register::Pc => "PC",
        };
        f.write_str(name)
    }
}

/// The status register as eight named booleans.
///
/// Packed bit order: N(7) V(6) R(5) B(4) D(3) I(2) Z(1) C(0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatusFlags {
    pub negative: bool,
    pub overflow: bool,
    /// Bit 5. Hardware reads it as 1; left settable here.
    pub reserved: bool,
    pub break_command: bool,
    pub decimal: bool,
    pub interrupt_disable: bool,
    pub zero: bool,
    pub carry: bool,
}

impl StatusFlags {
    pub const NEGATIVE: u8 = 1 << 7;
    pub const OVERFLOW: u8 = 1 << 6;
    pub const RESERVED: u8 = 1 << 5;
    pub const BREAK: u8 = 1 << 4;
    pub const DECIMAL: u8 = 1 << 3;
    pub const INTERRUPT_DISABLE: u8 = 1 << 2;
    pub const ZERO: u8 = 1 << 1;
    pub const CARRY: u8 = 1;

    /// Unpack a status byte.
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            negative: byte & Self::NEGATIVE != 0,
            overflow: byte & Self::OVERFLOW != 0,
            reserved: byte & Self::RESERVED != 0,
            break_command: byte & Self::BREAK != 0,
            decimal: byte & Self::DECIMAL != 0,
            interrupt_disable: byte & Self::INTERRUPT_DISABLE != 0,
            zero: byte & Self::ZERO != 0,
            carry: byte & Self::CARRY != 0,
        }
    }

    /// Pack into a status byte.
    pub const fn to_byte(self) -> u8 {
        let mut byte = 0;
        if self.negative { byte |= Self::NEGATIVE; }
        if self.overflow { byte |= Self::OVERFLOW; }
        if self.reserved { byte |= Self::RESERVED; }
        if self.break_command { byte |= Self::BREAK; }
        if self.decimal { byte |= Self::DECIMAL; }
        if self.interrupt_disable { byte |= Self::INTERRUPT_DISABLE; }
        if self.zero { byte |= Self::ZERO; }
        if self.carry { byte |= Self::CARRY; }
        byte
    }

    /// Set Z and N from a result byte.
    #[inline]
    pub fn set_zn(&mut self, value: u8) {
        self.zero = value == 0;
        self.negative = value & 0x80 != 0;
    }
}

impl fmt::Display for StatusFlags {
    /// Upper case for set bits, lower case for clear ones: `Nv-bdIzc`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = [
            (self.negative, 'N'),
            (self.overflow, 'V'),
            (self.reserved, '-'),
            (self.break_command, 'B'),
            (self.decimal, 'D'),
            (self.interrupt_disable, 'I'),
            (self.zero, 'Z'),
            (self.carry, 'C'),
        ];
        for (set, name) in bits {
            let c = if name == '-' {
                if set { '1' } else { '-' }
            } else if set {
                name
            } else {
                name.to_ascii_lowercase()
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// The 6502 register file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,
    status: StatusFlags,
}

impl Registers {
    /// Create a register file in its power-on state.
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: POWER_ON_SP,
            pc: 0,
            status: StatusFlags {
                interrupt_disable: true,
                ..StatusFlags::default()
            },
        }
    }

    /// Return to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn a(&self) -> u8 {
        self.a
    }

    #[inline]
    pub fn x(&self) -> u8 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> u8 {
        self.y
    }

    #[inline]
    pub fn sp(&self) -> u8 {
        self.sp
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline]
    pub fn status(&self) -> StatusFlags {
        self.status
    }

    /// Read any register widened to 16 bits.
    pub fn get(&self, register: Register) -> u16 {
        match register {
            Register::A => self.a as u16,
            Register::X => self.x as u16,
            Register::Y => self.y as u16,
            Register::Sp => self.sp as u16,
            Register::Pc => self.pc,
        }
    }

    /// Assign a register, rejecting values wider than the register.
    pub fn set(&mut self, register: Register, value: u32) -> Result<(), RegisterError> {
        if value > register.max_value() {
            return Err(RegisterError::InvalidRegisterValue { register, value });
        }
        match register {
            Register::A => self.a = value as u8,
            Register::X => self.x = value as u8,
            Register::Y => self.y = value as u8,
            Register::Sp => self.sp = value as u8,
            Register::Pc => self.pc = value as u16,
        }
        Ok(())
    }

    pub fn set_a(&mut self, value: u32) -> Result<(), RegisterError> {
        self.set(Register::A, value)
    }

    pub fn set_x(&mut self, value: u32) -> Result<(), RegisterError> {
        self.set(Register::X, value)
    }

    pub fn set_y(&mut self, value: u32) -> Result<(), RegisterError> {
        self.set(Register::Y, value)
    }

    pub fn set_sp(&mut self, value: u32) -> Result<(), RegisterError> {
        self.set(Register::Sp, value)
    }

    pub fn set_pc(&mut self, value: u32) -> Result<(), RegisterError> {
        self.set(Register::Pc, value)
    }

    /// Replace all eight status flags.
    pub fn set_status(&mut self, flags: StatusFlags) {
        self.status = flags;
    }

    /// Mutable access to the status flags. Any combination is valid.
    #[inline]
    pub fn status_mut(&mut self) -> &mut StatusFlags {
        &mut self.status
    }

    /// Increment the program counter by one, wrapping at $FFFF like the
    /// hardware address lines do. Returns the old value.
    #[inline]
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an already-validated address.
    #[inline]
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} PC:{:04X} [{}]",
            self.a,
            self.x,
            self.y,
            self.status.to_byte(),
            self.sp,
            self.pc,
            self.status
        )
    }
}

/// Register contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid value {value:#x} for register {register}")]
    InvalidRegisterValue { register: Register, value: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BYTE_REGISTERS: [Register; 4] = [Register::A, Register::X, Register::Y, Register::Sp];

    #[test]
    fn test_power_on_state() {
        let regs = Registers::new();
        assert_eq!(regs.a(), 0);
        assert_eq!(regs.sp(), 0xFD);
        assert!(regs.status().interrupt_disable);
        assert_eq!(regs.status().to_byte(), 0x04);
    }

    #[test]
    fn test_every_byte_round_trips() {
        let mut regs = Registers::new();
        for register in BYTE_REGISTERS {
            for value in 0..=255u32 {
                regs.set(register, value).unwrap();
                assert_eq!(regs.get(register) as u32, value);
            }
        }
    }

    #[test]
    fn test_wide_value_is_rejected() {
        let mut regs = Registers::new();
        regs.set_x(0x12).unwrap();
        let err = regs.set_x(0x100).unwrap_err();
        assert_eq!(
            err,
            RegisterError::InvalidRegisterValue { register: Register::X, value: 0x100 }
        );
        // Failed assignment leaves the old value.
        assert_eq!(regs.x(), 0x12);
        assert!(err.to_string().contains("register X"));
    }

    #[test]
    fn test_pc_limits() {
        let mut regs = Registers::new();
        regs.set_pc(0xFFFF).unwrap();
        assert_eq!(regs.pc(), 0xFFFF);
        assert!(regs.set_pc(0x1_0000).is_err());
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.jump(0xFFFF);
        assert_eq!(regs.advance_pc(), 0xFFFF);
        assert_eq!(regs.pc(), 0x0000);
    }

    #[test]
    fn test_all_flag_combinations_round_trip() {
        let mut regs = Registers::new();
        for byte in 0..=255u8 {
            let flags = StatusFlags::from_byte(byte);
            assert_eq!(flags.to_byte(), byte);
            regs.set_status(flags);
            assert_eq!(regs.status(), flags);
        }
    }

    #[test]
    fn test_flag_bit_order() {
        let flags = StatusFlags { negative: true, carry: true, ..StatusFlags::default() };
        assert_eq!(flags.to_byte(), 0b1000_0001);
        assert_eq!(flags.to_string(), "Nv-bdizC");
    }

    #[test]
    fn test_set_zn() {
        let mut flags = StatusFlags::default();
        flags.set_zn(0);
        assert!(flags.zero && !flags.negative);
        flags.set_zn(0x80);
        assert!(!flags.zero && flags.negative);
    }

    proptest! {
        #[test]
        fn prop_byte_register_round_trip(index in 0usize..4, value in 0u32..=0xFF) {
            let mut regs = Registers::new();
            let register = BYTE_REGISTERS[index];
            regs.set(register, value).unwrap();
            prop_assert_eq!(regs.get(register) as u32, value);
        }

        #[test]
        fn prop_byte_register_rejects_wide(index in 0usize..4, value in 0x100u32..) {
            let mut regs = Registers::new();
            prop_assert!(regs.set(BYTE_REGISTERS[index], value).is_err());
        }

        #[test]
        fn prop_pc_round_trip(value in 0u32..=0xFFFF) {
            let mut regs = Registers::new();
            regs.set_pc(value).unwrap();
            prop_assert_eq!(regs.pc() as u32, value);
        }

        #[test]
        fn prop_pc_rejects_wide(value in 0x1_0000u32..) {
            let mut regs = Registers::new();
            prop_assert!(regs.set_pc(value).is_err());
        }
    }
}
