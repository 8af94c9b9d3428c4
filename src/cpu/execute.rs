//! CPU execution engine for the 6502.
//!
//! One step is fetch, decode, resolve, then either execute or describe.
//! [`Cpu::execute_one`] and [`Cpu::trace_one`] share everything up to the
//! last stage, so a trace advances PC exactly as execution would while
//! leaving every other register and all of memory untouched.

use std::fmt;
use log::{trace, warn};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::memory::{CpuBus, MemoryError};
use super::addressing::{self, Resolved, ResolveMode};
use super::decode::{self, AddrMode, Instruction, Mnemonic};
use super::registers::{RegisterError, Registers, StatusFlags};

/// Location of the reset vector.
pub const RESET_VECTOR: u16 = 0xFFFC;

/// Base of the hardware stack page.
const STACK_BASE: u32 = 0x0100;

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLine {
    /// Address the opcode was fetched from.
    pub address: u16,
    /// Raw opcode byte.
    pub opcode: u8,
    /// Raw operand bytes.
    pub operand: Vec<u8>,
    pub instruction: Instruction,
    /// Resolved operand address; for indirect modes, the pointer location.
    pub target: Option<u32>,
}

impl TraceLine {
    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        1 + self.operand.len()
    }

    /// Assembler text, `???` for an unrecognized opcode.
    pub fn text(&self) -> String {
        if !self.instruction.is_known() {
            return Mnemonic::Unknown.name().to_string();
        }
        let operand = self.instruction.mode.format_operand(&self.operand, self.target);
        if operand.is_empty() {
            self.instruction.mnemonic.name().to_string()
        } else {
            format!("{} {}", self.instruction.mnemonic, operand)
        }
    }
}

impl fmt::Display for TraceLine {
    /// `8000  4C 34 12  JMP $1234`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes: Vec<String> = std::iter::once(&self.opcode)
            .chain(&self.operand)
            .map(|b| format!("{:02X}", b))
            .collect();
        write!(f, "{:04X}  {:<8}  {}", self.address, bytes.join(" "), self.text())
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The instruction was applied.
    Executed { address: u16, instruction: Instruction },
    /// The instruction decoded but has no execute semantics here.
    /// PC has moved past it; nothing else changed.
    Unimplemented { address: u16, instruction: Instruction },
    /// Trace mode: the description of the instruction.
    Traced(TraceLine),
}

impl Step {
    /// The trace line, when the step ran in trace mode.
    pub fn trace_line(self) -> Option<TraceLine> {
        match self {
            Step::Traced(line) => Some(line),
            _ => None,
        }
    }
}

/// Everything known about an instruction before it is applied.
struct Fetched {
    address: u16,
    opcode: u8,
    instruction: Instruction,
    resolved: Resolved,
}

impl Fetched {
    /// Effective address with the wrap the instruction applies:
    /// zero-page indexing stays in page zero, absolute indexing wraps at 64 KiB.
    fn effective(&self) -> Result<u32, CpuError> {
        self.wrapped().ok_or(CpuError::MissingOperand {
            address: self.address,
            instruction: self.instruction,
        })
    }

    fn wrapped(&self) -> Option<u32> {
        let addr = self.resolved.address?;
        Some(match self.instruction.mode {
            AddrMode::ZeroPageX | AddrMode::ZeroPageY => addr & 0x00FF,
            AddrMode::AbsoluteX | AddrMode::AbsoluteY | AddrMode::IndirectY => addr & 0xFFFF,
            _ => addr,
        })
    }

    fn into_trace_line(self) -> TraceLine {
        TraceLine {
            address: self.address,
            opcode: self.opcode,
            operand: self.resolved.bytes().to_vec(),
            instruction: self.instruction,
            target: self.wrapped(),
        }
    }
}

/// The processor. It owns its registers and nothing else; memory is
/// reached through whatever [`CpuBus`] the caller lends for a step.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    pub regs: Registers,
}

impl Cpu {
    /// Create a CPU in its power-on state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
        }
    }

    /// Power-on registers, then load PC from the reset vector.
    pub fn reset<B: CpuBus + ?Sized>(&mut self, bus: &B) -> Result<(), CpuError> {
        self.regs.reset();
        self.load_reset_vector(bus)
    }

    /// Load PC from $FFFC/$FFFD.
    pub fn load_reset_vector<B: CpuBus + ?Sized>(&mut self, bus: &B) -> Result<(), CpuError> {
        let vector = bus.read_word(RESET_VECTOR as u32)?;
        self.regs.jump(vector);
        Ok(())
    }

    /// Seed PC, e.g. at $8000 before a disassembly sweep.
    pub fn set_program_counter(&mut self, address: u32) -> Result<(), CpuError> {
        self.regs.set_pc(address)?;
        Ok(())
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.regs.pc()
    }

    /// Run one instruction (`execute = true`) or describe it.
    pub fn step<B: CpuBus + ?Sized>(&mut self, bus: &mut B, execute: bool) -> Result<Step, CpuError> {
        if execute {
            self.execute_one(bus)
        } else {
            self.trace_one(&*bus).map(Step::Traced)
        }
    }

    /// Describe the instruction at PC and move past it.
    ///
    /// Unrecognized opcodes are reported as `???` and consume one byte,
    /// so a sweep can continue through data.
    pub fn trace_one<B: CpuBus + ?Sized>(&mut self, bus: &B) -> Result<TraceLine, CpuError> {
        let fetched = self.fetch(bus, ResolveMode::Trace)?;
        if !fetched.instruction.is_known() {
            warn!("unknown opcode {:02X} at {:04X}", fetched.opcode, fetched.address);
        }
        Ok(fetched.into_trace_line())
    }

    /// Execute the instruction at PC.
    pub fn execute_one<B: CpuBus + ?Sized>(&mut self, bus: &mut B) -> Result<Step, CpuError> {
        let fetched = self.fetch(&*bus, ResolveMode::Execute)?;
        let Fetched { address, opcode, instruction, .. } = fetched;

        if !instruction.is_known() {
            return Err(CpuError::UnknownOpcode { opcode, address });
        }

        trace!("{:04X}  {}  {:?}", address, instruction, self.regs);

        if self.apply(bus, &fetched)? {
            Ok(Step::Executed { address, instruction })
        } else {
            Ok(Step::Unimplemented { address, instruction })
        }
    }

    /// Fetch the opcode at PC, decode it and resolve its operand.
    fn fetch<B: CpuBus + ?Sized>(&mut self, bus: &B, purpose: ResolveMode) -> Result<Fetched, CpuError> {
        let address = self.regs.pc();
        let opcode = bus.read(address as u32)?;
        self.regs.advance_pc();

        let instruction = decode::lookup(opcode);
        let resolved = addressing::resolve(&mut self.regs, bus, instruction.mode, purpose)?;

        Ok(Fetched {
            address,
            opcode,
            instruction,
            resolved,
        })
    }

    /// Apply a decoded instruction. Returns `false` when the instruction
    /// has no execute semantics in this core.
    fn apply<B: CpuBus + ?Sized>(&mut self, bus: &mut B, f: &Fetched) -> Result<bool, CpuError> {
        use Mnemonic::*;

        match f.instruction.mnemonic {
            // Loads and stores
            Lda => {
                let value = self.load(&*bus, f)?;
                self.regs.set_a(value.into())?;
                self.regs.status_mut().set_zn(value);
            }
            Ldx => {
                let value = self.load(&*bus, f)?;
                self.regs.set_x(value.into())?;
                self.regs.status_mut().set_zn(value);
            }
            Ldy => {
                let value = self.load(&*bus, f)?;
                self.regs.set_y(value.into())?;
                self.regs.status_mut().set_zn(value);
            }
            Sta => bus.write(f.effective()?, self.regs.a())?,
            Stx => bus.write(f.effective()?, self.regs.x())?,
            Sty => bus.write(f.effective()?, self.regs.y())?,

            // Transfers
            Tax => self.transfer(self.regs.a(), Register8::X)?,
            Tay => self.transfer(self.regs.a(), Register8::Y)?,
            Txa => self.transfer(self.regs.x(), Register8::A)?,
            Tya => self.transfer(self.regs.y(), Register8::A)?,
            Tsx => self.transfer(self.regs.sp(), Register8::X)?,
            Txs => self.regs.set_sp(self.regs.x().into())?,

            // Stack
            Pha => self.push(bus, self.regs.a())?,
            Php => {
                let value = self.regs.status().to_byte() | StatusFlags::BREAK | StatusFlags::RESERVED;
                self.push(bus, value)?;
            }
            Pla => {
                let value = self.pull(&*bus)?;
                self.regs.set_a(value.into())?;
                self.regs.status_mut().set_zn(value);
            }
            Plp => {
                let value = self.pull(&*bus)?;
                let current = self.regs.status();
                let mut flags = StatusFlags::from_byte(value);
                // B and bit 5 are not stored in the register.
                flags.break_command = current.break_command;
                flags.reserved = current.reserved;
                self.regs.set_status(flags);
            }

            // Flags
            Clc => self.regs.status_mut().carry = false,
            Sec => self.regs.status_mut().carry = true,
            Cli => self.regs.status_mut().interrupt_disable = false,
            Sei => self.regs.status_mut().interrupt_disable = true,
            Clv => self.regs.status_mut().overflow = false,
            Cld => self.regs.status_mut().decimal = false,
            Sed => self.regs.status_mut().decimal = true,

            // Increments and decrements
            Inx => self.transfer(self.regs.x().wrapping_add(1), Register8::X)?,
            Iny => self.transfer(self.regs.y().wrapping_add(1), Register8::Y)?,
            Dex => self.transfer(self.regs.x().wrapping_sub(1), Register8::X)?,
            Dey => self.transfer(self.regs.y().wrapping_sub(1), Register8::Y)?,
            Inc => self.modify(bus, f, |_, v| v.wrapping_add(1))?,
            Dec => self.modify(bus, f, |_, v| v.wrapping_sub(1))?,

            // Arithmetic and logic
            Adc => {
                let value = self.load(&*bus, f)?;
                self.add_with_carry(value)?;
            }
            Sbc => {
                // The 2A03 has no decimal mode; SBC is ADC of the complement.
                let value = self.load(&*bus, f)?;
                self.add_with_carry(!value)?;
            }
            And => {
                let value = self.regs.a() & self.load(&*bus, f)?;
                self.transfer(value, Register8::A)?;
            }
            Ora => {
                let value = self.regs.a() | self.load(&*bus, f)?;
                self.transfer(value, Register8::A)?;
            }
            Eor => {
                let value = self.regs.a() ^ self.load(&*bus, f)?;
                self.transfer(value, Register8::A)?;
            }
            Cmp => {
                let value = self.load(&*bus, f)?;
                self.compare(self.regs.a(), value);
            }
            Cpx => {
                let value = self.load(&*bus, f)?;
                self.compare(self.regs.x(), value);
            }
            Cpy => {
                let value = self.load(&*bus, f)?;
                self.compare(self.regs.y(), value);
            }
            Bit => {
                let value = self.load(&*bus, f)?;
                let a = self.regs.a();
                let status = self.regs.status_mut();
                status.zero = a & value == 0;
                status.negative = value & 0x80 != 0;
                status.overflow = value & 0x40 != 0;
            }

            // Shifts and rotates
            Asl => self.modify(bus, f, |s, v| {
                s.carry = v & 0x80 != 0;
                v << 1
            })?,
            Lsr => self.modify(bus, f, |s, v| {
                s.carry = v & 0x01 != 0;
                v >> 1
            })?,
            Rol => self.modify(bus, f, |s, v| {
                let carry_in = s.carry as u8;
                s.carry = v & 0x80 != 0;
                (v << 1) | carry_in
            })?,
            Ror => self.modify(bus, f, |s, v| {
                let carry_in = s.carry as u8;
                s.carry = v & 0x01 != 0;
                (v >> 1) | (carry_in << 7)
            })?,

            // Control flow
            Jmp => self.regs.set_pc(f.effective()?)?,
            Jsr => {
                let target = f.effective()?;
                let [lo, hi] = self.regs.pc().wrapping_sub(1).to_le_bytes();
                self.push(bus, hi)?;
                self.push(bus, lo)?;
                self.regs.set_pc(target)?;
            }
            Rts => {
                let lo = self.pull(&*bus)?;
                let hi = self.pull(&*bus)?;
                self.regs.jump(u16::from_le_bytes([lo, hi]).wrapping_add(1));
            }
            Bpl | Bmi | Bvc | Bvs | Bcc | Bcs | Bne | Beq => {
                let s = self.regs.status();
                let taken = match f.instruction.mnemonic {
                    Bpl => !s.negative,
                    Bmi => s.negative,
                    Bvc => !s.overflow,
                    Bvs => s.overflow,
                    Bcc => !s.carry,
                    Bcs => s.carry,
                    Bne => !s.zero,
                    _ => s.zero,
                };
                if taken {
                    self.regs.set_pc(f.effective()?)?;
                }
            }

            Nop => {}

            // Interrupt entry and return belong to the interrupt logic.
            Brk | Rti => return Ok(false),

            Unknown => {
                return Err(CpuError::UnknownOpcode {
                    opcode: f.opcode,
                    address: f.address,
                })
            }
        }

        Ok(true)
    }

    /// Read the operand value: the accumulator in accumulator mode,
    /// otherwise the byte at the effective address.
    fn load<B: CpuBus + ?Sized>(&self, bus: &B, f: &Fetched) -> Result<u8, CpuError> {
        if f.instruction.mode == AddrMode::Accumulator {
            return Ok(self.regs.a());
        }
        Ok(bus.read(f.effective()?)?)
    }

    /// Read-modify-write on the accumulator or memory, then set Z and N.
    fn modify<B, F>(&mut self, bus: &mut B, f: &Fetched, op: F) -> Result<(), CpuError>
    where
        B: CpuBus + ?Sized,
        F: FnOnce(&mut StatusFlags, u8) -> u8,
    {
        let result = if f.instruction.mode == AddrMode::Accumulator {
            let a = self.regs.a();
            let result = op(self.regs.status_mut(), a);
            self.regs.set_a(result.into())?;
            result
        } else {
            let addr = f.effective()?;
            let value = bus.read(addr)?;
            let result = op(self.regs.status_mut(), value);
            bus.write(addr, result)?;
            result
        };
        self.regs.status_mut().set_zn(result);
        Ok(())
    }

    /// Load an 8-bit register and set Z and N from the value.
    fn transfer(&mut self, value: u8, to: Register8) -> Result<(), CpuError> {
        match to {
            Register8::A => self.regs.set_a(value.into())?,
            Register8::X => self.regs.set_x(value.into())?,
            Register8::Y => self.regs.set_y(value.into())?,
        }
        self.regs.status_mut().set_zn(value);
        Ok(())
    }

    fn add_with_carry(&mut self, value: u8) -> Result<(), CpuError> {
        let a = self.regs.a();
        let sum = a as u16 + value as u16 + self.regs.status().carry as u16;
        let result = sum as u8;

        let status = self.regs.status_mut();
        status.carry = sum > 0xFF;
        status.overflow = (!(a ^ value) & (a ^ result) & 0x80) != 0;
        status.set_zn(result);

        self.regs.set_a(result.into())?;
        Ok(())
    }

    fn compare(&mut self, register: u8, value: u8) {
        let status = self.regs.status_mut();
        status.carry = register >= value;
        status.set_zn(register.wrapping_sub(value));
    }

    fn push<B: CpuBus + ?Sized>(&mut self, bus: &mut B, value: u8) -> Result<(), CpuError> {
        let sp = self.regs.sp();
        bus.write(STACK_BASE | sp as u32, value)?;
        self.regs.set_sp(sp.wrapping_sub(1).into())?;
        Ok(())
    }

    fn pull<B: CpuBus + ?Sized>(&mut self, bus: &B) -> Result<u8, CpuError> {
        let sp = self.regs.sp().wrapping_add(1);
        self.regs.set_sp(sp.into())?;
        Ok(bus.read(STACK_BASE | sp as u32)?)
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("regs", &self.regs)
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Register8 {
    A,
    X,
    Y,
}

/// Errors that stop the processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("unknown opcode {opcode:#04x} at {address:#06x}")]
    UnknownOpcode { opcode: u8, address: u16 },

    #[error("{instruction} at {address:#06x} has no operand address")]
    MissingOperand { address: u16, instruction: Instruction },
}
