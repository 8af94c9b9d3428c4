//! Operand resolution.
//!
//! Given an addressing mode, consume the operand bytes at PC through the
//! bus and compute the effective address. Operand consumption is the
//! same whether the caller is executing or tracing, so a trace reports
//! exactly the instruction lengths execution would see. The only
//! difference is in the indirect modes: execution follows the pointer,
//! a trace reports where the pointer lives.

use crate::memory::{CpuBus, MemoryError};
use super::decode::AddrMode;
use super::registers::Registers;

/// Why operands are being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Follow pointers to the final target.
    Execute,
    /// Report pointer locations without following them.
    Trace,
}

/// A resolved operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolved {
    /// Effective address, or `None` for modes without a memory operand.
    ///
    /// Indexed sums are not wrapped here: `$FF,X` with X=1 gives $100.
    pub address: Option<u32>,
    operand: [u8; 2],
    len: u8,
}

impl Resolved {
    /// The raw operand bytes that were consumed.
    pub fn bytes(&self) -> &[u8] {
        &self.operand[..self.len as usize]
    }

    fn at(mut self, address: u32) -> Self {
        self.address = Some(address);
        self
    }
}

struct Fetcher<'r, 'b, B: ?Sized> {
    regs: &'r mut Registers,
    bus: &'b B,
    resolved: Resolved,
}

impl<B: CpuBus + ?Sized> Fetcher<'_, '_, B> {
    /// Read the byte at PC and step past it.
    fn byte(&mut self) -> Result<u8, MemoryError> {
        let value = self.bus.read(self.regs.pc() as u32)?;
        self.regs.advance_pc();
        self.resolved.operand[self.resolved.len as usize] = value;
        self.resolved.len += 1;
        Ok(value)
    }

    fn word(&mut self) -> Result<u16, MemoryError> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }
}

/// Read a pointer stored in the zero page; the high byte wraps to $00.
fn zero_page_pointer<B: CpuBus + ?Sized>(bus: &B, pointer: u8) -> Result<u16, MemoryError> {
    let lo = bus.read(pointer as u32)?;
    let hi = bus.read(pointer.wrapping_add(1) as u32)?;
    Ok(u16::from_le_bytes([lo, hi]))
}

/// Read an indirect jump vector. The high byte comes from the same page
/// as the low byte, matching the 6502's behavior for pointers at $xxFF.
fn jump_vector<B: CpuBus + ?Sized>(bus: &B, pointer: u16) -> Result<u16, MemoryError> {
    let lo = bus.read(pointer as u32)?;
    let hi_addr = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
    let hi = bus.read(hi_addr as u32)?;
    Ok(u16::from_le_bytes([lo, hi]))
}

/// Consume the operand for `mode` at PC and compute its effective address.
pub fn resolve<B: CpuBus + ?Sized>(
    regs: &mut Registers,
    bus: &B,
    mode: AddrMode,
    purpose: ResolveMode,
) -> Result<Resolved, MemoryError> {
    let x = regs.x() as u32;
    let y = regs.y() as u32;
    let mut fetch = Fetcher {
        regs,
        bus,
        resolved: Resolved::default(),
    };

    let resolved = match mode {
        AddrMode::Implied | AddrMode::Accumulator | AddrMode::Unknown => fetch.resolved,

        AddrMode::Immediate => {
            let here = fetch.regs.pc() as u32;
            fetch.byte()?;
            fetch.resolved.at(here)
        }

        AddrMode::ZeroPage => {
            let zp = fetch.byte()? as u32;
            fetch.resolved.at(zp)
        }

        AddrMode::ZeroPageX => {
            let zp = fetch.byte()? as u32;
            fetch.resolved.at(zp + x)
        }

        AddrMode::ZeroPageY => {
            let zp = fetch.byte()? as u32;
            fetch.resolved.at(zp + y)
        }

        AddrMode::Relative => {
            let offset = fetch.byte()? as i8;
            let target = fetch.regs.pc().wrapping_add_signed(offset as i16);
            fetch.resolved.at(target as u32)
        }

        AddrMode::Absolute => {
            let addr = fetch.word()? as u32;
            fetch.resolved.at(addr)
        }

        AddrMode::AbsoluteX => {
            let addr = fetch.word()? as u32;
            fetch.resolved.at(addr + x)
        }

        AddrMode::AbsoluteY => {
            let addr = fetch.word()? as u32;
            fetch.resolved.at(addr + y)
        }

        AddrMode::Indirect => {
            let pointer = fetch.word()?;
            let addr = match purpose {
                ResolveMode::Execute => jump_vector(bus, pointer)?,
                ResolveMode::Trace => pointer,
            };
            fetch.resolved.at(addr as u32)
        }

        AddrMode::IndirectX => {
            let zp = fetch.byte()?;
            let addr = match purpose {
                ResolveMode::Execute => zero_page_pointer(bus, zp.wrapping_add(x as u8))? as u32,
                ResolveMode::Trace => zp as u32,
            };
            fetch.resolved.at(addr)
        }

        AddrMode::IndirectY => {
            let zp = fetch.byte()?;
            let addr = match purpose {
                ResolveMode::Execute => zero_page_pointer(bus, zp)? as u32 + y,
                ResolveMode::Trace => zp as u32,
            };
            fetch.resolved.at(addr)
        }
    };

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;

    fn setup(pc: u16, bytes: &[u8]) -> (Registers, FlatMemory) {
        let mut regs = Registers::new();
        regs.jump(pc);
        let mut mem = FlatMemory::new();
        mem.load(pc, bytes).unwrap();
        (regs, mem)
    }

    #[test]
    fn test_absolute_little_endian() {
        let (mut regs, mem) = setup(0x0600, &[0x34, 0x12]);
        let r = resolve(&mut regs, &mem, AddrMode::Absolute, ResolveMode::Execute).unwrap();
        assert_eq!(r.address, Some(0x1234));
        assert_eq!(r.bytes(), &[0x34, 0x12]);
        assert_eq!(regs.pc(), 0x0602);
    }

    #[test]
    fn test_indirect_diverges_by_purpose() {
        let (mut exec_regs, mut mem) = setup(0x0600, &[0x00, 0x80]);
        mem.load(0x8000, &[0xCD, 0xAB]).unwrap();
        let mut trace_regs = exec_regs.clone();

        let exec = resolve(&mut exec_regs, &mem, AddrMode::Indirect, ResolveMode::Execute).unwrap();
        let trace = resolve(&mut trace_regs, &mem, AddrMode::Indirect, ResolveMode::Trace).unwrap();

        assert_eq!(exec.address, Some(0xABCD));
        assert_eq!(trace.address, Some(0x8000));
        assert_eq!(exec_regs.pc(), 0x0602);
        assert_eq!(trace_regs.pc(), exec_regs.pc());
    }

    #[test]
    fn test_indirect_page_wrap() {
        let (mut regs, mut mem) = setup(0x0600, &[0xFF, 0x02]);
        mem.load(0x02FF, &[0x34]).unwrap();
        mem.load(0x0200, &[0x12]).unwrap();
        mem.load(0x0300, &[0x99]).unwrap();
        let r = resolve(&mut regs, &mem, AddrMode::Indirect, ResolveMode::Execute).unwrap();
        assert_eq!(r.address, Some(0x1234));
    }

    #[test]
    fn test_no_operand_modes() {
        for mode in [AddrMode::Implied, AddrMode::Accumulator, AddrMode::Unknown] {
            let (mut regs, mem) = setup(0x0600, &[0xAA]);
            let r = resolve(&mut regs, &mem, mode, ResolveMode::Execute).unwrap();
            assert_eq!(r.address, None);
            assert!(r.bytes().is_empty());
            assert_eq!(regs.pc(), 0x0600);
        }
    }

    #[test]
    fn test_immediate_points_at_operand() {
        let (mut regs, mem) = setup(0x0600, &[0x42]);
        let r = resolve(&mut regs, &mem, AddrMode::Immediate, ResolveMode::Execute).unwrap();
        assert_eq!(r.address, Some(0x0600));
        assert_eq!(regs.pc(), 0x0601);
    }

    #[test]
    fn test_indexed_sums_are_not_wrapped() {
        let (mut regs, mem) = setup(0x0600, &[0xFF]);
        regs.set_x(0x02).unwrap();
        let r = resolve(&mut regs, &mem, AddrMode::ZeroPageX, ResolveMode::Execute).unwrap();
        assert_eq!(r.address, Some(0x0101));

        let (mut regs, mem) = setup(0x0600, &[0xFF, 0xFF]);
        regs.set_y(0x01).unwrap();
        let r = resolve(&mut regs, &mem, AddrMode::AbsoluteY, ResolveMode::Execute).unwrap();
        assert_eq!(r.address, Some(0x1_0000));
    }

    #[test]
    fn test_relative_targets() {
        let (mut regs, mem) = setup(0x0600, &[0xFE]);
        let r = resolve(&mut regs, &mem, AddrMode::Relative, ResolveMode::Trace).unwrap();
        assert_eq!(r.address, Some(0x05FF));

        let (mut regs, mem) = setup(0x0600, &[0x10]);
        let r = resolve(&mut regs, &mem, AddrMode::Relative, ResolveMode::Execute).unwrap();
        assert_eq!(r.address, Some(0x0611));
    }

    #[test]
    fn test_indirect_indexed() {
        let (mut regs, mut mem) = setup(0x0600, &[0x40]);
        mem.load(0x0040, &[0x00, 0x03]).unwrap();
        regs.set_y(0x05).unwrap();
        let r = resolve(&mut regs, &mem, AddrMode::IndirectY, ResolveMode::Execute).unwrap();
        assert_eq!(r.address, Some(0x0305));

        let (mut regs, mut mem) = setup(0x0600, &[0xFE]);
        mem.load(0x0000, &[0x00, 0x07]).unwrap();
        regs.set_x(0x02).unwrap();
        let r = resolve(&mut regs, &mem, AddrMode::IndirectX, ResolveMode::Execute).unwrap();
        assert_eq!(r.address, Some(0x0700));

        let (mut regs, mem) = setup(0x0600, &[0xFE]);
        let r = resolve(&mut regs, &mem, AddrMode::IndirectX, ResolveMode::Trace).unwrap();
        assert_eq!(r.address, Some(0x00FE));
        assert_eq!(regs.pc(), 0x0601);
    }
}
