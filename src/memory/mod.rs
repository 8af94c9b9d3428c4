//! Memory subsystem: work RAM, the CPU address bus, and the bus contract
//! the processor is written against.
//!
//! CPU address map:
//! - $0000-$1FFF: 2 KiB work RAM, mirrored every $0800
//! - $2000-$3FFF: graphics registers (stub)
//! - $4000-$401F: audio / controller registers (stub)
//! - $4020-$7FFF: cartridge expansion space (stub)
//! - $8000-$FFFF: cartridge program ROM

pub mod ram;
pub mod bus;

pub use ram::{Ram, RAM_SIZE};
pub use bus::{Bus, Region};

use thiserror::Error;

/// Size of the CPU address space.
pub const ADDRESS_SPACE: u32 = 0x1_0000;

/// The processor's view of memory.
///
/// Addresses are taken as `u32` so an effective address that overflowed
/// 16 bits reaches the bus and is reported instead of silently wrapping.
pub trait CpuBus {
    /// Read one byte.
    fn read(&self, address: u32) -> Result<u8, MemoryError>;

    /// Write one byte.
    fn write(&mut self, address: u32, value: u8) -> Result<(), MemoryError>;

    /// Read a little-endian word from `address` and `address + 1`.
    fn read_word(&self, address: u32) -> Result<u16, MemoryError> {
        let lo = self.read(address)?;
        let hi = self.read(address + 1)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }
}

/// A flat 64 KiB address space with no mirroring or read-only regions.
///
/// Handy for running bare processor code without a cartridge.
#[derive(Clone)]
pub struct FlatMemory {
    bytes: Vec<u8>,
}

impl FlatMemory {
    pub fn new() -> Self {
        Self {
            bytes: vec![0; ADDRESS_SPACE as usize],
        }
    }

    /// Copy `data` in starting at `start`.
    pub fn load(&mut self, start: u16, data: &[u8]) -> Result<(), MemoryError> {
        let start = start as usize;
        let end = start + data.len();
        if end > self.bytes.len() {
            return Err(MemoryError::AddressOutOfRange {
                address: end as u32 - 1,
                limit: ADDRESS_SPACE,
            });
        }
        self.bytes[start..end].copy_from_slice(data);
        Ok(())
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBus for FlatMemory {
    fn read(&self, address: u32) -> Result<u8, MemoryError> {
        self.bytes
            .get(address as usize)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange { address, limit: ADDRESS_SPACE })
    }

    fn write(&mut self, address: u32, value: u8) -> Result<(), MemoryError> {
        let cell = self.bytes
            .get_mut(address as usize)
            .ok_or(MemoryError::AddressOutOfRange { address, limit: ADDRESS_SPACE })?;
        *cell = value;
        Ok(())
    }
}

/// Errors raised by any memory-backed region.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Address is outside the region it was sent to.
    #[error("address {address:#06x} out of range (limit {limit:#x})")]
    AddressOutOfRange { address: u32, limit: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_memory_word() {
        let mut mem = FlatMemory::new();
        mem.load(0x1000, &[0x34, 0x12]).unwrap();
        assert_eq!(mem.read_word(0x1000).unwrap(), 0x1234);
    }

    #[test]
    fn test_flat_memory_rejects_wide_address() {
        let mut mem = FlatMemory::new();
        assert!(mem.read(0xFFFF).is_ok());
        assert!(mem.read(0x1_0000).is_err());
        assert!(mem.write(0x1_0000, 0).is_err());
        // The high byte of a word at $FFFF would be at $10000.
        assert!(mem.read_word(0xFFFF).is_err());
    }
}
