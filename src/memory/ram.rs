//! Console work RAM.
//!
//! The console has 2 KiB of internal RAM. The bus mirrors it four times
//! across $0000-$1FFF; this type only knows about the physical 2 KiB.

use serde::{Serialize, Deserialize};
use super::MemoryError;

/// Physical size of work RAM in bytes.
pub const RAM_SIZE: usize = 0x0800;

/// 2 KiB of work RAM.
#[derive(Clone, Serialize, Deserialize)]
pub struct Ram {
    cells: Vec<u8>,
}

impl Ram {
    /// Create RAM with every byte cleared.
    pub fn new() -> Self {
        Self {
            cells: vec![0; RAM_SIZE],
        }
    }

    /// Read a byte by physical offset (0-$7FF).
    #[inline]
    pub fn read(&self, addr: u16) -> Result<u8, MemoryError> {
        self.cells
            .get(addr as usize)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange {
                address: addr as u32,
                limit: RAM_SIZE as u32,
            })
    }

    /// Write a byte by physical offset (0-$7FF).
    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), MemoryError> {
        let cell = self.cells
            .get_mut(addr as usize)
            .ok_or(MemoryError::AddressOutOfRange {
                address: addr as u32,
                limit: RAM_SIZE as u32,
            })?;
        *cell = value;
        Ok(())
    }

    /// Clear all bytes to zero.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy `data` into RAM starting at `start`.
    pub fn load(&mut self, start: u16, data: &[u8]) -> Result<(), MemoryError> {
        let start = start as usize;
        let end = start + data.len();
        if end > RAM_SIZE {
            return Err(MemoryError::AddressOutOfRange {
                address: end as u32 - 1,
                limit: RAM_SIZE as u32,
            });
        }
        self.cells[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Dump a window of RAM (for debugging views).
    pub fn dump(&self, start: usize, count: usize) -> &[u8] {
        let start = start.min(RAM_SIZE);
        let end = (start + count).min(RAM_SIZE);
        &self.cells[start..end]
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&b| b != 0).count();
        f.debug_struct("Ram")
            .field("non_zero_bytes", &non_zero)
            .field("size", &RAM_SIZE)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_read_write() {
        let mut ram = Ram::new();
        ram.write(0x10, 42).unwrap();
        assert_eq!(ram.read(0x10).unwrap(), 42);
        assert_eq!(ram.read(0x11).unwrap(), 0);
    }

    #[test]
    fn test_ram_bounds() {
        let mut ram = Ram::new();
        assert!(ram.read(0x07FF).is_ok());
        assert_eq!(
            ram.read(0x0800),
            Err(MemoryError::AddressOutOfRange { address: 0x0800, limit: 0x0800 })
        );
        assert!(ram.write(0x0800, 1).is_err());
    }

    #[test]
    fn test_load_and_dump() {
        let mut ram = Ram::new();
        ram.load(0x0200, &[1, 2, 3]).unwrap();
        assert_eq!(ram.dump(0x0200, 3), &[1, 2, 3]);
        assert!(ram.load(0x07FF, &[1, 2]).is_err());

        ram.clear();
        assert_eq!(ram.read(0x0201).unwrap(), 0);
    }
}
