//! The CPU address bus.
//!
//! The bus owns nothing. It borrows work RAM and the cartridge from the
//! console for the duration of a step and routes each address to exactly
//! one of them, or to a stub window that reads 0 and drops writes.

use log::debug;
use crate::cartridge::Cartridge;
use super::{CpuBus, MemoryError, Ram, ADDRESS_SPACE};

/// Which window an address falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// $0000-$1FFF, work RAM mirrored every 2 KiB.
    Ram,
    /// $2000-$3FFF, graphics registers.
    Graphics,
    /// $4000-$401F, audio and controller registers.
    AudioIo,
    /// $4020-$7FFF, cartridge expansion space.
    Expansion,
    /// $8000-$FFFF, cartridge program ROM.
    Program,
}

impl Region {
    /// Classify an address. `None` for anything past $FFFF.
    pub fn of(address: u32) -> Option<Region> {
        let region = match address {
            0x0000..=0x1FFF => Region::Ram,
            0x2000..=0x3FFF => Region::Graphics,
            0x4000..=0x401F => Region::AudioIo,
            0x4020..=0x7FFF => Region::Expansion,
            0x8000..=0xFFFF => Region::Program,
            _ => return None,
        };
        Some(region)
    }
}

/// Bus view over the console's RAM and cartridge.
pub struct Bus<'a> {
    ram: &'a mut Ram,
    cartridge: &'a Cartridge,
}

impl<'a> Bus<'a> {
    pub fn new(ram: &'a mut Ram, cartridge: &'a Cartridge) -> Self {
        Self { ram, cartridge }
    }
}

fn classify(address: u32) -> Result<Region, MemoryError> {
    Region::of(address).ok_or(MemoryError::AddressOutOfRange {
        address,
        limit: ADDRESS_SPACE,
    })
}

impl CpuBus for Bus<'_> {
    fn read(&self, address: u32) -> Result<u8, MemoryError> {
        match classify(address)? {
            Region::Ram => self.ram.read((address & 0x07FF) as u16),
            Region::Graphics | Region::AudioIo | Region::Expansion => Ok(0),
            Region::Program => self.cartridge.read_program((address & 0x7FFF) as u16),
        }
    }

    fn write(&mut self, address: u32, value: u8) -> Result<(), MemoryError> {
        match classify(address)? {
            Region::Ram => self.ram.write((address & 0x07FF) as u16, value),
            region => {
                debug!("dropped write {:02X} to {:04X} ({:?})", value, address, region);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::{HEADER_SIZE, PRG_BANK_SIZE, SIGNATURE};
    use proptest::prelude::*;

    fn cartridge(prg_banks: u8) -> Cartridge {
        let mut raw = vec![0u8; HEADER_SIZE];
        raw[..4].copy_from_slice(&SIGNATURE);
        raw[4] = prg_banks;
        raw.extend((0..prg_banks as usize * PRG_BANK_SIZE).map(|i| (i % 251) as u8));
        Cartridge::load(&raw).unwrap()
    }

    #[test]
    fn test_ram_mirroring() {
        let cart = cartridge(1);
        let mut ram = Ram::new();
        let mut bus = Bus::new(&mut ram, &cart);

        bus.write(0x0000, 0x5A).unwrap();
        assert_eq!(bus.read(0x0800).unwrap(), 0x5A);
        assert_eq!(bus.read(0x1800).unwrap(), 0x5A);

        bus.write(0x1FFF, 0x11).unwrap();
        assert_eq!(bus.read(0x07FF).unwrap(), 0x11);
    }

    #[test]
    fn test_stub_windows_read_zero_and_drop_writes() {
        let cart = cartridge(1);
        let mut ram = Ram::new();
        let mut bus = Bus::new(&mut ram, &cart);

        for addr in [0x2000, 0x3FFF, 0x4000, 0x401F, 0x4020, 0x6000, 0x7FFF] {
            bus.write(addr, 0xFF).unwrap();
            assert_eq!(bus.read(addr).unwrap(), 0, "address {:04X}", addr);
        }
        // Nothing leaked into RAM.
        assert!(ram.dump(0, 0x800).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_program_rom_is_read_only() {
        let cart = cartridge(2);
        let mut ram = Ram::new();
        let mut bus = Bus::new(&mut ram, &cart);

        let before = bus.read(0x8123).unwrap();
        bus.write(0x8123, before.wrapping_add(1)).unwrap();
        assert_eq!(bus.read(0x8123).unwrap(), before);
        assert_eq!(bus.read(0xC000).unwrap(), cart.read_program(0x4000).unwrap());
    }

    #[test]
    fn test_single_bank_visible_twice() {
        let cart = cartridge(1);
        let mut ram = Ram::new();
        let bus = Bus::new(&mut ram, &cart);
        assert_eq!(bus.read(0x8000).unwrap(), bus.read(0xC000).unwrap());
        assert_eq!(bus.read(0xBFFF).unwrap(), bus.read(0xFFFF).unwrap());
    }

    #[test]
    fn test_past_address_space() {
        let cart = cartridge(1);
        let mut ram = Ram::new();
        let mut bus = Bus::new(&mut ram, &cart);
        let err = MemoryError::AddressOutOfRange { address: 0x1_0000, limit: 0x1_0000 };
        assert_eq!(bus.read(0x1_0000), Err(err.clone()));
        assert_eq!(bus.write(0x1_0000, 0), Err(err));
    }

    #[test]
    fn test_region_map() {
        assert_eq!(Region::of(0x0000), Some(Region::Ram));
        assert_eq!(Region::of(0x2008), Some(Region::Graphics));
        assert_eq!(Region::of(0x4016), Some(Region::AudioIo));
        assert_eq!(Region::of(0x5000), Some(Region::Expansion));
        assert_eq!(Region::of(0xFFFC), Some(Region::Program));
        assert_eq!(Region::of(0x1_0000), None);
    }

    proptest! {
        #[test]
        fn prop_ram_mirrors(offset in 0u32..0x800, value: u8, mirror in 0u32..4) {
            let cart = cartridge(1);
            let mut ram = Ram::new();
            let mut bus = Bus::new(&mut ram, &cart);
            bus.write(offset + mirror * 0x800, value).unwrap();
            for m in 0..4 {
                prop_assert_eq!(bus.read(offset + m * 0x800).unwrap(), value);
            }
        }
    }
}
