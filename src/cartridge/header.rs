//! iNES header.
//!
//! Layout of the 16 header bytes:
//! - 0-3: signature `NES\x1A`
//! - 4: PRG ROM size in 16 KiB banks
//! - 5: CHR ROM size in 8 KiB banks
//! - 6: flags (mirroring, battery, trainer, mapper low nibble)
//! - 7: flags (mapper high nibble)
//! - 8-15: rarely used, kept raw

use std::fmt;
use serde::{Serialize, Deserialize};
use super::CartridgeError;

/// Header length in bytes.
pub const HEADER_SIZE: usize = 16;

/// Expected first four bytes of an image.
pub const SIGNATURE: [u8; 4] = *b"NES\x1A";

/// PRG ROM bank size (16 KiB).
pub const PRG_BANK_SIZE: usize = 0x4000;

/// CHR ROM bank size (8 KiB).
pub const CHR_BANK_SIZE: usize = 0x2000;

/// Size of the optional trainer block between header and PRG.
pub const TRAINER_SIZE: usize = 512;

const FLAG6_VERTICAL: u8 = 0x01;
const FLAG6_BATTERY: u8 = 0x02;
const FLAG6_TRAINER: u8 = 0x04;
const FLAG6_FOUR_SCREEN: u8 = 0x08;

/// Nametable arrangement wired on the cartridge board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Parsed iNES header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Number of 16 KiB PRG banks.
    pub prg_banks: u8,
    /// Number of 8 KiB CHR banks.
    pub chr_banks: u8,
    pub flags6: u8,
    pub flags7: u8,
    raw: [u8; HEADER_SIZE],
}

impl Header {
    /// Parse the first 16 bytes of an image.
    pub fn parse(bytes: &[u8]) -> Result<Self, CartridgeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CartridgeError::MalformedHeader { len: bytes.len() });
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&bytes[..HEADER_SIZE]);

        let signature = [raw[0], raw[1], raw[2], raw[3]];
        if signature != SIGNATURE {
            return Err(CartridgeError::BadSignature(signature));
        }

        Ok(Self {
            prg_banks: raw[4],
            chr_banks: raw[5],
            flags6: raw[6],
            flags7: raw[7],
            raw,
        })
    }

    /// The raw header bytes.
    pub fn raw(&self) -> &[u8; HEADER_SIZE] {
        &self.raw
    }

    /// PRG ROM length in bytes.
    pub fn prg_len(&self) -> usize {
        self.prg_banks as usize * PRG_BANK_SIZE
    }

    /// CHR ROM length in bytes.
    pub fn chr_len(&self) -> usize {
        self.chr_banks as usize * CHR_BANK_SIZE
    }

    /// iNES mapper number.
    pub fn mapper(&self) -> u8 {
        (self.flags6 >> 4) | (self.flags7 & 0xF0)
    }

    pub fn mirroring(&self) -> Mirroring {
        if self.flags6 & FLAG6_FOUR_SCREEN != 0 {
            Mirroring::FourScreen
        } else if self.flags6 & FLAG6_VERTICAL != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    /// Battery-backed PRG RAM present.
    pub fn has_battery(&self) -> bool {
        self.flags6 & FLAG6_BATTERY != 0
    }

    /// A 512-byte trainer sits between header and PRG.
    pub fn has_trainer(&self) -> bool {
        self.flags6 & FLAG6_TRAINER != 0
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PRG {} x 16KiB, CHR {} x 8KiB, mapper {}, {:?} mirroring",
            self.prg_banks,
            self.chr_banks,
            self.mapper(),
            self.mirroring()
        )?;
        if self.has_battery() {
            write!(f, ", battery")?;
        }
        if self.has_trainer() {
            write!(f, ", trainer")?;
        }
        Ok(())
    }
}
