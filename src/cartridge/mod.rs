//! Cartridge images in iNES format.
//!
//! An image is a 16-byte header, an optional 512-byte trainer, then
//! `prg_banks * 16 KiB` of program ROM and `chr_banks * 8 KiB` of
//! pattern ROM. Only the fixed-bank NROM board is modelled: one PRG bank
//! is mirrored into both halves of $8000-$FFFF, two banks fill it.

pub mod header;

pub use header::{Header, Mirroring, HEADER_SIZE, PRG_BANK_SIZE, CHR_BANK_SIZE, SIGNATURE};

use std::path::Path;
use log::{info, warn};
use thiserror::Error;
use crate::memory::MemoryError;
use header::TRAINER_SIZE;

/// A loaded, immutable cartridge.
#[derive(Clone)]
pub struct Cartridge {
    header: Header,
    trainer: Option<Vec<u8>>,
    prg: Vec<u8>,
    chr: Vec<u8>,
}

impl Cartridge {
    /// Parse an image held in memory.
    pub fn load(raw: &[u8]) -> Result<Self, CartridgeError> {
        let header = Header::parse(raw)?;

        let mut offset = HEADER_SIZE;

        let trainer = if header.has_trainer() {
            let end = offset + TRAINER_SIZE;
            let block = slice_region(raw, offset, end, "trainer")?;
            offset = end;
            Some(block.to_vec())
        } else {
            None
        };

        let prg_end = offset + header.prg_len();
        let prg = slice_region(raw, offset, prg_end, "PRG ROM")?.to_vec();

        let chr_end = prg_end + header.chr_len();
        let chr = slice_region(raw, prg_end, chr_end, "CHR ROM")?.to_vec();

        info!(
            "loaded cartridge: {} PRG bank(s), {} CHR bank(s), mapper {}",
            header.prg_banks,
            header.chr_banks,
            header.mapper()
        );
        if header.mapper() != 0 {
            warn!("mapper {} is not supported, treating the board as NROM", header.mapper());
        }

        Ok(Self {
            header,
            trainer,
            prg,
            chr,
        })
    }

    /// Header fields.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Program ROM bytes.
    pub fn program(&self) -> &[u8] {
        &self.prg
    }

    /// Pattern (CHR) ROM bytes.
    pub fn pattern(&self) -> &[u8] {
        &self.chr
    }

    /// Trainer block, if the image had one.
    pub fn trainer(&self) -> Option<&[u8]> {
        self.trainer.as_deref()
    }

    /// Read program ROM by offset from the start of the $8000 window.
    ///
    /// With a single 16 KiB bank the offset is masked to 14 bits, which
    /// mirrors the bank into $C000-$FFFF as the board does.
    pub fn read_program(&self, address: u16) -> Result<u8, MemoryError> {
        let index = if self.header.prg_banks == 1 {
            address & 0x3FFF
        } else {
            address
        };
        read_region(&self.prg, index)
    }

    /// Read pattern ROM, for the rendering side.
    pub fn read_pattern(&self, address: u16) -> Result<u8, MemoryError> {
        read_region(&self.chr, address)
    }
}

impl std::fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartridge")
            .field("header", &self.header)
            .field("prg_len", &self.prg.len())
            .field("chr_len", &self.chr.len())
            .field("trainer", &self.trainer.is_some())
            .finish()
    }
}

/// Load a cartridge image from disk.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Cartridge, CartridgeError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| CartridgeError::Io(e.to_string()))?;
    Cartridge::load(&bytes)
}

fn slice_region<'a>(
    raw: &'a [u8],
    start: usize,
    end: usize,
    region: &'static str,
) -> Result<&'a [u8], CartridgeError> {
    raw.get(start..end).ok_or(CartridgeError::TruncatedImage {
        region,
        expected: end,
        actual: raw.len(),
    })
}

fn read_region(bytes: &[u8], index: u16) -> Result<u8, MemoryError> {
    bytes
        .get(index as usize)
        .copied()
        .ok_or(MemoryError::AddressOutOfRange {
            address: index as u32,
            limit: bytes.len() as u32,
        })
}

/// Errors that can occur while loading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartridgeError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("image is {len} bytes, shorter than the 16-byte header")]
    MalformedHeader { len: usize },

    #[error("bad image signature {0:02X?}, expected \"NES\\x1A\"")]
    BadSignature([u8; 4]),

    #[error("image truncated in {region}: need {expected} bytes, have {actual}")]
    TruncatedImage {
        region: &'static str,
        expected: usize,
        actual: usize,
    },
}
