//! Disassembly output for NES program code.

pub mod disasm;

pub use disasm::{listing, to_json, unknown_count, DisassemblyOptions};
