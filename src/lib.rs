//! # Famicom Emulator
//!
//! The processor side of the Nintendo Entertainment System: a 6502 core,
//! the CPU memory map, and an iNES cartridge loader.
//!
//! The CPU runs in two modes. Executing applies instructions to registers
//! and memory; tracing decodes the same byte stream and reports each
//! instruction without changing anything but PC.

pub mod cpu;
pub mod memory;
pub mod cartridge;
pub mod console;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, Instruction, Registers, Step, TraceLine};
pub use memory::{Bus, CpuBus, MemoryError, Ram};
pub use cartridge::{load_file, Cartridge, CartridgeError, Header};
pub use console::{Console, ConsoleState};
pub use asm::DisassemblyOptions;

#[cfg(feature = "tui")]
pub use tui::run_debugger;
