//! CPU emulation for the 2A03, the NES variant of the 6502.
//!
//! - 8-bit A, X, Y and SP, 16-bit PC, 8-bit status
//! - 151 documented opcodes decoded from their `aaabbbcc` bit fields
//! - Execute and trace share fetch, decode and operand resolution

pub mod registers;
pub mod decode;
pub mod addressing;
pub mod execute;

pub use registers::{Register, RegisterError, Registers, StatusFlags};
pub use decode::{AddrMode, Instruction, Mnemonic};
pub use addressing::{ResolveMode, Resolved};
pub use execute::{Cpu, CpuError, Step, TraceLine, RESET_VECTOR};
