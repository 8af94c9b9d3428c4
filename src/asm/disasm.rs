//! Disassembly listings.
//!
//! Turns trace lines into text or JSON for hosts.

use serde::{Serialize, Deserialize};
use crate::cpu::TraceLine;

/// Where a disassembly sweep starts and how far it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisassemblyOptions {
    /// First address to decode.
    pub start: u16,
    /// Stop after this many lines; `None` sweeps to $FFFF.
    pub max_lines: Option<usize>,
}

impl Default for DisassemblyOptions {
    fn default() -> Self {
        Self {
            start: 0x8000,
            max_lines: None,
        }
    }
}

/// Render lines as a listing.
pub fn listing(lines: &[TraceLine]) -> String {
    let mut output = String::new();
    output.push_str("; NES Disassembly\n");
    output.push_str("; ---------------\n\n");

    for line in lines {
        output.push_str(&line.to_string());
        output.push('\n');
    }

    output
}

/// Render lines as a JSON array.
pub fn to_json(lines: &[TraceLine]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(lines)
}

/// Count of lines that did not decode.
pub fn unknown_count(lines: &[TraceLine]) -> usize {
    lines.iter().filter(|l| !l.instruction.is_known()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Cpu;
    use crate::memory::FlatMemory;

    fn trace(origin: u16, bytes: &[u8], count: usize) -> Vec<TraceLine> {
        let mut mem = FlatMemory::new();
        mem.load(origin, bytes).unwrap();
        let mut cpu = Cpu::new();
        cpu.regs.jump(origin);
        (0..count).map(|_| cpu.trace_one(&mem).unwrap()).collect()
    }

    #[test]
    fn test_listing() {
        let lines = trace(0x8000, &[0x78, 0xD8, 0xA9, 0x10], 3);
        let text = listing(&lines);
        assert!(text.starts_with("; NES Disassembly"));
        assert!(text.contains("8000  78        SEI\n"));
        assert!(text.contains("8001  D8        CLD\n"));
        assert!(text.contains("8002  A9 10     LDA #$10\n"));
    }

    #[test]
    fn test_json_fields() {
        let lines = trace(0x8000, &[0x4C, 0x34, 0x12], 1);
        let json = to_json(&lines).unwrap();
        let parsed: Vec<TraceLine> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, lines);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["address"], 0x8000);
        assert_eq!(value[0]["instruction"]["mnemonic"], "Jmp");
    }

    #[test]
    fn test_unknown_count() {
        let lines = trace(0x8000, &[0x02, 0xEA, 0xFF], 3);
        assert_eq!(unknown_count(&lines), 2);
    }

    #[test]
    fn test_options_default_and_partial() {
        assert_eq!(DisassemblyOptions::default().start, 0x8000);
        let opts: DisassemblyOptions = serde_json::from_str(r#"{"max_lines": 4}"#).unwrap();
        assert_eq!(opts, DisassemblyOptions { start: 0x8000, max_lines: Some(4) });
    }
}
