//! Instruction decoder for the 6502.
//!
//! Most opcodes follow the `aaabbbcc` pattern: `cc` picks the register
//! class, `aaa` the operation within it and `bbb` the addressing-mode
//! column. The irregular single-byte instructions, jumps and branches are
//! peeled off first. Decoding never touches memory.

use std::fmt;
use std::sync::OnceLock;
use serde::{Serialize, Deserialize};

/// Instruction mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    /// No operation is encoded by this byte.
    Unknown,
}

impl Mnemonic {
    /// Upper-case assembler name.
    pub fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
            Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA", Unknown => "???",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddrMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    /// The column has no mapping for this operation: an illegal opcode.
    Unknown,
}

impl AddrMode {
    /// Number of operand bytes following the opcode.
    pub const fn operand_len(self) -> u16 {
        match self {
            AddrMode::Implied | AddrMode::Accumulator | AddrMode::Unknown => 0,
            AddrMode::Immediate
            | AddrMode::ZeroPage
            | AddrMode::ZeroPageX
            | AddrMode::ZeroPageY
            | AddrMode::Relative
            | AddrMode::IndirectX
            | AddrMode::IndirectY => 1,
            AddrMode::Absolute
            | AddrMode::AbsoluteX
            | AddrMode::AbsoluteY
            | AddrMode::Indirect => 2,
        }
    }

    /// Assembler syntax for the operand.
    ///
    /// `operand` holds the raw operand bytes; `target` is the resolved
    /// address, used for branches and shown after indexed operands.
    pub fn format_operand(self, operand: &[u8], target: Option<u32>) -> String {
        let byte = operand.first().copied().unwrap_or(0);
        let word = match operand {
            [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
            _ => byte as u16,
        };
        let indexed = |text: String| match target {
            Some(addr) => format!("{} @ ${:04X}", text, addr),
            None => text,
        };
        match self {
            AddrMode::Implied | AddrMode::Unknown => String::new(),
            AddrMode::Accumulator => "A".into(),
            AddrMode::Immediate => format!("#${:02X}", byte),
            AddrMode::ZeroPage => format!("${:02X}", byte),
            AddrMode::ZeroPageX => indexed(format!("${:02X},X", byte)),
            AddrMode::ZeroPageY => indexed(format!("${:02X},Y", byte)),
            AddrMode::Relative => match target {
                Some(addr) => format!("${:04X}", addr),
                None => format!("*{:+}", byte as i8),
            },
            AddrMode::Absolute => format!("${:04X}", word),
            AddrMode::AbsoluteX => indexed(format!("${:04X},X", word)),
            AddrMode::AbsoluteY => indexed(format!("${:04X},Y", word)),
            AddrMode::Indirect => format!("(${:04X})", word),
            AddrMode::IndirectX => format!("(${:02X},X)", byte),
            AddrMode::IndirectY => format!("(${:02X}),Y", byte),
        }
    }
}

/// A decoded opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: AddrMode,
}

impl Instruction {
    pub const UNKNOWN: Instruction = Instruction::new(Mnemonic::Unknown, AddrMode::Unknown);

    pub const fn new(mnemonic: Mnemonic, mode: AddrMode) -> Self {
        Self { mnemonic, mode }
    }

    /// Whether the opcode is a documented instruction.
    pub fn is_known(&self) -> bool {
        self.mnemonic != Mnemonic::Unknown && self.mode != AddrMode::Unknown
    }

    /// Encoded length in bytes, opcode included.
    pub fn len(&self) -> u16 {
        1 + self.mode.operand_len()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{} {:?}", self.mnemonic, self.mode)
        } else {
            f.write_str(Mnemonic::Unknown.name())
        }
    }
}

/// Operations of the accumulator class (`cc = 01`), indexed by `aaa`.
const ACCUMULATOR_OPS: [Mnemonic; 8] = [
    Mnemonic::Ora, Mnemonic::And, Mnemonic::Eor, Mnemonic::Adc,
    Mnemonic::Sta, Mnemonic::Lda, Mnemonic::Cmp, Mnemonic::Sbc,
];

/// Operations of the X class (`cc = 10`).
const X_OPS: [Mnemonic; 8] = [
    Mnemonic::Asl, Mnemonic::Rol, Mnemonic::Lsr, Mnemonic::Ror,
    Mnemonic::Stx, Mnemonic::Ldx, Mnemonic::Dec, Mnemonic::Inc,
];

/// Operations of the Y class (`cc = 00`). Rows 2 and 3 are the jumps,
/// matched exactly before this table is consulted.
const Y_OPS: [Mnemonic; 8] = [
    Mnemonic::Unknown, Mnemonic::Bit, Mnemonic::Unknown, Mnemonic::Unknown,
    Mnemonic::Sty, Mnemonic::Ldy, Mnemonic::Cpy, Mnemonic::Cpx,
];

/// Branches indexed by the top three bits.
const BRANCHES: [Mnemonic; 8] = [
    Mnemonic::Bpl, Mnemonic::Bmi, Mnemonic::Bvc, Mnemonic::Bvs,
    Mnemonic::Bcc, Mnemonic::Bcs, Mnemonic::Bne, Mnemonic::Beq,
];

/// Addressing-mode columns (`bbb`) per register class.
const ACCUMULATOR_MODES: [AddrMode; 8] = [
    AddrMode::IndirectX, AddrMode::ZeroPage, AddrMode::Immediate, AddrMode::Absolute,
    AddrMode::IndirectY, AddrMode::ZeroPageX, AddrMode::AbsoluteY, AddrMode::AbsoluteX,
];

const X_MODES: [AddrMode; 8] = [
    AddrMode::Immediate, AddrMode::ZeroPage, AddrMode::Accumulator, AddrMode::Absolute,
    AddrMode::Unknown, AddrMode::ZeroPageX, AddrMode::Unknown, AddrMode::AbsoluteX,
];

const Y_MODES: [AddrMode; 8] = [
    AddrMode::Immediate, AddrMode::ZeroPage, AddrMode::Unknown, AddrMode::Absolute,
    AddrMode::Unknown, AddrMode::ZeroPageX, AddrMode::Unknown, AddrMode::AbsoluteX,
];

/// Single-byte instructions with no operand, matched by exact value.
fn single_byte(opcode: u8) -> Option<Mnemonic> {
    let mnemonic = match opcode {
        0x00 => Mnemonic::Brk,
        0x40 => Mnemonic::Rti,
        0x60 => Mnemonic::Rts,
        0x08 => Mnemonic::Php,
        0x28 => Mnemonic::Plp,
        0x48 => Mnemonic::Pha,
        0x68 => Mnemonic::Pla,
        0x88 => Mnemonic::Dey,
        0xA8 => Mnemonic::Tay,
        0xC8 => Mnemonic::Iny,
        0xE8 => Mnemonic::Inx,
        0x18 => Mnemonic::Clc,
        0x38 => Mnemonic::Sec,
        0x58 => Mnemonic::Cli,
        0x78 => Mnemonic::Sei,
        0x98 => Mnemonic::Tya,
        0xB8 => Mnemonic::Clv,
        0xD8 => Mnemonic::Cld,
        0xF8 => Mnemonic::Sed,
        0x8A => Mnemonic::Txa,
        0x9A => Mnemonic::Txs,
        0xAA => Mnemonic::Tax,
        0xBA => Mnemonic::Tsx,
        0xCA => Mnemonic::Dex,
        0xEA => Mnemonic::Nop,
        _ => return None,
    };
    Some(mnemonic)
}

/// Decode an opcode byte from its bit fields.
pub fn decode(opcode: u8) -> Instruction {
    if let Some(mnemonic) = single_byte(opcode) {
        return Instruction::new(mnemonic, AddrMode::Implied);
    }

    match opcode {
        0x20 => return Instruction::new(Mnemonic::Jsr, AddrMode::Absolute),
        0x4C => return Instruction::new(Mnemonic::Jmp, AddrMode::Absolute),
        0x6C => return Instruction::new(Mnemonic::Jmp, AddrMode::Indirect),
        _ => {}
    }

    let row = (opcode & 0xE0) >> 5;

    // Branches: low nibble 0 on the odd rows ($10, $30, ... $F0).
    if opcode & 0x1F == 0x10 {
        return Instruction::new(BRANCHES[row as usize], AddrMode::Relative);
    }

    let column = ((opcode & 0x1F) >> 2) as usize;
    let (mnemonic, mode) = match opcode & 0x03 {
        0x01 => (ACCUMULATOR_OPS[row as usize], ACCUMULATOR_MODES[column]),
        0x02 => {
            let mnemonic = X_OPS[row as usize];
            (mnemonic, index_by_y(mnemonic, X_MODES[column]))
        }
        0x00 => (Y_OPS[row as usize], Y_MODES[column]),
        _ => return Instruction::UNKNOWN,
    };

    if mnemonic == Mnemonic::Unknown || !is_defined(mnemonic, mode) {
        return Instruction::new(mnemonic, AddrMode::Unknown);
    }
    Instruction::new(mnemonic, mode)
}

/// STX and LDX index with Y where the rest of their class uses X.
fn index_by_y(mnemonic: Mnemonic, mode: AddrMode) -> AddrMode {
    match (mnemonic, mode) {
        (Mnemonic::Stx | Mnemonic::Ldx, AddrMode::ZeroPageX) => AddrMode::ZeroPageY,
        (Mnemonic::Stx | Mnemonic::Ldx, AddrMode::AbsoluteX) => AddrMode::AbsoluteY,
        _ => mode,
    }
}

/// Rejects the table cells the hardware leaves undocumented.
fn is_defined(mnemonic: Mnemonic, mode: AddrMode) -> bool {
    use AddrMode::*;
    match mode {
        Unknown => false,
        Immediate => !matches!(
            mnemonic,
            Mnemonic::Sta
                | Mnemonic::Asl | Mnemonic::Rol | Mnemonic::Lsr | Mnemonic::Ror
                | Mnemonic::Stx | Mnemonic::Dec | Mnemonic::Inc
                | Mnemonic::Bit | Mnemonic::Sty
        ),
        Accumulator => matches!(
            mnemonic,
            Mnemonic::Asl | Mnemonic::Rol | Mnemonic::Lsr | Mnemonic::Ror
        ),
        ZeroPageX => !matches!(mnemonic, Mnemonic::Bit | Mnemonic::Cpx | Mnemonic::Cpy),
        AbsoluteX => !matches!(
            mnemonic,
            Mnemonic::Bit | Mnemonic::Cpx | Mnemonic::Cpy | Mnemonic::Sty
        ),
        AbsoluteY => mnemonic != Mnemonic::Stx,
        _ => true,
    }
}

/// Decoded form of every opcode, built once.
pub fn table() -> &'static [Instruction; 256] {
    static TABLE: OnceLock<[Instruction; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [Instruction::UNKNOWN; 256];
        for (opcode, slot) in table.iter_mut().enumerate() {
            *slot = decode(opcode as u8);
        }
        table
    })
}

/// Table lookup equivalent to [`decode`].
#[inline]
pub fn lookup(opcode: u8) -> Instruction {
    table()[opcode as usize]
}

/// Find the opcode of a documented instruction.
pub fn encode(mnemonic: Mnemonic, mode: AddrMode) -> Option<u8> {
    let wanted = Instruction::new(mnemonic, mode);
    if !wanted.is_known() {
        return None;
    }
    table()
        .iter()
        .position(|instr| *instr == wanted)
        .map(|opcode| opcode as u8)
}
