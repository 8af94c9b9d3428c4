//! End-to-end runs over a synthetic two-bank cartridge.

use famicom::asm::{listing, unknown_count};
use famicom::cartridge::{CHR_BANK_SIZE, HEADER_SIZE, PRG_BANK_SIZE, SIGNATURE};
use famicom::cpu::Mnemonic;
use famicom::{Cartridge, CartridgeError, Console, ConsoleState, CpuError, DisassemblyOptions, Step};

/// Clear RAM page 2, then spin. Reset vector points at $C000.
const PROGRAM: &[u8] = &[
    0x78,             // C000 SEI
    0xD8,             // C001 CLD
    0xA2, 0xFF,       // C002 LDX #$FF
    0x9A,             // C004 TXS
    0xA9, 0x00,       // C005 LDA #$00
    0xA2, 0x00,       // C007 LDX #$00
    0x9D, 0x00, 0x02, // C009 STA $0200,X
    0xE8,             // C00C INX
    0xD0, 0xFA,       // C00D BNE $C009
    0x20, 0x20, 0xC0, // C00F JSR $C020
    0x4C, 0x12, 0xC0, // C012 JMP $C012
];

/// Subroutine at $C020: store $5A at $0010 and return.
const SUBROUTINE: &[u8] = &[0xA9, 0x5A, 0x85, 0x10, 0x60];

fn image() -> Vec<u8> {
    let mut prg = vec![0xEA; 2 * PRG_BANK_SIZE];
    let base = PRG_BANK_SIZE; // $C000
    prg[base..base + PROGRAM.len()].copy_from_slice(PROGRAM);
    prg[base + 0x20..base + 0x20 + SUBROUTINE.len()].copy_from_slice(SUBROUTINE);
    // Data the disassembler must step over.
    prg[0x0100] = 0x02;
    prg[0x7FFC] = 0x00;
    prg[0x7FFD] = 0xC0;

    let mut raw = vec![0u8; HEADER_SIZE];
    raw[..4].copy_from_slice(&SIGNATURE);
    raw[4] = 2;
    raw[5] = 1;
    raw[6] = 0x01; // vertical mirroring
    raw.extend(prg);
    raw.extend(vec![0u8; CHR_BANK_SIZE]);
    raw
}

fn console() -> Console {
    Console::new(Cartridge::load(&image()).expect("valid image"))
}

#[test]
fn executes_from_reset_vector() {
    let mut nes = console();
    nes.reset().unwrap();
    assert_eq!(nes.cpu().pc(), 0xC000);

    // 6 setup + 256 * 3 loop + JSR + 3 subroutine instructions
    let budget = 6 + 256 * 3 + 1 + 3;
    assert_eq!(nes.run_limited(budget).unwrap(), budget);

    assert_eq!(nes.cpu().pc(), 0xC012);
    assert_eq!(nes.cpu().regs.sp(), 0xFF);
    assert_eq!(nes.ram().read(0x0010).unwrap(), 0x5A);
    assert!(nes.ram().dump(0x0200, 0x100).iter().all(|&b| b == 0));

    // The closing JMP loops on itself.
    nes.run_limited(10).unwrap();
    assert_eq!(nes.cpu().pc(), 0xC012);
    assert_eq!(nes.state(), ConsoleState::Running);
}

#[test]
fn disassembly_sweeps_whole_program_rom() {
    let mut nes = console();
    nes.reset().unwrap();
    let before = nes.cpu().clone();

    let lines = nes.disassemble(&DisassemblyOptions::default()).unwrap();

    assert_eq!(nes.cpu(), &before);
    assert_eq!(lines[0].address, 0x8000);
    assert_eq!(lines.iter().map(|l| l.len()).sum::<usize>(), 0x8000);
    assert!(unknown_count(&lines) >= 1);

    let text = listing(&lines);
    assert!(text.contains("8100  02        ???\n"));
    assert!(text.contains("C009  9D 00 02  STA $0200,X @ $0200\n"));
    assert!(text.contains("C00D  D0 FA     BNE $C009\n"));
    assert!(text.contains("C00F  20 20 C0  JSR $C020\n"));
}

#[test]
fn limited_sweep_from_custom_start() {
    let mut nes = console();
    let lines = nes
        .disassemble(&DisassemblyOptions { start: 0xC000, max_lines: Some(5) })
        .unwrap();
    let mnemonics: Vec<Mnemonic> = lines.iter().map(|l| l.instruction.mnemonic).collect();
    assert_eq!(
        mnemonics,
        [Mnemonic::Sei, Mnemonic::Cld, Mnemonic::Ldx, Mnemonic::Txs, Mnemonic::Lda]
    );
}

#[test]
fn trace_and_execute_disagree_only_on_unknown_opcodes() {
    let mut nes = console();
    nes.init_disassembly(0x80FF);
    assert_eq!(nes.trace_one().unwrap().text(), "NOP");
    assert_eq!(nes.trace_one().unwrap().text(), "???");
    assert_eq!(nes.trace_one().unwrap().text(), "NOP");

    nes.init_disassembly(0x8100);
    let err = nes.step().unwrap_err();
    assert_eq!(err, CpuError::UnknownOpcode { opcode: 0x02, address: 0x8100 });
}

#[test]
fn step_outcomes() {
    let mut nes = console();
    nes.reset().unwrap();
    match nes.step().unwrap() {
        Step::Executed { address, instruction } => {
            assert_eq!(address, 0xC000);
            assert_eq!(instruction.mnemonic, Mnemonic::Sei);
        }
        other => panic!("unexpected step {:?}", other),
    }
    assert!(nes.cpu().regs.status().interrupt_disable);
}

#[test]
fn rejects_bad_images() {
    let mut raw = image();
    raw.truncate(raw.len() - 1);
    assert!(matches!(
        Cartridge::load(&raw),
        Err(CartridgeError::TruncatedImage { region: "CHR ROM", .. })
    ));

    let mut raw = image();
    raw[3] = 0x00;
    assert!(matches!(Cartridge::load(&raw), Err(CartridgeError::BadSignature(_))));
}
