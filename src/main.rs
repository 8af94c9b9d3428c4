//! Famicom Emulator - CLI Entry Point
//!
//! Commands:
//! - `famicom-emu info <rom>` - Print the iNES header
//! - `famicom-emu disasm <rom>` - Linear disassembly of program ROM
//! - `famicom-emu run <rom>` - Reset and execute
//! - `famicom-emu debug <rom>` - Interactive debugger

use clap::{Parser, Subcommand};
use log::{LevelFilter, Log, Metadata, Record};
use famicom::{Cartridge, Console, CpuError, DisassemblyOptions, Step};

#[derive(Parser)]
#[command(name = "famicom-emu")]
#[command(version = "0.1.0")]
#[command(about = "A 6502 core and tracing disassembler for Famicom / NES cartridges")]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cartridge header
    Info {
        /// Path to the iNES image
        rom: String,
    },
    /// Disassemble program ROM
    Disasm {
        /// Path to the iNES image
        rom: String,
        /// First address to decode (hex, e.g. 8000 or $C000)
        #[arg(short, long, default_value = "8000", value_parser = parse_address)]
        start: u16,
        /// Stop after this many lines
        #[arg(short, long)]
        max_lines: Option<usize>,
        /// Emit JSON instead of a text listing
        #[arg(long)]
        json: bool,
    },
    /// Reset the console and execute from the reset vector
    Run {
        /// Path to the iNES image
        rom: String,
        /// Maximum number of instructions to execute (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_steps: u64,
        /// Print each instruction before it executes
        #[arg(short, long)]
        trace: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the iNES image
        rom: String,
    },
}

/// Minimal stderr logger.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn parse_address(text: &str) -> Result<u16, String> {
    let digits = text.trim_start_matches('$').trim_start_matches("0x");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid address '{}': {}", text, e))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Info { rom }) => {
            show_info(&rom);
        }
        Some(Commands::Disasm { rom, start, max_lines, json }) => {
            disassemble_rom(&rom, DisassemblyOptions { start, max_lines }, json);
        }
        Some(Commands::Run { rom, max_steps, trace }) => {
            run_rom(&rom, max_steps, trace);
        }
        Some(Commands::Debug { rom }) => {
            debug_rom(&rom);
        }
        None => {
            println!("Famicom Emulator v0.1.0");
            println!("A 6502 core and tracing disassembler for NES cartridges");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn load_rom(path: &str) -> Cartridge {
    match famicom::load_file(path) {
        Ok(cart) => cart,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn show_info(path: &str) {
    let cart = load_rom(path);
    let header = cart.header();

    println!("📂 {}", path);
    println!("{}", header);
    println!("PRG ROM:   {} bytes", cart.program().len());
    println!("CHR ROM:   {} bytes", cart.pattern().len());
    println!("Mirroring: {:?}", header.mirroring());
    println!("Battery:   {}", header.has_battery());
    println!("Trainer:   {}", cart.trainer().is_some());
}

fn disassemble_rom(path: &str, options: DisassemblyOptions, json: bool) {
    use famicom::asm::{listing, to_json, unknown_count};

    let mut console = Console::new(load_rom(path));

    let lines = match console.disassemble(&options) {
        Ok(lines) => lines,
        Err(e) => {
            eprintln!("❌ Disassembly failed: {}", e);
            std::process::exit(1);
        }
    };

    if json {
        match to_json(&lines) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to encode JSON: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("📖 Disassembling: {} from ${:04X}", path, options.start);
    println!();
    print!("{}", listing(&lines));
    println!();
    println!("{} lines, {} unknown opcodes", lines.len(), unknown_count(&lines));
}

fn run_rom(path: &str, max_steps: u64, trace: bool) {
    let mut console = Console::new(load_rom(path));
    println!("🔧 Running: {}", path);

    if let Err(e) = console.reset() {
        eprintln!("❌ Reset failed: {}", e);
        std::process::exit(1);
    }

    println!("Reset vector: ${:04X}", console.cpu().pc());
    println!();
    println!("━━━ Execution ━━━");

    let mut steps = 0u64;
    while console.is_running() && steps < max_steps {
        let pc = console.cpu().pc();

        if trace {
            match trace_line(&mut console) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("⚠️  Trace failed at PC=${:04X}: {}", pc, e),
            }
        }

        match console.step() {
            Ok(Step::Unimplemented { address, instruction }) => {
                println!("⏹  {} at ${:04X} is not implemented, stopping", instruction, address);
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("❌ CPU error at PC=${:04X}: {}", pc, e);
                std::process::exit(1);
            }
        }
        steps += 1;
    }

    let regs = &console.cpu().regs;
    println!();
    println!("━━━ Result ━━━");
    println!("Steps:  {}", steps);
    println!("State:  {:?}", console.state());
    println!("A: ${:02X}  X: ${:02X}  Y: ${:02X}", regs.a(), regs.x(), regs.y());
    println!("SP: ${:02X}  PC: ${:04X}", regs.sp(), regs.pc());
    println!("P: {}", regs.status());

    if steps >= max_steps {
        println!();
        println!("⚠️  Reached max steps limit ({}). Use --max-steps to increase.", max_steps);
    }
}

/// The instruction at PC followed by the registers, without executing it.
fn trace_line(console: &mut Console) -> Result<String, CpuError> {
    let peek = DisassemblyOptions {
        start: console.cpu().pc(),
        max_lines: Some(1),
    };
    let lines = console.disassemble(&peek)?;
    let text = lines.first().map(|l| l.to_string()).unwrap_or_default();
    Ok(format!("{:<36}  {:?}", text, console.cpu().regs))
}

#[cfg(feature = "tui")]
fn debug_rom(path: &str) {
    use famicom::run_debugger;

    println!("🔍 Loading: {}", path);
    let console = Console::new(load_rom(path));

    println!("🚀 Launching debugger...");
    println!();

    if let Err(e) = run_debugger(console) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_rom(_path: &str) {
    eprintln!("❌ This build has no debugger; enable the `tui` feature");
    std::process::exit(1);
}
