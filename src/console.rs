//! The console: CPU, work RAM and an inserted cartridge.
//!
//! There is no global machine. Hosts build a [`Console`] from a loaded
//! [`Cartridge`] and drive it one step at a time, either executing or
//! producing a disassembly.

use log::info;
use serde::{Serialize, Deserialize};
use crate::asm::DisassemblyOptions;
use crate::cartridge::Cartridge;
use crate::cpu::{Cpu, CpuError, Instruction, Step, TraceLine};
use crate::memory::{Bus, Ram};

/// NTSC master clock, 236.25 MHz / 11.
pub const MASTER_CLOCK_HZ: f64 = 236_250_000.0 / 11.0;

/// CPU clock, master / 12.
pub const CPU_CLOCK_HZ: f64 = MASTER_CLOCK_HZ / 12.0;

/// Picture unit clock, master / 4.
pub const PPU_CLOCK_HZ: f64 = MASTER_CLOCK_HZ / 4.0;

/// Whether the console can keep executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleState {
    Running,
    /// Execution reached an instruction this core does not implement.
    Stopped { address: u16, instruction: Instruction },
}

/// A console with a cartridge inserted.
#[derive(Clone)]
pub struct Console {
    cpu: Cpu,
    ram: Ram,
    cartridge: Cartridge,
    state: ConsoleState,
    steps: u64,
}

impl Console {
    /// Build a console around `cartridge`. Call [`Console::reset`] before
    /// executing.
    pub fn new(cartridge: Cartridge) -> Self {
        Self {
            cpu: Cpu::new(),
            ram: Ram::new(),
            cartridge,
            state: ConsoleState::Running,
            steps: 0,
        }
    }

    /// Swap the cartridge. The console is left powered off; reset it.
    pub fn insert_cartridge(&mut self, cartridge: Cartridge) {
        self.cartridge = cartridge;
        self.cpu = Cpu::new();
        self.ram.clear();
        self.state = ConsoleState::Running;
        self.steps = 0;
    }

    /// Power-on state, RAM cleared, PC from the reset vector.
    pub fn reset(&mut self) -> Result<(), CpuError> {
        self.ram.clear();
        let bus = Bus::new(&mut self.ram, &self.cartridge);
        self.cpu.reset(&bus)?;
        self.state = ConsoleState::Running;
        self.steps = 0;
        info!("reset: PC={:04X}", self.cpu.pc());
        Ok(())
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> Result<Step, CpuError> {
        let mut bus = Bus::new(&mut self.ram, &self.cartridge);
        let step = self.cpu.execute_one(&mut bus)?;
        self.steps += 1;
        if let Step::Unimplemented { address, instruction } = step {
            self.state = ConsoleState::Stopped { address, instruction };
        }
        Ok(step)
    }

    /// Execute up to `max_steps` instructions, stopping early at an
    /// unimplemented one. Returns the number of steps taken.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        let start = self.steps;
        let limit = start.saturating_add(max_steps);

        while self.is_running() && self.steps < limit {
            self.step()?;
        }

        Ok(self.steps - start)
    }

    /// Point PC at `start` for a trace sweep.
    pub fn init_disassembly(&mut self, start: u16) {
        self.cpu.regs.jump(start);
    }

    /// Describe the instruction at PC and move PC past it.
    pub fn trace_one(&mut self) -> Result<TraceLine, CpuError> {
        let bus = Bus::new(&mut self.ram, &self.cartridge);
        self.cpu.trace_one(&bus)
    }

    /// Linear sweep from `options.start` to the end of the address space,
    /// or until `options.max_lines` lines have been produced.
    ///
    /// Runs on a copy of the CPU; the console itself is not changed.
    pub fn disassemble(&mut self, options: &DisassemblyOptions) -> Result<Vec<TraceLine>, CpuError> {
        let mut cpu = self.cpu.clone();
        cpu.regs.jump(options.start);
        let bus = Bus::new(&mut self.ram, &self.cartridge);

        let mut lines = Vec::new();
        loop {
            if options.max_lines.is_some_and(|max| lines.len() >= max) {
                break;
            }
            let line = cpu.trace_one(&bus)?;
            let origin = line.address;
            lines.push(line);
            // PC wrapped past $FFFF.
            if cpu.pc() <= origin {
                break;
            }
        }

        Ok(lines)
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn state(&self) -> ConsoleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ConsoleState::Running
    }

    /// Instructions executed since the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("cpu", &self.cpu)
            .field("cartridge", &self.cartridge)
            .finish()
    }
}
