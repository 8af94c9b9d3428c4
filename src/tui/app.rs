//! Debugger application state and logic.

use crate::{Console, ConsoleState, DisassemblyOptions, Step, TraceLine};
use std::collections::HashSet;

/// Rows in the RAM hex view, 16 bytes each.
pub const MEMORY_ROWS: usize = crate::memory::RAM_SIZE / 16;

/// Debugger application state.
pub struct DebuggerApp {
    /// The console being debugged.
    pub console: Console,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u16>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// RAM view scroll offset, in rows.
    pub mem_scroll: usize,
    /// Upcoming instructions from PC.
    pub disassembly: Vec<TraceLine>,
}

impl DebuggerApp {
    /// Wrap a console and reset it.
    pub fn new(console: Console) -> Self {
        let mut app = Self {
            console,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: String::new(),
            mem_scroll: 0,
            disassembly: Vec::new(),
        };
        app.reset();
        if app.status.starts_with("Reset") {
            app.status = "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into();
        }
        app
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if let ConsoleState::Stopped { address, instruction } = self.console.state() {
            self.status = format!("Stopped at ${:04X}: {} is not implemented", address, instruction);
            self.running = false;
            return;
        }

        let pc = self.console.cpu().pc();
        match self.console.step() {
            Ok(Step::Executed { instruction, .. }) => {
                self.status = format!("${:04X}: {}", pc, instruction);
            }
            Ok(Step::Unimplemented { instruction, .. }) => {
                self.status = format!("${:04X}: {} is not implemented", pc, instruction);
                self.running = false;
            }
            Ok(Step::Traced(_)) => {}
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
        self.refresh_disassembly();
    }

    /// Run until a breakpoint, stop or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.console.is_running() {
            self.running = false;
            self.status = format!("Stopped after {} steps", self.console.steps());
            return;
        }

        self.step();

        let pc = self.console.cpu().pc();
        if self.running && self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at ${:04X}", pc);
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.console.cpu().pc();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at ${:04X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at ${:04X}", pc);
        }
    }

    /// Reset the console.
    pub fn reset(&mut self) {
        self.running = false;
        self.status = match self.console.reset() {
            Ok(()) => format!("Reset. PC=${:04X}", self.console.cpu().pc()),
            Err(e) => format!("Reset failed: {}", e),
        };
        self.refresh_disassembly();
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.mem_scroll + 1 < MEMORY_ROWS {
            self.mem_scroll += 1;
        }
    }

    /// Re-trace the instructions from PC.
    fn refresh_disassembly(&mut self) {
        let options = DisassemblyOptions {
            start: self.console.cpu().pc(),
            max_lines: Some(64),
        };
        match self.console.disassemble(&options) {
            Ok(lines) => self.disassembly = lines,
            Err(e) => {
                self.disassembly.clear();
                self.status = format!("Disassembly failed: {}", e);
            }
        }
    }
}

/// Run the debugger on a console.
pub fn run_debugger(console: Console) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(console);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
                        _ => {}
                    }
                }
            }
        }

        // A batch per frame keeps the loop responsive.
        for _ in 0..256 {
            if !app.running {
                break;
            }
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::{Cartridge, HEADER_SIZE, PRG_BANK_SIZE, SIGNATURE};

    fn app(code: &[u8]) -> DebuggerApp {
        let mut prg = vec![0xEA; PRG_BANK_SIZE];
        prg[..code.len()].copy_from_slice(code);
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        let mut raw = vec![0u8; HEADER_SIZE];
        raw[..4].copy_from_slice(&SIGNATURE);
        raw[4] = 1;
        raw.extend(prg);
        DebuggerApp::new(Console::new(Cartridge::load(&raw).unwrap()))
    }

    #[test]
    fn test_starts_at_reset_vector() {
        let app = app(&[0xE8]);
        assert_eq!(app.console.cpu().pc(), 0x8000);
        assert_eq!(app.disassembly[0].text(), "INX");
        assert!(app.status.starts_with("Ready"));
    }

    #[test]
    fn test_step_updates_status_and_view() {
        let mut app = app(&[0xE8, 0xC8]);
        app.step();
        assert_eq!(app.status, "$8000: INX Implied");
        assert_eq!(app.disassembly[0].address, 0x8001);
    }

    #[test]
    fn test_breakpoint_halts_run() {
        let mut app = app(&[0xEA, 0xEA, 0xEA, 0xEA]);
        app.breakpoints.insert(0x8003);
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(!app.running);
        assert_eq!(app.console.cpu().pc(), 0x8003);
        assert_eq!(app.status, "Breakpoint at $8003");
    }

    #[test]
    fn test_unimplemented_stops_run() {
        let mut app = app(&[0xEA, 0x00]);
        app.run();
        for _ in 0..5 {
            app.tick();
        }
        assert!(!app.running);
        assert!(!app.console.is_running());
    }

    #[test]
    fn test_unreadable_program_reports_status() {
        let mut raw = vec![0u8; HEADER_SIZE];
        raw[..4].copy_from_slice(&SIGNATURE);
        let mut app = DebuggerApp::new(Console::new(Cartridge::load(&raw).unwrap()));
        // No program ROM behind $8000.
        app.console.init_disassembly(0x8000);
        app.step();
        assert!(app.disassembly.is_empty());
        assert!(app.status.starts_with("Disassembly failed"), "{}", app.status);
    }

    #[test]
    fn test_toggle_breakpoint() {
        let mut app = app(&[]);
        app.toggle_breakpoint();
        assert!(app.breakpoints.contains(&0x8000));
        app.toggle_breakpoint();
        assert!(app.breakpoints.is_empty());
    }
}
