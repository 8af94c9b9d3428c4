//! TUI debugger for the NES core.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and status flag view
//! - Work RAM hex dump
//! - Step/run/breakpoint controls
//! - Disassembly from PC, traced without touching the console

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
