//! WebAssembly bindings for the NES core.
//!
//! A browser host hands over ROM bytes from a file picker, then either
//! steps the console or asks for a disassembly listing.

use wasm_bindgen::prelude::*;
use crate::{Cartridge, Console, DisassemblyOptions};
use crate::asm::listing;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// WebAssembly-friendly console wrapper.
#[wasm_bindgen]
pub struct WasmNes {
    console: Option<Console>,
}

#[wasm_bindgen]
impl WasmNes {
    /// Create an empty console with no cartridge.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self { console: None }
    }

    /// Insert an iNES image and reset. Returns the header summary.
    #[wasm_bindgen]
    pub fn insert_rom(&mut self, bytes: &[u8]) -> Result<String, JsError> {
        let cartridge = Cartridge::load(bytes).map_err(js_error)?;
        let summary = cartridge.header().to_string();

        match self.console.as_mut() {
            Some(console) => console.insert_cartridge(cartridge),
            None => self.console = Some(Console::new(cartridge)),
        }
        self.console()?.reset().map_err(js_error)?;

        Ok(summary)
    }

    /// Point PC at $8000 for step-by-step tracing with `trace`.
    #[wasm_bindgen]
    pub fn init_disassembly(&mut self) -> Result<(), JsError> {
        let start = DisassemblyOptions::default().start;
        self.console()?.init_disassembly(start);
        Ok(())
    }

    /// Trace the instruction at PC and move past it.
    #[wasm_bindgen]
    pub fn trace(&mut self) -> Result<String, JsError> {
        let line = self.console()?.trace_one().map_err(js_error)?;
        Ok(line.to_string())
    }

    /// Full listing of program ROM from $8000.
    #[wasm_bindgen]
    pub fn disassemble(&mut self) -> Result<String, JsError> {
        let lines = self
            .console()?
            .disassemble(&DisassemblyOptions::default())
            .map_err(js_error)?;
        Ok(listing(&lines))
    }

    /// Execute one instruction. Returns a description of the outcome.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let step = self.console()?.step().map_err(js_error)?;
        Ok(format!("{:?}", step))
    }

    /// Execute up to `max_steps` instructions. Returns the count executed.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> Result<u64, JsError> {
        self.console()?.run_limited(max_steps as u64).map_err(js_error)
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.console.as_ref().map_or(0, |c| c.cpu().pc())
    }

    /// Get registers as JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        let console = self
            .console
            .as_ref()
            .ok_or_else(|| JsError::new("no cartridge inserted"))?;
        let regs = &console.cpu().regs;
        let value = serde_json::json!({
            "a": regs.a(),
            "x": regs.x(),
            "y": regs.y(),
            "sp": regs.sp(),
            "pc": regs.pc(),
            "p": regs.status().to_byte(),
            "flags": regs.status().to_string(),
            "steps": console.steps(),
            "state": console.state(),
        });
        serde_json::to_string(&value).map_err(js_error)
    }

    /// Work RAM contents.
    #[wasm_bindgen]
    pub fn ram(&self) -> js_sys::Uint8Array {
        match self.console.as_ref() {
            Some(c) => js_sys::Uint8Array::from(c.ram().dump(0, crate::memory::RAM_SIZE)),
            None => js_sys::Uint8Array::new_with_length(0),
        }
    }
}

impl WasmNes {
    fn console(&mut self) -> Result<&mut Console, JsError> {
        self.console.as_mut().ok_or_else(|| JsError::new("no cartridge inserted"))
    }
}

impl Default for WasmNes {
    fn default() -> Self {
        Self::new()
    }
}
