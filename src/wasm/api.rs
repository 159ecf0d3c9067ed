//! WASM API for the 4510 instruction codec.
//!
//! Exposes single-line assembly and disassembly of a byte buffer to
//! JavaScript. Talking to a target needs a serial link and is not available
//! from the browser.

use crate::assembler;
use crate::disassembler::formatter::format_operand;
use crate::disassembler::{disassemble as disassemble_bytes, DisassemblyOptions};
use wasm_bindgen::prelude::*;

/// Result of assembling one line
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct AssemblyResult {
    success: bool,
    machine_code: Vec<u8>,
    address: u16,
    error_message: Option<String>,
}

#[wasm_bindgen]
impl AssemblyResult {
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }

    #[wasm_bindgen(getter)]
    pub fn machine_code(&self) -> Vec<u8> {
        self.machine_code.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn address(&self) -> u16 {
        self.address
    }

    #[wasm_bindgen(getter)]
    pub fn error_message(&self) -> Option<String> {
        self.error_message.clone()
    }
}

/// One decoded instruction
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct DisassemblyLine {
    address: u16,
    bytes: Vec<u8>,
    mnemonic: String,
    operand: String,
}

#[wasm_bindgen]
impl DisassemblyLine {
    #[wasm_bindgen(getter)]
    pub fn address(&self) -> u16 {
        self.address
    }

    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mnemonic(&self) -> String {
        self.mnemonic.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn operand(&self) -> String {
        self.operand.clone()
    }
}

/// Assemble one line of 4510 source for placement at `address`
#[wasm_bindgen]
pub fn assemble_line(line: &str, address: u16) -> AssemblyResult {
    match assembler::assemble_line(line, address) {
        Ok(encoded) => AssemblyResult {
            success: true,
            machine_code: encoded.bytes,
            address,
            error_message: None,
        },
        Err(e) => AssemblyResult {
            success: false,
            machine_code: Vec::new(),
            address,
            error_message: Some(e.to_string()),
        },
    }
}

/// Disassemble up to `num_instructions` instructions from `bytes`
#[wasm_bindgen]
pub fn disassemble(bytes: &[u8], start_addr: u16, num_instructions: u32) -> js_sys::Array {
    let opts = DisassemblyOptions {
        start_address: start_addr,
    };

    disassemble_bytes(bytes, opts)
        .iter()
        .take(num_instructions as usize)
        .map(|instr| {
            let mut bytes = vec![instr.opcode];
            bytes.extend_from_slice(&instr.operand_bytes);

            JsValue::from(DisassemblyLine {
                address: instr.address,
                bytes,
                mnemonic: instr.mnemonic.to_string(),
                operand: format_operand(instr),
            })
        })
        .collect()
}
