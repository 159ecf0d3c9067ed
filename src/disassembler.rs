//! 4510 Disassembler Module
//!
//! Converts machine code into structured instructions. Decoding is total: every
//! opcode byte maps to an instruction, so callers can always advance by
//! `size_bytes` when walking code on the target.

pub mod decoder;
pub mod formatter;

use crate::addressing::AddressingMode;

pub use decoder::decode_instruction;

/// Operand value recovered from the bytes following the opcode.
///
/// Branch displacements are already resolved to absolute 16-bit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandValue {
    /// Implicit and accumulator modes carry no operand.
    None,

    /// One-byte operand: immediate value or base-page address.
    Byte(u8),

    /// Two-byte operand: 16-bit immediate or absolute address.
    Word(u16),

    /// Resolved destination of an 8- or 16-bit relative branch.
    Target(u16),

    /// Bit-branch form: tested base-page address plus resolved destination.
    BitBranch { zero_page: u8, target: u16 },
}

/// A single decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Memory address where this instruction starts
    pub address: u16,

    /// The opcode byte value (0x00-0xFF)
    pub opcode: u8,

    /// Instruction mnemonic (e.g., "LDA", "BBR0", "PHW")
    pub mnemonic: &'static str,

    /// Addressing mode used by this instruction
    pub addressing_mode: AddressingMode,

    /// Raw operand bytes (0-2 bytes depending on addressing mode)
    pub operand_bytes: Vec<u8>,

    /// Operand interpreted according to the addressing mode
    pub operand: OperandValue,

    /// Total size in bytes (1-3 bytes: opcode + operands)
    pub size_bytes: u8,
}

impl Instruction {
    /// Address of the instruction that follows this one, wrapped to 16 bits.
    pub fn next_address(&self) -> u16 {
        self.address.wrapping_add(self.size_bytes as u16)
    }

    /// True for the three JSR forms.
    pub fn is_subroutine_call(&self) -> bool {
        self.mnemonic == "JSR"
    }

    /// True for instructions that return from a subroutine or interrupt.
    pub fn is_return(&self) -> bool {
        matches!(self.mnemonic, "RTS" | "RTI" | "RTN")
    }
}

/// Options controlling disassembly
#[derive(Debug, Clone, Copy, Default)]
pub struct DisassemblyOptions {
    /// Address of the first byte in the slice
    pub start_address: u16,
}

/// Disassemble a byte slice into a vector of instructions
///
/// A trailing instruction whose operand bytes run past the end of the slice
/// is still decoded; missing operand bytes read as zero.
pub fn disassemble(bytes: &[u8], options: DisassemblyOptions) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut offset = 0;
    let mut address = options.start_address;

    while offset < bytes.len() {
        let instr = decode_instruction(&bytes[offset..], address);
        offset += instr.size_bytes as usize;
        address = instr.next_address();
        instructions.push(instr);
    }

    instructions
}
