//! Instruction decoder for the 4510 disassembler

use crate::addressing::AddressingMode;
use crate::disassembler::{Instruction, OperandValue};
use crate::opcodes::OPCODE_TABLE;

/// Decode a single instruction from a byte slice
///
/// # Arguments
///
/// * `bytes` - The byte slice starting at the instruction to decode
/// * `address` - The memory address of this instruction
///
/// # Returns
///
/// The decoded instruction. Decoding never fails: an empty slice decodes as
/// opcode `$00`, and operand bytes beyond the slice read as zero.
pub fn decode_instruction(bytes: &[u8], address: u16) -> Instruction {
    let byte_at = |index: usize| bytes.get(index).copied().unwrap_or(0);

    let opcode = byte_at(0);
    let metadata = &OPCODE_TABLE[opcode as usize];
    let size = metadata.size_bytes;

    let operand_bytes: Vec<u8> = (1..size as usize).map(byte_at).collect();
    let operand = operand_value(metadata.addressing_mode, &operand_bytes, address, size);

    Instruction {
        address,
        opcode,
        mnemonic: metadata.mnemonic,
        addressing_mode: metadata.addressing_mode,
        operand_bytes,
        operand,
        size_bytes: size,
    }
}

/// Destination of an 8-bit branch: sign-extended offset from the next instruction.
pub fn relative_target(address: u16, size: u8, offset: u8) -> u16 {
    address
        .wrapping_add(size as u16)
        .wrapping_add(offset as i8 as i16 as u16)
}

/// Destination of a 16-bit branch, wrapped to 16 bits.
pub fn relative_word_target(address: u16, size: u8, offset: u16) -> u16 {
    address.wrapping_add(size as u16).wrapping_add(offset)
}

fn operand_value(mode: AddressingMode, operand: &[u8], address: u16, size: u8) -> OperandValue {
    use AddressingMode::*;

    let word = || u16::from_le_bytes([operand[0], operand[1]]);

    match mode {
        Implicit | Accumulator => OperandValue::None,
        Immediate | ZeroPage | ZeroPageX | ZeroPageY | IndirectX | IndirectY | IndirectZ
        | StackIndirectY => OperandValue::Byte(operand[0]),
        ImmediateWord | Absolute | AbsoluteX | AbsoluteY | Indirect | IndirectAbsoluteX => {
            OperandValue::Word(word())
        }
        Relative => OperandValue::Target(relative_target(address, size, operand[0])),
        RelativeWord => OperandValue::Target(relative_word_target(address, size, word())),
        ZeroPageRelative => OperandValue::BitBranch {
            zero_page: operand[0],
            target: relative_target(address, size, operand[1]),
        },
    }
}
