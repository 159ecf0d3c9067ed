//! Formatting functions for decoded instructions

use crate::addressing::AddressingMode;
use crate::disassembler::{Instruction, OperandValue};

/// Format a single instruction as assembly text
///
/// The output is accepted back by the assembler, so a listing line can be
/// edited and re-assembled in place.
pub fn format_instruction(instr: &Instruction) -> String {
    let operand = format_operand(instr);

    if operand.is_empty() {
        instr.mnemonic.to_string()
    } else {
        format!("{} {}", instr.mnemonic, operand)
    }
}

/// Format the operand based on addressing mode
pub fn format_operand(instr: &Instruction) -> String {
    use AddressingMode::*;

    match (instr.addressing_mode, instr.operand) {
        (Implicit, _) => String::new(),
        (Accumulator, _) => "A".to_string(),
        (Immediate, OperandValue::Byte(v)) => format!("#${:02X}", v),
        (ImmediateWord, OperandValue::Word(v)) => format!("#${:04X}", v),
        (ZeroPage, OperandValue::Byte(v)) => format!("${:02X}", v),
        (ZeroPageX, OperandValue::Byte(v)) => format!("${:02X},X", v),
        (ZeroPageY, OperandValue::Byte(v)) => format!("${:02X},Y", v),
        (Absolute, OperandValue::Word(v)) => format!("${:04X}", v),
        (AbsoluteX, OperandValue::Word(v)) => format!("${:04X},X", v),
        (AbsoluteY, OperandValue::Word(v)) => format!("${:04X},Y", v),
        (Indirect, OperandValue::Word(v)) => format!("(${:04X})", v),
        (IndirectAbsoluteX, OperandValue::Word(v)) => format!("(${:04X},X)", v),
        (IndirectX, OperandValue::Byte(v)) => format!("(${:02X},X)", v),
        (IndirectY, OperandValue::Byte(v)) => format!("(${:02X}),Y", v),
        (IndirectZ, OperandValue::Byte(v)) => format!("(${:02X}),Z", v),
        (StackIndirectY, OperandValue::Byte(v)) => format!("(${:02X},SP),Y", v),
        (Relative | RelativeWord, OperandValue::Target(target)) => format!("${:04X}", target),
        (ZeroPageRelative, OperandValue::BitBranch { zero_page, target }) => {
            format!("${:02X},${:04X}", zero_page, target)
        }
        // Instructions built by hand with a mismatched operand
        (_, _) => "?".to_string(),
    }
}

/// Format a listing line: address, raw bytes, then the instruction text.
///
/// `display_address` is printed with 7 hex digits when `flat` is set (28-bit
/// addressing) and 4 digits otherwise.
pub fn format_listing_line(instr: &Instruction, display_address: u32, flat: bool) -> String {
    let address = if flat {
        format!("${:07X}", display_address & 0x0FFF_FFFF)
    } else {
        format!("${:04X}", display_address & 0xFFFF)
    };

    let mut raw = format!("{:02X}", instr.opcode);
    for byte in &instr.operand_bytes {
        raw.push_str(&format!(" {:02X}", byte));
    }

    format!("{}  {:<8}  {}", address, raw, format_instruction(instr))
}
