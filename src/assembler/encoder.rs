//! Instruction encoder for the 4510 assembler
//!
//! Maps a parsed [`Operand`] onto the opcode table. Shapes that admit both an
//! 8-bit and a 16-bit encoding try the narrow opcode first and fall back to
//! the wide one.

use crate::addressing::AddressingMode;
use crate::assembler::parser::Operand;
use crate::assembler::{EncodeError, Encoded};
use crate::opcodes::find_opcode;

/// Encode a canonical mnemonic with a parsed operand at `address`.
///
/// `address` is where the first byte will be written; it only matters for
/// branch displacements.
pub fn encode_operand(
    mnemonic: &str,
    operand: Operand,
    address: u16,
) -> Result<Encoded, EncodeError> {
    use AddressingMode::*;

    let encoded = match operand {
        Operand::None => {
            try_mode(mnemonic, Implicit, &[]).or_else(|| try_mode(mnemonic, Accumulator, &[]))
        }
        Operand::IndirectX(value) => try_byte(mnemonic, IndirectX, value)
            .or_else(|| try_word(mnemonic, IndirectAbsoluteX, value)),
        Operand::ZeroPageRelative(zero_page, target) => {
            try_bit_branch(mnemonic, zero_page, target, address)
        }
        Operand::IndirectY(value) => try_byte(mnemonic, IndirectY, value),
        Operand::IndirectZ(value) => try_byte(mnemonic, IndirectZ, value),
        Operand::IndexedX(value) => {
            try_byte(mnemonic, ZeroPageX, value).or_else(|| try_word(mnemonic, AbsoluteX, value))
        }
        Operand::IndexedY(value) => {
            try_byte(mnemonic, ZeroPageY, value).or_else(|| try_word(mnemonic, AbsoluteY, value))
        }
        Operand::Indirect(value) => try_word(mnemonic, Indirect, value),
        Operand::StackIndirectY(value) => try_byte(mnemonic, StackIndirectY, value),
        Operand::Direct(value) => try_byte(mnemonic, ZeroPage, value)
            .or_else(|| try_word(mnemonic, Absolute, value))
            .or_else(|| try_short_branch(mnemonic, value, address))
            .or_else(|| try_long_branch(mnemonic, value, address)),
        Operand::Immediate(value) => try_byte(mnemonic, Immediate, value)
            .or_else(|| try_word(mnemonic, ImmediateWord, value)),
    };

    encoded.ok_or_else(|| EncodeError::NoMatchingForm {
        mnemonic: mnemonic.to_string(),
        operand,
    })
}

/// Signed displacement from the end of an instruction of `size` bytes at `address`.
pub fn branch_displacement(target: u16, address: u16, size: u8) -> i32 {
    let next = address.wrapping_add(size as u16);
    // Interpret the 16-bit difference as signed so branches across $FFFF wrap.
    target.wrapping_sub(next) as i16 as i32
}

fn try_mode(mnemonic: &str, mode: AddressingMode, operand: &[u8]) -> Option<Encoded> {
    let opcode = find_opcode(mnemonic, mode)?;
    let mut bytes = Vec::with_capacity(operand.len() + 1);
    bytes.push(opcode);
    bytes.extend_from_slice(operand);

    Some(Encoded {
        bytes,
        opcode,
        addressing_mode: mode,
    })
}

fn try_byte(mnemonic: &str, mode: AddressingMode, value: u16) -> Option<Encoded> {
    let value = u8::try_from(value).ok()?;
    try_mode(mnemonic, mode, &[value])
}

fn try_word(mnemonic: &str, mode: AddressingMode, value: u16) -> Option<Encoded> {
    try_mode(mnemonic, mode, &value.to_le_bytes())
}

fn try_short_branch(mnemonic: &str, target: u16, address: u16) -> Option<Encoded> {
    let size = AddressingMode::Relative.instruction_size();
    let displacement = i8::try_from(branch_displacement(target, address, size)).ok()?;
    try_mode(mnemonic, AddressingMode::Relative, &[displacement as u8])
}

fn try_long_branch(mnemonic: &str, target: u16, address: u16) -> Option<Encoded> {
    let size = AddressingMode::RelativeWord.instruction_size();
    let displacement = target.wrapping_sub(address.wrapping_add(size as u16));
    try_mode(mnemonic, AddressingMode::RelativeWord, &displacement.to_le_bytes())
}

fn try_bit_branch(mnemonic: &str, zero_page: u16, target: u16, address: u16) -> Option<Encoded> {
    let zero_page = u8::try_from(zero_page).ok()?;
    let size = AddressingMode::ZeroPageRelative.instruction_size();
    let displacement = i8::try_from(branch_displacement(target, address, size)).ok()?;
    try_mode(
        mnemonic,
        AddressingMode::ZeroPageRelative,
        &[zero_page, displacement as u8],
    )
}
