//! # Opcode Metadata Table
//!
//! This module contains the complete 256-entry opcode metadata table that serves as the
//! single source of truth for all 4510 instruction information. Decoding is one lookup
//! into this table; assembly searches it for a `(mnemonic, addressing mode)` pair.
//!
//! Unlike the NMOS 6502, the 4510 defines every one of the 256 opcode bytes, so there are
//! no placeholder entries. `$EA` is `EOM` ("end of mapping"), which doubles as the
//! 4510's `NOP`.

use crate::addressing::AddressingMode;
use crate::addressing::AddressingMode::*;

/// Metadata for a single 4510 opcode.
///
/// # Examples
///
/// ```
/// use lib4510::{OPCODE_TABLE, AddressingMode};
///
/// // Look up LDA immediate (opcode 0xA9)
/// let lda_imm = &OPCODE_TABLE[0xA9];
/// assert_eq!(lda_imm.mnemonic, "LDA");
/// assert_eq!(lda_imm.addressing_mode, AddressingMode::Immediate);
/// assert_eq!(lda_imm.size_bytes, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeMetadata {
    /// Instruction mnemonic (e.g., "LDA", "BBR3", "PHW").
    pub mnemonic: &'static str,

    /// Addressing mode for this instruction.
    pub addressing_mode: AddressingMode,

    /// Total instruction size in bytes (opcode + operands), 1-3.
    pub size_bytes: u8,
}

const fn op(mnemonic: &'static str, addressing_mode: AddressingMode) -> OpcodeMetadata {
    OpcodeMetadata {
        mnemonic,
        addressing_mode,
        size_bytes: addressing_mode.instruction_size(),
    }
}

/// Complete 256-entry opcode metadata table indexed by opcode byte value.
///
/// # Examples
///
/// ```
/// use lib4510::OPCODE_TABLE;
///
/// let jsr = &OPCODE_TABLE[0x20];
/// assert_eq!(jsr.mnemonic, "JSR");
/// assert_eq!(jsr.size_bytes, 3);
/// ```
pub const OPCODE_TABLE: [OpcodeMetadata; 256] = [
    // 0x00 - 0x0F
    op("BRK", Implicit), // 0x00
    op("ORA", IndirectX), // 0x01
    op("CLE", Implicit), // 0x02
    op("SEE", Implicit), // 0x03
    op("TSB", ZeroPage), // 0x04
    op("ORA", ZeroPage), // 0x05
    op("ASL", ZeroPage), // 0x06
    op("RMB0", ZeroPage), // 0x07
    op("PHP", Implicit), // 0x08
    op("ORA", Immediate), // 0x09
    op("ASL", Accumulator), // 0x0A
    op("TSY", Implicit), // 0x0B
    op("TSB", Absolute), // 0x0C
    op("ORA", Absolute), // 0x0D
    op("ASL", Absolute), // 0x0E
    op("BBR0", ZeroPageRelative), // 0x0F
    // 0x10 - 0x1F
    op("BPL", Relative), // 0x10
    op("ORA", IndirectY), // 0x11
    op("ORA", IndirectZ), // 0x12
    op("BPL", RelativeWord), // 0x13
    op("TRB", ZeroPage), // 0x14
    op("ORA", ZeroPageX), // 0x15
    op("ASL", ZeroPageX), // 0x16
    op("RMB1", ZeroPage), // 0x17
    op("CLC", Implicit), // 0x18
    op("ORA", AbsoluteY), // 0x19
    op("INC", Accumulator), // 0x1A
    op("INZ", Implicit), // 0x1B
    op("TRB", Absolute), // 0x1C
    op("ORA", AbsoluteX), // 0x1D
    op("ASL", AbsoluteX), // 0x1E
    op("BBR1", ZeroPageRelative), // 0x1F
    // 0x20 - 0x2F
    op("JSR", Absolute), // 0x20
    op("AND", IndirectX), // 0x21
    op("JSR", Indirect), // 0x22
    op("JSR", IndirectAbsoluteX), // 0x23
    op("BIT", ZeroPage), // 0x24
    op("AND", ZeroPage), // 0x25
    op("ROL", ZeroPage), // 0x26
    op("RMB2", ZeroPage), // 0x27
    op("PLP", Implicit), // 0x28
    op("AND", Immediate), // 0x29
    op("ROL", Accumulator), // 0x2A
    op("TYS", Implicit), // 0x2B
    op("BIT", Absolute), // 0x2C
    op("AND", Absolute), // 0x2D
    op("ROL", Absolute), // 0x2E
    op("BBR2", ZeroPageRelative), // 0x2F
    // 0x30 - 0x3F
    op("BMI", Relative), // 0x30
    op("AND", IndirectY), // 0x31
    op("AND", IndirectZ), // 0x32
    op("BMI", RelativeWord), // 0x33
    op("BIT", ZeroPageX), // 0x34
    op("AND", ZeroPageX), // 0x35
    op("ROL", ZeroPageX), // 0x36
    op("RMB3", ZeroPage), // 0x37
    op("SEC", Implicit), // 0x38
    op("AND", AbsoluteY), // 0x39
    op("DEC", Accumulator), // 0x3A
    op("DEZ", Implicit), // 0x3B
    op("BIT", AbsoluteX), // 0x3C
    op("AND", AbsoluteX), // 0x3D
    op("ROL", AbsoluteX), // 0x3E
    op("BBR3", ZeroPageRelative), // 0x3F
    // 0x40 - 0x4F
    op("RTI", Implicit), // 0x40
    op("EOR", IndirectX), // 0x41
    op("NEG", Accumulator), // 0x42
    op("ASR", Accumulator), // 0x43
    op("ASR", ZeroPage), // 0x44
    op("EOR", ZeroPage), // 0x45
    op("LSR", ZeroPage), // 0x46
    op("RMB4", ZeroPage), // 0x47
    op("PHA", Implicit), // 0x48
    op("EOR", Immediate), // 0x49
    op("LSR", Accumulator), // 0x4A
    op("TAZ", Implicit), // 0x4B
    op("JMP", Absolute), // 0x4C
    op("EOR", Absolute), // 0x4D
    op("LSR", Absolute), // 0x4E
    op("BBR4", ZeroPageRelative), // 0x4F
    // 0x50 - 0x5F
    op("BVC", Relative), // 0x50
    op("EOR", IndirectY), // 0x51
    op("EOR", IndirectZ), // 0x52
    op("BVC", RelativeWord), // 0x53
    op("ASR", ZeroPageX), // 0x54
    op("EOR", ZeroPageX), // 0x55
    op("LSR", ZeroPageX), // 0x56
    op("RMB5", ZeroPage), // 0x57
    op("CLI", Implicit), // 0x58
    op("EOR", AbsoluteY), // 0x59
    op("PHY", Implicit), // 0x5A
    op("TAB", Implicit), // 0x5B
    op("MAP", Implicit), // 0x5C
    op("EOR", AbsoluteX), // 0x5D
    op("LSR", AbsoluteX), // 0x5E
    op("BBR5", ZeroPageRelative), // 0x5F
    // 0x60 - 0x6F
    op("RTS", Implicit), // 0x60
    op("ADC", IndirectX), // 0x61
    op("RTN", Immediate), // 0x62
    op("BSR", RelativeWord), // 0x63
    op("STZ", ZeroPage), // 0x64
    op("ADC", ZeroPage), // 0x65
    op("ROR", ZeroPage), // 0x66
    op("RMB6", ZeroPage), // 0x67
    op("PLA", Implicit), // 0x68
    op("ADC", Immediate), // 0x69
    op("ROR", Accumulator), // 0x6A
    op("TZA", Implicit), // 0x6B
    op("JMP", Indirect), // 0x6C
    op("ADC", Absolute), // 0x6D
    op("ROR", Absolute), // 0x6E
    op("BBR6", ZeroPageRelative), // 0x6F
    // 0x70 - 0x7F
    op("BVS", Relative), // 0x70
    op("ADC", IndirectY), // 0x71
    op("ADC", IndirectZ), // 0x72
    op("BVS", RelativeWord), // 0x73
    op("STZ", ZeroPageX), // 0x74
    op("ADC", ZeroPageX), // 0x75
    op("ROR", ZeroPageX), // 0x76
    op("RMB7", ZeroPage), // 0x77
    op("SEI", Implicit), // 0x78
    op("ADC", AbsoluteY), // 0x79
    op("PLY", Implicit), // 0x7A
    op("TBA", Implicit), // 0x7B
    op("JMP", IndirectAbsoluteX), // 0x7C
    op("ADC", AbsoluteX), // 0x7D
    op("ROR", AbsoluteX), // 0x7E
    op("BBR7", ZeroPageRelative), // 0x7F
    // 0x80 - 0x8F
    op("BRA", Relative), // 0x80
    op("STA", IndirectX), // 0x81
    op("STA", StackIndirectY), // 0x82
    op("BRA", RelativeWord), // 0x83
    op("STY", ZeroPage), // 0x84
    op("STA", ZeroPage), // 0x85
    op("STX", ZeroPage), // 0x86
    op("SMB0", ZeroPage), // 0x87
    op("DEY", Implicit), // 0x88
    op("BIT", Immediate), // 0x89
    op("TXA", Implicit), // 0x8A
    op("STY", AbsoluteX), // 0x8B
    op("STY", Absolute), // 0x8C
    op("STA", Absolute), // 0x8D
    op("STX", Absolute), // 0x8E
    op("BBS0", ZeroPageRelative), // 0x8F
    // 0x90 - 0x9F
    op("BCC", Relative), // 0x90
    op("STA", IndirectY), // 0x91
    op("STA", IndirectZ), // 0x92
    op("BCC", RelativeWord), // 0x93
    op("STY", ZeroPageX), // 0x94
    op("STA", ZeroPageX), // 0x95
    op("STX", ZeroPageY), // 0x96
    op("SMB1", ZeroPage), // 0x97
    op("TYA", Implicit), // 0x98
    op("STA", AbsoluteY), // 0x99
    op("TXS", Implicit), // 0x9A
    op("STX", AbsoluteY), // 0x9B
    op("STZ", Absolute), // 0x9C
    op("STA", AbsoluteX), // 0x9D
    op("STZ", AbsoluteX), // 0x9E
    op("BBS1", ZeroPageRelative), // 0x9F
    // 0xA0 - 0xAF
    op("LDY", Immediate), // 0xA0
    op("LDA", IndirectX), // 0xA1
    op("LDX", Immediate), // 0xA2
    op("LDZ", Immediate), // 0xA3
    op("LDY", ZeroPage), // 0xA4
    op("LDA", ZeroPage), // 0xA5
    op("LDX", ZeroPage), // 0xA6
    op("SMB2", ZeroPage), // 0xA7
    op("TAY", Implicit), // 0xA8
    op("LDA", Immediate), // 0xA9
    op("TAX", Implicit), // 0xAA
    op("LDZ", Absolute), // 0xAB
    op("LDY", Absolute), // 0xAC
    op("LDA", Absolute), // 0xAD
    op("LDX", Absolute), // 0xAE
    op("BBS2", ZeroPageRelative), // 0xAF
    // 0xB0 - 0xBF
    op("BCS", Relative), // 0xB0
    op("LDA", IndirectY), // 0xB1
    op("LDA", IndirectZ), // 0xB2
    op("BCS", RelativeWord), // 0xB3
    op("LDY", ZeroPageX), // 0xB4
    op("LDA", ZeroPageX), // 0xB5
    op("LDX", ZeroPageY), // 0xB6
    op("SMB3", ZeroPage), // 0xB7
    op("CLV", Implicit), // 0xB8
    op("LDA", AbsoluteY), // 0xB9
    op("TSX", Implicit), // 0xBA
    op("LDZ", AbsoluteX), // 0xBB
    op("LDY", AbsoluteX), // 0xBC
    op("LDA", AbsoluteX), // 0xBD
    op("LDX", AbsoluteY), // 0xBE
    op("BBS3", ZeroPageRelative), // 0xBF
    // 0xC0 - 0xCF
    op("CPY", Immediate), // 0xC0
    op("CMP", IndirectX), // 0xC1
    op("CPZ", Immediate), // 0xC2
    op("DEW", ZeroPage), // 0xC3
    op("CPY", ZeroPage), // 0xC4
    op("CMP", ZeroPage), // 0xC5
    op("DEC", ZeroPage), // 0xC6
    op("SMB4", ZeroPage), // 0xC7
    op("INY", Implicit), // 0xC8
    op("CMP", Immediate), // 0xC9
    op("DEX", Implicit), // 0xCA
    op("ASW", Absolute), // 0xCB
    op("CPY", Absolute), // 0xCC
    op("CMP", Absolute), // 0xCD
    op("DEC", Absolute), // 0xCE
    op("BBS4", ZeroPageRelative), // 0xCF
    // 0xD0 - 0xDF
    op("BNE", Relative), // 0xD0
    op("CMP", IndirectY), // 0xD1
    op("CMP", IndirectZ), // 0xD2
    op("BNE", RelativeWord), // 0xD3
    op("CPZ", ZeroPage), // 0xD4
    op("CMP", ZeroPageX), // 0xD5
    op("DEC", ZeroPageX), // 0xD6
    op("SMB5", ZeroPage), // 0xD7
    op("CLD", Implicit), // 0xD8
    op("CMP", AbsoluteY), // 0xD9
    op("PHX", Implicit), // 0xDA
    op("PHZ", Implicit), // 0xDB
    op("CPZ", Absolute), // 0xDC
    op("CMP", AbsoluteX), // 0xDD
    op("DEC", AbsoluteX), // 0xDE
    op("BBS5", ZeroPageRelative), // 0xDF
    // 0xE0 - 0xEF
    op("CPX", Immediate), // 0xE0
    op("SBC", IndirectX), // 0xE1
    op("LDA", StackIndirectY), // 0xE2
    op("INW", ZeroPage), // 0xE3
    op("CPX", ZeroPage), // 0xE4
    op("SBC", ZeroPage), // 0xE5
    op("INC", ZeroPage), // 0xE6
    op("SMB6", ZeroPage), // 0xE7
    op("INX", Implicit), // 0xE8
    op("SBC", Immediate), // 0xE9
    op("EOM", Implicit), // 0xEA
    op("ROW", Absolute), // 0xEB
    op("CPX", Absolute), // 0xEC
    op("SBC", Absolute), // 0xED
    op("INC", Absolute), // 0xEE
    op("BBS6", ZeroPageRelative), // 0xEF
    // 0xF0 - 0xFF
    op("BEQ", Relative), // 0xF0
    op("SBC", IndirectY), // 0xF1
    op("SBC", IndirectZ), // 0xF2
    op("BEQ", RelativeWord), // 0xF3
    op("PHW", ImmediateWord), // 0xF4
    op("SBC", ZeroPageX), // 0xF5
    op("INC", ZeroPageX), // 0xF6
    op("SMB7", ZeroPage), // 0xF7
    op("SED", Implicit), // 0xF8
    op("SBC", AbsoluteY), // 0xF9
    op("PLX", Implicit), // 0xFA
    op("PLZ", Implicit), // 0xFB
    op("PHW", Absolute), // 0xFC
    op("SBC", AbsoluteX), // 0xFD
    op("INC", AbsoluteX), // 0xFE
    op("BBS7", ZeroPageRelative), // 0xFF
];

/// Mnemonics accepted on input that the table spells differently.
const MNEMONIC_ALIASES: &[(&str, &str)] = &[("NOP", "EOM")];

/// Normalizes an input mnemonic: upper-cases it and resolves aliases.
pub fn canonical_mnemonic(mnemonic: &str) -> String {
    let upper = mnemonic.trim().to_ascii_uppercase();
    MNEMONIC_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(upper)
}

/// Returns true if any opcode uses this mnemonic (case-insensitive, aliases allowed).
pub fn is_valid_mnemonic(mnemonic: &str) -> bool {
    let mnemonic = canonical_mnemonic(mnemonic);
    OPCODE_TABLE.iter().any(|meta| meta.mnemonic == mnemonic)
}

/// Finds the opcode byte for a canonical mnemonic in a given addressing mode.
pub fn find_opcode(mnemonic: &str, mode: AddressingMode) -> Option<u8> {
    OPCODE_TABLE
        .iter()
        .position(|meta| meta.mnemonic == mnemonic && meta.addressing_mode == mode)
        .map(|index| index as u8)
}
