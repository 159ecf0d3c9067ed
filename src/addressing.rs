//! # Addressing Modes
//!
//! This module defines the addressing modes of the 4510 processor. The 4510
//! keeps every NMOS/CMOS 6502 mode and adds the 65CE02 extensions: the Z
//! index register, stack-pointer indirection, 16-bit immediates, 16-bit
//! relative branches and the zero-page bit-branch form.

/// 4510 addressing mode enumeration.
///
/// The addressing mode determines how the operand bytes following an opcode
/// are interpreted, both when decoding a listing and when choosing an opcode
/// during assembly.
///
/// # Operand Sizes
///
/// - **0 bytes**: Implicit, Accumulator
/// - **1 byte**: Immediate, ZeroPage, ZeroPageX, ZeroPageY, Relative,
///   IndirectX, IndirectY, IndirectZ, StackIndirectY
/// - **2 bytes**: ImmediateWord, Absolute, AbsoluteX, AbsoluteY, Indirect,
///   IndirectAbsoluteX, RelativeWord, ZeroPageRelative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// No operand, operation implied by instruction.
    ///
    /// Examples: CLC, RTS, TAZ
    Implicit,

    /// Operates directly on the accumulator register.
    ///
    /// Examples: ASL A, NEG A, INC A
    Accumulator,

    /// 8-bit constant operand in instruction.
    ///
    /// Example: LDA #$10
    Immediate,

    /// 16-bit constant operand, little-endian.
    ///
    /// Example: PHW #$1234
    ImmediateWord,

    /// 8-bit address in the base page.
    ///
    /// Example: LDA $80
    ZeroPage,

    /// Base-page address indexed by X.
    ///
    /// Example: LDA $80,X
    ZeroPageX,

    /// Base-page address indexed by Y.
    ///
    /// Example: LDX $80,Y
    ZeroPageY,

    /// Full 16-bit address.
    ///
    /// Example: JMP $1234
    Absolute,

    /// 16-bit address indexed by X.
    ///
    /// Example: LDA $1234,X
    AbsoluteX,

    /// 16-bit address indexed by Y.
    ///
    /// Example: LDA $1234,Y
    AbsoluteY,

    /// Indirect through a 16-bit pointer.
    ///
    /// Example: JMP ($FFFC), JSR ($2000)
    Indirect,

    /// Indirect through a 16-bit pointer table indexed by X.
    ///
    /// Example: JMP ($2000,X), JSR ($2000,X)
    IndirectAbsoluteX,

    /// Indexed indirect: (ZP + X) then dereference.
    ///
    /// Example: LDA ($40,X)
    IndirectX,

    /// Indirect indexed: ZP dereference then + Y.
    ///
    /// Example: LDA ($40),Y
    IndirectY,

    /// Indirect indexed: ZP dereference then + Z.
    ///
    /// Example: LDA ($40),Z
    IndirectZ,

    /// Stack-pointer relative pointer, then + Y.
    ///
    /// Example: LDA ($02,SP),Y
    StackIndirectY,

    /// Signed 8-bit offset for branch instructions.
    ///
    /// Example: BEQ label
    Relative,

    /// Signed 16-bit offset for long branches and BSR.
    ///
    /// Example: BSR label, BNE label (long form)
    RelativeWord,

    /// Base-page operand followed by a signed 8-bit branch offset.
    ///
    /// Example: BBR3 $20,label
    ZeroPageRelative,
}

impl AddressingMode {
    /// Number of operand bytes following the opcode.
    pub const fn operand_size(self) -> u8 {
        use AddressingMode::*;
        match self {
            Implicit | Accumulator => 0,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | Relative | IndirectX | IndirectY
            | IndirectZ | StackIndirectY => 1,
            ImmediateWord | Absolute | AbsoluteX | AbsoluteY | Indirect | IndirectAbsoluteX
            | RelativeWord | ZeroPageRelative => 2,
        }
    }

    /// Total encoded length, opcode included.
    pub const fn instruction_size(self) -> u8 {
        self.operand_size() + 1
    }

    /// Whether the operand is a branch displacement rather than an address or value.
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            AddressingMode::Relative | AddressingMode::RelativeWord | AddressingMode::ZeroPageRelative
        )
    }
}
