//! 4510 Assembler Module
//!
//! One-shot, single-line assembly: a mnemonic plus operand text becomes the
//! bytes of one instruction. Encoding is pure; writing the bytes to the target
//! is the caller's job.

pub mod encoder;
pub mod parser;

use crate::addressing::AddressingMode;
use crate::opcodes::{canonical_mnemonic, is_valid_mnemonic};
use parser::Operand;
use thiserror::Error;

/// Bytes of one assembled instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Opcode followed by operand bytes
    pub bytes: Vec<u8>,

    /// Selected opcode
    pub opcode: u8,

    /// Addressing mode the opcode was chosen for
    pub addressing_mode: AddressingMode,
}

impl Encoded {
    /// Encoded length in bytes (1-3).
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; an encoded instruction has at least its opcode.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reasons an instruction cannot be assembled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The mnemonic is not a 4510 instruction.
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),

    /// The mnemonic exists but not with this operand shape, size or branch distance.
    #[error("no addressing mode of {mnemonic} matches operand {operand:?}")]
    NoMatchingForm { mnemonic: String, operand: Operand },

    /// The operand text could not be parsed.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),
}

/// Encode `mnemonic` with `operand` text for placement at `address`.
///
/// # Examples
///
/// ```
/// use lib4510::assembler::encode;
///
/// assert_eq!(encode("LDA", "#$05", 0x2000).unwrap().bytes, vec![0xA9, 0x05]);
/// assert_eq!(encode("BCC", "$2005", 0x2000).unwrap().bytes, vec![0x90, 0x03]);
/// ```
pub fn encode(mnemonic: &str, operand: &str, address: u16) -> Result<Encoded, EncodeError> {
    let mnemonic = canonical_mnemonic(mnemonic);
    if !is_valid_mnemonic(&mnemonic) {
        return Err(EncodeError::UnknownMnemonic(mnemonic));
    }

    let operand = parser::parse_operand(operand)?;
    encoder::encode_operand(&mnemonic, operand, address)
}

/// Assemble one source line such as `"sta ($20),z"`.
///
/// An empty line is reported as an invalid operand; the line must hold at
/// least a mnemonic.
pub fn assemble_line(line: &str, address: u16) -> Result<Encoded, EncodeError> {
    let line = line.trim();
    let (mnemonic, operand) = match line.split_once(char::is_whitespace) {
        Some((mnemonic, operand)) => (mnemonic, operand),
        None => (line, ""),
    };

    if mnemonic.is_empty() {
        return Err(EncodeError::InvalidOperand("empty line".to_string()));
    }

    encode(mnemonic, operand, address)
}
