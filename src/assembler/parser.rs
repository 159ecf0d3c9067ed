//! Operand syntax parser
//!
//! Classifies the surface syntax of an operand into exactly one [`Operand`]
//! shape. Which opcode a shape ends up as (8-bit or 16-bit form, branch or
//! address) is decided by the encoder, not here.

use crate::assembler::EncodeError;

/// Structured form of an operand, one variant per surface shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No operand (or `A`): implied and accumulator forms.
    None,

    /// `($nn,X)` or `($nnnn,X)`
    IndirectX(u16),

    /// `$nn,$nnnn`: bit-branch base-page address and target.
    ZeroPageRelative(u16, u16),

    /// `($nn),Y`
    IndirectY(u16),

    /// `($nn),Z`
    IndirectZ(u16),

    /// `$nn,X` or `$nnnn,X`
    IndexedX(u16),

    /// `$nn,Y` or `$nnnn,Y`
    IndexedY(u16),

    /// `($nnnn)`
    Indirect(u16),

    /// `($nn,SP),Y`
    StackIndirectY(u16),

    /// `$nnnn`: address, base-page address or branch target.
    Direct(u16),

    /// `#$nn` or `#$nnnn`
    Immediate(u16),
}

/// Parse a number from a string (supports hex $XX, decimal, binary %XXXXXXXX)
pub fn parse_number(s: &str) -> Result<u16, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("empty number string".to_string());
    }

    if let Some(hex) = s.strip_prefix('$') {
        u16::from_str_radix(hex, 16).map_err(|e| format!("invalid hex number '{}': {}", s, e))
    } else if let Some(bin) = s.strip_prefix('%') {
        u16::from_str_radix(bin, 2).map_err(|e| format!("invalid binary number '{}': {}", s, e))
    } else {
        s.parse::<u16>()
            .map_err(|e| format!("invalid decimal number '{}': {}", s, e))
    }
}

/// Classify operand text into an [`Operand`].
///
/// Whitespace is ignored and register letters are case-insensitive.
pub fn parse_operand(text: &str) -> Result<Operand, EncodeError> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    if compact.is_empty() || compact == "A" {
        return Ok(Operand::None);
    }

    let number = |s: &str| parse_number(s).map_err(EncodeError::InvalidOperand);

    if let Some(value) = compact.strip_prefix('#') {
        return Ok(Operand::Immediate(number(value)?));
    }

    if let Some(rest) = compact.strip_prefix('(') {
        let close = rest
            .find(')')
            .ok_or_else(|| EncodeError::InvalidOperand(format!("missing ')' in '{}'", text)))?;
        let (inner, after) = (&rest[..close], &rest[close + 1..]);

        return match after {
            "" => match inner.strip_suffix(",X") {
                Some(base) => Ok(Operand::IndirectX(number(base)?)),
                None => Ok(Operand::Indirect(number(inner)?)),
            },
            ",Y" => match inner.strip_suffix(",SP") {
                Some(base) => Ok(Operand::StackIndirectY(number(base)?)),
                None => Ok(Operand::IndirectY(number(inner)?)),
            },
            ",Z" => Ok(Operand::IndirectZ(number(inner)?)),
            _ => Err(EncodeError::InvalidOperand(format!(
                "unexpected '{}' after indirect operand",
                after
            ))),
        };
    }

    match compact.split_once(',') {
        None => Ok(Operand::Direct(number(&compact)?)),
        Some((base, "X")) => Ok(Operand::IndexedX(number(base)?)),
        Some((base, "Y")) => Ok(Operand::IndexedY(number(base)?)),
        Some((zero_page, target)) => Ok(Operand::ZeroPageRelative(
            number(zero_page)?,
            number(target)?,
        )),
    }
}
