//! Fuzz target for the one-line assembler.
//!
//! Arbitrary text must either encode or fail with an error, never panic.
//! Whatever encodes must decode back to the same opcode and length.

#![no_main]

use arbitrary::Arbitrary;
use lib4510::{assemble_line, decode_instruction};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    line: String,
    address: u16,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(encoded) = assemble_line(&input.line, input.address) else {
        return;
    };

    assert!(!encoded.is_empty() && encoded.len() <= 3);

    let decoded = decode_instruction(&encoded.bytes, input.address);
    assert_eq!(decoded.opcode, encoded.opcode);
    assert_eq!(decoded.size_bytes as usize, encoded.len());
});
