//! Fuzz target for the disassembler.
//!
//! Decoding is total, so any byte sequence must disassemble without panicking
//! and every instruction must be 1-3 bytes long.

#![no_main]

use arbitrary::Arbitrary;
use lib4510::disassembler::formatter::format_listing_line;
use lib4510::{disassemble, DisassemblyOptions};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    bytes: Vec<u8>,
    start_address: u16,
}

fuzz_target!(|input: FuzzInput| {
    // Limit input size to prevent OOM
    if input.bytes.len() > 65536 {
        return;
    }

    let options = DisassemblyOptions {
        start_address: input.start_address,
    };
    let instructions = disassemble(&input.bytes, options);

    let mut total_size: usize = 0;
    let mut expected_address = input.start_address;

    for instr in &instructions {
        assert_eq!(instr.address, expected_address);
        assert!(instr.size_bytes >= 1 && instr.size_bytes <= 3);
        assert_eq!(instr.operand_bytes.len(), instr.size_bytes as usize - 1);

        // Formatting must never fall back to the mismatch marker
        let line = format_listing_line(instr, instr.address as u32, false);
        assert!(!line.ends_with('?'));

        total_size += instr.size_bytes as usize;
        expected_address = instr.next_address();
    }

    // The last instruction may run past the input by at most two bytes
    assert!(total_size >= input.bytes.len());
    assert!(total_size < input.bytes.len() + 3);
});
