//! Wire format of the remote monitor
//!
//! Commands are single text lines; replies are text lines with fixed-width,
//! case-insensitive hex fields. The command strings built here must match the
//! firmware byte for byte.

use crate::memory::{MemoryWindow, ADDRESS_MASK, WINDOW_SIZE};
use crate::registers::Registers;

/// Most bytes one `s` command carries.
pub const MAX_WRITE_CHUNK: usize = 8;

/// Register query.
pub const READ_REGISTERS: &str = "r";

/// Single step: an empty line.
pub const SINGLE_STEP: &str = "";

/// Hardware-assisted step over.
pub const STEP_OVER: &str = "N";

/// `m<addr7hex>`: read 16 bytes.
pub fn read_memory(physical: u32) -> String {
    format!("m{:07X}", physical & ADDRESS_MASK)
}

/// `M<addr>`: read 256 bytes as 16 lines.
pub fn read_memory_bulk(physical: u32) -> String {
    format!("M{:04X}", physical & ADDRESS_MASK)
}

/// `s<addr7hex> <hex> <hex>...`: write bytes.
pub fn write_memory(physical: u32, bytes: &[u8]) -> String {
    let mut command = format!("s{:07X}", physical & ADDRESS_MASK);
    for byte in bytes {
        command.push_str(&format!(" {:02X}", byte));
    }
    command
}

/// `b<addr4hex>`: arm the hardware breakpoint.
pub fn set_breakpoint(address: u16) -> String {
    format!("b{:04X}", address)
}

/// `g<addr4hex>`: set the program counter.
pub fn set_pc(address: u16) -> String {
    format!("g{:04X}", address)
}

/// `t0` lets the CPU run; `t1` stops it in trace mode.
pub fn set_run_mode(running: bool) -> &'static str {
    if running {
        "t0"
    } else {
        "t1"
    }
}

fn hex_field<T>(field: &str, digits: usize, parse: fn(&str, u32) -> Result<T, std::num::ParseIntError>) -> Option<T> {
    if field.is_empty() || field.len() > digits {
        return None;
    }
    parse(field, 16).ok()
}

fn hex8(field: &str) -> Option<u8> {
    hex_field(field, 2, u8::from_str_radix)
}

fn hex16(field: &str) -> Option<u16> {
    hex_field(field, 4, u16::from_str_radix)
}

/// Parse the value line of a register dump.
///
/// Field order: `PC A X Y Z B SP MAPH MAPL LASTOP O1 O2 FLAGS`. Columns after
/// the flags are ignored. Returns `None` for header, echo or damaged lines.
pub fn parse_registers(line: &str) -> Option<Registers> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 13 {
        return None;
    }

    Some(Registers {
        pc: hex16(fields[0])?,
        a: hex8(fields[1])?,
        x: hex8(fields[2])?,
        y: hex8(fields[3])?,
        z: hex8(fields[4])?,
        b: hex8(fields[5])?,
        sp: hex16(fields[6])?,
        maph: hex16(fields[7])?,
        mapl: hex16(fields[8])?,
        last_op: hex8(fields[9])?,
        reserved: [hex8(fields[10])?, hex8(fields[11])?],
        flags: fields[12].to_string(),
    })
}

/// Parse one `:<addr>:<32 hex chars>` memory line.
///
/// Spaces between the byte pairs are tolerated.
pub fn parse_memory_line(line: &str) -> Option<MemoryWindow> {
    let rest = line.trim().strip_prefix(':')?;
    let (address, data) = rest.split_once(':')?;
    let base = u32::from_str_radix(address.trim(), 16).ok()?;

    let digits: Vec<u8> = data
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .take(WINDOW_SIZE * 2)
        .collect();
    if digits.len() < WINDOW_SIZE * 2 {
        return None;
    }

    let mut bytes = [0u8; WINDOW_SIZE];
    for (slot, pair) in bytes.iter_mut().zip(digits.chunks(2)) {
        let pair = std::str::from_utf8(pair).ok()?;
        *slot = u8::from_str_radix(pair, 16).ok()?;
    }

    Some(MemoryWindow { base, bytes })
}
