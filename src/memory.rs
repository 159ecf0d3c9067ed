//! # Target Memory Addressing
//!
//! The remote monitor exposes a 28-bit physical address space. A 16-bit CPU
//! address is reachable through a fixed alias: OR-ing `$777` into the upper
//! 12 bits yields an address the monitor resolves through the CPU's current
//! memory mapping. Both forms name the same physical byte; the CPU-context
//! form is a view, not a separate memory.

use std::fmt;

/// Upper 12 bits that select the CPU-context view of a 16-bit address.
pub const CPU_CONTEXT_BASE: u32 = 0x0777_0000;

/// Upper 12 bits of hypervisor-space addresses.
pub const HYPERVISOR_BASE: u32 = 0x0FFF_0000;

/// Mask of the 28-bit physical address space.
pub const ADDRESS_MASK: u32 = 0x0FFF_FFFF;

/// Number of bytes returned by one memory read.
pub const WINDOW_SIZE: usize = 16;

/// An address on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// 16-bit address resolved through the CPU's mapping (`$777xxxx` alias).
    Cpu(u16),

    /// 28-bit physical address.
    Flat(u32),
}

impl Address {
    /// The 28-bit address sent on the wire.
    pub fn physical(self) -> u32 {
        match self {
            Address::Cpu(addr) => CPU_CONTEXT_BASE | addr as u32,
            Address::Flat(addr) => addr & ADDRESS_MASK,
        }
    }

    /// Low 16 bits, as seen by the CPU's program counter.
    pub fn cpu_address(self) -> u16 {
        match self {
            Address::Cpu(addr) => addr,
            Address::Flat(addr) => addr as u16,
        }
    }

    /// The address `offset` bytes further on, staying in the same addressing form.
    pub fn offset(self, offset: u32) -> Address {
        match self {
            Address::Cpu(addr) => Address::Cpu(addr.wrapping_add(offset as u16)),
            Address::Flat(addr) => Address::Flat(addr.wrapping_add(offset) & ADDRESS_MASK),
        }
    }

    /// True for 28-bit physical addressing.
    pub fn is_flat(self) -> bool {
        matches!(self, Address::Flat(_))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Cpu(addr) => write!(f, "${:04X}", addr),
            Address::Flat(addr) => write!(f, "${:07X}", addr & ADDRESS_MASK),
        }
    }
}

/// Sixteen contiguous bytes read from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryWindow {
    /// 28-bit address of `bytes[0]` as echoed by the monitor
    pub base: u32,

    /// The bytes themselves
    pub bytes: [u8; WINDOW_SIZE],
}

impl MemoryWindow {
    /// Byte at `index` within the window, or `None` past its end.
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Little-endian word starting at `index`; both bytes must lie in the window.
    pub fn word(&self, index: usize) -> Option<u16> {
        let bytes = self.bytes.get(index..index.checked_add(2)?)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Little-endian dword starting at `index`; all four bytes must lie in the window.
    pub fn dword(&self, index: usize) -> Option<u32> {
        let bytes = self.bytes.get(index..index.checked_add(4)?)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
