//! Software breakpoints
//!
//! A software breakpoint overwrites three bytes of target code with
//! `JMP <self>`. When the CPU reaches it, the PC stops moving, which the
//! controller notices by polling.

use crate::memory::{Address, HYPERVISOR_BASE};

/// Opcode of `JMP $nnnn`.
pub const JMP_ABSOLUTE: u8 = 0x4C;

/// Length of the self-jump patch.
pub const WEDGE_LEN: usize = 3;

/// An armed self-jump patch and the bytes it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareBreakpoint {
    /// Where the patch was written, in the addressing form used to write it
    pub address: Address,

    /// Original bytes captured before patching
    pub saved: [u8; WEDGE_LEN],
}

impl SoftwareBreakpoint {
    /// CPU address the self-jump targets.
    pub fn cpu_address(&self) -> u16 {
        self.address.cpu_address()
    }

    /// True if `pc` lies within `[address, address + 3)`.
    pub fn contains(&self, pc: u16) -> bool {
        pc.wrapping_sub(self.cpu_address()) < WEDGE_LEN as u16
    }
}

/// The three patch bytes: `JMP <address>`.
pub fn wedge_bytes(address: u16) -> [u8; WEDGE_LEN] {
    let [lo, hi] = address.to_le_bytes();
    [JMP_ABSOLUTE, lo, hi]
}

/// Choose how a breakpoint address is written.
///
/// Hypervisor code lives in the `$FFFxxxx` region; addresses above `$FFFF`
/// are already physical. Everything else goes through the CPU's mapping.
pub fn patch_address(address: u32, in_hypervisor: bool) -> Address {
    if in_hypervisor {
        Address::Flat(HYPERVISOR_BASE | address)
    } else if address > 0xFFFF {
        Address::Flat(address)
    } else {
        Address::Cpu(address as u16)
    }
}
