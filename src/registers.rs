//! # Register Snapshot
//!
//! One reading of the remote CPU's registers. A snapshot is never updated in
//! place; the controller asks the link for a fresh one on every poll.

/// MAPH value the monitor reports while the hypervisor is running.
pub const HYPERVISOR_MAPH: u16 = 0x3F00;

/// Register state reported by the monitor's `r` command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Registers {
    /// Program counter
    pub pc: u16,

    /// Accumulator
    pub a: u8,

    /// X index register
    pub x: u8,

    /// Y index register
    pub y: u8,

    /// Z index register
    pub z: u8,

    /// Base-page register
    pub b: u8,

    /// 16-bit stack pointer
    pub sp: u16,

    /// Upper mapping register
    pub maph: u16,

    /// Lower mapping register
    pub mapl: u16,

    /// Last opcode executed
    pub last_op: u8,

    /// Two monitor fields with no documented meaning, kept verbatim
    pub reserved: [u8; 2],

    /// Processor flags as printed by the monitor, e.g. `"..E..I.."`
    pub flags: String,
}

impl Registers {
    /// True while the hypervisor is mapped in.
    pub fn in_hypervisor(&self) -> bool {
        self.maph == HYPERVISOR_MAPH
    }
}
