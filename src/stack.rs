//! # Stack Walker
//!
//! Heuristic call-stack reconstruction. The eight words directly above the
//! stack pointer are taken to be the most recent return addresses; each one,
//! minus two, is the `JSR` that pushed it. This holds for shallow call chains
//! without interrupts or pushed data and is wrong otherwise. There is no real
//! unwinding.
//!
//! Frame 0 is always the live PC. A [`FrameCursor`] selects the frame that
//! disassembly and locals work on.

use crate::controller::ControllerSession;
use crate::disassembler::{decode_instruction, Instruction};
use crate::link::{LinkError, Transport};
use crate::memory::Address;
use log::{debug, info};
use serde::Deserialize;
use std::fmt;

/// Frames recovered from the stack, not counting the live PC.
pub const MAX_FRAMES: usize = 8;

/// Bytes a `JSR` pushes beyond the address of the call itself.
const RETURN_ADDRESS_BIAS: u16 = 2;

/// One entry of a backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 0 for the live PC, 1..=8 for recovered callers
    pub index: usize,

    /// PC for frame 0, the presumed call site otherwise
    pub address: u16,

    /// Instruction decoded at `address`
    pub instruction: Instruction,
}

/// Direction of a frame-cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    /// Toward the innermost frame (frame 0).
    Up,
    /// Toward older callers.
    Down,
}

/// Outcome of [`ControllerSession::move_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMove {
    Moved(usize),
    AtBoundary(usize),
}

impl fmt::Display for FrameMove {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameMove::Moved(index) => write!(f, "frame #{}", index),
            FrameMove::AtBoundary(0) => write!(f, "Already at highest frame"),
            FrameMove::AtBoundary(index) => {
                write!(f, "Already at lowest frame (#{})", index)
            }
        }
    }
}

/// Selected frame, always within `0..=MAX_FRAMES`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCursor(usize);

impl FrameCursor {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    pub fn move_by(&mut self, direction: FrameDirection) -> FrameMove {
        match direction {
            FrameDirection::Up if self.0 == 0 => FrameMove::AtBoundary(0),
            FrameDirection::Up => {
                self.0 -= 1;
                FrameMove::Moved(self.0)
            }
            FrameDirection::Down if self.0 == MAX_FRAMES => FrameMove::AtBoundary(MAX_FRAMES),
            FrameDirection::Down => {
                self.0 += 1;
                FrameMove::Moved(self.0)
            }
        }
    }
}

/// A variable stored on the software stack.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalVar {
    pub name: String,

    /// Offset from the stack-top baseline; negative offsets are locals below it
    pub offset: i32,

    pub size: usize,
}

/// Debug information about one function, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub address: u16,

    /// Bytes of parameters the function takes on the software stack
    #[serde(default)]
    pub param_size: u16,

    /// Locals in declaration order
    #[serde(default)]
    pub locals: Vec<LocalVar>,
}

/// Source of function debug information.
pub trait FunctionLookup {
    /// The function whose code contains `address`.
    fn function_containing(&self, address: u16) -> Option<&FunctionInfo>;
}

/// Value of a local as read from the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalData {
    Byte(u8),
    Word(u16),
    Dword(u32),
    Raw(Vec<u8>),
}

/// A local variable, where it lives, and what it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalValue {
    pub name: String,
    pub address: u16,
    pub data: LocalData,
}

impl fmt::Display for LocalValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "@ ${:04X} :", self.address)?;
        match &self.data {
            LocalData::Byte(value) => write!(f, " {}: {:02X}", self.name, value),
            LocalData::Word(value) => write!(f, " {}: {:04X}", self.name, value),
            LocalData::Dword(value) => write!(f, " {}: {:08X}", self.name, value),
            LocalData::Raw(bytes) => {
                write!(f, " {}[{}] =", self.name, bytes.len())?;
                for (row, chunk) in bytes.chunks(16).enumerate() {
                    write!(f, "\n  ${:04X}:", self.address.wrapping_add((row * 16) as u16))?;
                    for byte in chunk {
                        write!(f, " {:02X}", byte)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl<T: Transport> ControllerSession<T> {
    /// PC followed by the eight recovered call sites.
    fn frame_addresses(&mut self) -> Result<[u16; MAX_FRAMES + 1], LinkError> {
        let regs = self.link.read_registers()?;
        let window = self.link.read_memory16(Address::Cpu(regs.sp.wrapping_add(1)))?;

        let mut addresses = [regs.pc; MAX_FRAMES + 1];
        for (address, pair) in addresses[1..].iter_mut().zip(window.bytes.chunks_exact(2)) {
            *address = u16::from_le_bytes([pair[0], pair[1]]).wrapping_sub(RETURN_ADDRESS_BIAS);
        }
        Ok(addresses)
    }

    /// Reconstruct the call stack.
    pub fn backtrace(&mut self) -> Result<Vec<Frame>, LinkError> {
        let addresses = self.frame_addresses()?;

        let mut frames = Vec::with_capacity(addresses.len());
        for (index, &address) in addresses.iter().enumerate() {
            let window = self.link.read_memory16(Address::Cpu(address))?;
            frames.push(Frame {
                index,
                address,
                instruction: decode_instruction(&window.bytes, address),
            });
        }
        Ok(frames)
    }

    /// Move the frame cursor one step; at either end nothing moves.
    pub fn move_frame(&mut self, direction: FrameDirection) -> FrameMove {
        let moved = self.frame.move_by(direction);
        info!("{}", moved);
        moved
    }

    /// Address the selected frame is executing: the PC for frame 0.
    pub fn effective_address(&mut self) -> Result<u16, LinkError> {
        let cursor = self.frame.index();
        if cursor == 0 {
            return Ok(self.link.read_registers()?.pc);
        }
        Ok(self.frame_addresses()?[cursor])
    }

    /// Read the locals of the function the selected frame is in.
    ///
    /// Locals are addressed from a baseline that starts at the software stack
    /// pointer, grows by the parameter size of every function between the live
    /// frame and the selected one, and then by the size of every negatively
    /// offset local. Returns nothing if `lookup` does not know the function.
    pub fn locals(&mut self, lookup: &dyn FunctionLookup) -> Result<Vec<LocalValue>, LinkError> {
        let cursor = self.frame.index();
        let addresses = self.frame_addresses()?;

        let Some(function) = lookup.function_containing(addresses[cursor]) else {
            debug!("no function information for ${:04X}", addresses[cursor]);
            return Ok(Vec::new());
        };

        let soft_sp = Address::Cpu(self.config.soft_stack_pointer);
        let mut baseline = self.link.peek_word(soft_sp)? as i32;
        for address in addresses[1..=cursor].iter().rev() {
            if let Some(caller) = lookup.function_containing(*address) {
                baseline += caller.param_size as i32;
            }
        }
        baseline += function
            .locals
            .iter()
            .filter(|local| local.offset < 0)
            .map(|local| local.size as i32)
            .sum::<i32>();

        let mut values = Vec::with_capacity(function.locals.len());
        for local in &function.locals {
            let address = (baseline + local.offset) as u16;
            let location = Address::Cpu(address);
            let data = match local.size {
                1 => LocalData::Byte(self.link.peek(location)?),
                2 => LocalData::Word(self.link.peek_word(location)?),
                4 => LocalData::Dword(self.link.peek_dword(location)?),
                size => LocalData::Raw(self.link.read_range(location, size)?),
            };
            values.push(LocalValue {
                name: local.name.clone(),
                address,
                data,
            });
        }

        Ok(values)
    }
}
