//! # 4510 Remote Debugger Core
//!
//! Client-side core of a debugger for a 4510 CPU (the 65CE02 derivative in
//! the MEGA65) reached through the monitor on its serial line.
//!
//! The crate is built from four layers:
//!
//! - **Link access** (`link`): blocking request/response commands for
//!   registers, memory, stepping and run control
//! - **Instruction codec** (`opcodes`, `disassembler`, `assembler`): a total
//!   decoder and a single-line encoder over one 256-entry opcode table
//! - **Execution control** (`controller`): continue, step, step over and
//!   finish, with self-jump software breakpoints found by PC stall detection
//! - **Stack walking** (`stack`): heuristic backtrace, frame cursor and locals
//!
//! ## Quick Start
//!
//! ```rust
//! use lib4510::{assembler, decode_instruction};
//! use lib4510::disassembler::formatter::format_instruction;
//!
//! let instr = decode_instruction(&[0x4C, 0x00, 0x20], 0x1000);
//! assert_eq!(format_instruction(&instr), "JMP $2000");
//! assert_eq!(instr.size_bytes, 3);
//!
//! let encoded = assembler::encode("LDA", "#$05", 0x1000).unwrap();
//! assert_eq!(encoded.bytes, vec![0xA9, 0x05]);
//! ```
//!
//! Driving real hardware goes through [`ControllerSession`]:
//!
//! ```no_run
//! use lib4510::{Config, ControllerSession, IoTransport};
//! use std::fs::OpenOptions;
//! use std::io::BufReader;
//!
//! let config = Config::default();
//! let device = OpenOptions::new().read(true).write(true).open(&config.device)?;
//! let transport = IoTransport::new(BufReader::new(device.try_clone()?), device);
//! let mut session = ControllerSession::new(transport, config);
//!
//! let stop = session.continue_execution(Some(0x2010), true)?;
//! println!("{}", stop);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod addressing;
pub mod assembler;
pub mod config;
pub mod controller;
pub mod disassembler;
pub mod link;
pub mod memory;
pub mod opcodes;
pub mod registers;
pub mod stack;
pub mod symbols;
pub mod wasm;

pub use addressing::AddressingMode;
pub use assembler::{assemble_line, encode, EncodeError, Encoded};
pub use config::{Config, ConfigError};
pub use controller::{CancelFlag, ControllerSession, ExecutionState, LineLookup, StopReason};
pub use disassembler::{decode_instruction, disassemble, DisassemblyOptions, Instruction};
pub use link::{IoTransport, Link, LinkError, Transport};
pub use memory::{Address, MemoryWindow};
pub use opcodes::{OpcodeMetadata, OPCODE_TABLE};
pub use registers::Registers;
pub use stack::{Frame, FrameDirection, FrameMove, FunctionInfo, FunctionLookup, LocalValue};
pub use symbols::DebugInfo;

use thiserror::Error;

/// Any failure of a debugger operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
