//! # Link Access Layer
//!
//! Blocking request/response access to the remote monitor. Every operation
//! sends one command line and reads back the reply lines it expects; nothing
//! is pipelined and nothing runs concurrently on a link.
//!
//! Replies that fail to parse are skipped and the read is retried, up to the
//! configured retry limit, after which the operation fails with
//! [`LinkError::Timeout`].
//!
//! # Example
//!
//! ```no_run
//! use lib4510::link::{IoTransport, Link};
//! use lib4510::memory::Address;
//! use std::fs::OpenOptions;
//! use std::io::BufReader;
//!
//! let device = OpenOptions::new().read(true).write(true).open("/dev/ttyUSB1")?;
//! let transport = IoTransport::new(BufReader::new(device.try_clone()?), device);
//! let mut link = Link::new(transport);
//!
//! let regs = link.read_registers()?;
//! let window = link.read_memory16(Address::Cpu(regs.pc))?;
//! println!("{:02X?}", window.bytes);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod protocol;
pub mod transport;

pub use transport::{IoTransport, Transport};

use crate::memory::{Address, MemoryWindow, WINDOW_SIZE};
use crate::registers::Registers;
use log::{trace, warn};
use protocol::MAX_WRITE_CHUNK;
use thiserror::Error;

/// Retries allowed when no limit is configured.
pub const DEFAULT_RETRY_LIMIT: u32 = 64;

/// Bytes returned by one bulk read.
pub const BULK_SIZE: usize = WINDOW_SIZE * 16;

/// Failures talking to the remote monitor
#[derive(Debug, Error)]
pub enum LinkError {
    /// The underlying byte stream failed.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No usable reply arrived within the retry budget.
    #[error("no reply to '{command}' after {attempts} attempts")]
    Timeout { command: String, attempts: u32 },

    /// A reply arrived but could not be interpreted.
    #[error("malformed reply: {0}")]
    Malformed(String),
}

/// Request/response wrapper over a [`Transport`].
pub struct Link<T> {
    transport: T,
    retry_limit: u32,
}

impl<T: Transport> Link<T> {
    /// Wrap a transport with the default retry limit.
    pub fn new(transport: T) -> Self {
        Self::with_retry_limit(transport, DEFAULT_RETRY_LIMIT)
    }

    /// Wrap a transport, failing reads after `retry_limit` unusable replies.
    pub fn with_retry_limit(transport: T, retry_limit: u32) -> Self {
        Self {
            transport,
            retry_limit: retry_limit.max(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn send(&mut self, command: &str) -> Result<(), LinkError> {
        trace!("-> {:?}", command);
        self.transport.send(command)
    }

    /// Read lines until `parse` accepts one, within the retry budget.
    fn read_parsed<V>(
        &mut self,
        command: &str,
        parse: impl Fn(&str) -> Option<V>,
    ) -> Result<V, LinkError> {
        for attempt in 1..=self.retry_limit {
            match self.transport.read_line()? {
                Some(line) => {
                    trace!("<- {:?}", line);
                    if let Some(value) = parse(&line) {
                        return Ok(value);
                    }
                }
                None => {
                    if attempt % 8 == 0 {
                        warn!("still waiting for reply to {:?} ({} attempts)", command, attempt);
                    }
                }
            }
        }

        Err(LinkError::Timeout {
            command: command.to_string(),
            attempts: self.retry_limit,
        })
    }

    /// Send a command whose only reply is one echoed line, and drain it.
    fn exchange(&mut self, command: &str) -> Result<(), LinkError> {
        self.send(command)?;
        self.read_parsed(command, |_| Some(()))
    }

    /// Read a register snapshot.
    ///
    /// Echo and header lines before the value line are skipped.
    pub fn read_registers(&mut self) -> Result<Registers, LinkError> {
        self.send(protocol::READ_REGISTERS)?;
        self.read_parsed(protocol::READ_REGISTERS, protocol::parse_registers)
    }

    /// Read the 16 bytes starting at `address`.
    pub fn read_memory16(&mut self, address: Address) -> Result<MemoryWindow, LinkError> {
        let command = protocol::read_memory(address.physical());
        self.send(&command)?;
        self.read_parsed(&command, protocol::parse_memory_line)
    }

    /// Read 256 bytes starting at `address` as 16 consecutive windows.
    ///
    /// The reply is positional, so any unparseable line after the first is
    /// reported as [`LinkError::Malformed`] rather than skipped.
    pub fn read_memory256(&mut self, address: Address) -> Result<[MemoryWindow; 16], LinkError> {
        let command = protocol::read_memory_bulk(address.physical());
        self.send(&command)?;

        let first = self.read_parsed(&command, protocol::parse_memory_line)?;
        let mut windows = [first; 16];
        for (index, window) in windows.iter_mut().enumerate().skip(1) {
            let line = self.read_parsed(&command, |line| Some(line.to_string()))?;
            *window = protocol::parse_memory_line(&line).ok_or_else(|| {
                LinkError::Malformed(format!("line {} of bulk read: {:?}", index, line))
            })?;
        }

        Ok(windows)
    }

    /// Write bytes starting at `address`.
    ///
    /// Up to eight bytes go out as one `s` command; longer slices are split.
    pub fn write_memory(&mut self, address: Address, bytes: &[u8]) -> Result<(), LinkError> {
        if bytes.len() > MAX_WRITE_CHUNK {
            return self.write_range(address, bytes);
        }
        if bytes.is_empty() {
            return Ok(());
        }

        self.exchange(&protocol::write_memory(address.physical(), bytes))
    }

    /// Set the program counter.
    pub fn set_pc(&mut self, address: u16) -> Result<(), LinkError> {
        self.exchange(&protocol::set_pc(address))
    }

    /// Arm the target's hardware breakpoint at `address`.
    pub fn arm_hardware_breakpoint(&mut self, address: u16) -> Result<(), LinkError> {
        self.exchange(&protocol::set_breakpoint(address))
    }

    /// Let the CPU run (`true`) or stop it in trace mode (`false`).
    pub fn set_run_mode(&mut self, running: bool) -> Result<(), LinkError> {
        self.exchange(protocol::set_run_mode(running))
    }

    /// Execute exactly one instruction on the target.
    pub fn single_step(&mut self) -> Result<(), LinkError> {
        self.exchange(protocol::SINGLE_STEP)
    }

    /// Use the monitor's native step-over.
    pub fn hardware_step_over(&mut self) -> Result<(), LinkError> {
        self.exchange(protocol::STEP_OVER)
    }

    /// Read `len` bytes starting at `address`.
    ///
    /// Whole 256-byte blocks use the bulk command; the tail uses 16-byte reads.
    pub fn read_range(&mut self, address: Address, len: usize) -> Result<Vec<u8>, LinkError> {
        let mut bytes = Vec::with_capacity(len);

        while len - bytes.len() >= BULK_SIZE {
            let windows = self.read_memory256(address.offset(bytes.len() as u32))?;
            for window in &windows {
                bytes.extend_from_slice(&window.bytes);
            }
        }

        while bytes.len() < len {
            let window = self.read_memory16(address.offset(bytes.len() as u32))?;
            let wanted = (len - bytes.len()).min(WINDOW_SIZE);
            bytes.extend_from_slice(&window.bytes[..wanted]);
        }

        Ok(bytes)
    }

    /// Write `bytes` starting at `address`, eight bytes per command.
    pub fn write_range(&mut self, address: Address, bytes: &[u8]) -> Result<(), LinkError> {
        for (index, chunk) in bytes.chunks(MAX_WRITE_CHUNK).enumerate() {
            let chunk_address = address.offset((index * MAX_WRITE_CHUNK) as u32);
            self.exchange(&protocol::write_memory(chunk_address.physical(), chunk))?;
        }
        Ok(())
    }

    /// Read one byte.
    pub fn peek(&mut self, address: Address) -> Result<u8, LinkError> {
        let [value, ..] = self.read_memory16(address)?.bytes;
        Ok(value)
    }

    /// Read one little-endian word.
    pub fn peek_word(&mut self, address: Address) -> Result<u16, LinkError> {
        let [lo, hi, ..] = self.read_memory16(address)?.bytes;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Read one little-endian dword.
    pub fn peek_dword(&mut self, address: Address) -> Result<u32, LinkError> {
        let [b0, b1, b2, b3, ..] = self.read_memory16(address)?.bytes;
        Ok(u32::from_le_bytes([b0, b1, b2, b3]))
    }

    /// Find every occurrence of `pattern` in the `len` bytes at `address`.
    ///
    /// Matches may not run past the end of the range.
    pub fn search(
        &mut self,
        address: Address,
        len: usize,
        pattern: &[u8],
    ) -> Result<Vec<Address>, LinkError> {
        if pattern.is_empty() || pattern.len() > len {
            return Ok(Vec::new());
        }

        let haystack = self.read_range(address, len)?;
        Ok(haystack
            .windows(pattern.len())
            .enumerate()
            .filter(|(_, candidate)| *candidate == pattern)
            .map(|(index, _)| address.offset(index as u32))
            .collect())
    }

    /// Copy `count` bytes from `source` to `destination`.
    ///
    /// The whole source range is read before anything is written, so
    /// overlapping ranges copy the original contents.
    pub fn copy(
        &mut self,
        source: Address,
        destination: Address,
        count: usize,
    ) -> Result<(), LinkError> {
        let bytes = self.read_range(source, count)?;
        self.write_range(destination, &bytes)
    }
}
