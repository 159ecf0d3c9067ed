//! # Execution Controller
//!
//! Drives the remote CPU: continue, single step, step over, finish and
//! breakpoint management. The target never reports that it stopped, so every
//! wait is a polling loop over register snapshots.
//!
//! All debugger state lives in one [`ControllerSession`]: the link, the
//! software breakpoint slot, the frame cursor and the cancellation flag.
//!
//! # Stall detection
//!
//! While the CPU runs, the controller reads the PC every
//! [`Config::poll_interval_ms`]. When [`Config::stall_threshold`] polls in a
//! row see the same PC, execution counts as halted. A software breakpoint
//! produces exactly this picture, since its `JMP` targets itself.

pub mod breakpoint;

pub use breakpoint::SoftwareBreakpoint;

use crate::assembler::{self, Encoded};
use crate::config::Config;
use crate::disassembler::formatter::format_listing_line;
use crate::disassembler::{decode_instruction, Instruction};
use crate::link::{Link, LinkError, Transport};
use crate::memory::Address;
use crate::registers::Registers;
use crate::stack::FrameCursor;
use crate::Error;
use log::{debug, info, warn};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Where the controller is in a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Between commands; the CPU is not being driven.
    Stopped,

    /// Inside a continue or stepping loop.
    Running,

    /// Running with a software breakpoint armed, waiting for the PC to stall.
    AwaitingStall,
}

/// Why a command returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A stepping command ran to completion.
    Completed { pc: u16 },

    /// The CPU stalled inside the software breakpoint, which has been removed.
    SoftwareBreakpoint { pc: u16 },

    /// The CPU stalled elsewhere: a hardware breakpoint or a tight loop.
    Halted { pc: u16 },

    /// The cancel flag was raised; the CPU has been stopped.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StopReason::Completed { pc } => write!(f, "stopped at ${:04X}", pc),
            StopReason::SoftwareBreakpoint { pc } => {
                write!(f, "software breakpoint hit at ${:04X}", pc)
            }
            StopReason::Halted { pc } => write!(f, "halted at ${:04X}", pc),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Shared flag used to interrupt a running command.
///
/// Cloned into a signal handler, which calls [`CancelFlag::cancel`]; the
/// controller polls it between link round-trips.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Source-line ranges used to coalesce hardware step-over.
pub trait LineLookup {
    /// Address range of the source line containing `pc`, if known.
    fn line_range(&self, pc: u16) -> Option<RangeInclusive<u16>>;
}

/// One debugging session over one link.
pub struct ControllerSession<T> {
    pub(crate) link: Link<T>,
    pub(crate) config: Config,
    breakpoint: Option<SoftwareBreakpoint>,
    state: ExecutionState,
    pub(crate) frame: FrameCursor,
    cancel: CancelFlag,
}

impl<T: Transport> ControllerSession<T> {
    pub fn new(transport: T, config: Config) -> Self {
        let link = Link::with_retry_limit(transport, config.link_retry_limit);
        Self {
            link,
            config,
            breakpoint: None,
            state: ExecutionState::Stopped,
            frame: FrameCursor::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn link(&mut self) -> &mut Link<T> {
        &mut self.link
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// The currently armed software breakpoint.
    pub fn software_breakpoint(&self) -> Option<&SoftwareBreakpoint> {
        self.breakpoint.as_ref()
    }

    /// A handle that cancels whatever command is running.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn frame_cursor(&self) -> FrameCursor {
        self.frame
    }

    fn set_state(&mut self, state: ExecutionState) {
        if self.state != state {
            debug!("execution state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Run an execution command.
    ///
    /// Clears the cancel flag and the frame cursor first. If the link fails
    /// part way through, the state drops back to [`ExecutionState::Stopped`].
    fn run_command(
        &mut self,
        command: impl FnOnce(&mut Self) -> Result<StopReason, LinkError>,
    ) -> Result<StopReason, LinkError> {
        self.cancel.reset();
        self.frame.reset();

        let result = command(self);
        if result.is_err() {
            self.set_state(ExecutionState::Stopped);
        }
        result
    }

    /// Leave the CPU stopped after a cancelled command.
    fn abort(&mut self) -> Result<StopReason, LinkError> {
        warn!("command cancelled, stopping CPU");
        self.link.set_run_mode(false)?;
        self.set_state(ExecutionState::Stopped);
        Ok(StopReason::Cancelled)
    }

    fn finish_command(&mut self) -> Result<StopReason, LinkError> {
        let pc = self.link.read_registers()?.pc;
        self.set_state(ExecutionState::Stopped);
        Ok(StopReason::Completed { pc })
    }

    /// Decode the instruction at the live PC.
    fn current_instruction(&mut self) -> Result<(Registers, Instruction), LinkError> {
        let regs = self.link.read_registers()?;
        let window = self.link.read_memory16(Address::Cpu(regs.pc))?;
        let instr = decode_instruction(&window.bytes, regs.pc);
        Ok((regs, instr))
    }

    /// Sample the PC to decide whether the CPU is stopped.
    ///
    /// Takes up to [`Config::stopped_check_polls`] samples; the CPU counts as
    /// stopped once [`Config::stall_threshold`] consecutive samples agree.
    pub fn is_cpu_stopped(&mut self) -> Result<bool, LinkError> {
        let mut last_pc = None;
        let mut same = 0;

        for _ in 0..self.config.stopped_check_polls {
            let pc = self.link.read_registers()?.pc;
            if last_pc == Some(pc) {
                same += 1;
                if same >= self.config.stall_threshold {
                    return Ok(true);
                }
            } else {
                same = 0;
                last_pc = Some(pc);
            }
            thread::sleep(self.config.poll_interval());
        }

        Ok(false)
    }

    /// Patch a self-jump at `address` and remember the bytes it replaced.
    ///
    /// Arming replaces any breakpoint already armed; the old patch is left in
    /// target memory. A running CPU is stopped for the patch and resumed.
    pub fn set_software_breakpoint(&mut self, address: u32) -> Result<SoftwareBreakpoint, LinkError> {
        if let Some(old) = self.breakpoint {
            warn!(
                "replacing software breakpoint at {}; its patch stays in memory",
                old.address
            );
        }

        let was_running = !self.is_cpu_stopped()?;
        if was_running {
            self.link.set_run_mode(false)?;
        }

        let regs = self.link.read_registers()?;
        let patch_at = breakpoint::patch_address(address, regs.in_hypervisor());
        let window = self.link.read_memory16(patch_at)?;
        let [b0, b1, b2, ..] = window.bytes;
        let saved = [b0, b1, b2];
        self.link
            .write_memory(patch_at, &breakpoint::wedge_bytes(patch_at.cpu_address()))?;

        let armed = SoftwareBreakpoint {
            address: patch_at,
            saved,
        };
        self.breakpoint = Some(armed);
        info!("software breakpoint armed at {}", patch_at);

        if was_running {
            self.link.set_run_mode(true)?;
        }

        Ok(armed)
    }

    /// Stop the CPU and restore the bytes under the software breakpoint.
    ///
    /// Returns the breakpoint that was removed, if any.
    pub fn clear_software_breakpoint(&mut self) -> Result<Option<SoftwareBreakpoint>, LinkError> {
        let Some(armed) = self.breakpoint.take() else {
            return Ok(None);
        };

        self.link.set_run_mode(false)?;
        self.link.write_memory(armed.address, &armed.saved)?;
        info!("software breakpoint at {} removed", armed.address);
        Ok(Some(armed))
    }

    /// Arm the target's hardware breakpoint.
    pub fn set_hardware_breakpoint(&mut self, address: u16) -> Result<(), LinkError> {
        info!("hardware breakpoint at ${:04X}", address);
        self.link.arm_hardware_breakpoint(address)
    }

    /// Move the program counter.
    pub fn set_pc(&mut self, address: u16) -> Result<(), LinkError> {
        self.link.set_pc(address)
    }

    /// Run until the CPU halts or the command is cancelled.
    ///
    /// With a `target`, a breakpoint is armed there first: a self-jump patch
    /// when `software` is set, the target's breakpoint register otherwise.
    pub fn continue_execution(
        &mut self,
        target: Option<u32>,
        software: bool,
    ) -> Result<StopReason, LinkError> {
        self.run_command(|session| session.run_to_stall(target, software))
    }

    fn run_to_stall(&mut self, target: Option<u32>, software: bool) -> Result<StopReason, LinkError> {
        match target {
            Some(address) if software => {
                // Patching the current instruction would stall immediately.
                let pc = self.link.read_registers()?.pc;
                if pc == address as u16 {
                    self.link.single_step()?;
                }
                self.set_software_breakpoint(address)?;
            }
            Some(address) => self.set_hardware_breakpoint(address as u16)?,
            None => {}
        }

        self.link.set_run_mode(true)?;
        let state = if self.breakpoint.is_some() {
            ExecutionState::AwaitingStall
        } else {
            ExecutionState::Running
        };
        self.set_state(state);

        let mut last_pc = None;
        let mut same = 0;
        loop {
            if self.cancel.is_cancelled() {
                return self.abort();
            }

            thread::sleep(self.config.poll_interval());
            let pc = self.link.read_registers()?.pc;

            if last_pc == Some(pc) {
                same += 1;
                debug!("PC ${:04X} unchanged ({} of {})", pc, same, self.config.stall_threshold);
            } else {
                same = 0;
                last_pc = Some(pc);
            }

            if same < self.config.stall_threshold {
                continue;
            }

            let hit = self.breakpoint.filter(|bp| bp.contains(pc));
            self.set_state(ExecutionState::Stopped);
            return match hit {
                Some(bp) => {
                    self.clear_software_breakpoint()?;
                    info!("software breakpoint hit at ${:04X}", bp.cpu_address());
                    Ok(StopReason::SoftwareBreakpoint { pc })
                }
                None => {
                    info!("CPU halted at ${:04X}", pc);
                    Ok(StopReason::Halted { pc })
                }
            };
        }
    }

    /// Execute `count` instructions with the target's single-step command.
    pub fn step(&mut self, count: u32) -> Result<StopReason, LinkError> {
        self.run_command(|session| {
            session.set_state(ExecutionState::Running);

            for _ in 0..count {
                if session.cancel.is_cancelled() {
                    return session.abort();
                }
                session.link.single_step()?;
            }

            session.finish_command()
        })
    }

    /// One software step over: a `JSR` runs until it returns.
    ///
    /// Returns false if cancelled mid-call.
    fn next_instruction(&mut self) -> Result<bool, LinkError> {
        let (_, instr) = self.current_instruction()?;

        if !instr.is_subroutine_call() {
            self.link.single_step()?;
            return Ok(true);
        }

        let return_address = instr.next_address();
        debug!("stepping over {} until ${:04X}", instr.mnemonic, return_address);
        loop {
            if self.cancel.is_cancelled() {
                return Ok(false);
            }
            self.link.single_step()?;
            if self.link.read_registers()?.pc == return_address {
                return Ok(true);
            }
        }
    }

    /// Step over the hardware way, coalescing a multi-address source line.
    ///
    /// Returns false if cancelled.
    fn hardware_next(&mut self, lines: Option<&dyn LineLookup>) -> Result<bool, LinkError> {
        let pc = self.link.read_registers()?.pc;
        let range = lines.and_then(|lookup| lookup.line_range(pc));

        loop {
            self.link.hardware_step_over()?;

            let Some(range) = &range else {
                return Ok(true);
            };
            let pc = self.link.read_registers()?.pc;
            if !range.contains(&pc) {
                return Ok(true);
            }
            if self.cancel.is_cancelled() {
                return Ok(false);
            }
        }
    }

    /// Step `count` times, treating subroutine calls as one instruction.
    ///
    /// With `hardware` set the target's own step-over is used, and `lines`
    /// (when given) keeps stepping until the PC leaves the current source line.
    pub fn step_over(
        &mut self,
        count: u32,
        hardware: bool,
        lines: Option<&dyn LineLookup>,
    ) -> Result<StopReason, LinkError> {
        self.run_command(|session| {
            session.set_state(ExecutionState::Running);

            for _ in 0..count {
                if session.cancel.is_cancelled() {
                    return session.abort();
                }
                let completed = if hardware {
                    session.hardware_next(lines)?
                } else {
                    session.next_instruction()?
                };
                if !completed {
                    return session.abort();
                }
            }

            session.finish_command()
        })
    }

    /// Run until the current subroutine returns.
    ///
    /// The returning instruction is executed, so the CPU ends up in the
    /// caller. Returns nested below the entry stack pointer are ignored.
    pub fn finish(&mut self) -> Result<StopReason, LinkError> {
        self.run_command(Self::run_to_return)
    }

    fn run_to_return(&mut self) -> Result<StopReason, LinkError> {
        self.set_state(ExecutionState::Running);

        let entry_sp = self.link.read_registers()?.sp;
        debug!("finish: waiting for return with SP ${:04X}", entry_sp);

        loop {
            if self.cancel.is_cancelled() {
                return self.abort();
            }

            let (regs, instr) = self.current_instruction()?;
            let returning = instr.is_return() && regs.sp == entry_sp;

            if !self.next_instruction()? {
                return self.abort();
            }
            if returning {
                return self.finish_command();
            }
        }
    }

    /// Assemble `line` at `address` and write it to the target.
    ///
    /// Nothing is written when the line does not assemble.
    pub fn assemble_at(&mut self, address: Address, line: &str) -> Result<Encoded, Error> {
        let encoded = assembler::assemble_line(line, address.cpu_address())?;
        self.link.write_memory(address, &encoded.bytes)?;
        Ok(encoded)
    }

    /// Execute one instruction out of the scratch area.
    ///
    /// The PC and the scratch bytes are put back afterwards. Returns the
    /// registers as they were right after the instruction ran.
    pub fn execute_one_shot(&mut self, line: &str) -> Result<Registers, Error> {
        let scratch = self.config.scratch_address;
        let encoded = assembler::assemble_line(line, scratch)?;

        if !self.is_cpu_stopped()? {
            self.link.set_run_mode(false)?;
        }

        let saved_regs = self.link.read_registers()?;
        let window = self.link.read_memory16(Address::Cpu(scratch))?;
        let saved_bytes = &window.bytes[..encoded.len()];

        self.link.write_memory(Address::Cpu(scratch), &encoded.bytes)?;
        self.link.set_pc(scratch)?;
        self.link.single_step()?;
        let result = self.link.read_registers()?;

        self.link.set_pc(saved_regs.pc)?;
        self.link.write_memory(Address::Cpu(scratch), saved_bytes)?;
        Ok(result)
    }

    /// Disassemble `count` instructions as listing lines.
    ///
    /// Without an address, starts at the effective address of the current frame.
    pub fn disassemble_at(
        &mut self,
        address: Option<Address>,
        count: usize,
    ) -> Result<Vec<String>, LinkError> {
        let start = match address {
            Some(address) => address,
            None => Address::Cpu(self.effective_address()?),
        };

        // Three bytes per instruction at most.
        let bytes = self.link.read_range(start, count * 3)?;
        let mut lines = Vec::with_capacity(count);
        let mut offset = 0usize;

        for _ in 0..count {
            let here = start.offset(offset as u32);
            let instr = decode_instruction(&bytes[offset.min(bytes.len())..], here.cpu_address());
            let display = if here.is_flat() {
                here.physical()
            } else {
                here.cpu_address() as u32
            };
            lines.push(format_listing_line(&instr, display, here.is_flat()));
            offset += instr.size_bytes as usize;
        }

        Ok(lines)
    }
}
