//! Simulated remote target speaking the monitor's line protocol.
//!
//! Holds 64K of CPU-visible memory plus a sparse 28-bit physical space and a
//! tiny interpreter covering the control-flow instructions the debugger
//! cares about: JSR, BSR, RTS, RTI, JMP, PHA, PLA and LDA immediate. Every
//! other opcode just advances the PC by its length.

#![allow(dead_code)]

use lib4510::controller::CancelFlag;
use lib4510::disassembler::OperandValue;
use lib4510::link::{LinkError, Transport};
use lib4510::{assemble_line, decode_instruction, Config, ControllerSession, Registers};
use std::collections::{HashMap, VecDeque};
use std::io;

pub const HEADER: &str = "PC   A  X  Y  Z  B  SP   MAPH MAPL LAST-OP     P  P-FLAGS   RGP uS IO";

pub struct SimTarget {
    pub cpu: Vec<u8>,
    pub flat: HashMap<u32, u8>,
    pub regs: Registers,
    pub running: bool,
    pub hw_breakpoint: Option<u16>,
    /// Instructions executed per register poll while running
    pub instructions_per_poll: usize,
    /// Every command received, in order
    pub sent: Vec<String>,
    /// Register polls seen so far
    pub polls: usize,
    /// Raise this flag once `polls` reaches the given count
    pub cancel_at: Option<(usize, CancelFlag)>,
    /// Register polls during which a running CPU makes no progress
    pub frozen_polls: usize,
    /// Fail the link when this command is sent
    pub fail_on: Option<&'static str>,
    pending: VecDeque<String>,
}

impl Default for SimTarget {
    fn default() -> Self {
        Self {
            cpu: vec![0; 0x10000],
            flat: HashMap::new(),
            regs: Registers {
                pc: 0x2000,
                sp: 0x01FF,
                flags: "..E..I..".to_string(),
                ..Registers::default()
            },
            running: false,
            hw_breakpoint: None,
            instructions_per_poll: 3,
            sent: Vec::new(),
            polls: 0,
            cancel_at: None,
            frozen_polls: 0,
            fail_on: None,
            pending: VecDeque::new(),
        }
    }
}

impl SimTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble `lines` one after another starting at `address`.
    pub fn load(&mut self, address: u16, lines: &[&str]) -> &mut Self {
        let mut here = address;
        for line in lines {
            let encoded = assemble_line(line, here).unwrap();
            for byte in &encoded.bytes {
                self.cpu[here as usize] = *byte;
                here = here.wrapping_add(1);
            }
        }
        self
    }

    pub fn cpu_bytes(&self, address: u16, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| self.cpu[address.wrapping_add(i as u16) as usize])
            .collect()
    }

    /// Commands received, skipping register polls and memory reads.
    pub fn control_commands(&self) -> Vec<&str> {
        self.sent
            .iter()
            .map(String::as_str)
            .filter(|c| *c != "r" && !c.starts_with('m') && !c.starts_with('M'))
            .collect()
    }

    pub fn count_sent(&self, command: &str) -> usize {
        self.sent.iter().filter(|c| c.as_str() == command).count()
    }

    fn is_cpu_view(physical: u32) -> bool {
        physical < 0x1_0000 || physical >> 16 == 0x777
    }

    pub fn read(&self, physical: u32) -> u8 {
        if Self::is_cpu_view(physical) {
            self.cpu[(physical & 0xFFFF) as usize]
        } else {
            self.flat.get(&physical).copied().unwrap_or(0)
        }
    }

    pub fn write(&mut self, physical: u32, value: u8) {
        if Self::is_cpu_view(physical) {
            self.cpu[(physical & 0xFFFF) as usize] = value;
        } else {
            self.flat.insert(physical, value);
        }
    }

    fn push(&mut self, value: u8) {
        self.cpu[self.regs.sp as usize] = value;
        self.regs.sp = 0x0100 | (self.regs.sp.wrapping_sub(1) & 0xFF);
    }

    fn pull(&mut self) -> u8 {
        self.regs.sp = 0x0100 | (self.regs.sp.wrapping_add(1) & 0xFF);
        self.cpu[self.regs.sp as usize]
    }

    /// Execute one instruction at the PC.
    pub fn execute(&mut self) {
        let pc = self.regs.pc;
        let instr = decode_instruction(&self.cpu_bytes(pc, 3), pc);
        let next = instr.next_address();
        self.regs.last_op = instr.opcode;

        self.regs.pc = match (instr.opcode, instr.operand) {
            // JSR abs / BSR: push the address of the last instruction byte
            (0x20, OperandValue::Word(target)) | (0x63, OperandValue::Target(target)) => {
                let [lo, hi] = next.wrapping_sub(1).to_le_bytes();
                self.push(hi);
                self.push(lo);
                target
            }
            (0x4C, OperandValue::Word(target)) => target,
            (0x60, _) => {
                let lo = self.pull();
                let hi = self.pull();
                u16::from_le_bytes([lo, hi]).wrapping_add(1)
            }
            (0x40, _) => {
                let _status = self.pull();
                let lo = self.pull();
                let hi = self.pull();
                u16::from_le_bytes([lo, hi])
            }
            (0x48, _) => {
                self.push(self.regs.a);
                next
            }
            (0x68, _) => {
                self.regs.a = self.pull();
                next
            }
            (0xA9, OperandValue::Byte(value)) => {
                self.regs.a = value;
                next
            }
            _ => next,
        };
    }

    /// Run until the PC reaches `address`, giving up after a while.
    fn run_until(&mut self, address: u16) {
        for _ in 0..10_000 {
            self.execute();
            if self.regs.pc == address {
                return;
            }
        }
    }

    fn run_slice(&mut self) {
        if self.polls < self.frozen_polls {
            return;
        }
        for _ in 0..self.instructions_per_poll {
            if !self.running {
                return;
            }
            if self.hw_breakpoint == Some(self.regs.pc) {
                self.running = false;
                return;
            }
            self.execute();
        }
    }

    fn register_line(&self) -> String {
        let r = &self.regs;
        format!(
            "{:04X} {:02X} {:02X} {:02X} {:02X} {:02X} {:04X} {:04X} {:04X} {:02X} {:02X} {:02X} {}",
            r.pc,
            r.a,
            r.x,
            r.y,
            r.z,
            r.b,
            r.sp,
            r.maph,
            r.mapl,
            r.last_op,
            r.reserved[0],
            r.reserved[1],
            r.flags
        )
    }

    fn memory_line(&self, physical: u32) -> String {
        let hex: String = (0..16)
            .map(|i| format!("{:02x}", self.read(physical + i)))
            .collect();
        format!(":{:07X}:{}", physical, hex)
    }

    fn handle(&mut self, command: &str) {
        let hex = |s: &str| u32::from_str_radix(s, 16).unwrap();

        match command {
            "r" => {
                self.run_slice();
                self.polls += 1;
                if let Some((at, flag)) = &self.cancel_at {
                    if self.polls >= *at {
                        flag.cancel();
                    }
                }
                self.pending.push_back(HEADER.to_string());
                self.pending.push_back(self.register_line());
            }
            "t0" => self.running = true,
            "t1" => self.running = false,
            "" => self.execute(),
            "N" => {
                let instr = decode_instruction(&self.cpu_bytes(self.regs.pc, 3), self.regs.pc);
                if instr.is_subroutine_call() {
                    self.run_until(instr.next_address());
                } else {
                    self.execute();
                }
            }
            _ => {
                let (kind, rest) = command.split_at(1);
                match kind {
                    "m" => {
                        let line = self.memory_line(hex(rest));
                        self.pending.push_back(line);
                    }
                    "M" => {
                        let base = hex(rest);
                        for row in 0..16 {
                            let line = self.memory_line(base + row * 16);
                            self.pending.push_back(line);
                        }
                    }
                    "s" => {
                        let mut fields = rest.split_whitespace();
                        let base = hex(fields.next().unwrap());
                        for (i, byte) in fields.enumerate() {
                            self.write(base + i as u32, hex(byte) as u8);
                        }
                    }
                    "b" => self.hw_breakpoint = Some(hex(rest) as u16),
                    "g" => self.regs.pc = hex(rest) as u16,
                    other => panic!("unknown monitor command {:?}", other),
                }
            }
        }
    }
}

impl Transport for SimTarget {
    fn send(&mut self, line: &str) -> Result<(), LinkError> {
        assert!(
            self.pending.is_empty(),
            "command {:?} sent with undrained replies {:?}",
            line,
            self.pending
        );
        self.sent.push(line.to_string());
        if self.fail_on == Some(line) {
            return Err(LinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "serial device went away",
            )));
        }
        // The monitor echoes every command line before answering
        self.pending.push_back(line.to_string());
        self.handle(line);
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        Ok(self.pending.pop_front())
    }
}

/// Config with no polling delay.
pub fn fast_config() -> Config {
    Config {
        poll_interval_ms: 0,
        ..Config::default()
    }
}

pub fn session(target: SimTarget) -> ControllerSession<SimTarget> {
    ControllerSession::new(target, fast_config())
}

pub fn target_of(session: &mut ControllerSession<SimTarget>) -> &mut SimTarget {
    session.link().transport_mut()
}
