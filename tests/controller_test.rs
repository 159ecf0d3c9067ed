//! Execution controller tests against the simulated monitor.
//!
//! Tests cover:
//! - Continue with software (self-jump) and hardware breakpoints
//! - Cancellation leaving the CPU stopped
//! - Single step, software and hardware step over
//! - Finish with nested calls and the stack-pointer guard
//! - Breakpoint arming while running, in hypervisor mode, and replacement
//! - One-shot execution and in-place assembly
//! - Stall threshold counting and link failures mid-command

mod common;

use common::{fast_config, session, target_of, SimTarget};
use lib4510::controller::{ExecutionState, LineLookup, StopReason};
use lib4510::link::LinkError;
use lib4510::memory::Address;
use lib4510::{Config, ControllerSession, Error};
use std::ops::RangeInclusive;

fn straight_line_program() -> SimTarget {
    let mut target = SimTarget::new();
    target.load(
        0x2000,
        &[
            "LDA #$01",  // $2000
            "NOP",       // $2002
            "NOP",       // $2003
            "LDA #$02",  // $2004
            "JMP $2006", // $2006: park here
        ],
    );
    target
}

fn nested_call_program() -> SimTarget {
    let mut target = SimTarget::new();
    target
        .load(0x2000, &["JSR $3000", "LDA #$FF"])
        .load(0x3000, &["JSR $3100", "JSR $3100", "RTS"])
        .load(0x3100, &["PHA", "PLA", "RTS"]);
    target
}

// ========== Continue ==========

#[test]
fn test_software_breakpoint_hit_restores_bytes() {
    let target = straight_line_program();
    let original = target.cpu_bytes(0x2004, 3);
    assert_eq!(original, vec![0xA9, 0x02, 0x4C]);

    let mut session = session(target);
    let stop = session.continue_execution(Some(0x2004), true).unwrap();

    assert_eq!(stop, StopReason::SoftwareBreakpoint { pc: 0x2004 });
    assert!(session.software_breakpoint().is_none());
    assert_eq!(session.state(), ExecutionState::Stopped);

    let target = target_of(&mut session);
    assert_eq!(target.cpu_bytes(0x2004, 3), original);
    assert_eq!(target.regs.pc, 0x2004);
    assert!(!target.running);
    assert!(target.sent.contains(&"s7772004 4C 04 20".to_string()));
    assert!(target.sent.contains(&"s7772004 A9 02 4C".to_string()));
}

#[test]
fn test_software_breakpoint_at_current_pc_steps_off_first() {
    let mut target = SimTarget::new();
    target.load(0x2000, &["LDA #$01", "NOP", "JMP $2000"]);

    let mut session = session(target);
    let stop = session.continue_execution(Some(0x2000), true).unwrap();

    assert_eq!(stop, StopReason::SoftwareBreakpoint { pc: 0x2000 });
    let target = target_of(&mut session);
    assert_eq!(target.cpu_bytes(0x2000, 3), vec![0xA9, 0x01, 0xEA]);
    // The CPU leaves the address before it is patched
    assert_eq!(target.control_commands()[0], "");
}

#[test]
fn test_hardware_breakpoint_halts() {
    let mut session = session(straight_line_program());
    let stop = session.continue_execution(Some(0x2004), false).unwrap();

    assert_eq!(stop, StopReason::Halted { pc: 0x2004 });
    let target = target_of(&mut session);
    assert_eq!(target.hw_breakpoint, Some(0x2004));
    assert_eq!(target.control_commands(), vec!["b2004", "t0"]);
    // Untouched code
    assert_eq!(target.cpu_bytes(0x2004, 2), vec![0xA9, 0x02]);
}

#[test]
fn test_continue_without_target_detects_tight_loop() {
    let mut session = session(straight_line_program());
    let stop = session.continue_execution(None, false).unwrap();
    assert_eq!(stop, StopReason::Halted { pc: 0x2006 });
}

// ========== Stall detection ==========

fn parked_program() -> SimTarget {
    let mut target = SimTarget::new();
    target.load(0x2000, &["JMP $2000"]);
    target
}

#[test]
fn test_halt_needs_threshold_repeats_of_first_pc() {
    let mut session = session(parked_program());
    let stop = session.continue_execution(None, false).unwrap();

    assert_eq!(stop, StopReason::Halted { pc: 0x2000 });
    // One poll to see the PC, then five that repeat it
    assert_eq!(target_of(&mut session).count_sent("r"), 6);
}

#[test]
fn test_custom_stall_threshold() {
    let config = Config {
        stall_threshold: 2,
        ..fast_config()
    };
    let mut session = ControllerSession::new(parked_program(), config);

    let stop = session.continue_execution(None, false).unwrap();

    assert_eq!(stop, StopReason::Halted { pc: 0x2000 });
    assert_eq!(target_of(&mut session).count_sent("r"), 3);
}

fn short_run_then_park() -> SimTarget {
    let mut target = SimTarget::new();
    target.load(0x2000, &["NOP", "NOP", "NOP", "JMP $2003"]);
    target
}

#[test]
fn test_brief_pause_is_not_a_halt() {
    let mut target = short_run_then_park();
    // Four identical PCs are one short of the default threshold
    target.frozen_polls = 4;
    let mut session = session(target);

    let stop = session.continue_execution(None, false).unwrap();

    assert_eq!(stop, StopReason::Halted { pc: 0x2003 });
    assert_eq!(target_of(&mut session).count_sent("r"), 10);
}

#[test]
fn test_pause_of_threshold_length_is_a_halt() {
    let mut target = short_run_then_park();
    target.frozen_polls = 6;
    let mut session = session(target);

    let stop = session.continue_execution(None, false).unwrap();

    assert_eq!(stop, StopReason::Halted { pc: 0x2000 });
    assert_eq!(target_of(&mut session).count_sent("r"), 6);
}

#[test]
fn test_cancel_stops_the_cpu() {
    let mut target = SimTarget::new();
    target.load(0x2000, &["INX", "JMP $2000"]);

    let mut session = session(target);
    let flag = session.cancel_flag();
    target_of(&mut session).cancel_at = Some((4, flag));

    let stop = session.continue_execution(None, false).unwrap();

    assert_eq!(stop, StopReason::Cancelled);
    assert_eq!(session.state(), ExecutionState::Stopped);
    let target = target_of(&mut session);
    assert!(!target.running);
    assert_eq!(target.control_commands().last(), Some(&"t1"));
}

#[test]
fn test_cancel_with_armed_software_breakpoint_still_stops() {
    let mut target = SimTarget::new();
    target.load(0x2000, &["INX", "JMP $2000"]).load(0x2100, &["RTS"]);

    let mut session = session(target);
    let flag = session.cancel_flag();
    // Probing the CPU state takes a few polls before the loop starts
    target_of(&mut session).cancel_at = Some((12, flag));

    let stop = session.continue_execution(Some(0x2100), true).unwrap();

    assert_eq!(stop, StopReason::Cancelled);
    assert!(!target_of(&mut session).running);
    assert!(session.software_breakpoint().is_some());
}

// ========== Breakpoint management ==========

#[test]
fn test_arm_and_clear_restores_exact_bytes() {
    let mut target = SimTarget::new();
    target.cpu[0x4000..0x4003].copy_from_slice(&[0x12, 0x34, 0x56]);

    let mut session = session(target);
    let armed = session.set_software_breakpoint(0x4000).unwrap();
    assert_eq!(armed.saved, [0x12, 0x34, 0x56]);
    assert_eq!(target_of(&mut session).cpu_bytes(0x4000, 3), vec![0x4C, 0x00, 0x40]);

    let cleared = session.clear_software_breakpoint().unwrap();
    assert_eq!(cleared, Some(armed));
    assert_eq!(target_of(&mut session).cpu_bytes(0x4000, 3), vec![0x12, 0x34, 0x56]);

    assert_eq!(session.clear_software_breakpoint().unwrap(), None);
}

#[test]
fn test_arming_replaces_previous_breakpoint() {
    let mut session = session(straight_line_program());
    session.set_software_breakpoint(0x2004).unwrap();
    let second = session.set_software_breakpoint(0x2000).unwrap();

    assert_eq!(session.software_breakpoint(), Some(&second));
    // The first patch is not undone
    let target = target_of(&mut session);
    assert_eq!(target.cpu_bytes(0x2004, 3), vec![0x4C, 0x04, 0x20]);
}

#[test]
fn test_arming_while_running_stops_and_resumes() {
    let mut target = SimTarget::new();
    target.load(0x2000, &["INX", "JMP $2000"]);
    target.running = true;

    let mut session = session(target);
    session.set_software_breakpoint(0x2100).unwrap();

    let target = target_of(&mut session);
    assert_eq!(
        target.control_commands(),
        vec!["t1", "s7772100 4C 00 21", "t0"]
    );
    assert!(target.running);
}

#[test]
fn test_hypervisor_breakpoint_uses_flat_addressing() {
    let mut target = SimTarget::new();
    target.regs.maph = 0x3F00;
    target.flat.insert(0x0FFF_8100, 0xAA);

    let mut session = session(target);
    let armed = session.set_software_breakpoint(0x8100).unwrap();

    assert_eq!(armed.address, Address::Flat(0x0FFF_8100));
    assert_eq!(armed.saved, [0xAA, 0x00, 0x00]);
    let target = target_of(&mut session);
    assert!(target.sent.contains(&"sFFF8100 4C 00 81".to_string()));
    assert_eq!(target.flat.get(&0x0FFF_8100), Some(&0x4C));
}

#[test]
fn test_high_address_breakpoint_uses_flat_addressing() {
    let mut session = session(SimTarget::new());
    let armed = session.set_software_breakpoint(0x12000).unwrap();
    assert_eq!(armed.address, Address::Flat(0x12000));
    assert!(target_of(&mut session)
        .sent
        .contains(&"s0012000 4C 00 20".to_string()));
}

// ========== Stepping ==========

#[test]
fn test_step_count() {
    let mut session = session(straight_line_program());
    let stop = session.step(3).unwrap();
    assert_eq!(stop, StopReason::Completed { pc: 0x2004 });
    assert_eq!(target_of(&mut session).count_sent(""), 3);
}

#[test]
fn test_step_over_jsr_with_nested_calls() {
    let mut session = session(nested_call_program());
    let stop = session.step_over(1, false, None).unwrap();

    assert_eq!(stop, StopReason::Completed { pc: 0x2003 });
    let target = target_of(&mut session);
    assert_eq!(target.regs.sp, 0x01FF);
    // JSR, two inner calls of JSR/PHA/PLA/RTS, then the outer RTS
    assert_eq!(target.count_sent(""), 10);
}

#[test]
fn test_step_over_plain_instruction_is_one_step() {
    let mut session = session(straight_line_program());
    let stop = session.step_over(2, false, None).unwrap();
    assert_eq!(stop, StopReason::Completed { pc: 0x2003 });
    assert_eq!(target_of(&mut session).count_sent(""), 2);
}

struct Lines(RangeInclusive<u16>);

impl LineLookup for Lines {
    fn line_range(&self, pc: u16) -> Option<RangeInclusive<u16>> {
        self.0.contains(&pc).then(|| self.0.clone())
    }
}

#[test]
fn test_hardware_step_over_coalesces_source_line() {
    let mut session = session(straight_line_program());
    let lines = Lines(0x2000..=0x2003);

    let stop = session.step_over(1, true, Some(&lines)).unwrap();

    assert_eq!(stop, StopReason::Completed { pc: 0x2004 });
    assert_eq!(target_of(&mut session).count_sent("N"), 3);
}

#[test]
fn test_hardware_step_over_without_lines() {
    let mut session = session(nested_call_program());
    let stop = session.step_over(1, true, None).unwrap();

    assert_eq!(stop, StopReason::Completed { pc: 0x2003 });
    assert_eq!(target_of(&mut session).count_sent("N"), 1);
}

#[test]
fn test_finish_returns_to_caller() {
    let mut session = session(nested_call_program());
    session.step(1).unwrap();
    assert_eq!(target_of(&mut session).regs.pc, 0x3000);

    let stop = session.finish().unwrap();

    assert_eq!(stop, StopReason::Completed { pc: 0x2003 });
    assert_eq!(target_of(&mut session).regs.sp, 0x01FF);
}

#[test]
fn test_finish_ignores_inner_return() {
    let mut target = SimTarget::new();
    target
        .load(0x2000, &["JSR $3000", "LDA #$FF"])
        // BSR is single-stepped, so its RTS is seen by finish at a deeper SP
        .load(0x3000, &["BSR $3100", "RTS"])
        .load(0x3100, &["RTS"]);

    let mut session = session(target);
    session.step(1).unwrap();

    let stop = session.finish().unwrap();

    assert_eq!(stop, StopReason::Completed { pc: 0x2003 });
    let target = target_of(&mut session);
    // BSR, inner RTS, outer RTS
    assert_eq!(target.count_sent(""), 4);
}

fn call_that_never_returns() -> SimTarget {
    let mut target = SimTarget::new();
    target
        .load(0x2000, &["JSR $3000", "LDA #$FF"])
        .load(0x3000, &["JMP $3000"]);
    target
}

#[test]
fn test_cancel_during_step_over_jsr_stops_cpu() {
    let mut session = session(call_that_never_returns());
    let flag = session.cancel_flag();
    target_of(&mut session).cancel_at = Some((5, flag));

    let stop = session.step_over(1, false, None).unwrap();

    assert_eq!(stop, StopReason::Cancelled);
    assert_eq!(session.state(), ExecutionState::Stopped);
    let target = target_of(&mut session);
    assert_eq!(target.regs.pc, 0x3000);
    assert!(!target.running);
    assert_eq!(target.control_commands().last(), Some(&"t1"));
}

#[test]
fn test_cancel_during_finish_stops_cpu() {
    let mut session = session(call_that_never_returns());
    session.step(1).unwrap();

    let flag = session.cancel_flag();
    let target = target_of(&mut session);
    let at = target.polls + 10;
    target.cancel_at = Some((at, flag));

    let stop = session.finish().unwrap();

    assert_eq!(stop, StopReason::Cancelled);
    assert_eq!(session.state(), ExecutionState::Stopped);
    let target = target_of(&mut session);
    assert_eq!(target.regs.pc, 0x3000);
    assert!(!target.running);
    assert_eq!(target.control_commands().last(), Some(&"t1"));
}

#[test]
fn test_step_resets_frame_cursor() {
    let mut session = session(nested_call_program());
    session.step(1).unwrap();
    session.move_frame(lib4510::FrameDirection::Down);
    assert_eq!(session.frame_cursor().index(), 1);

    session.step(1).unwrap();
    assert_eq!(session.frame_cursor().index(), 0);
}

// ========== Assembly ==========

#[test]
fn test_assemble_at_writes_encoding() {
    let mut session = session(SimTarget::new());
    let encoded = session
        .assemble_at(Address::Cpu(0x2000), "sta ($20),z")
        .unwrap();

    assert_eq!(encoded.bytes, vec![0x92, 0x20]);
    assert_eq!(target_of(&mut session).cpu_bytes(0x2000, 2), vec![0x92, 0x20]);
}

#[test]
fn test_assemble_at_branch_uses_target_address() {
    let mut session = session(SimTarget::new());
    let encoded = session.assemble_at(Address::Cpu(0x2000), "BCC $2005").unwrap();
    assert_eq!(encoded.bytes, vec![0x90, 0x03]);
}

#[test]
fn test_assemble_failure_writes_nothing() {
    let mut session = session(SimTarget::new());
    let err = session.assemble_at(Address::Cpu(0x2000), "FOO #$01").unwrap_err();

    assert!(matches!(err, Error::Encode(_)));
    assert!(target_of(&mut session).sent.is_empty());
}

#[test]
fn test_one_shot_execution_restores_state() {
    let mut target = straight_line_program();
    target.cpu[0xF0..0xF3].copy_from_slice(&[0x11, 0x22, 0x33]);

    let mut session = session(target);
    let regs = session.execute_one_shot("LDA #$42").unwrap();

    assert_eq!(regs.a, 0x42);
    assert_eq!(regs.pc, 0x00F2);
    let target = target_of(&mut session);
    assert_eq!(target.regs.pc, 0x2000);
    assert_eq!(target.regs.a, 0x42);
    assert_eq!(target.cpu_bytes(0xF0, 3), vec![0x11, 0x22, 0x33]);
}

#[test]
fn test_one_shot_encode_error_touches_nothing() {
    let mut session = session(SimTarget::new());
    assert!(session.execute_one_shot("LDA ($1234),Y").is_err());
    assert!(target_of(&mut session).sent.is_empty());
}

#[test]
fn test_disassemble_listing() {
    let mut session = session(straight_line_program());
    let lines = session.disassemble_at(Some(Address::Cpu(0x2000)), 3).unwrap();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("$2000  A9 01"));
    assert!(lines[0].ends_with("LDA #$01"));
    assert!(lines[1].ends_with("EOM"));
    assert!(lines[2].starts_with("$2003"));
}

#[test]
fn test_disassemble_defaults_to_pc() {
    let mut session = session(straight_line_program());
    session.step(3).unwrap();

    let lines = session.disassemble_at(None, 1).unwrap();
    assert!(lines[0].starts_with("$2004"));
    assert!(lines[0].ends_with("LDA #$02"));
}

#[test]
fn test_is_cpu_stopped() {
    let mut target = SimTarget::new();
    target.load(0x2000, &["INX", "JMP $2000"]);
    let mut session = session(target);
    assert!(session.is_cpu_stopped().unwrap());

    target_of(&mut session).running = true;
    assert!(!session.is_cpu_stopped().unwrap());
}

// ========== Link failures ==========

#[test]
fn test_link_failure_mid_step_leaves_state_stopped() {
    let mut target = straight_line_program();
    target.fail_on = Some("");
    let mut session = session(target);

    assert!(matches!(session.step(3), Err(LinkError::Io(_))));
    assert_eq!(session.state(), ExecutionState::Stopped);
}

#[test]
fn test_link_failure_while_running_leaves_state_stopped() {
    let mut target = parked_program();
    target.fail_on = Some("r");
    let mut session = session(target);

    assert!(matches!(
        session.continue_execution(None, false),
        Err(LinkError::Io(_))
    ));
    assert_eq!(session.state(), ExecutionState::Stopped);
}

#[test]
fn test_link_failure_during_finish_leaves_state_stopped() {
    let mut session = session(nested_call_program());
    session.step(1).unwrap();
    target_of(&mut session).fail_on = Some("");

    assert!(session.finish().is_err());
    assert_eq!(session.state(), ExecutionState::Stopped);
}
