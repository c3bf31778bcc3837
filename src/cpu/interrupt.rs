//! The 8-slot vectored interrupt controller (spec §4.5): synchronous `int
//! n`, asynchronous port-driven requests accepted between instructions, and
//! `fi`/`iret` unwinding the single saved frame.
//!
//! The vector table and the AC/PC save words are not separate Rust state —
//! they're the prologue's own memory cells (spec §GLOSSARY "Prologue"), so
//! this module just knows which addresses those are and reads/writes
//! through the same [`Memory`] the rest of the CPU uses.

use crate::cpu::debug;
use crate::cpu::registers::Registers;
use crate::error::SimFault;
use crate::image::{vector_byte_address, AC_SAVE_BYTE_ADDRESS, PC_SAVE_BYTE_ADDRESS, VECTOR_SLOTS};
use crate::memory::{Memory, Ports};

/// Port `n`'s request line maps onto vector slot `n`, for `1..=8` (spec
/// §4.5 doesn't name the mapping explicitly; inferred from the interrupt
/// smoke-test scenario pairing port 1 with handler `int1`, spec §8).
fn port_for_vector(slot: u32) -> u32 {
    slot
}

/// Enters the lowest-numbered bound vector whose request is pending,
/// whether that's an asynchronous port or (having just executed `int n`)
/// the caller's own synchronous request. Returns `true` if an interrupt was
/// entered. Never nests: a pending request while already `IN_ISR` waits.
///
/// `return_pc` is what gets saved to the PC slot and is what `fi` will jump
/// back to — for the asynchronous path that's the not-yet-executed
/// instruction at the acceptance boundary; for synchronous `int n` it's the
/// address *after* the `int` instruction itself, not `int`'s own address
/// (else `fi` would re-execute `int n` and re-trigger forever). `fault_pc`
/// is only used for attributing a memory fault to a PC.
fn enter(
    regs: &mut Registers,
    memory: &mut Memory,
    slot: u32,
    return_pc: u32,
    fault_pc: u32,
) -> Result<bool, SimFault> {
    let vector_addr = vector_byte_address(slot);
    let handler = memory.read_word(vector_addr, fault_pc)?;
    if handler == 0 {
        return Ok(false);
    }
    memory.write_word(AC_SAVE_BYTE_ADDRESS, regs.ac, fault_pc)?;
    memory.write_word(PC_SAVE_BYTE_ADDRESS, return_pc as i32, fault_pc)?;
    regs.pc = handler as u32;
    regs.ie = false;
    regs.in_isr = true;
    debug::trace_interrupt("entered vector", regs);
    Ok(true)
}

/// Between-instruction acceptance of an asynchronous port request (spec
/// §4.5 "interrupt acceptance occurs between instructions, never mid-
/// instruction"). Scans vector slots 1..8 in order; the lowest-numbered
/// asserted slot wins (spec §4.5 "lowest-numbered pending vector is
/// serviced first").
pub fn accept_pending(
    regs: &mut Registers,
    memory: &mut Memory,
    ports: &Ports,
    pc: u32,
) -> Result<bool, SimFault> {
    if !regs.ie || regs.in_isr {
        return Ok(false);
    }
    for slot in 1..=VECTOR_SLOTS as u32 {
        if ports.pending(port_for_vector(slot)) && enter(regs, memory, slot, pc, pc)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `int n` (spec §4.4 opcode table): synchronous request for vector `n`.
/// A literal reading of the spec's "if IE: push, jump, clear IE" wording
/// means this is a no-op when interrupts are disabled or one is already in
/// progress, rather than a fault or a queued request (SPEC_FULL.md §12).
pub fn trigger(regs: &mut Registers, memory: &mut Memory, n: i32, pc: u32) -> Result<(), SimFault> {
    if !regs.ie || regs.in_isr {
        return Ok(());
    }
    if n < 1 || n > VECTOR_SLOTS as i32 {
        return Ok(());
    }
    // Return to the instruction after `int n`, not `int n` itself --
    // otherwise `fi` would jump straight back into the same `int` and
    // re-trigger it forever.
    enter(regs, memory, n as u32, pc.wrapping_add(4), pc)?;
    Ok(())
}

/// `fi`/`iret`: pops the one saved frame and re-enables interrupts. Fatal
/// if there's no frame to pop — the save slots are not a stack, so a `fi`
/// outside an ISR has nothing consistent to restore (spec §7 "stack
/// mismatch on fi").
pub fn finish(regs: &mut Registers, memory: &Memory, pc: u32) -> Result<(), SimFault> {
    if !regs.in_isr {
        return Err(SimFault::StackMismatch { pc, line: None });
    }
    regs.ac = memory.read_word(AC_SAVE_BYTE_ADDRESS, pc)?;
    regs.pc = memory.read_word(PC_SAVE_BYTE_ADDRESS, pc)? as u32;
    regs.ie = true;
    regs.in_isr = false;
    debug::trace_interrupt("returned from isr", regs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::translate;

    fn memory_for(src: &str) -> Memory {
        let image = translate(src).unwrap();
        Memory::new(&image, crate::memory::DEFAULT_MEMORY_WORDS).unwrap()
    }

    #[test]
    fn unbound_vector_never_fires() {
        let mut memory = memory_for(".text\n_start: hlt\n");
        let mut regs = Registers::new(40);
        regs.ie = true;
        let mut ports = Ports::new();
        ports.deliver_input(1, b'x');
        let fired = accept_pending(&mut regs, &mut memory, &ports, regs.pc).unwrap();
        assert!(!fired);
    }

    #[test]
    fn bound_vector_saves_and_jumps() {
        let mut memory = memory_for(".text\nint1: fi\n_start: hlt\n");
        let mut regs = Registers::new(40);
        regs.ie = true;
        regs.ac = 7;
        let mut ports = Ports::new();
        ports.deliver_input(1, b'x');
        let fired = accept_pending(&mut regs, &mut memory, &ports, regs.pc).unwrap();
        assert!(fired);
        assert!(regs.in_isr);
        assert!(!regs.ie);
        assert_eq!(memory.read_word(AC_SAVE_BYTE_ADDRESS, 40).unwrap(), 7);
    }

    #[test]
    fn disabled_interrupts_never_fire() {
        let mut memory = memory_for(".text\nint1: fi\n_start: hlt\n");
        let mut regs = Registers::new(40);
        let mut ports = Ports::new();
        ports.deliver_input(1, b'x');
        let fired = accept_pending(&mut regs, &mut memory, &ports, regs.pc).unwrap();
        assert!(!fired);
    }

    #[test]
    fn fi_outside_isr_is_a_stack_mismatch() {
        let memory = memory_for(".text\n_start: hlt\n");
        let mut regs = Registers::new(40);
        let err = finish(&mut regs, &memory, 40).unwrap_err();
        assert!(matches!(err, SimFault::StackMismatch { .. }));
    }

    #[test]
    fn fi_restores_the_saved_frame() {
        let mut memory = memory_for(".text\nint1: fi\n_start: hlt\n");
        let mut regs = Registers::new(40);
        regs.ie = true;
        regs.ac = 9;
        let mut ports = Ports::new();
        ports.deliver_input(1, b'x');
        accept_pending(&mut regs, &mut memory, &ports, regs.pc).unwrap();
        finish(&mut regs, &memory, regs.pc).unwrap();
        assert_eq!(regs.ac, 9);
        assert_eq!(regs.pc, 40);
        assert!(regs.ie);
        assert!(!regs.in_isr);
    }
}
