//! Per-tick/per-instruction tracing, routed through the `log` facade
//! instead of `println!` (SPEC_FULL.md §10.1) — the teacher's `DebugMode`
//! played this role with an ad hoc enum; a verbosity level set once at
//! startup via `RUST_LOG` does the same job without a bespoke type.

use crate::cpu::registers::Registers;
use crate::isa::Opcode;

/// Emitted once per `step()`, before the opcode executes (spec §4.4: "one
/// step is one instruction").
pub fn trace_fetch(regs: &Registers, opcode: Opcode, arg: Option<i32>) {
    log::debug!(
        "pc={} ac={} z={} n={} ie={} in_isr={} -- {:?} {:?}",
        regs.pc,
        regs.ac,
        regs.z,
        regs.n,
        regs.ie,
        regs.in_isr,
        opcode,
        arg
    );
}

/// Emitted whenever the interrupt controller enters or leaves a handler.
pub fn trace_interrupt(message: &str, regs: &Registers) {
    log::trace!("{} (pc now {}, ac now {})", message, regs.pc, regs.ac);
}
