//! The CPU datapath's visible state (spec §4.4): accumulator, program
//! counter, the transient address/data latches, the two condition flags,
//! and the two interrupt-control bits.
//!
//! Mirrors the teacher's split of "plain register storage" from "how an
//! instruction uses it" (`cpu::mod`): this struct only knows how to hold
//! and report its own bits.

/// `AC`, `PC`, `AR`, `DR`, `Z`, `N`, `IE`, `IN_ISR` (spec §4.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct Registers {
    pub ac: i32,
    pub pc: u32,
    pub ar: u32,
    pub dr: i32,
    pub z: bool,
    pub n: bool,
    pub ie: bool,
    pub in_isr: bool,
}

impl Registers {
    /// `PC` starts at `_start`'s byte address (spec §4.4, §6).
    pub fn new(start_pc: u32) -> Registers {
        Registers {
            pc: start_pc,
            ..Registers::default()
        }
    }

    /// Updates `Z`/`N` from a value just written to `AC` (spec §4.4: every
    /// ALU/load opcode refreshes both flags from the result).
    pub fn set_flags_from(&mut self, value: i32) {
        self.z = value == 0;
        self.n = value < 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_seeds_pc_and_zeroes_everything_else() {
        let regs = Registers::new(40);
        assert_eq!(regs.pc, 40);
        assert_eq!(regs.ac, 0);
        assert!(!regs.ie);
        assert!(!regs.in_isr);
    }

    #[test]
    fn set_flags_from_tracks_zero_and_negative() {
        let mut regs = Registers::default();
        regs.set_flags_from(0);
        assert!(regs.z && !regs.n);
        regs.set_flags_from(-5);
        assert!(!regs.z && regs.n);
        regs.set_flags_from(5);
        assert!(!regs.z && !regs.n);
    }
}
