//! Pure arithmetic/logic kernels for the binary ALU opcodes (spec §4.4's
//! control unit table: `add`/`sub`/`mul`/`div`/`and`/`or`/`cmp`). Unary
//! opcodes (`inc`/`dec`/`asr`/`lsl`) live next to them since they're just
//! as small, but are applied directly to `AC` by the caller.
//!
//! Kept free of `Registers`/`Memory` so each op can be exercised in
//! isolation, the way the teacher keeps addressing-mode math separate from
//! `Cpu`.

use crate::error::SimFault;

/// `a op b`, truncating division toward zero. Division by zero is fatal
/// (spec §4.4 "division by zero ... is a runtime fatal error", §7).
/// `i32::MIN / -1` overflows for the same reason `x / 0` does — there's no
/// representable quotient — so it's folded into the same fault.
pub fn add(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

pub fn sub(a: i32, b: i32) -> i32 {
    a.wrapping_sub(b)
}

pub fn mul(a: i32, b: i32) -> i32 {
    a.wrapping_mul(b)
}

pub fn div(a: i32, b: i32, pc: u32) -> Result<i32, SimFault> {
    a.checked_div(b).ok_or(SimFault::DivisionByZero { pc, line: None })
}

pub fn and(a: i32, b: i32) -> i32 {
    a & b
}

pub fn or(a: i32, b: i32) -> i32 {
    a | b
}

/// `cmp`: same result as `sub`, but the caller must not write it back to
/// `AC` — only `Z`/`N` are meant to change (spec §4.4 opcode table).
pub fn cmp(a: i32, b: i32) -> i32 {
    a.wrapping_sub(b)
}

pub fn inc(ac: i32) -> i32 {
    ac.wrapping_add(1)
}

pub fn dec(ac: i32) -> i32 {
    ac.wrapping_sub(1)
}

/// Arithmetic shift right by one bit, sign-extending (spec §4.4 `asr`).
pub fn asr(ac: i32) -> i32 {
    ac >> 1
}

/// Logical shift left by one bit (spec §4.4 `lsl`). Left shifts don't
/// distinguish "arithmetic" from "logical" — only the discarded top bit
/// differs in name, not in the bits that remain.
pub fn lsl(ac: i32) -> i32 {
    ((ac as u32) << 1) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero_is_fatal() {
        let err = div(10, 0, 40).unwrap_err();
        assert!(matches!(err, SimFault::DivisionByZero { pc: 40, .. }));
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(div(-7, 2, 0).unwrap(), -3);
        assert_eq!(div(7, -2, 0).unwrap(), -3);
    }

    #[test]
    fn min_divided_by_minus_one_is_fatal() {
        let err = div(i32::MIN, -1, 0).unwrap_err();
        assert!(matches!(err, SimFault::DivisionByZero { .. }));
    }

    #[test]
    fn cmp_does_not_need_its_own_writeback() {
        assert_eq!(cmp(5, 5), 0);
        assert_eq!(cmp(3, 5), -2);
    }

    #[test]
    fn asr_preserves_sign() {
        assert_eq!(asr(-4), -2);
        assert_eq!(asr(4), 2);
    }

    #[test]
    fn lsl_wraps_silently() {
        assert_eq!(lsl(1), 2);
        assert_eq!(lsl(i32::MAX), -2);
    }
}
