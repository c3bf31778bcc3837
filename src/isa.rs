//! Canonical instruction set: opcodes, their operand arity, which addressing
//! modes are legal for each, and the tick cost of executing them.
//!
//! Mirrors the teacher's split of "what an opcode is" (a flat enum) from
//! "how it behaves" (decoded and executed in `cpu`): this module only knows
//! shapes and costs, never register state.

use std::fmt;

use crate::error::AssembleError;

/// A single opcode, tagged, with no operand payload — the operand (if any)
/// lives alongside it in `assembler::ast::Instruction` / `image::Record`.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    Ld,
    St,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Cmp,
    Inc,
    Dec,
    Asr,
    Lsl,
    Jmp,
    Jz,
    Jnz,
    Jn,
    Jp,
    Out,
    In,
    Int,
    Eni,
    Dii,
    Fi,
    Nop,
    Hlt,
}

/// How many operands an opcode takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    One,
}

/// The addressing mode a resolved operand carries (spec §4.1/§4.5).
///
/// `Value` is an immediate; the rest name how many times the operand is
/// dereferenced before use. `St` only accepts `Direct`/`Deref` — the
/// address-producing modes — which the parser enforces at `*parse time*`
/// (spec §4.5), not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddrMode {
    Value,
    Direct,
    Deref,
    Deref2,
}

impl fmt::Display for AddrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AddrMode::Value => "value",
            AddrMode::Direct => "direct",
            AddrMode::Deref => "deref",
            AddrMode::Deref2 => "deref2",
        };
        f.write_str(s)
    }
}

impl Opcode {
    /// Mnemonic as it appears in source text, lowercase.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ld => "ld",
            Opcode::St => "st",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Cmp => "cmp",
            Opcode::Inc => "inc",
            Opcode::Dec => "dec",
            Opcode::Asr => "asr",
            Opcode::Lsl => "lsl",
            Opcode::Jmp => "jmp",
            Opcode::Jz => "jz",
            Opcode::Jnz => "jnz",
            Opcode::Jn => "jn",
            Opcode::Jp => "jp",
            Opcode::Out => "out",
            Opcode::In => "in",
            Opcode::Int => "int",
            Opcode::Eni => "eni",
            Opcode::Dii => "dii",
            Opcode::Fi => "fi",
            Opcode::Nop => "nop",
            Opcode::Hlt => "hlt",
        }
    }

    /// Parse a mnemonic (already lowercased) into its opcode.
    pub fn from_mnemonic(line: usize, s: &str) -> Result<Opcode, AssembleError> {
        Ok(match s {
            "ld" => Opcode::Ld,
            "st" => Opcode::St,
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "mul" => Opcode::Mul,
            "div" => Opcode::Div,
            "and" => Opcode::And,
            "or" => Opcode::Or,
            "cmp" => Opcode::Cmp,
            "inc" => Opcode::Inc,
            "dec" => Opcode::Dec,
            "asr" => Opcode::Asr,
            "lsl" => Opcode::Lsl,
            "jmp" => Opcode::Jmp,
            "jz" => Opcode::Jz,
            "jnz" => Opcode::Jnz,
            "jn" => Opcode::Jn,
            "jp" => Opcode::Jp,
            "out" => Opcode::Out,
            "in" => Opcode::In,
            "int" => Opcode::Int,
            "eni" => Opcode::Eni,
            "dii" => Opcode::Dii,
            "fi" | "iret" => Opcode::Fi,
            "nop" => Opcode::Nop,
            "hlt" => Opcode::Hlt,
            other => {
                return Err(AssembleError::UnknownOpcode {
                    line,
                    mnemonic: other.to_string(),
                })
            }
        })
    }

    pub fn arity(self) -> Arity {
        match self {
            Opcode::Inc
            | Opcode::Dec
            | Opcode::Asr
            | Opcode::Lsl
            | Opcode::Eni
            | Opcode::Dii
            | Opcode::Fi
            | Opcode::Nop
            | Opcode::Hlt => Arity::None,
            _ => Arity::One,
        }
    }

    /// Whether `mode` is a legal addressing mode for this opcode's operand.
    /// Only meaningful when `arity() == Arity::One`.
    ///
    /// `st` and the branch family are the only address-*consuming* opcodes
    /// (spec §4.5's "address form"); everything else fetches a value and
    /// accepts any of the four modes. `st` writes through the resolved
    /// address so only the address-producing modes (`direct`, `deref`) make
    /// sense for it (spec §4.5 design note). The branch family additionally
    /// accepts `value` (a literal target address, e.g. `jmp 40`); `deref2`
    /// is excluded there as a documented simplification (SPEC_FULL.md §12).
    pub fn accepts_mode(self, mode: AddrMode) -> bool {
        match self {
            Opcode::St => matches!(mode, AddrMode::Direct | AddrMode::Deref),
            Opcode::Jmp | Opcode::Jz | Opcode::Jnz | Opcode::Jn | Opcode::Jp => {
                matches!(mode, AddrMode::Value | AddrMode::Direct | AddrMode::Deref)
            }
            // ld/arithmetic/cmp/out/in/int accept any addressing mode that
            // the grammar can produce for a value fetch.
            _ => true,
        }
    }

    /// Tick cost of executing this opcode, given its resolved addressing
    /// mode (`None` for zero-operand opcodes). See SPEC_FULL.md §12.3 for
    /// the cost model rationale — spec.md leaves exact costs unspecified.
    pub fn tick_cost(self, mode: Option<AddrMode>) -> u64 {
        match self {
            Opcode::Inc
            | Opcode::Dec
            | Opcode::Asr
            | Opcode::Lsl
            | Opcode::Nop
            | Opcode::Eni
            | Opcode::Dii
            | Opcode::Fi
            | Opcode::Hlt => 1,
            Opcode::Jmp | Opcode::Jz | Opcode::Jnz | Opcode::Jn | Opcode::Jp => 2,
            Opcode::Int => 3,
            Opcode::Out | Opcode::In => 2,
            _ => match mode {
                Some(AddrMode::Value) | None => 2,
                Some(AddrMode::Direct) | Some(AddrMode::Deref) => 3,
                Some(AddrMode::Deref2) => 4,
            },
        }
    }
}
