//! Error types, one per pipeline stage (spec §7), following the teacher's
//! pattern of a `thiserror` enum per concern rather than one catch-all.

use thiserror::Error;

/// Errors raised while lexing and parsing source text, or resolving labels
/// during layout. No image is produced when this is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("line {line}: unknown opcode `{mnemonic}`")]
    UnknownOpcode { line: usize, mnemonic: String },

    #[error("line {line}: `{mnemonic}` takes {expected} operand(s), found {found}")]
    WrongArity {
        line: usize,
        mnemonic: String,
        expected: u8,
        found: u8,
    },

    #[error("line {line}: invalid operand `{text}`")]
    BadOperand { line: usize, text: String },

    #[error("line {line}: `{mnemonic}` does not accept addressing mode `{mode}`")]
    IllegalAddressingMode {
        line: usize,
        mnemonic: String,
        mode: String,
    },

    #[error("line {line}: invalid label name `{name}`")]
    BadLabelName { line: usize, name: String },

    #[error("line {line}: label `{name}` is already defined at line {first_line}")]
    DuplicateLabel {
        line: usize,
        name: String,
        first_line: usize,
    },

    #[error("label `{name}` is referenced but never defined")]
    UndefinedLabel { name: String },

    #[error("line {line}: instructions are not allowed in the .data section")]
    InstructionInData { line: usize },

    #[error("line {line}: data definitions are not allowed in the .text section")]
    DataInText { line: usize },

    #[error("line {line}: malformed data definition")]
    BadDataDefinition { line: usize },

    #[error("`_start` label is not defined")]
    MissingStart,

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
}

/// Errors raised while assigning addresses and resolving operands (spec
/// §4.2, §7). No image is produced when this is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error(
        "image requires {required} words but memory is only {available} words (prologue + code + data exceed memory size)"
    )]
    ImageExceedsMemory { required: usize, available: usize },
}

/// Runtime fatal errors (spec §7): the simulator stops immediately and
/// reports the offending program counter and, when the image's record
/// carries one, the originating source line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimFault {
    #[error("division by zero at pc={pc}")]
    DivisionByZero { pc: u32, line: Option<usize> },

    #[error("memory access out of range at address {address} (pc={pc})")]
    MemoryOutOfRange {
        pc: u32,
        address: u32,
        line: Option<usize>,
    },

    #[error("misaligned word access at address {address} (pc={pc})")]
    MisalignedAccess {
        pc: u32,
        address: u32,
        line: Option<usize>,
    },

    #[error("unknown opcode word {word} at pc={pc}")]
    UnknownOpcodeWord {
        pc: u32,
        word: i32,
        line: Option<usize>,
    },

    #[error("input port {port} underflowed at pc={pc}")]
    PortUnderflow {
        pc: u32,
        port: u32,
        line: Option<usize>,
    },

    #[error("`fi`/`iret` with no saved interrupt frame at pc={pc}")]
    StackMismatch { pc: u32, line: Option<usize> },
}

impl SimFault {
    pub fn pc(&self) -> u32 {
        match self {
            SimFault::DivisionByZero { pc, .. }
            | SimFault::MemoryOutOfRange { pc, .. }
            | SimFault::MisalignedAccess { pc, .. }
            | SimFault::UnknownOpcodeWord { pc, .. }
            | SimFault::PortUnderflow { pc, .. }
            | SimFault::StackMismatch { pc, .. } => *pc,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            SimFault::DivisionByZero { line, .. }
            | SimFault::MemoryOutOfRange { line, .. }
            | SimFault::MisalignedAccess { line, .. }
            | SimFault::UnknownOpcodeWord { line, .. }
            | SimFault::PortUnderflow { line, .. }
            | SimFault::StackMismatch { line, .. } => *line,
        }
    }

    /// Attaches the source line of the instruction that raised this fault,
    /// if one isn't already set (spec §7: faults report "the offending PC
    /// and source line"). Faults raised deep in `memory`/`cpu::alu` don't
    /// know their line; the control unit fills it in at the call site.
    pub fn with_line(mut self, line: usize) -> SimFault {
        let slot = match &mut self {
            SimFault::DivisionByZero { line, .. }
            | SimFault::MemoryOutOfRange { line, .. }
            | SimFault::MisalignedAccess { line, .. }
            | SimFault::UnknownOpcodeWord { line, .. }
            | SimFault::PortUnderflow { line, .. }
            | SimFault::StackMismatch { line, .. } => line,
        };
        if slot.is_none() {
            *slot = Some(line);
        }
        self
    }
}

/// Top-level error wrapping every stage, for callers that want one type
/// across both `translate` and `run` (mirrors the teacher's `MainError`
/// wrapping `RomError`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Sim(#[from] SimFault),

    #[error("malformed image: {0}")]
    Image(String),
}
