//! The control unit (spec §4.4): fetches one instruction per `step()` from
//! the image's own record list, decodes it, and drives the ALU, memory,
//! and interrupt controller to execute it.
//!
//! Instructions are looked up by program-counter byte address directly in
//! the assembled [`Image`]'s records rather than decoded from [`Memory`]'s
//! byte array — self-modifying code is out of scope (spec §1), so there's
//! no decodable bit pattern to synthesize for an instruction word; see
//! `memory::Memory::new`'s doc comment for the other half of this split.

pub mod alu;
pub mod debug;
pub mod interrupt;
pub mod registers;

use std::collections::HashMap;

use crate::error::SimFault;
use crate::image::{Image, Record, START_BYTE_ADDRESS};
use crate::isa::{AddrMode, Opcode};
use crate::memory::{Memory, Ports};

use registers::Registers;

/// What `step()` just did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Halted,
}

struct Decoded {
    opcode: Opcode,
    arg: Option<i32>,
    mode: Option<AddrMode>,
    line: usize,
}

/// The CPU datapath plus the decoded instruction table it fetches from.
pub struct Cpu {
    pub regs: Registers,
    /// Count of completed `fi`/`iret` events, for callers that want to
    /// assert on interrupt activity (spec §8 scenario 4: "exactly three
    /// `fi` events recorded").
    pub fi_events: u64,
    instructions: HashMap<u32, Decoded>,
}

impl Cpu {
    pub fn new(image: &Image) -> Cpu {
        let mut instructions = HashMap::new();
        for record in &image.records {
            if let Record::Instruction { index, opcode, arg, mode, line } = record {
                instructions.insert(
                    (*index * 4) as u32,
                    Decoded { opcode: *opcode, arg: *arg, mode: *mode, line: *line },
                );
            }
        }
        Cpu { regs: Registers::new(START_BYTE_ADDRESS), fi_events: 0, instructions }
    }

    /// Runs the between-instruction interrupt check, then fetches and
    /// executes exactly one instruction (spec §4.4 "one step is one
    /// instruction", §4.5 "acceptance occurs between instructions").
    /// Returns the outcome and the tick cost of whatever just ran.
    pub fn step(
        &mut self,
        memory: &mut Memory,
        ports: &mut Ports,
    ) -> Result<(StepOutcome, u64), SimFault> {
        interrupt::accept_pending(&mut self.regs, memory, ports, self.regs.pc)?;

        let pc = self.regs.pc;
        let decoded = match self.instructions.get(&pc) {
            Some(d) => d,
            None => {
                let word = memory.read_word(pc, pc)?;
                return Err(SimFault::UnknownOpcodeWord { pc, word, line: None });
            }
        };
        let (opcode, arg, mode, line) = (decoded.opcode, decoded.arg, decoded.mode, decoded.line);
        debug::trace_fetch(&self.regs, opcode, arg);

        let ticks = opcode.tick_cost(mode);
        let outcome = self
            .execute(opcode, arg, mode, memory, ports)
            .map_err(|e| e.with_line(line))?;
        Ok((outcome, ticks))
    }

    fn execute(
        &mut self,
        opcode: Opcode,
        arg: Option<i32>,
        mode: Option<AddrMode>,
        memory: &mut Memory,
        ports: &mut Ports,
    ) -> Result<StepOutcome, SimFault> {
        let pc = self.regs.pc;
        let mut next_pc = pc.wrapping_add(4);

        match opcode {
            Opcode::Ld => {
                let v = fetch_value(mode.unwrap(), arg.unwrap(), memory, pc)?;
                self.regs.ac = v;
                self.regs.set_flags_from(v);
            }
            Opcode::St => {
                let addr = fetch_address(mode.unwrap(), arg.unwrap(), memory, pc)?;
                memory.write_word(addr as u32, self.regs.ac, pc)?;
            }
            Opcode::Add => self.binary_op(mode, arg, memory, pc, alu::add)?,
            Opcode::Sub => self.binary_op(mode, arg, memory, pc, alu::sub)?,
            Opcode::Mul => self.binary_op(mode, arg, memory, pc, alu::mul)?,
            Opcode::Div => {
                let v = fetch_value(mode.unwrap(), arg.unwrap(), memory, pc)?;
                self.regs.ac = alu::div(self.regs.ac, v, pc)?;
                self.regs.set_flags_from(self.regs.ac);
            }
            Opcode::And => self.binary_op(mode, arg, memory, pc, alu::and)?,
            Opcode::Or => self.binary_op(mode, arg, memory, pc, alu::or)?,
            Opcode::Cmp => {
                let v = fetch_value(mode.unwrap(), arg.unwrap(), memory, pc)?;
                let result = alu::cmp(self.regs.ac, v);
                self.regs.set_flags_from(result);
            }
            Opcode::Inc => self.unary_op(alu::inc),
            Opcode::Dec => self.unary_op(alu::dec),
            Opcode::Asr => self.unary_op(alu::asr),
            Opcode::Lsl => self.unary_op(alu::lsl),
            Opcode::Jmp => {
                next_pc = fetch_address(mode.unwrap(), arg.unwrap(), memory, pc)? as u32;
            }
            Opcode::Jz => {
                if self.regs.z {
                    next_pc = fetch_address(mode.unwrap(), arg.unwrap(), memory, pc)? as u32;
                }
            }
            Opcode::Jnz => {
                if !self.regs.z {
                    next_pc = fetch_address(mode.unwrap(), arg.unwrap(), memory, pc)? as u32;
                }
            }
            Opcode::Jn => {
                if self.regs.n {
                    next_pc = fetch_address(mode.unwrap(), arg.unwrap(), memory, pc)? as u32;
                }
            }
            Opcode::Jp => {
                if !self.regs.n {
                    next_pc = fetch_address(mode.unwrap(), arg.unwrap(), memory, pc)? as u32;
                }
            }
            Opcode::Out => {
                let port = fetch_value(mode.unwrap(), arg.unwrap(), memory, pc)? as u32;
                ports.push_output(port, self.regs.ac as u8);
            }
            Opcode::In => {
                let port = fetch_value(mode.unwrap(), arg.unwrap(), memory, pc)? as u32;
                let byte = ports.take_input(port, pc)?;
                self.regs.ac = byte as i32;
                self.regs.set_flags_from(self.regs.ac);
            }
            Opcode::Int => {
                let n = fetch_value(mode.unwrap(), arg.unwrap(), memory, pc)?;
                interrupt::trigger(&mut self.regs, memory, n, pc)?;
                if self.regs.in_isr && self.regs.pc != pc {
                    next_pc = self.regs.pc;
                }
            }
            Opcode::Eni => self.regs.ie = true,
            Opcode::Dii => self.regs.ie = false,
            Opcode::Fi => {
                interrupt::finish(&mut self.regs, memory, pc)?;
                self.fi_events += 1;
                next_pc = self.regs.pc;
            }
            Opcode::Nop => {}
            Opcode::Hlt => return Ok(StepOutcome::Halted),
        }

        self.regs.pc = next_pc;
        Ok(StepOutcome::Continue)
    }

    fn binary_op(
        &mut self,
        mode: Option<AddrMode>,
        arg: Option<i32>,
        memory: &Memory,
        pc: u32,
        op: fn(i32, i32) -> i32,
    ) -> Result<(), SimFault> {
        let v = fetch_value(mode.unwrap(), arg.unwrap(), memory, pc)?;
        self.regs.ac = op(self.regs.ac, v);
        self.regs.set_flags_from(self.regs.ac);
        Ok(())
    }

    fn unary_op(&mut self, op: fn(i32) -> i32) {
        self.regs.ac = op(self.regs.ac);
        self.regs.set_flags_from(self.regs.ac);
    }
}

/// The "value form" of an operand: what `ld`/the ALU opcodes actually read
/// (spec §4.5's fetch table). `Direct` and `Deref` both bottom out in a
/// single `memory[x]` fetch — the difference between them only shows up in
/// [`fetch_address`], which is what `st` and the branch family use.
fn fetch_value(mode: AddrMode, raw: i32, memory: &Memory, pc: u32) -> Result<i32, SimFault> {
    match mode {
        AddrMode::Value => Ok(raw),
        AddrMode::Direct | AddrMode::Deref => memory.read_word(raw as u32, pc),
        AddrMode::Deref2 => {
            let inner = memory.read_word(raw as u32, pc)?;
            memory.read_word(inner as u32, pc)
        }
    }
}

/// The "address form" of an operand: what `st` writes through and what the
/// branch family jumps to (spec §4.5). `Deref2` never reaches here — the
/// parser only allows it where a value, not an address, is wanted.
fn fetch_address(mode: AddrMode, raw: i32, memory: &Memory, pc: u32) -> Result<i32, SimFault> {
    match mode {
        AddrMode::Value | AddrMode::Direct => Ok(raw),
        AddrMode::Deref => memory.read_word(raw as u32, pc),
        AddrMode::Deref2 => unreachable!("st/jmp never accept deref2 (isa::Opcode::accepts_mode)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::translate;

    fn run_to_halt(src: &str) -> (Cpu, Memory) {
        let image = translate(src).unwrap();
        let mut memory = Memory::new(&image, crate::memory::DEFAULT_MEMORY_WORDS).unwrap();
        let mut ports = Ports::new();
        let mut cpu = Cpu::new(&image);
        loop {
            let (outcome, _) = cpu.step(&mut memory, &mut ports).unwrap();
            if outcome == StepOutcome::Halted {
                break;
            }
        }
        (cpu, memory)
    }

    #[test]
    fn ld_add_hlt_leaves_ac_correct() {
        let (cpu, _) = run_to_halt(".text\n_start: ld 2\nadd 3\nhlt\n");
        assert_eq!(cpu.regs.ac, 5);
        assert!(!cpu.regs.z);
        assert!(!cpu.regs.n);
    }

    #[test]
    fn st_then_ld_round_trips_through_memory() {
        let (cpu, _) = run_to_halt(".data\ncell: 0\n.text\n_start: ld 9\nst cell\nld cell\nhlt\n");
        assert_eq!(cpu.regs.ac, 9);
    }

    #[test]
    fn jz_is_taken_only_when_zero_flag_is_set() {
        let (cpu, _) = run_to_halt(
            ".text\n_start: ld 0\njz skip\nld 99\nskip: ld 1\nhlt\n",
        );
        assert_eq!(cpu.regs.ac, 1);
    }

    #[test]
    fn deref2_reads_through_two_hops() {
        // `ptr` is a scalar cell whose header word holds `value`'s own
        // address (ast::DataHeader::Label); `**ptr` then reads
        // memory[memory[ptr]] == memory[value] == 42.
        let (cpu, _) = run_to_halt(".data\nvalue: 42\nptr: value\n.text\n_start: ld **ptr\nhlt\n");
        assert_eq!(cpu.regs.ac, 42);
    }

    #[test]
    fn division_by_zero_halts_with_a_fault() {
        let image = translate(".text\n_start: ld 1\ndiv 0\nhlt\n").unwrap();
        let mut memory = Memory::new(&image, crate::memory::DEFAULT_MEMORY_WORDS).unwrap();
        let mut ports = Ports::new();
        let mut cpu = Cpu::new(&image);
        cpu.step(&mut memory, &mut ports).unwrap();
        let err = cpu.step(&mut memory, &mut ports).unwrap_err();
        assert!(matches!(err, SimFault::DivisionByZero { .. }));
    }

    #[test]
    fn unbound_jump_target_is_unknown_opcode_word() {
        let image = translate(".data\nx: 0\n.text\n_start: jmp x\nhlt\n").unwrap();
        let mut memory = Memory::new(&image, crate::memory::DEFAULT_MEMORY_WORDS).unwrap();
        let mut ports = Ports::new();
        let mut cpu = Cpu::new(&image);
        cpu.step(&mut memory, &mut ports).unwrap();
        let err = cpu.step(&mut memory, &mut ports).unwrap_err();
        assert!(matches!(err, SimFault::UnknownOpcodeWord { .. }));
    }
}
