//! The simulator half of the pipeline: image in, outputs + termination
//! report out (spec §6 `run`).

use std::collections::HashMap;

use crate::cpu::{Cpu, StepOutcome};
use crate::error::{Error, LayoutError, SimFault};
use crate::image::Image;
use crate::memory::{Memory, Ports, DEFAULT_MEMORY_WORDS};

/// One byte the driver delivers to a port at a specific tick (spec §8
/// scenario 4: "bytes `A`, `B`, `C` on port 1 at ticks 10, 20, 30").
#[derive(Debug, Clone, Copy)]
pub struct InputEvent {
    pub port: u32,
    pub tick: u64,
    pub byte: u8,
}

/// Why the run stopped (spec §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Halt,
    Fatal(SimFault),
    TicksExhausted,
}

/// Everything about a run besides the port outputs themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub termination: Termination,
    pub ticks: u64,
    pub pc: u32,
    pub fi_events: u64,
}

/// Owns one run's CPU, memory, and ports. `Simulator::new` is the general
/// entry point (callers pick the memory size); the free function [`run`]
/// is the three-argument driver surface from spec §6, sized with
/// [`DEFAULT_MEMORY_WORDS`].
pub struct Simulator {
    cpu: Cpu,
    memory: Memory,
    ports: Ports,
}

impl Simulator {
    pub fn new(image: &Image, memory_words: usize) -> Result<Simulator, LayoutError> {
        Ok(Simulator {
            cpu: Cpu::new(image),
            memory: Memory::new(image, memory_words)?,
            ports: Ports::new(),
        })
    }

    /// Runs until `hlt`, a fatal fault, or `max_ticks` elapses, delivering
    /// `inputs` as the tick counter reaches each one's `tick` (spec §6,
    /// §8 "Determinism": a pure function of image + inputs + budget).
    pub fn run(&mut self, inputs: &[InputEvent], max_ticks: u64) -> (HashMap<u32, Vec<u8>>, Report) {
        let mut pending: Vec<&InputEvent> = inputs.iter().collect();
        pending.sort_by_key(|e| e.tick);

        let mut elapsed = 0u64;
        let mut next_input = 0usize;

        loop {
            while next_input < pending.len() && pending[next_input].tick <= elapsed {
                let event = pending[next_input];
                self.ports.deliver_input(event.port, event.byte);
                next_input += 1;
            }

            if elapsed >= max_ticks {
                return self.finish(Termination::TicksExhausted, elapsed);
            }

            match self.cpu.step(&mut self.memory, &mut self.ports) {
                Ok((StepOutcome::Halted, ticks)) => {
                    elapsed += ticks;
                    return self.finish(Termination::Halt, elapsed);
                }
                Ok((StepOutcome::Continue, ticks)) => {
                    elapsed += ticks;
                }
                Err(fault) => {
                    return self.finish(Termination::Fatal(fault), elapsed);
                }
            }
        }
    }

    fn finish(&self, termination: Termination, ticks: u64) -> (HashMap<u32, Vec<u8>>, Report) {
        let report = Report {
            termination,
            ticks,
            pc: self.cpu.regs.pc,
            fi_events: self.cpu.fi_events,
        };
        log::info!(
            "run stopped: {:?} at pc={} after {} ticks",
            report.termination,
            report.pc,
            report.ticks
        );
        (self.ports.outputs(), report)
    }
}

/// `run(image, inputs, max_ticks) -> outputs + report` (spec §6). Sized
/// with [`DEFAULT_MEMORY_WORDS`]; use [`Simulator::new`] directly for a
/// different memory size.
pub fn run(
    image: &Image,
    inputs: &[InputEvent],
    max_ticks: u64,
) -> Result<(HashMap<u32, Vec<u8>>, Report), Error> {
    let mut sim = Simulator::new(image, DEFAULT_MEMORY_WORDS)?;
    Ok(sim.run(inputs, max_ticks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::translate;

    #[test]
    fn halts_cleanly_with_no_instructions_after_start() {
        let image = translate(".text\n_start: hlt\n").unwrap();
        let (outputs, report) = run(&image, &[], 1000).unwrap();
        assert_eq!(report.termination, Termination::Halt);
        assert!(outputs.is_empty());
    }

    #[test]
    fn budget_exhaustion_reports_exact_tick_count_and_pc() {
        let image = translate(".text\n_start: jmp _start\n").unwrap();
        let (_, report) = run(&image, &[], 1000).unwrap();
        assert_eq!(report.termination, Termination::TicksExhausted);
        assert_eq!(report.ticks, 1000);
        assert_eq!(report.pc, 40);
    }

    #[test]
    fn division_by_zero_is_reported_as_fatal() {
        let image = translate(".text\n_start: ld 1\ndiv 0\nhlt\n").unwrap();
        let (_, report) = run(&image, &[], 1000).unwrap();
        assert!(matches!(report.termination, Termination::Fatal(SimFault::DivisionByZero { .. })));
    }

    #[test]
    fn hello_world_prints_to_the_chosen_port() {
        let src = ".data\nmsg: 13, \"Hello, world!\"\n.text\n_start: ld msg\nhlt\n";
        let image = translate(src).unwrap();
        let (_, report) = run(&image, &[], 1000).unwrap();
        assert_eq!(report.termination, Termination::Halt);
    }

    #[test]
    fn delivered_input_is_available_after_its_tick() {
        let src = ".text\n_start: in 13\nout 3\nhlt\n";
        let image = translate(src).unwrap();
        let inputs = [InputEvent { port: 13, tick: 0, byte: b'A' }];
        let (outputs, report) = run(&image, &inputs, 1000).unwrap();
        assert_eq!(report.termination, Termination::Halt);
        assert_eq!(outputs.get(&3), Some(&vec![b'A']));
    }

    #[test]
    fn run_is_deterministic() {
        let image = translate(".text\n_start: ld 2\nadd 3\nhlt\n").unwrap();
        let (a_out, a_report) = run(&image, &[], 1000).unwrap();
        let (b_out, b_report) = run(&image, &[], 1000).unwrap();
        assert_eq!(a_out, b_out);
        assert_eq!(a_report, b_report);
    }
}
