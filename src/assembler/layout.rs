//! Pass 1 (address assignment) and Pass 2 (operand resolution) of the
//! linker (spec §4.2).
//!
//! Emission order is prologue, then the `_start` block and everything
//! after it in source order, then whatever text preceded `_start` (spec §3
//! invariant: "instructions that precede `_start` in the source are
//! emitted *after* the `_start` block"), then all of `.data`.

use std::collections::HashMap;

use crate::assembler::ast::{DataHeader, DataValue, LineContent, OperandTarget, Program, SourceLine};
use crate::error::{AssembleError, Error};
use crate::image::{Image, Record, PROLOGUE_WORDS, VECTOR_SLOTS};

const VECTOR_NAMES: [&str; VECTOR_SLOTS] = [
    "int1", "int2", "int3", "int4", "int5", "int6", "int7", "int8",
];

struct Placed<'a> {
    index: usize,
    line: &'a SourceLine,
}

/// Reorders `.text` so `_start`'s block comes first, per spec §3.
fn emission_order(text: &[SourceLine]) -> Vec<&SourceLine> {
    let start_pos = text
        .iter()
        .position(|l| l.label.as_deref() == Some("_start"))
        .expect("parser guarantees _start is defined");
    text[start_pos..].iter().chain(text[..start_pos].iter()).collect()
}

fn data_value_words(values: &[DataValue]) -> usize {
    values
        .iter()
        .map(|v| match v {
            DataValue::Int(_) => 1,
            DataValue::Str(s) => s.chars().count(),
        })
        .sum()
}

/// Pass 1: walk the emission order, assigning each term a word address and
/// binding every label (spec §4.2 "Pass 1").
fn assign_addresses<'a>(
    program: &'a Program,
) -> Result<(HashMap<String, usize>, Vec<Placed<'a>>, Vec<Placed<'a>>), AssembleError> {
    let mut labels: HashMap<String, usize> = HashMap::new();
    let mut defined_at: HashMap<String, usize> = HashMap::new();
    let mut index = PROLOGUE_WORDS;

    let mut placed_text = Vec::new();
    for line in emission_order(&program.text) {
        if let Some(name) = &line.label {
            bind_label(&mut labels, &mut defined_at, name, index, line.line)?;
        }
        let width = match &line.content {
            LineContent::Empty => 0,
            LineContent::Instruction { .. } => 1,
            LineContent::Data { .. } => {
                unreachable!("parser never emits a Data line inside .text")
            }
        };
        if width > 0 {
            placed_text.push(Placed { index, line });
        }
        index += width;
    }

    let mut placed_data = Vec::new();
    for line in &program.data {
        if let Some(name) = &line.label {
            bind_label(&mut labels, &mut defined_at, name, index, line.line)?;
        }
        let width = match &line.content {
            LineContent::Empty => 0,
            LineContent::Data { values, .. } => 1 + data_value_words(values),
            LineContent::Instruction { .. } => {
                unreachable!("parser never emits an Instruction line inside .data")
            }
        };
        if width > 0 {
            placed_data.push(Placed { index, line });
        }
        index += width;
    }

    Ok((labels, placed_text, placed_data))
}

fn bind_label(
    labels: &mut HashMap<String, usize>,
    defined_at: &mut HashMap<String, usize>,
    name: &str,
    index: usize,
    line: usize,
) -> Result<(), AssembleError> {
    if let Some(&first_line) = defined_at.get(name) {
        return Err(AssembleError::DuplicateLabel {
            line,
            name: name.to_string(),
            first_line,
        });
    }
    labels.insert(name.to_string(), index);
    defined_at.insert(name.to_string(), line);
    Ok(())
}

/// Resolves an operand to the value the CPU will actually use. A literal
/// number passes through unchanged; a label resolves to the *byte* address
/// of its word (spec §4.4: PC and every memory access are byte addresses,
/// so `jmp _start` must land on 40, not on the word index 10).
fn resolve_target(
    labels: &HashMap<String, usize>,
    target: &OperandTarget,
) -> Result<i32, AssembleError> {
    match target {
        OperandTarget::Number(n) => Ok(*n as i32),
        OperandTarget::Name(name) => labels
            .get(name)
            .map(|&word_index| (word_index * 4) as i32)
            .ok_or_else(|| AssembleError::UndefinedLabel { name: name.clone() }),
    }
}

/// Resolves a data term's header word: a literal count passes through
/// unchanged; a label reference resolves to that label's byte address,
/// the same way an instruction operand's bare name does (`ast::DataHeader`
/// doc comment: this is how a scalar cell holds a pointer).
fn resolve_header(labels: &HashMap<String, usize>, header: &DataHeader) -> Result<i32, AssembleError> {
    match header {
        DataHeader::Int(n) => Ok(*n as i32),
        DataHeader::Label(name) => labels
            .get(name)
            .map(|&word_index| (word_index * 4) as i32)
            .ok_or_else(|| AssembleError::UndefinedLabel { name: name.clone() }),
    }
}

/// Runs both passes and produces the final image (spec §4.2, §4.3).
pub fn link(program: &Program) -> Result<Image, Error> {
    let (labels, placed_text, placed_data) = assign_addresses(program)?;

    let mut records = Vec::new();

    let mut vectors = [0i32; VECTOR_SLOTS];
    for (slot, name) in VECTOR_NAMES.iter().enumerate() {
        if let Some(&word_index) = labels.get(*name) {
            vectors[slot] = (word_index * 4) as i32;
        }
    }
    for (i, value) in vectors.into_iter().enumerate() {
        records.push(Record::Data {
            index: i,
            label: None,
            value,
            line: 0,
        });
    }
    for i in VECTOR_SLOTS..PROLOGUE_WORDS {
        records.push(Record::Data {
            index: i,
            label: None,
            value: 0,
            line: 0,
        });
    }

    for placed in &placed_text {
        let (opcode, operand) = match &placed.line.content {
            LineContent::Instruction { opcode, operand } => (*opcode, operand),
            _ => unreachable!(),
        };
        let (arg, mode) = match operand {
            Some(op) => (Some(resolve_target(&labels, &op.target)?), Some(op.mode)),
            None => (None, None),
        };
        records.push(Record::Instruction {
            index: placed.index,
            opcode,
            arg,
            mode,
            line: placed.line.line,
        });
    }

    for placed in &placed_data {
        let (size, values) = match &placed.line.content {
            LineContent::Data { size, values } => (size, values),
            _ => unreachable!(),
        };
        records.push(Record::Data {
            index: placed.index,
            label: placed.line.label.clone(),
            value: resolve_header(&labels, size)?,
            line: placed.line.line,
        });
        let mut word_index = placed.index + 1;
        for value in values {
            match value {
                DataValue::Int(n) => {
                    records.push(Record::Data {
                        index: word_index,
                        label: None,
                        value: *n as i32,
                        line: placed.line.line,
                    });
                    word_index += 1;
                }
                DataValue::Str(s) => {
                    for ch in s.chars() {
                        records.push(Record::Data {
                            index: word_index,
                            label: None,
                            value: ch as i32,
                            line: placed.line.line,
                        });
                        word_index += 1;
                    }
                }
            }
        }
    }

    Ok(Image { records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::parser::parse;

    #[test]
    fn prologue_is_ten_words_and_start_is_at_ten() {
        let program = parse(".text\n_start: hlt\n").unwrap();
        let image = link(&program).unwrap();
        assert_eq!(image.records[0].index(), 0);
        assert_eq!(image.records[PROLOGUE_WORDS].index(), PROLOGUE_WORDS);
        match &image.records[PROLOGUE_WORDS] {
            Record::Instruction { opcode, .. } => assert_eq!(*opcode, crate::isa::Opcode::Hlt),
            _ => panic!("expected instruction at _start"),
        }
    }

    #[test]
    fn pre_start_code_emitted_after_start_block() {
        let program = parse(".text\nhelper: nop\njmp _start\n_start: hlt\n").unwrap();
        let image = link(&program).unwrap();
        // _start (hlt) must land first, at word 10; the jmp/helper pair follow.
        match &image.records[PROLOGUE_WORDS] {
            Record::Instruction { opcode, .. } => assert_eq!(*opcode, crate::isa::Opcode::Hlt),
            _ => panic!(),
        }
    }

    #[test]
    fn vector_slots_fill_from_int_labels() {
        let program = parse(".text\nint1: nop\nfi\n_start: hlt\n").unwrap();
        let image = link(&program).unwrap();
        match &image.records[0] {
            Record::Data { value, .. } => assert!(*value != 0),
            _ => panic!(),
        }
        match &image.records[1] {
            Record::Data { value, .. } => assert_eq!(*value, 0),
            _ => panic!(),
        }
    }

    #[test]
    fn undefined_label_reference_is_an_error() {
        let program = parse(".text\n_start: ld missing\nhlt\n").unwrap();
        let err = link(&program).unwrap_err();
        assert!(matches!(
            err,
            Error::Assemble(AssembleError::UndefinedLabel { .. })
        ));
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let program = parse(".text\n_start: hlt\nfoo: nop\nfoo: nop\n").unwrap();
        let err = link(&program).unwrap_err();
        assert!(matches!(
            err,
            Error::Assemble(AssembleError::DuplicateLabel { .. })
        ));
    }

    #[test]
    fn data_label_binds_to_size_word() {
        let program =
            parse(".data\nmsg: 2, \"ab\"\n.text\n_start: ld msg\nhlt\n").unwrap();
        let image = link(&program).unwrap();
        let msg_addr = image
            .records
            .iter()
            .find_map(|r| match r {
                Record::Data {
                    index,
                    label: Some(l),
                    ..
                } if l == "msg" => Some(*index),
                _ => None,
            })
            .unwrap();
        match &image.records[PROLOGUE_WORDS] {
            Record::Instruction { arg, .. } => assert_eq!(arg.unwrap() as usize, msg_addr * 4),
            _ => panic!(),
        }
    }

    #[test]
    fn data_header_label_reference_resolves_to_the_targets_address() {
        let program = parse(".data\nptr: target\ntarget: 5\n.text\n_start: hlt\n").unwrap();
        let image = link(&program).unwrap();
        let target_addr = image
            .records
            .iter()
            .find_map(|r| match r {
                Record::Data { index, label: Some(l), .. } if l == "target" => Some(*index * 4),
                _ => None,
            })
            .unwrap();
        let ptr_value = image
            .records
            .iter()
            .find_map(|r| match r {
                Record::Data { label: Some(l), value, .. } if l == "ptr" => Some(*value),
                _ => None,
            })
            .unwrap();
        assert_eq!(ptr_value as usize, target_addr);
    }
}
