//! Groups lexed lines into a `.data`/`.text` [`Program`], rejecting every
//! grammar violation spec §4.1 names: unknown opcodes (delegated to
//! `isa::Opcode::from_mnemonic`), wrong operand arity, illegal labels, data
//! in `.text`, instructions in `.data`, and a missing `_start`.

use crate::assembler::ast::{
    DataHeader, DataValue, LineContent, Operand, OperandTarget, Program, SourceLine,
};
use crate::assembler::token::{LexedLine, Token};
use crate::error::AssembleError;
use crate::isa::{AddrMode, Arity, Opcode};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Data,
    Text,
}

pub fn parse(source: &str) -> Result<Program, AssembleError> {
    let lines = crate::assembler::lexer::lex(source)?;
    let mut program = Program::default();
    let mut section: Option<Section> = None;

    for lexed in &lines {
        let LexedLine { line, tokens } = lexed;
        let mut iter = tokens.iter().peekable();

        let label = match iter.peek() {
            Some(Token::Label(name)) => {
                let name = name.clone();
                iter.next();
                Some(validate_label_name(*line, name)?)
            }
            _ => None,
        };

        let rest: Vec<&Token> = iter.collect();

        if rest.is_empty() {
            push_line(&mut program, section, SourceLine {
                label,
                content: LineContent::Empty,
                line: *line,
            }, *line)?;
            continue;
        }

        if let Token::Ident(word) = rest[0] {
            if word == ".data" {
                section = Some(Section::Data);
                continue;
            }
            if word == ".text" {
                section = Some(Section::Text);
                continue;
            }
        }

        let section = section.ok_or(AssembleError::BadOperand {
            line: *line,
            text: "content before a .data/.text section directive".to_string(),
        })?;

        let content = match section {
            Section::Data => parse_data(*line, &rest)?,
            Section::Text => parse_instruction(*line, &rest)?,
        };

        push_line(&mut program, Some(section), SourceLine {
            label,
            content,
            line: *line,
        }, *line)?;
    }

    if !program.text.iter().any(|l| l.label.as_deref() == Some("_start")) {
        return Err(AssembleError::MissingStart);
    }

    Ok(program)
}

fn push_line(
    program: &mut Program,
    section: Option<Section>,
    line: SourceLine,
    line_no: usize,
) -> Result<(), AssembleError> {
    match section {
        Some(Section::Data) => program.data.push(line),
        Some(Section::Text) => program.text.push(line),
        None => {
            return Err(AssembleError::BadOperand {
                line: line_no,
                text: "content before a .data/.text section directive".to_string(),
            })
        }
    }
    Ok(())
}

fn validate_label_name(line: usize, name: String) -> Result<String, AssembleError> {
    let mut chars = name.chars();
    let first_ok = chars.next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if first_ok && rest_ok {
        Ok(name)
    } else {
        Err(AssembleError::BadLabelName { line, name })
    }
}

fn parse_data(line: usize, rest: &[&Token]) -> Result<LineContent, AssembleError> {
    let size = match rest.first() {
        Some(Token::Int(n)) => DataHeader::Int(*n),
        // A bare label reference standing alone as the whole line is a
        // pointer cell (`ptr: target`, see `ast::DataHeader`). An
        // identifier followed by anything that isn't a comma-separated
        // value list can't be valid data syntax, so it's almost certainly
        // an instruction mistakenly placed in `.data`.
        Some(Token::Ident(name)) if rest.len() == 1 => DataHeader::Label(name.clone()),
        Some(Token::Ident(_)) => return Err(AssembleError::InstructionInData { line }),
        _ => return Err(AssembleError::BadDataDefinition { line }),
    };

    let mut values = Vec::new();
    let mut i = 1;
    while i < rest.len() {
        match rest[i] {
            Token::Comma => i += 1,
            _ => return Err(AssembleError::BadDataDefinition { line }),
        }
        match rest.get(i) {
            Some(Token::Int(n)) => values.push(DataValue::Int(*n)),
            Some(Token::Str(s)) => values.push(DataValue::Str(s.clone())),
            _ => return Err(AssembleError::BadDataDefinition { line }),
        }
        i += 1;
    }

    Ok(LineContent::Data { size, values })
}

fn parse_instruction(line: usize, rest: &[&Token]) -> Result<LineContent, AssembleError> {
    let mnemonic = match rest[0] {
        Token::Ident(word) => word.clone(),
        _ => return Err(AssembleError::DataInText { line }),
    };
    let opcode = Opcode::from_mnemonic(line, &mnemonic.to_ascii_lowercase())?;

    let operand_tokens = &rest[1..];
    let operand = match opcode.arity() {
        Arity::None => {
            if !operand_tokens.is_empty() {
                return Err(AssembleError::WrongArity {
                    line,
                    mnemonic,
                    expected: 0,
                    found: 1,
                });
            }
            None
        }
        Arity::One => {
            if operand_tokens.is_empty() {
                return Err(AssembleError::WrongArity {
                    line,
                    mnemonic,
                    expected: 1,
                    found: 0,
                });
            }
            Some(parse_operand(line, &mnemonic, operand_tokens)?)
        }
    };

    if let Some(ref op) = operand {
        if !opcode.accepts_mode(op.mode) {
            return Err(AssembleError::IllegalAddressingMode {
                line,
                mnemonic,
                mode: op.mode.to_string(),
            });
        }
    }

    Ok(LineContent::Instruction { opcode, operand })
}

fn parse_operand(line: usize, mnemonic: &str, tokens: &[&Token]) -> Result<Operand, AssembleError> {
    let mut stars = 0usize;
    let mut i = 0;
    while i < tokens.len() && matches!(tokens[i], Token::Star) {
        stars += 1;
        i += 1;
    }

    let target = match tokens.get(i) {
        Some(Token::Int(n)) => OperandTarget::Number(*n),
        Some(Token::Ident(name)) => OperandTarget::Name(name.clone()),
        _ => {
            return Err(AssembleError::BadOperand {
                line,
                text: mnemonic.to_string(),
            })
        }
    };

    if i + 1 != tokens.len() {
        return Err(AssembleError::WrongArity {
            line,
            mnemonic: mnemonic.to_string(),
            expected: 1,
            found: 2,
        });
    }

    let mode = match stars {
        0 => match target {
            OperandTarget::Number(_) => AddrMode::Value,
            OperandTarget::Name(_) => AddrMode::Direct,
        },
        1 => AddrMode::Deref,
        2 => AddrMode::Deref2,
        _ => {
            return Err(AssembleError::BadOperand {
                line,
                text: format!("{}{}", "*".repeat(stars), mnemonic),
            })
        }
    };

    Ok(Operand { mode, target, line })
}
