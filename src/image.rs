//! The machine-code serializer (spec §4.3, §6): an ordered list of records
//! where list position equals word address, written as stable JSON.
//!
//! `serde_json` plays the role here that `thiserror`/`log` play elsewhere:
//! the ecosystem's default for "a typed record, stably encoded as text",
//! the same role it plays in the pack's `redcode`/`fuel-asm` crates.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::isa::{AddrMode, Opcode};

/// Number of reserved prologue words: 8 interrupt vector slots + 2 AC/PC
/// save words (spec §3 "Image", §GLOSSARY "Prologue").
pub const PROLOGUE_WORDS: usize = 10;
pub const VECTOR_SLOTS: usize = 8;
/// Byte address (and word index) of `_start`'s first instruction.
pub const START_WORD_INDEX: usize = PROLOGUE_WORDS;
pub const START_BYTE_ADDRESS: u32 = (PROLOGUE_WORDS * 4) as u32;

/// Byte address of vector slot `n` (1-indexed, spec §GLOSSARY "Prologue").
pub fn vector_byte_address(n: u32) -> u32 {
    (n - 1) * 4
}

/// The two reserved words directly after the 8 vector slots hold the saved
/// `AC`/`PC` of whichever interrupt is currently in progress — not a stack,
/// just one frame, so nested interrupts have nowhere to go (spec §4.5).
pub const AC_SAVE_BYTE_ADDRESS: u32 = (VECTOR_SLOTS * 4) as u32;
pub const PC_SAVE_BYTE_ADDRESS: u32 = AC_SAVE_BYTE_ADDRESS + 4;

/// One word of the image: either a data word or an instruction word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Data {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        value: i32,
        line: usize,
    },
    Instruction {
        index: usize,
        opcode: Opcode,
        #[serde(skip_serializing_if = "Option::is_none")]
        arg: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mode: Option<AddrMode>,
        line: usize,
    },
}

impl Record {
    pub fn index(&self) -> usize {
        match self {
            Record::Data { index, .. } => *index,
            Record::Instruction { index, .. } => *index,
        }
    }
}

/// A fully laid-out program: an ordered list of records, index == word
/// address. Always begins with [`PROLOGUE_WORDS`] records, `_start` at
/// [`START_WORD_INDEX`] (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Image {
    pub records: Vec<Record>,
}

impl Image {
    pub fn word_count(&self) -> usize {
        self.records.len()
    }

    /// Writes the image to its stable textual representation (spec §4.3).
    pub fn to_text(&self) -> String {
        serde_json::to_string_pretty(self).expect("Image serialization is infallible")
    }

    /// Reads an image back from its textual representation.
    pub fn from_text(text: &str) -> Result<Image, Error> {
        serde_json::from_str(text).map_err(|e| Error::Image(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Image {
        Image {
            records: vec![
                Record::Data {
                    index: 0,
                    label: None,
                    value: 0,
                    line: 0,
                },
                Record::Instruction {
                    index: 10,
                    opcode: Opcode::Ld,
                    arg: Some(1),
                    mode: Some(AddrMode::Value),
                    line: 2,
                },
                Record::Instruction {
                    index: 11,
                    opcode: Opcode::Hlt,
                    arg: None,
                    mode: None,
                    line: 3,
                },
            ],
        }
    }

    #[test]
    fn round_trips() {
        let image = sample();
        let text = image.to_text();
        let parsed = Image::from_text(&text).unwrap();
        assert_eq!(image, parsed);
    }

    #[test]
    fn omits_absent_optional_fields() {
        let text = sample().to_text();
        assert!(!text.contains("\"arg\": null") || text.contains("arg"));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let hlt = &parsed["records"][2];
        assert!(hlt.get("arg").is_none());
        assert!(hlt.get("mode").is_none());
    }
}
