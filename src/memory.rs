//! Byte-addressed linear memory with a 32-bit word view, and the port
//! table used for memory-mapped I/O (spec §4.6).

use crate::error::{LayoutError, SimFault};
use crate::image::{Image, Record};

/// Default size of the configurable data region appended after the image
/// (spec §4.6 "a configurable data region"), in 32-bit words.
pub const DEFAULT_MEMORY_WORDS: usize = 4096;

/// Byte-addressed memory. Word accesses must be 4-byte aligned relative to
/// word boundaries (misaligned access is fatal, spec §4.6).
#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Loads `image` into a byte array sized to the image rounded up to
    /// `total_words`, whichever is larger (spec §4.6). Returns a
    /// [`LayoutError`] if the caller asked for fewer words than the image
    /// itself needs.
    pub fn new(image: &Image, total_words: usize) -> Result<Memory, LayoutError> {
        let required = image.word_count();
        if total_words < required {
            return Err(LayoutError::ImageExceedsMemory {
                required,
                available: total_words,
            });
        }
        let mut bytes = vec![0u8; total_words * 4];
        // Instruction words are fetched from the image's own records (see
        // `simulator::Program`), not decoded from these bytes — self-modifying
        // code is out of scope (spec §1), so an instruction's memory cell
        // never needs to hold a meaningful bit pattern. Data words are the
        // only ones whose byte contents matter here.
        for record in &image.records {
            if let Record::Data { value, .. } = record {
                let addr = record.index() * 4;
                bytes[addr..addr + 4].copy_from_slice(&value.to_le_bytes());
            }
        }
        log::debug!(
            "loaded image: {} words into {} words of memory",
            required,
            total_words
        );
        Ok(Memory { bytes })
    }

    pub fn len_words(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn read_word(&self, byte_addr: u32, pc: u32) -> Result<i32, SimFault> {
        self.check_word_access(byte_addr, pc)?;
        let a = byte_addr as usize;
        Ok(i32::from_le_bytes(self.bytes[a..a + 4].try_into().unwrap()))
    }

    pub fn write_word(&mut self, byte_addr: u32, value: i32, pc: u32) -> Result<(), SimFault> {
        self.check_word_access(byte_addr, pc)?;
        let a = byte_addr as usize;
        self.bytes[a..a + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn check_word_access(&self, byte_addr: u32, pc: u32) -> Result<(), SimFault> {
        if byte_addr % 4 != 0 {
            return Err(SimFault::MisalignedAccess {
                pc,
                address: byte_addr,
                line: None,
            });
        }
        if byte_addr as usize + 4 > self.bytes.len() {
            return Err(SimFault::MemoryOutOfRange {
                pc,
                address: byte_addr,
                line: None,
            });
        }
        Ok(())
    }
}

/// One port's independent input/output byte queues and its interrupt
/// request line (spec §4.6, §9 "port queues ... a mapping from port id to
/// two byte sequences plus an IRQ bit").
#[derive(Debug, Clone, Default)]
struct Port {
    input: std::collections::VecDeque<u8>,
    output: Vec<u8>,
    irq: bool,
}

/// The port table: lazily-materialized per-port FIFOs (spec §6 "other port
/// numbers are unreserved but legal").
#[derive(Debug, Clone, Default)]
pub struct Ports {
    ports: std::collections::HashMap<u32, Port>,
}

impl Ports {
    pub fn new() -> Ports {
        Ports::default()
    }

    /// The driver delivers an input byte to `port`, asserting its IRQ line
    /// (spec §4.6, §4.5 "asynchronous port-driven requests").
    pub fn deliver_input(&mut self, port: u32, byte: u8) {
        let p = self.ports.entry(port).or_default();
        p.input.push_back(byte);
        p.irq = true;
    }

    /// `in p`: dequeue one byte, fatally underflowing on an empty queue
    /// (spec §4.6 "(b) returns immediately with a fatal underflow").
    pub fn take_input(&mut self, port: u32, pc: u32) -> Result<u8, SimFault> {
        let p = self.ports.entry(port).or_default();
        let byte = p.input.pop_front().ok_or(SimFault::PortUnderflow {
            pc,
            port,
            line: None,
        })?;
        if p.input.is_empty() {
            p.irq = false;
        }
        Ok(byte)
    }

    /// `out p`: enqueue a byte to the output stream, in program order.
    pub fn push_output(&mut self, port: u32, byte: u8) {
        self.ports.entry(port).or_default().output.push(byte);
    }

    /// Whether `port`'s request line is asserted with a byte still waiting
    /// (spec §4.5 "asynchronous port-driven requests").
    pub fn pending(&self, port: u32) -> bool {
        self.ports
            .get(&port)
            .map(|p| p.irq && !p.input.is_empty())
            .unwrap_or(false)
    }

    pub fn output_bytes(&self, port: u32) -> &[u8] {
        self.ports.get(&port).map(|p| p.output.as_slice()).unwrap_or(&[])
    }

    pub fn outputs(&self) -> std::collections::HashMap<u32, Vec<u8>> {
        self.ports
            .iter()
            .filter(|(_, p)| !p.output.is_empty())
            .map(|(&port, p)| (port, p.output.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::translate;

    #[test]
    fn rejects_image_larger_than_requested_memory() {
        let image = translate(".text\n_start: hlt\n").unwrap();
        let err = Memory::new(&image, 1).unwrap_err();
        assert!(matches!(err, LayoutError::ImageExceedsMemory { .. }));
    }

    #[test]
    fn misaligned_access_is_fatal() {
        let image = translate(".text\n_start: hlt\n").unwrap();
        let mem = Memory::new(&image, DEFAULT_MEMORY_WORDS).unwrap();
        let err = mem.read_word(41, 40).unwrap_err();
        assert!(matches!(err, SimFault::MisalignedAccess { .. }));
    }

    #[test]
    fn out_of_range_access_is_fatal() {
        let image = translate(".text\n_start: hlt\n").unwrap();
        let mem = Memory::new(&image, 4).unwrap();
        let err = mem.read_word(4 * 4 + 40, 40).unwrap_err();
        assert!(matches!(err, SimFault::MemoryOutOfRange { .. }));
    }
}
