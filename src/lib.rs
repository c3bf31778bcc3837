//! A tiny educational assembler and tick-accurate simulator (spec §1):
//! source text in, a machine-code [`Image`] out (`translate`); an image
//! and a schedule of port inputs in, byte outputs and a termination
//! [`Report`] out (`run`).

pub mod assembler;
pub mod cpu;
pub mod error;
pub mod image;
pub mod isa;
pub mod memory;
pub mod simulator;

pub use assembler::translate;
pub use error::Error;
pub use image::Image;
pub use simulator::{run, InputEvent, Report, Simulator, Termination};
