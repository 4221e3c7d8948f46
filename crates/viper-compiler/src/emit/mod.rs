//! C emission: the data-driven writer over the instruction IR.

mod writer;

#[cfg(test)]
mod writer_tests;

pub use writer::{EmitError, write_c_program};
