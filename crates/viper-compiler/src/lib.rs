#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Viper compiler: indentation-based typed source to standalone C.
//!
//! The pipeline, in order:
//! - `lexer` - logos scanner plus the indentation layout pass
//! - `parser` - recursive descent into the flat expression AST, resolving
//!   scopes and symbols as it goes
//! - `analyze` - symbol tables, the scope stack, the type checker, and the
//!   object model
//! - `compile` - the lowering engine: statements and expressions to the
//!   linear instruction IR
//! - `emit` - the C writer over the IR
//! - `diagnostics` - located fatal errors and their rendering

pub mod analyze;
pub mod compile;
pub mod diagnostics;
pub mod emit;
pub mod ir;
pub mod lexer;
pub mod op;
pub mod parser;
pub mod pool;

pub use compile::{Lowered, compile};
pub use diagnostics::{CompileError, ErrorKind, ErrorPrinter};
pub use emit::{EmitError, write_c_program};
pub use parser::{Parsed, parse};

use viper_core::SourceFile;

/// Errors that can escape the full pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Internal defect: lowering produced something the writer rejects.
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Parse and lower one source file.
pub fn compile_source(source: &SourceFile) -> Result<Lowered, CompileError> {
    let parsed = parse(source)?;
    compile(parsed, source)
}

/// Parse, lower, and emit one source file as a C translation unit.
pub fn compile_to_c(source: &SourceFile) -> Result<String, Error> {
    let lowered = compile_source(source)?;
    Ok(write_c_program(&lowered)?)
}
