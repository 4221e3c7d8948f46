#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures shared across the viper compiler.
//!
//! Three pieces live here:
//! - `interner` - identifier interning (`Name` handles)
//! - `source` - byte spans and the per-file line index
//! - `runtime` - the fixed C ABI of the linked runtime library

mod interner;
pub mod runtime;
mod source;

#[cfg(test)]
mod interner_tests;
#[cfg(test)]
mod source_tests;

pub use interner::{Interner, Name};
pub use runtime as abi;
pub use source::{LineCol, SourceFile, Span};
