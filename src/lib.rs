#![deny(nonstandard_style)]
#![warn(rust_2018_idioms)]

//! Whole-program compiler for the Mica language.
//!
//! The compilation pipeline is:
//!
//!   source text
//!     -> lexer        (tokens)
//!     -> parser       (syntax tree)
//!     -> type checker (tree annotated in place)
//!     -> code gen     (C99 or textual IR)
//!
//! Each phase is a [`pipeline::Stage`] exchanging data through a shared
//! [`pipeline::Context`], and the whole run is orchestrated by a
//! [`pipeline::Pipeline`] that wraps every stage in the installed
//! middleware stack. [`compiler::compile`] is the high-level entry
//! point; the `mica` binary is a thin wrapper over it.

pub mod compiler;
pub mod emit;
pub mod pipeline;
pub mod sem;
pub mod syntax;

pub use compiler::{compile, Compilation, CompileOptions, CompilerError};
pub use emit::{CodegenConfig, Target};
pub use pipeline::{FaultTolerance, Pipeline, PipelineOutcome};
