//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `tokenizer` groups the raw text into logical source lines of tokens.
//! - `parser` owns all syntactic knowledge and builds the function AST,
//!   synthesizing constants for literal operands along the way.
//! - `analyser` resolves symbols and type-checks every statement.
//! - `collapser` renames every identifier into one flat global namespace.
//! - `generator` lowers the collapsed AST into Mano-machine assembly.
//! - `error` centralises the diagnostics shared by the other modules.
//!
//! Every pass owns its own state, so independent compilations can run in the
//! same process – sequentially or on separate threads – without interfering.

pub mod analyser;
pub mod ast;
pub mod collapser;
pub mod error;
pub mod generator;
pub mod parser;
pub mod tokenizer;

pub use error::{CompileError, CompileResult};

/// Compile a source string into a Mano-machine assembly listing.
pub fn compile(source: &str, optimize: bool) -> CompileResult<String> {
  let program = parser::parse(source)?;
  analyser::analyse(&program)?;
  let program = collapser::collapse(program);
  generator::generate(&program, optimize)
}
