// Crate-level modules
pub mod ast;
pub mod built_in;
pub mod chunk;
pub mod compiler;
pub mod errors;
pub mod lexer;
pub mod modules;
pub mod parser;
pub mod values;
pub mod virtual_machine;

#[cfg(test)]
mod tests;

use std::path::Path;

use crate::built_in::Builtins;
use crate::chunk::Chunk;
use crate::compiler::Compiler;
use crate::errors::ErrorReport;
use crate::modules::Registry;
use crate::parser::Parser;

/// The maximum call-frame depth before the VM reports a recursion error.
pub const FRAMES_MAX: usize = 256;

/// The types of results the interpreter can return.
pub enum InterpretResult {
   CompileError,
   Ok,
   ParseError,
   RuntimeError,
}

/// The stage at which a source-to-chunk translation failed.
pub enum FrontEndError {
   Parse(Vec<ErrorReport>),
   Compile(Vec<ErrorReport>),
}

/// Translates Ember source text into a bytecode chunk, running the full
/// front end: lexing, parsing, and compilation.
///
/// # Parameters
/// - `filepath`: The path of the source file, used to resolve local imports.
/// - `source`: The program's source text.
///
/// # Returns
/// - `Ok(Chunk)`: The compiled chunk for the program.
/// - `Err(FrontEndError)`: The diagnostics of the stage that failed.
pub fn compile_source(filepath: &Path, source: &str) -> Result<Chunk, FrontEndError> {
   let module = match Parser::parse(source) {
      Ok(ast) => ast,
      Err(errors) => return Err(FrontEndError::Parse(errors)),
   };

   let registry = Registry::load_default();
   let natives = Builtins::default();

   Compiler::compile(filepath, &module, natives.names(), registry).map_err(FrontEndError::Compile)
}
