use std::path::{Path, PathBuf};

use hashbrown::HashSet;

use crate::ast::{AstNode, ModuleNode};
use crate::chunk::op_codes::OpCode;
use crate::chunk::Chunk;
use crate::errors::ErrorReport;
use crate::modules::Registry;
use crate::values::Value;

// Submodules
mod expressions;
mod statements;
pub mod symbols;

use symbols::{DeclareError, SymbolTable};

/// Represents the bytecode compiler and its internal state. The compiler
/// walks an AST once, emitting instructions into a single chunk and
/// resolving names through the symbol table.
pub struct Compiler {
   /// The path of the file being compiled. Local imports resolve relative
   /// to its parent directory.
   filepath: PathBuf,
   /// The chunk under construction.
   chunk: Chunk,
   /// The symbol table used to resolve variable and function names.
   symbols: SymbolTable,
   /// The names of the registered built-in functions.
   builtin_names: HashSet<String>,
   /// The installed-module registry consulted for non-local imports.
   registry: Registry,
   /// Local files currently being imported, for cycle detection.
   imports_in_progress: Vec<PathBuf>,
   /// A counter for compiler-generated variable names.
   hidden_counter: usize,
   /// The list of reported errors generated while compiling.
   errors: Vec<ErrorReport>,
   had_error: bool,
}

impl Compiler {
   /// Compiles an Abstract Syntax Tree into a bytecode chunk.
   ///
   /// # Parameters
   /// - `filepath`: The path of the program's source file.
   /// - `module`: The root node of the program's AST.
   /// - `builtin_names`: The names of the natives registered with the VM.
   /// - `registry`: The installed-module registry for import resolution.
   ///
   /// # Returns
   /// - `Ok(Chunk)`: The compiled chunk.
   /// - `Err(Vec<ErrorReport>)`: A list of compile errors.
   pub fn compile(
      filepath: &Path,
      module: &ModuleNode,
      builtin_names: HashSet<String>,
      registry: Registry,
   ) -> Result<Chunk, Vec<ErrorReport>> {
      let mut compiler = Compiler {
         filepath: filepath.to_path_buf(),
         chunk: Chunk::new(),
         symbols: SymbolTable::new(),
         builtin_names,
         registry,
         imports_in_progress: vec![],
         hidden_counter: 0,
         errors: vec![],
         had_error: false,
      };

      for node in &module.body {
         if compiler.had_error {
            break;
         }

         compiler.compile_node(node);
      }

      compiler.emit_op(OpCode::EndVirtualMachine, (0, 0));

      if compiler.had_error {
         Err(compiler.errors)
      } else {
         Ok(compiler.chunk)
      }
   }

   /// Compiles an AST node in statement position. Expression-shaped nodes
   /// get an explicit `Pop` so that every statement leaves the stack depth
   /// unchanged.
   pub(super) fn compile_node(&mut self, node: &AstNode) {
      match node {
         AstNode::VariableDecl(decl) => self.compile_variable_decl(decl),
         AstNode::If(stmt) => self.compile_if_statement(stmt),
         AstNode::While(stmt) => self.compile_while_loop(stmt),
         AstNode::For(stmt) => self.compile_for_loop(stmt),
         AstNode::NakedIterator(stmt) => self.compile_naked_iterator(stmt),
         AstNode::Switch(stmt) => self.compile_switch(stmt),
         AstNode::Block(block) => self.compile_block(block),
         AstNode::FunctionDef(func) => self.compile_function_def(func),
         AstNode::Import(import) => self.compile_import(import),

         // Expression statements.
         _ => {
            let pos = node.pos();
            self.compile_expression(node);
            self.emit_op(OpCode::Pop, pos);
         }
      }
   }

   /// Emits an opcode into the chunk's instruction stream.
   ///
   /// # Returns
   /// `usize`: The position of the emitted opcode in the chunk.
   pub(super) fn emit_op(&mut self, op: OpCode, pos: (usize, usize)) -> usize {
      self.chunk.push_op_code(op, pos);
      self.chunk.len() - 1
   }

   pub(super) fn emit_byte(&mut self, byte: u8, pos: (usize, usize)) {
      self.chunk.push_byte(byte, pos);
   }

   pub(super) fn emit_short(&mut self, value: u16, pos: (usize, usize)) {
      self.chunk.push_short(value, pos);
   }

   /// Emits a jump instruction with a placeholder offset, to be patched
   /// with [`Compiler::patch_jump`] once the target is known.
   ///
   /// # Returns
   /// `usize`: The position of the first placeholder byte.
   pub(super) fn emit_jump(&mut self, op: OpCode, pos: (usize, usize)) -> usize {
      self.emit_op(op, pos);
      self.emit_short(0xffff, pos);
      self.chunk.len() - 2
   }

   /// Patches the offset of a forward jump so it lands at the current end of
   /// the chunk.
   ///
   /// # Parameters
   /// - `site`: The position of the jump's first placeholder byte.
   pub(super) fn patch_jump(&mut self, site: usize, pos: (usize, usize)) {
      let distance = self.chunk.len() - site - 2;

      let jump = match u16::try_from(distance) {
         Ok(j) => j,
         Err(_) => {
            self.error_at(pos, "Too much code to jump over.");
            return;
         }
      };

      let bytes = jump.to_be_bytes();
      self.chunk.patch(site, bytes[0]);
      self.chunk.patch(site + 1, bytes[1]);
   }

   /// Emits a backward loop jump targeting `loop_start`.
   pub(super) fn emit_loop(&mut self, loop_start: usize, pos: (usize, usize)) {
      self.emit_op(OpCode::LoopJump, pos);

      // The offset counts from the end of this instruction's operands back
      // to the start of the loop.
      let distance = self.chunk.len() + 2 - loop_start;

      match u16::try_from(distance) {
         Ok(offset) => self.emit_short(offset, pos),
         Err(_) => {
            self.error_at(pos, "Loop body is too large.");
            self.emit_short(0, pos);
         }
      }
   }

   /// Adds a constant to the chunk's pool, reporting an error if the pool
   /// is full.
   pub(super) fn add_constant(&mut self, value: Value, pos: (usize, usize)) -> Option<u8> {
      match self.chunk.add_constant(value) {
         Ok(idx) => Some(idx),
         Err(()) => {
            self.error_at(pos, "Too many constants in one chunk.");
            None
         }
      }
   }

   /// Adds a constant and emits a `LoadConstant` instruction for it.
   pub(super) fn emit_constant(&mut self, value: Value, pos: (usize, usize)) {
      if let Some(idx) = self.add_constant(value, pos) {
         self.emit_op(OpCode::LoadConstant, pos);
         self.emit_byte(idx, pos);
      }
   }

   /// Resolves a variable name to its slot, reporting declaration errors.
   pub(super) fn resolve_variable(&mut self, name: &str, pos: (usize, usize)) -> Option<u16> {
      match self.symbols.get_or_add(name, false) {
         Ok(slot) => Some(slot),
         Err(_) => {
            self.error_at(pos, "Too many variables in the program.");
            None
         }
      }
   }

   pub(super) fn declare_variable(
      &mut self,
      name: &str,
      is_mutable: bool,
      pos: (usize, usize),
   ) -> Option<u16> {
      match self.symbols.declare_variable(name, is_mutable) {
         Ok(slot) => Some(slot),
         Err(DeclareError::Redeclaration) => {
            self.error_at(pos, &format!("Variable '{}' has already been declared.", name));
            None
         }
         Err(DeclareError::FunctionCollision) => {
            self.error_at(pos, &format!("'{}' is already defined as a function.", name));
            None
         }
         Err(DeclareError::TooManyVariables) => {
            self.error_at(pos, "Too many variables in the program.");
            None
         }
      }
   }

   /// Generates a fresh compiler-internal variable name.
   pub(super) fn hidden_name(&mut self, stem: &str) -> String {
      let name = format!("__{}_{}", stem, self.hidden_counter);
      self.hidden_counter += 1;
      name
   }

   /// Emits a compile error at the given source position.
   pub(super) fn error_at(&mut self, pos: (usize, usize), message: &str) {
      let msg = format!(
         "\x1b[31;1mCompileError\x1b[0m\x1b[1m at [{}:{}]: {}\x1b[0m",
         pos.0, pos.1, message
      );

      self.errors.push(ErrorReport {
         line: pos.0,
         column: pos.1,
         lexeme_len: 1,
         message: msg,
      });
      self.had_error = true;
   }
}
