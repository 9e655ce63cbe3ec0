use std::fs;
use std::path::PathBuf;

use crate::ast::*;
use crate::chunk::op_codes::OpCode;
use crate::compiler::Compiler;
use crate::modules::ModuleResolution;
use crate::parser::Parser;
use crate::values::{FuncValue, UserFunc, Value};

impl Compiler {
   /// Compiles a variable declaration: the initializer (or null), a store
   /// into the declared slot, and a pop to keep the statement neutral.
   pub(super) fn compile_variable_decl(&mut self, decl: &VariableDeclNode) {
      match &decl.value {
         Some(value) => self.compile_expression(value),
         None => self.emit_constant(Value::Null, decl.pos),
      }

      if let Some(slot) = self.declare_variable(&decl.name, decl.is_mutable, decl.pos) {
         self.emit_op(OpCode::StoreVar, decl.pos);
         self.emit_short(slot, decl.pos);
         self.emit_op(OpCode::Pop, decl.pos);
      }
   }

   pub(super) fn compile_block(&mut self, block: &BlockNode) {
      for statement in &block.statements {
         if self.had_error {
            return;
         }

         self.compile_node(statement);
      }
   }

   /// Compiles an if statement:
   ///
   /// ```text
   /// <condition>  JumpIfFalse ELSE  <body>  JumpForward END
   /// ELSE: <else body?>  END:
   /// ```
   pub(super) fn compile_if_statement(&mut self, stmt: &IfNode) {
      self.compile_expression(&stmt.condition);

      let else_jump = self.emit_jump(OpCode::JumpIfFalse, stmt.pos);
      self.compile_node(&stmt.body);

      let end_jump = self.emit_jump(OpCode::JumpForward, stmt.pos);
      self.patch_jump(else_jump, stmt.pos);

      if let Some(else_body) = &stmt.else_body {
         self.compile_node(else_body);
      }

      self.patch_jump(end_jump, stmt.pos);
   }

   pub(super) fn compile_while_loop(&mut self, stmt: &WhileNode) {
      let loop_start = self.chunk.len();

      self.compile_expression(&stmt.condition);
      let end_jump = self.emit_jump(OpCode::JumpIfFalse, stmt.pos);

      self.compile_node(&stmt.body);
      self.emit_loop(loop_start, stmt.pos);

      self.patch_jump(end_jump, stmt.pos);
   }

   /// Compiles a C-style for loop. A missing condition counts as `true`;
   /// the increment's value is discarded each iteration.
   pub(super) fn compile_for_loop(&mut self, stmt: &ForNode) {
      if let Some(initializer) = &stmt.initializer {
         self.compile_node(initializer);
      }

      let loop_start = self.chunk.len();

      match &stmt.condition {
         Some(condition) => self.compile_expression(condition),
         None => self.emit_constant(Value::Bool(true), stmt.pos),
      }
      let end_jump = self.emit_jump(OpCode::JumpIfFalse, stmt.pos);

      self.compile_node(&stmt.body);

      if let Some(increment) = &stmt.increment {
         self.compile_expression(increment);
         self.emit_op(OpCode::Pop, stmt.pos);
      }

      self.emit_loop(loop_start, stmt.pos);
      self.patch_jump(end_jump, stmt.pos);
   }

   /// Compiles a naked iterator statement.
   ///
   /// The range form lowers to the equivalent for loop with an inclusive
   /// upper bound and unit increment. The array and variable forms evaluate
   /// the collection once, fetch its iteration sequence through the
   /// `iter_items` runtime helper (arrays yield their values, objects their
   /// keys), and drive an integer counter over the sequence.
   pub(super) fn compile_naked_iterator(&mut self, stmt: &NakedIteratorNode) {
      let pos = stmt.pos;

      let loop_var = match self.iterator_variable(&stmt.variable, pos) {
         Some(slot) => slot,
         None => return,
      };

      if let AstNode::Range(range) = stmt.iterable.as_ref() {
         // i = start
         self.compile_expression(&range.start);
         self.emit_op(OpCode::StoreVar, pos);
         self.emit_short(loop_var, pos);
         self.emit_op(OpCode::Pop, pos);

         // while (i <= end)
         let loop_start = self.chunk.len();
         self.emit_op(OpCode::LoadVar, pos);
         self.emit_short(loop_var, pos);
         self.compile_expression(&range.end);
         self.emit_op(OpCode::LessThanEq, pos);
         let end_jump = self.emit_jump(OpCode::JumpIfFalse, pos);

         self.compile_node(&stmt.body);

         // i = i + 1
         self.emit_op(OpCode::LoadVar, pos);
         self.emit_short(loop_var, pos);
         self.emit_constant(Value::Number(1.0), pos);
         self.emit_op(OpCode::Add, pos);
         self.emit_op(OpCode::StoreVar, pos);
         self.emit_short(loop_var, pos);
         self.emit_op(OpCode::Pop, pos);

         self.emit_loop(loop_start, pos);
         self.patch_jump(end_jump, pos);
         return;
      }

      // seq = iter_items(collection)
      let seq_name = self.hidden_name("iter_seq");
      let seq = match self.resolve_variable(&seq_name, pos) {
         Some(slot) => slot,
         None => return,
      };
      self.compile_builtin_helper_call("iter_items", &stmt.iterable, pos);
      self.emit_op(OpCode::StoreVar, pos);
      self.emit_short(seq, pos);
      self.emit_op(OpCode::Pop, pos);

      // n = len(seq)
      let len_name = self.hidden_name("iter_len");
      let len = match self.resolve_variable(&len_name, pos) {
         Some(slot) => slot,
         None => return,
      };
      let callee = match self.add_constant(
         Value::Function(FuncValue::Builtin(String::from("len"))),
         pos,
      ) {
         Some(idx) => idx,
         None => return,
      };
      self.emit_op(OpCode::LoadVar, pos);
      self.emit_short(seq, pos);
      self.emit_op(OpCode::FuncCall, pos);
      self.emit_byte(callee, pos);
      self.emit_byte(1, pos);
      self.emit_op(OpCode::StoreVar, pos);
      self.emit_short(len, pos);
      self.emit_op(OpCode::Pop, pos);

      // i = 0
      let idx_name = self.hidden_name("iter_idx");
      let idx = match self.resolve_variable(&idx_name, pos) {
         Some(slot) => slot,
         None => return,
      };
      self.emit_constant(Value::Number(0.0), pos);
      self.emit_op(OpCode::StoreVar, pos);
      self.emit_short(idx, pos);
      self.emit_op(OpCode::Pop, pos);

      // while (i < n)
      let loop_start = self.chunk.len();
      self.emit_op(OpCode::LoadVar, pos);
      self.emit_short(idx, pos);
      self.emit_op(OpCode::LoadVar, pos);
      self.emit_short(len, pos);
      self.emit_op(OpCode::LessThan, pos);
      let end_jump = self.emit_jump(OpCode::JumpIfFalse, pos);

      // loop_var = seq[i]
      self.emit_op(OpCode::LoadVar, pos);
      self.emit_short(seq, pos);
      self.emit_op(OpCode::LoadVar, pos);
      self.emit_short(idx, pos);
      self.emit_op(OpCode::Subscript, pos);
      self.emit_op(OpCode::StoreVar, pos);
      self.emit_short(loop_var, pos);
      self.emit_op(OpCode::Pop, pos);

      self.compile_node(&stmt.body);

      // i = i + 1
      self.emit_op(OpCode::LoadVar, pos);
      self.emit_short(idx, pos);
      self.emit_constant(Value::Number(1.0), pos);
      self.emit_op(OpCode::Add, pos);
      self.emit_op(OpCode::StoreVar, pos);
      self.emit_short(idx, pos);
      self.emit_op(OpCode::Pop, pos);

      self.emit_loop(loop_start, pos);
      self.patch_jump(end_jump, pos);
   }

   /// Resolves the loop variable of a naked iterator. An existing mutable
   /// binding is reused; a fresh name is allocated on first use.
   fn iterator_variable(&mut self, name: &str, pos: (usize, usize)) -> Option<u16> {
      let flags = self.symbols.lookup(name).map(|s| (s.is_function, s.is_mutable));

      match flags {
         Some((true, _)) => {
            self.error_at(pos, &format!("'{}' is already defined as a function.", name));
            None
         }
         Some((false, false)) => {
            self.error_at(
               pos,
               &format!("Cannot use immutable variable '{}' as a loop variable.", name),
            );
            None
         }
         _ => self.resolve_variable(name, pos),
      }
   }

   /// Emits a call to a one-argument builtin helper with the given
   /// argument expression.
   fn compile_builtin_helper_call(&mut self, name: &str, arg: &AstNode, pos: (usize, usize)) {
      let callee = match self.add_constant(
         Value::Function(FuncValue::Builtin(name.to_string())),
         pos,
      ) {
         Some(idx) => idx,
         None => return,
      };

      self.compile_expression(arg);
      self.emit_op(OpCode::FuncCall, pos);
      self.emit_byte(callee, pos);
      self.emit_byte(1, pos);
   }

   /// Compiles a switch statement by lowering it to an equality chain over
   /// the discriminant.
   pub(super) fn compile_switch(&mut self, stmt: &SwitchNode) {
      let pos = stmt.pos;

      let disc_name = self.hidden_name("switch");
      let disc = match self.resolve_variable(&disc_name, pos) {
         Some(slot) => slot,
         None => return,
      };

      self.compile_expression(&stmt.discriminant);
      self.emit_op(OpCode::StoreVar, pos);
      self.emit_short(disc, pos);
      self.emit_op(OpCode::Pop, pos);

      let mut end_jumps: Vec<usize> = vec![];

      for case in &stmt.cases {
         let case_pos = case.value.pos();

         self.emit_op(OpCode::LoadVar, case_pos);
         self.emit_short(disc, case_pos);
         self.compile_expression(&case.value);
         self.emit_op(OpCode::Equals, case_pos);

         let next_jump = self.emit_jump(OpCode::JumpIfFalse, case_pos);
         self.compile_node(&case.body);
         end_jumps.push(self.emit_jump(OpCode::JumpForward, case_pos));

         self.patch_jump(next_jump, case_pos);
      }

      if let Some(default_case) = &stmt.default_case {
         self.compile_node(default_case);
      }

      for site in end_jumps {
         self.patch_jump(site, pos);
      }
   }

   /// Compiles a named function definition. The body is emitted inline
   /// behind a skip jump, and the entry point is recorded as a `Number`
   /// constant whose pool index the symbol table maps the name to.
   pub(super) fn compile_function_def(&mut self, func: &FunctionDefNode) {
      let shadows_variable = self
         .symbols
         .lookup(&func.name)
         .map(|s| !s.is_function)
         .unwrap_or(false);

      if shadows_variable {
         self.error_at(
            func.pos,
            &format!("'{}' is already declared as a variable.", func.name),
         );
         return;
      }

      let skip_jump = self.emit_jump(OpCode::JumpForward, func.pos);
      let entry_ip = self.chunk.len();

      let shadows = self.symbols.begin_function_scope(&func.params);
      self.compile_node(&func.body);
      self.symbols.end_function_scope(shadows);

      self.emit_op(OpCode::Return, func.pos);
      self.patch_jump(skip_jump, func.pos);

      if let Some(const_idx) = self.add_constant(Value::Number(entry_ip as f64), func.pos) {
         self.symbols.define_function(&func.name, const_idx as u16);
      }
   }

   /// Compiles a function body for an anonymous function expression and
   /// returns the function value describing it. The receiver of a method
   /// call binds to `this`, which maps to the slot after the last
   /// parameter.
   pub(super) fn compile_function_body(
      &mut self,
      func: &FunctionDefNode,
      bind_this: bool,
   ) -> Option<Value> {
      let skip_jump = self.emit_jump(OpCode::JumpForward, func.pos);
      let entry_ip = self.chunk.len();

      let mut scope_names = func.params.clone();
      if bind_this {
         scope_names.push(String::from("this"));
      }

      let shadows = self.symbols.begin_function_scope(&scope_names);
      self.compile_node(&func.body);
      self.symbols.end_function_scope(shadows);

      self.emit_op(OpCode::Return, func.pos);
      self.patch_jump(skip_jump, func.pos);

      if self.had_error {
         return None;
      }

      Some(Value::Function(FuncValue::User(UserFunc {
         name: func.name.clone(),
         params: func.params.clone(),
         entry_ip: Some(entry_ip),
      })))
   }

   /// Compiles an import statement. A path ending in `.ember` is a local
   /// file include: the file is parsed and compiled into the current chunk
   /// and symbol table. Any other path is a module reference resolved
   /// against the installed-package registry; it emits no code.
   pub(super) fn compile_import(&mut self, import: &ImportNode) {
      if import.path.ends_with(".ember") {
         self.compile_local_import(import);
         return;
      }

      match self.registry.resolve(&import.path) {
         ModuleResolution::Installed => {
            println!("[import] Found installed module '{}'.", import.path);
         }
         ModuleResolution::NotInstalled => {
            self.error_at(
               import.pos,
               &format!("Module '{}' is not installed.", import.path),
            );
         }
      }
   }

   fn compile_local_import(&mut self, import: &ImportNode) {
      let base_dir = self
         .filepath
         .parent()
         .map(|p| p.to_path_buf())
         .unwrap_or_else(|| PathBuf::from("."));
      let target = base_dir.join(&import.path);

      if self.imports_in_progress.contains(&target) {
         self.error_at(
            import.pos,
            &format!("Circular import of '{}'.", import.path),
         );
         return;
      }

      let source = match fs::read_to_string(&target) {
         Ok(src) => src,
         Err(_) => {
            self.error_at(
               import.pos,
               &format!("Could not open local import file '{}'.", import.path),
            );
            return;
         }
      };

      let module = match Parser::parse(&source) {
         Ok(ast) => ast,
         Err(errors) => {
            self.errors.extend(errors);
            self.had_error = true;
            self.error_at(import.pos, &format!("Could not parse '{}'.", import.path));
            return;
         }
      };

      // The imported statements land in this chunk and symbol table; only
      // the top-level compile emits the end-of-chunk sentinel, so there is
      // no trailing sentinel to strip.
      self.imports_in_progress.push(target.clone());
      let saved_filepath = std::mem::replace(&mut self.filepath, target);

      for node in &module.body {
         if self.had_error {
            break;
         }

         self.compile_node(node);
      }

      self.filepath = saved_filepath;
      self.imports_in_progress.pop();
   }
}
