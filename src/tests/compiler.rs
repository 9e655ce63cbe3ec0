use std::path::Path;

use proptest::prelude::*;

use crate::built_in::Builtins;
use crate::chunk::op_codes::OpCode;
use crate::chunk::Chunk;
use crate::compiler::symbols::{DeclareError, SymbolTable};
use crate::compiler::Compiler;
use crate::modules::{PackageEntry, Registry};
use crate::parser::Parser;
use crate::tests::{compile_str, SharedBuffer};
use crate::virtual_machine::VirtualMachine;

fn compile_error_message(src: &str) -> String {
   match compile_str(src) {
      Ok(_) => panic!("expected a compile error"),
      Err(errors) => errors
         .iter()
         .map(|e| e.message.clone())
         .collect::<Vec<_>>()
         .join("\n"),
   }
}

#[test]
fn assigning_to_let_fails_at_compile_time() {
   let message = compile_error_message("let x: 1\nx = 2\n");

   assert!(message.contains('x'));
   assert!(message.to_lowercase().contains("immutable"));
}

#[test]
fn assigning_to_var_compiles() {
   assert!(compile_str("var x: 1\nx = 2\n").is_ok());
}

#[test]
fn redeclaring_a_variable_fails() {
   let message = compile_error_message("var x: 1\nvar x: 2\n");
   assert!(message.contains("already been declared"));
}

#[test]
fn declaring_over_a_function_fails() {
   let message = compile_error_message("f: fn() { print(1) }\nvar f: 2\n");
   assert!(message.contains("function"));
}

#[test]
fn calling_an_unknown_function_fails() {
   let message = compile_error_message("nope(1)\n");
   assert!(message.contains("Unknown function"));
}

#[test]
fn calling_a_builtin_compiles() {
   assert!(compile_str("print(len(\"abc\"))\n").is_ok());
}

#[test]
fn range_outside_an_iterator_is_rejected() {
   let message = compile_error_message("x: 1..3\n");
   assert!(message.contains("range"));
}

#[test]
fn unresolved_module_import_fails() {
   let message = compile_error_message("import ember/net\n");
   assert!(message.contains("not installed"));
}

#[test]
fn installed_module_import_emits_no_code() {
   let registry = Registry::from_entries(vec![PackageEntry {
      name: "ember/net".to_string(),
      version: "1.0.0".to_string(),
   }]);

   let module = Parser::parse("import ember/net\n").unwrap();
   let chunk = Compiler::compile(
      Path::new("test.ember"),
      &module,
      Builtins::default().names(),
      registry,
   )
   .unwrap();

   // The import contributes nothing beyond the end sentinel.
   assert_eq!(chunk.len(), 1);
   assert_eq!(chunk.get_op_code(0), Some(OpCode::EndVirtualMachine));
}

#[test]
fn symbol_table_tracks_mutability_and_slots() {
   let mut table = SymbolTable::new();

   let a = table.declare_variable("a", true).unwrap();
   let b = table.declare_variable("b", false).unwrap();
   assert_eq!(a, 0);
   assert_eq!(b, 1);

   assert!(table.is_mutable("a"));
   assert!(!table.is_mutable("b"));
   assert!(!table.is_mutable("missing"));

   // Resolving an existing name returns its slot, not a new one.
   assert_eq!(table.get_or_add("a", false).unwrap(), 0);

   assert_eq!(table.declare_variable("a", true), Err(DeclareError::Redeclaration));

   table.define_function("f", 9);
   assert!(!table.is_mutable("f"));
   assert_eq!(table.declare_variable("f", true), Err(DeclareError::FunctionCollision));
}

#[test]
fn parameters_shadow_outer_names_for_the_scope() {
   let mut table = SymbolTable::new();
   table.declare_variable("x", true).unwrap();

   let shadows = table.begin_function_scope(&[String::from("x"), String::from("y")]);
   assert_eq!(table.lookup("x").unwrap().slot, 256);
   assert_eq!(table.lookup("y").unwrap().slot, 257);

   table.end_function_scope(shadows);
   assert_eq!(table.lookup("x").unwrap().slot, 0);
   assert!(table.lookup("y").is_none());
}

#[test]
fn constant_pool_deduplicates_scalars() {
   let src = "8.9;".repeat(100);
   let chunk = compile_str(&src).unwrap();

   assert_eq!(chunk.get_pool_size(), 1);
}

#[test]
fn repeated_string_literals_share_one_pool_entry() {
   let chunk = compile_str("a: \"text\"\nb: \"text\"\n").unwrap();
   assert_eq!(chunk.get_pool_size(), 1);
}

/// Walks a chunk and returns the valid instruction-start offsets, with the
/// end of the code as a final boundary.
fn instruction_boundaries(chunk: &Chunk) -> Vec<usize> {
   let mut boundaries = vec![];
   let mut i = 0;

   while i < chunk.len() {
      boundaries.push(i);
      let op = chunk.get_op_code(i).expect("compiler emits only known opcodes");
      i += 1 + op.operand_width();
   }

   boundaries.push(chunk.len());
   boundaries
}

/// Checks the jump-arithmetic invariant over a compiled chunk: every
/// forward jump site P encodes `target - (P + 2)` for an in-bounds
/// instruction boundary, and every loop jump lands on a boundary behind
/// itself.
fn assert_jumps_well_formed(chunk: &Chunk) {
   let boundaries = instruction_boundaries(chunk);

   for &at in &boundaries {
      if at >= chunk.len() {
         continue;
      }

      match chunk.get_op_code(at).unwrap() {
         OpCode::JumpForward | OpCode::JumpIfFalse => {
            let offset = chunk.get_short(at + 1) as usize;
            let target = at + 3 + offset;
            assert!(
               boundaries.contains(&target),
               "forward jump at {} targets non-boundary {}",
               at,
               target
            );
         }
         OpCode::LoopJump => {
            let offset = chunk.get_short(at + 1) as usize;
            assert!(offset <= at + 3, "loop jump at {} escapes the chunk", at);
            let target = at + 3 - offset;
            assert!(
               boundaries.contains(&target),
               "loop jump at {} targets non-boundary {}",
               at,
               target
            );
         }
         _ => {}
      }
   }
}

#[test]
fn if_else_jumps_land_on_boundaries() {
   let chunk = compile_str("if (1 < 2) { print(1) } else { print(2) }\n").unwrap();
   assert_jumps_well_formed(&chunk);
}

#[test]
fn loops_jump_back_to_their_condition() {
   let chunk = compile_str("i: 0\nwhile (i < 3) { i = i + 1 }\n").unwrap();
   assert_jumps_well_formed(&chunk);
}

#[test]
fn function_definitions_skip_their_bodies() {
   let chunk = compile_str("f: fn(a) { print(a) }\nf(1)\n").unwrap();
   assert_jumps_well_formed(&chunk);
}

#[test]
fn short_circuit_operators_compile_to_jumps() {
   let chunk = compile_str("x: 1\ny: x && 2\nz: x || 3\n").unwrap();
   assert_jumps_well_formed(&chunk);
}

// A small statement generator for structural properties. `if` templates
// nest; each statement holds at most one `for` so loop counters can be
// renamed apart per statement.
fn statement_strategy() -> impl Strategy<Value = String> {
   let leaf = prop_oneof![
      (0..100i64).prop_map(|n| format!("print({})", n)),
      (0..100i64, 0..100i64).prop_map(|(a, b)| format!("print({} + {})", a, b)),
      (0..100i64).prop_map(|n| format!("{} * 2;", n)),
      Just("print(\"s\" + 1)".to_string()),
   ];

   let nested_ifs = leaf.prop_recursive(3, 12, 2, |inner| {
      (inner.clone(), inner, any::<bool>()).prop_map(|(a, b, c)| {
         format!("if ({}) {{ {} }} else {{ {} }}", c, a, b)
      })
   });

   prop_oneof![
      nested_ifs.clone(),
      (nested_ifs, 0..4i64)
         .prop_map(|(body, n)| format!("for (var q = 0; q < {}; q = q + 1) {{ {} }}", n, body)),
   ]
}

proptest! {
   /// Compiler stack discipline: a statement compiled from an empty stack
   /// leaves the stack depth unchanged, so any generated statement list
   /// executes down to an empty operand stack.
   #[test]
   fn statements_leave_the_stack_balanced(
      statements in proptest::collection::vec(statement_strategy(), 1..6)
   ) {
      let mut src = String::new();

      for (i, stmt) in statements.iter().enumerate() {
         // Rename each statement's loop counter so statements never collide.
         let stmt = stmt
            .replace("var q", &format!("var q{}", i))
            .replace("q <", &format!("q{} <", i))
            .replace("q = q + 1", &format!("q{0} = q{0} + 1", i));

         src.push_str(&stmt);
         src.push('\n');
      }

      let chunk = match compile_str(&src) {
         Ok(chunk) => chunk,
         Err(errors) => return Err(TestCaseError::fail(format!("compile failed: {:?}", errors))),
      };

      assert_jumps_well_formed(&chunk);

      let buffer = SharedBuffer::default();
      let mut vm = VirtualMachine::with_output(chunk, Builtins::default(), Box::new(buffer.clone()));

      prop_assert!(vm.execute().is_ok());
      prop_assert_eq!(vm.stack_depth(), 0);
   }

   /// Jump arithmetic over generated nestings of indented if statements.
   #[test]
   fn generated_nesting_produces_well_formed_jumps(depth in 1usize..6) {
      let mut src = String::new();
      for d in 0..depth {
         src.push_str(&"    ".repeat(d));
         src.push_str(&format!("if ({} < {})\n", d, d + 1));
      }
      src.push_str(&"    ".repeat(depth));
      src.push_str("print(0)\n");

      let chunk = compile_str(&src).unwrap();
      assert_jumps_well_formed(&chunk);
   }
}
