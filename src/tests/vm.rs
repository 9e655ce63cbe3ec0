use std::fs;
use std::path::Path;

use crate::ast::*;
use crate::built_in::Builtins;
use crate::chunk::op_codes::OpCode;
use crate::chunk::Chunk;
use crate::compiler::Compiler;
use crate::errors::RuntimeErrorType;
use crate::modules::Registry;
use crate::tests::{run_str, run_str_vm, SharedBuffer};
use crate::values::{ObjectValue, Value};
use crate::virtual_machine::VirtualMachine;

fn run_err(src: &str) -> RuntimeErrorType {
   let chunk = super::compile_str(src).expect("program should compile");
   let mut vm = VirtualMachine::with_output(
      chunk,
      Builtins::default(),
      Box::new(SharedBuffer::default()),
   );

   match vm.execute() {
      Ok(()) => panic!("expected a runtime error"),
      Err(e) => e.error,
   }
}

#[test]
fn arithmetic_prints_its_result() {
   assert_eq!(run_str("print(1 + 2 * 3)\n"), "7\n");
}

#[test]
fn nested_property_assignment_writes_through() {
   let src = "obj: {a: {b: 1}}\nobj.a.b = 42\nprint(obj.a.b)\n";
   assert_eq!(run_str(src), "42\n");
}

#[test]
fn mixins_apply_before_own_properties() {
   let src = "base: {greet: \"hi\", name: \"base\"}\n\
              child: {:[base], name: \"child\"}\n\
              print(child.greet)\nprint(child.name)\n";
   assert_eq!(run_str(src), "hi\nchild\n");
}

#[test]
fn mixin_without_overrides_keeps_source_properties() {
   let src = "a: {p: 1}\nb: {:[a]}\nprint(b.p)\n";
   assert_eq!(run_str(src), "1\n");
}

#[test]
fn mixin_override_wins() {
   let src = "a: {p: 1}\nb: {:[a], p: 2}\nprint(b.p)\n";
   assert_eq!(run_str(src), "2\n");
}

#[test]
fn range_iteration_accumulates() {
   let src = "sum: 0\ni: 1..5\n    sum = sum + i\nprint(sum)\n";
   assert_eq!(run_str(src), "15\n");
}

#[test]
fn string_concatenation_coerces_numbers() {
   assert_eq!(run_str("print(\"n=\" + 3)\n"), "n=3\n");
}

#[test]
fn concatenation_coerces_booleans_and_null() {
   assert_eq!(run_str("print(\"v=\" + true)\n"), "v=true\n");
   assert_eq!(run_str("print(null + \"!\")\n"), "null!\n");
}

#[test]
fn whole_numbers_print_without_a_fraction() {
   assert_eq!(run_str("print(6 / 2)\n"), "3\n");
   assert_eq!(run_str("print(7 / 2)\n"), "3.5\n");
}

#[test]
fn while_loop_counts() {
   let src = "i: 0\nwhile (i < 3) { i = i + 1 }\nprint(i)\n";
   assert_eq!(run_str(src), "3\n");
}

#[test]
fn for_loop_prints_each_value() {
   let src = "for (var i = 0; i < 3; i = i + 1) { print(i) }\n";
   assert_eq!(run_str(src), "0\n1\n2\n");
}

#[test]
fn naked_iteration_over_array_literal_yields_values() {
   let src = "x: [10, 20, 30]\n    print(x)\n";
   assert_eq!(run_str(src), "10\n20\n30\n");
}

#[test]
fn naked_iteration_over_object_yields_keys_in_order() {
   let src = "o: {b: 1, a: 2, c: 3}\no.a = 9\nk: o\n    print(k)\n";
   // Overwriting `a` must not move it.
   assert_eq!(run_str(src), "b\na\nc\n");
}

#[test]
fn array_indexing_reads_elements() {
   let src = "items: [1, \"two\", true]\nprint(items[1])\n";
   assert_eq!(run_str(src), "two\n");
}

#[test]
fn function_call_binds_parameters() {
   let src = "shout: fn(word, times) {\n  i: 1..2\n      print(word + times)\n}\nshout(\"go\", 2)\n";
   assert_eq!(run_str(src), "go2\ngo2\n");
}

#[test]
fn function_calls_nest() {
   let src = "inner: fn(n) { print(n) }\nouter: fn(n) { inner(n + 1) }\nouter(1)\n";
   assert_eq!(run_str(src), "2\n");
}

#[test]
fn method_call_binds_this() {
   let src = "counter: {n: 5, show: fn() { print(this.n) }}\ncounter.show()\n";
   assert_eq!(run_str(src), "5\n");
}

#[test]
fn method_call_receives_arguments() {
   let src = "greeter: {greet: fn(name) { print(\"hi \" + name) }}\ngreeter.greet(\"bob\")\n";
   assert_eq!(run_str(src), "hi bob\n");
}

#[test]
fn short_circuit_skips_the_right_side() {
   let src = "calls: 0\nbump: fn() { calls = calls + 1 }\n\
              a: false && bump()\nprint(calls)\n\
              b: true && bump()\nprint(calls)\n\
              c: true || bump()\nprint(calls)\n\
              d: false || bump()\nprint(calls)\n";
   assert_eq!(run_str(src), "0\n1\n1\n2\n");
}

#[test]
fn short_circuit_keeps_the_deciding_value() {
   let src = "x: 0 && 5\nprint(x)\ny: 2 && 5\nprint(y)\nz: 0 || 7\nprint(z)\nw: 3 || 7\nprint(w)\n";
   assert_eq!(run_str(src), "0\n5\n7\n3\n");
}

#[test]
fn truthiness_follows_the_falsey_set() {
   let src = "if (\"\")\n    print(\"empty\")\nelse\n    print(\"falsy\")\n\
              if (\"x\")\n    print(\"truthy\")\nelse\n    print(\"no\")\n";
   assert_eq!(run_str(src), "falsy\ntruthy\n");
}

#[test]
fn equality_never_crosses_kinds() {
   let src = "print(1 == \"1\")\nprint(null == null)\nprint(\"a\" == \"a\")\nprint(1 == 1)\n";
   assert_eq!(run_str(src), "false\ntrue\ntrue\ntrue\n");
}

#[test]
fn objects_compare_by_identity() {
   let src = "a: {x: 1}\nb: {x: 1}\nprint(a == b)\nprint([1] == [1])\n";
   assert_eq!(run_str(src), "false\nfalse\n");
}

#[test]
fn copies_never_alias() {
   let src = "a: {x: 1}\nb: a\nb.x = 2\nprint(a.x)\nprint(b.x)\n";
   assert_eq!(run_str(src), "1\n2\n");
}

#[test]
fn missing_property_reads_as_null() {
   assert_eq!(run_str("o: {a: 1}\nprint(o.b)\n"), "null\n");
}

#[test]
fn builtin_len_and_keys() {
   let src = "o: {a: 1, b: 2}\nprint(len(o))\nprint(len(\"abcd\"))\nprint(keys(o))\n";
   assert_eq!(run_str(src), "2\n4\n[a, b]\n");
}

#[test]
fn builtin_type_of_and_to_string() {
   let src = "print(type_of(1))\nprint(type_of(\"s\"))\nprint(to_string(12) + \"!\")\n";
   assert_eq!(run_str(src), "Number\nString\n12!\n");
}

#[test]
fn division_by_zero_is_a_runtime_error() {
   assert_eq!(run_err("print(1 / 0)\n"), RuntimeErrorType::ZeroDivision);
}

#[test]
fn modulus_by_zero_is_a_runtime_error() {
   assert_eq!(run_err("print(1 % 0)\n"), RuntimeErrorType::ZeroDivision);
}

#[test]
fn index_out_of_bounds_is_a_runtime_error() {
   assert_eq!(run_err("a: [1]\nprint(a[3])\n"), RuntimeErrorType::IndexError);
}

#[test]
fn comparing_non_numbers_is_a_type_error() {
   assert_eq!(run_err("print(\"a\" < 1)\n"), RuntimeErrorType::TypeError);
}

#[test]
fn subtraction_of_strings_is_a_type_error() {
   assert_eq!(run_err("print(\"a\" - \"b\")\n"), RuntimeErrorType::TypeError);
}

#[test]
fn stack_underflow_is_detected_not_masked() {
   // Hand-built chunk: a lone Pop with nothing on the stack.
   let mut chunk = Chunk::new();
   chunk.push_op_code(OpCode::Pop, (1, 1));
   chunk.push_op_code(OpCode::EndVirtualMachine, (1, 1));

   let mut vm = VirtualMachine::with_output(
      chunk,
      Builtins::default(),
      Box::new(SharedBuffer::default()),
   );

   let e = vm.execute().expect_err("underflow must be reported");
   assert_eq!(e.error, RuntimeErrorType::StackUnderflow);
   assert_eq!(e.instruction, Some(OpCode::Pop));
   assert_eq!(e.offset, 0);
}

#[test]
fn unknown_opcode_is_reported_with_its_offset() {
   let mut chunk = Chunk::new();
   chunk.push_op_code(OpCode::NoOp, (1, 1));
   chunk.push_byte(0xEE, (1, 2));

   let mut vm = VirtualMachine::with_output(
      chunk,
      Builtins::default(),
      Box::new(SharedBuffer::default()),
   );

   let e = vm.execute().expect_err("unknown opcode must be reported");
   assert_eq!(e.error, RuntimeErrorType::UnknownOpCode);
   assert_eq!(e.offset, 1);
}

#[test]
fn globals_hold_deep_copies() {
   let (vm, _) = run_str_vm("a: {x: 1}\nb: a\n");

   assert!(vm.frames_stack().is_empty());

   let a = vm.get_global(0).unwrap().clone();
   let b = vm.get_global(1).unwrap().clone();

   assert_eq!(a, b);

   // Mutating one copy must not be visible through the other.
   let mut b_obj = match b {
      Value::Object(obj) => obj,
      other => panic!("expected an object, got {:?}", other),
   };
   b_obj.insert(String::from("x"), Value::Number(99.0));

   match a {
      Value::Object(a_obj) => assert_eq!(a_obj.get("x"), Some(&Value::Number(1.0))),
      other => panic!("expected an object, got {:?}", other),
   }
}

#[test]
fn object_value_preserves_insertion_order() {
   let mut obj = ObjectValue::new();
   obj.insert(String::from("b"), Value::Number(1.0));
   obj.insert(String::from("a"), Value::Number(2.0));
   obj.insert(String::from("b"), Value::Number(3.0));

   let keys: Vec<&str> = obj.keys().collect();
   assert_eq!(keys, vec!["b", "a"]);
   assert_eq!(obj.get("b"), Some(&Value::Number(3.0)));
}

fn number_literal(n: f64) -> AstNode {
   AstNode::Literal(LiteralNode {
      value: Value::Number(n),
      pos: (1, 1),
   })
}

fn print_number(n: f64) -> AstNode {
   AstNode::FunctionCall(FunctionCallNode {
      name: String::from("print"),
      args: vec![number_literal(n)],
      pos: (1, 1),
   })
}

#[test]
fn switch_lowers_to_an_equality_chain() {
   // The surface grammar has no switch keyword; the node is built through
   // the AST API and lowered by the compiler.
   let switch = AstNode::Switch(SwitchNode {
      discriminant: Box::new(number_literal(2.0)),
      cases: vec![
         SwitchCase {
            value: number_literal(1.0),
            body: print_number(10.0),
         },
         SwitchCase {
            value: number_literal(2.0),
            body: print_number(20.0),
         },
      ],
      default_case: Some(Box::new(print_number(30.0))),
      pos: (1, 1),
   });

   let module = ModuleNode { body: vec![switch] };
   let chunk = Compiler::compile(
      Path::new("test.ember"),
      &module,
      Builtins::default().names(),
      Registry::default(),
   )
   .unwrap();

   let buffer = SharedBuffer::default();
   let mut vm = VirtualMachine::with_output(chunk, Builtins::default(), Box::new(buffer.clone()));
   vm.execute().unwrap();

   assert_eq!(buffer.contents(), "20\n");
}

#[test]
fn switch_falls_through_to_the_default() {
   let switch = AstNode::Switch(SwitchNode {
      discriminant: Box::new(number_literal(9.0)),
      cases: vec![SwitchCase {
         value: number_literal(1.0),
         body: print_number(10.0),
      }],
      default_case: Some(Box::new(print_number(30.0))),
      pos: (1, 1),
   });

   let module = ModuleNode { body: vec![switch] };
   let chunk = Compiler::compile(
      Path::new("test.ember"),
      &module,
      Builtins::default().names(),
      Registry::default(),
   )
   .unwrap();

   let buffer = SharedBuffer::default();
   let mut vm = VirtualMachine::with_output(chunk, Builtins::default(), Box::new(buffer.clone()));
   vm.execute().unwrap();

   assert_eq!(buffer.contents(), "30\n");
}

#[test]
fn subscript_assign_updates_arrays_in_place() {
   // The compiler never emits SubscriptAssign (index targets are not
   // assignable syntax), but embedders may; exercise it directly.
   let mut chunk = Chunk::new();
   let arr = chunk
      .add_constant(Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]))
      .unwrap();
   let zero = chunk.add_constant(Value::Number(0.0)).unwrap();
   let nine = chunk.add_constant(Value::Number(9.0)).unwrap();

   for (op, operand) in [
      (OpCode::LoadConstant, Some(arr)),
      (OpCode::LoadConstant, Some(zero)),
      (OpCode::LoadConstant, Some(nine)),
      (OpCode::SubscriptAssign, None),
      (OpCode::Print, None),
      (OpCode::Pop, None),
      (OpCode::EndVirtualMachine, None),
   ] {
      chunk.push_op_code(op, (1, 1));
      if let Some(operand) = operand {
         chunk.push_byte(operand, (1, 1));
      }
   }

   let buffer = SharedBuffer::default();
   let mut vm = VirtualMachine::with_output(chunk, Builtins::default(), Box::new(buffer.clone()));
   vm.execute().unwrap();

   assert_eq!(buffer.contents(), "[9, 2]\n");
}

#[test]
fn local_imports_compile_into_the_main_chunk() {
   let dir = tempfile::tempdir().unwrap();

   let lib = dir.path().join("lib.ember");
   fs::write(&lib, "greeting: \"hello\"\n").unwrap();

   let main = dir.path().join("main.ember");
   fs::write(&main, "import lib.ember\nprint(greeting)\n").unwrap();

   let source = fs::read_to_string(&main).unwrap();
   let chunk = match crate::compile_source(&main, &source) {
      Ok(chunk) => chunk,
      Err(crate::FrontEndError::Parse(e)) | Err(crate::FrontEndError::Compile(e)) => {
         panic!("front end failed: {:?}", e)
      }
   };

   let buffer = SharedBuffer::default();
   let mut vm = VirtualMachine::with_output(chunk, Builtins::default(), Box::new(buffer.clone()));
   vm.execute().unwrap();

   assert_eq!(buffer.contents(), "hello\n");
}

#[test]
fn circular_imports_are_a_compile_error() {
   let dir = tempfile::tempdir().unwrap();

   let a = dir.path().join("a.ember");
   let b = dir.path().join("b.ember");
   fs::write(&a, "import b.ember\n").unwrap();
   fs::write(&b, "import a.ember\n").unwrap();

   let source = fs::read_to_string(&a).unwrap();
   assert!(crate::compile_source(&a, &source).is_err());
}

#[test]
fn compiled_scripts_execute_after_reload() {
   // compile -> serialize -> deserialize -> run, the `run` subcommand path.
   let chunk = super::compile_str("x: 4\nprint(x * 2)\n").unwrap();
   let bytes = crate::chunk::codec::serialize(&chunk).unwrap();
   let restored = crate::chunk::codec::deserialize(&bytes).unwrap();

   let buffer = SharedBuffer::default();
   let mut vm = VirtualMachine::with_output(restored, Builtins::default(), Box::new(buffer.clone()));
   vm.execute().unwrap();

   assert_eq!(buffer.contents(), "8\n");
}
