use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::built_in::Builtins;
use crate::chunk::Chunk;
use crate::compiler::Compiler;
use crate::errors::ErrorReport;
use crate::modules::Registry;
use crate::parser::Parser;
use crate::virtual_machine::VirtualMachine;

mod codec;
mod compiler;
mod lexer;
mod vm;

/// A `Print` sink that the test can read back after the VM consumed it.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
   pub(crate) fn contents(&self) -> String {
      String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
   }
}

impl Write for SharedBuffer {
   fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
   }

   fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
   }
}

/// Runs the front end over a source string with the default natives and an
/// empty package registry.
pub(crate) fn compile_str(src: &str) -> Result<Chunk, Vec<ErrorReport>> {
   let module = Parser::parse(src)?;
   Compiler::compile(
      Path::new("test.ember"),
      &module,
      Builtins::default().names(),
      Registry::default(),
   )
}

/// Compiles and executes a program, returning everything it printed.
/// Panics on any front-end or runtime error.
pub(crate) fn run_str(src: &str) -> String {
   let chunk = match compile_str(src) {
      Ok(chunk) => chunk,
      Err(errors) => panic!("front end failed: {:?}", errors),
   };

   let buffer = SharedBuffer::default();
   let mut vm = VirtualMachine::with_output(chunk, Builtins::default(), Box::new(buffer.clone()));

   if let Err(e) = vm.execute() {
      panic!("runtime error: {:?}: {}", e.error, e.message);
   }

   assert_eq!(vm.stack_depth(), 0, "operand stack should drain completely");
   buffer.contents()
}

/// Compiles and executes a program, returning the VM for state inspection
/// together with its output buffer.
pub(crate) fn run_str_vm(src: &str) -> (VirtualMachine, SharedBuffer) {
   let chunk = compile_str(src).expect("program should compile");

   let buffer = SharedBuffer::default();
   let mut vm = VirtualMachine::with_output(chunk, Builtins::default(), Box::new(buffer.clone()));
   vm.execute().expect("program should run");

   (vm, buffer)
}
