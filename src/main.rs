use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ember::built_in::Builtins;
use ember::chunk::codec;
use ember::errors::{report_errors_list, report_runtime_error};
use ember::virtual_machine::VirtualMachine;
use ember::{compile_source, FrontEndError, InterpretResult};

#[derive(Parser)]
#[command(name = "ember", about = "The Ember scripting language", version)]
struct Cli {
   #[command(subcommand)]
   command: Command,
}

#[derive(Subcommand)]
enum Command {
   /// Compile a .ember source file into a .embc chunk file.
   Compile {
      /// The source file to compile.
      input: PathBuf,
      /// The output path. Defaults to `a.embc`.
      #[arg(short, long)]
      output: Option<PathBuf>,
      /// Print the disassembled chunk after compiling.
      #[arg(long)]
      dis: bool,
   },
   /// Load a compiled .embc chunk file and execute it.
   Run {
      /// The chunk file to execute.
      input: PathBuf,
   },
   /// Compile a .ember source file in memory and execute it.
   Exec {
      /// The source file to execute.
      input: PathBuf,
   },
}

fn main() -> ExitCode {
   let cli = Cli::parse();

   let result = match cli.command {
      Command::Compile { input, output, dis } => compile_command(&input, output, dis),
      Command::Run { input } => run_command(&input),
      Command::Exec { input } => exec_command(&input),
   };

   // All failures collapse to a single non-zero status.
   match result {
      InterpretResult::Ok => ExitCode::SUCCESS,
      _ => ExitCode::FAILURE,
   }
}

fn read_source(input: &Path) -> Option<String> {
   match fs::read_to_string(input) {
      Ok(source) => Some(source),
      Err(e) => {
         eprintln!("Could not read '{}': {}", input.display(), e);
         None
      }
   }
}

/// Runs the front end over a source file, reporting diagnostics on failure.
fn front_end(input: &Path, source: &str) -> Result<ember::chunk::Chunk, InterpretResult> {
   match compile_source(input, source) {
      Ok(chunk) => Ok(chunk),
      Err(FrontEndError::Parse(errors)) => {
         report_errors_list(input, &errors, source);
         Err(InterpretResult::ParseError)
      }
      Err(FrontEndError::Compile(errors)) => {
         report_errors_list(input, &errors, source);
         Err(InterpretResult::CompileError)
      }
   }
}

fn compile_command(input: &Path, output: Option<PathBuf>, dis: bool) -> InterpretResult {
   let source = match read_source(input) {
      Some(source) => source,
      None => return InterpretResult::CompileError,
   };

   let chunk = match front_end(input, &source) {
      Ok(chunk) => chunk,
      Err(result) => return result,
   };

   if dis {
      chunk.disassemble(&input.display().to_string());
   }

   let output = output.unwrap_or_else(|| PathBuf::from("a.embc"));

   match codec::write_chunk_file(&output, &chunk) {
      Ok(()) => InterpretResult::Ok,
      Err(e) => {
         eprintln!("Could not write '{}': {}", output.display(), e);
         InterpretResult::CompileError
      }
   }
}

fn run_command(input: &Path) -> InterpretResult {
   let chunk = match codec::read_chunk_file(input) {
      Ok(chunk) => chunk,
      Err(e) => {
         eprintln!("Could not load '{}': {}", input.display(), e);
         return InterpretResult::RuntimeError;
      }
   };

   execute_chunk(input, chunk)
}

fn exec_command(input: &Path) -> InterpretResult {
   let source = match read_source(input) {
      Some(source) => source,
      None => return InterpretResult::CompileError,
   };

   let chunk = match front_end(input, &source) {
      Ok(chunk) => chunk,
      Err(result) => return result,
   };

   execute_chunk(input, chunk)
}

fn execute_chunk(input: &Path, chunk: ember::chunk::Chunk) -> InterpretResult {
   let mut vm = VirtualMachine::new(chunk, Builtins::default());

   match vm.execute() {
      Ok(()) => InterpretResult::Ok,
      Err(e) => {
         report_runtime_error(input, e.error, &e.message, e.instruction, e.offset, e.location);
         InterpretResult::RuntimeError
      }
   }
}
