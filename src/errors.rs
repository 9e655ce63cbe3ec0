use crate::chunk::op_codes::OpCode;
use std::path::Path;

/// The types of errors the virtual machine can generate while
/// executing a chunk of bytecode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeErrorType {
   ArgumentError,
   IndexError,
   RecursionError,
   ReferenceError,
   StackUnderflow,
   TypeError,
   UnknownOpCode,
   ZeroDivision,
   Internal,
}

impl RuntimeErrorType {
   /// Gets the user-facing name of this error type.
   pub fn name(&self) -> &'static str {
      match self {
         RuntimeErrorType::ArgumentError => "ArgumentError",
         RuntimeErrorType::IndexError => "IndexError",
         RuntimeErrorType::RecursionError => "RecursionError",
         RuntimeErrorType::ReferenceError => "ReferenceError",
         RuntimeErrorType::StackUnderflow => "StackUnderflowError",
         RuntimeErrorType::TypeError => "TypeError",
         RuntimeErrorType::UnknownOpCode => "UnknownOpCodeError",
         RuntimeErrorType::ZeroDivision => "ZeroDivisionError",
         RuntimeErrorType::Internal => "InternalError",
      }
   }
}

/// Represents a single diagnostic generated by the lexer, the parser,
/// or the compiler.
#[derive(Clone, Debug)]
pub struct ErrorReport {
   pub line: usize,
   pub column: usize,
   pub lexeme_len: usize,
   pub message: String,
}

/// Prints a list of front-end diagnostics to the error console.
///
/// # Parameters
/// - `filepath`: The path of the source file the errors belong to.
/// - `errors`: The diagnostics to be reported.
/// - `source`: The program's source text.
pub fn report_errors_list(filepath: &Path, errors: &[ErrorReport], source: &str) {
   let source_lines: Vec<&str> = source.split('\n').collect();

   for error in errors {
      eprintln!("{}", error.message);

      if let Some(src_line) = source_lines.get(error.line.saturating_sub(1)) {
         print_error_snippet(error.line, error.column, error.lexeme_len, src_line);
      }
   }

   eprintln!(
      "\x1b[31;1mERROR:\x1b[0m Aborted execution of '{}' due to {} previous error(s).",
      filepath.display(),
      errors.len()
   );
}

/// Prints the source line associated with an error, with a marker
/// under the offending lexeme.
pub fn print_error_snippet(line: usize, column: usize, len: usize, src_line: &str) {
   let line_prefix = format!("  {} | ", line);
   eprintln!("{}{}", line_prefix, src_line);

   // The marker sits under the lexeme that caused the error.
   let padding = line_prefix.len() + column.saturating_sub(1);
   let marker_len = std::cmp::max(len, 1);
   eprintln!("{}\x1b[31;1m{}\x1b[0m", " ".repeat(padding), "^".repeat(marker_len));
}

/// Throws a runtime error to the console.
///
/// # Parameters
/// - `filepath`: The path of the executing program.
/// - `error`: The generated error.
/// - `message`: The error message to be displayed.
/// - `instruction`: The opcode whose execution failed, if it could be decoded.
/// - `offset`: The bytecode offset of the failed instruction.
/// - `location`: The source line and column associated with the instruction.
pub fn report_runtime_error(
   filepath: &Path,
   error: RuntimeErrorType,
   message: &str,
   instruction: Option<OpCode>,
   offset: usize,
   location: Option<(usize, usize)>,
) {
   eprintln!("\x1b[31;1m{}:\x1b[0m\x1b[1m {}\x1b[0m", error.name(), message);

   match instruction {
      Some(op) => eprintln!("    at [{:04}] {:?} in '{}'", offset, op, filepath.display()),
      None => eprintln!("    at [{:04}] <unknown opcode> in '{}'", offset, filepath.display()),
   }

   if let Some((line, column)) = location {
      eprintln!("    from source position [{}:{}]", line, column);
   }

   eprintln!("\n\x1b[31;1mERROR:\x1b[0m Aborted execution due to previous errors.");
}
