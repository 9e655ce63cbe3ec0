use crate::chunk::op_codes::OpCode;
use crate::errors::RuntimeErrorType;
use crate::values::Value;
use crate::virtual_machine::{RuntimeResult, VirtualMachine};

impl VirtualMachine {
   /// Adds the two values on top of the stack according to Ember's addition
   /// rules: numbers add; if either operand is a string, the other side is
   /// converted to its canonical string form and the two concatenate.
   pub(super) fn perform_addition(&mut self) -> Result<(), RuntimeResult> {
      let right = self.pop_stack()?;
      let left = self.pop_stack()?;

      match (&left, &right) {
         (Value::Number(a), Value::Number(b)) => {
            self.push_stack(Value::Number(a + b));
            Ok(())
         }
         (Value::String(_), _) | (_, Value::String(_)) => {
            let mut text = left.to_display_string();
            text.push_str(&right.to_display_string());
            self.push_stack(Value::String(text));
            Ok(())
         }
         _ => Err(self.binary_type_error("+", &left, &right)),
      }
   }

   pub(super) fn perform_subtraction(&mut self) -> Result<(), RuntimeResult> {
      let (a, b) = self.pop_numeric_operands("-")?;
      self.push_stack(Value::Number(a - b));
      Ok(())
   }

   pub(super) fn perform_multiplication(&mut self) -> Result<(), RuntimeResult> {
      let (a, b) = self.pop_numeric_operands("*")?;
      self.push_stack(Value::Number(a * b));
      Ok(())
   }

   pub(super) fn perform_division(&mut self) -> Result<(), RuntimeResult> {
      let (a, b) = self.pop_numeric_operands("/")?;

      if b == 0.0 {
         return Err(RuntimeResult::Error {
            error: RuntimeErrorType::ZeroDivision,
            message: String::from("Cannot divide by zero."),
         });
      }

      self.push_stack(Value::Number(a / b));
      Ok(())
   }

   pub(super) fn perform_modulus(&mut self) -> Result<(), RuntimeResult> {
      let (a, b) = self.pop_numeric_operands("%")?;

      if b == 0.0 {
         return Err(RuntimeResult::Error {
            error: RuntimeErrorType::ZeroDivision,
            message: String::from("Right-hand side of modulus is zero."),
         });
      }

      self.push_stack(Value::Number(a % b));
      Ok(())
   }

   pub(super) fn perform_negation(&mut self) -> Result<(), RuntimeResult> {
      let operand = self.pop_stack()?;

      match operand {
         Value::Number(n) => {
            self.push_stack(Value::Number(-n));
            Ok(())
         }
         other => Err(RuntimeResult::Error {
            error: RuntimeErrorType::TypeError,
            message: format!("Cannot negate value of type '{}'.", other.type_name()),
         }),
      }
   }

   /// Boolean negation over truthiness.
   pub(super) fn perform_logic_not(&mut self) -> Result<(), RuntimeResult> {
      let operand = self.pop_stack()?;
      self.push_stack(Value::Bool(operand.is_falsey()));
      Ok(())
   }

   /// Equality and inequality over Ember's value equality rules.
   pub(super) fn perform_equality(&mut self, negate: bool) -> Result<(), RuntimeResult> {
      let right = self.pop_stack()?;
      let left = self.pop_stack()?;

      let equal = left.equals(&right);
      self.push_stack(Value::Bool(equal != negate));
      Ok(())
   }

   /// The ordered comparisons. Numeric operands only.
   pub(super) fn perform_comparison(&mut self, op: OpCode) -> Result<(), RuntimeResult> {
      let symbol = match op {
         OpCode::LessThan => "<",
         OpCode::GreaterThan => ">",
         OpCode::LessThanEq => "<=",
         OpCode::GreaterThanEq => ">=",
         _ => unreachable!("not a comparison opcode"),
      };

      let (a, b) = self.pop_numeric_operands(symbol)?;

      let result = match op {
         OpCode::LessThan => a < b,
         OpCode::GreaterThan => a > b,
         OpCode::LessThanEq => a <= b,
         OpCode::GreaterThanEq => a >= b,
         _ => unreachable!("not a comparison opcode"),
      };

      self.push_stack(Value::Bool(result));
      Ok(())
   }

   /// Pops two operands that must both be numbers.
   fn pop_numeric_operands(&mut self, symbol: &str) -> Result<(f64, f64), RuntimeResult> {
      let right = self.pop_stack()?;
      let left = self.pop_stack()?;

      match (&left, &right) {
         (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
         _ => Err(self.binary_type_error(symbol, &left, &right)),
      }
   }

   fn binary_type_error(&self, symbol: &str, left: &Value, right: &Value) -> RuntimeResult {
      RuntimeResult::Error {
         error: RuntimeErrorType::TypeError,
         message: format!(
            "Operation '{}' not defined for operands of type '{}' and '{}'.",
            symbol,
            left.type_name(),
            right.type_name()
         ),
      }
   }
}
