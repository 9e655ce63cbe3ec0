use crate::chunk::op_codes::OpCode;
use crate::errors::RuntimeErrorType;
use crate::values::{FuncValue, ObjectValue, Value};
use crate::virtual_machine::{CallFrame, RuntimeResult, VirtualMachine, PARAM_SLOT_BASE};
use crate::FRAMES_MAX;

/// Builds a runtime error as the `Err` side of an opcode handler.
fn runtime_error(error: RuntimeErrorType, message: String) -> RuntimeResult {
   RuntimeResult::Error { error, message }
}

impl VirtualMachine {
   /// The fetch/decode/dispatch loop. Executes instructions until the end
   /// sentinel, a normal return from the top level, or an error.
   pub(crate) fn run(&mut self) -> RuntimeResult {
      loop {
         if self.ip >= self.chunk.len() {
            // Running off the end of the code ends execution normally.
            return RuntimeResult::EndOK;
         }

         self.current_offset = self.ip;
         let byte = self.next_byte();

         let instruction = match OpCode::from_byte(byte) {
            Some(op) => op,
            None => {
               self.current_instruction = None;
               return runtime_error(
                  RuntimeErrorType::UnknownOpCode,
                  format!("Unknown opcode {:#04X}.", byte),
               );
            }
         };
         self.current_instruction = Some(instruction);

         let exec = match instruction {
            OpCode::NoOp => Ok(()),
            OpCode::Pop => self.pop_stack().map(|_| ()),
            OpCode::DupTop => self.op_dup_top(),
            OpCode::Swap => self.op_swap(),

            OpCode::LoadConstant => self.op_load_constant(),
            OpCode::LoadVar => self.op_load_var(),
            OpCode::StoreVar => self.op_store_var(),

            OpCode::Add => self.perform_addition(),
            OpCode::Subtract => self.perform_subtraction(),
            OpCode::Multiply => self.perform_multiplication(),
            OpCode::Divide => self.perform_division(),
            OpCode::Modulus => self.perform_modulus(),
            OpCode::Negate => self.perform_negation(),

            OpCode::LogicNot => self.perform_logic_not(),
            OpCode::Equals => self.perform_equality(false),
            OpCode::NotEquals => self.perform_equality(true),
            OpCode::LessThan
            | OpCode::GreaterThan
            | OpCode::LessThanEq
            | OpCode::GreaterThanEq => self.perform_comparison(instruction),

            OpCode::JumpForward => self.op_jump_forward(),
            OpCode::JumpIfFalse => self.op_jump_if_false(),
            OpCode::LoopJump => self.op_loop_jump(),

            OpCode::FuncCall => self.op_func_call(),
            OpCode::CallMethod => self.op_call_method(),
            OpCode::Return => self.op_return(),

            OpCode::NewArray => {
               self.push_stack(Value::Array(vec![]));
               Ok(())
            }
            OpCode::ArrayPush => self.op_array_push(),
            OpCode::Subscript => self.op_subscript(),
            OpCode::SubscriptAssign => self.op_subscript_assign(),

            OpCode::NewObject => {
               self.push_stack(Value::Object(ObjectValue::new()));
               Ok(())
            }
            OpCode::GetProperty => self.op_get_property(),
            OpCode::SetProperty => self.op_set_property(),
            OpCode::SetNestedProperty => self.op_set_nested_property(),
            OpCode::CopyProperties => self.op_copy_properties(),

            OpCode::Print => self.op_print(),
            OpCode::EndVirtualMachine => Err(RuntimeResult::EndOK),
         };

         if let Err(result) = exec {
            return result;
         }
      }
   }

   fn op_dup_top(&mut self) -> Result<(), RuntimeResult> {
      let top = self.pop_stack()?;
      self.push_stack(top.clone());
      self.push_stack(top);
      Ok(())
   }

   fn op_swap(&mut self) -> Result<(), RuntimeResult> {
      let a = self.pop_stack()?;
      let b = self.pop_stack()?;
      self.push_stack(a);
      self.push_stack(b);
      Ok(())
   }

   fn op_load_constant(&mut self) -> Result<(), RuntimeResult> {
      let idx = self.next_byte() as usize;
      let value = self.read_constant(idx)?;
      self.push_stack(value);
      Ok(())
   }

   fn op_load_var(&mut self) -> Result<(), RuntimeResult> {
      let slot = self.next_short() as usize;
      let value = self.load_slot(slot)?;
      self.push_stack(value);
      Ok(())
   }

   /// Stores the top of the stack into a variable slot. The value stays on
   /// the stack: assignment is an expression, and persisted locations take
   /// deep copies.
   fn op_store_var(&mut self) -> Result<(), RuntimeResult> {
      let slot = self.next_short() as usize;
      let value = self.pop_stack()?;
      self.store_slot(slot, value.clone())?;
      self.push_stack(value);
      Ok(())
   }

   fn op_jump_forward(&mut self) -> Result<(), RuntimeResult> {
      let offset = self.next_short() as usize;
      self.ip += offset;
      Ok(())
   }

   /// Pops the condition; a falsey value takes the jump.
   fn op_jump_if_false(&mut self) -> Result<(), RuntimeResult> {
      let offset = self.next_short() as usize;
      let condition = self.pop_stack()?;

      if condition.is_falsey() {
         self.ip += offset;
      }

      Ok(())
   }

   fn op_loop_jump(&mut self) -> Result<(), RuntimeResult> {
      let offset = self.next_short() as usize;

      if offset > self.ip {
         return Err(runtime_error(
            RuntimeErrorType::Internal,
            format!("Loop offset {} jumps before the chunk start.", offset),
         ));
      }

      self.ip -= offset;
      Ok(())
   }

   /// Calls the function described by a constant-pool entry. A `Number`
   /// constant is a user function's entry point; a builtin function
   /// constant resolves against the native environment.
   fn op_func_call(&mut self) -> Result<(), RuntimeResult> {
      let const_idx = self.next_byte() as usize;
      let argc = self.next_byte() as usize;
      let callee = self.read_constant(const_idx)?;

      match callee {
         Value::Number(entry) => {
            let label = format!("<fn@{}>", entry);
            self.enter_function(entry as usize, argc, None, label)
         }
         Value::Function(FuncValue::Builtin(name)) => {
            // Arguments were emitted in reverse, so popping restores the
            // source order.
            let mut args = Vec::with_capacity(argc);
            for _ in 0..argc {
               args.push(self.pop_stack()?);
            }

            let result = self.builtins.call_native(&name, args)?;
            self.push_stack(result);
            Ok(())
         }
         Value::Function(FuncValue::User(func)) => {
            let entry = match func.entry_ip {
               Some(entry) => entry,
               None => {
                  return Err(runtime_error(
                     RuntimeErrorType::TypeError,
                     format!("Function '{}' has no body in this process.", func.name),
                  ))
               }
            };

            // Reverse-emitted arguments pop into slots 0, 1, 2, ...
            self.enter_function(entry, argc, None, func.name)
         }
         other => Err(runtime_error(
            RuntimeErrorType::TypeError,
            format!("Cannot call value of type '{}'.", other.type_name()),
         )),
      }
   }

   /// Transfers control into a user function: pops `argc` arguments into
   /// the parameter slots, binds the receiver when present, pushes a call
   /// frame and the return marker, and jumps to the entry point.
   fn enter_function(
      &mut self,
      entry: usize,
      argc: usize,
      receiver: Option<(Value, usize)>,
      label: String,
   ) -> Result<(), RuntimeResult> {
      if self.frames.len() >= FRAMES_MAX {
         return Err(runtime_error(
            RuntimeErrorType::RecursionError,
            String::from("Maximum recursion depth exceeded."),
         ));
      }

      if entry >= self.chunk.len() {
         return Err(runtime_error(
            RuntimeErrorType::Internal,
            format!("Function entry point {} out of bounds.", entry),
         ));
      }

      for i in 0..argc {
         let value = self.pop_stack()?;
         self.store_slot(PARAM_SLOT_BASE + i, value)?;
      }

      if let Some((this, slot_offset)) = receiver {
         self.store_slot(PARAM_SLOT_BASE + slot_offset, this)?;
      }

      let return_ip = self.ip;
      self.frames.push(CallFrame {
         function: label,
         return_ip,
         stack_base: self.stack.len(),
      });

      self.push_stack(Value::Number(return_ip as f64));
      self.ip = entry;
      Ok(())
   }

   /// Pops the return marker and restores the caller's instruction pointer,
   /// leaving `null` as the call's result. An empty stack means the top
   /// level finished: execution ends normally.
   fn op_return(&mut self) -> Result<(), RuntimeResult> {
      if self.stack.is_empty() {
         return Err(RuntimeResult::EndOK);
      }

      let marker = self.pop_stack()?;

      match marker {
         Value::Number(return_ip) => {
            self.ip = return_ip as usize;
            self.frames.pop();
            self.push_stack(Value::Null);
            Ok(())
         }
         _ => Err(runtime_error(
            RuntimeErrorType::Internal,
            String::from("Return without a call marker on the stack."),
         )),
      }
   }

   /// Calls the method on top of the receiver. User methods bind the
   /// receiver as `this` in the slot after their parameters; builtins take
   /// it as their first positional argument.
   fn op_call_method(&mut self) -> Result<(), RuntimeResult> {
      let argc = self.next_byte() as usize;

      let mut args = Vec::with_capacity(argc);
      for _ in 0..argc {
         args.push(self.pop_stack()?);
      }
      args.reverse();

      let callable = self.pop_stack()?;
      let receiver = self.pop_stack()?;

      match callable {
         Value::Function(FuncValue::Builtin(name)) => {
            let mut full_args = Vec::with_capacity(argc + 1);
            full_args.push(receiver);
            full_args.extend(args);

            let result = self.builtins.call_native(&name, full_args)?;
            self.push_stack(result);
            Ok(())
         }
         Value::Function(FuncValue::User(func)) => {
            let entry = match func.entry_ip {
               Some(entry) => entry,
               None => {
                  return Err(runtime_error(
                     RuntimeErrorType::TypeError,
                     format!("Method '{}' has no body in this process.", func.name),
                  ))
               }
            };

            for (i, value) in args.into_iter().enumerate() {
               self.store_slot(PARAM_SLOT_BASE + i, value)?;
            }

            let this_slot = func.params.len();
            let label = func.name.clone();
            self.enter_function(entry, 0, Some((receiver, this_slot)), label)
         }
         other => Err(runtime_error(
            RuntimeErrorType::TypeError,
            format!(
               "Cannot call value of type '{}' as a method.",
               other.type_name()
            ),
         )),
      }
   }

   /// Appends a value to an array: `[array, value] -> [array']`.
   fn op_array_push(&mut self) -> Result<(), RuntimeResult> {
      let value = self.pop_stack()?;
      let target = self.pop_stack()?;

      match target {
         Value::Array(mut elements) => {
            elements.push(value);
            self.push_stack(Value::Array(elements));
            Ok(())
         }
         other => Err(runtime_error(
            RuntimeErrorType::TypeError,
            format!("Cannot push into value of type '{}'.", other.type_name()),
         )),
      }
   }

   /// Indexes an array by number or an object by key:
   /// `[target, index] -> [element]`.
   fn op_subscript(&mut self) -> Result<(), RuntimeResult> {
      let index = self.pop_stack()?;
      let target = self.pop_stack()?;

      match (target, index) {
         (Value::Array(elements), Value::Number(n)) => {
            let idx = array_index(n, elements.len())?;
            self.push_stack(elements[idx].clone());
            Ok(())
         }
         (Value::Object(obj), Value::String(key)) => {
            let value = obj.get(&key).cloned().unwrap_or(Value::Null);
            self.push_stack(value);
            Ok(())
         }
         (target, index) => Err(runtime_error(
            RuntimeErrorType::TypeError,
            format!(
               "Cannot index value of type '{}' with '{}'.",
               target.type_name(),
               index.type_name()
            ),
         )),
      }
   }

   /// Writes through an index: `[target, index, value] -> [target']`.
   fn op_subscript_assign(&mut self) -> Result<(), RuntimeResult> {
      let value = self.pop_stack()?;
      let index = self.pop_stack()?;
      let target = self.pop_stack()?;

      match (target, index) {
         (Value::Array(mut elements), Value::Number(n)) => {
            let idx = array_index(n, elements.len())?;
            elements[idx] = value;
            self.push_stack(Value::Array(elements));
            Ok(())
         }
         (Value::Object(mut obj), Value::String(key)) => {
            obj.insert(key, value);
            self.push_stack(Value::Object(obj));
            Ok(())
         }
         (target, index) => Err(runtime_error(
            RuntimeErrorType::TypeError,
            format!(
               "Cannot index-assign value of type '{}' with '{}'.",
               target.type_name(),
               index.type_name()
            ),
         )),
      }
   }

   /// Reads a property: `[object, key] -> [value]`. A missing property
   /// reads as null.
   fn op_get_property(&mut self) -> Result<(), RuntimeResult> {
      let key = self.pop_stack()?;
      let target = self.pop_stack()?;

      let key = match key {
         Value::String(key) => key,
         other => {
            return Err(runtime_error(
               RuntimeErrorType::TypeError,
               format!("Property name must be a string, got '{}'.", other.type_name()),
            ))
         }
      };

      match target {
         Value::Object(obj) => {
            let value = obj.get(&key).cloned().unwrap_or(Value::Null);
            self.push_stack(value);
            Ok(())
         }
         other => Err(runtime_error(
            RuntimeErrorType::TypeError,
            format!(
               "Cannot read property '{}' of value of type '{}'.",
               key,
               other.type_name()
            ),
         )),
      }
   }

   /// Inserts or replaces a property: `[object, key, value] -> [object']`.
   fn op_set_property(&mut self) -> Result<(), RuntimeResult> {
      let value = self.pop_stack()?;
      let key = self.pop_stack()?;
      let target = self.pop_stack()?;

      let key = match key {
         Value::String(key) => key,
         other => {
            return Err(runtime_error(
               RuntimeErrorType::TypeError,
               format!("Property name must be a string, got '{}'.", other.type_name()),
            ))
         }
      };

      match target {
         Value::Object(mut obj) => {
            obj.insert(key, value);
            self.push_stack(Value::Object(obj));
            Ok(())
         }
         other => Err(runtime_error(
            RuntimeErrorType::TypeError,
            format!(
               "Cannot set property '{}' on value of type '{}'.",
               key,
               other.type_name()
            ),
         )),
      }
   }

   /// Sets a property through a dotted path, creating missing intermediate
   /// objects and replacing non-object intermediates:
   /// `[object, path, value] -> [object']`.
   fn op_set_nested_property(&mut self) -> Result<(), RuntimeResult> {
      let value = self.pop_stack()?;
      let path = self.pop_stack()?;
      let target = self.pop_stack()?;

      let path = match path {
         Value::String(path) => path,
         other => {
            return Err(runtime_error(
               RuntimeErrorType::TypeError,
               format!("Property path must be a string, got '{}'.", other.type_name()),
            ))
         }
      };

      match target {
         Value::Object(mut obj) => {
            let segments: Vec<&str> = path.split('.').collect();
            set_nested(&mut obj, &segments, value);
            self.push_stack(Value::Object(obj));
            Ok(())
         }
         other => Err(runtime_error(
            RuntimeErrorType::TypeError,
            format!(
               "Cannot set path '{}' on value of type '{}'.",
               path,
               other.type_name()
            ),
         )),
      }
   }

   /// Copies every property of the popped source object into the target
   /// left on the stack, overwriting on conflict:
   /// `[target, source] -> [target']`.
   fn op_copy_properties(&mut self) -> Result<(), RuntimeResult> {
      let source = self.pop_stack()?;

      let source = match source {
         Value::Object(obj) => obj,
         other => {
            return Err(runtime_error(
               RuntimeErrorType::TypeError,
               format!(
                  "Mixin source must be an object, got '{}'.",
                  other.type_name()
               ),
            ))
         }
      };

      match self.peek_stack_mut()? {
         Value::Object(target) => {
            target.merge_from(&source);
            Ok(())
         }
         other => Err(runtime_error(
            RuntimeErrorType::TypeError,
            format!(
               "Mixin target must be an object, got '{}'.",
               other.type_name()
            ),
         )),
      }
   }

   /// Prints the canonical string form of the top of the stack, leaving
   /// null as the expression's value.
   fn op_print(&mut self) -> Result<(), RuntimeResult> {
      let value = self.pop_stack()?;
      let text = format!("{}\n", value.to_display_string());
      self.write_output(&text);
      self.push_stack(Value::Null);
      Ok(())
   }
}

/// Validates a numeric array index against a length.
fn array_index(n: f64, len: usize) -> Result<usize, RuntimeResult> {
   if n.fract() != 0.0 || n < 0.0 {
      return Err(RuntimeResult::Error {
         error: RuntimeErrorType::IndexError,
         message: format!("Array index must be a non-negative whole number, got {}.", n),
      });
   }

   let idx = n as usize;
   if idx >= len {
      return Err(RuntimeResult::Error {
         error: RuntimeErrorType::IndexError,
         message: format!("Array index {} out of bounds for length {}.", idx, len),
      });
   }

   Ok(idx)
}

/// Walks a dotted path through an object, creating empty objects for
/// missing or non-object intermediates, and sets the final segment.
fn set_nested(obj: &mut ObjectValue, segments: &[&str], value: Value) {
   let head = segments[0];

   if segments.len() == 1 {
      obj.insert(head.to_string(), value);
      return;
   }

   if !matches!(obj.get(head), Some(Value::Object(_))) {
      obj.insert(head.to_string(), Value::Object(ObjectValue::new()));
   }

   if let Some(Value::Object(inner)) = obj.get_mut(head) {
      set_nested(inner, &segments[1..], value);
   }
}
