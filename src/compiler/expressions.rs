use crate::ast::*;
use crate::chunk::op_codes::OpCode;
use crate::compiler::Compiler;
use crate::values::{FuncValue, Value};

impl Compiler {
   /// Compiles an AST node in expression position: code that leaves exactly
   /// one value on the stack.
   pub(super) fn compile_expression(&mut self, node: &AstNode) {
      match node {
         AstNode::Literal(literal) => self.emit_constant(literal.value.clone(), literal.pos),
         AstNode::Variable(var) => self.compile_variable_expr(var),
         AstNode::Unary(unary) => self.compile_unary_expr(unary),
         AstNode::Binary(binary) => self.compile_binary_expr(binary),
         AstNode::Assignment(assignment) => self.compile_assignment_expr(assignment),
         AstNode::FunctionCall(call) => self.compile_function_call(call),
         AstNode::ArrayLiteral(array) => self.compile_array_literal(array),
         AstNode::IndexAccess(access) => self.compile_index_access(access),
         AstNode::ObjectLiteral(object) => self.compile_object_literal(object),
         AstNode::PropertyAccess(access) => self.compile_property_access(access),
         AstNode::MethodCall(call) => self.compile_method_call(call),
         AstNode::PropertyAssignment(assignment) => self.compile_property_assignment(assignment),
         AstNode::FunctionDef(func) => self.compile_function_expr(func),

         AstNode::Range(range) => {
            self.error_at(range.pos, "A range can only be used as an iterator.");
         }

         _ => {
            self.error_at(node.pos(), "Expected an expression.");
         }
      }
   }

   fn compile_variable_expr(&mut self, var: &VariableNode) {
      if self.symbols.is_function(&var.name) {
         self.error_at(
            var.pos,
            &format!("Function '{}' cannot be read as a variable.", var.name),
         );
         return;
      }

      if let Some(slot) = self.resolve_variable(&var.name, var.pos) {
         self.emit_op(OpCode::LoadVar, var.pos);
         self.emit_short(slot, var.pos);
      }
   }

   fn compile_unary_expr(&mut self, unary: &UnaryNode) {
      self.compile_expression(&unary.operand);

      match unary.operator {
         UnaryOp::Negate => self.emit_op(OpCode::Negate, unary.pos),
         UnaryOp::LogicNot => self.emit_op(OpCode::LogicNot, unary.pos),
      };
   }

   fn compile_binary_expr(&mut self, binary: &BinaryNode) {
      match binary.operator {
         BinaryOp::LogicAnd => return self.compile_logic_and(binary),
         BinaryOp::LogicOr => return self.compile_logic_or(binary),
         _ => {}
      }

      self.compile_expression(&binary.left);
      self.compile_expression(&binary.right);

      let op = match binary.operator {
         BinaryOp::Add => OpCode::Add,
         BinaryOp::Subtract => OpCode::Subtract,
         BinaryOp::Multiply => OpCode::Multiply,
         BinaryOp::Divide => OpCode::Divide,
         BinaryOp::Modulus => OpCode::Modulus,
         BinaryOp::Equals => OpCode::Equals,
         BinaryOp::NotEquals => OpCode::NotEquals,
         BinaryOp::LessThan => OpCode::LessThan,
         BinaryOp::LessThanEq => OpCode::LessThanEq,
         BinaryOp::GreaterThan => OpCode::GreaterThan,
         BinaryOp::GreaterThanEq => OpCode::GreaterThanEq,
         BinaryOp::LogicAnd | BinaryOp::LogicOr => unreachable!("handled above"),
      };

      self.emit_op(op, binary.pos);
   }

   /// Compiles `a && b` with a jump-based short circuit. The duplicate
   /// keeps `a` as the expression's value when the right side never runs.
   fn compile_logic_and(&mut self, binary: &BinaryNode) {
      self.compile_expression(&binary.left);
      self.emit_op(OpCode::DupTop, binary.pos);

      let end_jump = self.emit_jump(OpCode::JumpIfFalse, binary.pos);

      self.emit_op(OpCode::Pop, binary.pos);
      self.compile_expression(&binary.right);

      self.patch_jump(end_jump, binary.pos);
   }

   /// Compiles `a || b`: mirror image of [`Compiler::compile_logic_and`].
   fn compile_logic_or(&mut self, binary: &BinaryNode) {
      self.compile_expression(&binary.left);
      self.emit_op(OpCode::DupTop, binary.pos);
      self.emit_op(OpCode::LogicNot, binary.pos);

      let end_jump = self.emit_jump(OpCode::JumpIfFalse, binary.pos);

      self.emit_op(OpCode::Pop, binary.pos);
      self.compile_expression(&binary.right);

      self.patch_jump(end_jump, binary.pos);
   }

   /// Compiles an assignment expression. The assigned value is left on the
   /// stack.
   fn compile_assignment_expr(&mut self, assignment: &AssignmentNode) {
      let target = self.symbols.lookup(&assignment.name);
      let (is_known, is_function, is_mutable) = match target {
         Some(symbol) => (true, symbol.is_function, symbol.is_mutable),
         None => (false, false, true),
      };

      if is_function {
         self.error_at(
            assignment.pos,
            &format!("Cannot assign to function '{}'.", assignment.name),
         );
         return;
      }

      if is_known && !is_mutable {
         self.error_at(
            assignment.pos,
            &format!("Cannot assign to immutable variable '{}'.", assignment.name),
         );
         return;
      }

      self.compile_expression(&assignment.value);

      if let Some(slot) = self.resolve_variable(&assignment.name, assignment.pos) {
         self.emit_op(OpCode::StoreVar, assignment.pos);
         self.emit_short(slot, assignment.pos);
      }
   }

   /// Compiles a function call. `print` lowers to the `Print` opcode; other
   /// callees resolve to either a user function or a registered built-in.
   /// Arguments are emitted in reverse order, matching the order the VM
   /// moves them into parameter slots.
   fn compile_function_call(&mut self, call: &FunctionCallNode) {
      if call.name == "print" {
         if call.args.len() != 1 {
            self.error_at(call.pos, "print() takes exactly one argument.");
            return;
         }

         self.compile_expression(&call.args[0]);
         self.emit_op(OpCode::Print, call.pos);
         return;
      }

      if call.args.len() > u8::MAX as usize {
         self.error_at(call.pos, "Too many arguments in function call.");
         return;
      }

      let callee_const = if self.symbols.is_function(&call.name) {
         self.symbols.lookup(&call.name).map(|s| s.slot as u8)
      } else if self.builtin_names.contains(call.name.as_str()) {
         self
            .add_constant(Value::Function(FuncValue::Builtin(call.name.clone())), call.pos)
      } else {
         self.error_at(call.pos, &format!("Unknown function '{}'.", call.name));
         return;
      };

      let callee_const = match callee_const {
         Some(idx) => idx,
         None => return,
      };

      for arg in call.args.iter().rev() {
         self.compile_expression(arg);
      }

      self.emit_op(OpCode::FuncCall, call.pos);
      self.emit_byte(callee_const, call.pos);
      self.emit_byte(call.args.len() as u8, call.pos);
   }

   fn compile_array_literal(&mut self, array: &ArrayLiteralNode) {
      self.emit_op(OpCode::NewArray, array.pos);

      for element in &array.elements {
         self.compile_expression(element);
         self.emit_op(OpCode::ArrayPush, array.pos);
      }
   }

   fn compile_index_access(&mut self, access: &IndexAccessNode) {
      self.compile_expression(&access.target);
      self.compile_expression(&access.index);
      self.emit_op(OpCode::Subscript, access.pos);
   }

   /// Compiles an object literal. Mixins are copied into the new object
   /// first, so the literal's own properties override them.
   fn compile_object_literal(&mut self, object: &ObjectLiteralNode) {
      self.emit_op(OpCode::NewObject, object.pos);

      for mixin in &object.mixins {
         if let Some(slot) = self.resolve_variable(mixin, object.pos) {
            self.emit_op(OpCode::LoadVar, object.pos);
            self.emit_short(slot, object.pos);
            self.emit_op(OpCode::CopyProperties, object.pos);
         }
      }

      for (key, value) in &object.properties {
         let pos = value.pos();

         // `SetProperty` rebuilds the object, so the stale copy under the
         // result is swapped out afterwards.
         self.emit_op(OpCode::DupTop, pos);
         self.emit_constant(Value::String(key.clone()), pos);
         self.compile_expression(value);
         self.emit_op(OpCode::SetProperty, pos);
         self.emit_op(OpCode::Swap, pos);
         self.emit_op(OpCode::Pop, pos);
      }
   }

   fn compile_property_access(&mut self, access: &PropertyAccessNode) {
      self.compile_expression(&access.object);
      self.emit_constant(Value::String(access.property.clone()), access.pos);
      self.emit_op(OpCode::GetProperty, access.pos);
   }

   /// Compiles a method call. The receiver is duplicated: one copy serves
   /// as `this`, the other feeds the property lookup that produces the
   /// callable.
   fn compile_method_call(&mut self, call: &MethodCallNode) {
      if call.args.len() > u8::MAX as usize {
         self.error_at(call.pos, "Too many arguments in method call.");
         return;
      }

      self.compile_expression(&call.object);
      self.emit_op(OpCode::DupTop, call.pos);
      self.emit_constant(Value::String(call.method.clone()), call.pos);
      self.emit_op(OpCode::GetProperty, call.pos);

      for arg in &call.args {
         self.compile_expression(arg);
      }

      self.emit_op(OpCode::CallMethod, call.pos);
      self.emit_byte(call.args.len() as u8, call.pos);
   }

   /// Compiles a property assignment. A chained target such as `a.b.c`
   /// compiles to a single `SetNestedProperty` over the dotted path "b.c";
   /// a flat target uses `SetProperty`. When the base of the chain is a
   /// variable, the updated object is stored back into its slot so the
   /// binding observes the mutation.
   fn compile_property_assignment(&mut self, assignment: &PropertyAssignmentNode) {
      // Walk down to the base of the access chain, collecting segments.
      let mut segments: Vec<&str> = vec![assignment.property.as_str()];
      let mut base: &AstNode = &assignment.object;

      while let AstNode::PropertyAccess(access) = base {
         segments.push(access.property.as_str());
         base = &access.object;
      }

      if segments.len() > 1 {
         segments.reverse();
         let path = segments.join(".");

         self.compile_expression(base);
         self.emit_constant(Value::String(path), assignment.pos);
         self.compile_expression(&assignment.value);
         self.emit_op(OpCode::SetNestedProperty, assignment.pos);
      } else {
         self.compile_expression(&assignment.object);
         self.emit_constant(Value::String(assignment.property.clone()), assignment.pos);
         self.compile_expression(&assignment.value);
         self.emit_op(OpCode::SetProperty, assignment.pos);
      }

      // `let` restricts rebinding the name, not mutating the contents, so
      // the write-back applies to any variable base.
      if let AstNode::Variable(var) = base {
         if !self.symbols.is_function(&var.name) {
            if let Some(slot) = self.resolve_variable(&var.name, assignment.pos) {
               self.emit_op(OpCode::StoreVar, assignment.pos);
               self.emit_short(slot, assignment.pos);
            }
         }
      }
   }

   /// Compiles an anonymous function expression and loads the resulting
   /// function value.
   fn compile_function_expr(&mut self, func: &FunctionDefNode) {
      if let Some(value) = self.compile_function_body(func, true) {
         self.emit_constant(value, func.pos);
      }
   }
}
