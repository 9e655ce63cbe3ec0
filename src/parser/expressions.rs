use crate::ast::*;
use crate::lexer::tokens::TokenKind;
use crate::parser::Parser;
use crate::values::Value;

/// The binding power of a binary operator, lowest to highest. Unknown
/// operators (including `=` and `..`, which are handled outside the climb
/// loop) have no precedence.
fn operator_precedence(symbol: &str) -> Option<u8> {
   match symbol {
      "||" => Some(1),
      "&&" => Some(2),
      "==" | "!=" => Some(3),
      "<" | "<=" | ">" | ">=" => Some(4),
      "+" | "-" => Some(5),
      "*" | "/" | "%" => Some(6),
      _ => None,
   }
}

impl Parser {
   /// Parses an expression with a precedence-climbing loop over binary
   /// operators.
   ///
   /// # Parameters
   /// - `min_precedence`: The minimum binding power an operator must have to
   /// be consumed by this invocation.
   ///
   /// # Returns
   /// - `Some(AstNode)`: The parsed expression.
   /// - `None`: The expression could not be parsed.
   pub(super) fn parse_expression(&mut self, min_precedence: u8) -> Option<AstNode> {
      let mut left = self.parse_factor()?;

      // Assignment sits below every binary operator and is right-associative.
      // It is recognized here, between the primary and the operator loop.
      if min_precedence == 0 && self.check_operator("=") {
         return self.parse_assignment_target(left);
      }

      // A range expression: `start..end`.
      if min_precedence == 0 && self.check_operator("..") {
         let pos = self.current.pos();
         self.advance();
         let end = self.parse_expression(1)?;

         return Some(AstNode::Range(RangeNode {
            start: Box::new(left),
            end: Box::new(end),
            pos,
         }));
      }

      while self.check(TokenKind::Operator) {
         let precedence = match operator_precedence(&self.current.lexeme) {
            Some(p) => p,
            None => break,
         };

         if precedence < min_precedence {
            break;
         }

         let operator = BinaryOp::try_from_symbol(&self.current.lexeme)
            .expect("operators with a precedence always map to a BinaryOp");
         let pos = self.current.pos();
         self.advance();

         let right = self.parse_expression(precedence + 1)?;

         left = AstNode::Binary(BinaryNode {
            left: Box::new(left),
            right: Box::new(right),
            operator,
            pos,
         });
      }

      Some(left)
   }

   /// Converts a parsed expression into an assignment node. Only variable
   /// references and property accesses are valid assignment targets.
   fn parse_assignment_target(&mut self, target: AstNode) -> Option<AstNode> {
      let pos = self.current.pos();
      self.advance(); // the '='

      let value = self.parse_expression(0)?;

      match target {
         AstNode::Variable(var) => Some(AstNode::Assignment(AssignmentNode {
            name: var.name,
            value: Box::new(value),
            pos,
         })),
         AstNode::PropertyAccess(access) => {
            Some(AstNode::PropertyAssignment(PropertyAssignmentNode {
               object: access.object,
               property: access.property,
               value: Box::new(value),
               pos,
            }))
         }
         _ => {
            self.error_at_previous("Invalid assignment target.");
            None
         }
      }
   }

   /// Parses a factor: a unary operation, a literal, a collection literal, a
   /// function expression, a parenthesized expression, or an identifier with
   /// an optional call — followed by any chain of index and property
   /// postfixes.
   pub(super) fn parse_factor(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();

      let node = if self.matches_operator("-") {
         let operand = self.parse_factor()?;
         AstNode::Unary(UnaryNode {
            operator: UnaryOp::Negate,
            operand: Box::new(operand),
            pos,
         })
      } else if self.matches_operator("!") {
         let operand = self.parse_factor()?;
         AstNode::Unary(UnaryNode {
            operator: UnaryOp::LogicNot,
            operand: Box::new(operand),
            pos,
         })
      } else if self.check(TokenKind::Number) {
         let value = match self.current.lexeme.parse::<f64>() {
            Ok(n) => n,
            Err(_) => {
               self.error_at_current("Invalid numeric literal.");
               return None;
            }
         };
         self.advance();

         AstNode::Literal(LiteralNode {
            value: Value::Number(value),
            pos,
         })
      } else if self.check(TokenKind::String) {
         let value = Value::String(self.current.lexeme.clone());
         self.advance();

         AstNode::Literal(LiteralNode { value, pos })
      } else if self.check(TokenKind::Boolean) {
         let value = Value::Bool(self.current.lexeme == "true");
         self.advance();

         AstNode::Literal(LiteralNode { value, pos })
      } else if self.matches(TokenKind::Null) {
         AstNode::Literal(LiteralNode {
            value: Value::Null,
            pos,
         })
      } else if self.check_punctuation("{") {
         self.parse_object_literal()?
      } else if self.check_punctuation("[") {
         self.parse_array_literal()?
      } else if self.check_keyword("fn") {
         self.parse_function_expression()?
      } else if self.matches_punctuation("(") {
         let expr = self.parse_expression(0)?;
         self.consume_punctuation(")", "Expected ')' after expression.");
         expr
      } else if self.check(TokenKind::Identifier) {
         let name = self.current.lexeme.clone();
         self.advance();

         if self.check_punctuation("(") {
            let args = self.parse_call_arguments()?;
            AstNode::FunctionCall(FunctionCallNode { name, args, pos })
         } else {
            AstNode::Variable(VariableNode { name, pos })
         }
      } else {
         self.error_at_current("Expected an expression.");
         return None;
      };

      self.parse_postfixes(node)
   }

   /// Parses the chain of `[index]` and `.property` postfixes that may
   /// follow a factor. Index and property accesses chain left-to-right; a
   /// property followed by an argument list becomes a method call.
   fn parse_postfixes(&mut self, mut node: AstNode) -> Option<AstNode> {
      loop {
         if self.check_punctuation("[") {
            let pos = self.current.pos();
            self.advance();
            self.skip_layout();

            let index = self.parse_expression(0)?;
            self.skip_layout();
            self.consume_punctuation("]", "Expected ']' after index expression.");

            node = AstNode::IndexAccess(IndexAccessNode {
               target: Box::new(node),
               index: Box::new(index),
               pos,
            });
         } else if self.check_punctuation(".") {
            let pos = self.current.pos();
            self.advance();

            if !self.check(TokenKind::Identifier) {
               self.error_at_current("Expected a property name after '.'.");
               return None;
            }

            let name = self.current.lexeme.clone();
            self.advance();

            if self.check_punctuation("(") {
               let args = self.parse_call_arguments()?;
               node = AstNode::MethodCall(MethodCallNode {
                  object: Box::new(node),
                  method: name,
                  args,
                  pos,
               });
            } else {
               node = AstNode::PropertyAccess(PropertyAccessNode {
                  object: Box::new(node),
                  property: name,
                  pos,
               });
            }
         } else {
            return Some(node);
         }
      }
   }

   /// Parses a parenthesized, comma-separated argument list.
   pub(super) fn parse_call_arguments(&mut self) -> Option<Vec<AstNode>> {
      self.consume_punctuation("(", "Expected '(' before arguments.");
      self.skip_layout();

      let mut args: Vec<AstNode> = vec![];

      if !self.check_punctuation(")") {
         loop {
            args.push(self.parse_expression(0)?);
            self.skip_layout();

            if !self.matches_punctuation(",") {
               break;
            }
            self.skip_layout();
         }
      }

      self.consume_punctuation(")", "Expected ')' after arguments.");
      Some(args)
   }

   /// Parses an anonymous function expression: `fn(params) body`.
   fn parse_function_expression(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.advance(); // the 'fn' keyword

      let params = self.parse_parameter_list()?;
      let body = self.parse_body()?;

      Some(AstNode::FunctionDef(FunctionDefNode {
         name: String::from("fn"),
         params,
         body: Box::new(body),
         pos,
      }))
   }

   /// Parses a parenthesized, comma-separated list of parameter names.
   pub(super) fn parse_parameter_list(&mut self) -> Option<Vec<String>> {
      self.consume_punctuation("(", "Expected '(' before parameter list.");
      self.skip_layout();

      let mut params: Vec<String> = vec![];

      if !self.check_punctuation(")") {
         loop {
            if !self.check(TokenKind::Identifier) {
               self.error_at_current("Expected a parameter name.");
               return None;
            }

            params.push(self.current.lexeme.clone());
            self.advance();
            self.skip_layout();

            if !self.matches_punctuation(",") {
               break;
            }
            self.skip_layout();
         }
      }

      self.consume_punctuation(")", "Expected ')' after parameter list.");
      Some(params)
   }
}
