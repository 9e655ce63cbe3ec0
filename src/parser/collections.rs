use crate::ast::*;
use crate::lexer::tokens::TokenKind;
use crate::parser::Parser;

impl Parser {
   /// Parses an array literal: `[expr, expr, ...]` with an optional trailing
   /// comma. Layout tokens inside the brackets are insignificant.
   pub(super) fn parse_array_literal(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.consume_punctuation("[", "Expected '[' to start array literal.");
      self.skip_layout();

      let mut elements: Vec<AstNode> = vec![];

      while !self.check_punctuation("]") && !self.check(TokenKind::Eof) {
         elements.push(self.parse_expression(0)?);
         self.skip_layout();

         if !self.matches_punctuation(",") {
            break;
         }
         self.skip_layout();
      }

      self.consume_punctuation("]", "Expected ']' after array elements.");
      Some(AstNode::ArrayLiteral(ArrayLiteralNode { elements, pos }))
   }

   /// Parses an object literal:
   ///
   /// ```text
   /// { [ :[Mixin1, Mixin2], ] key: value (, key: value)* [,] }
   /// ```
   ///
   /// Keys may be identifiers or strings. The leading mixin clause names
   /// previously-bound variables whose contents are copied into the new
   /// object before the literal's own properties, so explicit properties
   /// override mixins.
   pub(super) fn parse_object_literal(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.consume_punctuation("{", "Expected '{' to start object literal.");
      self.skip_layout();

      let mut mixins: Vec<String> = vec![];

      // The mixin clause: `:[a, b]`, optionally followed by a comma.
      if self.check_punctuation(":") && self.peek_next_token().is_punctuation("[") {
         self.advance(); // ':'
         self.advance(); // '['
         self.skip_layout();

         while !self.check_punctuation("]") && !self.check(TokenKind::Eof) {
            if !self.check(TokenKind::Identifier) {
               self.error_at_current("Expected a mixin name.");
               return None;
            }

            mixins.push(self.current.lexeme.clone());
            self.advance();
            self.skip_layout();

            if !self.matches_punctuation(",") {
               break;
            }
            self.skip_layout();
         }

         self.consume_punctuation("]", "Expected ']' after mixin names.");
         self.skip_layout();
         self.matches_punctuation(",");
         self.skip_layout();
      }

      let mut properties: Vec<(String, AstNode)> = vec![];

      while !self.check_punctuation("}") && !self.check(TokenKind::Eof) {
         let key = match self.current.kind {
            TokenKind::Identifier | TokenKind::String => self.current.lexeme.clone(),
            _ => {
               self.error_at_current("Expected a property key.");
               return None;
            }
         };
         self.advance();

         self.skip_layout();
         self.consume_punctuation(":", "Expected ':' after property key.");
         self.skip_layout();

         let value = self.parse_expression(0)?;
         properties.push((key, value));

         self.skip_layout();
         if !self.matches_punctuation(",") {
            break;
         }
         self.skip_layout();
      }

      self.consume_punctuation("}", "Expected '}' after object literal.");

      Some(AstNode::ObjectLiteral(ObjectLiteralNode {
         mixins,
         properties,
         pos,
      }))
   }
}
