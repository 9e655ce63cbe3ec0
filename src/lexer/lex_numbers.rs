use crate::lexer::tokens::{Token, TokenKind};
use crate::lexer::Lexer;

impl Lexer {
   /// Generates a numeric token with the current state of the scanner.
   ///
   /// A number is one or more digits with an optional single `.` followed by
   /// one or more digits. When the byte after a digit run is `.` and the byte
   /// after that is also `.`, the digits lex as an integer and `..` is left
   /// in place for the range operator.
   pub(super) fn make_numeric_token(&mut self) -> Token {
      while !self.is_at_end() && self.get_current().is_ascii_digit() {
         self.advance();
      }

      if !self.is_at_end() && self.get_current() == b'.' && self.get_next().is_ascii_digit() {
         self.advance(); // consume the '.'

         while !self.is_at_end() && self.get_current().is_ascii_digit() {
            self.advance();
         }
      }

      self.make_token(TokenKind::Number)
   }
}
