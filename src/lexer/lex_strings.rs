use crate::lexer::tokens::{Token, TokenKind};
use crate::lexer::Lexer;

impl Lexer {
   /// Generates a string token with the current state of the scanner. The
   /// opening quote has already been consumed; the token's lexeme holds the
   /// unescaped string contents.
   ///
   /// Supported escape sequences: `\n`, `\t`, `\\`, and `\"`.
   pub(super) fn make_string_token(&mut self) -> Token {
      let mut contents: Vec<u8> = Vec::new();

      while !self.is_at_end() && self.get_current() != b'"' {
         let c = self.advance();

         if c == b'\\' {
            if self.is_at_end() {
               break;
            }

            match self.advance() {
               b'n' => contents.push(b'\n'),
               b't' => contents.push(b'\t'),
               b'\\' => contents.push(b'\\'),
               b'"' => contents.push(b'"'),
               _ => return self.make_error_token("Invalid escape sequence in string."),
            }
         } else {
            // Newlines inside strings keep the line counter honest.
            if c == b'\n' {
               self.bump_line();
            }

            contents.push(c);
         }
      }

      if self.is_at_end() {
         return self.make_error_token("Unterminated string literal.");
      }

      self.advance(); // closing quote
      let contents = String::from_utf8_lossy(&contents).into_owned();
      self.make_token_with_lexeme(TokenKind::String, contents)
   }
}
