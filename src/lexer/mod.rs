use crate::lexer::tokens::{identifier_kind, Token, TokenKind};

// Submodules
mod lex_numbers;
mod lex_strings;
pub mod tokens;

/// Represents the scanner for Ember source code. The lexer is byte-oriented
/// and line-aware: it maintains a stack of indentation widths and injects
/// synthetic `Indent`/`Dedent` tokens at the start of logical lines.
#[derive(Clone)]
pub struct Lexer {
   /// The flat list of bytes from the source file.
   source: Vec<u8>,
   /// The index of the current byte.
   current: usize,
   /// The current line number.
   line: usize,
   /// The position in the source of the first byte of the current line.
   line_start: usize,
   /// The position of the first byte of the current token.
   token_start: usize,
   /// The stack of active indentation widths. Always starts with `[0]`.
   indent_stack: Vec<usize>,
   /// The number of `Dedent` tokens still owed to the caller.
   pending_dedents: usize,
   /// An indentation error to report once the owed dedents have drained.
   pending_error: Option<String>,
   /// Whether the scanner sits at the start of a logical line.
   at_line_start: bool,
}

impl Lexer {
   /// An initialized instance of the lexer.
   ///
   /// # Parameters
   /// - `src`: The source text to be scanned.
   pub fn new(src: &str) -> Lexer {
      Self {
         source: src.as_bytes().to_vec(),
         current: 0,
         line: 1,
         line_start: 0,
         token_start: 0,
         indent_stack: vec![0],
         pending_dedents: 0,
         pending_error: None,
         at_line_start: true,
      }
   }

   /// Scans the next token in the source.
   pub fn next_token(&mut self) -> Token {
      // Dedents owed from a previous indentation drop are emitted one
      // per call before any other scanning happens.
      if self.pending_dedents > 0 {
         self.pending_dedents -= 1;
         return self.make_synthetic_token(TokenKind::Dedent);
      }

      if let Some(message) = self.pending_error.take() {
         return self.make_error_token(&message);
      }

      if self.at_line_start {
         self.at_line_start = false;

         if let Some(token) = self.handle_indentation() {
            return token;
         }
      }

      self.skip_whitespace();

      if self.is_at_end() {
         // Close any indentation levels still open so that the stream
         // balances before the EOF token.
         if self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            return self.make_synthetic_token(TokenKind::Dedent);
         }

         self.token_start = self.current;
         return self.make_token(TokenKind::Eof);
      }

      if self.get_current() == b'\n' {
         let token = Token {
            kind: TokenKind::Newline,
            lexeme: String::from("\n"),
            line: self.line,
            column: self.current - self.line_start + 1,
         };

         self.advance();
         self.line += 1;
         self.line_start = self.current;
         self.at_line_start = true;

         return token;
      }

      self.token_start = self.current;
      let c = self.advance();

      if c.is_ascii_alphabetic() || c == b'_' {
         return self.make_identifier_token();
      }

      if c.is_ascii_digit() {
         return self.make_numeric_token();
      }

      match c {
         b'"' => self.make_string_token(),

         // Punctuation
         b'(' | b')' | b'{' | b'}' | b'[' | b']' | b',' | b';' | b':' => {
            self.make_token(TokenKind::Punctuation)
         }

         // Single-character arithmetic operators
         b'+' | b'-' | b'*' | b'/' | b'%' => self.make_token(TokenKind::Operator),

         // Operators that may extend to two characters
         b'=' | b'!' | b'>' => {
            self.matches(b'=');
            self.make_token(TokenKind::Operator)
         }
         b'<' => {
            // `<=` comparison or `<-` event binding
            if !self.matches(b'=') {
               self.matches(b'-');
            }
            self.make_token(TokenKind::Operator)
         }
         b'&' => {
            if self.matches(b'&') {
               self.make_token(TokenKind::Operator)
            } else {
               self.make_error_token("Unexpected character '&'.")
            }
         }
         b'|' => {
            if self.matches(b'|') {
               self.make_token(TokenKind::Operator)
            } else {
               self.make_error_token("Unexpected character '|'.")
            }
         }
         b'.' => {
            if self.matches(b'.') {
               self.make_token(TokenKind::Operator)
            } else {
               self.make_token(TokenKind::Punctuation)
            }
         }

         _ => self.make_error_token("Unexpected character."),
      }
   }

   /// Computes the indentation step at the start of a logical line, emitting
   /// an `Indent` token, scheduling `Dedent` tokens, or reporting an
   /// inconsistent indentation error.
   ///
   /// # Returns
   /// - `Some(Token)`: The indentation token to hand to the caller.
   /// - `None`: The line does not change the indentation.
   fn handle_indentation(&mut self) -> Option<Token> {
      let width = match self.measure_indent() {
         Some(w) => w,
         // Blank and comment-only lines do not alter the stack.
         None => return None,
      };

      let top = *self.indent_stack.last().unwrap();

      if width > top {
         self.indent_stack.push(width);
         return Some(self.make_synthetic_token(TokenKind::Indent));
      }

      if width < top {
         let mut dedents = 0;
         while self.indent_stack.len() > 1 && *self.indent_stack.last().unwrap() > width {
            self.indent_stack.pop();
            dedents += 1;
         }

         // The stream stays balanced even on a mismatch: every popped level
         // gets its dedent, then the error surfaces.
         if *self.indent_stack.last().unwrap() != width {
            self.pending_error = Some(String::from("Inconsistent indentation."));
         }

         self.pending_dedents = dedents - 1;
         return Some(self.make_synthetic_token(TokenKind::Dedent));
      }

      None
   }

   /// Measures the indentation width of the current line: spaces count one
   /// column, tabs count four. Consumes the leading whitespace.
   ///
   /// # Returns
   /// - `Some(width)`: The measured width.
   /// - `None`: The line is blank or holds only a line comment.
   fn measure_indent(&mut self) -> Option<usize> {
      let mut width = 0;

      while !self.is_at_end() {
         match self.get_current() {
            b' ' => width += 1,
            b'\t' => width += 4,
            _ => break,
         }
         self.advance();
      }

      if self.is_at_end() {
         return None;
      }

      let c = self.get_current();
      if c == b'\n' || c == b'\r' || (c == b'/' && self.get_next() == b'/') {
         return None;
      }

      Some(width)
   }

   /// Gets the current byte without consuming it.
   pub(super) fn get_current(&self) -> u8 {
      self.source[self.current]
   }

   /// Returns the next byte without consuming it.
   pub(super) fn get_next(&self) -> u8 {
      if self.current + 1 >= self.source.len() {
         return b'\0';
      }

      self.source[self.current + 1]
   }

   /// Checks if the scanner is at the end of the source.
   pub(super) fn is_at_end(&self) -> bool {
      self.current >= self.source.len()
   }

   /// Advances to the next byte and returns the consumed byte.
   pub(super) fn advance(&mut self) -> u8 {
      let current = self.get_current();
      self.current += 1;
      current
   }

   /// Matches the current byte against a provided byte, consuming it
   /// on a match.
   pub(super) fn matches(&mut self, expected: u8) -> bool {
      if self.is_at_end() || self.get_current() != expected {
         return false;
      }
      self.current += 1;
      true
   }

   /// Skips spaces, tabs, carriage returns, and comments. Newlines are
   /// significant and are never skipped here.
   fn skip_whitespace(&mut self) {
      loop {
         if self.is_at_end() {
            break;
         }

         let c = self.get_current();

         if c == b' ' || c == b'\r' || c == b'\t' {
            self.advance();
         } else if c == b'/' && self.get_next() == b'/' {
            self.skip_line_comment();
         } else if c == b'/' && self.get_next() == b'*' {
            self.skip_block_comment();
         } else {
            break;
         }
      }
   }

   /// Skips a single-line comment, stopping before the line's newline.
   fn skip_line_comment(&mut self) {
      while !self.is_at_end() && self.get_current() != b'\n' {
         self.advance();
      }
   }

   /// Advances the line counter past a newline that was consumed outside
   /// the main newline-token path.
   pub(super) fn bump_line(&mut self) {
      self.line += 1;
      self.line_start = self.current;
   }

   /// Skips a block comment. Block comments do not nest.
   fn skip_block_comment(&mut self) {
      self.advance(); // '/'
      self.advance(); // '*'

      while !self.is_at_end() {
         if self.get_current() == b'*' && self.get_next() == b'/' {
            self.advance();
            self.advance();
            break;
         }

         if self.get_current() == b'\n' {
            self.line += 1;
            self.line_start = self.current + 1;
         }

         self.advance();
      }
   }

   /// Generates an identifier, keyword, boolean, or null token with the
   /// current state of the scanner.
   fn make_identifier_token(&mut self) -> Token {
      while !self.is_at_end() {
         let c = self.get_current();

         if c.is_ascii_alphanumeric() || c == b'_' {
            self.advance();
         } else {
            break;
         }
      }

      let id = self.current_lexeme();
      let kind = identifier_kind(&id);

      self.make_token_with_lexeme(kind, id)
   }

   /// The source text between the start of the current token and the
   /// current position.
   pub(super) fn current_lexeme(&self) -> String {
      String::from_utf8_lossy(&self.source[self.token_start..self.current]).into_owned()
   }

   /// Generates a token with the current state of the scanner.
   pub(super) fn make_token(&self, kind: TokenKind) -> Token {
      self.make_token_with_lexeme(kind, self.current_lexeme())
   }

   pub(super) fn make_token_with_lexeme(&self, kind: TokenKind, lexeme: String) -> Token {
      Token {
         kind,
         lexeme,
         line: self.line,
         column: self.token_start.saturating_sub(self.line_start) + 1,
      }
   }

   /// Generates a zero-width synthetic token (indentation and dedentation).
   fn make_synthetic_token(&self, kind: TokenKind) -> Token {
      Token {
         kind,
         lexeme: String::new(),
         line: self.line,
         column: self.current.saturating_sub(self.line_start) + 1,
      }
   }

   /// Generates an error token at the current position with the provided
   /// message as its lexeme.
   pub(super) fn make_error_token(&self, message: &str) -> Token {
      Token {
         kind: TokenKind::Error,
         lexeme: String::from(message),
         line: self.line,
         column: self.current.saturating_sub(self.line_start) + 1,
      }
   }
}
