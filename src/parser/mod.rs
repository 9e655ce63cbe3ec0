use crate::ast::ModuleNode;
use crate::errors::ErrorReport;
use crate::lexer::tokens::{Token, TokenKind};
use crate::lexer::Lexer;

// Submodules
mod collections;
mod expressions;
mod statements;

/// Represents Ember's parser, which converts source text into an Abstract
/// Syntax Tree representation of the program.
pub struct Parser {
   /// The lexer used in this parser.
   lexer: Lexer,
   /// The previously consumed token.
   previous: Token,
   /// The current token.
   current: Token,
   /// Whether the parser is in error-recovery mode or not.
   is_in_panic: bool,
   /// The list of reported errors generated while parsing.
   errors: Vec<ErrorReport>,
}

impl Parser {
   /// Parses a string of source text into an Ember AST.
   ///
   /// # Parameters
   /// - `src`: The source string for the program.
   ///
   /// # Returns
   /// - `Ok(ModuleNode)`: The generated abstract syntax tree.
   /// - `Err(Vec<ErrorReport>)`: A list of parsing errors.
   pub fn parse(src: &str) -> Result<ModuleNode, Vec<ErrorReport>> {
      let placeholder = Token {
         kind: TokenKind::Eof,
         lexeme: String::new(),
         line: 0,
         column: 0,
      };

      let mut parser = Parser {
         lexer: Lexer::new(src),
         previous: placeholder.clone(),
         current: placeholder,
         is_in_panic: false,
         errors: vec![],
      };

      let mut module = ModuleNode { body: vec![] };

      parser.advance();
      loop {
         parser.skip_layout();

         if parser.matches(TokenKind::Eof) {
            break;
         }

         match parser.parse_statement() {
            Some(node) => module.body.push(node),
            None => {
               // Keep parsing after an error to catch other errors in the
               // program; the AST will of course not be usable.
               parser.synchronize();
            }
         }
      }

      if parser.errors.is_empty() {
         Ok(module)
      } else {
         Err(parser.errors)
      }
   }

   /// Checks that the current token matches the token kind provided.
   pub(super) fn check(&self, kind: TokenKind) -> bool {
      self.current.kind == kind
   }

   /// Checks that the current token matches the kind provided. If the tokens
   /// match, the current token gets consumed, and the function returns true.
   /// Otherwise the token is not consumed, and the function returns false.
   pub(super) fn matches(&mut self, kind: TokenKind) -> bool {
      if self.check(kind) {
         self.advance();
         true
      } else {
         false
      }
   }

   pub(super) fn check_punctuation(&self, symbol: &str) -> bool {
      self.current.is_punctuation(symbol)
   }

   pub(super) fn matches_punctuation(&mut self, symbol: &str) -> bool {
      if self.check_punctuation(symbol) {
         self.advance();
         true
      } else {
         false
      }
   }

   pub(super) fn check_operator(&self, symbol: &str) -> bool {
      self.current.is_operator(symbol)
   }

   pub(super) fn matches_operator(&mut self, symbol: &str) -> bool {
      if self.check_operator(symbol) {
         self.advance();
         true
      } else {
         false
      }
   }

   pub(super) fn check_keyword(&self, word: &str) -> bool {
      self.current.is_keyword(word)
   }

   pub(super) fn matches_keyword(&mut self, word: &str) -> bool {
      if self.check_keyword(word) {
         self.advance();
         true
      } else {
         false
      }
   }

   /// Advances the parser to the next token. Error tokens produced by the
   /// lexer are reported and skipped.
   pub(super) fn advance(&mut self) {
      self.previous = std::mem::replace(
         &mut self.current,
         Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            line: 0,
            column: 0,
         },
      );

      loop {
         self.current = self.lexer.next_token();

         match self.current.kind {
            TokenKind::Error => {
               let message = self.current.lexeme.clone();
               self.error_at_current(&message);
            }
            _ => break,
         }
      }
   }

   /// Consumes the current token only if it is punctuation with the given
   /// symbol. If the token does not match, emits a parser error.
   pub(super) fn consume_punctuation(&mut self, symbol: &str, message: &str) {
      if self.check_punctuation(symbol) {
         self.advance();
         return;
      }

      self.error_at_current(message);
   }

   /// Skips newline tokens.
   pub(super) fn skip_newlines(&mut self) {
      while self.check(TokenKind::Newline) {
         self.advance();
      }
   }

   /// Skips newline, indent, and dedent tokens. Used inside bracketed
   /// constructs and at the top level, where layout is insignificant.
   pub(super) fn skip_layout(&mut self) {
      while matches!(
         self.current.kind,
         TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
      ) {
         self.advance();
      }
   }

   /// Returns the token after the current one without consuming anything.
   pub(super) fn peek_next_token(&self) -> Token {
      let mut lookahead = self.lexer.clone();
      lookahead.next_token()
   }

   /// Emits a parser error from the current token.
   pub(super) fn error_at_current(&mut self, message: &str) {
      let token = self.current.clone();
      self.error_at_token(&token, message);
   }

   /// Emits a parser error from the previous token.
   pub(super) fn error_at_previous(&mut self, message: &str) {
      let token = self.previous.clone();
      self.error_at_token(&token, message);
   }

   /// Emits a parser error from the given token.
   ///
   /// # Parameters
   /// - `token`: The token that caused the error.
   /// - `message`: The error message to display.
   pub(super) fn error_at_token(&mut self, token: &Token, message: &str) {
      if self.is_in_panic {
         return;
      }
      self.is_in_panic = true;

      let msg = format!(
         "\x1b[31;1mSyntaxError\x1b[0m\x1b[1m at [{}:{}]: {}\x1b[0m",
         token.line, token.column, message
      );

      self.errors.push(ErrorReport {
         line: token.line,
         column: token.column,
         lexeme_len: token.lexeme.len(),
         message: msg,
      });
   }

   /// Synchronizes the parser after it has found an error. This method helps
   /// minimize the number of cascading errors the parser emits: tokens are
   /// skipped until a statement boundary, then normal parsing resumes.
   pub(super) fn synchronize(&mut self) {
      self.is_in_panic = false;

      while !self.check(TokenKind::Eof) {
         if self.previous.is_punctuation(";") || self.previous.is_punctuation("}") {
            return;
         }

         match self.current.kind {
            TokenKind::Newline | TokenKind::Dedent => {
               self.advance();
               return;
            }
            TokenKind::Keyword => match self.current.lexeme.as_str() {
               "if" | "while" | "for" | "var" | "let" | "import" | "fn" => return,
               _ => {}
            },
            _ => {}
         }

         self.advance();
      }
   }
}
