/// A token that represents a single unit of Ember code.
#[derive(Clone, Debug)]
pub struct Token {
   /// The token's type.
   pub kind: TokenKind,
   /// The token's lexeme. For string tokens this is the unescaped contents;
   /// for error tokens it is the error message.
   pub lexeme: String,
   /// The token's line number.
   pub line: usize,
   /// The token's column number (1-based).
   pub column: usize,
}

/// The types of tokens in an Ember program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
   Identifier,
   Number,
   String,
   Operator,
   Keyword,
   Punctuation,
   Boolean,
   Null,
   Indent,
   Dedent,
   Newline,
   Eof,
   Error,
}

impl Token {
   /// Checks that this token is an operator with the given symbol.
   pub fn is_operator(&self, symbol: &str) -> bool {
      self.kind == TokenKind::Operator && self.lexeme == symbol
   }

   /// Checks that this token is a punctuation mark with the given symbol.
   pub fn is_punctuation(&self, symbol: &str) -> bool {
      self.kind == TokenKind::Punctuation && self.lexeme == symbol
   }

   /// Checks that this token is the given keyword.
   pub fn is_keyword(&self, word: &str) -> bool {
      self.kind == TokenKind::Keyword && self.lexeme == word
   }

   pub fn pos(&self) -> (usize, usize) {
      (self.line, self.column)
   }
}

/// The reserved words of the language.
pub const KEYWORDS: [&str; 13] = [
   "if", "else", "while", "for", "return", "break", "continue", "var", "const", "let", "import",
   "fn", "fire",
];

/// Maps an identifier string to a token kind.
///
/// # Parameters
/// - `id`: The identifier's string name.
///
/// # Returns
/// `TokenKind`: The kind of token matched for the given identifier name.
pub fn identifier_kind(id: &str) -> TokenKind {
   match id {
      "true" | "false" => TokenKind::Boolean,
      "null" => TokenKind::Null,
      _ if KEYWORDS.contains(&id) => TokenKind::Keyword,
      _ => TokenKind::Identifier,
   }
}
