use proptest::prelude::*;

use crate::lexer::tokens::{Token, TokenKind};
use crate::lexer::Lexer;

/// Scans a source string to EOF, returning every token including the
/// synthetic layout tokens.
fn lex_all(src: &str) -> Vec<Token> {
   let mut lexer = Lexer::new(src);
   let mut tokens = vec![];

   loop {
      let token = lexer.next_token();
      let kind = token.kind;
      tokens.push(token);

      if kind == TokenKind::Eof {
         return tokens;
      }

      // A scanner that stops making progress is a bug, not a hang.
      assert!(tokens.len() < 100_000, "lexer produced too many tokens");
   }
}

fn kinds(src: &str) -> Vec<TokenKind> {
   lex_all(src).into_iter().map(|t| t.kind).collect()
}

#[test]
fn scans_declaration_tokens() {
   let tokens = lex_all("var x = 1");

   assert_eq!(tokens[0].kind, TokenKind::Keyword);
   assert_eq!(tokens[0].lexeme, "var");
   assert_eq!(tokens[1].kind, TokenKind::Identifier);
   assert_eq!(tokens[1].lexeme, "x");
   assert_eq!(tokens[2].kind, TokenKind::Operator);
   assert_eq!(tokens[2].lexeme, "=");
   assert_eq!(tokens[3].kind, TokenKind::Number);
   assert_eq!(tokens[3].lexeme, "1");
   assert_eq!(tokens[4].kind, TokenKind::Eof);
}

#[test]
fn range_wins_the_dot_tie_break() {
   let tokens = lex_all("1..5");

   assert_eq!(tokens[0].kind, TokenKind::Number);
   assert_eq!(tokens[0].lexeme, "1");
   assert_eq!(tokens[1].kind, TokenKind::Operator);
   assert_eq!(tokens[1].lexeme, "..");
   assert_eq!(tokens[2].kind, TokenKind::Number);
   assert_eq!(tokens[2].lexeme, "5");
}

#[test]
fn fractional_numbers_still_scan() {
   let tokens = lex_all("3.25");
   assert_eq!(tokens[0].kind, TokenKind::Number);
   assert_eq!(tokens[0].lexeme, "3.25");
}

#[test]
fn boolean_and_null_words_get_their_own_kinds() {
   let tokens = lex_all("true false null fire");

   assert_eq!(tokens[0].kind, TokenKind::Boolean);
   assert_eq!(tokens[1].kind, TokenKind::Boolean);
   assert_eq!(tokens[2].kind, TokenKind::Null);
   assert_eq!(tokens[3].kind, TokenKind::Keyword);
}

#[test]
fn multi_character_operators_scan_greedily() {
   let tokens = lex_all("== != <= >= && || .. <-");
   let lexemes: Vec<&str> = tokens[..8].iter().map(|t| t.lexeme.as_str()).collect();

   assert_eq!(lexemes, vec!["==", "!=", "<=", ">=", "&&", "||", "..", "<-"]);
   assert!(tokens[..8].iter().all(|t| t.kind == TokenKind::Operator));
}

#[test]
fn string_escapes_unescape_into_the_lexeme() {
   let tokens = lex_all(r#""a\tb\n\"q\"""#);

   assert_eq!(tokens[0].kind, TokenKind::String);
   assert_eq!(tokens[0].lexeme, "a\tb\n\"q\"");
}

#[test]
fn unterminated_string_is_an_error_token() {
   let tokens = lex_all("\"abc");
   assert_eq!(tokens[0].kind, TokenKind::Error);
}

#[test]
fn invalid_escape_is_an_error_token() {
   let tokens = lex_all(r#""a\qb""#);
   assert_eq!(tokens[0].kind, TokenKind::Error);
}

#[test]
fn comments_are_skipped() {
   let tokens = lex_all("1 // trailing\n/* block\ncomment */ 2");
   let significant: Vec<TokenKind> = tokens
      .iter()
      .filter(|t| t.kind != TokenKind::Newline && t.kind != TokenKind::Eof)
      .map(|t| t.kind)
      .collect();

   assert_eq!(significant, vec![TokenKind::Number, TokenKind::Number]);
}

#[test]
fn indented_block_emits_indent_and_dedent() {
   let src = "a: 1\nif (a)\n    print(a)\nprint(a)\n";
   let sequence = kinds(src);

   let indents = sequence.iter().filter(|k| **k == TokenKind::Indent).count();
   let dedents = sequence.iter().filter(|k| **k == TokenKind::Dedent).count();

   assert_eq!(indents, 1);
   assert_eq!(dedents, 1);
}

#[test]
fn nested_blocks_dedent_one_level_per_token() {
   let src = "a\n   b\n      c\nd\n";
   let sequence = kinds(src);

   let indents = sequence.iter().filter(|k| **k == TokenKind::Indent).count();
   let dedents = sequence.iter().filter(|k| **k == TokenKind::Dedent).count();

   assert_eq!(indents, 2);
   assert_eq!(dedents, 2);
}

#[test]
fn blank_and_comment_lines_do_not_alter_indentation() {
   let src = "a\n   b\n\n   // note\n   c\nd\n";
   let sequence = kinds(src);

   assert!(!sequence.contains(&TokenKind::Error));
   let indents = sequence.iter().filter(|k| **k == TokenKind::Indent).count();
   let dedents = sequence.iter().filter(|k| **k == TokenKind::Dedent).count();

   assert_eq!(indents, 1);
   assert_eq!(dedents, 1);
}

#[test]
fn tabs_count_four_columns() {
   // One tab and four spaces sit at the same level.
   let src = "a\n\tb\n    c\nd\n";
   let sequence = kinds(src);

   assert!(!sequence.contains(&TokenKind::Error));
   let indents = sequence.iter().filter(|k| **k == TokenKind::Indent).count();
   assert_eq!(indents, 1);
}

#[test]
fn inconsistent_indentation_is_reported_after_the_dedents() {
   let src = "a\n    b\n  c\n";
   let sequence = kinds(src);

   assert!(sequence.contains(&TokenKind::Error));
}

#[test]
fn dedents_flush_at_end_of_file() {
   let src = "a\n   b\n      c";
   let sequence = kinds(src);

   let indents = sequence.iter().filter(|k| **k == TokenKind::Indent).count();
   let dedents = sequence.iter().filter(|k| **k == TokenKind::Dedent).count();

   assert_eq!(indents, 2);
   assert_eq!(dedents, 2);
}

proptest! {
   /// Net `Indent - Dedent` across the token stream is zero at EOF, for
   /// any input.
   #[test]
   fn indentation_always_balances(src in "[ a-z0-9\n\t(){}:\\.\"/]{0,200}") {
      let sequence = kinds(&src);

      let indents = sequence.iter().filter(|k| **k == TokenKind::Indent).count();
      let dedents = sequence.iter().filter(|k| **k == TokenKind::Dedent).count();

      prop_assert_eq!(indents, dedents);
   }

   /// Structured nesting balances too, including early EOF inside a deep
   /// block.
   #[test]
   fn structured_indentation_balances(depths in proptest::collection::vec(0usize..6, 1..12)) {
      let mut src = String::new();
      for (i, d) in depths.iter().enumerate() {
         src.push_str(&"    ".repeat(*d));
         src.push_str(&format!("line{}\n", i));
      }

      let sequence = kinds(&src);
      let indents = sequence.iter().filter(|k| **k == TokenKind::Indent).count();
      let dedents = sequence.iter().filter(|k| **k == TokenKind::Dedent).count();

      prop_assert_eq!(indents, dedents);
   }
}
