use crate::ast::*;
use crate::lexer::tokens::TokenKind;
use crate::parser::Parser;

impl Parser {
   /// Parses a single statement.
   ///
   /// # Returns
   /// - `Some(AstNode)`: The parsed statement.
   /// - `None`: The statement could not be parsed; errors were reported.
   pub(super) fn parse_statement(&mut self) -> Option<AstNode> {
      self.skip_newlines();

      if self.check_keyword("if") {
         return self.parse_if_statement();
      }

      if self.check_keyword("while") {
         return self.parse_while_loop();
      }

      if self.check_keyword("for") {
         return self.parse_for_loop();
      }

      if self.check_keyword("import") {
         return self.parse_import_statement();
      }

      if self.check_punctuation("{") {
         return self.parse_brace_block();
      }

      if self.check_keyword("var") {
         return self.parse_var_declaration();
      }

      if self.check_keyword("let") {
         return self.parse_let_declaration();
      }

      // `name: ...` opens a function definition, a naked iterator, or an
      // implicit variable declaration.
      if self.check(TokenKind::Identifier) && self.peek_next_token().is_punctuation(":") {
         return self.parse_colon_statement();
      }

      // Everything else is an expression statement.
      let expression = self.parse_expression(0)?;
      self.matches_punctuation(";");
      Some(expression)
   }

   /// Parses a statement body: either a brace-delimited block or an
   /// indentation-delimited block on the following lines.
   pub(super) fn parse_body(&mut self) -> Option<AstNode> {
      if self.check_punctuation("{") {
         return self.parse_brace_block();
      }

      if self.check(TokenKind::Newline) {
         return self.parse_indented_block();
      }

      self.error_at_current("Expected '{' or an indented block.");
      None
   }

   /// Parses a brace-delimited block of statements.
   pub(super) fn parse_brace_block(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.consume_punctuation("{", "Expected '{' to start block.");

      let mut statements: Vec<AstNode> = vec![];

      loop {
         self.skip_layout();

         if self.check_punctuation("}") || self.check(TokenKind::Eof) {
            break;
         }

         statements.push(self.parse_statement()?);
      }

      self.consume_punctuation("}", "Expected '}' after block.");
      Some(AstNode::Block(BlockNode { statements, pos }))
   }

   /// Parses an indentation-delimited block: one or more newlines, an
   /// `Indent`, the statements, and the closing `Dedent`.
   pub(super) fn parse_indented_block(&mut self) -> Option<AstNode> {
      self.skip_newlines();

      let pos = self.current.pos();

      if !self.matches(TokenKind::Indent) {
         self.error_at_current("Expected an indented block.");
         return None;
      }

      let mut statements: Vec<AstNode> = vec![];

      loop {
         self.skip_newlines();

         if self.matches(TokenKind::Dedent) || self.check(TokenKind::Eof) {
            break;
         }

         statements.push(self.parse_statement()?);
      }

      Some(AstNode::Block(BlockNode { statements, pos }))
   }

   /// Parses an if statement: `if (cond) body [else body | else if ...]`.
   fn parse_if_statement(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.advance(); // the 'if' keyword

      self.consume_punctuation("(", "Expected '(' after 'if'.");
      let condition = self.parse_expression(0)?;
      self.consume_punctuation(")", "Expected ')' after condition.");

      let body = self.parse_body()?;

      self.skip_newlines();
      let else_body = if self.matches_keyword("else") {
         if self.check_keyword("if") {
            Some(Box::new(self.parse_if_statement()?))
         } else {
            Some(Box::new(self.parse_body()?))
         }
      } else {
         None
      };

      Some(AstNode::If(IfNode {
         condition: Box::new(condition),
         body: Box::new(body),
         else_body,
         pos,
      }))
   }

   /// Parses a while loop: `while (cond) body`.
   fn parse_while_loop(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.advance(); // the 'while' keyword

      self.consume_punctuation("(", "Expected '(' after 'while'.");
      let condition = self.parse_expression(0)?;
      self.consume_punctuation(")", "Expected ')' after condition.");

      let body = self.parse_body()?;

      Some(AstNode::While(WhileNode {
         condition: Box::new(condition),
         body: Box::new(body),
         pos,
      }))
   }

   /// Parses a C-style for loop: `for (init?; cond?; incr?) body`.
   fn parse_for_loop(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.advance(); // the 'for' keyword

      self.consume_punctuation("(", "Expected '(' after 'for'.");

      let initializer = if self.check_punctuation(";") {
         None
      } else if self.check_keyword("var") {
         Some(Box::new(self.parse_var_declaration_header()?))
      } else {
         Some(Box::new(self.parse_expression(0)?))
      };
      self.consume_punctuation(";", "Expected ';' after loop initializer.");

      let condition = if self.check_punctuation(";") {
         None
      } else {
         Some(Box::new(self.parse_expression(0)?))
      };
      self.consume_punctuation(";", "Expected ';' after loop condition.");

      let increment = if self.check_punctuation(")") {
         None
      } else {
         Some(Box::new(self.parse_expression(0)?))
      };
      self.consume_punctuation(")", "Expected ')' after loop clauses.");

      let body = self.parse_body()?;

      Some(AstNode::For(ForNode {
         initializer,
         condition,
         increment,
         body: Box::new(body),
         pos,
      }))
   }

   /// Parses a `var` declaration statement, consuming an optional trailing
   /// semicolon.
   fn parse_var_declaration(&mut self) -> Option<AstNode> {
      let decl = self.parse_var_declaration_header()?;
      self.matches_punctuation(";");
      Some(decl)
   }

   /// Parses the `var name = expr` / `var name: expr` declaration forms
   /// without consuming a trailing semicolon (the form used in for-loop
   /// headers).
   fn parse_var_declaration_header(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.advance(); // the 'var' keyword

      if !self.check(TokenKind::Identifier) {
         self.error_at_current("Expected a variable name after 'var'.");
         return None;
      }

      let name = self.current.lexeme.clone();
      self.advance();

      let value = if self.matches_punctuation(":") || self.matches_operator("=") {
         Some(Box::new(self.parse_expression(0)?))
      } else {
         None
      };

      Some(AstNode::VariableDecl(VariableDeclNode {
         name,
         value,
         kind: DeclKind::Var,
         is_mutable: true,
         pos,
      }))
   }

   /// Parses a `let name: expr` declaration. Bindings introduced with `let`
   /// are immutable.
   fn parse_let_declaration(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.advance(); // the 'let' keyword

      if !self.check(TokenKind::Identifier) {
         self.error_at_current("Expected a variable name after 'let'.");
         return None;
      }

      let name = self.current.lexeme.clone();
      self.advance();

      self.consume_punctuation(":", "Expected ':' after variable name.");
      let value = self.parse_expression(0)?;
      self.matches_punctuation(";");

      Some(AstNode::VariableDecl(VariableDeclNode {
         name,
         value: Some(Box::new(value)),
         kind: DeclKind::Let,
         is_mutable: false,
         pos,
      }))
   }

   /// Parses a statement of the form `name: ...`, which is one of:
   /// - `name: fn(params) body` — a function definition;
   /// - `name: iterable` followed by an indented block — a naked iterator;
   /// - `name: expr` — an implicit (mutable) variable declaration.
   fn parse_colon_statement(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      let name = self.current.lexeme.clone();
      self.advance(); // the identifier
      self.advance(); // the ':'

      if self.check_keyword("fn") {
         self.advance();

         let params = self.parse_parameter_list()?;
         let body = self.parse_body()?;

         return Some(AstNode::FunctionDef(FunctionDefNode {
            name,
            params,
            body: Box::new(body),
            pos,
         }));
      }

      let value = self.parse_expression(0)?;

      // A range, array, or variable initializer followed by an indented
      // block is a naked iterator rather than a declaration.
      let iterates = matches!(
         value,
         AstNode::Range(_) | AstNode::ArrayLiteral(_) | AstNode::Variable(_)
      );

      if iterates && self.check(TokenKind::Newline) && self.peek_next_token().kind == TokenKind::Indent
      {
         let body = self.parse_indented_block()?;

         return Some(AstNode::NakedIterator(NakedIteratorNode {
            variable: name,
            iterable: Box::new(value),
            body: Box::new(body),
            pos,
         }));
      }

      self.matches_punctuation(";");

      Some(AstNode::VariableDecl(VariableDeclNode {
         name,
         value: Some(Box::new(value)),
         kind: DeclKind::Implicit,
         is_mutable: true,
         pos,
      }))
   }

   /// Parses an import statement. The path is the joined token spelling, for
   /// example `utils.ember` or `ember/net`.
   fn parse_import_statement(&mut self) -> Option<AstNode> {
      let pos = self.current.pos();
      self.advance(); // the 'import' keyword

      if !self.check(TokenKind::Identifier) {
         self.error_at_current("Expected a module path after 'import'.");
         return None;
      }

      let mut path = self.current.lexeme.clone();
      self.advance();

      loop {
         if self.check_punctuation(".") {
            path.push('.');
         } else if self.check_operator("/") {
            path.push('/');
         } else {
            break;
         }
         self.advance();

         if !self.check(TokenKind::Identifier) {
            self.error_at_current("Expected a path segment after separator.");
            return None;
         }

         path.push_str(&self.current.lexeme);
         self.advance();
      }

      self.matches_punctuation(";");

      Some(AstNode::Import(ImportNode { path, pos }))
   }
}
