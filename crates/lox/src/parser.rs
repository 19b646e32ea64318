//! Recursive-descent parser for the tree-walker tier.
//!
//! Precedence, loosest to tightest: assignment, or, and, equality, comparison,
//! term, factor, unary, call, primary. Mirrors the grammar clox's single-pass
//! compiler encodes as a parse-rule table (see `bytecode::compiler`), but here
//! expressed directly as mutually recursive functions since the tree-walker
//! needs a full AST rather than emitted bytecode.

use std::rc::Rc;

use crate::{
    ast::{Expr, ExprIdGen, FunctionDecl, LiteralValue, Stmt},
    diagnostics::CompileError,
    token::{Literal, Token, TokenKind},
};

/// Sentinel signalling that an error was already recorded and the caller
/// should synchronize at the next statement boundary.
struct ParseError;

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    current: usize,
    errors: Vec<CompileError>,
    ids: ExprIdGen,
}

/// Parses a full program, returning whatever statements were successfully
/// recovered alongside every syntax error encountered.
#[must_use]
pub fn parse(tokens: Vec<Token<'_>>) -> (Vec<Stmt<'_>>, Vec<CompileError>) {
    let mut errors = Vec::new();
    let tokens: Vec<_> = tokens
        .into_iter()
        .filter(|token| {
            if token.kind != TokenKind::Error {
                return true;
            }
            let Literal::Error(message) = &token.literal else {
                unreachable!("scanner always attaches Literal::Error to Error tokens")
            };
            errors.push(CompileError::new(token.line, message.clone()));
            false
        })
        .collect();
    let mut parser = Parser { tokens, current: 0, errors, ids: ExprIdGen::default() };
    let mut statements = Vec::new();
    while !parser.is_at_end() {
        if let Some(stmt) = parser.declaration() {
            statements.push(stmt);
        }
    }
    (statements, parser.errors)
}

impl<'src> Parser<'src> {
    fn declaration(&mut self) -> Option<Stmt<'src>> {
        let result = if self.matches(TokenKind::Class) {
            self.class_declaration()
        } else if self.matches(TokenKind::Fun) {
            self.function("function").map(Stmt::Function)
        } else if self.matches(TokenKind::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt<'src>> {
        let name = self.consume(TokenKind::Identifier, "Expect class name.")?.clone();
        let superclass = if self.matches(TokenKind::Less) {
            self.consume(TokenKind::Identifier, "Expect superclass name.")?;
            let name_token = self.previous().clone();
            Some(Expr::Variable { id: self.ids.next(), name: name_token })
        } else {
            None
        };
        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;
        Ok(Stmt::Class { name, superclass, methods })
    }

    fn function(&mut self, kind: &str) -> ParseResult<Rc<FunctionDecl<'src>>> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name."))?.clone();
        self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name."))?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?.clone());
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt<'src>> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?.clone();
        let initializer =
            if self.matches(TokenKind::Equal) { Some(self.expression()?) } else { None };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> ParseResult<Stmt<'src>> {
        if self.matches(TokenKind::Print) {
            return self.print_statement();
        }
        if self.matches(TokenKind::Return) {
            return self.return_statement();
        }
        if self.matches(TokenKind::While) {
            return self.while_statement();
        }
        if self.matches(TokenKind::For) {
            return self.for_statement();
        }
        if self.matches(TokenKind::If) {
            return self.if_statement();
        }
        if self.matches(TokenKind::LeftBrace) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> ParseResult<Stmt<'src>> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt<'src>> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.expression()?) };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt<'src>> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// Desugars `for (init; cond; incr) body` into a `while` loop nested in a
    /// block that holds the initializer, matching the book's approach of not
    /// giving `for` its own runtime representation.
    fn for_statement(&mut self) -> ParseResult<Stmt<'src>> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.matches(TokenKind::Semicolon) {
            None
        } else if self.matches(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) { None } else { Some(self.expression()?) };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal { id: self.ids.next(), value: LiteralValue::Bool(true) });
        body = Stmt::While { condition, body: Box::new(body) };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt<'src>> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch =
            if self.matches(TokenKind::Else) { Some(Box::new(self.statement()?)) } else { None };
        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt<'src>>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt<'src>> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn expression(&mut self) -> ParseResult<Expr<'src>> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr<'src>> {
        let expr = self.or_expr()?;

        if self.matches(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;
            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign { id: self.ids.next(), name, value: Box::new(value) }),
                Expr::Get { object, name, .. } => {
                    Ok(Expr::Set { id: self.ids.next(), object, name, value: Box::new(value) })
                }
                _ => {
                    self.error_at(&equals, "Invalid assignment target.");
                    Ok(expr)
                }
            };
        }
        Ok(expr)
    }

    fn or_expr(&mut self) -> ParseResult<Expr<'src>> {
        let mut expr = self.and_expr()?;
        while self.matches(TokenKind::Or) {
            let op = self.previous().clone();
            let right = self.and_expr()?;
            expr = Expr::Logical { id: self.ids.next(), left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> ParseResult<Expr<'src>> {
        let mut expr = self.equality()?;
        while self.matches(TokenKind::And) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical { id: self.ids.next(), left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr<'src>> {
        let mut expr = self.comparison()?;
        while self.matches_any(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary { id: self.ids.next(), left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr<'src>> {
        let mut expr = self.term()?;
        while self.matches_any(&[TokenKind::Greater, TokenKind::GreaterEqual, TokenKind::Less, TokenKind::LessEqual]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary { id: self.ids.next(), left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr<'src>> {
        let mut expr = self.factor()?;
        while self.matches_any(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary { id: self.ids.next(), left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr<'src>> {
        let mut expr = self.unary()?;
        while self.matches_any(&[TokenKind::Slash, TokenKind::Star]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary { id: self.ids.next(), left: Box::new(expr), op, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr<'src>> {
        if self.matches_any(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary { id: self.ids.next(), op, right: Box::new(right) });
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr<'src>> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenKind::Dot) {
                let name = self.consume(TokenKind::Identifier, "Expect property name after '.'.")?.clone();
                expr = Expr::Get { id: self.ids.next(), object: Box::new(expr), name };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr<'src>) -> ParseResult<Expr<'src>> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= 255 {
                    self.error_at_current("Can't have more than 255 arguments.");
                }
                args.push(self.expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?.clone();
        Ok(Expr::Call { id: self.ids.next(), callee: Box::new(callee), paren, args })
    }

    fn primary(&mut self) -> ParseResult<Expr<'src>> {
        if self.matches(TokenKind::False) {
            return Ok(Expr::Literal { id: self.ids.next(), value: LiteralValue::Bool(false) });
        }
        if self.matches(TokenKind::True) {
            return Ok(Expr::Literal { id: self.ids.next(), value: LiteralValue::Bool(true) });
        }
        if self.matches(TokenKind::Nil) {
            return Ok(Expr::Literal { id: self.ids.next(), value: LiteralValue::Nil });
        }
        if self.matches(TokenKind::Number) {
            let Literal::Number(n) = self.previous().literal.clone() else {
                unreachable!("scanner always attaches Literal::Number to Number tokens")
            };
            return Ok(Expr::Literal { id: self.ids.next(), value: LiteralValue::Number(n) });
        }
        if self.matches(TokenKind::String) {
            let Literal::String(s) = self.previous().literal.clone() else {
                unreachable!("scanner always attaches Literal::String to String tokens")
            };
            return Ok(Expr::Literal { id: self.ids.next(), value: LiteralValue::String(s) });
        }
        if self.matches(TokenKind::Super) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenKind::Identifier, "Expect superclass method name.")?.clone();
            return Ok(Expr::Super { id: self.ids.next(), keyword, method });
        }
        if self.matches(TokenKind::This) {
            return Ok(Expr::This { id: self.ids.next(), keyword: self.previous().clone() });
        }
        if self.matches(TokenKind::Identifier) {
            return Ok(Expr::Variable { id: self.ids.next(), name: self.previous().clone() });
        }
        if self.matches(TokenKind::LeftParen) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping { id: self.ids.next(), expr: Box::new(expr) });
        }
        Err(self.error_at_current("Expect expression."))
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_any(&mut self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|&kind| self.matches(kind))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token<'src> {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token<'src> {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token<'src> {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<&Token<'src>> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error_at_current(message))
    }

    fn error_at_current(&mut self, message: &str) -> ParseError {
        let token = self.peek().clone();
        self.error_at(&token, message);
        ParseError
    }

    fn error_at(&mut self, token: &Token<'src>, message: &str) {
        let error = if token.kind == TokenKind::Eof {
            CompileError::at_end(token.line, message)
        } else {
            CompileError::at_lexeme(token.line, token.lexeme, message)
        };
        self.errors.push(error);
    }
}
