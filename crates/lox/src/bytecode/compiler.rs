//! Single-pass Pratt compiler: scans and emits bytecode in one pass, with no
//! intermediate AST.
//!
//! Mirrors clox's `compiler.c`: a table of `(prefix, infix, precedence)` per
//! token kind drives `parse_precedence`, which consumes one prefix expression
//! then keeps folding in infix operators whose precedence is high enough.
//!
//! The specified core only covers literals, grouping, unary/binary operators,
//! global variable references (including assignment), `print`, expression
//! statements, and `var` declarations — no blocks, control flow, functions, or
//! classes in this tier (see the tree-walker for those).

use super::{
    chunk::{Chunk, OpCode},
    value::Value,
    vm::Vm,
};
use crate::{
    diagnostics::CompileError,
    scanner::Scanner,
    token::{Literal, Token, TokenKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    #[must_use]
    fn next(self) -> Self {
        match self {
            Self::None => Self::Assignment,
            Self::Assignment => Self::Or,
            Self::Or => Self::And,
            Self::And => Self::Equality,
            Self::Equality => Self::Comparison,
            Self::Comparison => Self::Term,
            Self::Term => Self::Factor,
            Self::Factor => Self::Unary,
            Self::Unary => Self::Call,
            Self::Call | Self::Primary => Self::Primary,
        }
    }
}

/// `(prefix_rule, infix_rule, precedence)` for one token kind, the core of
/// the Pratt table; `None` rules mean "this token never starts or continues
/// an expression".
type ParseFn = fn(&mut Compiler<'_, '_>, bool);

#[derive(Clone, Copy)]
struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

const fn rule(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> ParseRule {
    ParseRule { prefix, infix, precedence }
}

fn get_rule(kind: TokenKind) -> ParseRule {
    match kind {
        TokenKind::LeftParen => rule(Some(Compiler::grouping), None, Precedence::None),
        TokenKind::Minus => rule(Some(Compiler::unary), Some(Compiler::binary), Precedence::Term),
        TokenKind::Plus => rule(None, Some(Compiler::binary), Precedence::Term),
        TokenKind::Slash => rule(None, Some(Compiler::binary), Precedence::Factor),
        TokenKind::Star => rule(None, Some(Compiler::binary), Precedence::Factor),
        TokenKind::Bang => rule(Some(Compiler::unary), None, Precedence::None),
        TokenKind::BangEqual => rule(None, Some(Compiler::binary), Precedence::Equality),
        TokenKind::EqualEqual => rule(None, Some(Compiler::binary), Precedence::Equality),
        TokenKind::Greater => rule(None, Some(Compiler::binary), Precedence::Comparison),
        TokenKind::GreaterEqual => rule(None, Some(Compiler::binary), Precedence::Comparison),
        TokenKind::Less => rule(None, Some(Compiler::binary), Precedence::Comparison),
        TokenKind::LessEqual => rule(None, Some(Compiler::binary), Precedence::Comparison),
        TokenKind::Identifier => rule(Some(Compiler::variable), None, Precedence::None),
        TokenKind::String => rule(Some(Compiler::string), None, Precedence::None),
        TokenKind::Number => rule(Some(Compiler::number), None, Precedence::None),
        TokenKind::False | TokenKind::Nil | TokenKind::True => rule(Some(Compiler::literal), None, Precedence::None),
        _ => rule(None, None, Precedence::None),
    }
}

/// Parses and compiles `source` into a fresh `Chunk`, interning any string
/// constants through `vm`'s string table.
///
/// # Errors
/// Returns every syntax error collected during panic-mode recovery; the
/// caller should treat a non-empty result as a `CompileError` outcome and
/// discard the partially emitted chunk.
pub fn compile(source: &str, vm: &mut Vm) -> Result<Chunk, Vec<CompileError>> {
    let mut scanner = Scanner::new(source);
    let current = scanner.scan_token();
    let mut compiler = Compiler {
        scanner,
        vm,
        chunk: Chunk::new(),
        previous: current.clone(),
        current,
        errors: Vec::new(),
        panic_mode: false,
    };

    while !compiler.check(TokenKind::Eof) {
        compiler.declaration();
    }
    compiler.consume(TokenKind::Eof, "Expect end of expression.");
    compiler.emit_return();

    if compiler.errors.is_empty() { Ok(compiler.chunk) } else { Err(compiler.errors) }
}

struct Compiler<'src, 'vm> {
    scanner: Scanner<'src>,
    vm: &'vm mut Vm,
    chunk: Chunk,
    previous: Token<'src>,
    current: Token<'src>,
    errors: Vec<CompileError>,
    panic_mode: bool,
}

impl<'src> Compiler<'src, '_> {
    fn advance(&mut self) {
        self.previous = self.current.clone();
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let Literal::Error(message) = self.current.literal.clone() else {
                unreachable!("scanner always attaches Literal::Error to Error tokens")
            };
            self.error_at_current(&message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current.clone();
        self.error_at(&token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.previous.clone();
        self.error_at(&token, message);
    }

    fn error_at(&mut self, token: &Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let error = match token.kind {
            TokenKind::Eof => CompileError::at_end(token.line, message),
            TokenKind::Error => CompileError::new(token.line, message),
            _ => CompileError::at_lexeme(token.line, token.lexeme, message),
        };
        self.errors.push(error);
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.chunk.write_byte(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        let line = self.previous.line;
        self.chunk.write_op(op, line);
    }

    fn emit_op_u8(&mut self, op: OpCode, operand: u8) {
        let line = self.previous.line;
        self.chunk.write_op_u8(op, operand, line);
    }

    fn emit_return(&mut self) {
        self.emit_op(OpCode::Return);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk.add_constant(value) {
            Ok(index) => index,
            Err(message) => {
                self.error(message);
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_u8(OpCode::Constant, index);
    }

    /// Interns `name`'s lexeme as a global-name constant, matching clox's
    /// `identifierConstant`: the global is looked up by name at runtime, so
    /// its constant slot just needs to be a string, not a resolved depth.
    fn identifier_constant(&mut self, name: &Token<'src>) -> u8 {
        let interned = self.vm.intern_string(name.lexeme);
        self.make_constant(Value::String(interned))
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = get_rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= get_rule(self.current.kind).precedence {
            self.advance();
            let infix = get_rule(self.previous.kind).infix.expect("infix rule must exist for a token with a precedence");
            infix(self, can_assign);
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn declaration(&mut self) {
        if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect variable name.");
        let global = self.identifier_constant(&self.previous.clone());

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.emit_op_u8(OpCode::DefineGlobal, global);
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.check(TokenKind::Eof) {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => self.advance(),
            }
        }
    }

    fn number(&mut self, _can_assign: bool) {
        let Literal::Number(value) = self.previous.literal.clone() else {
            unreachable!("scanner always attaches Literal::Number to Number tokens")
        };
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self, _can_assign: bool) {
        let Literal::String(value) = self.previous.literal.clone() else {
            unreachable!("scanner always attaches Literal::String to String tokens")
        };
        let interned = self.vm.intern_string(&value);
        self.emit_constant(Value::String(interned));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            _ => unreachable!("get_rule only wires literal() to false/nil/true"),
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Bang => self.emit_op(OpCode::Not),
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            _ => unreachable!("get_rule only wires unary() to bang/minus"),
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        let rule = get_rule(operator);
        self.parse_precedence(rule.precedence.next());

        match operator {
            TokenKind::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            _ => unreachable!("get_rule only wires binary() to arithmetic/comparison/equality tokens"),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.clone();
        let arg = self.identifier_constant(&name);
        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op_u8(OpCode::SetGlobal, arg);
        } else {
            self.emit_op_u8(OpCode::GetGlobal, arg);
        }
    }
}
