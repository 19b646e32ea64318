//! Lexical analysis, shared verbatim by both the tree-walker and the compiler.
//!
//! `Scanner::scan_token` is the single definition of the language's lexical
//! grammar; the tree-walker front end drains it eagerly into a `Vec<Token>`
//! while the bytecode compiler pulls tokens one at a time as it parses.

use crate::token::{Literal, Token, TokenKind, keyword};

pub struct Scanner<'src> {
    source: &'src str,
    bytes: &'src [u8],
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Scanner<'src> {
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self { source, bytes: source.as_bytes(), start: 0, current: 0, line: 1 }
    }

    /// Scans and returns the next token, including a terminal `Eof` once input is
    /// exhausted. Calling this again after `Eof` keeps returning `Eof`.
    pub fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace_and_comments();
        self.start = self.current;

        let Some(c) = self.advance() else {
            return self.make(TokenKind::Eof, Literal::None);
        };

        match c {
            b'(' => self.make(TokenKind::LeftParen, Literal::None),
            b')' => self.make(TokenKind::RightParen, Literal::None),
            b'{' => self.make(TokenKind::LeftBrace, Literal::None),
            b'}' => self.make(TokenKind::RightBrace, Literal::None),
            b',' => self.make(TokenKind::Comma, Literal::None),
            b'.' => self.make(TokenKind::Dot, Literal::None),
            b'-' => self.make(TokenKind::Minus, Literal::None),
            b'+' => self.make(TokenKind::Plus, Literal::None),
            b';' => self.make(TokenKind::Semicolon, Literal::None),
            b'*' => self.make(TokenKind::Star, Literal::None),
            b'!' => {
                let kind = if self.matches(b'=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.make(kind, Literal::None)
            }
            b'=' => {
                let kind = if self.matches(b'=') { TokenKind::EqualEqual } else { TokenKind::Equal };
                self.make(kind, Literal::None)
            }
            b'<' => {
                let kind = if self.matches(b'=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.make(kind, Literal::None)
            }
            b'>' => {
                let kind = if self.matches(b'=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.make(kind, Literal::None)
            }
            b'/' => self.make(TokenKind::Slash, Literal::None),
            b'"' => self.string(),
            b'0'..=b'9' => self.number(),
            c if is_alpha(c) => self.identifier(),
            _ => self.error_token("Unexpected character."),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\r' | b'\t') => {
                    self.current += 1;
                }
                Some(b'\n') => {
                    self.line += 1;
                    self.current += 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.current += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> Token<'src> {
        while let Some(c) = self.peek() {
            if c == b'"' {
                break;
            }
            if c == b'\n' {
                self.line += 1;
            }
            self.current += 1;
        }

        if self.peek().is_none() {
            return self.error_token("Unterminated string.");
        }

        // Consume the closing quote.
        self.current += 1;
        let value = self.source[self.start + 1..self.current - 1].to_owned();
        self.make(TokenKind::String, Literal::String(value))
    }

    fn number(&mut self) -> Token<'src> {
        while self.peek().is_some_and(is_digit) {
            self.current += 1;
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(is_digit) {
            self.current += 1;
            while self.peek().is_some_and(is_digit) {
                self.current += 1;
            }
        }
        let text = &self.source[self.start..self.current];
        let value: f64 = text.parse().expect("number lexeme is always valid float syntax");
        self.make(TokenKind::Number, Literal::Number(value))
    }

    fn identifier(&mut self) -> Token<'src> {
        while self.peek().is_some_and(is_alphanumeric) {
            self.current += 1;
        }
        let text = &self.source[self.start..self.current];
        let kind = keyword(text).unwrap_or(TokenKind::Identifier);
        self.make(kind, Literal::None)
    }

    fn make(&self, kind: TokenKind, literal: Literal) -> Token<'src> {
        Token::new(kind, &self.source[self.start..self.current], self.line, literal)
    }

    fn error_token(&self, message: &str) -> Token<'src> {
        Token::new(TokenKind::Error, &self.source[self.start..self.current], self.line, Literal::Error(message.to_owned()))
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.current += 1;
        Some(c)
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.current).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.current + offset).copied()
    }
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_alphanumeric(c: u8) -> bool {
    is_alpha(c) || is_digit(c)
}

/// Eagerly collects every token from `source`, for the tree-walker front end.
///
/// The returned vector always ends with a single `TokenKind::Eof`.
#[must_use]
pub fn scan_all(source: &str) -> Vec<Token<'_>> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.scan_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_arithmetic_expression() {
        let tokens = scan_all("1 + 2 * 3");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Number, TokenKind::Plus, TokenKind::Number, TokenKind::Star, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn tracks_line_numbers_across_newlines() {
        let tokens = scan_all("var a = 1;\nvar b = 2;");
        let b_token = tokens.iter().find(|t| t.lexeme == "b").unwrap();
        assert_eq!(b_token.line, 2);
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        let tokens = scan_all("\"abc");
        assert_eq!(tokens[0].kind, TokenKind::Error);
    }

    #[test]
    fn line_comments_are_skipped() {
        let tokens = scan_all("// comment\nvar a;");
        assert_eq!(tokens[0].kind, TokenKind::Var);
        assert_eq!(tokens[0].line, 2);
    }
}
