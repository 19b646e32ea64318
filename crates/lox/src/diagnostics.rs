//! Shared error types rendered identically by the tree-walker and the bytecode VM.

use std::fmt;

/// A single error produced while scanning, parsing, resolving, or compiling.
///
/// Multiple of these can accumulate for one run; the front end prints each on
/// its own line and reports a nonzero exit status once any exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub line: u32,
    pub location: ErrorLocation,
    pub message: String,
}

/// Where in the token stream a `CompileError` occurred, for the `at '...'`/`at end`
/// suffix in the rendered diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    /// The error is not anchored to a specific lexeme (e.g. a resolver-only check).
    None,
    /// The error occurred at end of input.
    End,
    /// The error occurred at the given lexeme.
    Lexeme(String),
}

impl CompileError {
    #[must_use]
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self { line, location: ErrorLocation::None, message: message.into() }
    }

    #[must_use]
    pub fn at_end(line: u32, message: impl Into<String>) -> Self {
        Self { line, location: ErrorLocation::End, message: message.into() }
    }

    #[must_use]
    pub fn at_lexeme(line: u32, lexeme: impl Into<String>, message: impl Into<String>) -> Self {
        Self { line, location: ErrorLocation::Lexeme(lexeme.into()), message: message.into() }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.location {
            ErrorLocation::None => {}
            ErrorLocation::End => write!(f, " at end")?,
            ErrorLocation::Lexeme(lexeme) => write!(f, " at '{lexeme}'")?,
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// An error raised while executing already-compiled or already-resolved code.
///
/// Unlike `CompileError`, only one of these can occur per run: execution stops
/// at the first runtime error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub line: u32,
    pub message: String,
}

impl RuntimeError {
    #[must_use]
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n[line {}]", self.message, self.line)
    }
}

impl std::error::Error for RuntimeError {}

/// The result of a single `run` call against either tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    CompileError(Vec<CompileError>),
    RuntimeError(RuntimeError),
}

impl Outcome {
    /// The process exit code this outcome maps to, per the CLI's exit-code contract.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::CompileError(_) => 65,
            Self::RuntimeError(_) => 70,
        }
    }

    /// Prints every error this outcome carries to stderr, one per line.
    ///
    /// Shared by both CLI binaries so the tree-walker and the bytecode VM
    /// render diagnostics identically.
    pub fn report(&self) {
        match self {
            Self::Ok => {}
            Self::CompileError(errors) => {
                for error in errors {
                    eprintln!("{error}");
                }
            }
            Self::RuntimeError(error) => eprintln!("{error}"),
        }
    }
}
