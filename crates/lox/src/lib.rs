//! Two interpreters for the Lox language sharing one lexer, one diagnostics
//! format, and one CLI harness.
//!
//! `bytecode` is the single-pass compiler and stack VM (the default,
//! "production" tier); the other modules (`scanner` through `interpreter`)
//! make up the tree-walker. Both expose a `run`-shaped entry point so the CLI
//! and the fixture tests can drive either one identically.

pub mod ast;
pub mod bytecode;
pub mod diagnostics;
pub mod environment;
pub mod interpreter;
pub mod io;
pub mod parser;
pub mod repl;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use diagnostics::Outcome;
use environment::Environment;
use io::PrintWriter;

pub use bytecode::Vm;

/// A persistent tree-walker session.
///
/// Holds the global environment across calls so a REPL can define a variable
/// on one line and read it back on the next; `'src` is the lifetime of every
/// line of source text ever fed to this session (see `repl::ReplSession`, the
/// driver's source-retention buffer).
pub struct TreeWalker<'src> {
    globals: Environment<'src>,
}

impl<'src> Default for TreeWalker<'src> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'src> TreeWalker<'src> {
    #[must_use]
    pub fn new() -> Self {
        Self { globals: interpreter::globals() }
    }

    /// Scans, parses, resolves, and executes `source` against this session's
    /// globals.
    ///
    /// Stops at the first stage that reports an error: a non-empty set of
    /// scan/parse errors and a non-empty set of resolver errors are both
    /// reported as `Outcome::CompileError` without ever reaching the
    /// interpreter, matching jlox's "don't run code that doesn't pass the
    /// static checks" rule.
    pub fn run(&mut self, source: &'src str, output: &mut dyn PrintWriter) -> Outcome {
        let tokens = scanner::scan_all(source);
        let (statements, parse_errors) = parser::parse(tokens);
        if !parse_errors.is_empty() {
            return Outcome::CompileError(parse_errors);
        }

        let (resolved, resolve_errors) = resolver::resolve(&statements);
        if !resolve_errors.is_empty() {
            return Outcome::CompileError(resolve_errors);
        }

        match interpreter::interpret(&statements, &resolved, &self.globals, output) {
            Ok(()) => Outcome::Ok,
            Err(err) => Outcome::RuntimeError(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use io::CollectStringPrint;

    #[test]
    fn tree_walker_session_keeps_globals_across_run_calls() {
        let mut session = TreeWalker::new();
        let mut output = CollectStringPrint::default();
        assert_eq!(session.run("var a = 1;", &mut output), Outcome::Ok);
        assert_eq!(session.run("a = a + 1; print a;", &mut output), Outcome::Ok);
        assert_eq!(output.into_output(), "2\n");
    }

    #[test]
    fn tree_walker_reports_resolver_errors_without_running() {
        let mut session = TreeWalker::new();
        let mut output = CollectStringPrint::default();
        let outcome = session.run("return 1;", &mut output);
        assert!(matches!(outcome, Outcome::CompileError(_)));
        assert_eq!(output.into_output(), "");
    }
}
