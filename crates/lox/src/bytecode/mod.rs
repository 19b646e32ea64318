//! The bytecode-compiled interpreter tier: a single-pass compiler emitting
//! directly to a `Chunk`, executed by a stack-based `Vm`.
//!
//! Scanning is shared with the tree-walker (see `crate::scanner`); everything
//! downstream of tokens is specific to this tier.

pub mod chunk;
pub mod compiler;
pub mod object;
pub mod table;
pub mod value;
pub mod vm;

pub use vm::Vm;

use crate::{diagnostics::Outcome, io::PrintWriter};

/// Compiles and runs one chunk of source against a persistent `Vm` session.
///
/// This is the entry point both `lox.rs` (file/REPL mode) and the fixture
/// tests drive; `vm` carries the globals and string intern table across
/// calls, so a REPL can build state across lines.
pub fn run(source: &str, vm: &mut Vm, output: &mut dyn PrintWriter) -> Outcome {
    let chunk = match compiler::compile(source, vm) {
        Ok(chunk) => chunk,
        Err(errors) => return Outcome::CompileError(errors),
    };

    match vm.run(&chunk, output) {
        Ok(()) => Outcome::Ok,
        Err(err) => Outcome::RuntimeError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CollectStringPrint;

    #[test]
    fn compiles_and_runs_a_print_statement() {
        let mut vm = Vm::new();
        let mut output = CollectStringPrint::default();
        let outcome = run("print 1 + 2;", &mut vm, &mut output);
        assert_eq!(outcome, Outcome::Ok);
        assert_eq!(output.into_output(), "3\n");
    }

    #[test]
    fn globals_persist_across_separate_run_calls() {
        let mut vm = Vm::new();
        let mut output = CollectStringPrint::default();
        assert_eq!(run("var a = 1;", &mut vm, &mut output), Outcome::Ok);
        assert_eq!(run("a = a + 1; print a;", &mut vm, &mut output), Outcome::Ok);
        assert_eq!(output.into_output(), "2\n");
    }

    #[test]
    fn syntax_error_reports_as_compile_error() {
        let mut vm = Vm::new();
        let mut output = CollectStringPrint::default();
        let outcome = run("print ;", &mut vm, &mut output);
        assert!(matches!(outcome, Outcome::CompileError(_)));
    }

    #[test]
    fn operand_type_mismatch_reports_as_runtime_error() {
        let mut vm = Vm::new();
        let mut output = CollectStringPrint::default();
        let outcome = run("print 1 + \"a\";", &mut vm, &mut output);
        assert!(matches!(outcome, Outcome::RuntimeError(_)));
    }
}
