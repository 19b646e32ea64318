//! Negative scenarios: exact diagnostic messages and exit codes, checked
//! against both tiers where the scenario is in the bytecode VM's core.

use lox::{
    TreeWalker, Vm,
    bytecode::{self, compiler},
    diagnostics::Outcome,
    io::NoPrint,
};
use pretty_assertions::assert_eq;

fn tree_walker_outcome(source: &str) -> Outcome {
    let mut session = TreeWalker::new();
    let mut output = NoPrint;
    session.run(source, &mut output)
}

fn bytecode_outcome(source: &str) -> Outcome {
    let mut vm = Vm::new();
    let mut output = NoPrint;
    bytecode::run(source, &mut vm, &mut output)
}

#[test]
fn negating_a_string_is_a_runtime_error_in_both_tiers() {
    let source = r#"print -"x";"#;

    let tree_walker = tree_walker_outcome(source);
    assert_eq!(tree_walker.exit_code(), 70);
    let Outcome::RuntimeError(err) = tree_walker else { panic!("expected a runtime error, got {tree_walker:?}") };
    assert_eq!(err.message, "Operand must be a number.");

    let bytecode = bytecode_outcome(source);
    assert_eq!(bytecode.exit_code(), 70);
    let Outcome::RuntimeError(err) = bytecode else { panic!("expected a runtime error, got {bytecode:?}") };
    assert_eq!(err.message, "Operand must be a number.");
}

#[test]
fn reading_an_undefined_global_is_a_runtime_error_in_both_tiers() {
    let source = "var a; a = b;";

    let tree_walker = tree_walker_outcome(source);
    assert_eq!(tree_walker.exit_code(), 70);
    let Outcome::RuntimeError(err) = tree_walker else { panic!("expected a runtime error, got {tree_walker:?}") };
    assert_eq!(err.message, "Undefined variable 'b'.");

    let bytecode = bytecode_outcome(source);
    assert_eq!(bytecode.exit_code(), 70);
    let Outcome::RuntimeError(err) = bytecode else { panic!("expected a runtime error, got {bytecode:?}") };
    assert_eq!(err.message, "Undefined variable 'b'.");
}

#[test]
fn returning_from_top_level_code_is_a_resolver_error() {
    let outcome = tree_walker_outcome("return 1;");
    assert_eq!(outcome.exit_code(), 65);
    let Outcome::CompileError(errors) = outcome else { panic!("expected a compile error, got {outcome:?}") };
    assert!(
        errors.iter().any(|e| e.message.contains("Can't return from top-level code")),
        "errors did not mention top-level return: {errors:?}"
    );
}

#[test]
fn a_syntax_error_is_reported_with_the_offending_lexeme() {
    let outcome = tree_walker_outcome("var = 1;");
    assert_eq!(outcome.exit_code(), 65);
    assert!(matches!(outcome, Outcome::CompileError(_)));
}

#[test]
fn adding_a_number_to_a_string_is_a_runtime_error() {
    let source = r#"print 1 + "x";"#;

    let tree_walker = tree_walker_outcome(source);
    assert_eq!(tree_walker.exit_code(), 70);

    let bytecode = bytecode_outcome(source);
    assert_eq!(bytecode.exit_code(), 70);
    let Outcome::RuntimeError(err) = bytecode else { panic!("expected a runtime error, got {bytecode:?}") };
    assert_eq!(err.message, "Operands must be two numbers or two strings.");
}

#[test]
fn a_chunk_with_too_many_constants_fails_to_compile() {
    let mut source = String::new();
    for i in 0..257 {
        source.push_str(&format!("print {i}.0;\n"));
    }

    let mut vm = Vm::new();
    let result = compiler::compile(&source, &mut vm);
    let errors = result.expect_err("expected a compile error from exceeding the constant table");
    assert!(
        errors.iter().any(|e| e.message.contains("Too many constants in one chunk.")),
        "errors did not mention the constant table limit: {errors:?}"
    );
}

#[test]
fn undefined_variable_used_inside_its_own_initializer_is_a_resolver_error() {
    let outcome = tree_walker_outcome("var a = a;");
    assert_eq!(outcome.exit_code(), 65);
    let Outcome::CompileError(errors) = outcome else { panic!("expected a compile error, got {outcome:?}") };
    assert!(
        errors.iter().any(|e| e.message.contains("own initializer")),
        "errors did not mention the self-referential initializer: {errors:?}"
    );
}

#[test]
fn division_by_zero_produces_an_infinite_number_rather_than_a_runtime_error() {
    let source = "print 1 / 0;";
    assert_eq!(tree_walker_outcome(source).exit_code(), 0);
    assert_eq!(bytecode_outcome(source).exit_code(), 0);
}
