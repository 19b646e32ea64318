//! Integration tests for the bytecode tier: compiling a chunk and checking
//! both the emitted instructions and the VM's observable behavior running it.

use lox::bytecode::{
    Vm,
    chunk::{Chunk, OpCode, disassemble_instruction},
    compiler,
};
use lox::io::CollectStringPrint;
use pretty_assertions::assert_eq;

/// Walks `chunk` the way `disassemble_chunk` does, returning each
/// instruction's opcode in order. Skips past multi-byte operands instead of
/// misreading them as opcodes.
fn opcodes(chunk: &Chunk) -> Vec<OpCode> {
    let mut ops = Vec::new();
    let mut offset = 0;
    while offset < chunk.code.len() {
        ops.push(OpCode::from_repr(chunk.code[offset]).expect("valid opcode byte"));
        offset = disassemble_instruction(chunk, offset);
    }
    ops
}

#[test]
fn a_print_statement_compiles_to_constant_constant_add_print() {
    let mut vm = Vm::new();
    let chunk = compiler::compile("print 1 + 2;", &mut vm).expect("valid source should compile");

    assert_eq!(opcodes(&chunk), vec![OpCode::Constant, OpCode::Constant, OpCode::Add, OpCode::Print, OpCode::Return]);
}

#[test]
fn assigning_to_an_undeclared_global_is_a_runtime_error() {
    let mut vm = Vm::new();
    let mut output = CollectStringPrint::default();
    let outcome = lox::bytecode::run("a = 1;", &mut vm, &mut output);
    assert_eq!(outcome.exit_code(), 70);
}

#[test]
fn globals_defined_in_one_chunk_are_visible_in_the_next() {
    let mut vm = Vm::new();
    let mut output = CollectStringPrint::default();

    let first = lox::bytecode::run("var greeting = \"hi\";", &mut vm, &mut output);
    assert_eq!(first.exit_code(), 0);

    let second = lox::bytecode::run("print greeting;", &mut vm, &mut output);
    assert_eq!(second.exit_code(), 0);
    assert_eq!(output.into_output(), "hi\n");
}

#[test]
fn string_equality_compares_contents_not_identity() {
    let mut vm = Vm::new();
    let mut output = CollectStringPrint::default();
    let outcome = lox::bytecode::run(r#"print ("a" + "b") == "ab";"#, &mut vm, &mut output);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(output.into_output(), "true\n");
}

#[test]
fn comparison_operators_require_numeric_operands() {
    let mut vm = Vm::new();
    let mut output = CollectStringPrint::default();
    let outcome = lox::bytecode::run(r#"print "a" < "b";"#, &mut vm, &mut output);
    assert_eq!(outcome.exit_code(), 70);
}
