//! Runs every `tests/fixtures/*.lox` program through both interpreter tiers
//! and checks their stdout against a recorded `.lox.out` file, directly
//! exercising the byte-identical-stdout property between the tree-walker and
//! the bytecode VM.

use std::fs;

use datatest_stable::Utf8Path;
use lox::{TreeWalker, Vm, bytecode, io::CollectStringPrint};
use pretty_assertions::assert_eq;

fn run_fixture(path: &Utf8Path) -> datatest_stable::Result<()> {
    let source = fs::read_to_string(path)?;
    let expected = fs::read_to_string(format!("{path}.out"))?;

    let mut tree_walker = TreeWalker::new();
    let mut tree_walker_output = CollectStringPrint::default();
    let tree_walker_outcome = tree_walker.run(&source, &mut tree_walker_output);
    assert!(matches!(tree_walker_outcome, lox::diagnostics::Outcome::Ok), "{path}: tree-walker failed: {tree_walker_outcome:?}");

    let mut vm = Vm::new();
    let mut bytecode_output = CollectStringPrint::default();
    let bytecode_outcome = bytecode::run(&source, &mut vm, &mut bytecode_output);
    assert!(matches!(bytecode_outcome, lox::diagnostics::Outcome::Ok), "{path}: bytecode VM failed: {bytecode_outcome:?}");

    let tree_walker_output = tree_walker_output.into_output();
    let bytecode_output = bytecode_output.into_output();

    assert_eq!(tree_walker_output, expected, "{path}: tree-walker stdout did not match the recorded fixture");
    assert_eq!(bytecode_output, expected, "{path}: bytecode VM stdout did not match the recorded fixture");
    assert_eq!(tree_walker_output, bytecode_output, "{path}: the two tiers disagreed on stdout");

    Ok(())
}

datatest_stable::harness!(run_fixture, "tests/fixtures", r"\.lox$");
