//! The stack-based bytecode interpreter: clox's `vm.c` dispatch loop.
//!
//! A `Vm` is the persistent part of a bytecode session: the value stack, the
//! globals table, the string intern table, and the object heap all outlive
//! any single `run`, so a REPL can define a variable on one line and read it
//! back on the next.

use std::rc::Rc;

use smallvec::SmallVec;

use super::{
    chunk::{Chunk, OpCode},
    object::{Heap, ObjString, fnv1a},
    table::Table,
    value::Value,
};
use crate::{diagnostics::RuntimeError, io::PrintWriter};

const STACK_MAX: usize = 256;

/// The value stack rarely holds more than a handful of entries for this
/// core's expression-only workloads; `SmallVec` keeps it off the heap until
/// a program actually needs the full 256 slots.
type Stack = SmallVec<[Value; STACK_MAX]>;

pub struct Vm {
    heap: Heap,
    strings: Table<()>,
    globals: Table<Value>,
    stack: Stack,
}

impl Default for Vm {
    fn default() -> Self {
        Self { heap: Heap::new(), strings: Table::new(), globals: Table::new(), stack: Stack::new() }
    }
}

impl Vm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `chars`, reusing an existing allocation when the content
    /// already has one (clox's `copy_string`/`takeString` split, collapsed
    /// since Rust strings aren't independently ownable by a lexeme slice).
    pub(super) fn intern_string(&mut self, chars: &str) -> Rc<ObjString> {
        let hash = fnv1a(chars.as_bytes());
        if let Some(existing) = self.strings.find_string(chars, hash) {
            return existing;
        }
        let obj = self.heap.alloc_string(chars.into());
        self.strings.set(obj.clone(), ());
        obj
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("compiler only emits pops balanced by prior pushes")
    }

    fn peek(&self, distance: usize) -> &Value {
        &self.stack[self.stack.len() - 1 - distance]
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
    }

    /// Executes `chunk` to completion (or until a runtime error), writing any
    /// `print` output to `output`.
    pub fn run(&mut self, chunk: &Chunk, output: &mut dyn PrintWriter) -> Result<(), RuntimeError> {
        let mut ip = 0usize;
        let mut error: Option<RuntimeError> = None;

        loop {
            let Some(&opcode_byte) = chunk.code.get(ip) else { break };
            let line = chunk.lines[ip];
            let op = OpCode::from_repr(opcode_byte).expect("compiler only ever emits valid opcodes");
            ip += 1;

            macro_rules! read_u8 {
                () => {{
                    let byte = chunk.code[ip];
                    ip += 1;
                    byte
                }};
            }
            macro_rules! read_constant {
                () => {{
                    let index = read_u8!();
                    chunk.constants[index as usize].clone()
                }};
            }
            macro_rules! runtime_error {
                ($($arg:tt)*) => {{
                    error = Some(RuntimeError::new(line, format!($($arg)*)));
                    break;
                }};
            }
            macro_rules! binary_numeric_op {
                ($make:expr) => {{
                    let (Value::Number(b), Value::Number(a)) = (self.peek(0).clone(), self.peek(1).clone()) else {
                        runtime_error!("Operands must be numbers.");
                    };
                    self.pop();
                    self.pop();
                    #[expect(clippy::redundant_closure_call)]
                    self.push($make(a, b));
                }};
            }

            match op {
                OpCode::Constant => {
                    let value = read_constant!();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = read_u8!();
                    self.push(self.stack[slot as usize].clone());
                }
                OpCode::SetLocal => {
                    let slot = read_u8!();
                    self.stack[slot as usize] = self.peek(0).clone();
                }
                OpCode::GetGlobal => {
                    let Value::String(name) = read_constant!() else {
                        unreachable!("compiler only emits string constants as global-name operands")
                    };
                    match self.globals.get(&name) {
                        Some(value) => {
                            let value = value.clone();
                            self.push(value);
                        }
                        None => runtime_error!("Undefined variable '{}'.", name.chars),
                    }
                }
                OpCode::DefineGlobal => {
                    let Value::String(name) = read_constant!() else {
                        unreachable!("compiler only emits string constants as global-name operands")
                    };
                    let value = self.pop();
                    self.globals.set(name, value);
                }
                OpCode::SetGlobal => {
                    let Value::String(name) = read_constant!() else {
                        unreachable!("compiler only emits string constants as global-name operands")
                    };
                    let value = self.peek(0).clone();
                    if self.globals.set(name.clone(), value) {
                        // `set` reports a fresh key, meaning this global was
                        // never defined: undo the insert per the "assignment
                        // never creates a global" rule.
                        self.globals.delete(&name);
                        runtime_error!("Undefined variable '{}'.", name.chars);
                    }
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => binary_numeric_op!(|a, b| Value::Bool(a > b)),
                OpCode::Less => binary_numeric_op!(|a, b| Value::Bool(a < b)),
                OpCode::Add => match (self.peek(0), self.peek(1)) {
                    (Value::Number(_), Value::Number(_)) => binary_numeric_op!(|a, b| Value::Number(a + b)),
                    (Value::String(_), Value::String(_)) => {
                        let Value::String(b) = self.pop() else { unreachable!() };
                        let Value::String(a) = self.pop() else { unreachable!() };
                        let concatenated = format!("{}{}", a.chars, b.chars);
                        let interned = self.intern_string(&concatenated);
                        self.push(Value::String(interned));
                    }
                    _ => runtime_error!("Operands must be two numbers or two strings."),
                },
                OpCode::Subtract => binary_numeric_op!(|a, b| Value::Number(a - b)),
                OpCode::Multiply => binary_numeric_op!(|a, b| Value::Number(a * b)),
                OpCode::Divide => binary_numeric_op!(|a, b| Value::Number(a / b)),
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(!value.is_truthy()));
                }
                OpCode::Negate => {
                    let Value::Number(n) = self.peek(0) else {
                        runtime_error!("Operand must be a number.");
                    };
                    let n = *n;
                    self.pop();
                    self.push(Value::Number(-n));
                }
                OpCode::Print => {
                    let value = self.pop();
                    output.print_line(&value.to_string());
                }
                OpCode::Return => break,
            }
        }

        if let Some(err) = error {
            self.reset_stack();
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CollectStringPrint;

    fn run_chunk(chunk: &Chunk) -> (Vm, Result<(), RuntimeError>, String) {
        let mut vm = Vm::new();
        let mut output = CollectStringPrint::default();
        let result = vm.run(chunk, &mut output);
        let printed = output.into_output();
        (vm, result, printed)
    }

    #[test]
    fn arithmetic_and_print() {
        let mut chunk = Chunk::new();
        let one = chunk.add_constant(Value::Number(1.0)).unwrap();
        let two = chunk.add_constant(Value::Number(2.0)).unwrap();
        chunk.write_op_u8(OpCode::Constant, one, 1);
        chunk.write_op_u8(OpCode::Constant, two, 1);
        chunk.write_op(OpCode::Add, 1);
        chunk.write_op(OpCode::Print, 1);
        chunk.write_op(OpCode::Return, 1);

        let (_vm, result, printed) = run_chunk(&chunk);
        assert!(result.is_ok());
        assert_eq!(printed, "3\n");
    }

    #[test]
    fn undefined_global_read_is_a_runtime_error() {
        let mut chunk = Chunk::new();
        let mut vm = Vm::new();
        let name = vm.intern_string("missing");
        let index = chunk.add_constant(Value::String(name)).unwrap();
        chunk.write_op_u8(OpCode::GetGlobal, index, 7);

        let mut output = CollectStringPrint::default();
        let err = vm.run(&chunk, &mut output).unwrap_err();
        assert_eq!(err.message, "Undefined variable 'missing'.");
        assert_eq!(err.line, 7);
    }

    #[test]
    fn assigning_to_undefined_global_does_not_create_it() {
        let mut chunk = Chunk::new();
        let mut vm = Vm::new();
        let name = vm.intern_string("ghost");
        let name_index = chunk.add_constant(Value::String(name.clone())).unwrap();
        let value_index = chunk.add_constant(Value::Number(1.0)).unwrap();
        chunk.write_op_u8(OpCode::Constant, value_index, 1);
        chunk.write_op_u8(OpCode::SetGlobal, name_index, 1);

        let mut output = CollectStringPrint::default();
        assert!(vm.run(&chunk, &mut output).is_err());
        assert!(vm.globals.get(&name).is_none());
    }

    #[test]
    fn get_local_and_set_local_address_the_value_stack_directly() {
        // The compiler never emits these in the specified core, but the VM
        // still has to honor them: construct the chunk by hand.
        let mut chunk = Chunk::new();
        let forty_two = chunk.add_constant(Value::Number(42.0)).unwrap();
        let zero = chunk.add_constant(Value::Number(0.0)).unwrap();
        chunk.write_op_u8(OpCode::Constant, forty_two, 1); // slot 0
        chunk.write_op_u8(OpCode::Constant, zero, 1); // slot 1, about to be overwritten
        chunk.write_op_u8(OpCode::GetLocal, 0, 1);
        chunk.write_op_u8(OpCode::SetLocal, 1, 1);
        chunk.write_op(OpCode::Pop, 1);
        chunk.write_op(OpCode::Print, 1);
        chunk.write_op(OpCode::Return, 1);

        let (_vm, result, printed) = run_chunk(&chunk);
        assert!(result.is_ok());
        assert_eq!(printed, "42\n");
    }

    #[test]
    fn string_concatenation_interns_the_result() {
        let mut chunk = Chunk::new();
        let mut vm = Vm::new();
        let a = vm.intern_string("foo");
        let b = vm.intern_string("bar");
        let a_idx = chunk.add_constant(Value::String(a)).unwrap();
        let b_idx = chunk.add_constant(Value::String(b)).unwrap();
        chunk.write_op_u8(OpCode::Constant, a_idx, 1);
        chunk.write_op_u8(OpCode::Constant, b_idx, 1);
        chunk.write_op(OpCode::Add, 1);
        chunk.write_op(OpCode::Print, 1);
        chunk.write_op(OpCode::Return, 1);

        let mut output = CollectStringPrint::default();
        vm.run(&chunk, &mut output).unwrap();
        assert_eq!(output.into_output(), "foobar\n");
    }
}
