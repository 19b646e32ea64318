//! Bytecode chunks: a flat byte stream plus its parallel line map and constant pool.
//!
//! Mirrors clox's `Chunk`/`chunk.c` almost exactly; the one deliberate
//! deviation is the constant pool holding `bytecode::value::Value` directly
//! rather than a tagged `Obj*`, since Rust's `Value` already owns its heap
//! string reference.

use strum::FromRepr;

use super::value::Value;

/// One instruction in the chunk's bytecode, per §3 of the instruction table.
///
/// `#[repr(u8)]` plus `FromRepr` gives us the opcode ↔ byte round-trip the
/// dispatch loop and disassembler both need without a hand-written match arm
/// for every numeric discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum OpCode {
    Constant,
    Nil,
    True,
    False,
    Pop,
    GetLocal,
    SetLocal,
    GetGlobal,
    DefineGlobal,
    SetGlobal,
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,
    Print,
    Return,
}

impl OpCode {
    /// Human-readable mnemonic used by the disassembler, matching clox's `debug.c` naming.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Constant => "OP_CONSTANT",
            Self::Nil => "OP_NIL",
            Self::True => "OP_TRUE",
            Self::False => "OP_FALSE",
            Self::Pop => "OP_POP",
            Self::GetLocal => "OP_GET_LOCAL",
            Self::SetLocal => "OP_SET_LOCAL",
            Self::GetGlobal => "OP_GET_GLOBAL",
            Self::DefineGlobal => "OP_DEFINE_GLOBAL",
            Self::SetGlobal => "OP_SET_GLOBAL",
            Self::Equal => "OP_EQUAL",
            Self::Greater => "OP_GREATER",
            Self::Less => "OP_LESS",
            Self::Add => "OP_ADD",
            Self::Subtract => "OP_SUBTRACT",
            Self::Multiply => "OP_MULTIPLY",
            Self::Divide => "OP_DIVIDE",
            Self::Not => "OP_NOT",
            Self::Negate => "OP_NEGATE",
            Self::Print => "OP_PRINT",
            Self::Return => "OP_RETURN",
        }
    }

    /// Whether this opcode carries a single-byte operand (a constant index,
    /// stack slot, or global name index).
    #[must_use]
    fn has_u8_operand(self) -> bool {
        matches!(
            self,
            Self::Constant | Self::GetLocal | Self::SetLocal | Self::GetGlobal | Self::DefineGlobal | Self::SetGlobal
        )
    }
}

/// A contiguous bytecode segment: raw instructions, a parallel per-byte line
/// map for error reporting, and the constant pool instructions index into.
#[derive(Debug, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
}

impl Chunk {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw byte, recording the source line it came from.
    ///
    /// `|code| == |lines|` is maintained as an invariant by only ever growing
    /// both vectors together here.
    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write_byte(op as u8, line);
    }

    pub fn write_op_u8(&mut self, op: OpCode, operand: u8, line: u32) {
        self.write_op(op, line);
        self.write_byte(operand, line);
    }

    /// Adds `value` to the constant pool, returning its index.
    ///
    /// # Errors
    /// Returns an error if the chunk already holds 256 constants, since the
    /// constant index is encoded as a single byte.
    pub fn add_constant(&mut self, value: Value) -> Result<u8, &'static str> {
        if self.constants.len() >= 256 {
            return Err("Too many constants in one chunk.");
        }
        self.constants.push(value);
        #[expect(clippy::cast_possible_truncation)]
        Ok((self.constants.len() - 1) as u8)
    }
}

/// Renders every instruction in `chunk` to stdout, prefixed by `name`.
///
/// Exercised only by tests; never called from the hot dispatch loop.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) {
    println!("== {name} ==");
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(chunk, offset);
    }
}

/// Renders the single instruction at `offset`, returning the offset of the next one.
#[must_use]
#[expect(clippy::missing_panics_doc)]
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> usize {
    print!("{offset:04} ");
    if offset > 0 && chunk.lines[offset] == chunk.lines[offset - 1] {
        print!("   | ");
    } else {
        print!("{:4} ", chunk.lines[offset]);
    }

    let byte = chunk.code[offset];
    let Some(op) = OpCode::from_repr(byte) else {
        println!("Unknown opcode {byte}");
        return offset + 1;
    };

    if op.has_u8_operand() {
        let operand = chunk.code[offset + 1];
        if op == OpCode::Constant {
            println!("{:-16} {operand:4} '{}'", op.name(), chunk.constants[operand as usize]);
        } else {
            println!("{:-16} {operand:4}", op.name());
        }
        offset + 2
    } else {
        println!("{}", op.name());
        offset + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_and_lines_stay_in_lockstep() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Nil, 1);
        chunk.write_op_u8(OpCode::Constant, 0, 2);
        assert_eq!(chunk.code.len(), chunk.lines.len());
    }

    #[test]
    fn constant_pool_overflows_at_256() {
        let mut chunk = Chunk::new();
        for i in 0..256 {
            assert!(chunk.add_constant(Value::Number(f64::from(i))).is_ok());
        }
        assert_eq!(chunk.add_constant(Value::Number(0.0)), Err("Too many constants in one chunk."));
    }

    #[test]
    fn opcode_round_trips_through_its_byte() {
        for op in [OpCode::Constant, OpCode::Add, OpCode::Return, OpCode::GetLocal] {
            assert_eq!(OpCode::from_repr(op as u8), Some(op));
        }
    }
}
