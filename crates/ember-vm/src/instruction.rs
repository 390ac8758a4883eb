//! Instruction set of the register machine.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ember_common::{EmberError, Result};
use std::fmt;

/// Operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Nop = 0,
    Halt = 1,
    /// `LOAD r imm`: r = imm.
    Load = 2,
    /// `STORE src dst`: dst = src.
    Store = 3,
    /// `ADD dst src imm`: dst = src + imm.
    Add = 4,
    Sub = 5,
    Mul = 6,
    Div = 7,
    /// `JMP target`.
    Jmp = 8,
    /// `JMP_IF_ZERO r target`.
    JmpIfZero = 9,
    JmpIfNotZero = 10,
    /// `CALL target`: pushes the call site, then jumps.
    Call = 11,
    /// `RET`: pops a call site and resumes after it.
    Ret = 12,
    Push = 13,
    Pop = 14,
    Print = 15,
    /// `SELECT dst key_reg flag_reg`.
    Select = 16,
    /// `INSERT key_reg val_reg flag_reg`.
    Insert = 17,
    /// `UPDATE key_reg val_reg flag_reg`.
    Update = 18,
    /// `DELETE key_reg flag_reg`.
    Delete = 19,
}

impl OpCode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Nop => "NOP",
            OpCode::Halt => "HALT",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Jmp => "JMP",
            OpCode::JmpIfZero => "JMP_IF_ZERO",
            OpCode::JmpIfNotZero => "JMP_IF_NOT_ZERO",
            OpCode::Call => "CALL",
            OpCode::Ret => "RET",
            OpCode::Push => "PUSH",
            OpCode::Pop => "POP",
            OpCode::Print => "PRINT",
            OpCode::Select => "SELECT",
            OpCode::Insert => "INSERT",
            OpCode::Update => "UPDATE",
            OpCode::Delete => "DELETE",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = EmberError;

    fn try_from(value: u8) -> Result<Self> {
        let opcode = match value {
            0 => OpCode::Nop,
            1 => OpCode::Halt,
            2 => OpCode::Load,
            3 => OpCode::Store,
            4 => OpCode::Add,
            5 => OpCode::Sub,
            6 => OpCode::Mul,
            7 => OpCode::Div,
            8 => OpCode::Jmp,
            9 => OpCode::JmpIfZero,
            10 => OpCode::JmpIfNotZero,
            11 => OpCode::Call,
            12 => OpCode::Ret,
            13 => OpCode::Push,
            14 => OpCode::Pop,
            15 => OpCode::Print,
            16 => OpCode::Select,
            17 => OpCode::Insert,
            18 => OpCode::Update,
            19 => OpCode::Delete,
            _ => return Err(EmberError::CorruptValue(format!("invalid opcode: {}", value))),
        };
        Ok(opcode)
    }
}

/// One instruction. Unused operands are zero.
///
/// Encoded form (13 bytes): opcode (1 byte), then the three operands as
/// little-endian `i32`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand1: i32,
    pub operand2: i32,
    pub operand3: i32,
}

impl Instruction {
    pub const ENCODED_SIZE: usize = 13;

    pub const fn new(opcode: OpCode, operand1: i32, operand2: i32, operand3: i32) -> Self {
        Self {
            opcode,
            operand1,
            operand2,
            operand3,
        }
    }

    pub const fn nop() -> Self {
        Self::new(OpCode::Nop, 0, 0, 0)
    }

    pub const fn halt() -> Self {
        Self::new(OpCode::Halt, 0, 0, 0)
    }

    pub const fn load(reg: i32, imm: i32) -> Self {
        Self::new(OpCode::Load, reg, imm, 0)
    }

    pub const fn store(src: i32, dst: i32) -> Self {
        Self::new(OpCode::Store, src, dst, 0)
    }

    pub const fn add(dst: i32, src: i32, imm: i32) -> Self {
        Self::new(OpCode::Add, dst, src, imm)
    }

    pub const fn sub(dst: i32, src: i32, imm: i32) -> Self {
        Self::new(OpCode::Sub, dst, src, imm)
    }

    pub const fn mul(dst: i32, src: i32, imm: i32) -> Self {
        Self::new(OpCode::Mul, dst, src, imm)
    }

    pub const fn div(dst: i32, src: i32, imm: i32) -> Self {
        Self::new(OpCode::Div, dst, src, imm)
    }

    pub const fn jmp(target: i32) -> Self {
        Self::new(OpCode::Jmp, target, 0, 0)
    }

    pub const fn jmp_if_zero(reg: i32, target: i32) -> Self {
        Self::new(OpCode::JmpIfZero, reg, target, 0)
    }

    pub const fn jmp_if_not_zero(reg: i32, target: i32) -> Self {
        Self::new(OpCode::JmpIfNotZero, reg, target, 0)
    }

    pub const fn call(target: i32) -> Self {
        Self::new(OpCode::Call, target, 0, 0)
    }

    pub const fn ret() -> Self {
        Self::new(OpCode::Ret, 0, 0, 0)
    }

    pub const fn push(reg: i32) -> Self {
        Self::new(OpCode::Push, reg, 0, 0)
    }

    pub const fn pop(reg: i32) -> Self {
        Self::new(OpCode::Pop, reg, 0, 0)
    }

    pub const fn print(reg: i32) -> Self {
        Self::new(OpCode::Print, reg, 0, 0)
    }

    pub const fn select(dst: i32, key_reg: i32, flag_reg: i32) -> Self {
        Self::new(OpCode::Select, dst, key_reg, flag_reg)
    }

    pub const fn insert(key_reg: i32, val_reg: i32, flag_reg: i32) -> Self {
        Self::new(OpCode::Insert, key_reg, val_reg, flag_reg)
    }

    pub const fn update(key_reg: i32, val_reg: i32, flag_reg: i32) -> Self {
        Self::new(OpCode::Update, key_reg, val_reg, flag_reg)
    }

    pub const fn delete(key_reg: i32, flag_reg: i32) -> Self {
        Self::new(OpCode::Delete, key_reg, flag_reg, 0)
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(self.opcode as u8);
        buf.put_i32_le(self.operand1);
        buf.put_i32_le(self.operand2);
        buf.put_i32_le(self.operand3);
    }

    /// Decodes one instruction from the front of `buf`, advancing it.
    pub fn decode_from(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < Self::ENCODED_SIZE {
            return Err(EmberError::CorruptValue(format!(
                "instruction needs {} bytes, {} remain",
                Self::ENCODED_SIZE,
                buf.remaining()
            )));
        }
        let opcode = OpCode::try_from(buf.get_u8())?;
        Ok(Self::new(opcode, buf.get_i32_le(), buf.get_i32_le(), buf.get_i32_le()))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.opcode.mnemonic(),
            self.operand1,
            self.operand2,
            self.operand3
        )
    }
}

/// Serializes a program into its packed byte form.
pub fn encode_program(program: &[Instruction]) -> Bytes {
    let mut buf = BytesMut::with_capacity(program.len() * Instruction::ENCODED_SIZE);
    for instruction in program {
        instruction.encode_into(&mut buf);
    }
    buf.freeze()
}

/// Parses a packed program. Trailing partial instructions are rejected.
pub fn decode_program(mut bytes: &[u8]) -> Result<Vec<Instruction>> {
    let mut program = Vec::with_capacity(bytes.len() / Instruction::ENCODED_SIZE);
    while bytes.has_remaining() {
        program.push(Instruction::decode_from(&mut bytes)?);
    }
    Ok(program)
}
