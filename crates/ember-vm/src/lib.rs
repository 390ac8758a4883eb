//! emberdb register bytecode interpreter.
//!
//! Programs are sequences of [`Instruction`]s executed by a [`Vm`]. The
//! `SELECT`, `INSERT`, `UPDATE` and `DELETE` opcodes operate on an
//! integer-keyed index owned by the machine.

pub mod instruction;
pub mod machine;

pub use instruction::{decode_program, encode_program, Instruction, OpCode};
pub use machine::Vm;
