//! The register machine.

use crate::instruction::{Instruction, OpCode};
use ember_common::config::VmConfig;
use ember_common::types::{Key, KeyKind, Value};
use ember_common::{EmberError, Result};
use ember_storage::Index;
use tracing::{debug, info, trace};

/// Register bytecode interpreter with an integer-keyed index.
///
/// Registers and the value stack hold `i64`s. The stack is shared by
/// `CALL`/`RET` and `PUSH`/`POP`. Index values are stored as 8-byte
/// little-endian integers.
pub struct Vm {
    config: VmConfig,
    registers: Vec<i64>,
    stack: Vec<i64>,
    program: Vec<Instruction>,
    ip: usize,
    halted: bool,
    steps: u64,
    output: Vec<i64>,
    index: Index,
}

fn encode_value(value: i64) -> Value {
    Value::copy_from_slice(&value.to_le_bytes())
}

fn decode_value(value: &Value) -> Result<i64> {
    let bytes: [u8; 8] = value.as_ref().try_into().map_err(|_| {
        EmberError::CorruptValue(format!("index value is {} bytes, expected 8", value.len()))
    })?;
    Ok(i64::from_le_bytes(bytes))
}

fn flag(set: bool) -> i64 {
    i64::from(set)
}

impl Vm {
    /// Creates a machine with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Result<Self> {
        config.validate()?;
        let index = Index::new(KeyKind::Integer, &config.index)?;
        Ok(Self {
            registers: vec![0; config.max_registers],
            stack: Vec::with_capacity(config.max_stack),
            program: Vec::new(),
            ip: 0,
            halted: false,
            steps: 0,
            output: Vec::new(),
            index,
            config,
        })
    }

    /// Replaces the loaded program and rewinds to its first instruction.
    ///
    /// Registers, output and the index carry over; the stack is cleared.
    pub fn load_program(&mut self, program: &[Instruction]) -> Result<()> {
        if program.len() > self.config.max_program {
            return Err(EmberError::ProgramTooLarge {
                size: program.len(),
                max: self.config.max_program,
            });
        }
        self.program = program.to_vec();
        self.stack.clear();
        self.ip = 0;
        self.halted = false;
        self.steps = 0;
        debug!(instructions = program.len(), "program loaded");
        Ok(())
    }

    /// Runs until `HALT`. Fails on the first faulting instruction, leaving
    /// `ip` pointing at it.
    pub fn run(&mut self) -> Result<()> {
        while self.step()? {}
        Ok(())
    }

    /// Executes one instruction. Returns false once the machine has halted.
    pub fn step(&mut self) -> Result<bool> {
        if self.halted {
            return Ok(false);
        }
        if let Some(limit) = self.config.step_limit {
            if self.steps >= limit {
                return Err(EmberError::StepLimitExceeded { limit });
            }
        }
        let instruction = *self.program.get(self.ip).ok_or(EmberError::ProgramOverrun)?;
        trace!(ip = self.ip, %instruction, "step");
        self.execute(instruction)?;
        self.steps += 1;
        Ok(!self.halted)
    }

    fn execute(&mut self, ins: Instruction) -> Result<()> {
        let Instruction {
            opcode,
            operand1: a,
            operand2: b,
            operand3: c,
        } = ins;
        let mut next = self.ip + 1;

        match opcode {
            OpCode::Nop => {}
            OpCode::Halt => {
                self.halted = true;
                debug!(ip = self.ip, steps = self.steps + 1, "halted");
                return Ok(());
            }
            OpCode::Load => *self.reg_mut(a)? = i64::from(b),
            OpCode::Store => *self.reg_mut(b)? = self.reg(a)?,
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                let lhs = self.reg(b)?;
                let rhs = i64::from(c);
                let result = match opcode {
                    OpCode::Add => lhs.checked_add(rhs),
                    OpCode::Sub => lhs.checked_sub(rhs),
                    OpCode::Mul => lhs.checked_mul(rhs),
                    _ if rhs == 0 => return Err(EmberError::DivisionByZero { ip: self.ip }),
                    _ => lhs.checked_div(rhs),
                };
                *self.reg_mut(a)? = result.ok_or(EmberError::ArithmeticOverflow { ip: self.ip })?;
            }
            OpCode::Jmp => next = self.target(a)?,
            OpCode::JmpIfZero => {
                if self.reg(a)? == 0 {
                    next = self.target(b)?;
                }
            }
            OpCode::JmpIfNotZero => {
                if self.reg(a)? != 0 {
                    next = self.target(b)?;
                }
            }
            OpCode::Call => {
                let target = self.target(a)?;
                self.push(self.ip as i64)?;
                next = target;
            }
            OpCode::Ret => {
                let site = self.pop()?;
                next = usize::try_from(site)
                    .ok()
                    .filter(|&s| s < self.program.len())
                    .ok_or(EmberError::InvalidJump(saturate(site)))?
                    + 1;
            }
            OpCode::Push => {
                let value = self.reg(a)?;
                self.push(value)?;
            }
            OpCode::Pop => {
                let slot = self.reg_index(a)?;
                self.registers[slot] = self.pop()?;
            }
            OpCode::Print => {
                let value = self.reg(a)?;
                info!(register = a, value, "print");
                self.output.push(value);
            }
            OpCode::Select => {
                let key = Key::Integer(self.reg(b)?);
                let found = self.index.search(&key)?;
                let value = found.as_ref().map(decode_value).transpose()?;
                self.check_reg(a)?;
                self.check_reg(c)?;
                *self.reg_mut(a)? = value.unwrap_or(0);
                *self.reg_mut(c)? = flag(value.is_some());
            }
            OpCode::Insert => {
                let key = Key::Integer(self.reg(a)?);
                let value = encode_value(self.reg(b)?);
                self.check_reg(c)?;
                let previous = self.index.insert(key, value)?;
                *self.reg_mut(c)? = flag(previous.is_none());
            }
            OpCode::Update => {
                let key = Key::Integer(self.reg(a)?);
                let value = encode_value(self.reg(b)?);
                self.check_reg(c)?;
                let updated = self.index.update(&key, value)?;
                *self.reg_mut(c)? = flag(updated);
            }
            OpCode::Delete => {
                let key = Key::Integer(self.reg(a)?);
                self.check_reg(b)?;
                let removed = self.index.delete(&key)?;
                *self.reg_mut(b)? = flag(removed);
            }
        }

        self.ip = next;
        Ok(())
    }

    fn reg_index(&self, reg: i32) -> Result<usize> {
        usize::try_from(reg)
            .ok()
            .filter(|&r| r < self.registers.len())
            .ok_or(EmberError::InvalidRegister(reg))
    }

    fn check_reg(&self, reg: i32) -> Result<()> {
        self.reg_index(reg).map(|_| ())
    }

    fn reg(&self, reg: i32) -> Result<i64> {
        Ok(self.registers[self.reg_index(reg)?])
    }

    fn reg_mut(&mut self, reg: i32) -> Result<&mut i64> {
        let slot = self.reg_index(reg)?;
        Ok(&mut self.registers[slot])
    }

    fn target(&self, target: i32) -> Result<usize> {
        usize::try_from(target)
            .ok()
            .filter(|&t| t < self.program.len())
            .ok_or(EmberError::InvalidJump(target))
    }

    fn push(&mut self, value: i64) -> Result<()> {
        if self.stack.len() >= self.config.max_stack {
            return Err(EmberError::StackOverflow {
                limit: self.config.max_stack,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<i64> {
        self.stack.pop().ok_or(EmberError::StackUnderflow)
    }

    pub fn registers(&self) -> &[i64] {
        &self.registers
    }

    /// Value of register `reg`, or `InvalidRegister`.
    pub fn register(&self, reg: i32) -> Result<i64> {
        self.reg(reg)
    }

    pub fn stack(&self) -> &[i64] {
        &self.stack
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Instructions executed since the program was loaded.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    /// Values written by `PRINT`, oldest first.
    pub fn output(&self) -> &[i64] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.output)
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut Index {
        &mut self.index
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction as I;

    fn run(program: &[Instruction]) -> Vm {
        let mut vm = Vm::new().unwrap();
        vm.load_program(program).unwrap();
        vm.run().unwrap();
        vm
    }

    fn run_err(program: &[Instruction]) -> EmberError {
        let mut vm = Vm::new().unwrap();
        vm.load_program(program).unwrap();
        vm.run().unwrap_err()
    }

    #[test]
    fn test_nop_then_halt() {
        let vm = run(&[I::nop(), I::halt()]);
        assert_eq!(vm.ip(), 1);
        assert!(vm.is_halted());
        assert_eq!(vm.steps(), 2);
    }

    #[test]
    fn test_load_and_store() {
        let vm = run(&[I::load(0, 222), I::store(0, 1), I::halt()]);
        assert_eq!(vm.registers()[0], 222);
        assert_eq!(vm.registers()[1], 222);
    }

    #[test]
    fn test_arithmetic() {
        let vm = run(&[
            I::load(0, 222),
            I::add(1, 0, 3),
            I::sub(2, 0, 22),
            I::mul(3, 0, -2),
            I::div(4, 0, 7),
            I::halt(),
        ]);
        assert_eq!(&vm.registers()[1..5], &[225, 200, -444, 31]);
    }

    #[test]
    fn test_jump_skips_halt() {
        let vm = run(&[I::jmp(2), I::halt(), I::load(0, 222), I::halt()]);
        assert_eq!(vm.registers()[0], 222);
        assert_eq!(vm.ip(), 3);
    }

    #[test]
    fn test_call_and_ret() {
        let vm = run(&[I::call(2), I::halt(), I::load(1, 4), I::mul(0, 1, 4), I::ret()]);
        assert_eq!(vm.registers()[0], 16);
        assert_eq!(vm.ip(), 1);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_countdown_loop() {
        // r0 counts down from 5, r1 accumulates.
        let vm = run(&[
            I::load(0, 5),
            I::add(1, 1, 10),
            I::sub(0, 0, 1),
            I::jmp_if_not_zero(0, 1),
            I::print(1),
            I::halt(),
        ]);
        assert_eq!(vm.output(), &[50]);
    }

    #[test]
    fn test_jmp_if_zero() {
        let vm = run(&[I::jmp_if_zero(0, 3), I::load(1, 1), I::halt(), I::load(1, 2), I::halt()]);
        assert_eq!(vm.registers()[1], 2);
    }

    #[test]
    fn test_push_pop() {
        let vm = run(&[I::load(0, 7), I::push(0), I::load(0, 0), I::pop(2), I::halt()]);
        assert_eq!(vm.registers()[2], 7);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_index_opcodes() {
        let vm = run(&[
            I::load(0, 42),
            I::load(1, 1000),
            I::insert(0, 1, 2),
            I::select(3, 0, 4),
            I::load(1, 2000),
            I::update(0, 1, 5),
            I::select(6, 0, 7),
            I::insert(0, 1, 8),
            I::delete(0, 9),
            I::select(10, 0, 11),
            I::delete(0, 12),
            I::halt(),
        ]);
        let r = vm.registers();
        assert_eq!((r[2], r[3], r[4]), (1, 1000, 1));
        assert_eq!((r[5], r[6], r[7]), (1, 2000, 1));
        assert_eq!(r[8], 0);
        assert_eq!(r[9], 1);
        assert_eq!((r[10], r[11]), (0, 0));
        assert_eq!(r[12], 0);
        assert!(vm.index().is_empty());
    }

    #[test]
    fn test_update_missing_key() {
        let vm = run(&[I::load(0, 1), I::load(1, 5), I::update(0, 1, 2), I::halt()]);
        assert_eq!(vm.registers()[2], 0);
        assert!(vm.index().is_empty());
    }

    #[test]
    fn test_division_by_zero() {
        let err = run_err(&[I::load(0, 1), I::div(1, 0, 0), I::halt()]);
        assert!(matches!(err, EmberError::DivisionByZero { ip: 1 }));
    }

    #[test]
    fn test_overflow() {
        let mut vm = Vm::new().unwrap();
        vm.load_program(&[I::mul(0, 0, 2), I::halt()]).unwrap();
        vm.registers[0] = i64::MAX;
        assert!(matches!(vm.run(), Err(EmberError::ArithmeticOverflow { ip: 0 })));
        assert_eq!(vm.ip(), 0);
    }

    #[test]
    fn test_running_off_the_end() {
        assert!(matches!(run_err(&[I::nop()]), EmberError::ProgramOverrun));
        assert!(matches!(run_err(&[]), EmberError::ProgramOverrun));
    }

    #[test]
    fn test_invalid_operands() {
        assert!(matches!(run_err(&[I::load(256, 1)]), EmberError::InvalidRegister(256)));
        assert!(matches!(run_err(&[I::push(-1)]), EmberError::InvalidRegister(-1)));
        assert!(matches!(run_err(&[I::jmp(5), I::halt()]), EmberError::InvalidJump(5)));
        assert!(matches!(run_err(&[I::call(-3)]), EmberError::InvalidJump(-3)));
    }

    #[test]
    fn test_stack_errors() {
        assert!(matches!(run_err(&[I::ret()]), EmberError::StackUnderflow));
        assert!(matches!(run_err(&[I::pop(0)]), EmberError::StackUnderflow));

        let mut vm = Vm::with_config(VmConfig {
            max_stack: 2,
            ..VmConfig::default()
        })
        .unwrap();
        vm.load_program(&[I::push(0), I::jmp(0)]).unwrap();
        assert!(matches!(vm.run(), Err(EmberError::StackOverflow { limit: 2 })));
        assert_eq!(vm.stack().len(), 2);
    }

    #[test]
    fn test_ret_to_bad_address() {
        // Pushes 99 and returns to it.
        let err = run_err(&[I::load(0, 99), I::push(0), I::ret()]);
        assert!(matches!(err, EmberError::InvalidJump(99)));
    }

    #[test]
    fn test_step_limit() {
        let mut vm = Vm::with_config(VmConfig {
            step_limit: Some(10),
            ..VmConfig::default()
        })
        .unwrap();
        vm.load_program(&[I::jmp(0)]).unwrap();
        assert!(matches!(vm.run(), Err(EmberError::StepLimitExceeded { limit: 10 })));
        assert_eq!(vm.steps(), 10);
    }

    #[test]
    fn test_program_too_large() {
        let mut vm = Vm::with_config(VmConfig {
            max_program: 2,
            ..VmConfig::default()
        })
        .unwrap();
        let err = vm.load_program(&[I::nop(), I::nop(), I::halt()]).unwrap_err();
        assert!(matches!(err, EmberError::ProgramTooLarge { size: 3, max: 2 }));
    }

    #[test]
    fn test_corrupt_index_value() {
        let mut vm = Vm::new().unwrap();
        vm.index_mut()
            .insert(Key::Integer(1), Value::from_static(b"short"))
            .unwrap();
        vm.load_program(&[I::load(0, 1), I::select(1, 0, 2), I::halt()]).unwrap();
        assert!(matches!(vm.run(), Err(EmberError::CorruptValue(_))));
    }

    #[test]
    fn test_step_after_halt() {
        let mut vm = Vm::new().unwrap();
        vm.load_program(&[I::halt()]).unwrap();
        assert!(!vm.step().unwrap());
        assert!(!vm.step().unwrap());
        assert_eq!(vm.steps(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = Vm::with_config(VmConfig {
            max_registers: 0,
            ..VmConfig::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, EmberError::InvalidParameter { .. }));
    }
}
