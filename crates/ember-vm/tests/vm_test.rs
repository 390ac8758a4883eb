//! Interpreter programs that exercise control flow and the index together.

use ember_common::config::{IndexConfig, VmConfig};
use ember_common::types::Key;
use ember_common::EmberError;
use ember_vm::{decode_program, encode_program, Instruction as I, Vm};

#[test]
fn test_index_survives_program_reload() {
    let mut vm = Vm::with_config(VmConfig {
        index: IndexConfig::with_order(3),
        ..VmConfig::default()
    })
    .unwrap();

    // Counts r0 down from 50, calling a subroutine that stores r0 -> r0 * 3.
    let populate = vec![
        I::load(0, 50),
        I::call(5),
        I::sub(0, 0, 1),
        I::jmp_if_not_zero(0, 1),
        I::halt(),
        I::mul(2, 0, 3),
        I::insert(0, 2, 3),
        I::ret(),
    ];
    vm.load_program(&populate).unwrap();
    vm.run().unwrap();

    assert_eq!(vm.index().len(), 50);
    assert!(vm.index().height() > 1);
    vm.index().check_invariants().unwrap();

    let lookup = vec![
        I::load(0, 37),
        I::select(1, 0, 2),
        I::print(1),
        I::print(2),
        I::load(0, 51),
        I::select(1, 0, 2),
        I::print(1),
        I::print(2),
        I::halt(),
    ];
    vm.load_program(&lookup).unwrap();
    vm.run().unwrap();
    assert_eq!(vm.take_output(), vec![111, 1, 0, 0]);
    assert!(vm.output().is_empty());
}

#[test]
fn test_delete_every_other_key() {
    let mut vm = Vm::new().unwrap();
    for k in 0..100i64 {
        vm.index_mut()
            .insert(Key::Integer(k), bytes_of(k))
            .unwrap();
    }

    // for r0 in (0..100).step_by(2): delete r0
    let program = vec![
        I::load(0, 0),
        I::delete(0, 1),
        I::add(0, 0, 2),
        I::sub(2, 0, 100),
        I::jmp_if_not_zero(2, 1),
        I::halt(),
    ];
    vm.load_program(&program).unwrap();
    vm.run().unwrap();

    let keys: Vec<Key> = vm.index().iter_sorted().map(|(k, _)| k).collect();
    let expected: Vec<Key> = (0..100).filter(|k| k % 2 == 1).map(Key::Integer).collect();
    assert_eq!(keys, expected);
    vm.index().check_invariants().unwrap();
}

#[test]
fn test_encoded_program_runs() {
    let program = vec![I::load(0, 6), I::mul(0, 0, 7), I::print(0), I::halt()];
    let decoded = decode_program(&encode_program(&program)).unwrap();

    let mut vm = Vm::new().unwrap();
    vm.load_program(&decoded).unwrap();
    vm.run().unwrap();
    assert_eq!(vm.output(), &[42]);
}

#[test]
fn test_fault_leaves_machine_inspectable() {
    let mut vm = Vm::new().unwrap();
    vm.load_program(&[I::load(0, 9), I::div(1, 0, 0), I::halt()]).unwrap();
    let err = vm.run().unwrap_err();
    assert_eq!(err.to_string(), "Division by zero at instruction 1");
    assert_eq!(vm.ip(), 1);
    assert_eq!(vm.register(0).unwrap(), 9);
    assert!(!vm.is_halted());
    assert!(matches!(vm.register(300), Err(EmberError::InvalidRegister(300))));
}

fn bytes_of(v: i64) -> bytes::Bytes {
    bytes::Bytes::copy_from_slice(&v.to_le_bytes())
}
