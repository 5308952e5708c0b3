use pretty_assertions::assert_eq;

use intcode::constants::Word;
use intcode::runtime::{Exception, MachineError, MemoryError, Status};
use intcode::Machine;

fn run_once(image: &[Word], input: &[Word]) -> Vec<Word> {
    let mut machine = Machine::new(image);
    let output = machine.run(input.iter().copied()).unwrap();
    assert!(machine.is_halted());
    output.into_iter().collect()
}

fn final_memory(image: &[Word]) -> Vec<Word> {
    let mut machine = Machine::new(image);
    machine.run([]).unwrap();
    assert_eq!(machine.status(), Status::Halted);
    machine.memory.as_slice().to_vec()
}

#[test]
fn arithmetic_programs_test() {
    assert_eq!(final_memory(&[1, 0, 0, 0, 99]), vec![2, 0, 0, 0, 99]);
    assert_eq!(final_memory(&[2, 3, 0, 3, 99]), vec![2, 3, 0, 6, 99]);
    assert_eq!(final_memory(&[2, 4, 4, 5, 99, 0]), vec![2, 4, 4, 5, 99, 9801]);
    assert_eq!(
        final_memory(&[1, 1, 1, 4, 99, 5, 6, 0, 99]),
        vec![30, 1, 1, 4, 2, 5, 6, 0, 99]
    );
    assert_eq!(
        final_memory(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]),
        vec![3500, 9, 10, 70, 2, 3, 11, 0, 99, 30, 40, 50]
    );
    assert_eq!(final_memory(&[1101, 100, -1, 4, 0])[4], 99);
}

#[test]
fn rerun_is_idempotent_test() {
    let image = [1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50];
    let first = final_memory(&image);
    let mut other = Machine::new(&[1, 0, 0, 0, 99]);
    other.run([]).unwrap();
    assert_eq!(final_memory(&image), first);
}

#[test]
fn echo_test() {
    assert_eq!(run_once(&[3, 0, 4, 0, 99], &[42]), vec![42]);
}

#[test]
fn comparison_programs_test() {
    let equal_position = [3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];
    assert_eq!(run_once(&equal_position, &[8]), vec![1]);
    assert_eq!(run_once(&equal_position, &[7]), vec![0]);

    let less_immediate = [3, 3, 1107, -1, 8, 3, 4, 3, 99];
    assert_eq!(run_once(&less_immediate, &[5]), vec![1]);
    assert_eq!(run_once(&less_immediate, &[8]), vec![0]);

    let equal_immediate = [3, 3, 1108, -1, 8, 3, 4, 3, 99];
    assert_eq!(run_once(&equal_immediate, &[8]), vec![1]);
    assert_eq!(run_once(&equal_immediate, &[-8]), vec![0]);
}

#[test]
fn jump_programs_test() {
    let position = [3, 12, 6, 12, 15, 1, 13, 14, 13, 4, 13, 99, -1, 0, 1, 9];
    assert_eq!(run_once(&position, &[0]), vec![0]);
    assert_eq!(run_once(&position, &[3]), vec![1]);

    let immediate = [3, 3, 1105, -1, 9, 1101, 0, 0, 12, 4, 12, 99, 1];
    assert_eq!(run_once(&immediate, &[0]), vec![0]);
    assert_eq!(run_once(&immediate, &[-4]), vec![1]);

    let around_eight = [
        3, 21, 1008, 21, 8, 20, 1005, 20, 22, 107, 8, 21, 20, 1006, 20, 31, 1106, 0, 36, 98, 0, 0,
        1002, 21, 125, 20, 4, 20, 1105, 1, 46, 104, 999, 1105, 1, 46, 1101, 1000, 1, 20, 4, 20,
        1105, 1, 46, 98, 99,
    ];
    assert_eq!(run_once(&around_eight, &[7]), vec![999]);
    assert_eq!(run_once(&around_eight, &[8]), vec![1000]);
    assert_eq!(run_once(&around_eight, &[9]), vec![1001]);
}

#[test]
fn quine_test() {
    let image = [
        109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
    ];
    assert_eq!(run_once(&image, &[]), image.to_vec());
}

#[test]
fn large_numbers_test() {
    let output = run_once(&[1102, 34_915_192, 34_915_192, 7, 4, 7, 99, 0], &[]);
    assert_eq!(output, vec![1_219_070_632_396_864]);

    let output = run_once(&[104, 1_125_899_906_842_624, 99], &[]);
    assert_eq!(output, vec![1_125_899_906_842_624]);
}

#[test]
fn relative_base_test() {
    let mut machine = Machine::new(&[109, 19, 204, -34, 99]);
    machine.registers.relative_base = 2000;
    machine.memory.write(1985, 77).unwrap();

    let output = machine.run([]).unwrap();
    assert_eq!(Vec::from(output), vec![77]);
    assert_eq!(machine.registers.relative_base, 2019);
}

#[test]
fn relative_write_test() {
    // cr 10; add 3 4 R:5; out P:15; halt
    let mut machine = Machine::new(&[109, 10, 21_101, 3, 4, 5, 4, 15, 99]);
    let output = machine.run([]).unwrap();
    assert_eq!(Vec::from(output), vec![7]);
    assert_eq!(machine.memory.len(), 16);
    assert_eq!(machine.memory.get(15), 7);
    assert_eq!(&machine.memory.as_slice()[9..15], &[0; 6]);
}

#[test]
fn mode_equivalence_test() {
    let immediate = final_memory(&[1101, 7, 5, 7, 99, 0, 0, 0]);
    let position = final_memory(&[1, 5, 6, 7, 99, 7, 5, 0]);
    assert_eq!(immediate[7], 12);
    assert_eq!(position[7], immediate[7]);
}

#[test]
fn suspend_and_resume_test() {
    // Adds two inputs read one after the other
    let image = [3, 11, 3, 12, 1, 11, 12, 13, 4, 13, 99, 0, 0, 0];
    let mut machine = Machine::new(&image);

    let output = machine.run([]).unwrap();
    assert!(output.is_empty());
    assert!(machine.is_suspended());
    assert_eq!(machine.registers.ip, 0);
    assert_eq!(machine.cycles, 0);

    let output = machine.run([20]).unwrap();
    assert!(output.is_empty());
    assert!(machine.is_suspended());
    assert_eq!(machine.registers.ip, 2);
    assert_eq!(machine.cycles, 1);

    let output = machine.run([22]).unwrap();
    assert_eq!(Vec::from(output), vec![42]);
    assert!(machine.is_halted());
    assert_eq!(machine.cycles, 5);

    assert_eq!(machine.run([1]), Err(MachineError::Halted));
}

#[test]
fn fault_test() {
    let mut machine = Machine::new(&[104, 1, 104, 2, 42]);
    let err = machine.run([]).unwrap_err();
    assert_eq!(
        err,
        MachineError::Fault {
            address: 4,
            exception: Exception::InvalidOpcode(42)
        }
    );
    assert_eq!(machine.status(), Status::Faulted);
    assert_eq!(Vec::from(machine.take_output()), vec![1, 2]);
    assert_eq!(machine.run([]), Err(MachineError::Halted));
}

#[test]
fn far_address_test() {
    let far = usize::try_from(Word::MAX).unwrap();

    let mut machine = Machine::new(&[1101, 1, 1, Word::MAX, 99]);
    assert_eq!(
        machine.run([]),
        Err(MachineError::Fault {
            address: 0,
            exception: Exception::InvalidMemoryAccess(MemoryError::OutOfBounds(far))
        })
    );
    assert_eq!(machine.status(), Status::Faulted);

    let mut machine = Machine::new(&[104, 5, 4, Word::MAX, 99]);
    assert_eq!(
        machine.run([]),
        Err(MachineError::Fault {
            address: 2,
            exception: Exception::InvalidMemoryAccess(MemoryError::OutOfBounds(far))
        })
    );
    assert_eq!(Vec::from(machine.take_output()), vec![5]);
}

#[test]
fn parse_and_run_test() {
    let mut machine: Machine = "3,0,4,0,99\n".parse().unwrap();
    assert_eq!(Vec::from(machine.run([-7]).unwrap()), vec![-7]);
}
