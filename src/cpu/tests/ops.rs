use crate::SubSystem;
use crate::cpu::ops::Register::{A, B, L};
use crate::cpu::ops::WordRegister::{AF, BC, SP};
use crate::cpu::ops::{ByteRef, ByteSource, ByteTarget, JumpCondition};
use crate::cpu::registers::FlagsRegister;
use crate::cpu::tests::test_cpu;
use crate::tests::MockBus;

#[test]
fn test_register_read_write() {
    let mut cpu = test_cpu();
    cpu.r.a = 0x42;
    assert_eq!(A.read(&cpu), 0x42);
    B.write(&mut cpu, 0x24);
    assert_eq!(cpu.r.b, 0x24);
    L.write(&mut cpu, 0x11);
    assert_eq!(L.read(&cpu), 0x11);
}

#[test]
fn test_word_register_af_masks_low_nibble() {
    let mut cpu = test_cpu();
    AF.write(&mut cpu, 0xABCD);
    assert_eq!(AF.read(&cpu), 0xABC0, "low 4 bits of F are always zero");
}

#[test]
fn test_word_register_bc() {
    let mut cpu = test_cpu();
    BC.write(&mut cpu, 0x1234);
    assert_eq!(cpu.r.b, 0x12);
    assert_eq!(cpu.r.c, 0x34);
    assert_eq!(BC.read(&cpu), 0x1234);
}

#[test]
fn test_word_register_sp() {
    let mut cpu = test_cpu();
    SP.write(&mut cpu, 0xFFFE);
    assert_eq!(cpu.r.sp, 0xFFFE);
    assert_eq!(SP.read(&cpu), 0xFFFE);
}

#[test]
fn test_byte_ref_hl_inc_post_increments() {
    let mut cpu = test_cpu();
    cpu.r.set_hl(0x0010);
    assert_eq!(ByteRef::HLInc.resolve(&mut cpu), 0x0010);
    assert_eq!(cpu.r.get_hl(), 0x0011);
}

#[test]
fn test_byte_ref_hl_dec_wraps() {
    let mut cpu = test_cpu();
    cpu.r.set_hl(0x0000);
    assert_eq!(ByteRef::HLDec.resolve(&mut cpu), 0x0000);
    assert_eq!(cpu.r.get_hl(), 0xFFFF);
}

#[test]
fn test_byte_ref_high_page() {
    let mut cpu = test_cpu();
    cpu.r.c = 0x81;
    assert_eq!(ByteRef::HighC.resolve(&mut cpu), 0xFF81);
    assert_eq!(ByteRef::HighD8(0x40).resolve(&mut cpu), 0xFF40);
}

#[test]
fn test_byte_target_register() {
    let mut bus = MockBus::new(vec![]);
    let mut cpu = test_cpu();
    cpu.r.a = 0x42;
    let target = ByteTarget::R(A);
    assert_eq!(target.read(&mut cpu, &mut bus), 0x42);
    target.write(&mut cpu, &mut bus, 0x24);
    assert_eq!(cpu.r.a, 0x24);
    assert_eq!(bus.cycles, 0, "register access performs no bus cycle");
}

#[test]
fn test_byte_target_indirect_cycles() {
    let mut bus = MockBus::new(vec![0x11, 0x22]);
    let mut cpu = test_cpu();
    let target = ByteTarget::I(ByteRef::D16(0x0001));
    assert_eq!(target.read(&mut cpu, &mut bus), 0x22);
    assert_eq!(bus.cycles, 1);
    target.write(&mut cpu, &mut bus, 0x33);
    assert_eq!(bus.read(0x0001), 0x33);
    assert_eq!(bus.cycles, 2, "one machine cycle per byte transferred");
}

#[test]
fn test_byte_source_immediate() {
    let mut bus = MockBus::new(vec![]);
    let mut cpu = test_cpu();
    // The immediate was paid for during decode, reading it is free
    assert_eq!(ByteSource::D8(0x7F).read(&mut cpu, &mut bus), 0x7F);
    assert_eq!(bus.cycles, 0);
}

#[test]
fn test_jump_condition_resolve() {
    let mut cpu = test_cpu();
    assert!(JumpCondition::Always.resolve(&cpu));
    assert!(JumpCondition::NotZero.resolve(&cpu));
    assert!(!JumpCondition::Zero.resolve(&cpu));

    cpu.r.f.set(FlagsRegister::ZERO, true);
    cpu.r.f.set(FlagsRegister::CARRY, true);
    assert!(JumpCondition::Zero.resolve(&cpu));
    assert!(JumpCondition::Carry.resolve(&cpu));
    assert!(!JumpCondition::NotCarry.resolve(&cpu));
}

#[test]
fn test_byte_source_indirect_hl() {
    let mut bus = MockBus::new(vec![0x00, 0x00, 0x55]);
    let mut cpu = test_cpu();
    cpu.r.set_hl(0x0002);
    assert_eq!(ByteSource::I(ByteRef::HL).read(&mut cpu, &mut bus), 0x55);
    assert_eq!(cpu.r.get_hl(), 0x0002, "plain HL deref must not touch HL");
    assert_eq!(bus.cycles, 1);
}
