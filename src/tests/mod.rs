mod bus;

use crate::bus::InterruptRegister;
use crate::cartridge::Cartridge;
use crate::{Bus, GameBoy, SubSystem};
use std::sync::Arc;

/// A mock for the main bus: a flat byte vector plus a machine cycle
/// counter, enough to drive the interpreter in isolation.
pub struct MockBus {
    pub cycles: u32,
    interrupt_enable: InterruptRegister,
    interrupt_flag: InterruptRegister,
    data: Vec<u8>,
}

impl MockBus {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            cycles: 0,
            interrupt_enable: InterruptRegister::empty(),
            interrupt_flag: InterruptRegister::empty(),
            data,
        }
    }
}

impl SubSystem for MockBus {
    fn write(&mut self, address: u16, value: u8) {
        self.data[address as usize] = value;
    }

    fn read(&mut self, address: u16) -> u8 {
        self.data[address as usize]
    }
}

impl Bus for MockBus {
    fn cycle(&mut self) {
        self.cycles += 1;
    }

    fn has_irq(&self) -> bool {
        !(self.interrupt_enable & self.interrupt_flag).is_empty()
    }

    fn set_ie(&mut self, r: InterruptRegister) {
        self.interrupt_enable = r;
    }

    fn get_ie(&self) -> InterruptRegister {
        self.interrupt_enable
    }

    fn set_if(&mut self, r: InterruptRegister) {
        self.interrupt_flag = r;
    }

    fn get_if(&self) -> InterruptRegister {
        self.interrupt_flag
    }
}

/// Builds a minimum size flat ROM with the given code placed at the
/// cartridge entry point 0x0100.
pub fn rom_with_code(code: &[u8]) -> Vec<u8> {
    let mut rom = vec![0x00; 0x8000];
    rom[0x0100..0x0100 + code.len()].copy_from_slice(code);
    rom
}

/// Boots a machine from the given code, see `rom_with_code`.
pub fn machine_with_code(code: &[u8]) -> GameBoy {
    let rom = rom_with_code(code);
    let cartridge = Cartridge::try_from(Arc::from(rom.into_boxed_slice())).unwrap();
    GameBoy::with_cartridge(cartridge)
}

#[test]
fn test_interrupt_register_masking() {
    // Only the five interrupt sources survive a write
    for value in 0..=u8::MAX {
        let r = InterruptRegister::from_bits_truncate(value);
        assert_eq!(r.bits(), value & 0x1F);
    }
}

#[test]
fn test_interrupt_register_priority_order() {
    let all = InterruptRegister::all();
    assert_eq!(all.bits(), 0b0001_1111);
    assert_eq!(InterruptRegister::VBLANK.bits(), 0b0000_0001);
    assert_eq!(InterruptRegister::JOYPAD.bits(), 0b0001_0000);
}
