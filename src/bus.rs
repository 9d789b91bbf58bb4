use crate::cartridge::Cartridge;
use crate::constants::*;
use crate::ppu::PPU;
use crate::timer::Timer;
use crate::{Bus, SubSystem};
use bitflags::bitflags;

bitflags! {
    /// One bit per interrupt source, used for both the pending flags (IF)
    /// and the enable mask (IE). Declaration order is priority order:
    /// the lowest numbered pending bit is dispatched first.
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub struct InterruptRegister: u8 {
        const VBLANK = 0b0000_0001;
        const STAT   = 0b0000_0010;
        const TIMER  = 0b0000_0100;
        const SERIAL = 0b0000_1000;
        const JOYPAD = 0b0001_0000;
    }
}

impl Default for InterruptRegister {
    #[inline]
    fn default() -> Self {
        InterruptRegister::empty()
    }
}

/// Defines the global bus, all processing units access memory through it.
/// Every `cycle` call steps the timer and the PPU by one machine cycle,
/// the accesses themselves never do.
pub struct MainBus {
    pub cartridge: Cartridge,
    pub ppu: PPU,
    pub timer: Timer,
    pub interrupt_enable: InterruptRegister,
    pub interrupt_flag: InterruptRegister,
    /// Serial registers SB/SC, plain stores without a transfer engine.
    serial_data: u8,
    serial_ctrl: u8,
    wram: [u8; WRAM_SIZE],
    hram: [u8; HRAM_SIZE],
    /// Pacing counter for the host, 2 units per machine cycle.
    pub cycles: u32,
}

impl MainBus {
    pub fn with_cartridge(cartridge: Cartridge) -> Self {
        Self {
            cartridge,
            ppu: PPU::default(),
            timer: Timer::default(),
            interrupt_enable: InterruptRegister::empty(),
            interrupt_flag: InterruptRegister::empty(),
            serial_data: 0,
            serial_ctrl: 0,
            wram: [0u8; WRAM_SIZE],
            hram: [0u8; HRAM_SIZE],
            cycles: 0,
        }
    }

    /// Handles all writes to the I/O registers (0xFF00-0xFF7F)
    fn write_io(&mut self, address: u16, value: u8) {
        match address {
            JOYPAD => {} // input polling is not part of this core
            SERIAL_TRANSFER_DATA => self.serial_data = value,
            SERIAL_TRANSFER_CTRL => self.serial_ctrl = value,
            TIMER_DIVIDER..=TIMER_CTRL => self.timer.write(address, value),
            INTERRUPT_FLAG => self.interrupt_flag = InterruptRegister::from_bits_truncate(value),
            AUDIO_REGISTERS_START..=AUDIO_REGISTERS_END => {} // no APU
            PPU_REGISTER_START..=PPU_REGISTER_END => self.ppu.write(address, value),
            // A well known title writes here by bug
            IO_UNMAPPED_LAST => {}
            _ => panic!("Attempt to write to unmapped I/O register: {address:#06X}"),
        }
    }

    /// Handles all reads from the I/O registers (0xFF00-0xFF7F)
    fn read_io(&mut self, address: u16) -> u8 {
        match address {
            JOYPAD => UNDEFINED_READ,
            SERIAL_TRANSFER_DATA => self.serial_data,
            SERIAL_TRANSFER_CTRL => self.serial_ctrl,
            TIMER_DIVIDER..=TIMER_CTRL => self.timer.read(address),
            INTERRUPT_FLAG => self.interrupt_flag.bits(),
            AUDIO_REGISTERS_START..=AUDIO_REGISTERS_END => 0x00, // no APU
            PPU_REGISTER_START..=PPU_REGISTER_END => self.ppu.read(address),
            _ => panic!("Attempt to read from unmapped I/O register: {address:#06X}"),
        }
    }
}

impl SubSystem for MainBus {
    fn write(&mut self, address: u16, value: u8) {
        match address {
            // Writing to ROM would select banks on a mapper cartridge,
            // a flat cartridge ignores it
            ROM_LOW_BANK_BEGIN..=ROM_HIGH_BANK_END => {}
            VRAM_BEGIN..=VRAM_END => self.ppu.write(address, value),
            CRAM_BANK_BEGIN..=CRAM_BANK_END => {} // no external RAM attached
            // Bit 12 selects the WRAM half, which makes 0xE000-0xFDFF
            // alias 0xC000-0xDDFF for free
            WRAM_BEGIN..=ECHO_END => self.wram[(address & 0x1FFF) as usize] = value,
            OAM_BEGIN..=OAM_END => self.ppu.write(address, value),
            UNUSED_BEGIN..=UNUSED_END => {}
            IO_BEGIN..=IO_END => self.write_io(address, value),
            HRAM_BEGIN..=HRAM_END => self.hram[(address - HRAM_BEGIN) as usize] = value,
            INTERRUPT_ENABLE => {
                self.interrupt_enable = InterruptRegister::from_bits_truncate(value)
            }
        }
    }

    fn read(&mut self, address: u16) -> u8 {
        match address {
            ROM_LOW_BANK_BEGIN..=ROM_HIGH_BANK_END => self.cartridge.read(address),
            VRAM_BEGIN..=VRAM_END => self.ppu.read(address),
            CRAM_BANK_BEGIN..=CRAM_BANK_END => UNDEFINED_READ,
            WRAM_BEGIN..=ECHO_END => self.wram[(address & 0x1FFF) as usize],
            OAM_BEGIN..=OAM_END => self.ppu.read(address),
            UNUSED_BEGIN..=UNUSED_END => UNDEFINED_READ,
            IO_BEGIN..=IO_END => self.read_io(address),
            HRAM_BEGIN..=HRAM_END => self.hram[(address - HRAM_BEGIN) as usize],
            INTERRUPT_ENABLE => self.interrupt_enable.bits(),
        }
    }
}

impl Bus for MainBus {
    fn cycle(&mut self) {
        self.cycles = self.cycles.wrapping_add(2);
        self.timer.step(&mut self.interrupt_flag);
        self.ppu.step(&mut self.interrupt_flag);
    }

    #[inline]
    fn has_irq(&self) -> bool {
        !(self.interrupt_enable & self.interrupt_flag).is_empty()
    }

    #[inline]
    fn set_ie(&mut self, r: InterruptRegister) {
        self.interrupt_enable = r;
    }

    #[inline]
    fn get_ie(&self) -> InterruptRegister {
        self.interrupt_enable
    }

    #[inline]
    fn set_if(&mut self, r: InterruptRegister) {
        self.interrupt_flag = r;
    }

    #[inline]
    fn get_if(&self) -> InterruptRegister {
        self.interrupt_flag
    }
}
