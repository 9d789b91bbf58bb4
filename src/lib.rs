//! Emulator core for the original monochrome Game Boy (DMG).
//!
//! The crate models the console as four tightly coupled units: the SM83
//! interpreter ([`cpu::CPU`]), the memory bus ([`bus::MainBus`]), the timer
//! ([`timer::Timer`]) and the LCD dot clock ([`ppu::PPU`]). Every memory
//! access the interpreter performs advances the rest of the system by one
//! machine cycle, so LCD and timer state stay in lock-step with the
//! instruction stream instead of being caught up after the fact.
//!
//! ROM loading, windowing, audio and input belong to the embedding program;
//! the core only exposes [`GameBoy::run_frame`] and the resulting
//! [`ppu::buffer::FrameBuffer`] of raw 2-bit color indices.

pub mod bus;
pub mod cartridge;
pub mod constants;
pub mod cpu;
pub mod ppu;
pub mod timer;

#[cfg(test)]
mod tests;

use crate::bus::{InterruptRegister, MainBus};
use crate::cartridge::Cartridge;
use crate::cpu::{CPU, EmulationError};
use crate::ppu::buffer::FrameBuffer;

pub const SCREEN_WIDTH: u8 = 160;
pub const SCREEN_HEIGHT: u8 = 144;

/// The master clock in Hz, four clocks make up one machine cycle.
pub const CPU_CLOCK_SPEED: u32 = 1024 * 1024 * 4;

/// Raw access to a memory mapped unit: a full address decode
/// without any side effect on the rest of the system.
pub trait SubSystem {
    fn write(&mut self, address: u16, value: u8);
    fn read(&mut self, address: u16) -> u8;
}

/// The interface the interpreter drives. On top of the raw decode it
/// advances the subsystem clock and exposes the interrupt registers.
///
/// `cycle_read`/`cycle_write` are the only memory primitives the
/// interpreter uses: one access, then exactly one machine cycle.
pub trait Bus: SubSystem {
    /// Advances all clocked units by one machine cycle.
    fn cycle(&mut self);

    /// Indicates whether an unmasked interrupt is pending.
    fn has_irq(&self) -> bool;

    fn set_ie(&mut self, r: InterruptRegister);
    fn get_ie(&self) -> InterruptRegister;
    fn set_if(&mut self, r: InterruptRegister);
    fn get_if(&self) -> InterruptRegister;

    #[inline]
    fn cycle_read(&mut self, address: u16) -> u8 {
        let value = self.read(address);
        self.cycle();
        value
    }

    #[inline]
    fn cycle_write(&mut self, address: u16, value: u8) {
        self.write(address, value);
        self.cycle();
    }
}

/// The whole emulated console. Owns every subsystem for the duration of
/// a session; dropping it releases all interior memory.
pub struct GameBoy {
    pub cpu: CPU,
    pub bus: MainBus,
}

impl GameBoy {
    pub fn with_cartridge(cartridge: Cartridge) -> Self {
        Self {
            cpu: CPU::default(),
            bus: MainBus::with_cartridge(cartridge),
        }
    }

    /// Executes instructions until the LCD signals the start of the
    /// vertical blank, then returns. The caller is responsible for
    /// pacing and presenting the frame buffer.
    pub fn run_frame(&mut self) -> Result<(), EmulationError> {
        while !self.bus.ppu.end_frame {
            self.cpu.step(&mut self.bus)?;
        }
        self.bus.ppu.end_frame = false;
        Ok(())
    }

    /// The current frame as raw 2-bit color indices.
    /// Must not be read while `run_frame` is in progress.
    #[inline]
    pub fn frame(&self) -> &FrameBuffer {
        &self.bus.ppu.frame
    }

    /// Raw bus read without advancing the subsystem clock.
    #[inline]
    pub fn read(&mut self, address: u16) -> u8 {
        self.bus.read(address)
    }

    /// Raw bus write without advancing the subsystem clock.
    #[inline]
    pub fn write(&mut self, address: u16, value: u8) {
        self.bus.write(address, value);
    }

    /// Pacing counter in the core's clock units (2 per machine cycle).
    /// Real-time pacing uses `wall_ms ~ (1000 * cycles) >> 22`.
    #[inline]
    pub fn cycles(&self) -> u32 {
        self.bus.cycles
    }

    /// Resets the pacing counter, expected once per presented frame.
    #[inline]
    pub fn reset_cycles(&mut self) {
        self.bus.cycles = 0;
    }
}
