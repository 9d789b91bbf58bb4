use crate::Bus;
use crate::bus::InterruptRegister;
use crate::cpu::CPU;

const VBLANK_IRQ_ADDRESS: u16 = 0x0040;
const LCD_IRQ_ADDRESS: u16 = 0x0048;
const TIMER_IRQ_ADDRESS: u16 = 0x0050;
const SERIAL_IRQ_ADDRESS: u16 = 0x0058;
const JOYPAD_IRQ_ADDRESS: u16 = 0x0060;

/// Interrupt sources with their vectors, highest priority first.
const VECTORS: [(InterruptRegister, u16); 5] = [
    (InterruptRegister::VBLANK, VBLANK_IRQ_ADDRESS),
    (InterruptRegister::STAT, LCD_IRQ_ADDRESS),
    (InterruptRegister::TIMER, TIMER_IRQ_ADDRESS),
    (InterruptRegister::SERIAL, SERIAL_IRQ_ADDRESS),
    (InterruptRegister::JOYPAD, JOYPAD_IRQ_ADDRESS),
];

/// Dispatches the highest priority pending interrupt: disables further
/// dispatch, pushes the current program counter, acknowledges the source
/// in IF and redirects execution to its vector. Takes 5 machine cycles.
pub fn handle<B: Bus>(cpu: &mut CPU, bus: &mut B) {
    debug_assert!(cpu.ime);
    debug_assert!(bus.has_irq());

    cpu.ime = false;
    bus.cycle();
    let return_address = cpu.r.pc;
    cpu.push_word(return_address, bus);

    // The pending set is sampled after the push: the stack writes have
    // already ticked the subsystems and may have raised new bits
    let pending = bus.get_ie() & bus.get_if();
    for (irq, address) in VECTORS {
        if pending.contains(irq) {
            bus.set_if(bus.get_if() & !irq);
            cpu.r.pc = address;
            break;
        }
    }
    bus.cycle();
}
