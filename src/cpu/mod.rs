mod instruction;
pub mod interrupt;
mod ops;
pub mod registers;

#[cfg(test)]
mod tests;

use crate::Bus;
use crate::cpu::instruction::Instruction;
use crate::cpu::ops::{
    ByteSource, ByteTarget, JumpCondition, JumpTarget, Load, ResetCode, WordRegister,
};
use crate::cpu::registers::{FlagsRegister, Registers};
use thiserror::Error;

/// Runtime fatals. None of these have an in-band recovery: the condition
/// is reported to the host and the machine state is undefined afterwards.
#[derive(Debug, Error, PartialEq)]
pub enum EmulationError {
    #[error("illegal opcode {0:#04x} executed")]
    IllegalOpcode(u8),
    #[error("HALT executed, low power wait is not implemented in this core")]
    Halt,
    #[error("STOP executed, stop mode is not implemented in this core")]
    Stop,
}

/// Implements the CPU for the DMG, the SM83 core of the LR35902.
///
/// Every memory access goes through the ticking bus primitives, so the
/// LCD and timer advance in the middle of an instruction exactly where
/// the hardware would perform the bus transaction.
#[derive(Default)]
pub struct CPU {
    pub r: Registers,
    /// Interrupt Master Enable. EI and DI take effect immediately,
    /// the hardware's one instruction EI delay is not modeled.
    pub ime: bool,
}

impl CPU {
    /// Executes one instruction or dispatches one pending interrupt.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> Result<(), EmulationError> {
        if self.ime && bus.has_irq() {
            interrupt::handle(self, bus);
            return Ok(());
        }

        let opcode_address = self.r.pc;
        let (instruction, next) = Instruction::decode(opcode_address, bus);
        // The program counter already points past the operands here,
        // control flow handlers only overwrite it with their target
        self.r.pc = next;
        match instruction {
            Some(instruction) => self.execute(instruction, bus),
            None => Err(EmulationError::IllegalOpcode(bus.read(opcode_address))),
        }
    }

    /// Executes the given instruction. Internal delay cycles are paid
    /// here, memory cycles are paid by the accesses themselves.
    fn execute<B: Bus>(
        &mut self,
        instruction: Instruction,
        bus: &mut B,
    ) -> Result<(), EmulationError> {
        match instruction {
            Instruction::ADD(source) => self.handle_add(source, bus),
            Instruction::ADDHL(source) => self.handle_add_hl(source, bus),
            Instruction::ADDSP(offset) => self.handle_add_sp(offset, bus),
            Instruction::ADC(source) => self.handle_adc(source, bus),
            Instruction::AND(source) => self.handle_and(source, bus),
            Instruction::BIT(bit, target) => self.handle_bit(bit, target, bus),
            Instruction::CALL(condition, address) => self.handle_call(condition, address, bus),
            Instruction::CCF => self.handle_ccf(),
            Instruction::CP(source) => self.handle_cp(source, bus),
            Instruction::CPL => self.handle_cpl(),
            Instruction::DAA => self.handle_daa(),
            Instruction::DEC(target) => self.handle_dec(target, bus),
            Instruction::DEC2(register) => self.handle_dec_word(register, bus),
            Instruction::DI => self.ime = false,
            Instruction::EI => self.ime = true,
            Instruction::HALT => return Err(EmulationError::Halt),
            Instruction::INC(target) => self.handle_inc(target, bus),
            Instruction::INC2(register) => self.handle_inc_word(register, bus),
            Instruction::JP(condition, target) => self.handle_jp(condition, target, bus),
            Instruction::JR(condition, offset) => self.handle_jr(condition, offset, bus),
            Instruction::LD(load) => self.handle_ld(load, bus),
            Instruction::NOP => {}
            Instruction::OR(source) => self.handle_or(source, bus),
            Instruction::POP(register) => self.handle_pop(register, bus),
            Instruction::PUSH(register) => self.handle_push(register, bus),
            Instruction::RES(bit, target) => self.handle_res(bit, target, bus),
            Instruction::RET(condition) => self.handle_ret(condition, bus),
            Instruction::RETI => self.handle_reti(bus),
            Instruction::RL(target) => self.handle_rl(target, bus),
            Instruction::RLA => self.handle_rla(),
            Instruction::RLC(target) => self.handle_rlc(target, bus),
            Instruction::RLCA => self.handle_rlca(),
            Instruction::RR(target) => self.handle_rr(target, bus),
            Instruction::RRA => self.handle_rra(),
            Instruction::RRC(target) => self.handle_rrc(target, bus),
            Instruction::RRCA => self.handle_rrca(),
            Instruction::RST(code) => self.handle_rst(code, bus),
            Instruction::SBC(source) => self.handle_sbc(source, bus),
            Instruction::SCF => self.handle_scf(),
            Instruction::SET(bit, target) => self.handle_set(bit, target, bus),
            Instruction::SLA(target) => self.handle_sla(target, bus),
            Instruction::SRA(target) => self.handle_sra(target, bus),
            Instruction::SRL(target) => self.handle_srl(target, bus),
            Instruction::STOP => return Err(EmulationError::Stop),
            Instruction::SUB(source) => self.handle_sub(source, bus),
            Instruction::SWAP(target) => self.handle_swap(target, bus),
            Instruction::XOR(source) => self.handle_xor(source, bus),
        }
        Ok(())
    }

    /// Pushes a word onto the stack, most significant byte first.
    /// The stack pointer is decremented before each write and the
    /// hardware spends an internal cycle before the writes start.
    pub fn push_word<B: Bus>(&mut self, value: u16, bus: &mut B) {
        bus.cycle();
        self.r.sp = self.r.sp.wrapping_sub(1);
        bus.cycle_write(self.r.sp, (value >> 8) as u8);
        self.r.sp = self.r.sp.wrapping_sub(1);
        bus.cycle_write(self.r.sp, value as u8);
    }

    /// Pops a word off the stack, least significant byte first.
    pub fn pop_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = bus.cycle_read(self.r.sp);
        self.r.sp = self.r.sp.wrapping_add(1);
        let hi = bus.cycle_read(self.r.sp);
        self.r.sp = self.r.sp.wrapping_add(1);
        u16::from(hi) << 8 | u16::from(lo)
    }

    /// Handles ADD instructions
    fn handle_add<B: Bus>(&mut self, source: ByteSource, bus: &mut B) {
        let value = source.read(self, bus);
        let (result, carry) = self.r.a.overflowing_add(value);
        // Half carry is set when adding the lower nibbles overflows
        // from bit 3 into bit 4
        let half_carry = (self.r.a & 0x0F) + (value & 0x0F) > 0x0F;
        self.r.f.update(result == 0, false, half_carry, carry);
        self.r.a = result;
    }

    /// Handles ADC instructions, carry and half carry both include the
    /// incoming carry flag.
    fn handle_adc<B: Bus>(&mut self, source: ByteSource, bus: &mut B) {
        let value = source.read(self, bus);
        let carry_in = u8::from(self.r.f.carry());
        let half_carry = (self.r.a & 0x0F) + (value & 0x0F) + carry_in > 0x0F;
        let result = u16::from(self.r.a) + u16::from(value) + u16::from(carry_in);
        self.r.f
            .update(result as u8 == 0, false, half_carry, result > 0xFF);
        self.r.a = result as u8;
    }

    /// Handles SUB instructions
    fn handle_sub<B: Bus>(&mut self, source: ByteSource, bus: &mut B) {
        let value = source.read(self, bus);
        let half_carry = (self.r.a & 0x0F) < (value & 0x0F);
        let carry = self.r.a < value;
        let result = self.r.a.wrapping_sub(value);
        self.r.f.update(result == 0, true, half_carry, carry);
        self.r.a = result;
    }

    /// Handles SBC instructions, the borrow includes the incoming carry.
    fn handle_sbc<B: Bus>(&mut self, source: ByteSource, bus: &mut B) {
        let value = source.read(self, bus);
        let carry_in = u8::from(self.r.f.carry());
        let half_carry = (self.r.a & 0x0F) < (value & 0x0F) + carry_in;
        let carry = u16::from(self.r.a) < u16::from(value) + u16::from(carry_in);
        let result = self.r.a.wrapping_sub(value).wrapping_sub(carry_in);
        self.r.f.update(result == 0, true, half_carry, carry);
        self.r.a = result;
    }

    /// Handles CP instructions, a SUB whose result is discarded.
    fn handle_cp<B: Bus>(&mut self, source: ByteSource, bus: &mut B) {
        let value = source.read(self, bus);
        let half_carry = (self.r.a & 0x0F) < (value & 0x0F);
        let carry = self.r.a < value;
        self.r.f
            .update(self.r.a == value, true, half_carry, carry);
    }

    /// Handles AND instructions
    fn handle_and<B: Bus>(&mut self, source: ByteSource, bus: &mut B) {
        let value = source.read(self, bus);
        self.r.a &= value;
        self.r.f.update(self.r.a == 0, false, true, false);
    }

    /// Handles OR instructions
    fn handle_or<B: Bus>(&mut self, source: ByteSource, bus: &mut B) {
        let value = source.read(self, bus);
        self.r.a |= value;
        self.r.f.update(self.r.a == 0, false, false, false);
    }

    /// Handles XOR instructions
    fn handle_xor<B: Bus>(&mut self, source: ByteSource, bus: &mut B) {
        let value = source.read(self, bus);
        self.r.a ^= value;
        self.r.f.update(self.r.a == 0, false, false, false);
    }

    /// Handles ADD HL, rr instructions. The zero flag is untouched,
    /// half carry comes from bit 11 and carry from bit 15.
    fn handle_add_hl<B: Bus>(&mut self, source: WordRegister, bus: &mut B) {
        let value = source.read(self);
        let hl = self.r.get_hl();
        let (result, carry) = hl.overflowing_add(value);
        let half_carry = (hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF;
        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r.f.set(FlagsRegister::HALF_CARRY, half_carry);
        self.r.f.set(FlagsRegister::CARRY, carry);
        self.r.set_hl(result);
        bus.cycle();
    }

    /// Handles ADD SP, e. The offset is signed for the addition but the
    /// carries are computed unsigned on the low byte.
    fn handle_add_sp<B: Bus>(&mut self, offset: i8, bus: &mut B) {
        let byte = offset as u8;
        let half_carry = (self.r.sp & 0x000F) + u16::from(byte & 0x0F) > 0x000F;
        let carry = (self.r.sp & 0x00FF) + u16::from(byte) > 0x00FF;
        self.r.f.update(false, false, half_carry, carry);
        self.r.sp = self.r.sp.wrapping_add(offset as u16);
        bus.cycle();
        bus.cycle();
    }

    /// Handles INC instructions for byte targets, the carry is untouched.
    fn handle_inc<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let result = target.read(self, bus).wrapping_add(1);
        target.write(self, bus, result);
        self.r.f.set(FlagsRegister::ZERO, result == 0);
        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r.f.set(FlagsRegister::HALF_CARRY, result & 0x0F == 0);
    }

    /// Handles DEC instructions for byte targets, the carry is untouched.
    fn handle_dec<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let result = target.read(self, bus).wrapping_sub(1);
        target.write(self, bus, result);
        self.r.f.set(FlagsRegister::ZERO, result == 0);
        self.r.f.set(FlagsRegister::SUBTRACTION, true);
        self.r.f.set(FlagsRegister::HALF_CARRY, result & 0x0F == 0x0F);
    }

    /// Handles INC instructions for word registers, no flags are touched.
    fn handle_inc_word<B: Bus>(&mut self, register: WordRegister, bus: &mut B) {
        let value = register.read(self);
        register.write(self, value.wrapping_add(1));
        bus.cycle();
    }

    /// Handles DEC instructions for word registers, no flags are touched.
    fn handle_dec_word<B: Bus>(&mut self, register: WordRegister, bus: &mut B) {
        let value = register.read(self);
        register.write(self, value.wrapping_sub(1));
        bus.cycle();
    }

    /// Handles BIT instructions
    fn handle_bit<B: Bus>(&mut self, bit: u8, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        self.r.f.set(FlagsRegister::ZERO, value & (1 << bit) == 0);
        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r.f.set(FlagsRegister::HALF_CARRY, true);
    }

    /// Handles RES instructions
    fn handle_res<B: Bus>(&mut self, bit: u8, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        target.write(self, bus, value & !(1 << bit));
    }

    /// Handles SET instructions
    fn handle_set<B: Bus>(&mut self, bit: u8, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        target.write(self, bus, value | (1 << bit));
    }

    /// Handles CCF instruction
    fn handle_ccf(&mut self) {
        let carry = self.r.f.carry();
        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r.f.set(FlagsRegister::HALF_CARRY, false);
        self.r.f.set(FlagsRegister::CARRY, !carry);
    }

    /// Handles SCF instruction
    fn handle_scf(&mut self) {
        self.r.f.set(FlagsRegister::SUBTRACTION, false);
        self.r.f.set(FlagsRegister::HALF_CARRY, false);
        self.r.f.set(FlagsRegister::CARRY, true);
    }

    /// Handles CPL instruction
    fn handle_cpl(&mut self) {
        self.r.a = !self.r.a;
        self.r.f.set(FlagsRegister::SUBTRACTION, true);
        self.r.f.set(FlagsRegister::HALF_CARRY, true);
    }

    /// Handles DAA instruction. Decimal adjustment is not implemented in
    /// this core: the instruction executes as a no-op, so any BCD result
    /// that would depend on it is untrusted.
    fn handle_daa(&mut self) {}

    /// Handles RLCA instruction, the zero flag is always cleared.
    fn handle_rlca(&mut self) {
        let carry = self.r.a & 0x80 != 0;
        self.r.a = self.r.a.rotate_left(1);
        self.r.f.update(false, false, false, carry);
    }

    /// Handles RRCA instruction, the zero flag is always cleared.
    fn handle_rrca(&mut self) {
        let carry = self.r.a & 0x01 != 0;
        self.r.a = self.r.a.rotate_right(1);
        self.r.f.update(false, false, false, carry);
    }

    /// Handles RLA instruction
    /// Rotate A left through carry
    fn handle_rla(&mut self) {
        let carry = self.r.a & 0x80 != 0;
        self.r.a = (self.r.a << 1) | u8::from(self.r.f.carry());
        self.r.f.update(false, false, false, carry);
    }

    /// Handles RRA instruction
    /// Rotate A right through carry
    fn handle_rra(&mut self) {
        let carry = self.r.a & 0x01 != 0;
        self.r.a = (self.r.a >> 1) | (u8::from(self.r.f.carry()) << 7);
        self.r.f.update(false, false, false, carry);
    }

    /// Handles RLC instructions
    fn handle_rlc<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        let carry = value & 0x80 != 0;
        let result = value.rotate_left(1);
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
    }

    /// Handles RRC instructions
    fn handle_rrc<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        let carry = value & 0x01 != 0;
        let result = value.rotate_right(1);
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
    }

    /// Handles RL instructions
    /// Rotate left through the carry flag
    fn handle_rl<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        let carry = value & 0x80 != 0;
        let result = (value << 1) | u8::from(self.r.f.carry());
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
    }

    /// Handles RR instructions
    /// Rotate right through the carry flag
    fn handle_rr<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        let carry = value & 0x01 != 0;
        let result = (value >> 1) | (u8::from(self.r.f.carry()) << 7);
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
    }

    /// Handles SLA instructions
    fn handle_sla<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        let carry = value & 0x80 != 0;
        let result = value << 1;
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
    }

    /// Handles SRA instructions, an arithmetic shift: bit 7 is preserved.
    fn handle_sra<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        let carry = value & 0x01 != 0;
        let result = (value >> 1) | (value & 0x80);
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
    }

    /// Handles SRL instructions, a logical shift: bit 7 becomes 0.
    fn handle_srl<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        let carry = value & 0x01 != 0;
        let result = value >> 1;
        self.r.f.update(result == 0, false, false, carry);
        target.write(self, bus, result);
    }

    /// Handles SWAP instructions
    fn handle_swap<B: Bus>(&mut self, target: ByteTarget, bus: &mut B) {
        let value = target.read(self, bus);
        let result = value.rotate_left(4);
        self.r.f.update(result == 0, false, false, false);
        target.write(self, bus, result);
    }

    /// Handles JP instructions. Jumping to an immediate target costs an
    /// internal cycle, JP HL is free.
    fn handle_jp<B: Bus>(&mut self, condition: JumpCondition, target: JumpTarget, bus: &mut B) {
        if condition.resolve(self) {
            self.r.pc = match target {
                JumpTarget::D16(address) => {
                    bus.cycle();
                    address
                }
                JumpTarget::HL => self.r.get_hl(),
            };
        }
    }

    /// Handles JR instructions, the offset is relative to the
    /// instruction that follows.
    fn handle_jr<B: Bus>(&mut self, condition: JumpCondition, offset: i8, bus: &mut B) {
        if condition.resolve(self) {
            self.r.pc = self.r.pc.wrapping_add(offset as u16);
            bus.cycle();
        }
    }

    /// Handles CALL instructions, the pushed return address is the
    /// instruction after the operand word.
    fn handle_call<B: Bus>(&mut self, condition: JumpCondition, address: u16, bus: &mut B) {
        if condition.resolve(self) {
            let return_address = self.r.pc;
            self.push_word(return_address, bus);
            self.r.pc = address;
        }
    }

    /// Handles RET instructions. The conditional forms spend an internal
    /// cycle before the condition gates the pop.
    fn handle_ret<B: Bus>(&mut self, condition: JumpCondition, bus: &mut B) {
        match condition {
            JumpCondition::Always => {
                self.r.pc = self.pop_word(bus);
                bus.cycle();
            }
            _ => {
                bus.cycle();
                if condition.resolve(self) {
                    self.r.pc = self.pop_word(bus);
                    bus.cycle();
                }
            }
        }
    }

    /// Handles RETI instruction
    fn handle_reti<B: Bus>(&mut self, bus: &mut B) {
        self.r.pc = self.pop_word(bus);
        self.ime = true;
        bus.cycle();
    }

    /// Handles RST instructions
    fn handle_rst<B: Bus>(&mut self, code: ResetCode, bus: &mut B) {
        let return_address = self.r.pc;
        self.push_word(return_address, bus);
        self.r.pc = code.address();
    }

    /// Handles PUSH instruction
    fn handle_push<B: Bus>(&mut self, register: WordRegister, bus: &mut B) {
        let value = register.read(self);
        self.push_word(value, bus);
    }

    /// Handles POP instruction. POP AF discards the low nibble of F.
    fn handle_pop<B: Bus>(&mut self, register: WordRegister, bus: &mut B) {
        let value = self.pop_word(bus);
        register.write(self, value);
    }

    /// Handles the LD instruction family
    fn handle_ld<B: Bus>(&mut self, load: Load, bus: &mut B) {
        match load {
            Load::Byte(target, source) => {
                let value = source.read(self, bus);
                target.write(self, bus, value);
            }
            Load::Word(register, value) => register.write(self, value),
            Load::SpHl => {
                self.r.sp = self.r.get_hl();
                bus.cycle();
            }
            Load::SpToAddress(address) => {
                bus.cycle_write(address, self.r.sp as u8);
                bus.cycle_write(address.wrapping_add(1), (self.r.sp >> 8) as u8);
            }
            Load::HlSpOffset(offset) => {
                let byte = offset as u8;
                let half_carry = (self.r.sp & 0x000F) + u16::from(byte & 0x0F) > 0x000F;
                let carry = (self.r.sp & 0x00FF) + u16::from(byte) > 0x00FF;
                self.r.f.update(false, false, half_carry, carry);
                let result = self.r.sp.wrapping_add(offset as u16);
                self.r.set_hl(result);
                bus.cycle();
            }
        }
    }
}
