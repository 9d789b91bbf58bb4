use crate::Bus;
use crate::cpu::instruction::Instruction::*;
use crate::cpu::ops::JumpCondition::{Always, Carry, NotCarry, NotZero, Zero};
use crate::cpu::ops::Register::{A, B, C, D, E, H, L};
use crate::cpu::ops::WordRegister::{AF, BC, DE, HL, SP};
use crate::cpu::ops::{
    ByteRef, ByteSource, ByteTarget, JumpCondition, JumpTarget, Load, ResetCode, WordRegister,
};

const OPCODE_PREFIX_16BIT: u8 = 0xCB;

/// A fully decoded SM83 instruction with its operands resolved.
/// Immediate operands are consumed (and their cycles paid) during decode.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Instruction {
    ADD(ByteSource),    // Add n to A
    ADDHL(WordRegister), // Add word register to HL
    ADDSP(i8),          // Add signed immediate to SP
    ADC(ByteSource),    // Add n + carry flag to A
    AND(ByteSource),    // Logically AND n with A, result in A
    BIT(u8, ByteTarget), // Test bit b in register r
    CALL(JumpCondition, u16), // Push the return address, then jump to nn
    CCF,                // Complement carry flag
    CP(ByteSource),     // Compare A with n, result discarded
    CPL,                // Flips all bits in A, sets N and H flags
    DAA,                // Decimal adjust A (stub in this core, see handler)
    DEC(ByteTarget),    // Decrement byte target
    DEC2(WordRegister), // Decrement word register
    DI,                 // Disables interrupt dispatch
    EI,                 // Enables interrupt dispatch
    HALT,               // Halt until interrupt (fatal in this core)
    INC(ByteTarget),    // Increment byte target
    INC2(WordRegister), // Increment word register
    JP(JumpCondition, JumpTarget), // Jump to address
    JR(JumpCondition, i8), // Relative jump by signed offset
    LD(Load),           // The load family
    NOP,                // No operation
    OR(ByteSource),     // Logical OR n with A, result in A
    POP(WordRegister),  // Pop word register off the stack
    PUSH(WordRegister), // Push word register onto the stack
    RES(u8, ByteTarget), // Reset bit b in target
    RET(JumpCondition), // Pop the return address and jump to it
    RETI,               // Unconditional return which also enables interrupts
    RL(ByteTarget),     // Rotate left through carry
    RLA,                // Rotate A left through carry
    RLC(ByteTarget),    // Rotate left, old bit 7 to carry
    RLCA,               // Rotate A left, old bit 7 to carry
    RR(ByteTarget),     // Rotate right through carry
    RRA,                // Rotate A right through carry
    RRC(ByteTarget),    // Rotate right, old bit 0 to carry
    RRCA,               // Rotate A right, old bit 0 to carry
    RST(ResetCode),     // Push PC, jump to a fixed vector
    SBC(ByteSource),    // Subtract n + carry flag from A
    SCF,                // Set carry flag
    SET(u8, ByteTarget), // Set bit b in target
    SLA(ByteTarget),    // Shift left into carry, LSB set to 0
    SRA(ByteTarget),    // Shift right into carry, MSB is preserved
    SRL(ByteTarget),    // Shift right into carry, MSB set to 0
    STOP,               // Stop CPU and LCD (fatal in this core)
    SUB(ByteSource),    // Subtract n from A
    SWAP(ByteTarget),   // Swap upper and lower nibbles
    XOR(ByteSource),    // Logical exclusive OR n with A, result in A
}

/// Reads the next byte and advances the decode address.
#[inline]
fn read_byte<B: Bus>(address: &mut u16, bus: &mut B) -> u8 {
    let value = bus.cycle_read(*address);
    *address = address.wrapping_add(1);
    value
}

/// Reads the next word, low byte first.
#[inline]
fn read_word<B: Bus>(address: &mut u16, bus: &mut B) -> u16 {
    let lo = read_byte(address, bus);
    let hi = read_byte(address, bus);
    u16::from(hi) << 8 | u16::from(lo)
}

impl Instruction {
    /// Decodes the instruction at `address`, reading as many bytes as
    /// needed through the ticking bus primitives. Returns the decoded
    /// instruction (`None` for the 11 illegal opcodes) and the address
    /// of the following instruction.
    pub fn decode<B: Bus>(address: u16, bus: &mut B) -> (Option<Instruction>, u16) {
        let opcode = bus.cycle_read(address);
        let mut address = address.wrapping_add(1);
        if opcode == OPCODE_PREFIX_16BIT {
            let opcode = read_byte(&mut address, bus);
            return (Some(Self::prefixed(opcode)), address);
        }

        let instruction = match opcode {
            0x00 => NOP,
            0x01 => LD(Load::Word(BC, read_word(&mut address, bus))),
            0x02 => LD(Load::Byte(ByteTarget::I(ByteRef::BC), ByteSource::R(A))),
            0x03 => INC2(BC),
            0x04 => INC(ByteTarget::R(B)),
            0x05 => DEC(ByteTarget::R(B)),
            0x06 => LD(Load::Byte(
                ByteTarget::R(B),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x07 => RLCA,
            0x08 => LD(Load::SpToAddress(read_word(&mut address, bus))),
            0x09 => ADDHL(BC),
            0x0a => LD(Load::Byte(ByteTarget::R(A), ByteSource::I(ByteRef::BC))),
            0x0b => DEC2(BC),
            0x0c => INC(ByteTarget::R(C)),
            0x0d => DEC(ByteTarget::R(C)),
            0x0e => LD(Load::Byte(
                ByteTarget::R(C),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x0f => RRCA,

            0x10 => STOP,
            0x11 => LD(Load::Word(DE, read_word(&mut address, bus))),
            0x12 => LD(Load::Byte(ByteTarget::I(ByteRef::DE), ByteSource::R(A))),
            0x13 => INC2(DE),
            0x14 => INC(ByteTarget::R(D)),
            0x15 => DEC(ByteTarget::R(D)),
            0x16 => LD(Load::Byte(
                ByteTarget::R(D),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x17 => RLA,
            0x18 => JR(Always, read_byte(&mut address, bus) as i8),
            0x19 => ADDHL(DE),
            0x1a => LD(Load::Byte(ByteTarget::R(A), ByteSource::I(ByteRef::DE))),
            0x1b => DEC2(DE),
            0x1c => INC(ByteTarget::R(E)),
            0x1d => DEC(ByteTarget::R(E)),
            0x1e => LD(Load::Byte(
                ByteTarget::R(E),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x1f => RRA,

            0x20 => JR(NotZero, read_byte(&mut address, bus) as i8),
            0x21 => LD(Load::Word(HL, read_word(&mut address, bus))),
            0x22 => LD(Load::Byte(ByteTarget::I(ByteRef::HLInc), ByteSource::R(A))),
            0x23 => INC2(HL),
            0x24 => INC(ByteTarget::R(H)),
            0x25 => DEC(ByteTarget::R(H)),
            0x26 => LD(Load::Byte(
                ByteTarget::R(H),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x27 => DAA,
            0x28 => JR(Zero, read_byte(&mut address, bus) as i8),
            0x29 => ADDHL(HL),
            0x2a => LD(Load::Byte(ByteTarget::R(A), ByteSource::I(ByteRef::HLInc))),
            0x2b => DEC2(HL),
            0x2c => INC(ByteTarget::R(L)),
            0x2d => DEC(ByteTarget::R(L)),
            0x2e => LD(Load::Byte(
                ByteTarget::R(L),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x2f => CPL,

            0x30 => JR(NotCarry, read_byte(&mut address, bus) as i8),
            0x31 => LD(Load::Word(SP, read_word(&mut address, bus))),
            0x32 => LD(Load::Byte(ByteTarget::I(ByteRef::HLDec), ByteSource::R(A))),
            0x33 => INC2(SP),
            0x34 => INC(ByteTarget::I(ByteRef::HL)),
            0x35 => DEC(ByteTarget::I(ByteRef::HL)),
            0x36 => LD(Load::Byte(
                ByteTarget::I(ByteRef::HL),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x37 => SCF,
            0x38 => JR(Carry, read_byte(&mut address, bus) as i8),
            0x39 => ADDHL(SP),
            0x3a => LD(Load::Byte(ByteTarget::R(A), ByteSource::I(ByteRef::HLDec))),
            0x3b => DEC2(SP),
            0x3c => INC(ByteTarget::R(A)),
            0x3d => DEC(ByteTarget::R(A)),
            0x3e => LD(Load::Byte(
                ByteTarget::R(A),
                ByteSource::D8(read_byte(&mut address, bus)),
            )),
            0x3f => CCF,

            0x40 => LD(Load::Byte(ByteTarget::R(B), ByteSource::R(B))),
            0x41 => LD(Load::Byte(ByteTarget::R(B), ByteSource::R(C))),
            0x42 => LD(Load::Byte(ByteTarget::R(B), ByteSource::R(D))),
            0x43 => LD(Load::Byte(ByteTarget::R(B), ByteSource::R(E))),
            0x44 => LD(Load::Byte(ByteTarget::R(B), ByteSource::R(H))),
            0x45 => LD(Load::Byte(ByteTarget::R(B), ByteSource::R(L))),
            0x46 => LD(Load::Byte(ByteTarget::R(B), ByteSource::I(ByteRef::HL))),
            0x47 => LD(Load::Byte(ByteTarget::R(B), ByteSource::R(A))),
            0x48 => LD(Load::Byte(ByteTarget::R(C), ByteSource::R(B))),
            0x49 => LD(Load::Byte(ByteTarget::R(C), ByteSource::R(C))),
            0x4a => LD(Load::Byte(ByteTarget::R(C), ByteSource::R(D))),
            0x4b => LD(Load::Byte(ByteTarget::R(C), ByteSource::R(E))),
            0x4c => LD(Load::Byte(ByteTarget::R(C), ByteSource::R(H))),
            0x4d => LD(Load::Byte(ByteTarget::R(C), ByteSource::R(L))),
            0x4e => LD(Load::Byte(ByteTarget::R(C), ByteSource::I(ByteRef::HL))),
            0x4f => LD(Load::Byte(ByteTarget::R(C), ByteSource::R(A))),

            0x50 => LD(Load::Byte(ByteTarget::R(D), ByteSource::R(B))),
            0x51 => LD(Load::Byte(ByteTarget::R(D), ByteSource::R(C))),
            0x52 => LD(Load::Byte(ByteTarget::R(D), ByteSource::R(D))),
            0x53 => LD(Load::Byte(ByteTarget::R(D), ByteSource::R(E))),
            0x54 => LD(Load::Byte(ByteTarget::R(D), ByteSource::R(H))),
            0x55 => LD(Load::Byte(ByteTarget::R(D), ByteSource::R(L))),
            0x56 => LD(Load::Byte(ByteTarget::R(D), ByteSource::I(ByteRef::HL))),
            0x57 => LD(Load::Byte(ByteTarget::R(D), ByteSource::R(A))),
            0x58 => LD(Load::Byte(ByteTarget::R(E), ByteSource::R(B))),
            0x59 => LD(Load::Byte(ByteTarget::R(E), ByteSource::R(C))),
            0x5a => LD(Load::Byte(ByteTarget::R(E), ByteSource::R(D))),
            0x5b => LD(Load::Byte(ByteTarget::R(E), ByteSource::R(E))),
            0x5c => LD(Load::Byte(ByteTarget::R(E), ByteSource::R(H))),
            0x5d => LD(Load::Byte(ByteTarget::R(E), ByteSource::R(L))),
            0x5e => LD(Load::Byte(ByteTarget::R(E), ByteSource::I(ByteRef::HL))),
            0x5f => LD(Load::Byte(ByteTarget::R(E), ByteSource::R(A))),

            0x60 => LD(Load::Byte(ByteTarget::R(H), ByteSource::R(B))),
            0x61 => LD(Load::Byte(ByteTarget::R(H), ByteSource::R(C))),
            0x62 => LD(Load::Byte(ByteTarget::R(H), ByteSource::R(D))),
            0x63 => LD(Load::Byte(ByteTarget::R(H), ByteSource::R(E))),
            0x64 => LD(Load::Byte(ByteTarget::R(H), ByteSource::R(H))),
            0x65 => LD(Load::Byte(ByteTarget::R(H), ByteSource::R(L))),
            0x66 => LD(Load::Byte(ByteTarget::R(H), ByteSource::I(ByteRef::HL))),
            0x67 => LD(Load::Byte(ByteTarget::R(H), ByteSource::R(A))),
            0x68 => LD(Load::Byte(ByteTarget::R(L), ByteSource::R(B))),
            0x69 => LD(Load::Byte(ByteTarget::R(L), ByteSource::R(C))),
            0x6a => LD(Load::Byte(ByteTarget::R(L), ByteSource::R(D))),
            0x6b => LD(Load::Byte(ByteTarget::R(L), ByteSource::R(E))),
            0x6c => LD(Load::Byte(ByteTarget::R(L), ByteSource::R(H))),
            0x6d => LD(Load::Byte(ByteTarget::R(L), ByteSource::R(L))),
            0x6e => LD(Load::Byte(ByteTarget::R(L), ByteSource::I(ByteRef::HL))),
            0x6f => LD(Load::Byte(ByteTarget::R(L), ByteSource::R(A))),

            0x70 => LD(Load::Byte(ByteTarget::I(ByteRef::HL), ByteSource::R(B))),
            0x71 => LD(Load::Byte(ByteTarget::I(ByteRef::HL), ByteSource::R(C))),
            0x72 => LD(Load::Byte(ByteTarget::I(ByteRef::HL), ByteSource::R(D))),
            0x73 => LD(Load::Byte(ByteTarget::I(ByteRef::HL), ByteSource::R(E))),
            0x74 => LD(Load::Byte(ByteTarget::I(ByteRef::HL), ByteSource::R(H))),
            0x75 => LD(Load::Byte(ByteTarget::I(ByteRef::HL), ByteSource::R(L))),
            0x76 => HALT,
            0x77 => LD(Load::Byte(ByteTarget::I(ByteRef::HL), ByteSource::R(A))),
            0x78 => LD(Load::Byte(ByteTarget::R(A), ByteSource::R(B))),
            0x79 => LD(Load::Byte(ByteTarget::R(A), ByteSource::R(C))),
            0x7a => LD(Load::Byte(ByteTarget::R(A), ByteSource::R(D))),
            0x7b => LD(Load::Byte(ByteTarget::R(A), ByteSource::R(E))),
            0x7c => LD(Load::Byte(ByteTarget::R(A), ByteSource::R(H))),
            0x7d => LD(Load::Byte(ByteTarget::R(A), ByteSource::R(L))),
            0x7e => LD(Load::Byte(ByteTarget::R(A), ByteSource::I(ByteRef::HL))),
            0x7f => LD(Load::Byte(ByteTarget::R(A), ByteSource::R(A))),

            0x80 => ADD(ByteSource::R(B)),
            0x81 => ADD(ByteSource::R(C)),
            0x82 => ADD(ByteSource::R(D)),
            0x83 => ADD(ByteSource::R(E)),
            0x84 => ADD(ByteSource::R(H)),
            0x85 => ADD(ByteSource::R(L)),
            0x86 => ADD(ByteSource::I(ByteRef::HL)),
            0x87 => ADD(ByteSource::R(A)),
            0x88 => ADC(ByteSource::R(B)),
            0x89 => ADC(ByteSource::R(C)),
            0x8a => ADC(ByteSource::R(D)),
            0x8b => ADC(ByteSource::R(E)),
            0x8c => ADC(ByteSource::R(H)),
            0x8d => ADC(ByteSource::R(L)),
            0x8e => ADC(ByteSource::I(ByteRef::HL)),
            0x8f => ADC(ByteSource::R(A)),

            0x90 => SUB(ByteSource::R(B)),
            0x91 => SUB(ByteSource::R(C)),
            0x92 => SUB(ByteSource::R(D)),
            0x93 => SUB(ByteSource::R(E)),
            0x94 => SUB(ByteSource::R(H)),
            0x95 => SUB(ByteSource::R(L)),
            0x96 => SUB(ByteSource::I(ByteRef::HL)),
            0x97 => SUB(ByteSource::R(A)),
            0x98 => SBC(ByteSource::R(B)),
            0x99 => SBC(ByteSource::R(C)),
            0x9a => SBC(ByteSource::R(D)),
            0x9b => SBC(ByteSource::R(E)),
            0x9c => SBC(ByteSource::R(H)),
            0x9d => SBC(ByteSource::R(L)),
            0x9e => SBC(ByteSource::I(ByteRef::HL)),
            0x9f => SBC(ByteSource::R(A)),

            0xa0 => AND(ByteSource::R(B)),
            0xa1 => AND(ByteSource::R(C)),
            0xa2 => AND(ByteSource::R(D)),
            0xa3 => AND(ByteSource::R(E)),
            0xa4 => AND(ByteSource::R(H)),
            0xa5 => AND(ByteSource::R(L)),
            0xa6 => AND(ByteSource::I(ByteRef::HL)),
            0xa7 => AND(ByteSource::R(A)),
            0xa8 => XOR(ByteSource::R(B)),
            0xa9 => XOR(ByteSource::R(C)),
            0xaa => XOR(ByteSource::R(D)),
            0xab => XOR(ByteSource::R(E)),
            0xac => XOR(ByteSource::R(H)),
            0xad => XOR(ByteSource::R(L)),
            0xae => XOR(ByteSource::I(ByteRef::HL)),
            0xaf => XOR(ByteSource::R(A)),

            0xb0 => OR(ByteSource::R(B)),
            0xb1 => OR(ByteSource::R(C)),
            0xb2 => OR(ByteSource::R(D)),
            0xb3 => OR(ByteSource::R(E)),
            0xb4 => OR(ByteSource::R(H)),
            0xb5 => OR(ByteSource::R(L)),
            0xb6 => OR(ByteSource::I(ByteRef::HL)),
            0xb7 => OR(ByteSource::R(A)),
            0xb8 => CP(ByteSource::R(B)),
            0xb9 => CP(ByteSource::R(C)),
            0xba => CP(ByteSource::R(D)),
            0xbb => CP(ByteSource::R(E)),
            0xbc => CP(ByteSource::R(H)),
            0xbd => CP(ByteSource::R(L)),
            0xbe => CP(ByteSource::I(ByteRef::HL)),
            0xbf => CP(ByteSource::R(A)),

            0xc0 => RET(NotZero),
            0xc1 => POP(BC),
            0xc2 => JP(NotZero, JumpTarget::D16(read_word(&mut address, bus))),
            0xc3 => JP(Always, JumpTarget::D16(read_word(&mut address, bus))),
            0xc4 => CALL(NotZero, read_word(&mut address, bus)),
            0xc5 => PUSH(BC),
            0xc6 => ADD(ByteSource::D8(read_byte(&mut address, bus))),
            0xc7 => RST(ResetCode::RST00),
            0xc8 => RET(Zero),
            0xc9 => RET(Always),
            0xca => JP(Zero, JumpTarget::D16(read_word(&mut address, bus))),
            0xcb => unreachable!("CB prefix"),
            0xcc => CALL(Zero, read_word(&mut address, bus)),
            0xcd => CALL(Always, read_word(&mut address, bus)),
            0xce => ADC(ByteSource::D8(read_byte(&mut address, bus))),
            0xcf => RST(ResetCode::RST08),

            0xd0 => RET(NotCarry),
            0xd1 => POP(DE),
            0xd2 => JP(NotCarry, JumpTarget::D16(read_word(&mut address, bus))),
            0xd3 => return (None, address),
            0xd4 => CALL(NotCarry, read_word(&mut address, bus)),
            0xd5 => PUSH(DE),
            0xd6 => SUB(ByteSource::D8(read_byte(&mut address, bus))),
            0xd7 => RST(ResetCode::RST10),
            0xd8 => RET(Carry),
            0xd9 => RETI,
            0xda => JP(Carry, JumpTarget::D16(read_word(&mut address, bus))),
            0xdb => return (None, address),
            0xdc => CALL(Carry, read_word(&mut address, bus)),
            0xdd => return (None, address),
            0xde => SBC(ByteSource::D8(read_byte(&mut address, bus))),
            0xdf => RST(ResetCode::RST18),

            0xe0 => LD(Load::Byte(
                ByteTarget::I(ByteRef::HighD8(read_byte(&mut address, bus))),
                ByteSource::R(A),
            )),
            0xe1 => POP(HL),
            0xe2 => LD(Load::Byte(ByteTarget::I(ByteRef::HighC), ByteSource::R(A))),
            0xe3 => return (None, address),
            0xe4 => return (None, address),
            0xe5 => PUSH(HL),
            0xe6 => AND(ByteSource::D8(read_byte(&mut address, bus))),
            0xe7 => RST(ResetCode::RST20),
            0xe8 => ADDSP(read_byte(&mut address, bus) as i8),
            0xe9 => JP(Always, JumpTarget::HL),
            0xea => LD(Load::Byte(
                ByteTarget::I(ByteRef::D16(read_word(&mut address, bus))),
                ByteSource::R(A),
            )),
            0xeb => return (None, address),
            0xec => return (None, address),
            0xed => return (None, address),
            0xee => XOR(ByteSource::D8(read_byte(&mut address, bus))),
            0xef => RST(ResetCode::RST28),

            0xf0 => LD(Load::Byte(
                ByteTarget::R(A),
                ByteSource::I(ByteRef::HighD8(read_byte(&mut address, bus))),
            )),
            0xf1 => POP(AF),
            0xf2 => LD(Load::Byte(ByteTarget::R(A), ByteSource::I(ByteRef::HighC))),
            0xf3 => DI,
            0xf4 => return (None, address),
            0xf5 => PUSH(AF),
            0xf6 => OR(ByteSource::D8(read_byte(&mut address, bus))),
            0xf7 => RST(ResetCode::RST30),
            0xf8 => LD(Load::HlSpOffset(read_byte(&mut address, bus) as i8)),
            0xf9 => LD(Load::SpHl),
            0xfa => LD(Load::Byte(
                ByteTarget::R(A),
                ByteSource::I(ByteRef::D16(read_word(&mut address, bus))),
            )),
            0xfb => EI,
            0xfc => return (None, address),
            0xfd => return (None, address),
            0xfe => CP(ByteSource::D8(read_byte(&mut address, bus))),
            0xff => RST(ResetCode::RST38),
        };
        (Some(instruction), address)
    }

    /// Decodes a CB prefixed opcode. The secondary table is fully
    /// regular: bits 0-2 select the target, bits 3-5 the bit index or
    /// shift kind and bits 6-7 the operation group.
    fn prefixed(opcode: u8) -> Instruction {
        let target = match opcode & 0x07 {
            0x00 => ByteTarget::R(B),
            0x01 => ByteTarget::R(C),
            0x02 => ByteTarget::R(D),
            0x03 => ByteTarget::R(E),
            0x04 => ByteTarget::R(H),
            0x05 => ByteTarget::R(L),
            0x06 => ByteTarget::I(ByteRef::HL),
            _ => ByteTarget::R(A),
        };
        let bit = (opcode >> 3) & 0x07;
        match opcode >> 6 {
            0b00 => match bit {
                0 => RLC(target),
                1 => RRC(target),
                2 => RL(target),
                3 => RR(target),
                4 => SLA(target),
                5 => SRA(target),
                6 => SWAP(target),
                _ => SRL(target),
            },
            0b01 => BIT(bit, target),
            0b10 => RES(bit, target),
            _ => SET(bit, target),
        }
    }
}
