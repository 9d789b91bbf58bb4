use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// This area of memory contains the cartridge title
const CARTRIDGE_TITLE_BEGIN: u16 = 0x0134;
const CARTRIDGE_TITLE_END: u16 = 0x0142;

/// Games using CGB features announce it here: 0x80 for dual mode
/// carts and 0xC0 for CGB-only carts.
const CARTRIDGE_CGB_FLAG: u16 = 0x0143;

/// 0x03 here marks a cartridge with Super Game Boy functions.
const CARTRIDGE_SGB_FLAG: u16 = 0x0146;

/// This address contains the cartridge type, 0x00 means no mapper
/// hardware is present and the ROM is mapped flat.
/// See https://gbdev.io/pandocs/The_Cartridge_Header.html#0147--cartridge-type
const CARTRIDGE_TYPE: u16 = 0x0147;

/// This byte indicates how much ROM is present on the cartridge,
/// the total size is 32 KiB * (1 << value).
const CARTRIDGE_ROM_SIZE: u16 = 0x0148;

/// These bytes contain a 16-bit (big-endian) checksum computed as the sum
/// of all bytes of the cartridge ROM except the two checksum bytes.
const CARTRIDGE_GLOBAL_CHECKSUM1: u16 = 0x014E;
const CARTRIDGE_GLOBAL_CHECKSUM2: u16 = 0x014F;

/// The smallest valid cartridge: two 16 KiB ROM banks.
const MIN_ROM_SIZE: usize = 0x8000;

/// Construction failures, each naming the header check that rejected
/// the image. All of them are recoverable for the caller.
#[derive(Debug, Error, PartialEq)]
pub enum CartridgeError {
    #[error("ROM image must be at least 0x8000 bytes, got {0:#06x}")]
    TooSmall(usize),
    #[error("ROM size byte (header 0x0148) must not be greater than 8, got {0:#04x}")]
    InvalidSizeCode(u8),
    #[error("ROM is {actual:#x} bytes but the header announces {expected:#x}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Game Boy Color cartridges are not supported (header 0x0143 is {0:#04x})")]
    ColorUnsupported(u8),
    #[error("Super Game Boy cartridges are not supported (header 0x0146 is 0x03)")]
    SuperUnsupported,
    #[error("only flat cartridges without a mapper are supported (header 0x0147 is {0:#04x})")]
    UnsupportedMapper(u8),
}

/// A validated, flat (mapper-less) cartridge image. The ROM stays shared
/// with the loader and is never written to.
#[derive(Clone, Debug, PartialEq)]
pub struct Cartridge {
    pub title: String,
    rom: Arc<[u8]>,
}

impl TryFrom<Arc<[u8]>> for Cartridge {
    type Error = CartridgeError;

    fn try_from(rom: Arc<[u8]>) -> Result<Self, Self::Error> {
        if rom.len() < MIN_ROM_SIZE {
            return Err(CartridgeError::TooSmall(rom.len()));
        }

        let size_code = rom[CARTRIDGE_ROM_SIZE as usize];
        if size_code > 8 {
            return Err(CartridgeError::InvalidSizeCode(size_code));
        }
        let expected = MIN_ROM_SIZE << size_code;
        if expected != rom.len() {
            return Err(CartridgeError::SizeMismatch {
                expected,
                actual: rom.len(),
            });
        }

        let cgb_flag = rom[CARTRIDGE_CGB_FLAG as usize];
        if cgb_flag == 0x80 || cgb_flag == 0xC0 {
            return Err(CartridgeError::ColorUnsupported(cgb_flag));
        }
        if rom[CARTRIDGE_SGB_FLAG as usize] == 0x03 {
            return Err(CartridgeError::SuperUnsupported);
        }
        let cartridge_type = rom[CARTRIDGE_TYPE as usize];
        if cartridge_type != 0x00 {
            return Err(CartridgeError::UnsupportedMapper(cartridge_type));
        }

        if let Err(msg) = verify_checksum(rom.as_ref()) {
            log::warn!("{msg}");
        }

        let title = parse_title(rom.as_ref());
        log::info!("loaded cartridge: {title}");
        Ok(Self { title, rom })
    }
}

impl Cartridge {
    /// Reads a byte from the ROM area (0x0000-0x7FFF).
    /// A flat cartridge has no banking, the address maps directly.
    #[inline]
    pub fn read(&self, address: u16) -> u8 {
        self.rom[(address & 0x7FFF) as usize]
    }
}

impl fmt::Display for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Returns the cartridge title from the cartridge header.
fn parse_title(buf: &[u8]) -> String {
    let title = buf[CARTRIDGE_TITLE_BEGIN as usize..=CARTRIDGE_TITLE_END as usize]
        .iter()
        .filter_map(|b| b.is_ascii_alphanumeric().then_some(char::from(*b)))
        .collect::<String>();
    match title.is_empty() {
        true => "Unnamed".to_string(),
        false => title,
    }
}

/// Validates the global checksum of the given buffer containing the whole
/// cartridge. The hardware never checks it, so a mismatch is only a warning.
fn verify_checksum(buf: &[u8]) -> Result<(), String> {
    let byte1 = buf[CARTRIDGE_GLOBAL_CHECKSUM1 as usize];
    let byte2 = buf[CARTRIDGE_GLOBAL_CHECKSUM2 as usize];
    let checksum = u16::from(byte1) << 8 | u16::from(byte2);
    let calculated = calculate_global_checksum(buf);

    if checksum == calculated {
        return Ok(());
    }
    Err(format!(
        "global checksum mismatch, expected: {calculated:#06x} got: {checksum:#06x}"
    ))
}

/// Calculates the global checksum by adding all bytes from the given
/// cartridge buffer except the two checksum bytes.
fn calculate_global_checksum(buf: &[u8]) -> u16 {
    buf.iter()
        .enumerate()
        .fold(0, |sum, (address, &byte)| match address as u16 {
            CARTRIDGE_GLOBAL_CHECKSUM1 => sum,
            CARTRIDGE_GLOBAL_CHECKSUM2 => sum,
            _ => sum.wrapping_add(byte as u16),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A zeroed minimum size image with a valid header.
    fn flat_rom() -> Vec<u8> {
        let mut rom = vec![0x00; MIN_ROM_SIZE];
        rom[CARTRIDGE_TITLE_BEGIN as usize..CARTRIDGE_TITLE_BEGIN as usize + 4]
            .copy_from_slice(b"TEST");
        rom
    }

    fn build(rom: Vec<u8>) -> Result<Cartridge, CartridgeError> {
        Cartridge::try_from(Arc::from(rom.into_boxed_slice()))
    }

    #[test]
    fn test_valid_cartridge() {
        let cartridge = build(flat_rom()).unwrap();
        assert_eq!(cartridge.title, "TEST");
        assert_eq!(cartridge.read(0x0134), b'T');
        assert_eq!(cartridge.read(0x7FFF), 0x00);
    }

    #[test]
    fn test_truncated_rom() {
        let rom = vec![0x00; MIN_ROM_SIZE - 1];
        assert_eq!(build(rom), Err(CartridgeError::TooSmall(MIN_ROM_SIZE - 1)));
    }

    #[test]
    fn test_invalid_size_code() {
        let mut rom = flat_rom();
        rom[CARTRIDGE_ROM_SIZE as usize] = 0x09;
        assert_eq!(build(rom), Err(CartridgeError::InvalidSizeCode(0x09)));
    }

    #[test]
    fn test_size_mismatch() {
        let mut rom = flat_rom();
        rom[CARTRIDGE_ROM_SIZE as usize] = 0x01;
        assert_eq!(
            build(rom),
            Err(CartridgeError::SizeMismatch {
                expected: 0x10000,
                actual: 0x8000,
            })
        );
    }

    #[test]
    fn test_cgb_rejected() {
        for flag in [0x80, 0xC0] {
            let mut rom = flat_rom();
            rom[CARTRIDGE_CGB_FLAG as usize] = flag;
            assert_eq!(build(rom), Err(CartridgeError::ColorUnsupported(flag)));
        }
    }

    #[test]
    fn test_sgb_rejected() {
        let mut rom = flat_rom();
        rom[CARTRIDGE_SGB_FLAG as usize] = 0x03;
        assert_eq!(build(rom), Err(CartridgeError::SuperUnsupported));
    }

    #[test]
    fn test_mapper_rejected() {
        let mut rom = flat_rom();
        rom[CARTRIDGE_TYPE as usize] = 0x01;
        assert_eq!(build(rom), Err(CartridgeError::UnsupportedMapper(0x01)));
    }
}
