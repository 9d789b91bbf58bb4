/// A raw 2-bit color index as it comes out of the tile data planes.
/// Mapping it to an actual shade of grey is up to the consumer of the
/// frame buffer, the core never applies palettes to rendered pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum Pixel {
    #[default]
    Zero,
    One,
    Two,
    Three,
}

impl From<Pixel> for u8 {
    #[inline]
    fn from(value: Pixel) -> u8 {
        match value {
            Pixel::Zero => 0b00,
            Pixel::One => 0b01,
            Pixel::Two => 0b10,
            Pixel::Three => 0b11,
        }
    }
}

impl From<u8> for Pixel {
    #[inline]
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Pixel::Zero,
            0b01 => Pixel::One,
            0b10 => Pixel::Two,
            0b11 => Pixel::Three,
            _ => unreachable!(),
        }
    }
}

/// A palette register (BGP, OBP0 or OBP1) stored as four 2-bit entries.
/// Every two bits in the packed byte represent one color: bits 1-0 map
/// color id 00, bits 3-2 map 01, bits 5-4 map 10 and bits 7-6 map 11.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Palette {
    map: [Pixel; 4],
}

impl From<u8> for Palette {
    #[inline]
    fn from(value: u8) -> Self {
        Self {
            map: [
                Pixel::from(value),
                Pixel::from(value >> 2),
                Pixel::from(value >> 4),
                Pixel::from(value >> 6),
            ],
        }
    }
}

impl From<Palette> for u8 {
    #[inline]
    fn from(palette: Palette) -> u8 {
        u8::from(palette.map[0])
            | u8::from(palette.map[1]) << 2
            | u8::from(palette.map[2]) << 4
            | u8::from(palette.map[3]) << 6
    }
}
