use crate::ppu::palette::Pixel;
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Frame buffer to store the current screen state as raw 2-bit color
/// indices in row-major order. Palette translation and upscaling happen
/// in the embedding program.
#[derive(Clone)]
pub struct FrameBuffer {
    buffer: Vec<Pixel>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self {
            buffer: vec![Pixel::Zero; usize::from(SCREEN_WIDTH) * usize::from(SCREEN_HEIGHT)],
        }
    }
}

impl FrameBuffer {
    #[inline]
    pub fn write_pixel(&mut self, x: u8, y: u8, pixel: Pixel) {
        self.buffer[usize::from(y) * usize::from(SCREEN_WIDTH) + usize::from(x)] = pixel;
    }

    #[inline]
    pub fn pixel(&self, x: u8, y: u8) -> Pixel {
        self.buffer[usize::from(y) * usize::from(SCREEN_WIDTH) + usize::from(x)]
    }

    /// The whole frame, row-major.
    #[inline]
    pub fn pixels(&self) -> &[Pixel] {
        &self.buffer
    }
}
