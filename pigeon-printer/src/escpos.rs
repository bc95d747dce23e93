//! ESC/POS command builder
//!
//! Raster-only subset: every page reaches the printer as a `GS v 0` bit
//! image, so text never depends on the printer's code pages.

use image::RgbImage;

/// Luma below this prints a black dot
const LUMA_THRESHOLD: f32 = 128.0;

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    /// Create a new builder, starting with printer initialization (ESC @)
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(4096);
        buf.extend_from_slice(&[0x1B, 0x40]);
        Self { buf }
    }

    /// Align content to the left edge
    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC d n
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    /// Full cut with feed.
    /// Uses GS V 66 n, which lets the printer manage cutter-to-head distance.
    pub fn cut_feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x42, lines]);
        self
    }

    /// Append one raster band as a `GS v 0` bit image.
    ///
    /// Dark pixels (luma < 128) become dots. Rows taller than the command's
    /// 16-bit height field are split into several blocks.
    pub fn raster(&mut self, band: &RgbImage) -> &mut Self {
        let width = band.width();
        let x_bytes = width.div_ceil(8);

        let mut top = 0;
        while top < band.height() {
            let rows = (band.height() - top).min(u16::MAX as u32);

            // GS v 0 m xL xH yL yH
            self.buf.extend_from_slice(&[0x1D, 0x76, 0x30, 0x00]);
            self.buf.push(x_bytes as u8);
            self.buf.push((x_bytes >> 8) as u8);
            self.buf.push(rows as u8);
            self.buf.push((rows >> 8) as u8);

            for y in top..top + rows {
                for x_byte in 0..x_bytes {
                    let mut byte = 0u8;
                    for bit in 0..8 {
                        let x = x_byte * 8 + bit;
                        if x < width && is_dark(band.get_pixel(x, y).0) {
                            byte |= 1 << (7 - bit);
                        }
                    }
                    self.buf.push(byte);
                }
            }
            top += rows;
        }
        self
    }

    /// Bytes accumulated so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the final byte buffer
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn is_dark([r, g, b]: [u8; 3]) -> bool {
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    luma < LUMA_THRESHOLD
}
