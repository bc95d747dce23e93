//! Provenance header
//!
//! Every printed job starts with who sent it and when:
//!
//! ```text
//! User: Ada Lovelace (@ada)
//! Time: 2024-01-22 14:32:15
//! ------------------------------
//! <body>
//! ```

use super::font::FontHandle;
use super::renderer::PAPER;
use super::types::Provenance;
use image::RgbImage;
use image::imageops;

/// Timestamp layout of the time line
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header layout, drawn smaller than the body text
#[derive(Debug, Clone)]
pub struct HeaderStyle {
    pub font_size: u32,
    pub line_height: u32,
    /// Added once to the header block height
    pub padding: u32,
    /// Top-left of the first header line
    pub origin: (i32, i32),
    pub separator_len: usize,
}

impl Default for HeaderStyle {
    fn default() -> Self {
        Self {
            font_size: 20,
            line_height: 24,
            padding: 10,
            origin: (5, 5),
            separator_len: 30,
        }
    }
}

impl HeaderStyle {
    /// Height of a header block with `line_count` lines
    pub fn block_height(&self, line_count: usize) -> u32 {
        line_count as u32 * self.line_height + self.padding
    }
}

/// User line, time line and separator
pub fn header_lines(provenance: &Provenance, style: &HeaderStyle) -> Vec<String> {
    let handle = match &provenance.handle {
        Some(handle) => format!("@{}", handle.trim_start_matches('@')),
        None => "No Username".to_string(),
    };
    vec![
        format!("User: {} ({})", provenance.display_name, handle),
        format!("Time: {}", provenance.submitted_at.format(TIME_FORMAT)),
        "-".repeat(style.separator_len),
    ]
}

/// Paint the header above `body`.
///
/// The result keeps the body's width and grows by exactly
/// [`HeaderStyle::block_height`]; the body pixels are copied unchanged.
/// Without provenance the body is returned as is.
pub fn composite_header(
    body: RgbImage,
    provenance: Option<&Provenance>,
    style: &HeaderStyle,
    font: &FontHandle,
) -> RgbImage {
    let Some(provenance) = provenance else {
        return body;
    };

    let lines = header_lines(provenance, style);
    let header_height = style.block_height(lines.len());

    let mut canvas = RgbImage::from_pixel(body.width(), body.height() + header_height, PAPER);

    let (x, mut y) = style.origin;
    for line in &lines {
        font.draw_line(&mut canvas, x, y, style.font_size, line);
        y += style.line_height as i32;
    }

    imageops::replace(&mut canvas, &body, 0, header_height as i64);
    canvas
}
