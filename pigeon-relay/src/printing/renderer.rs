//! Job rasterizer
//!
//! Text is laid out with a fixed character budget per line and drawn top to
//! bottom. Images are decoded, flattened onto white and resized so their
//! width matches the printer's raster width.

use super::error::RenderError;
use super::font::FontHandle;
use super::header::{HeaderStyle, composite_header};
use super::types::{ImageSource, Job, JobPayload};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use tracing::{debug, instrument};

pub const PAPER: Rgb<u8> = Rgb([255, 255, 255]);

/// Tallest image bitmap the renderer will produce, in pixels
pub const DEFAULT_MAX_IMAGE_HEIGHT: u32 = 20_000;

/// Body text layout
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font_size: u32,
    /// Extra space between consecutive lines
    pub line_gap: u32,
    /// Total blank space above and below the text, split evenly
    pub vertical_padding: u32,
    pub left_margin: i32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 24,
            line_gap: 4,
            vertical_padding: 20,
            left_margin: 0,
        }
    }
}

impl TextStyle {
    pub fn line_height(&self) -> u32 {
        self.font_size + self.line_gap
    }
}

/// Characters that fit on one line: `floor(width / font_size)`, at least 1
pub fn chars_per_line(printable_width: u32, font_size: u32) -> usize {
    (printable_width / font_size.max(1)).max(1) as usize
}

/// Split on newlines, then word-wrap each line to `width` characters.
///
/// Widths count characters, never bytes. A word longer than a line fills
/// whatever room is left on the current line before it is broken. Blank
/// input lines produce no output lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw in text.lines() {
        wrap_line(raw, width, &mut lines);
    }
    lines
}

fn wrap_line(line: &str, width: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        if current_len > 0 {
            if current_len + 1 + word.len() <= width {
                current.push(' ');
                current_len += 1;
            } else {
                if word.len() > width && current_len + 1 < width {
                    current.push(' ');
                    current.extend(word.drain(..width - current_len - 1));
                }
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
        }

        while current_len + word.len() > width {
            let room = width - current_len;
            current.extend(word.drain(..room));
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current_len += word.len();
        current.extend(word);
    }

    if current_len > 0 {
        out.push(current);
    }
}

/// Rasterize text into a bitmap exactly `width` pixels wide.
///
/// Height is `line_count * (font_size + line_gap) + vertical_padding`.
pub fn rasterize_text(text: &str, width: u32, style: &TextStyle, font: &FontHandle) -> RgbImage {
    let lines = wrap_text(text, chars_per_line(width, style.font_size));
    let height = lines.len() as u32 * style.line_height() + style.vertical_padding;

    let mut canvas = RgbImage::from_pixel(width, height, PAPER);
    let mut y = (style.vertical_padding / 2) as i32;
    for line in &lines {
        if !line.is_empty() {
            font.draw_line(&mut canvas, style.left_margin, y, style.font_size, line);
        }
        y += style.line_height() as i32;
    }

    debug!(lines = lines.len(), height, "Text rasterized");
    canvas
}

/// Decode an image payload
pub fn decode_image(source: &ImageSource) -> Result<DynamicImage, RenderError> {
    let img = match source {
        ImageSource::Bytes(bytes) => image::load_from_memory(bytes)?,
        ImageSource::File(path) => {
            let bytes = std::fs::read(path)?;
            image::load_from_memory(&bytes)?
        }
    };

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyImage { width, height });
    }
    Ok(img)
}

/// Height of `width x height` once scaled to `target_width`, rounded
fn scaled_height(width: u32, height: u32, target_width: u32) -> u64 {
    let width = u64::from(width.max(1));
    let scaled = (u64::from(height) * u64::from(target_width) + width / 2) / width;
    scaled.max(1)
}

/// Flatten onto white and scale to `target_width`, keeping the aspect ratio.
///
/// Height scales by the same ratio, rounded. Images already at the target
/// width are left untouched. A result taller than `max_height` is refused
/// before any scaled buffer is allocated.
pub fn normalize_image(
    img: &DynamicImage,
    target_width: u32,
    max_height: u32,
) -> Result<RgbImage, RenderError> {
    let (width, height) = img.dimensions();
    let target_height = scaled_height(width, height, target_width);
    if target_height > u64::from(max_height) {
        return Err(RenderError::TooLarge {
            width,
            height,
            scaled_height: target_height,
            limit: max_height,
        });
    }
    let target_height = target_height as u32;

    let flat = flatten_on_white(img);
    if width == target_width {
        return Ok(flat);
    }
    Ok(image::imageops::resize(&flat, target_width, target_height, FilterType::Lanczos3))
}

/// Transparent pixels become paper
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Turns jobs into printable bitmaps
#[derive(Debug, Clone)]
pub struct Renderer {
    width: u32,
    text: TextStyle,
    header: HeaderStyle,
    font: FontHandle,
    max_image_height: u32,
}

impl Renderer {
    pub fn new(width: u32, font: FontHandle) -> Self {
        Self {
            width,
            text: TextStyle::default(),
            header: HeaderStyle::default(),
            font,
            max_image_height: DEFAULT_MAX_IMAGE_HEIGHT,
        }
    }

    /// Refuse images whose scaled height exceeds `max_image_height`
    pub fn with_max_image_height(mut self, max_image_height: u32) -> Self {
        self.max_image_height = max_image_height;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Rasterize the payload without any header
    pub fn rasterize(&self, payload: &JobPayload) -> Result<RgbImage, RenderError> {
        match payload {
            JobPayload::Text(text) => Ok(rasterize_text(text, self.width, &self.text, &self.font)),
            JobPayload::Image(source) => {
                normalize_image(&decode_image(source)?, self.width, self.max_image_height)
            }
        }
    }

    /// Rasterize and add the provenance header. Called once per job.
    #[instrument(skip(self, job), fields(job_id = %job.id, kind = %job.kind()))]
    pub fn render(&self, job: &Job) -> Result<RgbImage, RenderError> {
        let body = self.rasterize(&job.payload)?;
        Ok(composite_header(
            body,
            job.provenance.as_ref(),
            &self.header,
            &self.font,
        ))
    }
}
