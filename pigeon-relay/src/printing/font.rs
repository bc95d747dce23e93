//! Font resolution
//!
//! Fonts are resolved once at startup. A missing preferred font is not an
//! error: the built-in 8x8 bitmap glyphs always work.

use ab_glyph::{FontVec, PxScale};
use font8x8::{BASIC_FONTS, BLOCK_FONTS, BOX_FONTS, GREEK_FONTS, HIRAGANA_FONTS, LATIN_FONTS};
use font8x8::UnicodeFonts;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ink color for all rendered text
pub const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// Glyph drawn for characters the built-in font lacks: a hollow box
const MISSING_GLYPH: [u8; 8] = [0x00, 0x7E, 0x42, 0x42, 0x42, 0x42, 0x7E, 0x00];

/// A resolved typeface. Cheap to clone.
#[derive(Clone)]
pub enum FontHandle {
    /// Parsed TrueType/OpenType face
    TrueType { font: Arc<FontVec>, source: PathBuf },
    /// Built-in 8x8 bitmap glyphs, scaled to the requested size
    Builtin,
}

impl std::fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontHandle::TrueType { source, .. } => {
                f.debug_tuple("TrueType").field(source).finish()
            }
            FontHandle::Builtin => f.write_str("Builtin"),
        }
    }
}

impl FontHandle {
    /// Pick the first candidate that loads, else the built-in glyphs.
    ///
    /// A candidate is tried as given, then inside the platform font
    /// directories. Never fails.
    pub fn resolve(candidates: &[String]) -> Self {
        for candidate in candidates {
            for path in candidate_paths(candidate) {
                if !path.is_file() {
                    continue;
                }
                match load_font(&path) {
                    Ok(font) => {
                        info!(font = %path.display(), "Using TrueType font");
                        return FontHandle::TrueType {
                            font: Arc::new(font),
                            source: path,
                        };
                    }
                    Err(e) => warn!(font = %path.display(), error = %e, "Font unusable"),
                }
            }
            debug!(font = %candidate, "Font candidate not found");
        }

        warn!(?candidates, "No usable font found, using built-in glyphs");
        FontHandle::Builtin
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, FontHandle::Builtin)
    }

    /// Draw one line of text with its top-left corner at (x, y)
    pub fn draw_line(&self, canvas: &mut RgbImage, x: i32, y: i32, size: u32, text: &str) {
        match self {
            FontHandle::TrueType { font, .. } => {
                imageproc::drawing::draw_text_mut(
                    canvas,
                    INK,
                    x,
                    y,
                    PxScale::from(size as f32),
                    &**font,
                    text,
                );
            }
            FontHandle::Builtin => draw_builtin(canvas, x, y, size, text),
        }
    }
}

fn load_font(path: &Path) -> anyhow::Result<FontVec> {
    let data = std::fs::read(path)?;
    // Index 0 also picks the first face of a .ttc collection
    Ok(FontVec::try_from_vec_and_index(data, 0)?)
}

fn candidate_paths(candidate: &str) -> Vec<PathBuf> {
    let given = PathBuf::from(candidate);
    let mut paths = vec![given.clone()];
    if given.is_relative() {
        paths.extend(font_dirs().into_iter().map(|dir| dir.join(&given)));
    }
    paths
}

fn font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if cfg!(windows) {
        let root = std::env::var("WINDIR").unwrap_or_else(|_| r"C:\Windows".to_string());
        dirs.push(Path::new(&root).join("Fonts"));
    } else if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/share/fonts/truetype"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
    }
    dirs
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| GREEK_FONTS.get(c))
        .or_else(|| HIRAGANA_FONTS.get(c))
        .or_else(|| BOX_FONTS.get(c))
        .or_else(|| BLOCK_FONTS.get(c))
        .unwrap_or(MISSING_GLYPH)
}

/// Each character occupies a `size` x `size` cell; the 8x8 glyph is
/// scaled to the cell with nearest-neighbour sampling.
fn draw_builtin(canvas: &mut RgbImage, x: i32, y: i32, size: u32, text: &str) {
    let size = size.max(1) as i64;
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);

    for (i, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            continue;
        }
        let rows = glyph(c);
        let cell_x = x as i64 + i as i64 * size;
        if cell_x >= width {
            break;
        }

        for py in 0..size {
            let row = rows[(py * 8 / size) as usize];
            if row == 0 {
                continue;
            }
            let ty = y as i64 + py;
            if ty < 0 || ty >= height {
                continue;
            }
            for px in 0..size {
                // Bit n is column n, least significant bit on the left
                if row & (1 << (px * 8 / size)) == 0 {
                    continue;
                }
                let tx = cell_x + px;
                if tx >= 0 && tx < width {
                    canvas.put_pixel(tx as u32, ty as u32, INK);
                }
            }
        }
    }
}
