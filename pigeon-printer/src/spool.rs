//! Spool printer
//!
//! Writes every device page as a PNG file. Used on hosts without a physical
//! printer and to inspect what a job would have printed.

use crate::device::{PrintDocument, PrinterDriver};
use crate::error::{PrintError, PrintResult};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory-backed printer
#[derive(Debug, Clone)]
pub struct SpoolPrinter {
    dir: PathBuf,
    page_height: i32,
}

impl SpoolPrinter {
    /// Create a spool printer writing into `dir` (created if missing)
    pub fn new(dir: impl Into<PathBuf>) -> PrintResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            page_height: 0,
        })
    }

    /// Set the page height reported to the paginator (0 = let it decide)
    pub fn with_page_height(mut self, page_height: i32) -> Self {
        self.page_height = page_height;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PrinterDriver for SpoolPrinter {
    fn name(&self) -> &str {
        "spool"
    }

    fn open_document(&self, doc_name: &str) -> PrintResult<Box<dyn PrintDocument>> {
        Ok(Box::new(SpoolDocument {
            dir: self.dir.clone(),
            stem: sanitize(doc_name),
            page_height: self.page_height,
            page: None,
            pages_written: 0,
            ended: false,
        }))
    }
}

struct SpoolDocument {
    dir: PathBuf,
    stem: String,
    page_height: i32,
    page: Option<RgbImage>,
    pages_written: usize,
    ended: bool,
}

impl PrintDocument for SpoolDocument {
    fn max_page_height(&self) -> i32 {
        self.page_height
    }

    fn start_page(&mut self) -> PrintResult<()> {
        if self.page.is_some() {
            return Err(PrintError::device("start_page", "page already open"));
        }
        // Canvas grows to fit whatever is blitted onto it
        self.page = Some(RgbImage::new(0, 0));
        Ok(())
    }

    fn blit(&mut self, band: &RgbImage, origin: (i32, i32)) -> PrintResult<()> {
        let page = self
            .page
            .as_mut()
            .ok_or_else(|| PrintError::device("blit", "no open page"))?;

        let x = origin.0.max(0) as u32;
        let y = origin.1.max(0) as u32;
        let width = page.width().max(x + band.width());
        let height = page.height().max(y + band.height());
        if (width, height) != page.dimensions() {
            let mut grown = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
            image::imageops::replace(&mut grown, &*page, 0, 0);
            *page = grown;
        }
        image::imageops::replace(page, band, x as i64, y as i64);
        Ok(())
    }

    fn end_page(&mut self) -> PrintResult<()> {
        let page = self
            .page
            .take()
            .ok_or_else(|| PrintError::device("end_page", "no open page"))?;

        self.pages_written += 1;
        let path = self
            .dir
            .join(format!("{}-p{:03}.png", self.stem, self.pages_written));
        page.save(&path)?;
        debug!(path = %path.display(), "Spooled page");
        Ok(())
    }

    fn end_document(&mut self) -> PrintResult<()> {
        self.ended = true;
        info!(doc = %self.stem, pages = self.pages_written, "Spooled document");
        Ok(())
    }

    fn close(self: Box<Self>) -> PrintResult<()> {
        if !self.ended {
            debug!(
                doc = %self.stem,
                pages = self.pages_written,
                "Spool document closed unfinished"
            );
        }
        Ok(())
    }
}

/// Keep file names portable
fn sanitize(doc_name: &str) -> String {
    let stem: String = doc_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem
    }
}
