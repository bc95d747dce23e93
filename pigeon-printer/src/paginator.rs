//! Page slicing
//!
//! Splits a tall bitmap into contiguous horizontal bands no taller than the
//! device page and drives one start/blit/end cycle per band.

use crate::device::{PrintDocument, PrinterDriver};
use crate::error::PrintResult;
use image::RgbImage;
use image::imageops;
use tracing::{debug, instrument, warn};

/// Page height used when the device reports none
pub const FALLBACK_PAGE_HEIGHT: u32 = 3000;

/// One horizontal slice of a bitmap, in raster rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub top: u32,
    pub height: u32,
}

/// Outcome of a printed document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintSummary {
    /// Height of every emitted page, in order
    pub pages: Vec<u32>,
}

impl PrintSummary {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Page height to slice with, given what the device reported
pub fn effective_page_height(reported: i32) -> u32 {
    if reported > 0 {
        reported as u32
    } else {
        FALLBACK_PAGE_HEIGHT
    }
}

/// Split `total_height` rows into bands of at most `page_height` rows.
///
/// Only the last band may be shorter. A zero page height is treated as the
/// fallback so the loop always advances.
pub fn paginate(total_height: u32, page_height: u32) -> Vec<Band> {
    let page_height = if page_height == 0 {
        FALLBACK_PAGE_HEIGHT
    } else {
        page_height
    };

    let mut bands = Vec::with_capacity(total_height.div_ceil(page_height) as usize);
    let mut cursor = 0;
    while cursor < total_height {
        let height = page_height.min(total_height - cursor);
        bands.push(Band {
            top: cursor,
            height,
        });
        cursor += height;
    }
    bands
}

/// Print a finished bitmap as one document.
///
/// The document is opened once and closed once. If any page fails the
/// handle is still closed before the fault is returned.
#[instrument(
    skip(driver, bitmap),
    fields(printer = driver.name(), width = bitmap.width(), height = bitmap.height())
)]
pub fn print_bitmap(
    driver: &dyn PrinterDriver,
    doc_name: &str,
    bitmap: &RgbImage,
) -> PrintResult<PrintSummary> {
    let mut doc = driver.open_document(doc_name)?;

    let result = emit_pages(doc.as_mut(), bitmap);
    let closed = doc.close();

    match (result, closed) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!(error = %close_err, "Failed to close document after device fault");
            Err(e)
        }
    }
}

fn emit_pages(doc: &mut dyn PrintDocument, bitmap: &RgbImage) -> PrintResult<PrintSummary> {
    let reported = doc.max_page_height();
    let page_height = effective_page_height(reported);
    if reported <= 0 {
        warn!(reported, fallback = page_height, "Device reported no page height");
    }

    let mut summary = PrintSummary::default();
    for band in paginate(bitmap.height(), page_height) {
        let region =
            imageops::crop_imm(bitmap, 0, band.top, bitmap.width(), band.height).to_image();

        doc.start_page()?;
        doc.blit(&region, (0, 0))?;
        doc.end_page()?;

        debug!(top = band.top, height = band.height, "Page emitted");
        summary.pages.push(band.height);
    }

    doc.end_document()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrintError;
    use image::Rgb;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Open(String),
        StartPage,
        Blit { width: u32, height: u32, first_row: u8 },
        EndPage,
        EndDocument,
        Close,
    }

    struct RecordingDriver {
        page_height: i32,
        fail_on_blit: Option<usize>,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl RecordingDriver {
        fn new(page_height: i32) -> Self {
            Self {
                page_height,
                fail_on_blit: None,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct RecordingDocument {
        page_height: i32,
        fail_on_blit: Option<usize>,
        blits: usize,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl PrinterDriver for RecordingDriver {
        fn name(&self) -> &str {
            "recording"
        }

        fn open_document(&self, doc_name: &str) -> PrintResult<Box<dyn PrintDocument>> {
            self.calls.lock().unwrap().push(Call::Open(doc_name.to_string()));
            Ok(Box::new(RecordingDocument {
                page_height: self.page_height,
                fail_on_blit: self.fail_on_blit,
                blits: 0,
                calls: self.calls.clone(),
            }))
        }
    }

    impl PrintDocument for RecordingDocument {
        fn max_page_height(&self) -> i32 {
            self.page_height
        }

        fn start_page(&mut self) -> PrintResult<()> {
            self.calls.lock().unwrap().push(Call::StartPage);
            Ok(())
        }

        fn blit(&mut self, band: &RgbImage, origin: (i32, i32)) -> PrintResult<()> {
            assert_eq!(origin, (0, 0));
            if self.fail_on_blit == Some(self.blits) {
                return Err(PrintError::device("blit", "paper jam"));
            }
            self.blits += 1;
            self.calls.lock().unwrap().push(Call::Blit {
                width: band.width(),
                height: band.height(),
                first_row: band.get_pixel(0, 0)[0],
            });
            Ok(())
        }

        fn end_page(&mut self) -> PrintResult<()> {
            self.calls.lock().unwrap().push(Call::EndPage);
            Ok(())
        }

        fn end_document(&mut self) -> PrintResult<()> {
            self.calls.lock().unwrap().push(Call::EndDocument);
            Ok(())
        }

        fn close(self: Box<Self>) -> PrintResult<()> {
            self.calls.lock().unwrap().push(Call::Close);
            Ok(())
        }
    }

    /// Bitmap whose red channel encodes the row index modulo 256
    fn striped(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |_, y| Rgb([(y % 256) as u8, 0, 0]))
    }

    fn heights(bands: &[Band]) -> Vec<u32> {
        bands.iter().map(|b| b.height).collect()
    }

    #[test]
    fn test_paginate_splits_tall_bitmap() {
        let bands = paginate(7000, 3000);
        assert_eq!(heights(&bands), vec![3000, 3000, 1000]);
        assert_eq!(bands[1].top, 3000);
        assert_eq!(bands[2].top, 6000);
    }

    #[test]
    fn test_paginate_covers_every_row_once() {
        for total in [0u32, 1, 2, 99, 100, 101, 250, 4096] {
            for page in [1u32, 7, 100, 3000] {
                let bands = paginate(total, page);
                assert_eq!(bands.iter().map(|b| b.height).sum::<u32>(), total);

                let mut expected_top = 0;
                for (i, band) in bands.iter().enumerate() {
                    assert_eq!(band.top, expected_top, "bands must be contiguous");
                    assert!(band.height <= page);
                    assert!(band.height > 0);
                    if i + 1 < bands.len() {
                        assert_eq!(band.height, page, "only the last band may be short");
                    }
                    expected_top += band.height;
                }
            }
        }
    }

    #[test]
    fn test_paginate_exact_multiple() {
        assert_eq!(heights(&paginate(6000, 3000)), vec![3000, 3000]);
        assert_eq!(heights(&paginate(2999, 3000)), vec![2999]);
    }

    #[test]
    fn test_effective_page_height_fallback() {
        assert_eq!(effective_page_height(1200), 1200);
        assert_eq!(effective_page_height(0), FALLBACK_PAGE_HEIGHT);
        assert_eq!(effective_page_height(-5), FALLBACK_PAGE_HEIGHT);
    }

    #[test]
    fn test_paginate_zero_page_height_terminates() {
        assert_eq!(heights(&paginate(7000, 0)), vec![3000, 3000, 1000]);
    }

    #[test]
    fn test_print_bitmap_call_sequence() {
        let driver = RecordingDriver::new(100);
        let bitmap = striped(8, 250);

        let summary = print_bitmap(&driver, "job-1", &bitmap).unwrap();
        assert_eq!(summary.pages, vec![100, 100, 50]);

        let calls = driver.calls();
        assert_eq!(calls.first(), Some(&Call::Open("job-1".to_string())));
        assert_eq!(calls.last(), Some(&Call::Close));
        assert_eq!(calls[calls.len() - 2], Call::EndDocument);

        let blits: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                Call::Blit {
                    width,
                    height,
                    first_row,
                } => Some((*width, *height, *first_row)),
                _ => None,
            })
            .collect();
        // Top-to-bottom order: each band starts at row 0, 100, 200
        assert_eq!(blits, vec![(8, 100, 0), (8, 100, 100), (8, 50, 200)]);

        let opens = calls.iter().filter(|c| matches!(c, Call::Open(_))).count();
        let closes = calls.iter().filter(|c| matches!(c, Call::Close)).count();
        assert_eq!((opens, closes), (1, 1));
    }

    #[test]
    fn test_print_bitmap_uses_fallback_height() {
        let driver = RecordingDriver::new(0);
        let bitmap = striped(4, 7000);

        let summary = print_bitmap(&driver, "tall", &bitmap).unwrap();
        assert_eq!(summary.pages, vec![3000, 3000, 1000]);
    }

    #[test]
    fn test_print_bitmap_closes_after_fault() {
        let mut driver = RecordingDriver::new(100);
        driver.fail_on_blit = Some(1);
        let bitmap = striped(4, 250);

        let err = print_bitmap(&driver, "jam", &bitmap).unwrap_err();
        assert!(matches!(err, PrintError::Device { op: "blit", .. }));

        let calls = driver.calls();
        assert_eq!(calls.last(), Some(&Call::Close));
        assert!(!calls.contains(&Call::EndDocument));
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::Close)).count(), 1);
    }
}
