//! Printer device capability
//!
//! A driver opens documents; a document accepts raster bands one page at a
//! time. The protocol for one document is:
//!
//! ```text
//! open_document ; (start_page ; blit ; end_page)* ; end_document ; close
//! ```
//!
//! `close` is always the last call and must be accepted even after a fault,
//! in which case an unfinished document is aborted rather than ended.

use crate::error::PrintResult;
use image::RgbImage;

/// A printer target that can open documents
pub trait PrinterDriver: Send + Sync {
    /// Printer target identifier, used in logs
    fn name(&self) -> &str;

    /// Open a new document on the device
    fn open_document(&self, doc_name: &str) -> PrintResult<Box<dyn PrintDocument>>;
}

/// One open document on a printer device
pub trait PrintDocument {
    /// Maximum raster height of a single page, as reported by the device.
    ///
    /// Zero or negative means the device could not tell.
    fn max_page_height(&self) -> i32;

    /// Begin a new physical page
    fn start_page(&mut self) -> PrintResult<()>;

    /// Draw a raster band at `origin` (device pixels) on the current page
    fn blit(&mut self, band: &RgbImage, origin: (i32, i32)) -> PrintResult<()>;

    /// Finish the current page
    fn end_page(&mut self) -> PrintResult<()>;

    /// Flush the whole document to the device
    fn end_document(&mut self) -> PrintResult<()>;

    /// Release the device handle
    fn close(self: Box<Self>) -> PrintResult<()>;
}
