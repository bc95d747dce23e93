//! # pigeon-printer
//!
//! Raster printing for thermal/label printers - device capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW a finished bitmap reaches paper:
//! - The device protocol (`PrinterDriver` / `PrintDocument`)
//! - Page slicing of arbitrarily tall bitmaps (`print_bitmap`)
//! - Windows driver printing via GDI (Windows only)
//! - Network ESC/POS printing (TCP port 9100)
//! - PNG spooling for hosts without a printer
//!
//! What to print (text layout, headers, queueing) stays in the relay.
//!
//! ## Example
//!
//! ```ignore
//! use pigeon_printer::{NetworkPrinter, print_bitmap};
//!
//! let printer = NetworkPrinter::from_addr("192.168.1.100:9100")?;
//! let bitmap = image::RgbImage::new(384, 7000);
//! let summary = print_bitmap(&printer, "Print job 1", &bitmap)?;
//! assert_eq!(summary.pages, vec![3000, 3000, 1000]);
//! ```

mod device;
mod error;
mod escpos;
mod paginator;
mod printer;
mod spool;

#[cfg(windows)]
mod gdi;

// Re-exports
pub use device::{PrintDocument, PrinterDriver};
pub use error::{PrintError, PrintResult};
pub use escpos::EscPosBuilder;
pub use paginator::{
    Band, FALLBACK_PAGE_HEIGHT, PrintSummary, effective_page_height, paginate, print_bitmap,
};
pub use printer::NetworkPrinter;
pub use spool::SpoolPrinter;

#[cfg(windows)]
pub use gdi::WindowsPrinter;
