//! Printer driver selection
//!
//! The driver is built once at startup and handed to the print worker,
//! which is its only user.

use super::config::{Config, PrinterBackend};
use super::error::Result;
use pigeon_printer::{NetworkPrinter, PrinterDriver, SpoolPrinter};
use std::sync::Arc;

/// Build the driver selected by `PRINTER_BACKEND`
pub async fn build_driver(config: &Config) -> Result<Arc<dyn PrinterDriver>> {
    match config.printer_backend {
        PrinterBackend::Windows => windows_driver(config),
        PrinterBackend::Network => {
            let printer = NetworkPrinter::from_addr(&config.printer_addr)?
                .with_page_height(config.page_height);
            if printer.is_online().await {
                tracing::info!(addr = %printer.addr(), "Network printer online");
            } else {
                // Jobs fail individually until it comes back
                tracing::warn!(addr = %printer.addr(), "Network printer not reachable");
            }
            Ok(Arc::new(printer))
        }
        PrinterBackend::Spool => {
            let printer =
                SpoolPrinter::new(config.pages_dir())?.with_page_height(config.page_height);
            tracing::info!(dir = %printer.dir().display(), "Spooling pages as PNG files");
            Ok(Arc::new(printer))
        }
    }
}

#[cfg(windows)]
fn windows_driver(config: &Config) -> Result<Arc<dyn PrinterDriver>> {
    use pigeon_printer::WindowsPrinter;

    let installed = WindowsPrinter::list()?;
    tracing::info!(count = installed.len(), printers = ?installed, "Installed printers");

    let name = WindowsPrinter::resolve(config.printer_name.as_deref())?;
    match WindowsPrinter::default_printer()? {
        Some(default) if default == name => {
            tracing::info!(printer = %name, "Printing to the default printer");
        }
        Some(default) => {
            tracing::warn!(
                printer = %name,
                default = %default,
                "Target printer is not the system default"
            );
        }
        None => tracing::warn!(printer = %name, "No system default printer"),
    }

    Ok(Arc::new(WindowsPrinter::new(&name)))
}

#[cfg(not(windows))]
fn windows_driver(_config: &Config) -> Result<Arc<dyn PrinterDriver>> {
    Err(pigeon_printer::PrintError::InvalidConfig(
        "PRINTER_BACKEND=windows is only available on Windows".to_string(),
    )
    .into())
}
