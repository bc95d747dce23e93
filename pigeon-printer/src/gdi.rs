//! Windows driver printer
//!
//! Prints raster pages through the installed printer driver with GDI:
//! `CreateDCW("WINSPOOL")` → `StartDocW` → (`StartPage` → `StretchDIBits`
//! → `EndPage`)* → `EndDoc` → `DeleteDC`.

use crate::device::{PrintDocument, PrinterDriver};
use crate::error::{PrintError, PrintResult};
use image::RgbImage;
use std::mem::size_of;
use tracing::{info, instrument, warn};
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateDCW, DIB_RGB_COLORS, DeleteDC, GetDeviceCaps,
    HDC, SRCCOPY, StretchDIBits, VERTRES,
};
use windows::Win32::Storage::Xps::DOCINFOW;
use windows::core::{PCWSTR, PWSTR, w};

#[link(name = "gdi32")]
unsafe extern "system" {
    fn AbortDoc(hdc: HDC) -> i32;
    fn EndDoc(hdc: HDC) -> i32;
    fn EndPage(hdc: HDC) -> i32;
    fn StartDocW(hdc: HDC, lpdi: *const DOCINFOW) -> i32;
    fn StartPage(hdc: HDC) -> i32;
}

/// Windows driver printer
#[derive(Debug, Clone)]
pub struct WindowsPrinter {
    name: String,
}

impl WindowsPrinter {
    /// Create a printer with a specific name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// List available printers (filters out virtual printers)
    pub fn list() -> PrintResult<Vec<String>> {
        use windows::Win32::Graphics::Printing::{
            EnumPrintersW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL, PRINTER_INFO_5W,
        };

        unsafe {
            let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
            let mut needed: u32 = 0;
            let mut returned: u32 = 0;

            let _ = EnumPrintersW(flags, None, 5, None, &mut needed, &mut returned);

            if needed == 0 {
                return Ok(Vec::new());
            }

            let mut buf: Vec<u8> = vec![0; needed as usize];
            EnumPrintersW(
                flags,
                None,
                5,
                Some(buf.as_mut_slice()),
                &mut needed,
                &mut returned,
            )
            .map_err(|_| PrintError::Driver("EnumPrintersW failed".to_string()))?;

            let ptr = buf.as_ptr() as *const PRINTER_INFO_5W;
            let slice = std::slice::from_raw_parts(ptr, returned as usize);

            let mut result: Vec<String> = Vec::new();
            for info in slice.iter() {
                if info.pPrinterName.is_null() {
                    continue;
                }
                let name = PWSTR(info.pPrinterName.0).to_string().unwrap_or_default();

                let port = if info.pPortName.is_null() {
                    String::new()
                } else {
                    PWSTR(info.pPortName.0).to_string().unwrap_or_default()
                };

                if !Self::is_virtual_port(&port) {
                    result.push(name);
                }
            }

            Ok(result)
        }
    }

    /// Check if a port is a virtual printer port
    fn is_virtual_port(port: &str) -> bool {
        let p = port.to_lowercase();
        p == "file:"
            || p == "portprompt:"
            || p == "xpsport:"
            || p.starts_with("onenote")
            || p == "nul:"
            || p.starts_with("wfsport:")
    }

    /// Get the default printer name
    pub fn default_printer() -> PrintResult<Option<String>> {
        use windows::Win32::Graphics::Printing::GetDefaultPrinterW;

        unsafe {
            let mut needed: u32 = 0;
            let _ = GetDefaultPrinterW(None, &mut needed);

            if needed == 0 {
                return Ok(None);
            }

            let mut buf: Vec<u16> = vec![0; needed as usize];
            let ok = GetDefaultPrinterW(Some(PWSTR(buf.as_mut_ptr())), &mut needed);

            if !ok.as_bool() {
                return Ok(None);
            }

            let name = PWSTR(buf.as_mut_ptr())
                .to_string()
                .map_err(|e| PrintError::Driver(format!("UTF-16 decode failed: {}", e)))?;

            Ok(Some(name))
        }
    }

    /// Resolve a printer name - returns the name if valid, or default/first available
    pub fn resolve(name: Option<&str>) -> PrintResult<String> {
        if let Some(name) = name {
            let printers = Self::list()?;
            if printers.iter().any(|p| p == name) {
                return Ok(name.to_string());
            }
            return Err(PrintError::Driver(format!("Printer not found: {}", name)));
        }

        if let Some(default) = Self::default_printer()? {
            return Ok(default);
        }

        let printers = Self::list()?;
        printers
            .first()
            .cloned()
            .ok_or_else(|| PrintError::Driver("No printers available".to_string()))
    }
}

impl PrinterDriver for WindowsPrinter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(printer = %self.name))]
    fn open_document(&self, doc_name: &str) -> PrintResult<Box<dyn PrintDocument>> {
        let printer_w = to_wide(&self.name);
        let doc_w = to_wide(doc_name);

        unsafe {
            let hdc = CreateDCW(
                w!("WINSPOOL"),
                PCWSTR::from_raw(printer_w.as_ptr()),
                PCWSTR::null(),
                None,
            );
            if hdc.is_invalid() {
                return Err(PrintError::device("open_document", "CreateDCW failed"));
            }

            let di = DOCINFOW {
                cbSize: size_of::<DOCINFOW>() as i32,
                lpszDocName: PCWSTR::from_raw(doc_w.as_ptr()),
                ..Default::default()
            };
            if StartDocW(hdc, &di) <= 0 {
                let _ = DeleteDC(hdc);
                return Err(PrintError::device("open_document", "StartDocW failed"));
            }

            info!(doc = doc_name, "Document started");
            Ok(Box::new(GdiDocument { hdc, active: true }))
        }
    }
}

/// An open GDI print job; `active` until ended or aborted
struct GdiDocument {
    hdc: HDC,
    active: bool,
}

impl PrintDocument for GdiDocument {
    fn max_page_height(&self) -> i32 {
        unsafe { GetDeviceCaps(Some(self.hdc), VERTRES) }
    }

    fn start_page(&mut self) -> PrintResult<()> {
        if unsafe { StartPage(self.hdc) } <= 0 {
            return Err(PrintError::device("start_page", "StartPage failed"));
        }
        Ok(())
    }

    fn blit(&mut self, band: &RgbImage, origin: (i32, i32)) -> PrintResult<()> {
        let (width, height) = (band.width() as i32, band.height() as i32);
        let bgra = to_bgra(band);

        let bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Negative height: top-down rows
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let r = unsafe {
            StretchDIBits(
                self.hdc,
                origin.0,
                origin.1,
                width,
                height,
                0,
                0,
                width,
                height,
                Some(bgra.as_ptr() as *const _),
                &bmi,
                DIB_RGB_COLORS,
                SRCCOPY,
            )
        };
        if r == 0 {
            return Err(PrintError::device("blit", "StretchDIBits failed"));
        }
        Ok(())
    }

    fn end_page(&mut self) -> PrintResult<()> {
        if unsafe { EndPage(self.hdc) } <= 0 {
            return Err(PrintError::device("end_page", "EndPage failed"));
        }
        Ok(())
    }

    fn end_document(&mut self) -> PrintResult<()> {
        let r = unsafe { EndDoc(self.hdc) };
        self.active = false;
        if r <= 0 {
            return Err(PrintError::device("end_document", "EndDoc failed"));
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> PrintResult<()> {
        unsafe {
            if self.active {
                warn!("Aborting unfinished document");
                let _ = AbortDoc(self.hdc);
            }
            if !DeleteDC(self.hdc).as_bool() {
                return Err(PrintError::device("close", "DeleteDC failed"));
            }
        }
        Ok(())
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain([0]).collect()
}

fn to_bgra(band: &RgbImage) -> Vec<u8> {
    let mut out = Vec::with_capacity(band.as_raw().len() / 3 * 4);
    for px in band.pixels() {
        let [r, g, b] = px.0;
        out.extend_from_slice(&[b, g, r, 255]);
    }
    out
}
