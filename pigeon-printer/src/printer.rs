//! Network thermal printer (raw TCP, port 9100)
//!
//! Most thermal printers support raw TCP printing on port 9100. Pages are
//! rasterized into ESC/POS bit images and the whole document is sent in one
//! connection when it ends.

use crate::device::{PrintDocument, PrinterDriver};
use crate::error::{PrintError, PrintResult};
use crate::escpos::EscPosBuilder;
use image::RgbImage;
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Lines fed before the cut so the last row clears the cutter
const TRAILING_FEED: u8 = 4;

/// Network printer (TCP port 9100)
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: SocketAddr,
    timeout: Duration,
    page_height: i32,
}

impl NetworkPrinter {
    /// Create a new network printer
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        Self::from_addr(&format!("{}:{}", host, port))
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
            page_height: 0,
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the page height reported to the paginator (0 = let it decide)
    pub fn with_page_height(mut self, page_height: i32) -> Self {
        self.page_height = page_height;
        self
    }

    /// Get the printer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Check if the printer is reachable
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, tokio::net::TcpStream::connect(self.addr)).await
        {
            Ok(Ok(_)) => {
                info!("Printer online");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }

    #[instrument(skip(self, data), fields(addr = %self.addr, data_len = data.len()))]
    fn send(&self, data: &[u8]) -> PrintResult<()> {
        info!("Connecting to printer");

        let mut stream = TcpStream::connect_timeout(&self.addr, self.timeout).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                PrintError::Timeout(format!("Connection timeout: {}", self.addr))
            } else {
                PrintError::Connection(format!("{}: {}", self.addr, e))
            }
        })?;
        stream.set_write_timeout(Some(self.timeout))?;

        stream.write_all(data).map_err(|e| {
            PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            ))
        })?;
        stream.flush()?;

        info!("Print job sent successfully");
        Ok(())
    }
}

impl PrinterDriver for NetworkPrinter {
    fn name(&self) -> &str {
        "network"
    }

    fn open_document(&self, doc_name: &str) -> PrintResult<Box<dyn PrintDocument>> {
        info!(addr = %self.addr, doc = doc_name, "Opening network document");
        let mut builder = EscPosBuilder::new();
        builder.left();
        Ok(Box::new(NetworkDocument {
            printer: self.clone(),
            builder: Some(builder),
            page_open: false,
        }))
    }
}

/// Buffered ESC/POS document; nothing reaches the wire before `end_document`
struct NetworkDocument {
    printer: NetworkPrinter,
    builder: Option<EscPosBuilder>,
    page_open: bool,
}

impl NetworkDocument {
    fn builder(&mut self, op: &'static str) -> PrintResult<&mut EscPosBuilder> {
        self.builder
            .as_mut()
            .ok_or_else(|| PrintError::device(op, "document already ended"))
    }
}

impl PrintDocument for NetworkDocument {
    fn max_page_height(&self) -> i32 {
        self.printer.page_height
    }

    fn start_page(&mut self) -> PrintResult<()> {
        if self.page_open {
            return Err(PrintError::device("start_page", "page already open"));
        }
        self.builder("start_page")?;
        self.page_open = true;
        Ok(())
    }

    fn blit(&mut self, band: &RgbImage, _origin: (i32, i32)) -> PrintResult<()> {
        if !self.page_open {
            return Err(PrintError::device("blit", "no open page"));
        }
        self.builder("blit")?.raster(band);
        Ok(())
    }

    fn end_page(&mut self) -> PrintResult<()> {
        if !self.page_open {
            return Err(PrintError::device("end_page", "no open page"));
        }
        self.page_open = false;
        Ok(())
    }

    fn end_document(&mut self) -> PrintResult<()> {
        let mut builder = self
            .builder
            .take()
            .ok_or_else(|| PrintError::device("end_document", "document already ended"))?;
        builder.feed(TRAILING_FEED).cut_feed(0);
        self.printer.send(&builder.build())
    }

    fn close(self: Box<Self>) -> PrintResult<()> {
        if let Some(builder) = &self.builder {
            warn!(
                addr = %self.printer.addr,
                buffered = builder.len(),
                "Discarding unfinished network document"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_network_printer_new() {
        let printer = NetworkPrinter::new("192.168.1.100", 9100).unwrap();
        assert_eq!(printer.addr().port(), 9100);
    }

    #[test]
    fn test_network_printer_from_addr() {
        let printer = NetworkPrinter::from_addr("192.168.1.100:9100").unwrap();
        assert_eq!(printer.addr().port(), 9100);
    }

    #[test]
    fn test_invalid_addr() {
        let result = NetworkPrinter::from_addr("invalid");
        assert!(matches!(result, Err(PrintError::InvalidConfig(_))));
    }

    #[test]
    fn test_document_sent_on_end() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            conn.read_to_end(&mut buf).unwrap();
            buf
        });

        let printer = NetworkPrinter::from_addr(&addr.to_string()).unwrap();
        let mut doc = printer.open_document("test").unwrap();
        let band = RgbImage::from_pixel(16, 3, Rgb([0, 0, 0]));
        doc.start_page().unwrap();
        doc.blit(&band, (0, 0)).unwrap();
        doc.end_page().unwrap();
        doc.end_document().unwrap();
        doc.close().unwrap();

        let received = server.join().unwrap();
        assert!(received.starts_with(&[0x1B, 0x40]));
        assert!(received.windows(4).any(|w| w == [0x1D, 0x76, 0x30, 0x00]));
        assert!(received.ends_with(&[0x1D, 0x56, 0x42, 0x00]));
    }

    #[test]
    fn test_blit_without_page_is_fault() {
        let printer = NetworkPrinter::from_addr("127.0.0.1:9100").unwrap();
        let mut doc = printer.open_document("test").unwrap();
        let band = RgbImage::new(8, 1);
        let err = doc.blit(&band, (0, 0)).unwrap_err();
        assert!(matches!(err, PrintError::Device { op: "blit", .. }));
        doc.close().unwrap();
    }
}
