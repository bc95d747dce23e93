use std::path::PathBuf;

use crate::printing::renderer::DEFAULT_MAX_IMAGE_HEIGHT;

/// Which device driver prints the jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterBackend {
    /// Installed Windows printer driver (GDI)
    Windows,
    /// Raw ESC/POS over TCP
    Network,
    /// PNG pages written to `<work_dir>/pages`
    Spool,
}

impl PrinterBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "windows" | "driver" | "gdi" => Some(Self::Windows),
            "network" | "escpos" | "tcp" => Some(Self::Network),
            "spool" | "file" => Some(Self::Spool),
            _ => None,
        }
    }

    fn platform_default() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Spool
        }
    }
}

/// Relay configuration, read once at startup
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./work_dir | spool, logs, spooled pages |
/// | HTTP_PORT | 3000 | intake port |
/// | PRINTER_BACKEND | windows / spool | windows, network, spool |
/// | PRINTER_NAME | system default | printer target |
/// | PRINTER_ADDR | 127.0.0.1:9100 | network printer address |
/// | PRINTER_WIDTH | 384 | raster width (58mm = 384, 80mm = 576) |
/// | PRINTER_PAGE_HEIGHT | 0 | page height for network/spool (0 = fallback) |
/// | MAX_TEXT_LENGTH | 1500 | longest accepted text, in characters |
/// | MAX_IMAGE_BYTES | 10485760 | largest accepted upload |
/// | MAX_IMAGE_HEIGHT | 20000 | tallest image after scaling to the raster width |
/// | FONT_PATH | msyh.ttc | comma-separated font candidates |
/// | LOG_LEVEL | info | log verbosity |
/// | LOG_JSON | false | JSON log lines |
/// | LOG_TO_FILE | false | daily rotating files under WORK_DIR/logs |
///
/// # Example
///
/// ```ignore
/// PRINTER_BACKEND=network PRINTER_ADDR=192.168.1.50:9100 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub http_port: u16,
    pub printer_backend: PrinterBackend,
    /// Printer target identifier; `None` means the system default
    pub printer_name: Option<String>,
    pub printer_addr: String,
    /// Nominal raster width in pixels
    pub printer_width: u32,
    pub page_height: i32,
    /// Longest accepted text submission, in characters
    pub max_text_length: usize,
    pub max_image_bytes: usize,
    /// Tallest image bitmap after scaling to `printer_width`
    pub max_image_height: u32,
    pub font_candidates: Vec<String>,
    pub log_level: String,
    pub log_json: bool,
    pub log_to_file: bool,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Unset or unparsable variables fall back to defaults.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "./work_dir".into())
                .into(),
            http_port: env_parse("HTTP_PORT", 3000),
            printer_backend: std::env::var("PRINTER_BACKEND")
                .ok()
                .and_then(|v| PrinterBackend::parse(&v))
                .unwrap_or_else(PrinterBackend::platform_default),
            printer_name: std::env::var("PRINTER_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            printer_addr: std::env::var("PRINTER_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:9100".into()),
            printer_width: env_parse("PRINTER_WIDTH", 384),
            page_height: env_parse("PRINTER_PAGE_HEIGHT", 0),
            max_text_length: env_parse("MAX_TEXT_LENGTH", 1500),
            max_image_bytes: env_parse("MAX_IMAGE_BYTES", 10 * 1024 * 1024),
            max_image_height: env_parse("MAX_IMAGE_HEIGHT", DEFAULT_MAX_IMAGE_HEIGHT),
            font_candidates: std::env::var("FONT_PATH")
                .unwrap_or_else(|_| "msyh.ttc".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_parse("LOG_JSON", false),
            log_to_file: env_parse("LOG_TO_FILE", false),
        }
    }

    /// Override the work directory and port
    ///
    /// Common in tests
    pub fn with_overrides(work_dir: impl Into<PathBuf>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// Uploaded images waiting to be printed
    pub fn spool_dir(&self) -> PathBuf {
        self.work_dir.join("spool")
    }

    /// Output of the spool backend
    pub fn pages_dir(&self) -> PathBuf {
        self.work_dir.join("pages")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.work_dir.join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
