use core::time::Duration;

use crate::config::{MonitorConfig, SourceKind};

mod dom_image;
mod screenshot_ocr;
mod static_html;

pub use dom_image::DomImageSource;
pub use screenshot_ocr::ScreenshotOcrSource;
pub use static_html::StaticHtmlSource;

/// Raw representation of the page state, before classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// OCR output or visible page text.
    Text(String),
    /// Observed `src` of the level image.
    ImageSrc(String),
}

impl Signal {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::ImageSrc(s) => s,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("browser: {0}")]
    Browser(String),
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("ocr: {0}")]
    Ocr(String),
    #[error("ocr engine unavailable: {0}")]
    OcrUnavailable(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SignalError {
    /// Errors that will not go away by trying again.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::OcrUnavailable(_) | Self::Join(_))
    }
}

pub trait PageSignalSource {
    fn fetch_signal(&self, url: &str) -> impl Future<Output = Result<Signal, SignalError>>;
}

/// Strategy picked at startup from [`SourceKind`].
pub enum SignalSource {
    Ocr(ScreenshotOcrSource),
    Dom(DomImageSource),
    Html(StaticHtmlSource),
}

impl SignalSource {
    pub fn from_config(cfg: &MonitorConfig) -> Result<Self, SignalError> {
        Ok(match cfg.source {
            SourceKind::Ocr => Self::Ocr(ScreenshotOcrSource::new(cfg.headless, cfg.settle, cfg.load_timeout)),
            SourceKind::Dom => Self::Dom(DomImageSource::new(cfg.headless, cfg.load_timeout)),
            SourceKind::Html => Self::Html(StaticHtmlSource::new(cfg.load_timeout)?),
        })
    }
}

impl PageSignalSource for SignalSource {
    async fn fetch_signal(&self, url: &str) -> Result<Signal, SignalError> {
        match self {
            Self::Ocr(s) => s.fetch_signal(url).await,
            Self::Dom(s) => s.fetch_signal(url).await,
            Self::Html(s) => s.fetch_signal(url).await,
        }
    }
}
