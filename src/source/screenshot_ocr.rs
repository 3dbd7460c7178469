use core::time::Duration;
use std::process::Stdio;

use tokio::{io::AsyncWriteExt, process::Command, task::spawn_blocking};

use super::{PageSignalSource, Signal, SignalError};
use crate::scrape::{BrowserSession, random_user_agent};

/// `tesseract` CLI, fed a PNG on stdin.
#[derive(Clone, Debug)]
pub struct Tesseract {
    pub program: String,
    pub lang: String,
}

impl Default for Tesseract {
    fn default() -> Self {
        Self { program: "tesseract".to_owned(), lang: "jpn".to_owned() }
    }
}

impl Tesseract {
    pub async fn recognize(&self, png: &[u8]) -> Result<String, SignalError> {
        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", self.lang.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SignalError::OcrUnavailable(format!("{}: {e}", self.program)),
                _ => SignalError::Io(e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(SignalError::Ocr(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Screenshots the rendered page and OCRs it. The most robust strategy
/// against markup changes, and the slowest.
pub struct ScreenshotOcrSource {
    headless: bool,
    settle: Duration,
    load_timeout: Duration,
    ocr: Tesseract,
}

impl ScreenshotOcrSource {
    pub fn new(headless: bool, settle: Duration, load_timeout: Duration) -> Self {
        Self { headless, settle, load_timeout, ocr: Tesseract::default() }
    }

    fn capture(headless: bool, settle: Duration, load_timeout: Duration, url: &str) -> Result<Vec<u8>, SignalError> {
        let session = BrowserSession::open(headless, random_user_agent(), load_timeout)?;
        session.goto(url)?;
        session.wait_for("body")?;

        // scripts fill the gauge in after load
        std::thread::sleep(settle);

        session.screenshot_png()
    }
}

impl PageSignalSource for ScreenshotOcrSource {
    async fn fetch_signal(&self, url: &str) -> Result<Signal, SignalError> {
        let (headless, settle, load_timeout, url) = (self.headless, self.settle, self.load_timeout, url.to_owned());

        // bounded by the browser's own timeouts; dropping the session kills Chrome
        let png = spawn_blocking(move || Self::capture(headless, settle, load_timeout, &url)).await??;
        tracing::debug!(target: "source", "screenshot: {} bytes", png.len());

        let text = self.ocr.recognize(&png).await?;
        tracing::info!(target: "source", "extracted text: {:?}", crate::classify::char_prefix(&text, 200));

        Ok(Signal::Text(text))
    }
}
