use core::time::Duration;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client as Request;
use scraper::{Html, Selector};

use super::{PageSignalSource, Signal, SignalError};

static SEL_LOGO: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img#logo").unwrap());
static SEL_BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Fetches the page over plain HTTP. Works when the level image is in the
/// served markup; script-rendered pages only yield their static text.
pub struct StaticHtmlSource {
    client: Request,
}

impl StaticHtmlSource {
    pub fn new(timeout: Duration) -> Result<Self, SignalError> {
        Ok(Self { client: crate::scrape::basic(timeout)? })
    }
}

/// `img#logo[src]` when present, otherwise the visible body text.
pub fn extract_signal(html: &str) -> Signal {
    let document = Html::parse_document(html);

    if let Some(src) = document
        .select(&SEL_LOGO)
        .next()
        .and_then(|img| img.attr("src"))
    {
        return Signal::ImageSrc(src.to_owned());
    }

    let text = document
        .select(&SEL_BODY)
        .next()
        .map(|body| body.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    Signal::Text(WS.replace_all(text.trim(), " ").into_owned())
}

impl PageSignalSource for StaticHtmlSource {
    async fn fetch_signal(&self, url: &str) -> Result<Signal, SignalError> {
        tracing::info!(target: "source", "fetching \x1b[36m{url}\x1b[0m ...");

        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(SignalError::Status(status));
        }
        let body = res.text().await?;
        tracing::debug!(target: "source", "fetching finished: {} bytes", body.len());

        Ok(extract_signal(&body))
    }
}
