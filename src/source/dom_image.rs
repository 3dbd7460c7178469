use core::time::Duration;

use tokio::task::spawn_blocking;

use super::{PageSignalSource, Signal, SignalError};
use crate::scrape::{BrowserSession, random_user_agent};

const SEL_LOGO: &str = "img#logo";

/// Reads the level image `src` from a live, script-rendered page.
pub struct DomImageSource {
    headless: bool,
    load_timeout: Duration,
}

impl DomImageSource {
    pub const fn new(headless: bool, load_timeout: Duration) -> Self {
        Self { headless, load_timeout }
    }

    fn read_src(headless: bool, load_timeout: Duration, url: &str) -> Result<Signal, SignalError> {
        let session = BrowserSession::open(headless, random_user_agent(), load_timeout)?;
        session.goto(url)?;

        let logo = session.wait_for(SEL_LOGO)?;
        let src = session
            .attribute(&logo, "src")?
            .ok_or_else(|| SignalError::ElementNotFound(format!("{SEL_LOGO} has no src")))?;

        tracing::info!(target: "source", "current src: \x1b[36m{src}\x1b[0m");
        Ok(Signal::ImageSrc(src))
    }
}

impl PageSignalSource for DomImageSource {
    async fn fetch_signal(&self, url: &str) -> Result<Signal, SignalError> {
        let (headless, load_timeout, url) = (self.headless, self.load_timeout, url.to_owned());

        spawn_blocking(move || Self::read_src(headless, load_timeout, &url)).await?
    }
}
