use core::time::Duration;

use rand::seq::IndexedRandom;
use reqwest::{
    Client as Request,
    header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue},
};

mod puppeteer;

pub use puppeteer::BrowserSession;

pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS.choose(&mut rand::rng()).copied().unwrap_or(USER_AGENTS[0])
}

/// Plain HTTP client that looks like a Japanese desktop browser.
pub fn basic(timeout: Duration) -> reqwest::Result<Request> {
    let headers = [(ACCEPT_LANGUAGE, HeaderValue::from_static("ja,en-US;q=0.7,en;q=0.3"))]
        .into_iter()
        .collect::<HeaderMap>();

    Request::builder()
        .connect_timeout(const { Duration::from_secs(8) })
        .timeout(timeout)
        .default_headers(headers)
        .user_agent(random_user_agent())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_a_known_agent() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }

    #[test]
    fn builds_client() {
        assert!(basic(Duration::from_secs(30)).is_ok());
    }
}
