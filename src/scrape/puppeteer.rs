use core::time::Duration;
use std::{ffi::OsStr, sync::Arc};

use headless_chrome::{
    Browser, Element, LaunchOptions, Tab,
    browser::tab::NoElementFound,
    protocol::cdp::{Page::CaptureScreenshotFormatOption, Runtime},
    util::Timeout,
};
use serde_json::Value;

use crate::source::SignalError;

fn puppeteer(headless: bool, user_agent: &str, idle_timeout: Duration) -> anyhow::Result<Browser> {
    let user_agent = format!("--user-agent={user_agent}");
    Browser::new(LaunchOptions {
        args: vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&user_agent),
        ],
        headless,
        sandbox: false,
        window_size: Some((1920, 1080)),
        idle_browser_timeout: idle_timeout * 2,
        ..LaunchOptions::default()
    })
}

#[allow(clippy::significant_drop_tightening)]
fn first_tab(browser: &Browser) -> anyhow::Result<Arc<Tab>> {
    let tab = browser.new_tab()?;

    {
        let tabs_guard = browser
            .get_tabs()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        for remain in &*tabs_guard {
            if !Arc::ptr_eq(&tab, remain) {
                remain.close(true)?;
            }
        }
    }

    Ok(tab)
}

fn browser_error(err: anyhow::Error, load_timeout: Duration) -> SignalError {
    if err.is::<NoElementFound>() {
        SignalError::ElementNotFound(err.to_string())
    } else if err.is::<Timeout>() {
        SignalError::Timeout(load_timeout)
    } else {
        SignalError::Browser(format!("{err:#}"))
    }
}

/// One browser with one tab. Every call blocks, so callers run the whole
/// session inside `spawn_blocking`. Dropping it kills the browser process.
pub struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
    load_timeout: Duration,
}

impl BrowserSession {
    pub fn open(headless: bool, user_agent: &str, load_timeout: Duration) -> Result<Self, SignalError> {
        let fail = |e| browser_error(e, load_timeout);

        let browser = puppeteer(headless, user_agent, load_timeout).map_err(fail)?;
        let tab = first_tab(&browser).map_err(fail)?;
        tab.set_default_timeout(load_timeout);
        tab.set_user_agent(user_agent, Some("ja-JP,ja;q=0.9"), None)
            .map_err(fail)?;

        Ok(Self { _browser: browser, tab, load_timeout })
    }

    pub fn goto(&self, url: &str) -> Result<(), SignalError> {
        tracing::info!(target: "source", "navigating to \x1b[36m{url}\x1b[0m");
        self.tab
            .navigate_to(url)
            .and_then(Tab::wait_until_navigated)
            .map(|_| ())
            .map_err(|e| browser_error(e, self.load_timeout))
    }

    pub fn wait_for(&self, selector: &str) -> Result<Element<'_>, SignalError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, self.load_timeout)
            .map_err(|e| browser_error(e, self.load_timeout))
    }

    /// Live attribute value, read through the page rather than the DOM
    /// snapshot taken when the element was found.
    pub fn attribute(&self, element: &Element<'_>, name: &str) -> Result<Option<String>, SignalError> {
        let name = serde_json::to_string(name).map_err(|e| SignalError::Browser(e.to_string()))?;

        let ret = self
            .tab
            .call_method(Runtime::CallFunctionOn {
                object_id: Some(element.remote_object_id.clone()),
                function_declaration: format!("function(){{return this.getAttribute({name})}}"),
                arguments: Some(Vec::new()),
                return_by_value: Some(true),
                generate_preview: Some(false),
                silent: Some(false),
                await_promise: Some(false),
                user_gesture: None,
                execution_context_id: None,
                object_group: None,
                throw_on_side_effect: None,
                serialization_options: None,
                unique_context_id: None,
            })
            .map_err(|e| browser_error(e, self.load_timeout))?;

        match ret.result.value {
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Null) | None => Ok(None),
            Some(value) => Err(SignalError::Browser(format!("not a string: {value}"))),
        }
    }

    pub fn screenshot_png(&self) -> Result<Vec<u8>, SignalError> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| browser_error(e, self.load_timeout))
    }
}
