use core::time::Duration;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{level::OccupancyLevel, retry::RetryPolicy};

pub mod constants {
    use core::time::Duration;

    macro_rules! env_or_default {
        ($name:expr, $default:expr) => {
            if let Some(s) = option_env!($name) {
                s
            } else {
                $default
            }
        };
    }

    pub const URL: &str = env_or_default!(
        "GYM_MONITOR_URL",
        "https://svc01.p-counter.jp/v4shr3svr/shinko-sports/hakata-gym-train.html"
    );
    pub const CSV_PATH: &str = env_or_default!("GYM_MONITOR_CSV", "results/monitor_log.csv");
    pub const JSON_PATH: &str = env_or_default!("GYM_MONITOR_JSON", "results/latest.json");

    pub const LEVEL_MARKERS: [&str; 4] =
        ["Lv1-image.png", "Lv2-image.png", "Lv3-image.png", "Lv4-image.png"];
    pub const MAINTENANCE_MARKERS: [&str; 2] = ["メンテナンス", "maintenance"];
    pub const WINDOW_SIZE: usize = 500;

    pub const MAX_ATTEMPTS: u32 = 3;
    pub const RETRY_DELAY: Duration = Duration::from_secs(5);
    pub const MAINTENANCE_ATTEMPTS: u32 = 3;
    pub const MAINTENANCE_DELAY: Duration = Duration::from_secs(30);

    pub const SETTLE: Duration = Duration::from_secs(10);
    pub const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
    pub const PREVIEW_CHARS: usize = 200;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Image path fragment for each tier, searched in this order.
    pub valid_level_markers: Vec<(OccupancyLevel, String)>,
    pub maintenance_markers: Vec<String>,
    pub window_size: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            valid_level_markers: OccupancyLevel::TIERS
                .into_iter()
                .zip(constants::LEVEL_MARKERS)
                .map(|(level, marker)| (level, marker.to_owned()))
                .collect(),
            maintenance_markers: constants::MAINTENANCE_MARKERS.map(ToOwned::to_owned).to_vec(),
            window_size: constants::WINDOW_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Screenshot the rendered page and OCR it.
    #[default]
    Ocr,
    /// Read `img#logo` through a live browser.
    Dom,
    /// Plain HTTP fetch, no browser.
    Html,
}

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub url: String,
    pub classifier: ClassifierConfig,
    pub source: SourceKind,
    pub retry: RetryPolicy,
    /// Outer loop, only re-entered while the page reports maintenance.
    pub maintenance_retry: RetryPolicy,
    pub settle: Duration,
    pub load_timeout: Duration,
    pub headless: bool,
    pub csv_path: PathBuf,
    pub json_path: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: constants::URL.to_owned(),
            classifier: ClassifierConfig::default(),
            source: SourceKind::default(),
            retry: RetryPolicy::new(constants::MAX_ATTEMPTS, constants::RETRY_DELAY),
            maintenance_retry: RetryPolicy::new(
                constants::MAINTENANCE_ATTEMPTS,
                constants::MAINTENANCE_DELAY,
            ),
            settle: constants::SETTLE,
            load_timeout: constants::LOAD_TIMEOUT,
            headless: true,
            csv_path: PathBuf::from(constants::CSV_PATH),
            json_path: PathBuf::from(constants::JSON_PATH),
        }
    }
}
