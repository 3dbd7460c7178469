use chrono::{DateTime, FixedOffset};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::{
    classify::{Classification, char_prefix},
    config::constants::PREVIEW_CHARS,
    level::OccupancyLevel,
    source::Signal,
    util::format_log_time,
};

/// Outcome of one monitoring run. Written once to each sink, then dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub timestamp: DateTime<FixedOffset>,
    pub is_valid: bool,
    pub matched_level: OccupancyLevel,
    pub status_text: CompactString,
    pub text_preview: String,
    pub current_src: Option<String>,
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn classified(signal: &Signal, c: Classification, timestamp: DateTime<FixedOffset>) -> Self {
        let (text_preview, current_src) = match signal {
            Signal::Text(text) => (char_prefix(text, PREVIEW_CHARS).to_owned(), None),
            Signal::ImageSrc(src) => (String::new(), Some(src.clone())),
        };
        Self {
            timestamp,
            is_valid: c.is_valid(),
            matched_level: c.level.unwrap_or(OccupancyLevel::Unknown),
            status_text: CompactString::const_new(c.status),
            text_preview,
            current_src,
            error: None,
        }
    }

    pub fn unclassified(signal: &Signal, timestamp: DateTime<FixedOffset>) -> Self {
        Self::classified(signal, Classification::unclassified(), timestamp)
    }

    pub fn all_retries_failed(error: Option<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp,
            is_valid: false,
            matched_level: OccupancyLevel::AllRetriesFailed,
            status_text: CompactString::const_new(OccupancyLevel::AllRetriesFailed.status_text()),
            text_preview: String::new(),
            current_src: None,
            error,
        }
    }

    pub fn failed(error: String, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp,
            is_valid: false,
            matched_level: OccupancyLevel::Error,
            status_text: CompactString::new(&error),
            text_preview: String::new(),
            current_src: None,
            error: Some(error),
        }
    }

    pub fn is_maintenance(&self) -> bool {
        self.matched_level == OccupancyLevel::Maintenance
    }

    pub fn summary(&self) -> String {
        format!(
            "[{}] {} {} ({})",
            format_log_time(&self.timestamp),
            if self.is_valid { "OK" } else { "NG" },
            self.matched_level,
            self.status_text,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classify::UNCLASSIFIED, util::jst_now};

    #[test]
    fn image_signal_fills_src() {
        let signal = Signal::ImageSrc("/image/Lv2-image.png".to_owned());
        let r = ExtractionResult::classified(&signal, Classification::tier(OccupancyLevel::Lv2), jst_now());
        assert!(r.is_valid);
        assert_eq!(r.matched_level, OccupancyLevel::Lv2);
        assert_eq!(r.current_src.as_deref(), Some("/image/Lv2-image.png"));
        assert!(r.text_preview.is_empty());
    }

    #[test]
    fn text_preview_is_truncated() {
        let signal = Signal::Text("あ".repeat(300));
        let r = ExtractionResult::unclassified(&signal, jst_now());
        assert!(!r.is_valid);
        assert_eq!(r.status_text, UNCLASSIFIED);
        assert_eq!(r.matched_level, OccupancyLevel::Unknown);
        assert_eq!(r.text_preview.chars().count(), 200);
    }

    #[test]
    fn exhausted_sentinel() {
        let r = ExtractionResult::all_retries_failed(Some("timeout".to_owned()), jst_now());
        assert_eq!(r.matched_level, OccupancyLevel::AllRetriesFailed);
        assert_eq!(r.status_text, "全てのリトライが失敗しました");
        assert!(r.summary().contains("NG AllRetriesFailed"));
    }
}
