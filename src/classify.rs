use crate::{config::ClassifierConfig, level::OccupancyLevel, source::Signal};

pub const UNCLASSIFIED: &str = "判定できませんでした";

/// How many characters before `混雑しています` are searched for `やや`.
const LOOKBACK: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub level: Option<OccupancyLevel>,
    pub status: &'static str,
}

impl Classification {
    pub const fn tier(level: OccupancyLevel) -> Self {
        Self { level: Some(level), status: level.status_text() }
    }

    pub const fn unclassified() -> Self {
        Self { level: None, status: UNCLASSIFIED }
    }

    pub const fn is_maintenance(&self) -> bool {
        matches!(self.level, Some(OccupancyLevel::Maintenance))
    }

    pub const fn is_valid(&self) -> bool {
        match self.level {
            Some(level) => level.is_tier(),
            None => false,
        }
    }
}

/// Longest prefix of `text` holding at most `n` characters.
pub fn char_prefix(text: &str, n: usize) -> &str {
    text.char_indices().nth(n).map_or(text, |(i, _)| &text[..i])
}

fn char_suffix(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    text.char_indices().nth(count - n).map_or(text, |(i, _)| &text[i..])
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

pub fn is_maintenance(window: &str, markers: &[String]) -> bool {
    let lower = window.to_lowercase();
    markers
        .iter()
        .any(|marker| window.contains(marker.as_str()) || lower.contains(&marker.to_lowercase()))
}

/// Uppercase English legend the page prints beside the gauge. Checked over
/// the whole text since OCR usually puts it near the bottom.
fn classify_english(text: &str) -> Option<OccupancyLevel> {
    if contains_any(text, &["HALF-FULL", "HALF FULL"]) {
        Some(OccupancyLevel::Lv3)
    } else if contains_any(text, &["ALMOST EMPTY", "ALMOST-EMPTY"]) {
        Some(OccupancyLevel::Lv2)
    } else if text.contains("EMPTY") && !text.contains("ALMOST") {
        Some(OccupancyLevel::Lv1)
    } else if text.contains("VERY CROWDED") || (text.contains("FULL") && !text.contains("HALF")) {
        Some(OccupancyLevel::Lv4)
    } else {
        None
    }
}

fn classify_japanese(window: &str) -> Option<OccupancyLevel> {
    const CROWDED: &str = "混雑しています";

    if contains_any(window, &["非常に混雑", "非常に混", "最も混雑"]) {
        return Some(OccupancyLevel::Lv4);
    }
    // `やや混雑しています` also contains `混雑しています`
    if let Some(at) = window.find(CROWDED)
        && !char_suffix(&window[..at], LOOKBACK).contains("やや")
    {
        return Some(OccupancyLevel::Lv3);
    }
    if window.contains("やや混雑") {
        Some(OccupancyLevel::Lv2)
    } else if contains_any(window, &["空いてます", "空いています"]) {
        Some(OccupancyLevel::Lv1)
    } else {
        None
    }
}

/// Classifies OCR or page text. Only the first `window_size` characters are
/// searched for maintenance and Japanese wording, which keeps the legend at
/// the bottom of the page out, and can also cut off a real signal on very
/// verbose pages.
pub fn classify_text(text: &str, cfg: &ClassifierConfig) -> Classification {
    let window = char_prefix(text, cfg.window_size);

    if is_maintenance(window, &cfg.maintenance_markers) {
        return Classification::tier(OccupancyLevel::Maintenance);
    }

    classify_english(text)
        .or_else(|| classify_japanese(window))
        .map_or_else(Classification::unclassified, Classification::tier)
}

/// First configured marker contained in `src` wins.
pub fn classify_image_src(src: &str, cfg: &ClassifierConfig) -> Classification {
    cfg.valid_level_markers
        .iter()
        .find(|(_, marker)| src.contains(marker.as_str()))
        .map_or_else(Classification::unclassified, |&(level, _)| Classification::tier(level))
}

pub fn classify_signal(signal: &Signal, cfg: &ClassifierConfig) -> Classification {
    match signal {
        Signal::Text(text) => classify_text(text, cfg),
        Signal::ImageSrc(src) => classify_image_src(src, cfg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    fn level(text: &str) -> Option<OccupancyLevel> {
        classify_text(text, &cfg()).level
    }

    #[test]
    fn english_markers() {
        let c = classify_text("HALF-FULL detected", &cfg());
        assert_eq!(c.level, Some(OccupancyLevel::Lv3));
        assert_eq!(c.status, "混雑しています");

        assert_eq!(level("ALMOST EMPTY"), Some(OccupancyLevel::Lv2));
        assert_eq!(level("status: EMPTY"), Some(OccupancyLevel::Lv1));
        assert_eq!(level("VERY CROWDED"), Some(OccupancyLevel::Lv4));
        assert_eq!(level("FULL"), Some(OccupancyLevel::Lv4));
        assert_eq!(level("HALF FULL"), Some(OccupancyLevel::Lv3));
    }

    #[test]
    fn english_beats_japanese() {
        assert_eq!(level("空いてます ... VERY CROWDED"), Some(OccupancyLevel::Lv4));
        assert_eq!(level("非常に混雑しています EMPTY"), Some(OccupancyLevel::Lv1));
    }

    #[test]
    fn almost_empty_is_not_empty() {
        assert_eq!(level("ALMOST-EMPTY"), Some(OccupancyLevel::Lv2));
        // `ALMOST` anywhere suppresses the bare `EMPTY` rule
        assert_eq!(level("EMPTY ALMOST"), None);
    }

    #[test]
    fn japanese_rules() {
        let c = classify_text("空いてます", &cfg());
        assert_eq!(c.level, Some(OccupancyLevel::Lv1));
        assert_eq!(c.status, "空いてます");

        assert_eq!(level("現在の状況 非常に混雑しています"), Some(OccupancyLevel::Lv4));
        assert_eq!(level("現在の状況 混雑しています"), Some(OccupancyLevel::Lv3));
        assert_eq!(level("現在の状況 やや混雑しています"), Some(OccupancyLevel::Lv2));
        assert_eq!(level("空いています"), Some(OccupancyLevel::Lv1));
    }

    #[test]
    fn lookback_only_covers_ten_chars() {
        let text = "やや0123456789混雑しています";
        assert_eq!(level(text), Some(OccupancyLevel::Lv3));
        // guarded out of Lv3, yet not `やや混雑` either
        let text = "やや01234567混雑しています";
        assert_eq!(level(text), None);
    }

    #[test]
    fn japanese_outside_window_is_ignored() {
        let text = format!("{}空いてます", "あ".repeat(500));
        assert_eq!(level(&text), None);
        let text = format!("{}空いてます", "あ".repeat(495));
        assert_eq!(level(&text), Some(OccupancyLevel::Lv1));
    }

    #[test]
    fn maintenance_overrides_everything_in_window() {
        let c = classify_text("HALF-FULL 空いてます メンテナンス中", &cfg());
        assert!(c.is_maintenance());
        assert!(!c.is_valid());
        assert!(classify_text("Under Maintenance", &cfg()).is_maintenance());

        let text = format!("{}メンテナンス EMPTY", "x".repeat(600));
        assert_eq!(level(&text), Some(OccupancyLevel::Lv1));
    }

    #[test]
    fn no_markers() {
        let c = classify_text("hello world", &cfg());
        assert_eq!(c, Classification::unclassified());
        assert_eq!(c.status, UNCLASSIFIED);
    }

    #[test]
    fn image_src() {
        let c = classify_image_src("https://x/image/Lv2-image.png", &cfg());
        assert_eq!(c.level, Some(OccupancyLevel::Lv2));
        assert!(c.is_valid());

        assert_eq!(classify_image_src("/img/none.png", &cfg()).level, None);
        // list order decides when several match
        let c = classify_image_src("Lv4-image.png?Lv1-image.png", &cfg());
        assert_eq!(c.level, Some(OccupancyLevel::Lv1));
    }

    #[test]
    fn prefix_counts_chars() {
        assert_eq!(char_prefix("日本語テキスト", 3), "日本語");
        assert_eq!(char_prefix("ab", 5), "ab");
        assert_eq!(char_suffix("日本語テキスト", 4), "テキスト");
    }
}
