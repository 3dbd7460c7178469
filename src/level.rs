use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupancyLevel {
    Lv1,
    Lv2,
    Lv3,
    Lv4,
    Unknown,
    Error,
    Maintenance,
    AllRetriesFailed,
}

impl OccupancyLevel {
    pub const TIERS: [Self; 4] = [Self::Lv1, Self::Lv2, Self::Lv3, Self::Lv4];

    /// The wording the monitored page itself uses for a tier.
    pub const fn status_text(self) -> &'static str {
        match self {
            Self::Lv1 => "空いてます",
            Self::Lv2 => "やや混雑しています",
            Self::Lv3 => "混雑しています",
            Self::Lv4 => "非常に混雑しています",
            Self::Maintenance => "メンテナンス中",
            Self::AllRetriesFailed => "全てのリトライが失敗しました",
            Self::Unknown | Self::Error => "判定できませんでした",
        }
    }

    pub const fn is_tier(self) -> bool {
        matches!(self, Self::Lv1 | Self::Lv2 | Self::Lv3 | Self::Lv4)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lv1 => "Lv1",
            Self::Lv2 => "Lv2",
            Self::Lv3 => "Lv3",
            Self::Lv4 => "Lv4",
            Self::Unknown => "Unknown",
            Self::Error => "Error",
            Self::Maintenance => "Maintenance",
            Self::AllRetriesFailed => "AllRetriesFailed",
        }
    }
}

impl fmt::Display for OccupancyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::OccupancyLevel;

    #[test]
    fn only_four_tiers_are_valid() {
        assert!(OccupancyLevel::TIERS.iter().all(|l| l.is_tier()));
        assert!(!OccupancyLevel::Maintenance.is_tier());
        assert!(!OccupancyLevel::Unknown.is_tier());
        assert!(!OccupancyLevel::AllRetriesFailed.is_tier());
    }

    #[test]
    fn serializes_as_name() {
        let json = serde_json::to_string(&OccupancyLevel::Lv3).unwrap();
        assert_eq!(json, "\"Lv3\"");
        assert_eq!(OccupancyLevel::Lv3.to_string(), "Lv3");
    }
}
