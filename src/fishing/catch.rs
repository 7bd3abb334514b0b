//! Base types for catch data

use serde::{Deserialize, Serialize};

/// Catch quality tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Standard,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Quality {
    /// In-game label
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Standard => "标准",
            Quality::Uncommon => "非凡",
            Quality::Rare => "稀有",
            Quality::Epic => "史诗",
            Quality::Legendary => "传说",
        }
    }

    /// Map an in-game label, including traditional script and synonyms
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "标准" | "標準" => Some(Quality::Standard),
            "非凡" => Some(Quality::Uncommon),
            "稀有" => Some(Quality::Rare),
            "史诗" => Some(Quality::Epic),
            "传说" | "传奇" | "傳說" | "傳奇" => Some(Quality::Legendary),
            _ => None,
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One transcribed catch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchRecord {
    pub name: String,
    /// Kilograms, 0.0 when the weight was unreadable
    pub weight: f64,
    pub quality: Quality,
    pub is_new_record: bool,
}

impl std::fmt::Display for CatchRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {}kg)", self.name, self.quality, self.weight)?;
        if self.is_new_record {
            write!(f, " new record")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_labels_round_trip() {
        for q in [
            Quality::Standard,
            Quality::Uncommon,
            Quality::Rare,
            Quality::Epic,
            Quality::Legendary,
        ] {
            assert_eq!(Quality::from_label(q.label()), Some(q));
        }
        assert_eq!(Quality::from_label("傳奇"), Some(Quality::Legendary));
        assert_eq!(Quality::from_label("普通"), None);
    }

    #[test]
    fn test_record_display() {
        let record = CatchRecord {
            name: "金鱼".into(),
            weight: 1.25,
            quality: Quality::Rare,
            is_new_record: true,
        };
        assert_eq!(format!("{}", record), "金鱼 (稀有, 1.25kg) new record");
    }

    #[test]
    fn test_quality_serde() {
        assert_eq!(serde_json::to_string(&Quality::Legendary).unwrap(), "\"legendary\"");
    }
}
