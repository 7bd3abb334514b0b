//! Parsing the catch banner text into a [`CatchRecord`]
//!
//! OCR output is noisy: spaces appear between characters, parentheses wrap
//! the weight, decorative stars surround the name and the "new record" badge
//! is read as part of the line. The parser strips all of that and works on
//! the remaining compact string.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::catch::{CatchRecord, Quality};

const CATCH_PREFIX: &str = "你钓到了";
const WEIGHT_UNIT: &str = "千克";
const NEW_RECORD_MARKERS: [&str; 4] = ["新纪录", "新记录", "首次捕获", "首次"];
/// Checked in order; the first label present wins
const QUALITY_LABELS: [&str; 9] = ["标准", "非凡", "稀有", "史诗", "传说", "传奇", "標準", "傳說", "傳奇"];

static WEIGHT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)千克").expect("weight pattern is valid"));

#[derive(Debug, Error, PartialEq)]
pub enum CatchParseError {
    #[error("text has neither the catch prefix nor a weight")]
    NotACatch,
    #[error("no fish name left in '{0}'")]
    NoName(String),
}

/// Parse recognized text, `None` when it is not a usable catch banner
pub fn parse_catch(raw: &str) -> Option<CatchRecord> {
    parse(raw).ok()
}

/// Parse recognized text, reporting why it was rejected
pub fn parse(raw: &str) -> Result<CatchRecord, CatchParseError> {
    let mut text: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '（' | '）'))
        .collect();

    if !text.contains(CATCH_PREFIX) && !text.contains(WEIGHT_UNIT) {
        return Err(CatchParseError::NotACatch);
    }

    let mut is_new_record = false;
    for marker in NEW_RECORD_MARKERS {
        if text.contains(marker) {
            is_new_record = true;
            text = text.replace(marker, "");
        }
    }

    let mut rest = match text.split_once(CATCH_PREFIX) {
        Some((_, after)) => after.to_string(),
        None => text,
    };

    let mut weight = 0.0;
    if let Some(caps) = WEIGHT_RE.captures(&rest) {
        let whole = caps[0].to_string();
        weight = caps[1].parse().unwrap_or(0.0);
        rest = rest.replace(&whole, "");
    }

    let mut quality = Quality::default();
    if let Some(label) = QUALITY_LABELS.iter().find(|label| rest.contains(**label)) {
        quality = Quality::from_label(label).unwrap_or_default();
        rest = rest.replace(*label, "");
    }

    let name = rest
        .replace(['★', '☆'], "")
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .to_string();

    if name.is_empty() {
        return Err(CatchParseError::NoName(raw.to_string()));
    }

    Ok(CatchRecord {
        name,
        weight,
        quality,
        is_new_record,
    })
}
