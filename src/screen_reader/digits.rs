//! Turning digit glyph matches into numbers

/// Hits closer than this (in pixels) to the previously kept hit are duplicates
pub const DEDUPE_GAP: i32 = 5;

/// Below this score the tens slot is considered empty rather than unreadable
pub const BLANK_SLOT_CEILING: f64 = 0.5;

/// Best glyph for one slot, whether or not it cleared the threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotReading {
    pub digit: u8,
    pub score: f64,
}

/// One location where a glyph scored above threshold during a region scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigitHit {
    pub digit: u8,
    pub x: i32,
    pub score: f64,
}

/// What the two-slot reading concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    Value(u32),
    /// Slots are inconclusive, scan the whole region instead
    Scan,
    /// Units read but the tens slot is neither blank nor readable
    Ambiguous,
}

/// Combine the tens and units slot readings.
///
/// A units digit below `threshold` sends the caller to a region scan. A tens
/// slot below `threshold` is read as "no tens digit" only when its best score
/// is under [`BLANK_SLOT_CEILING`]; anything in between is ambiguous, since a
/// half-recognised tens digit would turn 14 into 4.
pub fn combine_slots(tens: Option<SlotReading>, units: Option<SlotReading>, threshold: f64) -> SlotOutcome {
    let units = match units {
        Some(u) if u.score >= threshold => u,
        _ => return SlotOutcome::Scan,
    };
    match tens {
        Some(t) if t.score >= threshold => SlotOutcome::Value(u32::from(t.digit) * 10 + u32::from(units.digit)),
        Some(t) if t.score >= BLANK_SLOT_CEILING => SlotOutcome::Ambiguous,
        _ => SlotOutcome::Value(u32::from(units.digit)),
    }
}

/// Pick the highest scoring digit from per-glyph best scores
pub fn best_reading(scores: impl IntoIterator<Item = (u8, f64)>) -> Option<SlotReading> {
    scores
        .into_iter()
        .filter(|(_, score)| score.is_finite())
        .fold(None, |best: Option<SlotReading>, (digit, score)| match best {
            Some(b) if b.score >= score => Some(b),
            _ => Some(SlotReading { digit, score }),
        })
}

/// Left-to-right hits with overlapping detections removed.
///
/// At equal x the better score wins; after that a hit is kept only when it
/// lies more than [`DEDUPE_GAP`] pixels right of the last kept hit.
pub fn dedupe_hits(mut hits: Vec<DigitHit>) -> Vec<DigitHit> {
    hits.sort_by(|a, b| a.x.cmp(&b.x).then(b.score.total_cmp(&a.score)));
    let mut kept: Vec<DigitHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        match kept.last() {
            Some(last) if hit.x <= last.x + DEDUPE_GAP => {}
            _ => kept.push(hit),
        }
    }
    kept
}

/// Concatenate hit digits left to right; `None` for no hits or overflow
pub fn hits_to_number(hits: &[DigitHit]) -> Option<u32> {
    if hits.is_empty() {
        return None;
    }
    hits.iter().try_fold(0u32, |acc, hit| {
        acc.checked_mul(10)?.checked_add(u32::from(hit.digit))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(digit: u8, score: f64) -> Option<SlotReading> {
        Some(SlotReading { digit, score })
    }

    fn hit(digit: u8, x: i32, score: f64) -> DigitHit {
        DigitHit { digit, x, score }
    }

    #[test]
    fn test_two_slots() {
        assert_eq!(combine_slots(slot(1, 0.9), slot(4, 0.85), 0.7), SlotOutcome::Value(14));
    }

    #[test]
    fn test_blank_tens_slot() {
        assert_eq!(combine_slots(slot(3, 0.1), slot(7, 0.95), 0.7), SlotOutcome::Value(7));
        assert_eq!(combine_slots(None, slot(7, 0.95), 0.7), SlotOutcome::Value(7));
    }

    #[test]
    fn test_partial_tens_is_ambiguous() {
        assert_eq!(combine_slots(slot(1, 0.6), slot(4, 0.9), 0.7), SlotOutcome::Ambiguous);
    }

    #[test]
    fn test_units_failure_scans() {
        assert_eq!(combine_slots(slot(1, 0.9), slot(4, 0.4), 0.7), SlotOutcome::Scan);
        assert_eq!(combine_slots(slot(1, 0.9), None, 0.7), SlotOutcome::Scan);
    }

    #[test]
    fn test_best_reading_skips_nan() {
        let best = best_reading([(0, 0.2), (5, f64::NAN), (8, 0.75), (3, 0.75)]).unwrap();
        assert_eq!(best, SlotReading { digit: 8, score: 0.75 });
        assert_eq!(best_reading(Vec::new()), None);
    }

    #[test]
    fn test_dedupe_keeps_first_of_cluster() {
        let hits = vec![
            hit(2, 14, 0.8),
            hit(1, 3, 0.9),
            hit(7, 4, 0.75),
            hit(1, 2, 0.72),
            hit(2, 15, 0.95),
        ];
        let kept = dedupe_hits(hits);
        assert_eq!(kept, vec![hit(1, 2, 0.72), hit(2, 14, 0.8)]);
        assert_eq!(hits_to_number(&kept), Some(12));
    }

    #[test]
    fn test_same_x_prefers_higher_score() {
        let kept = dedupe_hits(vec![hit(8, 10, 0.71), hit(3, 10, 0.93)]);
        assert_eq!(kept, vec![hit(3, 10, 0.93)]);
    }

    #[test]
    fn test_hits_to_number_edges() {
        assert_eq!(hits_to_number(&[]), None);
        assert_eq!(hits_to_number(&[hit(0, 0, 0.9), hit(7, 12, 0.9)]), Some(7));
        let long: Vec<_> = (0..12).map(|i| hit(9, i * 10, 0.9)).collect();
        assert_eq!(hits_to_number(&long), None);
    }
}
