//! Distance and similarity functions for the different field kinds
//!
//! Every public scoring function returns a value in [0.0, 1.0].

use crate::stem::stem;
use ahash::AHashMap;

/// Normalize free text for comparison
///
/// Lower-cases, splits on whitespace, stems every token and rejoins with
/// single spaces, so case, plural/suffix variation and incidental
/// whitespace do not affect similarity.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .map(stem)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clamp a raw score into [0.0, 1.0]; NaN scores as 0.0
#[inline]
pub fn clamp_unit(value: f64) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.abs().clamp(0.0, 1.0) as f32
    }
}

/// Sørensen-Dice coefficient over character bigrams
///
/// Whitespace is ignored. Two identical strings (including two empty ones)
/// score 1.0; a string shorter than two characters scores 0.0 against
/// anything it is not identical to.
pub fn dice_coefficient(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: AHashMap<(char, char), usize> = AHashMap::with_capacity(a.len());
    for w in a.windows(2) {
        *bigrams.entry((w[0], w[1])).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    for w in b.windows(2) {
        if let Some(count) = bigrams.get_mut(&(w[0], w[1])) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    clamp_unit((2 * intersection) as f64 / (a.len() + b.len() - 2) as f64)
}

/// Similarity of two already normalized texts
///
/// An empty side scores 0.0 unless both sides are empty.
pub fn text_similarity(normalized_query: &str, normalized_candidate: &str) -> f32 {
    match (normalized_query.is_empty(), normalized_candidate.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => dice_coefficient(normalized_query, normalized_candidate),
    }
}

/// Relative numeric similarity: 1 - |a - b| / max(|a|, |b|)
pub fn number_similarity(a: f64, b: f64) -> f32 {
    let max = a.abs().max(b.abs());
    if max == 0.0 {
        1.0 // Both are zero, perfect match
    } else {
        clamp_unit((1.0 - (a - b).abs() / max).max(0.0))
    }
}

/// Time distance between two instants (ms since epoch), scaled and clamped
///
/// With `scale_ms == 1.0` any two instants more than a millisecond apart
/// are at distance 1.0.
pub fn date_distance(reference_ms: f64, candidate_ms: f64, scale_ms: f64) -> f32 {
    clamp_unit((reference_ms - candidate_ms) / scale_ms)
}
