//! Text similarity for run scoring.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use super::SimilarityMetric;

/// NFKC, lowercase, and collapse whitespace runs to a single space.
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().flat_map(char::to_lowercase).collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two raw strings in [0, 1]. Empty input scores 0.
pub fn similarity(a: &str, b: &str, metric: SimilarityMetric) -> f32 {
    Scorer::new(metric).score(&normalize(a), &normalize(b))
}

/// Scores pre-normalized text under one metric.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    metric: SimilarityMetric,
}

impl Scorer {
    /// Scorer for a metric.
    pub fn new(metric: SimilarityMetric) -> Self {
        Self { metric }
    }

    /// Score two normalized strings.
    pub fn score(&self, a: &str, b: &str) -> f32 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        match self.metric {
            SimilarityMetric::Indel => rapidfuzz::fuzz::ratio(a.chars(), b.chars()) as f32,
            SimilarityMetric::TokenOverlap => dice(a, b),
        }
    }

    /// Length in the unit the metric compares: characters or tokens.
    pub fn units(&self, normalized: &str) -> usize {
        match self.metric {
            SimilarityMetric::Indel => normalized.chars().count(),
            SimilarityMetric::TokenOverlap => normalized.split(' ').filter(|t| !t.is_empty()).count(),
        }
    }

    /// Units contributed by the space joining two pieces of a run.
    pub fn separator_units(&self) -> usize {
        match self.metric {
            SimilarityMetric::Indel => 1,
            SimilarityMetric::TokenOverlap => 0,
        }
    }

    /// Longest candidate (in units) that can still reach `threshold` against
    /// a target of `target_units`.
    ///
    /// Both metrics are `2·common / (|a| + |b|)`, so a candidate longer than
    /// `|a|·(2 − t)/t` scores below `t` even when it contains the target.
    pub fn max_candidate_units(&self, target_units: usize, threshold: f32) -> usize {
        let bound = target_units as f32 * (2.0 - threshold) / threshold;
        // Absorb f32 rounding so an exact bound is not lost
        (bound + 1e-3).floor() as usize
    }
}

/// Sørensen–Dice coefficient over token multisets.
fn dice(a: &str, b: &str) -> f32 {
    let mut counts: HashMap<&str, i32> = HashMap::new();
    let mut total_a = 0;
    for token in a.split(' ') {
        *counts.entry(token).or_insert(0) += 1;
        total_a += 1;
    }

    let mut common = 0;
    let mut total_b = 0;
    for token in b.split(' ') {
        total_b += 1;
        if let Some(count) = counts.get_mut(token) {
            if *count > 0 {
                *count -= 1;
                common += 1;
            }
        }
    }

    2.0 * common as f32 / (total_a + total_b) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Hello\n\tWORLD  "), "hello world");
        // NFKC folds the "fi" ligature and full-width letters
        assert_eq!(normalize("\u{FB01}ne ＡＢＣ"), "fine abc");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_identical_text_scores_one() {
        for metric in [SimilarityMetric::Indel, SimilarityMetric::TokenOverlap] {
            assert_eq!(similarity("Deep Learning", "deep  learning", metric), 1.0);
        }
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(similarity("", "text", SimilarityMetric::Indel), 0.0);
        assert_eq!(similarity("text", " ", SimilarityMetric::TokenOverlap), 0.0);
    }

    #[test]
    fn test_paraphrase_scores_between() {
        let score = similarity(
            "The model achieves state of the art results",
            "The model achieves state-of-the-art results",
            SimilarityMetric::Indel,
        );
        assert!(score > 0.9 && score < 1.0, "score = {}", score);

        let unrelated = similarity(
            "Transformers use attention",
            "Convolution kernels slide over pixels",
            SimilarityMetric::Indel,
        );
        assert!(unrelated < 0.6, "score = {}", unrelated);
    }

    #[test]
    fn test_dice_multiset() {
        assert_eq!(dice("a a b", "a b"), 0.8);
        assert_eq!(dice("x y", "z w"), 0.0);
    }

    #[test]
    fn test_length_bound_is_tight() {
        let scorer = Scorer::new(SimilarityMetric::Indel);
        assert_eq!(scorer.max_candidate_units(80, 0.8), 120);
        assert_eq!(scorer.units("héllo wörld"), 11);
        let tokens = Scorer::new(SimilarityMetric::TokenOverlap);
        assert_eq!(tokens.units("three small words"), 3);
    }
}
