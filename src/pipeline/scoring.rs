//! Heuristic extraction confidence.
//!
//! Per-tuple and per-document scores on a 0-100 scale. Pure functions only;
//! inputs are the signals the pattern engine already found.

use crate::pipeline::patterns::ExtractedTuple;

const TUPLE_BASE: f64 = 50.0;
const PERCENTAGE_BONUS: f64 = 15.0;
const FOLD_BONUS: f64 = 10.0;
const SNP_ID_BONUS: f64 = 20.0;
const CONFIDENCE_KEYWORD_BONUS: f64 = 10.0;
const RICH_CONTEXT_BONUS: f64 = 5.0;
const RICH_CONTEXT_CHARS: usize = 100;

const COUNT_BONUS_PER_TUPLE: f64 = 2.0;
const MAX_COUNT_BONUS: f64 = 20.0;
const LONG_TEXT_CHARS: usize = 1000;
const LONG_TEXT_BONUS: f64 = 10.0;
const SHORT_TEXT_BONUS: f64 = 5.0;

/// What the pattern engine observed around one match.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoringSignals {
    pub has_percentage: bool,
    pub has_fold: bool,
    pub has_snp_id: bool,
    pub has_confidence_keyword: bool,
    pub context_chars: usize,
}

impl From<&ExtractedTuple> for ScoringSignals {
    fn from(tuple: &ExtractedTuple) -> Self {
        Self {
            has_percentage: tuple.percentage.is_some(),
            has_fold: tuple.fold.is_some(),
            has_snp_id: tuple.has_snp_id(),
            has_confidence_keyword: tuple.confidence_label.is_some(),
            context_chars: tuple.context_snippet.chars().count(),
        }
    }
}

pub fn score_signals(signals: &ScoringSignals) -> f64 {
    let mut score = TUPLE_BASE;
    if signals.has_percentage {
        score += PERCENTAGE_BONUS;
    }
    if signals.has_fold {
        score += FOLD_BONUS;
    }
    if signals.has_snp_id {
        score += SNP_ID_BONUS;
    }
    if signals.has_confidence_keyword {
        score += CONFIDENCE_KEYWORD_BONUS;
    }
    if signals.context_chars > RICH_CONTEXT_CHARS {
        score += RICH_CONTEXT_BONUS;
    }
    score.clamp(0.0, 100.0)
}

pub fn score_tuple(tuple: &ExtractedTuple) -> f64 {
    score_signals(&ScoringSignals::from(tuple))
}

/// Aggregate confidence for a document from its per-tuple scores.
///
/// Zero tuples score 0 whatever the text length.
pub fn score_document(tuple_scores: &[f64], text_chars: usize) -> f64 {
    if tuple_scores.is_empty() {
        return 0.0;
    }
    let average = tuple_scores.iter().sum::<f64>() / tuple_scores.len() as f64;
    let count_bonus = (COUNT_BONUS_PER_TUPLE * tuple_scores.len() as f64).min(MAX_COUNT_BONUS);
    let length_bonus = if text_chars > LONG_TEXT_CHARS {
        LONG_TEXT_BONUS
    } else {
        SHORT_TEXT_BONUS
    };
    (average + count_bonus + length_bonus).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_match_scores_base() {
        assert_eq!(score_signals(&ScoringSignals::default()), 50.0);
    }

    #[test]
    fn each_signal_adds_its_bonus() {
        let with = |f: fn(&mut ScoringSignals)| {
            let mut s = ScoringSignals::default();
            f(&mut s);
            score_signals(&s)
        };
        assert_eq!(with(|s| s.has_percentage = true), 65.0);
        assert_eq!(with(|s| s.has_fold = true), 60.0);
        assert_eq!(with(|s| s.has_snp_id = true), 70.0);
        assert_eq!(with(|s| s.has_confidence_keyword = true), 60.0);
        assert_eq!(with(|s| s.context_chars = 101), 55.0);
        assert_eq!(with(|s| s.context_chars = 100), 50.0);
    }

    #[test]
    fn all_signals_clamp_to_100() {
        let signals = ScoringSignals {
            has_percentage: true,
            has_fold: true,
            has_snp_id: true,
            has_confidence_keyword: true,
            context_chars: 400,
        };
        assert_eq!(score_signals(&signals), 100.0);
    }

    #[test]
    fn empty_document_scores_zero() {
        assert_eq!(score_document(&[], 5000), 0.0);
    }

    #[test]
    fn document_adds_count_and_length_bonus() {
        // avg 60 + 2*2 + 5
        assert_eq!(score_document(&[50.0, 70.0], 800), 69.0);
        // avg 60 + 2*2 + 10
        assert_eq!(score_document(&[50.0, 70.0], 1001), 74.0);
    }

    #[test]
    fn count_bonus_is_capped() {
        let scores = vec![50.0; 15];
        assert_eq!(score_document(&scores, 10), 75.0);
    }

    #[test]
    fn document_score_clamped() {
        let scores = vec![100.0; 12];
        assert_eq!(score_document(&scores, 2000), 100.0);
    }
}
