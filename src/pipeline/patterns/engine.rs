use serde::{Deserialize, Serialize};

use super::catalogue::{categorize, TraitPattern, TRAIT_CATALOGUE};
use super::fields;
use super::segment::{split_sections, Section};
use crate::models::enums::ResultCategory;

/// Chars of context taken on each side of a trait match.
pub const CONTEXT_RADIUS: usize = 200;

/// Longest context snippet kept for provenance.
pub const MAX_SNIPPET_CHARS: usize = 500;

/// One trait match with every sub-field harvested from its context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTuple {
    pub trait_name: String,
    pub category: ResultCategory,
    /// Catalogue group the trait came from, e.g. "carrier status".
    pub subcategory: String,
    pub result_value: Option<String>,
    pub confidence_label: Option<String>,
    pub risk_score: Option<f64>,
    /// Raw numeric evidence, kept for scoring.
    pub percentage: Option<f64>,
    pub fold: Option<f64>,
    pub genetic_markers: Vec<String>,
    pub methodology: Option<String>,
    pub recommendation: Option<String>,
    pub page_number: u32,
    /// Char offsets of the trait match in the full extracted text.
    pub start_offset: usize,
    pub end_offset: usize,
    pub context_snippet: String,
}

impl ExtractedTuple {
    pub fn has_snp_id(&self) -> bool {
        self.genetic_markers.iter().any(|m| m.starts_with("rs"))
    }
}

/// Regex catalogue scan over sectioned report text.
pub struct TraitPatternEngine {
    patterns: &'static [TraitPattern],
    context_radius: usize,
}

impl Default for TraitPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TraitPatternEngine {
    pub fn new() -> Self {
        Self {
            patterns: TRAIT_CATALOGUE.as_slice(),
            context_radius: CONTEXT_RADIUS,
        }
    }

    pub fn with_context_radius(mut self, chars: usize) -> Self {
        self.context_radius = chars;
        self
    }

    /// Scan every section against the catalogue.
    ///
    /// A trait is reported at most once per section (its first match), and
    /// only when the match carries a result value, a risk score or markers.
    pub fn extract(&self, text: &str) -> Vec<ExtractedTuple> {
        let sections = split_sections(text);
        let mut tuples = Vec::new();

        for section in &sections {
            for pattern in self.patterns {
                let Some(caps) = pattern.regex.captures(&section.text) else {
                    continue;
                };
                let m = caps.get(0).map_or(0..0, |m| m.range());
                let trait_name = pattern.trait_name(&caps);
                match self.harvest(section, pattern, trait_name, m.start, m.end) {
                    Some(tuple) => tuples.push(tuple),
                    None => tracing::debug!(
                        trait_name = pattern.name,
                        page = section.page_number,
                        "Trait mention without result fields skipped"
                    ),
                }
            }
        }

        tracing::debug!(
            sections = sections.len(),
            tuples = tuples.len(),
            "Trait pattern scan complete"
        );
        tuples
    }

    fn harvest(
        &self,
        section: &Section,
        pattern: &TraitPattern,
        trait_name: String,
        match_start: usize,
        match_end: usize,
    ) -> Option<ExtractedTuple> {
        let text = section.text.as_str();
        let char_len = text.chars().count();
        let start_char = text[..match_start].chars().count();
        let end_char = start_char + text[match_start..match_end].chars().count();

        let window_start = byte_index(text, start_char.saturating_sub(self.context_radius));
        let window_end = byte_index(text, (end_char + self.context_radius).min(char_len));
        let window = &text[window_start..window_end];
        // Text from the match forward; the trait's own result usually follows it.
        let forward = &text[match_start..window_end];

        let result_value = fields::result_value(forward).or_else(|| fields::result_value(window));
        let percentage = fields::find_percentage(forward).or_else(|| fields::find_percentage(window));
        let fold = fields::find_fold(forward).or_else(|| fields::find_fold(window));
        let risk_score = fields::risk_score(percentage, fold);
        let genetic_markers = fields::find_markers(window);

        if result_value.is_none() && risk_score.is_none() && genetic_markers.is_empty() {
            return None;
        }

        Some(ExtractedTuple {
            trait_name,
            category: categorize(pattern.group),
            subcategory: pattern.group.to_string(),
            result_value,
            confidence_label: fields::find_confidence_label(window).map(str::to_string),
            risk_score,
            percentage,
            fold,
            genetic_markers,
            methodology: fields::find_methodology(window),
            recommendation: fields::find_recommendation(window),
            page_number: section.page_number,
            start_offset: section.char_offset + start_char,
            end_offset: section.char_offset + end_char,
            context_snippet: window.chars().take(MAX_SNIPPET_CHARS).collect(),
        })
    }
}

/// Byte index of the `char_idx`-th char, or the text length past the end.
fn byte_index(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
