//! Sub-field extractors applied to a trait's context window.
//!
//! All functions are pure: text in, value out.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Most markers kept per tuple.
pub const MAX_MARKERS: usize = 10;

/// Points of risk score per unit of fold change, when no percentage is given.
const FOLD_TO_RISK: f64 = 20.0;

static RISK_DIRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:slightly|moderately|significantly|substantially)\s+)?(?:increased|elevated|higher|reduced|decreased|lower|typical|average|normal)\s+(?:genetic\s+)?(?:risk|likelihood|odds)\b",
    )
    .unwrap()
});

/// Non-risk result phrases: carrier calls, tolerance, metabolizer status.
static RESULT_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:not\s+a\s+carrier|non-?carrier|(?:you\s+are\s+a\s+)?carrier(?:\s+of\s+(?:one|two|a)\s+variants?)|carrier\s+detected|likely\s+(?:lactose\s+)?(?:in)?tolerant|(?:ultra[\s-]?rapid|rapid|fast|normal|intermediate|slow|poor)\s+metaboli[sz]er|variants?\s+(?:not\s+)?detected|no\s+variants?\s+detected|haplogroup\s+[A-Z][0-9A-Za-z]*)\b",
    )
    .unwrap()
});

static PERCENTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").unwrap());

static FOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:-?fold\b|times\b|x\b|×)").unwrap()
});

static CONFIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(high|medium|moderate|low)\s+confidence\b|\bconfidence(?:\s+level)?\s*[:=\-]?\s*(high|medium|moderate|low)\b",
    )
    .unwrap()
});

static CONFIDENCE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(high|medium|moderate|low)\b").unwrap());

static SNP_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\brs\d+\b").unwrap());

static GENE_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9]{1,7}(?:-[A-Z0-9]{1,4})?\b").unwrap());

static METHODOLOGY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:whole[\s-]genome\s+sequencing|whole[\s-]exome\s+sequencing|next[\s-]generation\s+sequencing|targeted\s+(?:panel\s+)?sequencing|sanger\s+sequencing|snp\s+(?:array|genotyping|chip)|genotyping\s+(?:array|chip)|microarray|pcr)\b",
    )
    .unwrap()
});

static RECOMMENDATION_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:recommend\w*|consult\w*|consider\w*|discuss\w*)\b").unwrap()
});

/// Uppercase words common in report prose that are not gene symbols.
const GENE_STOPWORDS: &[&str] = &[
    "DNA", "RNA", "SNP", "SNPS", "RISK", "HIGH", "LOW", "MEDIUM", "MODERATE", "YES", "NO",
    "NOT", "AND", "OR", "THE", "FOR", "WITH", "YOUR", "YOU", "OF", "IN", "ON", "TO", "IS",
    "ID", "PDF", "USA", "US", "UK", "EU", "FDA", "CLIA", "CAP", "NA", "N/A", "OK", "DOB",
    "MD", "PHD", "LAB", "TEST", "TYPE", "RESULT", "RESULTS", "REPORT", "GENE", "GENES",
    "GENETIC", "VARIANT", "VARIANTS", "STATUS", "CARRIER", "SUMMARY", "PAGE", "NOTE",
    "NOTES", "DISEASE", "TRAIT", "TRAITS", "ANCESTRY", "FITNESS", "HEALTH", "DRUG",
    "CONFIDENCE", "INCREASED", "REDUCED", "TYPICAL", "NORMAL", "DETECTED", "NONE", "II",
    "III", "IV", "VO2", "BMI", "LDL", "HDL", "PCR", "WGS", "WES", "NGS", "ACMG",
];

pub fn find_risk_direction(context: &str) -> Option<String> {
    RISK_DIRECTION.find(context).map(|m| collapse_whitespace(m.as_str()))
}

pub fn find_result_phrase(context: &str) -> Option<String> {
    RESULT_PHRASES.find(context).map(|m| collapse_whitespace(m.as_str()))
}

/// First percentage in the text, accepted only within [0, 100].
pub fn find_percentage(context: &str) -> Option<f64> {
    PERCENTAGE
        .captures_iter(context)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .find(|v| (0.0..=100.0).contains(v))
}

/// First fold multiplier ("2x", "1.5-fold", "3 times").
pub fn find_fold(context: &str) -> Option<f64> {
    FOLD.captures_iter(context)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .find(|v| *v > 0.0)
}

/// Normalized confidence label. An explicit "high confidence" or
/// "confidence: low" wins; otherwise the first bare high/medium/low keyword.
pub fn find_confidence_label(context: &str) -> Option<&'static str> {
    let word = match CONFIDENCE.captures(context) {
        Some(caps) => caps.get(1).or_else(|| caps.get(2))?.as_str(),
        None => CONFIDENCE_KEYWORD.captures(context)?.get(1)?.as_str(),
    };
    Some(match word.to_lowercase().as_str() {
        "high" => "HIGH",
        "low" => "LOW",
        _ => "MEDIUM",
    })
}

/// Risk score: a stated percentage wins; otherwise fold × 20, capped at 100.
pub fn risk_score(percentage: Option<f64>, fold: Option<f64>) -> Option<f64> {
    percentage.or_else(|| fold.map(|f| (f * FOLD_TO_RISK).min(100.0)))
}

/// Result value: risk-direction phrase, else another result phrase, else the
/// raw percentage, else the raw fold multiplier.
pub fn result_value(context: &str) -> Option<String> {
    if let Some(phrase) = find_risk_direction(context).or_else(|| find_result_phrase(context)) {
        return Some(phrase);
    }
    if let Some(m) = PERCENTAGE.find(context) {
        return Some(m.as_str().replace(' ', ""));
    }
    FOLD.find(context).map(|m| collapse_whitespace(m.as_str()))
}

/// SNP ids and gene symbols in order of appearance, deduplicated and capped.
pub fn find_markers(context: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = SNP_ID
        .find_iter(context)
        .map(|m| (m.start(), m.as_str().to_lowercase()))
        .collect();

    for m in GENE_SYMBOL.find_iter(context) {
        let token = m.as_str();
        if is_gene_symbol(token) {
            found.push((m.start(), token.to_string()));
        }
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .map(|(_, marker)| marker)
        .filter(|marker| seen.insert(marker.clone()))
        .take(MAX_MARKERS)
        .collect()
}

fn is_gene_symbol(token: &str) -> bool {
    if token.chars().all(|c| c.is_ascii_digit() || c == '-') {
        return false;
    }
    // Bare genotype calls such as "CT" or "AG".
    if token.len() <= 3 && token.chars().all(|c| matches!(c, 'A' | 'C' | 'G' | 'T')) {
        return false;
    }
    // SNP ids are collected separately.
    if token.starts_with("RS") && token[2..].chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    !GENE_STOPWORDS.contains(&token)
}

pub fn find_methodology(context: &str) -> Option<String> {
    METHODOLOGY.find(context).map(|m| collapse_whitespace(m.as_str()))
}

/// First sentence of the context that gives advice.
pub fn find_recommendation(context: &str) -> Option<String> {
    context
        .split(|c| matches!(c, '.' | '!' | '?' | '\n'))
        .map(str::trim)
        .find(|sentence| RECOMMENDATION_CUE.is_match(sentence))
        .map(|sentence| format!("{}.", collapse_whitespace(sentence)))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_drives_risk() {
        let ctx = "Type 2 Diabetes: increased risk. Lifetime risk 35% (average 25%).";
        assert_eq!(find_percentage(ctx), Some(35.0));
        assert_eq!(risk_score(find_percentage(ctx), find_fold(ctx)), Some(35.0));
    }

    #[test]
    fn percentage_wins_over_fold() {
        let ctx = "35% risk, about 2x higher than average";
        assert_eq!(risk_score(find_percentage(ctx), find_fold(ctx)), Some(35.0));
    }

    #[test]
    fn fold_only_maps_to_twenty_per_unit() {
        let ctx = "2x higher than the general population";
        assert_eq!(find_percentage(ctx), None);
        assert_eq!(find_fold(ctx), Some(2.0));
        assert_eq!(risk_score(None, find_fold(ctx)), Some(40.0));
    }

    #[test]
    fn fold_risk_is_capped_at_100() {
        assert_eq!(risk_score(None, Some(7.5)), Some(100.0));
    }

    #[test]
    fn fold_variants_recognised() {
        assert_eq!(find_fold("a 1.5-fold increase"), Some(1.5));
        assert_eq!(find_fold("3 times more likely"), Some(3.0));
        assert_eq!(find_fold("roughly 2× the risk"), Some(2.0));
        assert_eq!(find_fold("rs7903146 variant"), None);
    }

    #[test]
    fn out_of_range_percentage_ignored() {
        assert_eq!(find_percentage("coverage 250% then 12%"), Some(12.0));
    }

    #[test]
    fn result_value_prefers_risk_direction() {
        assert_eq!(
            result_value("Result: slightly increased risk (35%)").as_deref(),
            Some("slightly increased risk")
        );
        assert_eq!(result_value("Carrier Status: Not a carrier").as_deref(), Some("Not a carrier"));
        assert_eq!(result_value("Caffeine: fast metabolizer").as_deref(), Some("fast metabolizer"));
        assert_eq!(result_value("Estimated 12 %").as_deref(), Some("12%"));
        assert_eq!(result_value("2x higher").as_deref(), Some("2x"));
        assert_eq!(result_value("no values here"), None);
    }

    #[test]
    fn confidence_label_from_explicit_phrase() {
        assert_eq!(find_confidence_label("High confidence result"), Some("HIGH"));
        assert_eq!(find_confidence_label("Confidence: moderate"), Some("MEDIUM"));
        assert_eq!(find_confidence_label("confidence level LOW"), Some("LOW"));
    }

    #[test]
    fn confidence_label_falls_back_to_bare_keyword() {
        assert_eq!(find_confidence_label("Celiac Disease: high risk 40%, HLA-DQ2 present"), Some("HIGH"));
        assert_eq!(find_confidence_label("moderate effect"), Some("MEDIUM"));
        // The explicit phrase beats an earlier bare keyword.
        assert_eq!(find_confidence_label("high risk, low confidence"), Some("LOW"));
        assert_eq!(find_confidence_label("higher than average, lower odds"), None);
    }

    #[test]
    fn markers_in_order_without_stopwords() {
        let ctx = "Type 2 Diabetes RISK: variant rs7903146 in TCF7L2 (CT genotype). DNA tested; see rs7903146 again.";
        assert_eq!(find_markers(ctx), vec!["rs7903146", "TCF7L2"]);
    }

    #[test]
    fn markers_capped_at_ten() {
        let ctx = (1..=15).map(|i| format!("rs{i}00")).collect::<Vec<_>>().join(" ");
        let markers = find_markers(&ctx);
        assert_eq!(markers.len(), MAX_MARKERS);
        assert_eq!(markers[0], "rs100");
    }

    #[test]
    fn hyphenated_gene_symbols_kept() {
        let markers = find_markers("HLA-DQ2 and HLA-DQ8 haplotypes, BRCA1, CYP2C19*2");
        assert_eq!(markers, vec!["HLA-DQ2", "HLA-DQ8", "BRCA1", "CYP2C19"]);
    }

    #[test]
    fn numeric_tokens_rejected() {
        assert!(find_markers("2024 12345 99").is_empty());
    }

    #[test]
    fn methodology_detected() {
        assert_eq!(
            find_methodology("Analysed by SNP array genotyping").as_deref(),
            Some("SNP array")
        );
        assert_eq!(find_methodology("no method stated"), None);
    }

    #[test]
    fn recommendation_is_first_advice_sentence() {
        let ctx = "Increased risk 35%. Maintain a healthy weight. We recommend annual glucose screening. Consult your physician.";
        assert_eq!(
            find_recommendation(ctx).as_deref(),
            Some("We recommend annual glucose screening.")
        );
        assert_eq!(find_recommendation("Typical risk."), None);
    }
}
