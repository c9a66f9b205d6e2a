//! Fixed catalogue of trait signatures recognised in lab report text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::enums::ResultCategory;

/// Words a report may put right after a trait name on the same line
/// ("Type 2 Diabetes Risk"). They become part of the reported trait name.
const QUALIFIERS: &str = r"risk|predisposition|susceptibility|likelihood";

/// One recognisable trait: canonical name, its catalogue group and the
/// case-insensitive regex that finds it in text.
pub struct TraitPattern {
    pub name: &'static str,
    pub group: &'static str,
    pub regex: Regex,
}

impl TraitPattern {
    /// Reported trait name for one match: the canonical name, followed by
    /// the title-cased qualifier when the text carries one.
    pub fn trait_name(&self, caps: &Captures<'_>) -> String {
        match caps.name("qualifier") {
            Some(q) => format!("{} {}", self.name, title_case(q.as_str())),
            None => self.name.to_string(),
        }
    }
}

fn pattern(name: &'static str, group: &'static str, regex: &str) -> TraitPattern {
    TraitPattern {
        name,
        group,
        regex: Regex::new(&format!(
            r"(?i)\b(?:{regex})(?:[ \t]+(?P<qualifier>{QUALIFIERS})\b)?"
        ))
        .unwrap(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub static TRAIT_CATALOGUE: LazyLock<Vec<TraitPattern>> = LazyLock::new(|| {
    vec![
        // Disease risk
        pattern("Type 2 Diabetes", "disease risk", r"type\s*(?:2|ii)\s+diabetes"),
        pattern("Coronary Artery Disease", "disease risk", r"coronary\s+(?:artery|heart)\s+disease"),
        pattern("Alzheimer's Disease", "disease risk", r"(?:late[\s-]onset\s+)?alzheimer[’']?s?(?:\s+disease)?"),
        pattern("Parkinson's Disease", "disease risk", r"parkinson[’']?s?(?:\s+disease)?"),
        pattern("Breast Cancer", "disease risk", r"(?:hereditary\s+)?breast(?:\s+and\s+ovarian)?\s+cancer"),
        pattern("Colorectal Cancer", "disease risk", r"colorectal\s+cancer"),
        pattern("Celiac Disease", "disease risk", r"c(?:o)?eliac\s+disease"),
        pattern("Age-Related Macular Degeneration", "disease risk", r"(?:age[\s-]related\s+)?macular\s+degeneration"),
        pattern("Atrial Fibrillation", "disease risk", r"atrial\s+fibrillation"),
        pattern("Hereditary Hemochromatosis", "disease risk", r"(?:hereditary\s+)?ha?emochromatosis"),
        pattern("Venous Thromboembolism", "disease risk", r"venous\s+thrombo(?:embolism|sis)|factor\s+v\s+leiden"),
        // Carrier status
        pattern("Cystic Fibrosis", "carrier status", r"cystic\s+fibrosis"),
        pattern("Sickle Cell Anemia", "carrier status", r"sickle\s+cell(?:\s+(?:anemia|anaemia|disease))?"),
        pattern("Tay-Sachs Disease", "carrier status", r"tay[\s-]sachs(?:\s+disease)?"),
        pattern("Spinal Muscular Atrophy", "carrier status", r"spinal\s+muscular\s+atrophy"),
        pattern("Phenylketonuria", "carrier status", r"phenylketonuria|\bpku\b"),
        pattern("Beta Thalassemia", "carrier status", r"beta[\s-]thalass(?:a)?emia"),
        // Ancestry
        pattern("Ancestry Composition", "ancestry", r"ancestry\s+composition|ethnic(?:ity)?\s+estimate"),
        pattern("Maternal Haplogroup", "ancestry", r"maternal\s+haplogroup"),
        pattern("Paternal Haplogroup", "ancestry", r"paternal\s+haplogroup"),
        pattern("Neanderthal Ancestry", "ancestry", r"neanderthal\s+(?:ancestry|variants?)"),
        // Pharmacogenomics
        pattern("Warfarin Sensitivity", "drug response", r"warfarin(?:\s+(?:sensitivity|response|dosing))?"),
        pattern("Clopidogrel Response", "drug response", r"clopidogrel(?:\s+(?:response|efficacy))?"),
        pattern("Statin Response", "drug response", r"statin(?:[\s-]induced\s+myopathy|\s+response)?"),
        pattern("Caffeine Metabolism", "drug response", r"caffeine\s+metabolism"),
        pattern("Codeine Response", "drug response", r"codeine(?:\s+response)?"),
        // Fitness
        pattern("Muscle Composition", "fitness", r"muscle\s+(?:composition|fib(?:er|re)\s+type)"),
        pattern("Endurance Capacity", "fitness", r"endurance(?:\s+(?:capacity|performance))?"),
        pattern("VO2 Max", "fitness", r"vo2\s*max"),
        pattern("Power Performance", "fitness", r"(?:power|sprint)\s+performance"),
        pattern("Injury Susceptibility", "fitness", r"(?:tendon|soft[\s-]tissue)\s+injury|injury\s+(?:risk|susceptibility)"),
        // General traits
        pattern("Lactose Intolerance", "traits", r"lactose\s+(?:intolerance|tolerance)"),
        pattern("Eye Color", "traits", r"eye\s+colou?r"),
        pattern("Hair Color", "traits", r"hair\s+colou?r"),
        pattern("Bitter Taste Perception", "traits", r"bitter\s+taste(?:\s+perception)?"),
        pattern("Alcohol Flush Reaction", "traits", r"alcohol\s+flush(?:\s+reaction)?"),
        pattern("Earwax Type", "traits", r"ear\s*wax\s+type"),
        pattern("Cilantro Aversion", "traits", r"cilantro\s+(?:taste\s+)?aversion"),
        pattern("Deep Sleep", "traits", r"deep\s+sleep"),
    ]
});

/// Map a catalogue group (or any free label) onto a result category by
/// keyword bucket. Checked in order, so "carrier" wins over "disease".
pub fn categorize(label: &str) -> ResultCategory {
    let lower = label.to_lowercase();
    const BUCKETS: &[(&[&str], ResultCategory)] = &[
        (&["carrier"], ResultCategory::CarrierStatus),
        (&["drug", "medication", "pharmaco"], ResultCategory::Pharmacogenomics),
        (&["ancestry", "haplogroup", "ethnic"], ResultCategory::Ancestry),
        (&["fitness", "athletic", "exercise"], ResultCategory::Fitness),
        (&["disease", "cancer", "risk"], ResultCategory::HealthRisk),
    ];
    BUCKETS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, category)| *category)
        .unwrap_or(ResultCategory::Traits)
}
