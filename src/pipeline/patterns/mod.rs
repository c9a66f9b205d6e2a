pub mod catalogue;
pub mod fields;
pub mod segment;
pub mod engine;

pub use catalogue::{categorize, TraitPattern, TRAIT_CATALOGUE};
pub use engine::{ExtractedTuple, TraitPatternEngine, CONTEXT_RADIUS, MAX_SNIPPET_CHARS};
pub use segment::{split_sections, Section};
