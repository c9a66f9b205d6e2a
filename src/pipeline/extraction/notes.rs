use std::fmt;

/// How a single extraction strategy attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    Succeeded { pages: usize, chars: usize },
    Empty,
    Failed(String),
}

impl fmt::Display for StrategyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { pages, chars } => write!(f, "ok ({pages} pages, {chars} chars)"),
            Self::Empty => f.write_str("no text"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Line-oriented log of one pipeline run, appended to the artifact's notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingNotes {
    lines: Vec<String>,
}

impl ProcessingNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_strategy(&mut self, strategy: &str, outcome: &StrategyOutcome) {
        self.lines.push(format!("[{strategy}] {outcome}"));
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Newline-terminated text ready to append to stored notes.
    pub fn to_text(&self) -> String {
        self.lines.iter().map(|l| format!("{l}\n")).collect()
    }

    /// Count of strategy attempts that ended in failure.
    pub fn failure_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.starts_with('[') && l.contains("] failed: "))
            .count()
    }
}
