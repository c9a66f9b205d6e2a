/// Sanitize extracted page text before it reaches the pattern engine.
///
/// Strips control characters, trims each line and collapses runs of blank
/// lines to a single one. Single blank lines are kept: they delimit sections.
pub fn sanitize_extracted_text(raw: &str) -> String {
    let cleaned: String = raw
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .map(|c| if c == '\t' || c == '\u{a0}' { ' ' } else { c })
        .filter(|c| *c == '\n' || !c.is_control())
        .collect();

    let mut out: Vec<&str> = Vec::new();
    for line in cleaned.lines().map(str::trim) {
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// True when sanitized text carries no content at all.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
