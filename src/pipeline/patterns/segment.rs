use crate::pipeline::extraction::parse_page_marker;

/// A blank-line-delimited block of text within one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub page_number: u32,
    /// Char offset of the section's first character in the full text.
    pub char_offset: usize,
    pub text: String,
}

/// Split extracted text into page blocks by marker line, then into sections
/// by blank line. Text before the first marker belongs to page 1.
///
/// Sections keep their lines verbatim, so a char index inside `text` plus
/// `char_offset` is a char index into the full text.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut page_number = 1u32;
    let mut current: Option<(usize, Vec<&str>)> = None;
    let mut offset = 0usize;

    for line in text.split('\n') {
        if let Some(page) = parse_page_marker(line) {
            flush(&mut sections, &mut current, page_number);
            page_number = u32::try_from(page).unwrap_or(u32::MAX);
        } else if line.trim().is_empty() {
            flush(&mut sections, &mut current, page_number);
        } else {
            current.get_or_insert_with(|| (offset, Vec::new())).1.push(line);
        }
        offset += line.chars().count() + 1;
    }
    flush(&mut sections, &mut current, page_number);

    sections
}

fn flush(sections: &mut Vec<Section>, current: &mut Option<(usize, Vec<&str>)>, page_number: u32) {
    if let Some((char_offset, lines)) = current.take() {
        sections.push(Section {
            page_number,
            char_offset,
            text: lines.join("\n"),
        });
    }
}
