use std::sync::LazyLock;

use regex::Regex;

use crate::block::Block;

const CODE_FENCE: &str = "```";
const BULLET_MARKERS: [&str; 3] = ["• ", "- ", "* "];
const HEADER_PREFIXES: [(&str, u8); 3] = [("###", 3), ("##", 2), ("#", 1)];
/// Longest line (in characters) still treated as a heading
const HEADING_MAX_CHARS: usize = 80;

static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-{3,}|_{3,}|\*{3,})$").expect("valid rule pattern"));
static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|[\s\-:|]+\|$").expect("valid separator pattern"));
static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([0-9]+)\]").expect("valid citation pattern"));

/// Check if a line looks like a Title Case section heading: short, no
/// trailing period or colon, mixed case, and starting with a capital.
/// Short Title Case sentences pass too.
pub fn is_section_heading(line: &str) -> bool {
    let trimmed = line.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > HEADING_MAX_CHARS {
        return false;
    }
    if trimmed.ends_with('.') || trimmed.ends_with(':') {
        return false;
    }

    let is_all_caps = trimmed == trimmed.to_uppercase();
    let is_all_lower = trimmed == trimmed.to_lowercase();
    if is_all_caps || is_all_lower {
        return false;
    }

    trimmed
        .chars()
        .next()
        .is_some_and(|first| first.to_uppercase().eq(std::iter::once(first)))
}

pub fn is_bullet_point(line: &str) -> bool {
    bullet_item(line).is_some()
}

/// A fence opens or closes on any line starting with three backticks.
pub fn is_code_fence(line: &str) -> bool {
    line.trim().starts_with(CODE_FENCE)
}

pub fn is_horizontal_rule(line: &str) -> bool {
    HORIZONTAL_RULE.is_match(line.trim())
}

pub fn is_table_line(line: &str) -> bool {
    line.trim().contains('|')
}

pub fn is_table_separator(line: &str) -> bool {
    TABLE_SEPARATOR.is_match(line.trim())
}

pub fn is_empty_line(line: &str) -> bool {
    line.trim().is_empty()
}

/// Every `[n]` citation number in `text`, in order of appearance.
pub fn extract_citations(text: &str) -> Vec<usize> {
    CITATION_MARKER
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// A table recognised by [`parse_table`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMatch {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Index of the first line after the table
    pub next_index: usize,
}

/// Try to read a pipe table starting at `start`.
///
/// The header row must be followed directly by a separator row, and at least
/// one body row must follow. Returns `None` otherwise so the caller can
/// classify the line some other way.
pub fn parse_table(lines: &[&str], start: usize) -> Option<TableMatch> {
    let mut index = start;
    let mut table_lines = Vec::new();

    if let Some(header) = lines.get(index).filter(|line| is_table_line(line)) {
        table_lines.push(*header);
        index += 1;
    }

    if !lines.get(index).is_some_and(|line| is_table_separator(line)) {
        return None;
    }
    index += 1;

    while let Some(row) = lines
        .get(index)
        .filter(|line| is_table_line(line) && !is_table_separator(line))
    {
        table_lines.push(*row);
        index += 1;
    }

    if table_lines.len() < 2 {
        return None;
    }

    Some(TableMatch {
        headers: split_row(table_lines[0]),
        rows: table_lines[1..].iter().map(|row| split_row(row)).collect(),
        next_index: index,
    })
}

/// Split a table row on `|`, dropping empty cells (including genuinely
/// empty ones, not just the outer delimiters).
fn split_row(row: &str) -> Vec<String> {
    row.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

fn bullet_item(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    BULLET_MARKERS
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
        .map(str::trim)
}

fn markdown_header(trimmed: &str) -> Option<(u8, &str)> {
    HEADER_PREFIXES.iter().find_map(|&(prefix, level)| {
        trimmed
            .strip_prefix(prefix)
            .map(|rest| (level, rest.trim()))
    })
}

/// Inner text of a line wrapped in `**…**`. A bare `**` has overlapping
/// markers and yields an empty string.
fn bold_only_inner(trimmed: &str) -> Option<&str> {
    if !(trimmed.starts_with("**") && trimmed.ends_with("**")) {
        return None;
    }
    let inner = trimmed.get(2..trimmed.len().saturating_sub(2)).unwrap_or("");
    Some(inner.trim())
}

/// Parse message text into a list of blocks
pub fn parse(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut blocks = Vec::new();
    let mut state = ParseState::default();

    let mut i = 0;
    while i < lines.len() {
        i = process_line(&lines, i, &mut state, &mut blocks);
    }

    state.flush_list(&mut blocks);
    // Unterminated fence: keep whatever was collected
    if !state.code_lines.is_empty() {
        state.flush_code(&mut blocks);
    }

    tracing::trace!(lines = lines.len(), blocks = blocks.len(), "segmented message");
    blocks
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    InCodeBlock,
}

#[derive(Default)]
struct ParseState {
    mode: Mode,
    // Bullet items waiting for a non-bullet line
    list_items: Vec<String>,
    // Raw lines inside a fence
    code_lines: Vec<String>,
}

impl ParseState {
    fn flush_list(&mut self, blocks: &mut Vec<Block>) {
        if !self.list_items.is_empty() {
            let items = std::mem::take(&mut self.list_items);
            blocks.push(Block::List { items });
        }
    }

    fn flush_code(&mut self, blocks: &mut Vec<Block>) {
        let content = std::mem::take(&mut self.code_lines).join("\n");
        blocks.push(Block::Code {
            language: String::new(),
            content,
        });
    }
}

/// Classify `lines[i]`, returning the index of the next unconsumed line.
fn process_line(
    lines: &[&str],
    i: usize,
    state: &mut ParseState,
    blocks: &mut Vec<Block>,
) -> usize {
    let line = lines[i];
    let trimmed = line.trim();

    // Code fences
    if is_code_fence(line) {
        match state.mode {
            Mode::InCodeBlock => {
                state.flush_code(blocks);
                state.mode = Mode::Normal;
            }
            Mode::Normal => {
                state.flush_list(blocks);
                state.mode = Mode::InCodeBlock;
            }
        }
        return i + 1;
    }

    if state.mode == Mode::InCodeBlock {
        state.code_lines.push(line.to_string());
        return i + 1;
    }

    // Horizontal rule
    if is_horizontal_rule(line) {
        state.flush_list(blocks);
        blocks.push(Block::Rule);
        return i + 1;
    }

    // Tables. A pipe line ends a pending list even if no table follows.
    if is_table_line(line) {
        state.flush_list(blocks);
        if let Some(table) = parse_table(lines, i) {
            blocks.push(Block::Table {
                headers: table.headers,
                rows: table.rows,
            });
            return table.next_index;
        }
    }

    // Bullets
    if let Some(item) = bullet_item(line) {
        state.list_items.push(item.to_string());
        return i + 1;
    }

    // Blank lines neither emit nor break a list
    if is_empty_line(line) {
        return i + 1;
    }

    state.flush_list(blocks);

    if let Some((level, content)) = markdown_header(trimmed) {
        blocks.push(Block::Section {
            level,
            content: content.to_string(),
        });
        return i + 1;
    }

    if is_section_heading(trimmed) {
        blocks.push(Block::Section {
            level: 2,
            content: trimmed.to_string(),
        });
        return i + 1;
    }

    // Bold-only line from the model, used as a heading
    if let Some(inner) = bold_only_inner(trimmed) {
        if inner.chars().count() < HEADING_MAX_CHARS {
            blocks.push(Block::Section {
                level: 2,
                content: inner.to_string(),
            });
            return i + 1;
        }
    }

    blocks.push(Block::Paragraph {
        content: trimmed.to_string(),
    });
    i + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn section(level: u8, content: &str) -> Block {
        Block::Section {
            level,
            content: content.to_string(),
        }
    }

    fn paragraph(content: &str) -> Block {
        Block::Paragraph {
            content: content.to_string(),
        }
    }

    fn list(items: &[&str]) -> Block {
        Block::List {
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn code(content: &str) -> Block {
        Block::Code {
            language: String::new(),
            content: content.to_string(),
        }
    }

    #[rstest]
    #[case("Results Summary", true)]
    #[case("  Key Findings  ", true)]
    #[case("1st Place Finish", true)]
    #[case("THIS IS SHOUTING", false)]
    #[case("all lowercase words", false)]
    #[case("a trailing line.", false)]
    #[case("Ends With Colon:", false)]
    #[case("lowercase start Then Caps", false)]
    #[case("12345", false)]
    #[case("", false)]
    #[case("   ", false)]
    fn section_heading_heuristic(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_section_heading(line), expected);
    }

    #[test]
    fn section_heading_length_cutoff() {
        let at_limit = format!("A{}", "b".repeat(79));
        let over_limit = format!("A{}", "b".repeat(80));
        assert!(is_section_heading(&at_limit));
        assert!(!is_section_heading(&over_limit));
    }

    #[rstest]
    #[case("- item", true)]
    #[case("* item", true)]
    #[case("• item", true)]
    #[case("   - indented", true)]
    #[case("-item", false)]
    #[case("**bold**", false)]
    #[case("-", false)]
    fn bullet_points(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_bullet_point(line), expected);
    }

    #[rstest]
    #[case("---", true)]
    #[case("  *****  ", true)]
    #[case("___", true)]
    #[case("--", false)]
    #[case("-*-", false)]
    #[case("--- x", false)]
    fn horizontal_rules(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_horizontal_rule(line), expected);
    }

    #[rstest]
    #[case("|---|---|", true)]
    #[case("| :--- | ---: |", true)]
    #[case("|---|---", false)]
    #[case("| A | B |", false)]
    fn table_separators(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_table_separator(line), expected);
    }

    #[test]
    fn extracts_citation_numbers_in_order() {
        assert_eq!(extract_citations("a [2] b [10] [2]"), vec![2, 10, 2]);
        assert_eq!(extract_citations("no markers [x] here"), Vec::<usize>::new());
    }

    #[test]
    fn empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn bullets_then_paragraph() {
        assert_eq!(
            parse("- one\n- two\nnext paragraph"),
            vec![list(&["one", "two"]), paragraph("next paragraph")]
        );
    }

    #[test]
    fn blank_lines_do_not_break_list() {
        assert_eq!(
            parse("- one\n\n* two\n\n• three"),
            vec![list(&["one", "two", "three"])]
        );
    }

    #[test]
    fn list_flushed_at_end_of_input() {
        assert_eq!(parse("text here\n- a"), vec![paragraph("text here"), list(&["a"])]);
    }

    #[test]
    fn table() {
        let text = "| A | B |\n|---|---|\n| 1 | 2 |";
        assert_eq!(
            parse(text),
            vec![Block::Table {
                headers: vec!["A".to_string(), "B".to_string()],
                rows: vec![vec!["1".to_string(), "2".to_string()]],
            }]
        );
    }

    #[test]
    fn table_drops_empty_cells() {
        let lines = ["| A | | C |", "|---|---|---|", "| 1 | 2 | |"];
        let table = parse_table(&lines, 0).unwrap();
        assert_eq!(table.headers, vec!["A", "C"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
        assert_eq!(table.next_index, 3);
    }

    #[test]
    fn table_without_separator_falls_through() {
        assert_eq!(parse_table(&["| A | B |", "| 1 | 2 |"], 0), None);
        assert_eq!(
            parse("a | b\nc | d"),
            vec![paragraph("a | b"), paragraph("c | d")]
        );
    }

    #[test]
    fn table_needs_a_body_row() {
        assert_eq!(parse_table(&["| A | B |", "|---|---|"], 0), None);
        assert_eq!(
            parse("| A | B |\n|---|---|"),
            vec![paragraph("| A | B |"), paragraph("|---|---|")]
        );
    }

    #[test]
    fn table_stops_at_non_table_line() {
        let text = "| A | B |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |\nafter the table";
        let blocks = parse(text);
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], Block::Table { rows, .. } if rows.len() == 2));
        assert_eq!(blocks[1], paragraph("after the table"));
    }

    #[test]
    fn table_body_ends_at_second_separator() {
        let text = "| A | B |\n|---|---|\n| 1 | 2 |\n|---|---|\n| 3 | 4 |";
        assert_eq!(
            parse(text),
            vec![
                Block::Table {
                    headers: vec!["A".to_string(), "B".to_string()],
                    rows: vec![vec!["1".to_string(), "2".to_string()]],
                },
                paragraph("|---|---|"),
                paragraph("| 3 | 4 |"),
            ]
        );
    }

    #[test]
    fn pipe_line_flushes_pending_list() {
        let text = "- a\n| x | y |\n|---|---|\n| 1 | 2 |";
        let blocks = parse(text);
        assert_eq!(blocks[0], list(&["a"]));
        assert!(matches!(blocks[1], Block::Table { .. }));
    }

    #[test]
    fn bullet_containing_pipe_starts_new_list() {
        assert_eq!(
            parse("- a\n- b | c"),
            vec![list(&["a"]), list(&["b | c"])]
        );
    }

    #[test]
    fn fenced_code() {
        assert_eq!(parse("```\nx = 1\n```"), vec![code("x = 1")]);
    }

    #[test]
    fn fenced_code_keeps_raw_lines() {
        assert_eq!(
            parse("```python\n    indented\n- not a bullet\n\n# not a header\n```"),
            vec![code("    indented\n- not a bullet\n\n# not a header")]
        );
    }

    #[test]
    fn unterminated_fence_still_emits_code() {
        assert_eq!(
            parse("Intro text.\n```\nlet a = 1;\nlet b = 2;"),
            vec![paragraph("Intro text."), code("let a = 1;\nlet b = 2;")]
        );
    }

    #[test]
    fn empty_unterminated_fence_emits_nothing() {
        assert_eq!(parse("```"), vec![]);
        assert_eq!(parse("```\n```"), vec![code("")]);
    }

    #[test]
    fn fence_flushes_pending_list() {
        assert_eq!(
            parse("- a\n```\nb\n```"),
            vec![list(&["a"]), code("b")]
        );
    }

    #[test]
    fn rules() {
        assert_eq!(
            parse("- a\n---\n***\n___"),
            vec![list(&["a"]), Block::Rule, Block::Rule, Block::Rule]
        );
    }

    #[test]
    fn markdown_headers() {
        assert_eq!(
            parse("# Title\n## sub\n### deep\n#### deeper"),
            vec![
                section(1, "Title"),
                section(2, "sub"),
                section(3, "deep"),
                section(3, "# deeper"),
            ]
        );
    }

    #[test]
    fn heuristic_heading_keeps_markup() {
        assert_eq!(parse("**Key Points**"), vec![section(2, "**Key Points**")]);
        // Short Title Case sentences are headings too
        assert_eq!(parse("The Model Works Well"), vec![section(2, "The Model Works Well")]);
    }

    #[test]
    fn bold_only_line_fallback() {
        assert_eq!(parse("**IMPORTANT NOTE**"), vec![section(2, "IMPORTANT NOTE")]);
        assert_eq!(parse("**summary:**"), vec![section(2, "summary:")]);
        assert_eq!(parse("**"), vec![section(2, "")]);
    }

    #[test]
    fn long_bold_line_is_paragraph() {
        let line = format!("**{}**", "x".repeat(80));
        assert_eq!(parse(&line), vec![paragraph(&line)]);
    }

    #[test]
    fn paragraphs_are_trimmed() {
        assert_eq!(
            parse("   the answer is 42 [1].   \r\nSecond line here."),
            vec![paragraph("the answer is 42 [1]."), paragraph("Second line here.")]
        );
    }
}
