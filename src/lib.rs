mod block;
mod citation;
mod config;
mod html;
mod inline;
mod parser;

pub use block::{Block, RenderedBlock, Span};
pub use citation::{Citation, ConfidenceLevel, FaithfulnessBand, QueryResponse};
pub use config::{CitationConfig, Config, ConfigError, FaithfulnessConfig, RenderConfig, Theme};
pub use html::{render_faithfulness, render_html};
pub use inline::render_inline;
pub use parser::{
    TableMatch, extract_citations, is_bullet_point, is_code_fence, is_empty_line,
    is_horizontal_rule, is_section_heading, is_table_line, is_table_separator, parse_table,
};

/// Segment message text into a vector of blocks.
pub fn parse(text: &str) -> Vec<Block> {
    parser::parse(text)
}

/// Segment message text and render the inline markup of every heading,
/// paragraph, list item and table cell against `citations`.
pub fn render_message(text: &str, citations: &[Citation]) -> Vec<RenderedBlock> {
    parse(text)
        .into_iter()
        .map(|block| render_block(block, citations))
        .collect()
}

fn render_block(block: Block, citations: &[Citation]) -> RenderedBlock {
    match block {
        Block::Section { level, content } => RenderedBlock::Section {
            level,
            content: render_inline(&content, citations),
        },
        Block::Paragraph { content } => RenderedBlock::Paragraph {
            content: render_inline(&content, citations),
        },
        Block::List { items } => RenderedBlock::List {
            items: items.iter().map(|item| render_inline(item, citations)).collect(),
        },
        Block::Table { headers, rows } => RenderedBlock::Table {
            headers: headers.iter().map(|cell| render_inline(cell, citations)).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| render_inline(cell, citations))
                        .collect::<Vec<_>>()
                })
                .collect(),
        },
        Block::Rule => RenderedBlock::Rule,
        Block::Code { language, content } => RenderedBlock::Code { language, content },
    }
}

/// Convert message text to HTML using the compiled-in config.
pub fn message_to_html(text: &str, citations: &[Citation]) -> String {
    message_to_html_with_config(text, citations, &Config::compiled_default())
}

/// Convert message text to HTML with custom config.
pub fn message_to_html_with_config(
    text: &str,
    citations: &[Citation],
    config: &Config,
) -> String {
    let blocks = render_message(text, citations);
    html::render_html(&blocks, citations, config)
}
