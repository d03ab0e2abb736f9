use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::block::{RenderedBlock, Span};
use crate::citation::{Citation, FaithfulnessBand};
use crate::config::{Config, Theme};

const LINK_LABEL_CHARS: usize = 40;

/// Convert rendered blocks to HTML markup
pub fn render_html(blocks: &[RenderedBlock], citations: &[Citation], config: &Config) -> String {
    let mut out = String::new();

    match config.render.theme {
        Theme::Light => out.push_str("<div class=\"message\">\n"),
        Theme::Dark => out.push_str("<div class=\"message dark\">\n"),
    }

    for block in blocks {
        emit_block(block, citations, &mut out);
    }

    if config.render.show_sources && !citations.is_empty() {
        sources_to_html(citations, config.citations.preview_chars, &mut out);
    }

    out.push_str("</div>\n");
    out
}

/// Confidence badge shown above an answer
pub fn render_faithfulness(band: FaithfulnessBand, score: f64) -> String {
    match band {
        FaithfulnessBand::Refused => {
            "<span class=\"faithfulness refused\">Refused</span>\n".to_string()
        }
        _ => format!(
            "<span class=\"faithfulness {}\">{}% {}</span>\n",
            band.label().to_lowercase(),
            (score * 100.0).round(),
            band.label()
        ),
    }
}

fn emit_block(block: &RenderedBlock, citations: &[Citation], out: &mut String) {
    match block {
        RenderedBlock::Section { level, content } => {
            out.push_str(&format!("<h{level}>"));
            spans_to_html(content, citations, out);
            out.push_str(&format!("</h{level}>\n"));
        }
        RenderedBlock::Paragraph { content } => {
            out.push_str("<p>");
            spans_to_html(content, citations, out);
            out.push_str("</p>\n");
        }
        RenderedBlock::List { items } => {
            out.push_str("<ul>\n");
            for item in items {
                out.push_str("<li>");
                spans_to_html(item, citations, out);
                out.push_str("</li>\n");
            }
            out.push_str("</ul>\n");
        }
        RenderedBlock::Table { headers, rows } => {
            table_to_html(headers, rows, citations, out);
        }
        RenderedBlock::Rule => {
            out.push_str("<hr>\n");
        }
        RenderedBlock::Code { content, .. } => {
            out.push_str("<pre><code>");
            out.push_str(&encode_text(content));
            out.push_str("</code></pre>\n");
        }
    }
}

fn spans_to_html(spans: &[Span], citations: &[Citation], out: &mut String) {
    for span in spans {
        span_to_html(span, citations, out);
    }
}

fn span_to_html(span: &Span, citations: &[Citation], out: &mut String) {
    match span {
        Span::Text(text) => {
            out.push_str(&encode_text(text));
        }
        Span::Bold(text) => {
            out.push_str("<strong>");
            out.push_str(&encode_text(text));
            out.push_str("</strong>");
        }
        Span::Italic(text) => {
            out.push_str("<em>");
            out.push_str(&encode_text(text));
            out.push_str("</em>");
        }
        Span::CitationRef { number } => {
            out.push_str(&format!(
                "<sup class=\"citation\" data-citation=\"{number}\""
            ));
            if let Some(citation) = number.checked_sub(1).and_then(|i| citations.get(i)) {
                let title = format!(
                    "{} ({}% match)",
                    citation.document_name,
                    citation.similarity_percent()
                );
                out.push_str(" title=\"");
                out.push_str(&encode_double_quoted_attribute(&title));
                out.push('"');
            }
            out.push_str(&format!(">[{number}]</sup>"));
        }
    }
}

fn table_to_html(
    headers: &[Vec<Span>],
    rows: &[Vec<Vec<Span>>],
    citations: &[Citation],
    out: &mut String,
) {
    out.push_str("<table>\n<thead>\n<tr>");
    for cell in headers {
        out.push_str("<th>");
        spans_to_html(cell, citations, out);
        out.push_str("</th>");
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            spans_to_html(cell, citations, out);
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }

    out.push_str("</tbody>\n</table>\n");
}

fn sources_to_html(citations: &[Citation], preview_chars: usize, out: &mut String) {
    out.push_str(&format!(
        "<section class=\"sources\">\n<h4>Sources ({})</h4>\n<ol>\n",
        citations.len()
    ));
    for citation in citations {
        out.push_str("<li><span class=\"document\">");
        out.push_str(&encode_text(&citation.document_name));
        out.push_str(&format!(
            "</span> <span class=\"similarity\">{}% match</span>",
            citation.similarity_percent()
        ));
        if let Some(page) = citation.page_number {
            out.push_str(&format!(" <span class=\"page\">p. {page}</span>"));
        }
        out.push_str("<p>");
        out.push_str(&encode_text(&citation.preview(preview_chars)));
        out.push_str("</p>");
        links_to_html(&citation.urls(), out);
        out.push_str("</li>\n");
    }
    out.push_str("</ol>\n</section>\n");
}

/// Links found in a source excerpt, labelled with their first 40 characters
fn links_to_html(urls: &[&str], out: &mut String) {
    if urls.is_empty() {
        return;
    }
    out.push_str("<div class=\"links\">");
    for url in urls {
        let label: String = url.chars().take(LINK_LABEL_CHARS).collect();
        out.push_str("<a href=\"");
        out.push_str(&encode_double_quoted_attribute(url));
        out.push_str("\" target=\"_blank\" rel=\"noopener noreferrer\">");
        out.push_str(&encode_text(&label));
        out.push_str("...</a>");
    }
    out.push_str("</div>");
}
