//! Evaluation rendering for the results screen.
//!
//! The model is asked for a tiny markdown subset. Each line maps to exactly
//! one block:
//! - `**Heading**` (the whole line, at least four characters)
//! - `* item` or `- item`
//! - blank line: line break
//! - anything else: paragraph

use std::fmt::Write;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Block {
    Heading(String),
    ListItem(String),
    Break,
    Paragraph(String),
}

#[must_use]
pub fn parse_blocks(text: &str) -> Vec<Block> {
    text.lines().map(parse_line).collect()
}

fn parse_line(line: &str) -> Block {
    if line.len() >= 4 && line.starts_with("**") && line.ends_with("**") {
        return Block::Heading(line[2..line.len() - 2].to_owned());
    }
    if let Some(item) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
        return Block::ListItem(item.to_owned());
    }
    if line.trim().is_empty() {
        return Block::Break;
    }
    Block::Paragraph(line.to_owned())
}

/// Render blocks as an HTML fragment. Text is escaped; consecutive list
/// items share one `<ul>`.
#[must_use]
pub fn to_html(blocks: &[Block]) -> String {
    let mut html = String::new();
    let mut in_list = false;
    for block in blocks {
        let is_item = matches!(block, Block::ListItem(_));
        if in_list && !is_item {
            html.push_str("</ul>\n");
        }
        if is_item && !in_list {
            html.push_str("<ul>\n");
        }
        in_list = is_item;

        let _ = match block {
            Block::Heading(t) => writeln!(html, "<h3>{}</h3>", escape(t)),
            Block::ListItem(t) => writeln!(html, "<li>{}</li>", escape(t)),
            Block::Break => writeln!(html, "<br>"),
            Block::Paragraph(t) => writeln!(html, "<p>{}</p>", escape(t)),
        };
    }
    if in_list {
        html.push_str("</ul>\n");
    }
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
