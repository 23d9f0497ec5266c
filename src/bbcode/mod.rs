//! BBCode markup for Agora posts.
//!
//! Post bodies are stored as BBCode and rendered once, on write, to safe HTML.
//!
//! # Example
//!
//! ```
//! use agora::bbcode;
//!
//! let html = bbcode::render("[b]hi[/b] <there>");
//! assert_eq!(html, "<strong>hi</strong> &lt;there&gt;");
//! ```

mod parser;
mod renderer;

pub use parser::{Node, Parser, Tag, MAX_DEPTH};

/// Render BBCode to HTML.
///
/// Unknown, unmatched or unsafe tags are kept as literal (escaped) text.
pub fn render(input: &str) -> String {
    let nodes = Parser::new(input).parse();
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    renderer::render_html(&nodes, &mut out);
    out
}

/// Strip BBCode, returning the plain text.
pub fn strip(input: &str) -> String {
    let nodes = Parser::new(input).parse();
    let mut out = String::with_capacity(input.len());
    renderer::render_text(&nodes, &mut out);
    out
}

/// A single-line plain-text excerpt of at most `max_chars` characters.
pub fn excerpt(input: &str, max_chars: usize) -> String {
    let text = strip(input);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Escape the HTML special characters `& < > " '`.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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
