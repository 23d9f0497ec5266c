//! BBCode renderer.
//!
//! Turns a parsed [`Node`] tree into HTML or plain text. All text is escaped
//! here; the only markup in the output is what the renderer generates itself.

use url::Url;

use super::escape_html;
use super::parser::{Node, Tag};

/// Render nodes as HTML.
pub fn render_html(nodes: &[Node], out: &mut String) {
    for node in nodes {
        render_node(node, out);
    }
}

/// Render nodes as plain text.
pub fn render_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) | Node::Code(text) => out.push_str(text),
            Node::ListItem => out.push('\n'),
            Node::Element {
                tag: Tag::Img, ..
            } => {}
            Node::Element { children, .. } => render_text(children, out),
        }
    }
}

fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => push_text(text, out),
        Node::Code(code) => {
            out.push_str("<pre><code>");
            out.push_str(&escape_html(code));
            out.push_str("</code></pre>");
        }
        Node::ListItem => out.push_str("[*]"),
        Node::Element {
            tag,
            children,
            open,
            close,
        } => {
            if !render_element(tag, children, out) {
                push_text(open, out);
                render_html(children, out);
                push_text(close, out);
            }
        }
    }
}

/// Render one element. Returns false if it must be shown as literal text.
fn render_element(tag: &Tag, children: &[Node], out: &mut String) -> bool {
    let simple = match tag {
        Tag::Bold => Some("strong"),
        Tag::Italic => Some("em"),
        Tag::Underline => Some("u"),
        Tag::Strike => Some("del"),
        _ => None,
    };
    if let Some(element) = simple {
        out.push('<');
        out.push_str(element);
        out.push('>');
        render_html(children, out);
        out.push_str("</");
        out.push_str(element);
        out.push('>');
        return true;
    }

    match tag {
        Tag::Url(None) => {
            let Some(target) = plain_text(children).and_then(|t| safe_url(t, true)) else {
                return false;
            };
            out.push_str(&format!(
                "<a href=\"{}\" rel=\"nofollow noopener\">{}</a>",
                escape_html(&target),
                escape_html(plain_text(children).unwrap_or_default().trim())
            ));
        }
        Tag::Url(Some(target)) => {
            let Some(target) = safe_url(target, true) else {
                return false;
            };
            out.push_str(&format!(
                "<a href=\"{}\" rel=\"nofollow noopener\">",
                escape_html(&target)
            ));
            render_html(children, out);
            out.push_str("</a>");
        }
        Tag::Img => {
            let Some(src) = plain_text(children).and_then(|t| safe_url(t, false)) else {
                return false;
            };
            out.push_str(&format!("<img src=\"{}\" alt=\"\">", escape_html(&src)));
        }
        Tag::Quote(author) => {
            out.push_str("<blockquote>");
            if let Some(author) = author {
                out.push_str(&format!("<cite>{}</cite>", escape_html(author)));
            }
            render_block(children, out);
            out.push_str("</blockquote>");
        }
        Tag::Color(color) => {
            out.push_str(&format!("<span style=\"color:{}\">", escape_html(color)));
            render_html(children, out);
            out.push_str("</span>");
        }
        Tag::Size(size) => {
            out.push_str(&format!("<span class=\"bb-size-{size}\">"));
            render_html(children, out);
            out.push_str("</span>");
        }
        Tag::List => render_list(children, out),
        Tag::Spoiler => {
            out.push_str("<details><summary>Spoiler</summary>");
            render_block(children, out);
            out.push_str("</details>");
        }
        Tag::Bold | Tag::Italic | Tag::Underline | Tag::Strike => return false,
    }
    true
}

fn render_list(children: &[Node], out: &mut String) {
    out.push_str("<ul>");
    let mut items: Vec<&[Node]> = Vec::new();
    let mut start = 0;
    for (i, node) in children.iter().enumerate() {
        if matches!(node, Node::ListItem) {
            items.push(&children[start..i]);
            start = i + 1;
        }
    }
    items.push(&children[start..]);

    for (i, item) in items.into_iter().enumerate() {
        let blank = item
            .iter()
            .all(|n| matches!(n, Node::Text(t) if t.trim().is_empty()));
        // Whitespace before the first [*] is layout, not an item.
        if i == 0 && blank {
            continue;
        }
        out.push_str("<li>");
        render_block(item, out);
        out.push_str("</li>");
    }
    out.push_str("</ul>");
}

/// Render block content, dropping the newlines right inside the block edges.
fn render_block(children: &[Node], out: &mut String) {
    let last = children.len().saturating_sub(1);
    for (i, node) in children.iter().enumerate() {
        match node {
            Node::Text(text) => {
                let mut text = text.as_str();
                if i == 0 {
                    text = text.trim_start_matches(['\r', '\n']);
                }
                if i == last {
                    text = text.trim_end_matches(['\r', '\n']);
                }
                push_text(text, out);
            }
            other => render_node(other, out),
        }
    }
}

/// The text of a node list that contains nothing but text.
fn plain_text(children: &[Node]) -> Option<&str> {
    match children {
        [Node::Text(text)] => Some(text.as_str()),
        _ => None,
    }
}

/// Escape text and turn newlines into `<br>`.
fn push_text(text: &str, out: &mut String) {
    let mut lines = text.split('\n').peekable();
    while let Some(line) = lines.next() {
        out.push_str(&escape_html(line.strip_suffix('\r').unwrap_or(line)));
        if lines.peek().is_some() {
            out.push_str("<br>");
        }
    }
}

/// Accept only http, https and (for links) mailto URLs.
fn safe_url(raw: &str, allow_mailto: bool) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        "mailto" if allow_mailto => Some(url.to_string()),
        _ => None,
    }
}
