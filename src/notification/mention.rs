//! `@username` mention extraction.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::bbcode::{Node, Parser};

/// Most mentions taken from one post.
pub const MAX_MENTIONS: usize = 20;

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_])@([A-Za-z0-9_]{3,20})\b").expect("mention pattern is valid")
});

/// Extract mentioned usernames from a BBCode body.
///
/// Mentions inside `[code]` blocks are ignored. Names are deduplicated
/// case-insensitively, keep first-seen order and are capped at
/// [`MAX_MENTIONS`].
///
/// # Examples
///
/// ```
/// use agora::notification::extract_mentions;
///
/// let names = extract_mentions("hi @Alice and @bob, also @alice. mail me@example.com");
/// assert_eq!(names, vec!["Alice", "bob"]);
/// ```
pub fn extract_mentions(body: &str) -> Vec<String> {
    let mut texts = Vec::new();
    collect_text(&Parser::new(body).parse(), &mut texts);

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for text in texts {
        for caps in MENTION_RE.captures_iter(&text) {
            let Some(name) = caps.get(1) else { continue };
            if seen.insert(name.as_str().to_lowercase()) {
                names.push(name.as_str().to_string());
                if names.len() == MAX_MENTIONS {
                    return names;
                }
            }
        }
    }
    names
}

fn collect_text(nodes: &[Node], out: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push(text.clone()),
            Node::Element { children, .. } => collect_text(children, out),
            Node::Code(_) | Node::ListItem => {}
        }
    }
}
