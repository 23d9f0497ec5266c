//! BBCode parser.
//!
//! Parses BBCode into a tree of [`Node`]s. The parser never fails: tags that
//! are unknown, malformed or left unclosed come back as plain text.

/// Longest tag (including brackets and argument) the parser will consider.
const MAX_TAG_LEN: usize = 256;

/// Deepest element nesting. Opening tags beyond it are kept as text, which
/// bounds the depth of every tree the parser returns.
pub const MAX_DEPTH: usize = 32;

/// A recognised BBCode tag with its validated argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Bold,
    Italic,
    Underline,
    Strike,
    /// `[url]` or `[url=target]`. The target is validated when rendering.
    Url(Option<String>),
    Img,
    /// `[quote]` or `[quote=name]`.
    Quote(Option<String>),
    /// A `#rgb`, `#rrggbb` or alphabetic colour name.
    Color(String),
    /// Font size step, 1 through 7.
    Size(u8),
    List,
    Spoiler,
}

impl Tag {
    /// Name used in the closing tag.
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Bold => "b",
            Tag::Italic => "i",
            Tag::Underline => "u",
            Tag::Strike => "s",
            Tag::Url(_) => "url",
            Tag::Img => "img",
            Tag::Quote(_) => "quote",
            Tag::Color(_) => "color",
            Tag::Size(_) => "size",
            Tag::List => "list",
            Tag::Spoiler => "spoiler",
        }
    }

    fn from_parts(name: &str, arg: Option<&str>) -> Option<Self> {
        let arg = arg.map(unquote);
        match (name, arg) {
            ("b", None) => Some(Tag::Bold),
            ("i", None) => Some(Tag::Italic),
            ("u", None) => Some(Tag::Underline),
            ("s", None) => Some(Tag::Strike),
            ("img", None) => Some(Tag::Img),
            ("list", None) => Some(Tag::List),
            ("spoiler", None) => Some(Tag::Spoiler),
            ("url", None) => Some(Tag::Url(None)),
            ("url", Some(target)) if !target.is_empty() => Some(Tag::Url(Some(target.to_string()))),
            ("quote", None) => Some(Tag::Quote(None)),
            ("quote", Some(author)) if !author.is_empty() => {
                Some(Tag::Quote(Some(author.to_string())))
            }
            ("color", Some(color)) if is_valid_color(color) => Some(Tag::Color(color.to_string())),
            ("size", Some(size)) => match size.parse::<u8>() {
                Ok(n @ 1..=7) => Some(Tag::Size(n)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A node in the BBCode tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, not yet escaped.
    Text(String),
    /// Contents of a `[code]` block, taken verbatim.
    Code(String),
    /// A `[*]` list item marker.
    ListItem,
    /// A matched tag pair.
    Element {
        tag: Tag,
        children: Vec<Node>,
        /// Source text of the opening tag, used when the element is rendered literally.
        open: String,
        /// Source text of the closing tag.
        close: String,
    },
}

enum Lexed<'a> {
    Open { tag: Tag, raw: &'a str },
    Code { raw: &'a str },
    Item,
    Close { name: String, raw: &'a str },
}

struct Frame {
    tag: Option<Tag>,
    open: String,
    children: Vec<Node>,
}

impl Frame {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    fn push_node(&mut self, node: Node) {
        match node {
            Node::Text(text) => self.push_text(&text),
            other => self.children.push(other),
        }
    }

    /// Put an unclosed frame back into its parent as literal text.
    fn flatten_into(self, parent: &mut Frame) {
        parent.push_text(&self.open);
        for child in self.children {
            parent.push_node(child);
        }
    }
}

/// BBCode parser.
pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse the input into a list of nodes.
    pub fn parse(mut self) -> Vec<Node> {
        let mut stack = vec![Frame {
            tag: None,
            open: String::new(),
            children: Vec::new(),
        }];

        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];

            if !rest.starts_with('[') {
                let end = rest.find('[').unwrap_or(rest.len());
                top(&mut stack).push_text(&rest[..end]);
                self.pos += end;
                continue;
            }

            let Some((lexed, consumed)) = lex_tag(rest) else {
                top(&mut stack).push_text("[");
                self.pos += 1;
                continue;
            };

            match lexed {
                Lexed::Code { raw } => {
                    let body = &rest[consumed..];
                    match body.to_ascii_lowercase().find("[/code]") {
                        Some(end) => {
                            let code = body[..end].strip_prefix('\n').unwrap_or(&body[..end]);
                            top(&mut stack).push_node(Node::Code(code.to_string()));
                            self.pos += consumed + end + "[/code]".len();
                        }
                        None => {
                            top(&mut stack).push_text(raw);
                            self.pos += consumed;
                        }
                    }
                    continue;
                }
                Lexed::Item => top(&mut stack).push_node(Node::ListItem),
                // The root frame is not an element.
                Lexed::Open { raw, .. } if stack.len() > MAX_DEPTH => {
                    top(&mut stack).push_text(raw)
                }
                Lexed::Open { tag, raw } => stack.push(Frame {
                    tag: Some(tag),
                    open: raw.to_string(),
                    children: Vec::new(),
                }),
                Lexed::Close { name, raw } => {
                    let matched = stack
                        .iter()
                        .rposition(|f| f.tag.as_ref().is_some_and(|t| t.name() == name));
                    match matched {
                        Some(idx) => {
                            while stack.len() > idx + 1 {
                                if let Some(frame) = stack.pop() {
                                    frame.flatten_into(top(&mut stack));
                                }
                            }
                            if let Some(Frame {
                                tag: Some(tag),
                                open,
                                children,
                            }) = stack.pop()
                            {
                                top(&mut stack).push_node(Node::Element {
                                    tag,
                                    children,
                                    open,
                                    close: raw.to_string(),
                                });
                            }
                        }
                        None => top(&mut stack).push_text(raw),
                    }
                }
            }
            self.pos += consumed;
        }

        while stack.len() > 1 {
            if let Some(frame) = stack.pop() {
                frame.flatten_into(top(&mut stack));
            }
        }
        stack.pop().map(|root| root.children).unwrap_or_default()
    }
}

/// The innermost open frame. The root frame is never popped while parsing.
fn top(stack: &mut Vec<Frame>) -> &mut Frame {
    if stack.is_empty() {
        stack.push(Frame {
            tag: None,
            open: String::new(),
            children: Vec::new(),
        });
    }
    let last = stack.len() - 1;
    &mut stack[last]
}

/// Lex a tag at the start of `rest`, which begins with `[`.
fn lex_tag(rest: &str) -> Option<(Lexed<'_>, usize)> {
    let end = rest[1..].find(|c: char| matches!(c, ']' | '[' | '\n'))? + 1;
    if rest.as_bytes()[end] != b']' || end + 1 > MAX_TAG_LEN {
        return None;
    }
    let raw = &rest[..=end];
    let inner = &rest[1..end];

    if let Some(name) = inner.strip_prefix('/') {
        let name = name.trim().to_ascii_lowercase();
        let known =
            Tag::from_parts(&name, None).is_some() || matches!(name.as_str(), "color" | "size");
        return known.then_some((Lexed::Close { name, raw }, end + 1));
    }

    let (name, arg) = match inner.split_once('=') {
        Some((name, arg)) => (name, Some(arg)),
        None => (inner, None),
    };
    let name = name.trim().to_ascii_lowercase();

    let lexed = match (name.as_str(), arg) {
        ("code", None) => Lexed::Code { raw },
        ("*", None) => Lexed::Item,
        _ => Lexed::Open {
            tag: Tag::from_parts(&name, arg)?,
            raw,
        },
    };
    Some((lexed, end + 1))
}

fn unquote(arg: &str) -> &str {
    let arg = arg.trim();
    arg.strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .unwrap_or(arg)
}

fn is_valid_color(color: &str) -> bool {
    if let Some(hex) = color.strip_prefix('#') {
        return matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    !color.is_empty() && color.len() <= 20 && color.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(Parser::new("hello").parse(), vec![text("hello")]);
        assert!(Parser::new("").parse().is_empty());
    }

    #[test]
    fn test_simple_element() {
        let nodes = Parser::new("a [B]bold[/b] z").parse();
        assert_eq!(nodes.len(), 3);
        match &nodes[1] {
            Node::Element {
                tag, children, open, ..
            } => {
                assert_eq!(*tag, Tag::Bold);
                assert_eq!(children, &vec![text("bold")]);
                assert_eq!(open, "[B]");
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_unknown_and_unclosed_tags_are_text() {
        assert_eq!(Parser::new("[foo]x[/foo]").parse(), vec![text("[foo]x[/foo]")]);
        assert_eq!(Parser::new("[b]open").parse(), vec![text("[b]open")]);
        assert_eq!(Parser::new("close[/i]").parse(), vec![text("close[/i]")]);
        assert_eq!(Parser::new("[ not a tag").parse(), vec![text("[ not a tag")]);
    }

    #[test]
    fn test_misnested_tags() {
        // The inner [i] is never closed, so it falls back to text inside [b].
        let nodes = Parser::new("[b]x[i]y[/b]").parse();
        match &nodes[0] {
            Node::Element { tag, children, .. } => {
                assert_eq!(*tag, Tag::Bold);
                assert_eq!(children, &vec![text("x[i]y")]);
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_code_is_verbatim() {
        let nodes = Parser::new("[code]\n[b]x[/b][/CODE]").parse();
        assert_eq!(nodes, vec![Node::Code("[b]x[/b]".to_string())]);
        assert_eq!(Parser::new("[code]x").parse(), vec![text("[code]x")]);
    }

    #[test]
    fn test_tag_arguments() {
        let nodes = Parser::new("[quote=\"bob\"]hi[/quote]").parse();
        assert!(matches!(&nodes[0], Node::Element { tag: Tag::Quote(Some(name)), .. } if name == "bob"));

        let nodes = Parser::new("[size=9]big[/size]").parse();
        assert_eq!(nodes, vec![text("[size=9]big[/size]")]);

        let nodes = Parser::new("[color=#f00]r[/color]").parse();
        assert!(matches!(&nodes[0], Node::Element { tag: Tag::Color(c), .. } if c == "#f00"));

        let nodes = Parser::new("[color=red;x]r[/color]").parse();
        assert_eq!(nodes, vec![text("[color=red;x]r[/color]")]);
    }

    #[test]
    fn test_list_items() {
        let nodes = Parser::new("[list][*]a[*]b[/list]").parse();
        match &nodes[0] {
            Node::Element { tag, children, .. } => {
                assert_eq!(*tag, Tag::List);
                assert_eq!(
                    children,
                    &vec![Node::ListItem, text("a"), Node::ListItem, text("b")]
                );
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    fn depth(nodes: &[Node]) -> usize {
        nodes
            .iter()
            .map(|node| match node {
                Node::Element { children, .. } => 1 + depth(children),
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        let nodes = Parser::new(&"[b]".repeat(MAX_DEPTH)).parse();
        assert_eq!(nodes, vec![text(&"[b]".repeat(MAX_DEPTH))]);

        let exact = format!("{}x{}", "[i]".repeat(MAX_DEPTH), "[/i]".repeat(MAX_DEPTH));
        assert_eq!(depth(&Parser::new(&exact).parse()), MAX_DEPTH);

        let n = 10_000;
        let deep = format!("{}x{}", "[b]".repeat(n), "[/b]".repeat(n));
        assert!(depth(&Parser::new(&deep).parse()) <= MAX_DEPTH);
    }

    #[test]
    fn test_valid_colors() {
        assert!(is_valid_color("#abc"));
        assert!(is_valid_color("#A0B1C2"));
        assert!(is_valid_color("red"));
        assert!(!is_valid_color("#abcd"));
        assert!(!is_valid_color("red blue"));
        assert!(!is_valid_color("expression(x)"));
    }
}
