//! Helpers that turn the API's HTML summaries and instructions into plain text.

use scraper::{Html, Node};

const BLOCK_ELEMENTS: &[&str] = &[
    "br", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ol", "p", "tr", "ul",
];

/// Strip markup, decode entities and collapse whitespace.
///
/// Block elements are separated by a space so list items do not run together.
pub fn clean_html_tags(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());

    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => text.push(' '),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split prose into steps after `.`, `?` or `!` when whitespace and an
/// ASCII uppercase letter follow. Empty pieces are dropped.
pub fn split_into_steps(text: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '?' | '!') {
            continue;
        }
        let end = i + c.len_utf8();

        let mut saw_space = false;
        while let Some(&(_, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            saw_space = true;
            chars.next();
        }

        if let Some(&(next_start, next)) = chars.peek() {
            if saw_space && next.is_ascii_uppercase() {
                push_step(&mut steps, &text[start..end]);
                start = next_start;
            }
        }
    }

    push_step(&mut steps, &text[start..]);
    steps
}

fn push_step(steps: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        steps.push(piece.to_string());
    }
}
