//! Whitespace handling of element content.

use std::borrow::Cow;

use crate::dom::{Node, NodeRef, NodeType, character_data::CharacterData};

/// One item of element content after adjacent text nodes are merged.
#[derive(Clone)]
pub enum Content {
    Text(String),
    Node(NodeRef),
}

/// Coalesce consecutive text nodes into single text values.
///
/// Other nodes, CDATA sections included, pass through in their original order.
pub fn merge_adjacent_text(children: impl IntoIterator<Item = NodeRef>) -> Vec<Content> {
    let mut merged: Vec<Content> = vec![];
    for child in children {
        let text = match child {
            NodeRef::Text(text) => text,
            other => {
                merged.push(Content::Node(other));
                continue;
            }
        };
        if let Some(Content::Text(prev)) = merged.last_mut() {
            text.with_data(|data| prev.push_str(data));
        } else {
            merged.push(Content::Text(text.data()));
        }
    }
    merged
}

/// Replace every maximal run of characters matching `is_run` with one `normalized`.
///
/// A lone run character that is not `normalized` is replaced as well.
/// With `trim_start`/`trim_end`, a leading/trailing run is removed instead.
/// If nothing changes, `text` is returned without allocation.
pub fn collapse_runs<'a>(
    text: &'a str,
    is_run: impl Fn(char) -> bool,
    normalized: char,
    trim_start: bool,
    trim_end: bool,
) -> Cow<'a, str> {
    if !needs_collapse(text, &is_run, normalized, trim_start, trim_end) {
        return Cow::Borrowed(text);
    }

    let mut res = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if is_run(c) {
            in_run = true;
            continue;
        }
        if in_run && !(trim_start && res.is_empty()) {
            res.push(normalized);
        }
        in_run = false;
        res.push(c);
    }
    if in_run && !trim_end && !(trim_start && res.is_empty()) {
        res.push(normalized);
    }
    Cow::Owned(res)
}

fn needs_collapse(
    text: &str,
    is_run: &impl Fn(char) -> bool,
    normalized: char,
    trim_start: bool,
    trim_end: bool,
) -> bool {
    if trim_start && text.starts_with(|c: char| is_run(c)) {
        return true;
    }
    if trim_end && text.ends_with(|c: char| is_run(c)) {
        return true;
    }
    let mut prev_in_run = false;
    for c in text.chars() {
        let in_run = is_run(c);
        if in_run && (prev_in_run || c != normalized) {
            return true;
        }
        prev_in_run = in_run;
    }
    false
}

/// Replace every line ending (`\r\n`, `\r` or `\n`) with `separator`.
pub fn normalize_line_endings<'a>(text: &'a str, separator: &str) -> Cow<'a, str> {
    if !text.contains('\r') && (separator == "\n" || !text.contains('\n')) {
        return Cow::Borrowed(text);
    }
    let mut res = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                res.push_str(separator);
            }
            '\n' => res.push_str(separator),
            c => res.push(c),
        }
    }
    Cow::Owned(res)
}

/// Trim decision of a text item at `index` of merged content.
///
/// Trim the start if the text is the first item of a block container or follows
/// a block or break element. Trim the end if it is the last item of a block container
/// or precedes a block element.
pub fn trim_decision(
    content: &[Content],
    index: usize,
    parent_is_block: bool,
    is_block: impl Fn(&NodeRef) -> bool,
    is_break: impl Fn(&NodeRef) -> bool,
) -> (bool, bool) {
    let trim_start = match index.checked_sub(1).and_then(|prev| content.get(prev)) {
        None => parent_is_block,
        Some(Content::Node(prev)) => {
            prev.node_type() == NodeType::Element && (is_block(prev) || is_break(prev))
        }
        Some(Content::Text(_)) => false,
    };
    let trim_end = match content.get(index + 1) {
        None => parent_is_block,
        Some(Content::Node(next)) => {
            next.node_type() == NodeType::Element && is_block(next)
        }
        Some(Content::Text(_)) => false,
    };
    (trim_start, trim_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DocumentRef;

    fn space(c: char) -> bool {
        matches!(c, ' ' | '\t' | '\n' | '\r')
    }

    #[test]
    fn collapse_interior_runs() {
        assert_eq!(collapse_runs("hello   world", space, ' ', false, false), "hello world");
        assert_eq!(collapse_runs("a\tb", space, ' ', false, false), "a b");
        assert_eq!(collapse_runs("  a  ", space, ' ', false, false), " a ");
        assert_eq!(collapse_runs("  a  ", space, ' ', true, false), "a ");
        assert_eq!(collapse_runs("  a  ", space, ' ', false, true), " a");
        assert_eq!(collapse_runs("  hello   world  ", space, ' ', true, true), "hello world");
    }

    #[test]
    fn collapse_only_runs() {
        assert_eq!(collapse_runs(" \n\t ", space, ' ', true, true), "");
        assert_eq!(collapse_runs(" \n\t ", space, ' ', false, false), " ");
        assert_eq!(collapse_runs(" \n\t ", space, ' ', true, false), "");
        assert_eq!(collapse_runs("", space, ' ', true, true), "");
    }

    #[test]
    fn collapse_without_change_borrows() {
        let text = "already normal text";
        assert!(matches!(
            collapse_runs(text, space, ' ', false, false),
            Cow::Borrowed(_)
        ));
        assert!(matches!(
            collapse_runs("a\nb", space, ' ', false, false),
            Cow::Owned(_)
        ));
    }

    #[test]
    fn collapse_result_has_no_long_runs() {
        for text in ["a  b\t\tc", "\n\n\nx", "x\r\n", "  ", "a b c", " \u{A0} "] {
            let res = collapse_runs(text, space, ' ', false, false);
            let chars = res.chars().collect::<Vec<_>>();
            assert!(chars.windows(2).all(|w| !(space(w[0]) && space(w[1]))));
            assert!(chars.iter().filter(|c| space(**c)).all(|c| *c == ' '));
        }
    }

    #[test]
    fn line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\nd", "\n"), "a\nb\nc\nd");
        assert_eq!(normalize_line_endings("a\nb", "\r\n"), "a\r\nb");
        assert!(matches!(normalize_line_endings("a\nb", "\n"), Cow::Borrowed(_)));
    }

    #[test]
    fn merge_text_nodes() {
        let doc = DocumentRef::new();
        let children: Vec<NodeRef> = vec![
            doc.create_text_node("a").into(),
            doc.create_text_node("b").into(),
            doc.create_comment("c").into(),
            doc.create_cdata_section("d").into(),
            doc.create_text_node("e").into(),
        ];
        let merged = merge_adjacent_text(children);
        assert_eq!(merged.len(), 4);
        assert!(matches!(&merged[0], Content::Text(text) if text == "ab"));
        assert!(matches!(&merged[1], Content::Node(NodeRef::Comment(_))));
        assert!(matches!(&merged[2], Content::Node(NodeRef::CDATASection(_))));
        assert!(matches!(&merged[3], Content::Text(text) if text == "e"));
    }

    #[test]
    fn structural_trim() {
        let doc = DocumentRef::new();
        let block = doc.create_element("div").unwrap();
        let inline = doc.create_element("span").unwrap();
        let content = vec![
            Content::Text(" a ".into()),
            Content::Node(block.into()),
            Content::Text(" b ".into()),
            Content::Node(inline.into()),
            Content::Text(" c ".into()),
        ];
        let is_block = |node: &NodeRef| node.node_name().as_ref() == "div";
        let is_break = |_: &NodeRef| false;
        assert_eq!(trim_decision(&content, 0, false, is_block, is_break), (false, true));
        assert_eq!(trim_decision(&content, 2, false, is_block, is_break), (true, false));
        assert_eq!(trim_decision(&content, 4, false, is_block, is_break), (false, false));
        assert_eq!(trim_decision(&content, 4, true, is_block, is_break), (false, true));
    }
}
