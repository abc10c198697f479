//! Element classification used by the pretty-printer.
//!
//! A [`FormatProfile`] answers, per element name, whether the element is a
//! *block*, a *break*, a *flush* container or *preserved* content, and in which order
//! its attributes are preferred.

use std::collections::HashMap;

/// The namespace of XHTML elements.
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Namespace-qualified element name passed to profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementName<'a> {
    pub namespace_uri: Option<&'a str>,
    pub local_name: &'a str,
}

impl<'a> ElementName<'a> {
    pub fn new(namespace_uri: Option<&'a str>, local_name: &'a str) -> Self {
        Self {
            namespace_uri,
            local_name,
        }
    }
}

/// Per-element formatting classification.
///
/// Profiles must be deterministic: the serializer may ask the same question more than once.
pub trait FormatProfile {
    /// The element starts on its own line and is followed by a line break.
    fn is_block(&self, name: &ElementName<'_>) -> bool;

    /// The element is followed by a line break but is not indented.
    fn is_break(&self, name: &ElementName<'_>) -> bool {
        let _ = name;
        false
    }

    /// Formatted children of the element are not indented an extra level.
    fn is_flush(&self, name: &ElementName<'_>) -> bool {
        let _ = name;
        false
    }

    /// The content of the element is written verbatim, including all descendants.
    fn is_preserved(&self, name: &ElementName<'_>) -> bool {
        let _ = name;
        false
    }

    /// Position of `attribute` (a qualified name) in the preferred attribute order
    /// of the element, if it is listed.
    fn attribute_rank(&self, name: &ElementName<'_>, attribute: &str) -> Option<usize> {
        let _ = (name, attribute);
        None
    }

    /// Characters collapsed into a single space by whitespace normalization.
    fn is_space(&self, c: char) -> bool {
        matches!(c, ' ' | '\t' | '\n' | '\r')
    }
}

/// Profile that treats every element as a block.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProfile;

impl FormatProfile for DefaultProfile {
    fn is_block(&self, _: &ElementName<'_>) -> bool {
        true
    }
}

const BLOCK: u8 = 1 << 0;
const BREAK: u8 = 1 << 1;
const FLUSH: u8 = 1 << 2;
const PRESERVED: u8 = 1 << 3;

/// Profile driven by tables keyed by element name.
///
/// Names registered without namespace match elements without namespace only.
#[derive(Debug, Clone, Default)]
pub struct TableProfile {
    flags: HashMap<(Option<String>, String), u8>,
    attribute_orders: HashMap<(Option<String>, String), Vec<String>>,
    default_block: bool,
}

impl TableProfile {
    /// Create a profile in which no element is classified.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify unregistered elements as blocks.
    #[must_use]
    pub fn with_default_block(mut self, block: bool) -> Self {
        self.default_block = block;
        self
    }

    fn insert(mut self, namespace_uri: Option<&str>, names: &[&str], flag: u8) -> Self {
        for name in names {
            *self
                .flags
                .entry((namespace_uri.map(str::to_owned), (*name).to_owned()))
                .or_default() |= flag;
        }
        self
    }

    #[must_use]
    pub fn with_blocks(self, namespace_uri: Option<&str>, names: &[&str]) -> Self {
        self.insert(namespace_uri, names, BLOCK)
    }

    #[must_use]
    pub fn with_breaks(self, namespace_uri: Option<&str>, names: &[&str]) -> Self {
        self.insert(namespace_uri, names, BREAK)
    }

    #[must_use]
    pub fn with_flushes(self, namespace_uri: Option<&str>, names: &[&str]) -> Self {
        self.insert(namespace_uri, names, FLUSH)
    }

    #[must_use]
    pub fn with_preserved(self, namespace_uri: Option<&str>, names: &[&str]) -> Self {
        self.insert(namespace_uri, names, PRESERVED)
    }

    /// Set the preferred order of attributes of an element.
    #[must_use]
    pub fn with_attribute_order(
        mut self,
        namespace_uri: Option<&str>,
        name: &str,
        attributes: &[&str],
    ) -> Self {
        self.attribute_orders.insert(
            (namespace_uri.map(str::to_owned), name.to_owned()),
            attributes.iter().map(|attr| (*attr).to_owned()).collect(),
        );
        self
    }

    /// Profile for XHTML, registered both in the XHTML namespace and without namespace.
    pub fn xhtml() -> Self {
        const BLOCKS: &[&str] = &[
            "html", "head", "body", "title", "meta", "link", "script", "style", "div", "p",
            "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "dl", "dt", "dd", "table",
            "thead", "tbody", "tfoot", "tr", "th", "td", "caption", "form", "fieldset", "pre",
            "blockquote", "hr", "address", "section", "article", "nav", "header", "footer",
            "aside", "main", "figure", "noscript",
        ];
        const BREAKS: &[&str] = &["br"];
        const FLUSHES: &[&str] = &["html", "body"];
        const PRESERVES: &[&str] = &["pre", "script", "style", "textarea"];
        const ORDERS: &[(&str, &[&str])] = &[
            ("a", &["href", "name", "title"]),
            ("img", &["src", "alt", "width", "height"]),
            ("link", &["rel", "type", "href"]),
            ("meta", &["name", "http-equiv", "content"]),
            ("script", &["type", "src"]),
            ("input", &["type", "name", "value"]),
        ];

        let mut profile = Self::new();
        for ns in [Some(XHTML_NAMESPACE), None] {
            profile = profile
                .with_blocks(ns, BLOCKS)
                .with_breaks(ns, BREAKS)
                .with_flushes(ns, FLUSHES)
                .with_preserved(ns, PRESERVES);
            for (name, order) in ORDERS {
                profile = profile.with_attribute_order(ns, name, order);
            }
        }
        profile
    }

    fn lookup(&self, name: &ElementName<'_>) -> Option<u8> {
        self.flags
            .get(&(
                name.namespace_uri.map(str::to_owned),
                name.local_name.to_owned(),
            ))
            .copied()
    }

    fn has(&self, name: &ElementName<'_>, flag: u8) -> bool {
        self.lookup(name).is_some_and(|flags| flags & flag != 0)
    }
}

impl FormatProfile for TableProfile {
    fn is_block(&self, name: &ElementName<'_>) -> bool {
        match self.lookup(name) {
            Some(flags) => flags & BLOCK != 0,
            None => self.default_block,
        }
    }

    fn is_break(&self, name: &ElementName<'_>) -> bool {
        self.has(name, BREAK)
    }

    fn is_flush(&self, name: &ElementName<'_>) -> bool {
        self.has(name, FLUSH)
    }

    fn is_preserved(&self, name: &ElementName<'_>) -> bool {
        self.has(name, PRESERVED)
    }

    fn attribute_rank(&self, name: &ElementName<'_>, attribute: &str) -> Option<usize> {
        self.attribute_orders
            .get(&(
                name.namespace_uri.map(str::to_owned),
                name.local_name.to_owned(),
            ))?
            .iter()
            .position(|attr| attr == attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_blocks_everything() {
        let name = ElementName::new(None, "anything");
        assert!(DefaultProfile.is_block(&name));
        assert!(!DefaultProfile.is_break(&name));
        assert!(!DefaultProfile.is_preserved(&name));
        assert!(DefaultProfile.is_space('\t'));
        assert!(!DefaultProfile.is_space('\u{A0}'));
    }

    #[test]
    fn xhtml_classification() {
        let profile = TableProfile::xhtml();
        let p = ElementName::new(Some(XHTML_NAMESPACE), "p");
        let br = ElementName::new(None, "br");
        let pre = ElementName::new(Some(XHTML_NAMESPACE), "pre");
        let span = ElementName::new(Some(XHTML_NAMESPACE), "span");
        let foreign = ElementName::new(Some("urn:other"), "p");

        assert!(profile.is_block(&p));
        assert!(profile.is_break(&br) && !profile.is_block(&br));
        assert!(profile.is_preserved(&pre) && profile.is_block(&pre));
        assert!(!profile.is_block(&span));
        assert!(!profile.is_block(&foreign));
        assert!(profile.is_flush(&ElementName::new(None, "body")));

        let img = ElementName::new(None, "img");
        assert_eq!(profile.attribute_rank(&img, "alt"), Some(1));
        assert_eq!(profile.attribute_rank(&img, "class"), None);
    }

    #[test]
    fn default_block_fallback() {
        let profile = TableProfile::new()
            .with_default_block(true)
            .with_breaks(None, &["br"]);
        assert!(profile.is_block(&ElementName::new(None, "x")));
        // registered elements use their own flags
        assert!(!profile.is_block(&ElementName::new(None, "br")));
    }
}
