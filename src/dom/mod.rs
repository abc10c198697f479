//! A small [Document Object Model](https://www.w3.org/TR/DOM-Level-3-Core/) for the serializer.
//!
//! The node taxonomy is limited to what the serializer consumes: `Document`, `Element`,
//! `Attr`, `Text`, `CDATASection`, `Comment`, `ProcessingInstruction` and `DocumentType`.
//!
//! Every node is a handle wrapping `Rc<RefCell<..>>`. Children are owned by their parent,
//! parents and owner documents are referred to weakly.
//!
//! # Note
//! - Iterators that walk through the nodes are not provided.\
//!   Every handle can modify the whole tree, so callers take snapshots with
//!   [`Node::child_nodes`] instead.

use std::fmt::Display;

pub mod attr;
pub mod character_data;
pub mod document;
pub mod document_type;
pub mod element;
pub mod entity;
pub mod node;
pub mod pi;

pub use attr::AttrRef;
pub use character_data::{CDATASectionRef, CommentRef, TextRef};
pub use document::DocumentRef;
pub use document_type::DocumentTypeRef;
pub use element::ElementRef;
pub use entity::EntityDecl;
pub use node::{Node, NodeRef};
pub use pi::ProcessingInstructionRef;

/// This is the namespace for the special xml: prefix predefined in the
/// XML Namespace specification.
pub const XML_XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// The namespace bound to the `xmlns` prefix and the bare `xmlns` attribute.
pub const XML_NS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Implementation of [DOMException](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-17189187)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// Although named “Exception”,
/// it merely inherits its name from the specification and is in fact just an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DOMException {
    /// If any Node is inserted somewhere it doesn't belong.
    HierarchyRequestErr = 3,
    /// If a Node is used in a different document than the one that created it
    /// (that doesn't support it).
    WrongDocumentErr = 4,
    /// If an invalid or illegal character is specified, such as in an XML name.
    InvalidCharacterErr = 5,
    /// If an attempt is made to modify an object where modifications are not allowed.
    NoModificationAllowedErr = 7,
    /// If an attempt is made to reference a Node in a context where it does not exist.
    NotFoundErr = 8,
    /// If an attempt is made to add an attribute that is already in use elsewhere.
    InuseAttributeErr = 10,
    /// If an attempt is made to create or change an object in a way which is incorrect with
    /// regard to namespaces.
    NamespaceErr = 14,
}

impl Display for DOMException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::HierarchyRequestErr => "node inserted where it does not belong",
            Self::WrongDocumentErr => "node belongs to a different document",
            Self::InvalidCharacterErr => "invalid character in name",
            Self::NoModificationAllowedErr => "modification not allowed",
            Self::NotFoundErr => "node not found",
            Self::InuseAttributeErr => "attribute is already in use by another element",
            Self::NamespaceErr => "namespace constraint violated",
        };
        write!(f, "DOMException({}): {msg}", *self as u16)
    }
}

impl std::error::Error for DOMException {}

/// Constants `NodeType` in [Interface Node](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1950641247).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CDATASection = 4,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
}

/// Return `true` if `parent` and `child` are allowed to be parent and child.
/// Otherwise, return `false`.
///
/// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
///
/// | NodeType              | Description                                                                               |
/// | :-------------------- | :---------------------------------------------------------------------------------------- |
/// | Document              | Element (maximum of one), ProcessingInstruction, Comment, DocumentType (maximum of one)   |
/// | Element               | Element, ProcessingInstruction, Comment, Text, CDATASection                               |
/// | others                | no children                                                                               |
fn check_vertical_hierarchy(parent: NodeType, child: NodeType) -> bool {
    use NodeType::*;
    match parent {
        Element => matches!(
            child,
            Element | Text | Comment | ProcessingInstruction | CDATASection
        ),
        Document => matches!(
            child,
            Element | ProcessingInstruction | Comment | DocumentType
        ),
        _ => false,
    }
}

/// Check if the nodes belong to the same document or not.
fn check_owner_document_sameness(l: &impl Node, r: &impl Node) -> bool {
    match (l.node_type(), r.node_type()) {
        (NodeType::Document, _) => r
            .owner_document()
            .is_some_and(|doc| l.is_same_node(&NodeRef::Document(doc))),
        _ => l
            .owner_document()
            .zip(r.owner_document())
            .is_some_and(|(l, r)| l.is_same_node(&NodeRef::Document(r))),
    }
}

fn check_no_modification_allowed_err(node: &impl Node) -> Result<(), DOMException> {
    if node.is_read_only() {
        Err(DOMException::NoModificationAllowedErr)
    } else {
        Ok(())
    }
}

/// Split a QName into `(prefix, local)`.
///
/// Return `None` if `name` has no prefix, or if `name` starts with ':'.
pub fn split_qname2(name: &str) -> Option<(&str, &str)> {
    // nasty but valid
    if name.starts_with(':') {
        return None;
    }
    name.split_once(':')
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | '_' | 'A'..='Z' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// Check that `value` matches the `Name` production of XML 1.0 (Fifth Edition).
pub fn validate_name(value: &str) -> Result<(), DOMException> {
    // First quick algorithm for ASCII range
    if value
        .strip_prefix(|c: char| c.is_ascii_alphabetic() || c == '_' || c == ':')
        .is_some_and(|rest| {
            rest.bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':'))
        })
    {
        return Ok(());
    }

    let mut chars = value.chars();
    match chars.next() {
        Some(c) if is_name_start_char(c) && chars.all(is_name_char) => Ok(()),
        _ => Err(DOMException::InvalidCharacterErr),
    }
}

/// Check the namespace constraints of a qualified name and its namespace URI.
///
/// Return `(prefix, local_name)` on success.
fn validate_qualified_name<'a>(
    ns_uri: Option<&str>,
    qname: &'a str,
) -> Result<(Option<&'a str>, &'a str), DOMException> {
    validate_name(qname)?;
    let (prefix, local) = match split_qname2(qname) {
        Some((prefix, local)) => {
            if local.is_empty() || local.contains(':') {
                return Err(DOMException::NamespaceErr);
            }
            (Some(prefix), local)
        }
        None => (None, qname),
    };
    let ns_uri = ns_uri.filter(|uri| !uri.is_empty());
    match (prefix, ns_uri) {
        (Some(_), None) => Err(DOMException::NamespaceErr),
        (Some("xml"), Some(uri)) if uri != XML_XML_NAMESPACE => Err(DOMException::NamespaceErr),
        (Some("xmlns"), Some(uri)) if uri != XML_NS_NAMESPACE => Err(DOMException::NamespaceErr),
        (None, Some(uri)) if qname == "xmlns" && uri != XML_NS_NAMESPACE => {
            Err(DOMException::NamespaceErr)
        }
        (Some(p), Some(XML_NS_NAMESPACE)) if p != "xmlns" => Err(DOMException::NamespaceErr),
        (None, Some(XML_NS_NAMESPACE)) if qname != "xmlns" => Err(DOMException::NamespaceErr),
        _ => Ok((prefix, local)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation() {
        assert!(validate_name("root").is_ok());
        assert!(validate_name("ns:root-1.x").is_ok());
        assert!(validate_name("élément").is_ok());
        assert_eq!(validate_name("1abc"), Err(DOMException::InvalidCharacterErr));
        assert_eq!(validate_name("a b"), Err(DOMException::InvalidCharacterErr));
        assert_eq!(validate_name(""), Err(DOMException::InvalidCharacterErr));
    }

    #[test]
    fn qualified_name_constraints() {
        assert_eq!(
            validate_qualified_name(Some("urn:a"), "a:b"),
            Ok((Some("a"), "b"))
        );
        assert_eq!(validate_qualified_name(None, "b"), Ok((None, "b")));
        assert_eq!(
            validate_qualified_name(None, "a:b"),
            Err(DOMException::NamespaceErr)
        );
        assert_eq!(
            validate_qualified_name(Some("urn:a"), "xml:lang"),
            Err(DOMException::NamespaceErr)
        );
        assert_eq!(
            validate_qualified_name(Some(XML_NS_NAMESPACE), "xmlns:p"),
            Ok((Some("xmlns"), "p"))
        );
        assert_eq!(
            validate_qualified_name(Some(XML_NS_NAMESPACE), "p"),
            Err(DOMException::NamespaceErr)
        );
    }
}
