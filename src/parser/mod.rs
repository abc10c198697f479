//! Construction of a [`DocumentRef`] from XML text.
//!
//! Tokenizing is delegated to [`quick_xml`]. This module resolves namespaces, expands
//! character and entity references and reads the document type declaration, so that the
//! built tree carries everything the serializer needs.
//!
//! Entities declared in an external DTD subset are only known if an [`EntityResolver`]
//! supplies the subset. Nothing is fetched from the network or the file system.

mod doctype;

use std::{borrow::Cow, collections::HashMap, io::BufRead, rc::Rc};

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use quick_xml::{
    Reader,
    errors::IllFormedError,
    escape::{resolve_predefined_entity, unescape_with},
    events::{BytesDecl, BytesStart, Event},
};

pub use doctype::{DoctypeDecl, parse_doctype, parse_entity_decls};

use crate::{
    dom::{
        DocumentRef, ElementRef, Node, XML_NS_NAMESPACE, XML_XML_NAMESPACE, node::NodeRef,
        split_qname2,
    },
    error::ParseError,
};

/// Source of external DTD subsets.
pub trait EntityResolver {
    /// Return the text of the external subset identified by `public_id` and `system_id`.
    ///
    /// Return `None` if the subset is unknown. The document is still built in that case,
    /// but references to entities declared only there fail.
    fn resolve(&self, public_id: Option<&str>, system_id: &str) -> Option<String>;
}

/// [`EntityResolver`] backed by in-memory tables.
///
/// Public identifiers are looked up first, then system identifiers.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    by_public_id: HashMap<String, String>,
    by_system_id: HashMap<String, String>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_public_id(mut self, public_id: impl Into<String>, subset: impl Into<String>) -> Self {
        self.by_public_id.insert(public_id.into(), subset.into());
        self
    }

    #[must_use]
    pub fn with_system_id(mut self, system_id: impl Into<String>, subset: impl Into<String>) -> Self {
        self.by_system_id.insert(system_id.into(), subset.into());
        self
    }
}

impl EntityResolver for MapResolver {
    fn resolve(&self, public_id: Option<&str>, system_id: &str) -> Option<String> {
        public_id
            .and_then(|public_id| self.by_public_id.get(public_id))
            .or_else(|| self.by_system_id.get(system_id))
            .cloned()
    }
}

/// Options of the document builder.
#[derive(Clone, Default)]
pub struct ParserOptions {
    pub resolver: Option<Rc<dyn EntityResolver>>,
}

impl ParserOptions {
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl EntityResolver + 'static) -> Self {
        self.resolver = Some(Rc::new(resolver));
        self
    }
}

/// Parse a document from a string with default options.
pub fn parse_str(text: &str) -> Result<DocumentRef, ParseError> {
    parse_str_with(text, &ParserOptions::default())
}

/// Parse a document from bytes with default options.
///
/// See [`parse_reader_with`] about the input encoding.
pub fn parse_reader(reader: impl BufRead) -> Result<DocumentRef, ParseError> {
    parse_reader_with(reader, &ParserOptions::default())
}

/// Parse a document from bytes.
///
/// The input encoding is taken from the byte order mark, then from the `encoding`
/// of the XML declaration. UTF-8 is assumed if neither is present.
pub fn parse_reader_with(
    mut reader: impl BufRead,
    options: &ParserOptions,
) -> Result<DocumentRef, ParseError> {
    let mut bytes = vec![];
    reader.read_to_end(&mut bytes)?;
    let text = decode(&bytes)?;
    parse_str_with(&text, options)
}

/// Parse a document from a string.
pub fn parse_str_with(text: &str, options: &ParserOptions) -> Result<DocumentRef, ParseError> {
    // 2.11 End-of-Line Handling
    let text = if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    };

    let mut builder = TreeBuilder::new(options);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(false);
    loop {
        match reader.read_event()? {
            Event::Decl(decl) => builder.declaration(&decl)?,
            Event::DocType(doctype) => builder.doctype(utf8(&doctype)?)?,
            Event::Start(start) => builder.start_element(&start, false)?,
            Event::Empty(start) => builder.start_element(&start, true)?,
            Event::End(_) => builder.end_element(),
            Event::Text(text) => builder.text(utf8(&text)?)?,
            Event::CData(cdata) => builder.cdata(utf8(&cdata)?)?,
            Event::Comment(comment) => builder.comment(utf8(&comment)?)?,
            Event::PI(pi) => builder.processing_instruction(utf8(pi.target())?, utf8(pi.content())?)?,
            Event::Eof => break,
        }
    }
    builder.finish()
}

fn utf8(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|_| ParseError::Undecodable { encoding: "UTF-8" })
}

fn decode(bytes: &[u8]) -> Result<Cow<'_, str>, ParseError> {
    let (encoding, bytes) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => {
            let encoding = match declared_encoding(bytes) {
                Some(label) => Encoding::for_label_no_replacement(label.as_bytes())
                    .ok_or_else(|| ParseError::UnknownEncoding {
                        label: label.to_owned(),
                    })?,
                None => UTF_8,
            };
            (encoding, bytes)
        }
    };
    debug!("decode input as {}", encoding.name());
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or(ParseError::Undecodable {
            encoding: encoding.name(),
        })
}

/// Read the `encoding` pseudo-attribute of an ASCII compatible XML declaration.
fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let rest = bytes.strip_prefix(b"<?xml")?;
    let end = rest.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&rest[..end]).ok()?;
    let (_, value) = decl.split_once("encoding")?;
    let value = value.trim_start().strip_prefix('=')?.trim_start();
    let quote = value.chars().next().filter(|&c| c == '"' || c == '\'')?;
    let value = &value[1..];
    value.find(quote).map(|len| &value[..len])
}

/// Replace literal whitespace of an attribute value with spaces.
///
/// 3.3.3 Attribute-Value Normalization: character references are not affected.
fn normalize_attribute_value(raw: &str) -> Cow<'_, str> {
    if raw.contains(['\t', '\n', '\r']) {
        Cow::Owned(raw.replace(['\t', '\n', '\r'], " "))
    } else {
        Cow::Borrowed(raw)
    }
}

struct TreeBuilder<'a> {
    options: &'a ParserOptions,
    doc: DocumentRef,
    stack: Vec<ElementRef>,
    /// Namespace declarations of each open element.
    scopes: Vec<Vec<(Option<String>, String)>>,
    /// Replacement text of internal general entities.
    entities: HashMap<String, String>,
}

impl<'a> TreeBuilder<'a> {
    fn new(options: &'a ParserOptions) -> Self {
        Self {
            options,
            doc: DocumentRef::new(),
            stack: vec![],
            scopes: vec![],
            entities: HashMap::new(),
        }
    }

    fn unescape<'t>(&self, raw: &'t str) -> Result<Cow<'t, str>, ParseError> {
        Ok(unescape_with(raw, |name| {
            resolve_predefined_entity(name).or_else(|| self.entities.get(name).map(String::as_str))
        })?)
    }

    fn append(&mut self, node: NodeRef) -> Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(parent) => parent.append_child(node)?,
            None => self.doc.append_child(node)?,
        };
        Ok(())
    }

    fn declaration(&mut self, decl: &BytesDecl) -> Result<(), ParseError> {
        let version = decl.version()?;
        self.doc.set_xml_version(Some(utf8(&version)?));
        if let Some(encoding) = decl.encoding() {
            let encoding = encoding?;
            self.doc.set_xml_encoding(Some(utf8(&encoding)?));
        }
        if let Some(standalone) = decl.standalone() {
            let standalone = standalone?;
            self.doc.set_xml_standalone(Some(&*standalone == b"yes"));
        }
        Ok(())
    }

    fn doctype(&mut self, content: &str) -> Result<(), ParseError> {
        let decl = parse_doctype(content)?;
        let mut doctype = self
            .doc
            .create_document_type(decl.name, decl.public_id, decl.system_id)?;
        doctype.set_internal_subset(decl.internal_subset.map(Rc::from))?;

        let mut declared = match decl.internal_subset {
            Some(subset) => parse_entity_decls(subset)?,
            None => vec![],
        };
        if let (Some(resolver), Some(system_id)) = (self.options.resolver.as_ref(), decl.system_id) {
            match resolver.resolve(decl.public_id, system_id) {
                Some(subset) => declared.extend(parse_entity_decls(&subset)?),
                None => debug!("external subset '{system_id}' is not resolved"),
            }
        }
        for entity in declared {
            if let Some(value) = entity.value() {
                self.entities
                    .entry(entity.name().to_owned())
                    .or_insert_with(|| value.to_owned());
            }
            doctype.add_entity(entity)?;
        }
        debug!(
            "document type '{}' declares {} general entities",
            decl.name,
            doctype.entities().len()
        );
        self.append(doctype.into())
    }

    /// Find the namespace bound to `prefix` in the open elements.
    fn lookup_namespace(&self, prefix: Option<&str>) -> Result<Option<String>, ParseError> {
        match prefix {
            Some("xml") => return Ok(Some(XML_XML_NAMESPACE.to_owned())),
            Some("xmlns") => return Ok(Some(XML_NS_NAMESPACE.to_owned())),
            _ => {}
        }
        let found = self
            .scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(declared, _)| declared.as_deref() == prefix);
        match (found, prefix) {
            (Some((_, uri)), _) => Ok((!uri.is_empty()).then(|| uri.clone())),
            (None, None) => Ok(None),
            (None, Some(prefix)) => Err(ParseError::UnboundPrefix {
                prefix: prefix.to_owned(),
            }),
        }
    }

    fn start_element(&mut self, start: &BytesStart, empty: bool) -> Result<(), ParseError> {
        let name = start.name();
        let qname = utf8(name.as_ref())?;

        let mut attributes = vec![];
        let mut bindings = vec![];
        for attr in start.attributes() {
            let attr = attr?;
            let name = utf8(attr.key.as_ref())?.to_owned();
            let raw = normalize_attribute_value(utf8(&attr.value)?);
            let value = self.unescape(&raw)?.into_owned();
            if name == "xmlns" {
                bindings.push((None, value.clone()));
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                bindings.push((Some(prefix.to_owned()), value.clone()));
            }
            attributes.push((name, value));
        }
        self.scopes.push(bindings);

        let prefix = split_qname2(qname).map(|(prefix, _)| prefix);
        let namespace_uri = self.lookup_namespace(prefix)?;
        let mut elem = self.doc.create_element_ns(namespace_uri.as_deref(), qname)?;
        for (name, value) in attributes {
            if name == "xmlns" || name.starts_with("xmlns:") {
                elem.set_attribute_ns(Some(XML_NS_NAMESPACE), &name, value)?;
            } else if let Some((prefix, _)) = split_qname2(&name) {
                let namespace_uri = self.lookup_namespace(Some(prefix))?;
                elem.set_attribute_ns(namespace_uri.as_deref(), &name, value)?;
            } else {
                elem.set_attribute(&name, value)?;
            }
        }

        self.append(elem.clone().into())?;
        if empty {
            self.scopes.pop();
        } else {
            self.stack.push(elem);
        }
        Ok(())
    }

    fn end_element(&mut self) {
        self.stack.pop();
        self.scopes.pop();
    }

    fn text(&mut self, raw: &str) -> Result<(), ParseError> {
        if self.stack.is_empty() && raw.trim_matches(['\t', '\n', '\r', ' ']).is_empty() {
            return Ok(());
        }
        let text = self.unescape(raw)?.into_owned();
        if text.is_empty() {
            return Ok(());
        }
        let node = self.doc.create_text_node(text);
        self.append(node.into())
    }

    fn cdata(&mut self, data: &str) -> Result<(), ParseError> {
        let node = self.doc.create_cdata_section(data);
        self.append(node.into())
    }

    fn comment(&mut self, data: &str) -> Result<(), ParseError> {
        let node = self.doc.create_comment(data);
        self.append(node.into())
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), ParseError> {
        let data = data.trim_start_matches(['\t', '\n', '\r', ' ']);
        let node = self
            .doc
            .create_processing_instruction(target, (!data.is_empty()).then_some(data))?;
        self.append(node.into())
    }

    fn finish(self) -> Result<DocumentRef, ParseError> {
        if let Some(open) = self.stack.last() {
            let name = open.tag_name().to_string();
            return Err(ParseError::Xml(IllFormedError::MissingEndTag(name).into()));
        }
        Ok(self.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::character_data::CharacterData;

    #[test]
    fn namespaces_are_resolved() {
        let doc = parse_str(
            r#"<a:root xmlns:a="urn:a" xmlns="urn:d"><child a:attr="1" plain="2"><x xmlns=""/></child></a:root>"#,
        )
        .unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(root.namespace_uri().as_deref(), Some("urn:a"));
        assert_eq!(root.prefix().as_deref(), Some("a"));

        let child = root.child_elements().remove(0);
        assert_eq!(child.namespace_uri().as_deref(), Some("urn:d"));
        assert_eq!(child.get_attribute_ns(Some("urn:a"), "attr").as_deref(), Some("1"));
        let plain = child.get_attribute_node("plain").unwrap();
        assert_eq!(plain.namespace_uri(), None);

        let x = child.child_elements().remove(0);
        assert_eq!(x.namespace_uri(), None);
    }

    #[test]
    fn unbound_prefix() {
        let Err(err) = parse_str("<p:root/>") else {
            panic!("unbound prefix accepted");
        };
        assert!(matches!(err, ParseError::UnboundPrefix { prefix } if prefix == "p"));
    }

    #[test]
    fn declaration_and_prolog_nodes() {
        let doc = parse_str(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n<!--c-->\n<?pi  data?>\n<root/>",
        )
        .unwrap();
        assert_eq!(doc.xml_version().as_deref(), Some("1.0"));
        assert_eq!(doc.xml_encoding().as_deref(), Some("UTF-8"));
        assert_eq!(doc.xml_standalone(), Some(false));

        let children = doc.child_nodes();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].as_comment().unwrap().data(), "c");
        let pi = children[1].as_processing_instruction().unwrap();
        assert_eq!(&*pi.target(), "pi");
        assert_eq!(pi.data().as_deref(), Some("data"));
    }

    #[test]
    fn entities_and_character_references() {
        let doc = parse_str(
            "<!DOCTYPE doc [<!ENTITY euro \"&#x20AC;\">]>\n<doc a=\"&euro;&#9;x\">&lt;&euro;&#65;\r\n</doc>",
        )
        .unwrap();
        let doctype = doc.doctype().unwrap();
        assert_eq!(&*doctype.name(), "doc");
        assert_eq!(doctype.get_entity("euro").unwrap().value(), Some("€"));

        let root = doc.document_element().unwrap();
        assert_eq!(root.get_attribute("a").as_deref(), Some("€\tx"));
        assert_eq!(root.text_content().as_deref(), Some("<€A\n"));
    }

    #[test]
    fn literal_whitespace_in_attributes_is_normalized() {
        let doc = parse_str("<doc a=\"x\ty\nz\"/>").unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(root.get_attribute("a").as_deref(), Some("x y z"));
    }

    #[test]
    fn external_subset_from_resolver() {
        let resolver = MapResolver::new().with_public_id("-//EX//DTD ex//EN", "<!ENTITY ex 'x'>");
        let options = ParserOptions::default().with_resolver(resolver);
        let doc = parse_str_with(
            "<!DOCTYPE doc PUBLIC \"-//EX//DTD ex//EN\" \"ex.dtd\"><doc>&ex;</doc>",
            &options,
        )
        .unwrap();
        assert_eq!(doc.document_element().unwrap().text_content().as_deref(), Some("x"));

        let err = parse_str("<!DOCTYPE doc PUBLIC \"-//EX//DTD ex//EN\" \"ex.dtd\"><doc>&ex;</doc>");
        assert!(err.is_err());
    }

    #[test]
    fn cdata_is_kept() {
        let doc = parse_str("<doc><![CDATA[<a> & b]]></doc>").unwrap();
        let root = doc.document_element().unwrap();
        let cdata = root.first_child().unwrap().as_cdata_section().unwrap();
        assert_eq!(cdata.data(), "<a> & b");
    }

    #[test]
    fn reader_input_encodings() {
        let latin1 = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><doc>caf\xE9</doc>";
        let doc = parse_reader(&latin1[..]).unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(root.text_content().as_deref(), Some("café"));

        let mut utf16 = vec![0xFF, 0xFE];
        utf16.extend("<doc>\u{E9}</doc>".encode_utf16().flat_map(u16::to_le_bytes));
        let doc = parse_reader(&utf16[..]).unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(root.text_content().as_deref(), Some("é"));
    }

    #[test]
    fn unclosed_element() {
        assert!(parse_str("<doc><open>").is_err());
    }
}
