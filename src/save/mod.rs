//! Conversion of a document tree into XML text.
//!
//! [`Serializer`] walks the tree depth-first and writes, in order: an optional byte order
//! mark, the `<?xml ...?>` declaration, the document type declaration, comments and
//! processing instructions around the document element, and the element tree itself.
//!
//! The content of each element is preprocessed by [`normalize`] and laid out according to
//! a [`FormatProfile`]. Text is escaped by [`escape::Escaper`] and attributes are written
//! in the order of [`attr_order`]. If enabled, missing namespace declarations are added to
//! the tree by [`namespace::ensure`] before anything is written.
//!
//! # Example
//! ```
//! use domsave::{dom::{DocumentRef, Node}, save::{SaveOptions, Serializer}};
//!
//! let mut doc = DocumentRef::new();
//! let mut root = doc.create_element("p").unwrap();
//! root.append_child(doc.create_text_node("  hello   world  ").into()).unwrap();
//! doc.append_child(root.into()).unwrap();
//!
//! let options = SaveOptions::default()
//!     .with_format_output(true)
//!     .with_prolog(false)
//!     .with_format_end_newline(false);
//! let text = Serializer::with_options(options).serialize_to_string(&doc).unwrap();
//! assert_eq!(text, "<p>hello world</p>");
//! ```

pub mod attr_order;
pub mod entities;
pub mod escape;
pub mod namespace;
pub mod normalize;
pub mod options;
pub mod output;
pub mod profile;

use std::io::Write;

use log::debug;

pub use entities::EntityTable;
pub use options::{DoctypeOverride, PLATFORM_LINE_SEPARATOR, PredefinedEntities, SaveOptions};
pub use profile::{DefaultProfile, ElementName, FormatProfile, TableProfile, XHTML_NAMESPACE};

use crate::{
    dom::{
        CDATASectionRef, CommentRef, DocumentRef, ElementRef, Node, ProcessingInstructionRef,
        character_data::CharacterData, node::NodeRef,
    },
    encoding::OutputEncoding,
    error::SaveError,
};

use escape::{Escaper, choose_delimiter};
use normalize::{Content, collapse_runs, merge_adjacent_text, normalize_line_endings, trim_decision};
use options::check_doctype_identifiers;
use output::OutputBuffer;

/// Layout flags of one element, as answered by the profile.
#[derive(Debug, Clone, Copy, Default)]
struct ElementClass {
    block: bool,
    brk: bool,
    flush: bool,
    preserved: bool,
}

fn classify(profile: &dyn FormatProfile, elem: &ElementRef) -> ElementClass {
    let namespace_uri = elem.namespace_uri();
    let local_name = elem.local_name().unwrap_or_else(|| elem.tag_name());
    let name = ElementName::new(namespace_uri.as_deref(), &local_name);
    ElementClass {
        block: profile.is_block(&name),
        brk: profile.is_break(&name),
        flush: profile.is_flush(&name),
        preserved: profile.is_preserved(&name),
    }
}

/// XML serializer.
///
/// The options and the profile are only read, so a serializer can be reused for any
/// number of calls. All state of a call lives in the call itself.
pub struct Serializer {
    options: SaveOptions,
    profile: Box<dyn FormatProfile>,
}

impl Serializer {
    pub fn new(options: SaveOptions, profile: impl FormatProfile + 'static) -> Self {
        Self {
            options,
            profile: Box::new(profile),
        }
    }

    /// Create a serializer with [`DefaultProfile`].
    pub fn with_options(options: SaveOptions) -> Self {
        Self::new(options, DefaultProfile)
    }

    pub fn options(&self) -> &SaveOptions {
        &self.options
    }

    /// Serialize the whole document into `writer` in the configured encoding.
    ///
    /// `writer` is flushed once at the end. On error, output written so far is not
    /// rolled back.
    ///
    /// # Errors
    /// - [`SaveError::Configuration`] if the document type declaration is invalid.
    ///   This is detected before anything is written.
    /// - [`SaveError::ConflictingEntityDefinition`] if the document type redefines
    ///   a predefined entity.
    /// - [`SaveError::Dom`] if a namespace declaration cannot be added.
    /// - [`SaveError::ConcurrentModification`] if the tree changes while it is written.
    /// - [`SaveError::Io`] if `writer` fails.
    pub fn serialize(&self, doc: &DocumentRef, writer: impl Write) -> Result<(), SaveError> {
        let out = OutputBuffer::new(writer, self.options.encoding());
        self.save_document(doc, out, self.options.bom_written())
    }

    /// Serialize the whole document into a string.
    ///
    /// The declaration still names the configured encoding, and characters that encoding
    /// cannot represent are still escaped, but the returned text is not transcoded.
    pub fn serialize_to_string(&self, doc: &DocumentRef) -> Result<String, SaveError> {
        let mut buf = vec![];
        let out = OutputBuffer::new(&mut buf, OutputEncoding::UTF8);
        self.save_document(doc, out, false)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Serialize the subtree rooted at `element` without declaration and document type.
    ///
    /// Added namespace declarations are placed within the subtree.
    pub fn serialize_node(&self, element: &ElementRef, writer: impl Write) -> Result<(), SaveError> {
        let entities = self.entity_table(element.owner_document().as_ref())?;
        let mut out = OutputBuffer::new(writer, self.options.encoding());
        if self.options.bom_written() {
            out.write_bom()?;
        }
        if self.options.ensure_namespace_declarations() {
            let target = self
                .options
                .document_element_declarations()
                .then_some(element);
            namespace::ensure(element, target, true)?;
        }

        let mut ctx = SaveContext::new(&self.options, &*self.profile, &entities, out);
        ctx.write_element(element, 0, self.options.format_output())?;
        ctx.out.flush()?;
        Ok(())
    }

    fn entity_table(&self, doc: Option<&DocumentRef>) -> Result<EntityTable, SaveError> {
        let declared = doc
            .and_then(|doc| doc.doctype())
            .filter(|_| self.options.use_defined_entities())
            .map(|doctype| doctype.entities())
            .unwrap_or_default();
        EntityTable::build(
            &declared,
            self.options.use_predefined_entities() == PredefinedEntities::Always,
        )
    }

    fn save_document(
        &self,
        doc: &DocumentRef,
        mut out: OutputBuffer<'_>,
        bom: bool,
    ) -> Result<(), SaveError> {
        debug!(
            "serialize document: encoding={}, format={}",
            self.options.encoding_label(),
            self.options.format_output()
        );
        let doctype = doc.doctype();
        if self.options.doctype().is_none() {
            if let Some(doctype) = doctype.as_ref() {
                check_doctype_identifiers(
                    doctype.public_id().as_deref(),
                    doctype.system_id().as_deref(),
                )?;
            }
        }
        let entities = self.entity_table(Some(doc))?;

        if self.options.ensure_namespace_declarations() {
            if let Some(root) = doc.document_element() {
                let target = self
                    .options
                    .document_element_declarations()
                    .then_some(&root);
                let added = namespace::ensure(&root, target, true)?;
                debug!("{added} namespace declarations added");
            }
        }

        if bom {
            out.write_bom()?;
        }
        let mut ctx = SaveContext::new(&self.options, &*self.profile, &entities, out);
        let sep = self.options.line_separator();

        if self.options.prolog_written() {
            ctx.write_prolog(doc)?;
            ctx.out.write_str(sep)?;
        }
        if let Some(doctype) = self.options.doctype() {
            ctx.write_doctype(
                &doctype.name,
                doctype.public_id.as_deref(),
                doctype.system_id.as_deref(),
                None,
            )?;
            ctx.out.write_str(sep)?;
        } else if let Some(doctype) = doctype {
            ctx.write_doctype(
                &doctype.name(),
                doctype.public_id().as_deref(),
                doctype.system_id().as_deref(),
                doctype.internal_subset().as_deref(),
            )?;
            ctx.out.write_str(sep)?;
        }

        let mut after_root = false;
        for child in doc.child_nodes() {
            match child {
                NodeRef::Element(root) => {
                    ctx.write_element(&root, 0, self.options.format_output())?;
                    after_root = true;
                }
                NodeRef::Comment(comment) => {
                    if after_root {
                        ctx.out.write_str(sep)?;
                    }
                    ctx.write_comment(&comment)?;
                    if !after_root {
                        ctx.out.write_str(sep)?;
                    }
                }
                NodeRef::ProcessingInstruction(pi) => {
                    if after_root {
                        ctx.out.write_str(sep)?;
                    }
                    ctx.write_pi(&pi)?;
                    if !after_root {
                        ctx.out.write_str(sep)?;
                    }
                }
                // the document type has already been written
                _ => {}
            }
        }
        if after_root && self.options.format_end_newline() {
            ctx.out.write_str(sep)?;
        }
        ctx.out.flush()?;
        Ok(())
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::with_options(SaveOptions::default())
    }
}

/// State of a single serialization call.
struct SaveContext<'a, 'w> {
    options: &'a SaveOptions,
    profile: &'a dyn FormatProfile,
    escaper: Escaper<'a>,
    out: OutputBuffer<'w>,
}

impl<'a, 'w> SaveContext<'a, 'w> {
    fn new(
        options: &'a SaveOptions,
        profile: &'a dyn FormatProfile,
        entities: &'a EntityTable,
        out: OutputBuffer<'w>,
    ) -> Self {
        Self {
            options,
            profile,
            escaper: Escaper::new(entities, options),
            out,
        }
    }

    fn write_prolog(&mut self, doc: &DocumentRef) -> Result<(), SaveError> {
        let version = doc.xml_version();
        self.out.write_str("<?xml version=\"")?;
        self.out.write_str(version.as_deref().unwrap_or("1.0"))?;
        self.out.write_str("\" encoding=\"")?;
        self.out.write_str(self.options.encoding_label())?;
        self.out.write_char('"')?;
        if let Some(standalone) = doc.xml_standalone() {
            self.out.write_str(" standalone=\"")?;
            self.out.write_str(if standalone { "yes" } else { "no" })?;
            self.out.write_char('"')?;
        }
        self.out.write_str("?>")
    }

    fn write_doctype(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        internal_subset: Option<&str>,
    ) -> Result<(), SaveError> {
        self.out.write_str("<!DOCTYPE ")?;
        self.write_markup(name, "document type name")?;
        match (public_id, system_id) {
            (Some(public_id), Some(system_id)) => {
                self.out.write_str(" PUBLIC ")?;
                self.write_quoted(public_id)?;
                self.out.write_char(' ')?;
                self.write_quoted(system_id)?;
            }
            (None, Some(system_id)) => {
                self.out.write_str(" SYSTEM ")?;
                self.write_quoted(system_id)?;
            }
            (Some(_), None) => {
                return Err(SaveError::configuration(
                    "a document type with a public identifier requires a system identifier",
                ));
            }
            (None, None) => {}
        }
        if let Some(subset) = internal_subset.filter(|subset| !subset.is_empty()) {
            self.out.write_str(" [")?;
            self.write_markup(subset, "internal subset")?;
            self.out.write_char(']')?;
        }
        self.out.write_char('>')
    }

    /// Write a literal without escaping, in the quote it does not contain.
    fn write_quoted(&mut self, literal: &str) -> Result<(), SaveError> {
        let quote = choose_delimiter(literal);
        self.out.write_char(quote)?;
        self.write_markup(literal, "document type identifier")?;
        self.out.write_char(quote)
    }

    /// Write text that cannot contain character references.
    ///
    /// `within` names the construct for the error if the output encoding cannot
    /// represent a character of `text`.
    fn write_markup(&mut self, text: &str, within: &'static str) -> Result<(), SaveError> {
        let encoding = self.options.encoding();
        if let Some(c) = text.chars().find(|&c| !encoding.can_encode(c)) {
            return Err(SaveError::UnencodableCharacter {
                c,
                encoding: encoding.name(),
                within,
            });
        }
        self.out.write_str(text)
    }

    fn write_comment(&mut self, comment: &CommentRef) -> Result<(), SaveError> {
        self.out.write_str("<!--")?;
        comment.with_data(|data| self.write_markup(data, "comment"))?;
        self.out.write_str("-->")
    }

    /// Write a CDATA section.
    ///
    /// `]]>` is split over two sections. Characters the output encoding cannot represent
    /// are written as character references between sections.
    fn write_cdata(&mut self, cdata: &CDATASectionRef) -> Result<(), SaveError> {
        let data = cdata.data();
        if data.is_empty() {
            return self.out.write_str("<![CDATA[]]>");
        }
        let encoding = self.options.encoding();
        let mut open = false;
        let mut start = 0;
        for (i, c) in data.char_indices() {
            if encoding.can_encode(c) {
                continue;
            }
            self.write_cdata_run(&data[start..i], &mut open)?;
            if open {
                self.out.write_str("]]>")?;
                open = false;
            }
            self.out.write_str(&format!("&#x{:X};", c as u32))?;
            start = i + c.len_utf8();
        }
        self.write_cdata_run(&data[start..], &mut open)?;
        if open {
            self.out.write_str("]]>")?;
        }
        Ok(())
    }

    fn write_cdata_run(&mut self, run: &str, open: &mut bool) -> Result<(), SaveError> {
        if run.is_empty() {
            return Ok(());
        }
        if !*open {
            self.out.write_str("<![CDATA[")?;
            *open = true;
        }
        for (i, section) in run.split("]]>").enumerate() {
            if i > 0 {
                self.out.write_str("]]]]><![CDATA[>")?;
            }
            self.out.write_str(section)?;
        }
        Ok(())
    }

    fn write_pi(&mut self, pi: &ProcessingInstructionRef) -> Result<(), SaveError> {
        self.out.write_str("<?")?;
        self.write_markup(&pi.target(), "processing instruction target")?;
        if let Some(data) = pi.data().filter(|data| !data.is_empty()) {
            self.out.write_char(' ')?;
            self.write_markup(&data, "processing instruction")?;
        }
        self.out.write_str("?>")
    }

    fn write_indent(&mut self, depth: usize) -> Result<(), SaveError> {
        for _ in 0..depth {
            self.out.write_str(self.options.indent())?;
        }
        Ok(())
    }

    fn write_newline(&mut self) -> Result<(), SaveError> {
        self.out.write_str(self.options.line_separator())
    }

    fn write_text(&mut self, text: &str) -> Result<(), SaveError> {
        let text = normalize_line_endings(text, self.options.line_separator());
        let escaped = self.escaper.encode(&text, None);
        self.out.write_str(&escaped)
    }

    /// Write `elem` whose start tag is placed at indentation `depth`.
    ///
    /// `formatting` is `false` inside preserved elements and when formatting is disabled.
    fn write_element(
        &mut self,
        elem: &ElementRef,
        depth: usize,
        formatting: bool,
    ) -> Result<(), SaveError> {
        let tag_name = elem.tag_name();
        self.out.write_char('<')?;
        self.write_markup(&tag_name, "element name")?;
        for attr in attr_order::sorted_attributes(elem, self.profile) {
            let value = attr.value();
            let quote = choose_delimiter(&value);
            self.out.write_char(' ')?;
            self.write_markup(&attr.name(), "attribute name")?;
            self.out.write_char('=')?;
            self.out.write_char(quote)?;
            let escaped = self.escaper.encode(&value, Some(quote));
            self.out.write_str(&escaped)?;
            self.out.write_char(quote)?;
        }

        if !elem.has_child_nodes() {
            if self.options.empty_element_tags() {
                return self.out.write_str("/>");
            }
            self.out.write_str("></")?;
            self.out.write_str(&tag_name)?;
            return self.out.write_char('>');
        }

        self.out.write_char('>')?;
        let class = classify(self.profile, elem);
        if formatting && !class.preserved {
            self.write_formatted_content(elem, depth, class)?;
        } else {
            self.write_verbatim_content(elem)?;
        }
        self.out.write_str("</")?;
        self.out.write_str(&tag_name)?;
        self.out.write_char('>')
    }

    /// Check that the children of `parent` are still those being written.
    fn check_unmodified(parent: &ElementRef, expected: usize) -> Result<(), SaveError> {
        let found = parent.child_count();
        if found != expected {
            return Err(SaveError::ConcurrentModification { expected, found });
        }
        Ok(())
    }

    fn write_verbatim_content(&mut self, parent: &ElementRef) -> Result<(), SaveError> {
        let expected = parent.child_count();
        for item in merge_adjacent_text(parent.child_nodes()) {
            Self::check_unmodified(parent, expected)?;
            match item {
                Content::Text(text) => self.write_text(&text)?,
                Content::Node(node) => self.write_child(&node, 0, false)?,
            }
        }
        Self::check_unmodified(parent, expected)
    }

    /// Write a non-text child.
    fn write_child(&mut self, node: &NodeRef, depth: usize, formatting: bool) -> Result<(), SaveError> {
        match node {
            NodeRef::Element(elem) => self.write_element(elem, depth, formatting),
            NodeRef::Comment(comment) => self.write_comment(comment),
            NodeRef::CDATASection(cdata) => self.write_cdata(cdata),
            NodeRef::ProcessingInstruction(pi) => self.write_pi(pi),
            NodeRef::Text(text) => {
                let data = text.data();
                self.write_text(&data)
            }
            // not allowed as children of an element
            NodeRef::Document(_) | NodeRef::DocumentType(_) => Ok(()),
        }
    }

    fn write_formatted_content(
        &mut self,
        parent: &ElementRef,
        depth: usize,
        class: ElementClass,
    ) -> Result<(), SaveError> {
        let expected = parent.child_count();
        let content = merge_adjacent_text(parent.child_nodes());
        let profile = self.profile;
        let is_block = |node: &NodeRef| node.as_element().is_some_and(|e| classify(profile, &e).block);
        let is_break = |node: &NodeRef| node.as_element().is_some_and(|e| classify(profile, &e).brk);

        let mut did_break = false;
        let mut last_break_flush = false;
        let mut seen_block = false;
        for (i, item) in content.iter().enumerate() {
            Self::check_unmodified(parent, expected)?;
            let child_depth = if class.flush || last_break_flush {
                depth
            } else {
                depth + 1
            };
            match item {
                Content::Text(text) => {
                    let (trim_start, trim_end) =
                        trim_decision(&content, i, class.block, is_block, is_break);
                    let collapsed = collapse_runs(
                        text,
                        |c| profile.is_space(c),
                        ' ',
                        trim_start,
                        trim_end,
                    );
                    if collapsed.is_empty() {
                        continue;
                    }
                    if did_break {
                        self.write_indent(child_depth)?;
                    }
                    self.write_text(&collapsed)?;
                    did_break = false;
                }
                Content::Node(NodeRef::Element(elem)) => {
                    let child_class = classify(profile, elem);
                    if child_class.block {
                        if !did_break {
                            self.write_newline()?;
                        }
                        self.write_indent(child_depth)?;
                        self.write_element(elem, child_depth, true)?;
                        self.write_newline()?;
                        did_break = true;
                        last_break_flush = child_class.flush;
                        seen_block = true;
                    } else if child_class.brk {
                        if did_break {
                            self.write_indent(child_depth)?;
                        }
                        self.write_element(elem, child_depth, true)?;
                        self.write_newline()?;
                        did_break = true;
                        last_break_flush = child_class.flush;
                    } else {
                        if did_break {
                            self.write_indent(child_depth)?;
                        }
                        self.write_element(elem, child_depth, true)?;
                        did_break = false;
                    }
                }
                Content::Node(node) => {
                    if did_break {
                        self.write_indent(child_depth)?;
                    }
                    self.write_child(node, child_depth, true)?;
                    did_break = false;
                }
            }
        }
        Self::check_unmodified(parent, expected)?;

        if did_break {
            self.write_indent(depth)?;
        } else if seen_block && self.options.block_end_newline() {
            self.write_newline()?;
            self.write_indent(depth)?;
        }
        Ok(())
    }
}
