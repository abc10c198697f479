use std::borrow::Cow;

use crate::{encoding::OutputEncoding, error::SaveError};

/// The line separator of the running platform.
pub const PLATFORM_LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Whether escapes use the five predefined entities (`&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredefinedEntities {
    /// Every occurrence of the five characters is written as its entity,
    /// even where no escape is required.
    Always,
    /// Required escapes use the entity. Other occurrences are written as is.
    #[default]
    AsNeeded,
    /// Required escapes use hexadecimal character references.
    Never,
}

/// A document type declaration written instead of the one held by the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctypeOverride {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

/// Serializer configuration.
///
/// Built with [`SaveOptions::default`] and the consuming `with_*` methods.
/// The record is read-only while serializing, so a single instance can be shared.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    format_output: bool,
    use_defined_entities: bool,
    use_predefined_entities: PredefinedEntities,
    encode_control: bool,
    encode_non_ascii: bool,
    encode_private_use: bool,
    ensure_namespace_declarations: bool,
    document_element_declarations: bool,
    indent: Cow<'static, str>,
    line_separator: Cow<'static, str>,
    format_end_newline: bool,
    block_end_newline: bool,
    bom_written: bool,
    prolog_written: bool,
    encoding_label: Cow<'static, str>,
    encoding: OutputEncoding,
    empty_element_tags: bool,
    doctype: Option<DoctypeOverride>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            format_output: false,
            use_defined_entities: true,
            use_predefined_entities: PredefinedEntities::AsNeeded,
            encode_control: false,
            encode_non_ascii: false,
            encode_private_use: false,
            ensure_namespace_declarations: true,
            document_element_declarations: true,
            indent: Cow::Borrowed("\t"),
            line_separator: Cow::Borrowed(PLATFORM_LINE_SEPARATOR),
            format_end_newline: true,
            block_end_newline: true,
            bom_written: false,
            prolog_written: true,
            encoding_label: Cow::Borrowed("UTF-8"),
            encoding: OutputEncoding::UTF8,
            empty_element_tags: true,
            doctype: None,
        }
    }
}

impl SaveOptions {
    /// Enable pretty-printing.
    #[must_use]
    pub fn with_format_output(mut self, format: bool) -> Self {
        self.format_output = format;
        self
    }

    /// Honor single-character entities declared by the document type.
    #[must_use]
    pub fn with_defined_entities(mut self, use_defined: bool) -> Self {
        self.use_defined_entities = use_defined;
        self
    }

    #[must_use]
    pub fn with_predefined_entities(mut self, policy: PredefinedEntities) -> Self {
        self.use_predefined_entities = policy;
        self
    }

    /// Escape C0 (except TAB, LF and CR), DEL and C1 control characters.
    #[must_use]
    pub fn with_encode_control(mut self, encode: bool) -> Self {
        self.encode_control = encode;
        self
    }

    /// Escape every character above U+007F.
    #[must_use]
    pub fn with_encode_non_ascii(mut self, encode: bool) -> Self {
        self.encode_non_ascii = encode;
        self
    }

    /// Escape characters in the Unicode private use areas.
    #[must_use]
    pub fn with_encode_private_use(mut self, encode: bool) -> Self {
        self.encode_private_use = encode;
        self
    }

    /// Add missing namespace declarations before serializing.
    #[must_use]
    pub fn with_namespace_declarations_ensured(mut self, ensure: bool) -> Self {
        self.ensure_namespace_declarations = ensure;
        self
    }

    /// Prefer the document element as the place for added namespace declarations.
    #[must_use]
    pub fn with_document_element_declarations(mut self, at_root: bool) -> Self {
        self.document_element_declarations = at_root;
        self
    }

    /// The text written once per indentation level.
    #[must_use]
    pub fn with_indent(mut self, indent: impl Into<Cow<'static, str>>) -> Self {
        self.indent = indent.into();
        self
    }

    #[must_use]
    pub fn with_line_separator(mut self, separator: impl Into<Cow<'static, str>>) -> Self {
        self.line_separator = separator.into();
        self
    }

    /// Write a line separator after the document element.
    #[must_use]
    pub fn with_format_end_newline(mut self, newline: bool) -> Self {
        self.format_end_newline = newline;
        self
    }

    /// Put the end tag of an element with block children on its own line.
    #[must_use]
    pub fn with_block_end_newline(mut self, newline: bool) -> Self {
        self.block_end_newline = newline;
        self
    }

    #[must_use]
    pub fn with_bom(mut self, bom: bool) -> Self {
        self.bom_written = bom;
        self
    }

    /// Write the `<?xml ...?>` declaration.
    #[must_use]
    pub fn with_prolog(mut self, prolog: bool) -> Self {
        self.prolog_written = prolog;
        self
    }

    /// Write `<a/>` for empty elements. If disabled, `<a></a>` is written.
    #[must_use]
    pub fn with_empty_element_tags(mut self, empty_tags: bool) -> Self {
        self.empty_element_tags = empty_tags;
        self
    }

    /// Set the output encoding. `label` is also the name written in the prolog.
    ///
    /// # Errors
    /// [`SaveError::UnknownEncoding`] if `label` is not a known encoding.
    pub fn with_encoding(mut self, label: impl Into<Cow<'static, str>>) -> Result<Self, SaveError> {
        let label = label.into();
        self.encoding = label.parse()?;
        self.encoding_label = label;
        Ok(self)
    }

    /// Write this document type declaration instead of the document's own one.
    ///
    /// # Errors
    /// [`SaveError::Configuration`] if a public identifier is given without a system identifier.
    pub fn with_doctype(
        mut self,
        name: impl Into<String>,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Self, SaveError> {
        check_doctype_identifiers(public_id, system_id)?;
        self.doctype = Some(DoctypeOverride {
            name: name.into(),
            public_id: public_id.map(str::to_owned),
            system_id: system_id.map(str::to_owned),
        });
        Ok(self)
    }

    pub fn format_output(&self) -> bool {
        self.format_output
    }

    pub fn use_defined_entities(&self) -> bool {
        self.use_defined_entities
    }

    pub fn use_predefined_entities(&self) -> PredefinedEntities {
        self.use_predefined_entities
    }

    pub fn encode_control(&self) -> bool {
        self.encode_control
    }

    pub fn encode_non_ascii(&self) -> bool {
        self.encode_non_ascii
    }

    pub fn encode_private_use(&self) -> bool {
        self.encode_private_use
    }

    pub fn ensure_namespace_declarations(&self) -> bool {
        self.ensure_namespace_declarations
    }

    pub fn document_element_declarations(&self) -> bool {
        self.document_element_declarations
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn line_separator(&self) -> &str {
        &self.line_separator
    }

    pub fn format_end_newline(&self) -> bool {
        self.format_end_newline
    }

    pub fn block_end_newline(&self) -> bool {
        self.block_end_newline
    }

    pub fn bom_written(&self) -> bool {
        self.bom_written
    }

    pub fn prolog_written(&self) -> bool {
        self.prolog_written
    }

    /// The encoding label as configured.
    pub fn encoding_label(&self) -> &str {
        &self.encoding_label
    }

    pub fn encoding(&self) -> OutputEncoding {
        self.encoding
    }

    pub fn empty_element_tags(&self) -> bool {
        self.empty_element_tags
    }

    pub fn doctype(&self) -> Option<&DoctypeOverride> {
        self.doctype.as_ref()
    }
}

/// A public identifier requires a system identifier (XML 1.0 `ExternalID`).
pub(crate) fn check_doctype_identifiers(
    public_id: Option<&str>,
    system_id: Option<&str>,
) -> Result<(), SaveError> {
    if public_id.is_some() && system_id.is_none() {
        return Err(SaveError::configuration(
            "a document type with a public identifier requires a system identifier",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = SaveOptions::default();
        assert!(!options.format_output());
        assert!(options.use_defined_entities());
        assert_eq!(options.use_predefined_entities(), PredefinedEntities::AsNeeded);
        assert!(options.ensure_namespace_declarations());
        assert!(options.document_element_declarations());
        assert_eq!(options.indent(), "\t");
        assert_eq!(options.line_separator(), PLATFORM_LINE_SEPARATOR);
        assert!(options.format_end_newline());
        assert!(options.block_end_newline());
        assert!(!options.bom_written());
        assert!(options.prolog_written());
        assert_eq!(options.encoding_label(), "UTF-8");
    }

    #[test]
    fn doctype_requires_system_id() {
        let err = SaveOptions::default()
            .with_doctype("html", Some("-//W3C//DTD XHTML 1.0 Strict//EN"), None)
            .unwrap_err();
        assert!(matches!(err, SaveError::Configuration { .. }));

        let options = SaveOptions::default()
            .with_doctype("html", None, Some("about:legacy-compat"))
            .unwrap();
        assert_eq!(options.doctype().map(|d| d.name.as_str()), Some("html"));
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let err = SaveOptions::default().with_encoding("x-unknown").unwrap_err();
        assert!(matches!(err, SaveError::UnknownEncoding { label } if label == "x-unknown"));
        let options = SaveOptions::default().with_encoding("ISO-8859-1").unwrap();
        assert_eq!(options.encoding(), OutputEncoding::ISO8859_1);
    }
}
