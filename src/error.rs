//! Error types of the serializer and of the document builder.
//!
//! Tree operations report [`DOMException`] error codes. The serializer wraps them
//! into [`SaveError::Dom`] without modification.

use std::{borrow::Cow, fmt::Display};

use crate::dom::DOMException;

/// Errors reported by [`Serializer`](crate::save::Serializer).
///
/// Every variant is fatal to the current call. Output already handed to the sink
/// is not rolled back.
#[derive(Debug)]
pub enum SaveError {
    /// Invalid configuration, detected before any output is produced.
    Configuration { msg: Cow<'static, str> },
    /// A declared single-character entity reuses a predefined entity name
    /// for a different character.
    ConflictingEntityDefinition {
        name: String,
        predefined: char,
        declared: char,
    },
    /// An error reported by the document tree, e.g. when a namespace declaration
    /// cannot be added to a read-only document.
    Dom(DOMException),
    /// The child list of a node changed while it was being traversed.
    ConcurrentModification { expected: usize, found: usize },
    /// The output encoding label is not known.
    UnknownEncoding { label: String },
    /// A name, comment or processing instruction contains a character the output
    /// encoding cannot represent. Markup has no character references for those.
    UnencodableCharacter {
        c: char,
        encoding: &'static str,
        within: &'static str,
    },
    /// The sink failed.
    Io(std::io::Error),
}

impl SaveError {
    pub(crate) fn configuration(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Configuration { msg: msg.into() }
    }
}

impl Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration { msg } => write!(f, "invalid configuration: {msg}"),
            Self::ConflictingEntityDefinition {
                name,
                predefined,
                declared,
            } => write!(
                f,
                "entity '{name}' is predefined as {:?} but declared as {:?}",
                predefined, declared
            ),
            Self::Dom(err) => write!(f, "{err}"),
            Self::ConcurrentModification { expected, found } => write!(
                f,
                "child list modified during traversal: expected {expected} children, found {found}"
            ),
            Self::UnknownEncoding { label } => write!(f, "unknown encoding '{label}'"),
            Self::UnencodableCharacter {
                c,
                encoding,
                within,
            } => write!(
                f,
                "{within} contains {c:?} (U+{:04X}), which {encoding} cannot represent",
                *c as u32
            ),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dom(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DOMException> for SaveError {
    fn from(value: DOMException) -> Self {
        Self::Dom(value)
    }
}

impl From<std::io::Error> for SaveError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Errors reported by [`parse_str`](crate::parser::parse_str) and its relatives.
#[cfg(feature = "parser")]
#[derive(Debug)]
pub enum ParseError {
    /// The input is not well-formed.
    Xml(quick_xml::Error),
    /// The tree refused a node built from the input.
    Dom(DOMException),
    /// A prefix is used without a namespace declaration in scope.
    UnboundPrefix { prefix: String },
    /// The document type declaration could not be understood.
    MalformedDoctype { msg: Cow<'static, str> },
    /// The input declares an encoding that is not supported.
    UnknownEncoding { label: String },
    /// The input is not valid in the encoding it is read in.
    Undecodable { encoding: &'static str },
    Io(std::io::Error),
}

#[cfg(feature = "parser")]
impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xml(err) => write!(f, "malformed XML: {err}"),
            Self::Dom(err) => write!(f, "{err}"),
            Self::UnboundPrefix { prefix } => write!(f, "namespace prefix '{prefix}' is not bound"),
            Self::MalformedDoctype { msg } => write!(f, "malformed document type: {msg}"),
            Self::UnknownEncoding { label } => write!(f, "unknown encoding '{label}'"),
            Self::Undecodable { encoding } => write!(f, "input is not valid {encoding}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

#[cfg(feature = "parser")]
impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Xml(err) => Some(err),
            Self::Dom(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(feature = "parser")]
impl From<quick_xml::Error> for ParseError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Xml(value)
    }
}

#[cfg(feature = "parser")]
impl From<quick_xml::events::attributes::AttrError> for ParseError {
    fn from(value: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(value.into())
    }
}

#[cfg(feature = "parser")]
impl From<quick_xml::escape::EscapeError> for ParseError {
    fn from(value: quick_xml::escape::EscapeError) -> Self {
        Self::Xml(value.into())
    }
}

#[cfg(feature = "parser")]
impl From<DOMException> for ParseError {
    fn from(value: DOMException) -> Self {
        Self::Dom(value)
    }
}

#[cfg(feature = "parser")]
impl From<std::io::Error> for ParseError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
