//! Canonical, optionally pretty-printed XML serialization of an in-memory document tree.
//!
//! - [`dom`]: the document tree.
//! - [`save`]: the serializer and its configuration.
//! - [`parser`]: building a tree from XML text (feature `parser`).
//! - [`encoding`]: output character sets.
#![warn(unused_mut)]
#![warn(unused_imports)]
#![warn(unused_variables)]

pub mod dom;
pub mod encoding;
pub mod error;
#[cfg(feature = "parser")]
pub mod parser;
pub mod save;

pub use error::SaveError;
#[cfg(feature = "parser")]
pub use error::ParseError;
pub use save::{SaveOptions, Serializer};
