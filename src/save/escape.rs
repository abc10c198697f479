use std::{borrow::Cow, fmt::Write as _};

use crate::encoding::OutputEncoding;

use super::{
    entities::{EntityTable, predefined_entity},
    options::{PredefinedEntities, SaveOptions},
};

/// Character escaping for text content and attribute values.
///
/// Each character is examined in this order:
/// 1. a character with an [`EntityTable`] entry is always written as that entity,
/// 2. a required or optionally escaped character is written as its predefined entity,
///    or as a hexadecimal character reference if there is none or predefined entities are disabled,
/// 3. anything else is written as is.
pub struct Escaper<'a> {
    entities: &'a EntityTable,
    predefined: PredefinedEntities,
    encode_control: bool,
    encode_non_ascii: bool,
    encode_private_use: bool,
    encoding: OutputEncoding,
}

impl<'a> Escaper<'a> {
    pub fn new(entities: &'a EntityTable, options: &SaveOptions) -> Self {
        Self {
            entities,
            predefined: options.use_predefined_entities(),
            encode_control: options.encode_control(),
            encode_non_ascii: options.encode_non_ascii(),
            encode_private_use: options.encode_private_use(),
            encoding: options.encoding(),
        }
    }

    /// Escape `text`.
    ///
    /// `delimiter` is the quote surrounding an attribute value, or `None` for element content.
    /// If nothing needs escaping, `text` is returned without allocation.
    pub fn encode<'t>(&self, text: &'t str, delimiter: Option<char>) -> Cow<'t, str> {
        let Some(pos) = text
            .char_indices()
            .find_map(|(i, c)| self.needs_escape(c, delimiter).then_some(i))
        else {
            return Cow::Borrowed(text);
        };

        let mut res = String::with_capacity(text.len() + 16);
        res.push_str(&text[..pos]);
        for c in text[pos..].chars() {
            self.push_char(&mut res, c, delimiter);
        }
        Cow::Owned(res)
    }

    fn needs_escape(&self, c: char, delimiter: Option<char>) -> bool {
        self.entities.lookup(c).is_some() || self.is_required(c, delimiter) || self.is_optional(c)
    }

    fn push_char(&self, out: &mut String, c: char, delimiter: Option<char>) {
        if let Some(name) = self.entities.lookup(c) {
            write!(out, "&{name};").ok();
        } else if self.is_required(c, delimiter) || self.is_optional(c) {
            match predefined_entity(c) {
                Some(name) if self.predefined != PredefinedEntities::Never => {
                    write!(out, "&{name};").ok();
                }
                _ => {
                    write!(out, "&#x{:X};", c as u32).ok();
                }
            }
        } else {
            out.push(c);
        }
    }

    /// Characters that must be escaped to keep the output well-formed and faithful.
    fn is_required(&self, c: char, delimiter: Option<char>) -> bool {
        match c {
            '<' | '&' => true,
            // `]]>` must not appear in content
            '>' => delimiter.is_none(),
            // attribute-value normalization replaces these with spaces on reading
            '\t' | '\n' | '\r' => delimiter.is_some(),
            c if Some(c) == delimiter => true,
            c => !self.encoding.can_encode(c),
        }
    }

    fn is_optional(&self, c: char) -> bool {
        let code = c as u32;
        (self.encode_control
            && ((code < 0x20 && !matches!(c, '\t' | '\n' | '\r')) || (0x7F..=0x9F).contains(&code)))
            || (self.encode_non_ascii && code > 0x7F)
            || (self.encode_private_use
                && matches!(code, 0xE000..=0xF8FF | 0xF0000..=0xFFFFD | 0x100000..=0x10FFFD))
    }
}

/// Choose the quote for an attribute value: `"` unless the value contains one.
pub fn choose_delimiter(value: &str) -> char {
    if value.contains('"') { '\'' } else { '"' }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::EntityDecl;

    fn escaper_with<'a>(table: &'a EntityTable, options: &SaveOptions) -> Escaper<'a> {
        Escaper::new(table, options)
    }

    #[test]
    fn required_escapes_in_content() {
        let table = EntityTable::default();
        let options = SaveOptions::default();
        let esc = escaper_with(&table, &options);
        assert_eq!(esc.encode("a < b && c > d", None), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(esc.encode("\"quoted\" 'text'", None), "\"quoted\" 'text'");
        assert!(matches!(esc.encode("plain\ttext\n", None), Cow::Borrowed(_)));
    }

    #[test]
    fn attribute_values() {
        let table = EntityTable::default();
        let options = SaveOptions::default();
        let esc = escaper_with(&table, &options);
        assert_eq!(choose_delimiter("a\"b"), '\'');
        assert_eq!(choose_delimiter("a'b"), '"');
        assert_eq!(esc.encode("a\"b", Some('\'')), "a\"b");
        assert_eq!(esc.encode("a\"b'c", Some('\'')), "a\"b&apos;c");
        assert_eq!(esc.encode("x>y", Some('"')), "x>y");
        assert_eq!(esc.encode("l1\nl2\tx", Some('"')), "l1&#xA;l2&#x9;x");
    }

    #[test]
    fn predefined_policies() {
        let decls = [EntityDecl::internal("custom", "§")];
        let always = SaveOptions::default().with_predefined_entities(PredefinedEntities::Always);
        let table = EntityTable::build(&decls, true).unwrap();
        let esc = escaper_with(&table, &always);
        assert_eq!(esc.encode("<&§", None), "&lt;&amp;&custom;");
        assert_eq!(esc.encode("it's", None), "it&apos;s");

        let never = SaveOptions::default().with_predefined_entities(PredefinedEntities::Never);
        let table = EntityTable::build(&decls, false).unwrap();
        let esc = escaper_with(&table, &never);
        assert_eq!(esc.encode("<&§>", None), "&#x3C;&#x26;&custom;&#x3E;");
    }

    #[test]
    fn optional_classes() {
        let table = EntityTable::default();
        let options = SaveOptions::default()
            .with_encode_control(true)
            .with_encode_non_ascii(true);
        let esc = escaper_with(&table, &options);
        assert_eq!(esc.encode("a\u{1}b\u{85}", None), "a&#x1;b&#x85;");
        assert_eq!(esc.encode("é\n", None), "&#xE9;\n");

        let options = SaveOptions::default().with_encode_private_use(true);
        let esc = escaper_with(&table, &options);
        assert_eq!(esc.encode("\u{E000}é", None), "&#xE000;é");
    }

    #[test]
    fn unencodable_characters() {
        let table = EntityTable::default();
        let options = SaveOptions::default().with_encoding("US-ASCII").unwrap();
        let esc = escaper_with(&table, &options);
        assert_eq!(esc.encode("caf\u{E9}", None), "caf&#xE9;");
        assert_eq!(esc.encode("\u{1F600}", Some('"')), "&#x1F600;");
    }
}
