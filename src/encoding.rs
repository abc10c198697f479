//! Output character sets.
//!
//! Serialized text is built in UTF-8 and transcoded when it leaves the buffer.
//! `encoding_rs` does not provide UTF-16 encoders, so UTF-16 output is produced here.

use std::{borrow::Cow, str::FromStr};

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, mem::encode_latin1_lossy};

use crate::error::SaveError;

/// A character set that the serializer can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    #[default]
    UTF8,
    UTF16LE,
    UTF16BE,
    /// `US-ASCII`. encoding_rs treats this label as windows-1252, which is not what XML means.
    ASCII,
    /// `ISO-8859-1`. encoding_rs treats this label as windows-1252 too.
    ISO8859_1,
    /// Any other encoding known to encoding_rs.
    Other(&'static Encoding),
}

impl OutputEncoding {
    /// Resolve an encoding label such as `"UTF-8"`, `"utf-16"` or `"Shift_JIS"`.
    ///
    /// `UTF-16` without byte order means little endian.
    /// Return `None` if the label is unknown or names the decode-only replacement encoding.
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim();
        let upper = label.to_ascii_uppercase();
        match upper.as_str() {
            "US-ASCII" | "ASCII" => return Some(Self::ASCII),
            "ISO-8859-1" | "ISO-LATIN-1" | "ISO LATIN 1" | "LATIN1" => {
                return Some(Self::ISO8859_1);
            }
            "UTF16" => return Some(Self::UTF16LE),
            "UTF8" => return Some(Self::UTF8),
            _ => {}
        }

        match Encoding::for_label_no_replacement(label.as_bytes())? {
            enc if enc == UTF_8 => Some(Self::UTF8),
            enc if enc == UTF_16LE => Some(Self::UTF16LE),
            enc if enc == UTF_16BE => Some(Self::UTF16BE),
            enc => Some(Self::Other(enc)),
        }
    }

    /// The canonical name of this encoding.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UTF8 => "UTF-8",
            Self::UTF16LE => "UTF-16LE",
            Self::UTF16BE => "UTF-16BE",
            Self::ASCII => "US-ASCII",
            Self::ISO8859_1 => "ISO-8859-1",
            Self::Other(enc) => enc.name(),
        }
    }

    /// Return the byte order mark of this encoding.
    ///
    /// Encodings without a byte order mark return an empty slice.
    pub fn bom(&self) -> &'static [u8] {
        match self {
            Self::UTF8 => &[0xEF, 0xBB, 0xBF],
            Self::UTF16LE => &[0xFF, 0xFE],
            Self::UTF16BE => &[0xFE, 0xFF],
            _ => &[],
        }
    }

    /// Check if `c` can be written in this encoding without a character reference.
    pub fn can_encode(&self, c: char) -> bool {
        match self {
            Self::UTF8 | Self::UTF16LE | Self::UTF16BE => true,
            Self::ASCII => c.is_ascii(),
            Self::ISO8859_1 => (c as u32) <= 0xFF,
            Self::Other(enc) => {
                if c.is_ascii() && enc.is_ascii_compatible() {
                    return true;
                }
                let mut buf = [0; 4];
                let (_, _, unmappable) = enc.encode(c.encode_utf8(&mut buf));
                !unmappable
            }
        }
    }

    /// Transcode `src` and append the result to `dst`.
    ///
    /// Characters must have been checked with [`OutputEncoding::can_encode`] in advance.
    /// Unmappable characters are written as decimal character references as a last resort.
    pub fn encode_str(&self, src: &str, dst: &mut Vec<u8>) {
        match self {
            Self::UTF8 => dst.extend_from_slice(src.as_bytes()),
            Self::UTF16LE => dst.extend(src.encode_utf16().flat_map(u16::to_le_bytes)),
            Self::UTF16BE => dst.extend(src.encode_utf16().flat_map(u16::to_be_bytes)),
            Self::ASCII | Self::ISO8859_1 => {
                let limit = if matches!(self, Self::ASCII) { 0x7F } else { 0xFF };
                let src = if src.chars().all(|c| (c as u32) <= limit) {
                    Cow::Borrowed(src)
                } else {
                    Cow::Owned(src.chars().fold(String::new(), |mut s, c| {
                        if (c as u32) <= limit {
                            s.push(c);
                        } else {
                            s.push_str(&format!("&#{};", c as u32));
                        }
                        s
                    }))
                };
                dst.extend_from_slice(&encode_latin1_lossy(&src));
            }
            Self::Other(enc) => {
                let (bytes, _, _) = enc.encode(src);
                dst.extend_from_slice(&bytes);
            }
        }
    }
}

impl FromStr for OutputEncoding {
    type Err = SaveError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::for_label(label).ok_or_else(|| SaveError::UnknownEncoding {
            label: label.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_resolution() {
        assert_eq!(OutputEncoding::for_label("utf-8"), Some(OutputEncoding::UTF8));
        assert_eq!(OutputEncoding::for_label("UTF-16"), Some(OutputEncoding::UTF16LE));
        assert_eq!(
            OutputEncoding::for_label("UTF-16BE"),
            Some(OutputEncoding::UTF16BE)
        );
        assert_eq!(OutputEncoding::for_label("us-ascii"), Some(OutputEncoding::ASCII));
        assert_eq!(
            OutputEncoding::for_label("Shift_JIS").map(|enc| enc.name()),
            Some("Shift_JIS")
        );
        assert_eq!(OutputEncoding::for_label("no-such-encoding"), None);
        assert!("bogus".parse::<OutputEncoding>().is_err());
    }

    #[test]
    fn byte_order_marks() {
        assert_eq!(OutputEncoding::UTF8.bom(), b"\xEF\xBB\xBF");
        assert_eq!(OutputEncoding::UTF16LE.bom(), b"\xFF\xFE");
        assert_eq!(OutputEncoding::UTF16BE.bom(), b"\xFE\xFF");
        assert!(OutputEncoding::ASCII.bom().is_empty());
    }

    #[test]
    fn representable_characters() {
        assert!(OutputEncoding::UTF8.can_encode('€'));
        assert!(!OutputEncoding::ASCII.can_encode('é'));
        assert!(OutputEncoding::ISO8859_1.can_encode('é'));
        assert!(!OutputEncoding::ISO8859_1.can_encode('€'));
        let cp1252 = OutputEncoding::for_label("windows-1252").unwrap();
        assert!(cp1252.can_encode('€'));
        assert!(!cp1252.can_encode('あ'));
    }

    #[test]
    fn transcoding() {
        let mut out = vec![];
        OutputEncoding::UTF16BE.encode_str("a€", &mut out);
        assert_eq!(out, [0x00, 0x61, 0x20, 0xAC]);

        out.clear();
        OutputEncoding::UTF16LE.encode_str("a", &mut out);
        assert_eq!(out, [0x61, 0x00]);

        out.clear();
        OutputEncoding::ISO8859_1.encode_str("é", &mut out);
        assert_eq!(out, [0xE9]);
    }
}
