use std::borrow::Cow;

use crate::{dom::EntityDecl, error::ParseError};

/// Parsed content of a document type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctypeDecl<'a> {
    pub name: &'a str,
    pub public_id: Option<&'a str>,
    pub system_id: Option<&'a str>,
    /// Text between `[` and `]`, if present.
    pub internal_subset: Option<&'a str>,
}

fn malformed(msg: impl Into<Cow<'static, str>>) -> ParseError {
    ParseError::MalformedDoctype { msg: msg.into() }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Cursor over declaration text.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Skip blanks and return `true` if any was skipped.
    fn skip_blanks(&mut self) -> bool {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches(is_blank);
        self.pos += rest.len() - trimmed.len();
        rest.len() != trimmed.len()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn name(&mut self) -> Result<&'a str, ParseError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| is_blank(c) || matches!(c, '[' | '>' | '"' | '\'' | '%'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(malformed("a name is expected"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    /// ```text
    /// [11] SystemLiteral ::= ('"' [^"]* '"') | ("'" [^']* "'")
    /// ```
    fn quoted(&mut self) -> Result<&'a str, ParseError> {
        let rest = self.rest();
        let Some(quote) = rest.chars().next().filter(|&c| c == '"' || c == '\'') else {
            return Err(malformed("a quoted literal is expected"));
        };
        let Some(len) = rest[1..].find(quote) else {
            return Err(malformed("unterminated literal"));
        };
        self.pos += len + 2;
        Ok(&rest[1..len + 1])
    }

    /// ```text
    /// [75] ExternalID ::= 'SYSTEM' S SystemLiteral
    ///                   | 'PUBLIC' S PubidLiteral S SystemLiteral
    /// ```
    fn external_id(&mut self) -> Result<Option<(Option<&'a str>, &'a str)>, ParseError> {
        if self.eat("SYSTEM") {
            self.skip_blanks();
            return Ok(Some((None, self.quoted()?)));
        }
        if self.eat("PUBLIC") {
            self.skip_blanks();
            let public_id = self.quoted()?;
            self.skip_blanks();
            let system_id = self.quoted()?;
            return Ok(Some((Some(public_id), system_id)));
        }
        Ok(None)
    }

    /// Skip to just after the next `>` that is not inside a literal or a comment.
    fn skip_markup(&mut self) -> Result<(), ParseError> {
        if self.eat("<!--") {
            let Some(end) = self.rest().find("-->") else {
                return Err(malformed("unterminated comment"));
            };
            self.pos += end + 3;
            return Ok(());
        }
        if self.eat("<?") {
            let Some(end) = self.rest().find("?>") else {
                return Err(malformed("unterminated processing instruction"));
            };
            self.pos += end + 2;
            return Ok(());
        }
        while let Some(c) = self.rest().chars().next() {
            match c {
                '"' | '\'' => {
                    self.quoted()?;
                }
                '>' => {
                    self.pos += 1;
                    return Ok(());
                }
                c => self.pos += c.len_utf8(),
            }
        }
        Err(malformed("unterminated markup declaration"))
    }
}

/// Parse the content of `<!DOCTYPE ...>` without the surrounding delimiters.
///
/// ```text
/// [28] doctypedecl ::= '<!DOCTYPE' S Name (S ExternalID)? S? ('[' intSubset ']' S?)? '>'
/// ```
pub fn parse_doctype(content: &str) -> Result<DoctypeDecl<'_>, ParseError> {
    let mut cur = Cursor::new(content);
    cur.skip_blanks();
    let name = cur.name()?;
    cur.skip_blanks();
    let (public_id, system_id) = match cur.external_id()? {
        Some((public_id, system_id)) => (public_id, Some(system_id)),
        None => (None, None),
    };
    cur.skip_blanks();

    let mut internal_subset = None;
    if cur.eat("[") {
        let start = cur.pos;
        let Some(len) = content.rfind(']').filter(|&end| end >= start) else {
            return Err(malformed("unterminated internal subset"));
        };
        internal_subset = Some(&content[start..len]);
        cur.pos = len + 1;
        cur.skip_blanks();
    }
    if !cur.is_eof() {
        return Err(malformed(format!(
            "unexpected text after document type declaration: '{}'",
            cur.rest()
        )));
    }

    Ok(DoctypeDecl {
        name,
        public_id,
        system_id,
        internal_subset,
    })
}

/// Collect the general entity declarations of a DTD subset.
///
/// Parameter entities and every other kind of declaration are skipped.
/// Character references in entity values are expanded.
///
/// ```text
/// [70] EntityDecl ::= GEDecl | PEDecl
/// [71] GEDecl     ::= '<!ENTITY' S Name S EntityDef S? '>'
/// [73] EntityDef  ::= EntityValue | (ExternalID NDataDecl?)
/// ```
pub fn parse_entity_decls(subset: &str) -> Result<Vec<EntityDecl>, ParseError> {
    let mut res = vec![];
    let mut cur = Cursor::new(subset);
    loop {
        cur.skip_blanks();
        if cur.is_eof() {
            break;
        }
        if !cur.eat("<!ENTITY") {
            if cur.rest().starts_with('<') {
                cur.skip_markup()?;
            } else {
                // parameter entity references and stray text
                let next = cur.rest().find('<').unwrap_or(cur.rest().len());
                cur.pos += next;
            }
            continue;
        }

        if !cur.skip_blanks() {
            return Err(malformed("blank is required after '<!ENTITY'"));
        }
        if cur.eat("%") {
            cur.skip_markup()?;
            continue;
        }
        let name = cur.name()?;
        cur.skip_blanks();
        let decl = match cur.external_id()? {
            Some((public_id, system_id)) => {
                EntityDecl::external(name, public_id.map(Into::into), system_id)
            }
            None => EntityDecl::internal(name, expand_char_refs(cur.quoted()?)?),
        };
        // NDataDecl
        cur.skip_markup()?;
        res.push(decl);
    }
    Ok(res)
}

/// Replace `&#N;` and `&#xH;` in an entity value. Other references are kept.
fn expand_char_refs(value: &str) -> Result<Cow<'_, str>, ParseError> {
    if !value.contains("&#") {
        return Ok(Cow::Borrowed(value));
    }
    let mut res = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("&#") {
        res.push_str(&rest[..start]);
        let Some(end) = rest[start..].find(';') else {
            return Err(malformed("unterminated character reference"));
        };
        let digits = &rest[start + 2..start + end];
        let code = match digits.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => digits.parse(),
        }
        .map_err(|_| malformed(format!("invalid character reference '&#{digits};'")))?;
        let c = char::from_u32(code)
            .ok_or_else(|| malformed(format!("invalid character reference '&#{digits};'")))?;
        res.push(c);
        rest = &rest[start + end + 1..];
    }
    res.push_str(rest);
    Ok(Cow::Owned(res))
}
