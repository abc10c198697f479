use std::collections::HashMap;

use log::debug;

use crate::{dom::EntityDecl, error::SaveError};

/// The five entities every XML processor recognizes.
pub const PREDEFINED_ENTITIES: [(&str, char); 5] = [
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
];

/// Return the name of the predefined entity for `c`.
pub fn predefined_entity(c: char) -> Option<&'static str> {
    PREDEFINED_ENTITIES
        .iter()
        .find_map(|&(name, ch)| (ch == c).then_some(name))
}

/// Mapping from characters to the entity names that always replace them in output.
///
/// Built once per serialization call.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    declared: HashMap<char, String>,
    predefined_always: bool,
}

impl EntityTable {
    /// Build a table from document type declarations.
    ///
    /// Only entities whose replacement text is exactly one character are indexed.
    /// When two declarations replace the same character, the first one wins.
    /// If `predefined_always` is set, the five predefined entities are also looked up.
    ///
    /// # Errors
    /// [`SaveError::ConflictingEntityDefinition`] if a declaration reuses one of the
    /// predefined names for another character.
    pub fn build<'a>(
        declared: impl IntoIterator<Item = &'a EntityDecl>,
        predefined_always: bool,
    ) -> Result<Self, SaveError> {
        let mut table = HashMap::new();
        for decl in declared {
            let Some(c) = decl.single_char() else {
                continue;
            };
            if let Some(&(name, predefined)) = PREDEFINED_ENTITIES
                .iter()
                .find(|(name, _)| *name == decl.name())
            {
                if predefined != c {
                    return Err(SaveError::ConflictingEntityDefinition {
                        name: name.to_owned(),
                        predefined,
                        declared: c,
                    });
                }
            }
            // A reference to an entity replaced by markup characters cannot be re-read
            // as text, so such declarations are only honored under their predefined names.
            if matches!(c, '<' | '&') && predefined_entity(c) != Some(decl.name()) {
                continue;
            }
            table.entry(c).or_insert_with(|| decl.name().to_owned());
        }
        debug!("entity table built with {} declared entities", table.len());
        Ok(Self {
            declared: table,
            predefined_always,
        })
    }

    /// Look up the entity that replaces `c`.
    pub fn lookup(&self, c: char) -> Option<&str> {
        if let Some(name) = self.declared.get(&c) {
            return Some(name);
        }
        if self.predefined_always {
            return predefined_entity(c);
        }
        None
    }

    /// The number of indexed declared entities.
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_character_entities_only() {
        let decls = [
            EntityDecl::internal("euro", "€"),
            EntityDecl::internal("copy", "(c)"),
            EntityDecl::external("ext", None, "ext.ent"),
            EntityDecl::internal("eur", "€"),
        ];
        let table = EntityTable::build(&decls, false).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup('€'), Some("euro"));
        assert_eq!(table.lookup('c'), None);
        assert_eq!(table.lookup('<'), None);
    }

    #[test]
    fn predefined_lookup_follows_policy() {
        let always = EntityTable::build([], true).unwrap();
        assert_eq!(always.lookup('\''), Some("apos"));
        assert_eq!(always.lookup('&'), Some("amp"));
        let as_needed = EntityTable::build([], false).unwrap();
        assert_eq!(as_needed.lookup('\''), None);
    }

    #[test]
    fn redefinition_of_predefined_names() {
        let same = [EntityDecl::internal("gt", ">")];
        assert!(EntityTable::build(&same, false).is_ok());

        let conflict = [EntityDecl::internal("quot", "'")];
        let err = EntityTable::build(&conflict, false).unwrap_err();
        assert!(matches!(
            err,
            SaveError::ConflictingEntityDefinition { ref name, predefined: '"', declared: '\'' }
                if name == "quot"
        ));
    }

    #[test]
    fn markup_characters_need_predefined_names() {
        let decls = [EntityDecl::internal("less", "<"), EntityDecl::internal("lt", "<")];
        let table = EntityTable::build(&decls, false).unwrap();
        assert_eq!(table.lookup('<'), Some("lt"));
    }
}
