use std::rc::Rc;

/// A general entity declared in a document type.
///
/// Internal entities carry their replacement text in `value`.
/// External entities only carry identifiers and have no `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    name: Rc<str>,
    value: Option<Rc<str>>,
    public_id: Option<Rc<str>>,
    system_id: Option<Rc<str>>,
}

impl EntityDecl {
    /// Declare an internal entity `<!ENTITY name "value">`.
    pub fn internal(name: impl Into<Rc<str>>, value: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            public_id: None,
            system_id: None,
        }
    }

    /// Declare an external parsed entity.
    pub fn external(
        name: impl Into<Rc<str>>,
        public_id: Option<Rc<str>>,
        system_id: impl Into<Rc<str>>,
    ) -> Self {
        Self {
            name: name.into(),
            value: None,
            public_id,
            system_id: Some(system_id.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The replacement text of an internal entity.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// If the replacement text is exactly one character, return it.
    pub fn single_char(&self) -> Option<char> {
        let mut chars = self.value()?.chars();
        let c = chars.next()?;
        chars.next().is_none().then_some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_char_replacement() {
        assert_eq!(EntityDecl::internal("euro", "€").single_char(), Some('€'));
        assert_eq!(EntityDecl::internal("two", "ab").single_char(), None);
        assert_eq!(EntityDecl::internal("none", "").single_char(), None);
        assert_eq!(
            EntityDecl::external("ext", None, "ext.xml").single_char(),
            None
        );
    }
}
