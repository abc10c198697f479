use std::{cell::RefCell, rc::Rc};

use super::{
    DOMException, XML_NS_NAMESPACE,
    document::{DocumentRef, DocumentWeakRef},
    element::{ElementRef, ElementWeakRef},
    split_qname2,
};

/// Implementation of [Attr](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-637646024)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// Attributes are not part of the document tree, so they are not [`NodeRef`](super::node::NodeRef)s.
/// The value is kept as a flat string; entity references are always expanded.
pub struct Attr {
    owner_document: DocumentWeakRef,
    /// Implementation of `ownerElement` attribute of `Attr`.
    owner_element: Option<ElementWeakRef>,

    /// Implementation of `name` attribute of `Attr`.
    /// as same as `nodeName` for `Node`.
    name: Rc<str>,
    /// Implementation of `namespaceURI` for `Node`.
    namespace_uri: Option<Rc<str>>,
    /// Implementation of `prefix` for `Node`.
    prefix: Option<Rc<str>>,
    /// Implementation of `localName` for `Node`.
    local_name: Rc<str>,
    /// Implementation of `value` attribute of `Attr`.
    value: String,
}

/// Wrapper of `Rc<RefCell<Attr>>`.
#[derive(Clone)]
pub struct AttrRef(pub(super) Rc<RefCell<Attr>>);

impl AttrRef {
    /// Create new [`AttrRef`].
    ///
    /// `name` must already be validated by the caller.
    pub(super) fn new(
        doc: &DocumentRef,
        name: Rc<str>,
        ns_uri: Option<Rc<str>>,
        value: String,
    ) -> Self {
        let (prefix, local_name) = match (ns_uri.is_some(), split_qname2(&name)) {
            (true, Some((prefix, local))) => (Some(prefix.into()), local.into()),
            _ => (None, name.clone()),
        };
        Self(Rc::new(RefCell::new(Attr {
            owner_document: doc.downgrade(),
            owner_element: None,
            name,
            namespace_uri: ns_uri,
            prefix,
            local_name,
            value,
        })))
    }

    /// Implementation of `name` attribute of `Attr`.
    pub fn name(&self) -> Rc<str> {
        self.0.borrow().name.clone()
    }

    /// Implementation of `value` attribute of `Attr`.
    pub fn value(&self) -> String {
        self.0.borrow().value.clone()
    }

    /// Borrow the value without copying it.
    pub fn with_value<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.0.borrow().value)
    }

    /// Implementation of `value` attribute of `Attr`.
    ///
    /// # Errors
    /// `NO_MODIFICATION_ALLOWED_ERR` when the owner document is read-only.
    pub fn set_value(&mut self, value: impl Into<String>) -> Result<(), DOMException> {
        if self.owner_document().is_some_and(|doc| doc.is_read_only()) {
            return Err(DOMException::NoModificationAllowedErr);
        }
        self.0.borrow_mut().value = value.into();
        Ok(())
    }

    pub fn namespace_uri(&self) -> Option<Rc<str>> {
        self.0.borrow().namespace_uri.clone()
    }

    pub fn prefix(&self) -> Option<Rc<str>> {
        self.0.borrow().prefix.clone()
    }

    pub fn local_name(&self) -> Rc<str> {
        self.0.borrow().local_name.clone()
    }

    /// Implementation of `ownerElement` attribute of `Attr`.
    pub fn owner_element(&self) -> Option<ElementRef> {
        self.0
            .borrow()
            .owner_element
            .as_ref()
            .and_then(|elem| elem.upgrade())
    }

    pub(super) fn set_owner_element(&mut self, elem: Option<&ElementRef>) {
        self.0.borrow_mut().owner_element = elem.map(|elem| elem.downgrade());
    }

    pub fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    /// Check if this attribute is `xmlns` or `xmlns:*`.
    pub fn is_namespace_declaration(&self) -> bool {
        self.0.borrow().namespace_uri.as_deref() == Some(XML_NS_NAMESPACE)
    }

    /// If this is a namespace declaration, return the declared prefix.
    ///
    /// `Some(None)` means the default namespace declaration (`xmlns`).
    pub fn declared_prefix(&self) -> Option<Option<Rc<str>>> {
        let attr = self.0.borrow();
        if attr.namespace_uri.as_deref() != Some(XML_NS_NAMESPACE) {
            return None;
        }
        match attr.prefix.as_deref() {
            Some("xmlns") => Some(Some(attr.local_name.clone())),
            _ => Some(None),
        }
    }

    pub fn is_same_attr(&self, other: &AttrRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
