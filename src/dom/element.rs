use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use super::{
    DOMException, NodeType, XML_NS_NAMESPACE, XML_XML_NAMESPACE,
    attr::AttrRef,
    check_no_modification_allowed_err,
    document::{DocumentRef, DocumentWeakRef},
    node::{Node, NodeConnection, NodeRef, NodeWeakRef, check_insertion, detach},
    validate_name, validate_qualified_name,
};

/// Implementation of [Element](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-745549614)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
pub struct Element {
    parent_node: Option<NodeWeakRef>,
    children: Vec<NodeRef>,
    owner_document: DocumentWeakRef,

    /// Implementation of `tagName` attribute for `Element`.
    /// as same as `nodeName` for `Node`.
    tag_name: Rc<str>,
    /// Implementation of `namespaceURI` for `Node`.
    namespace_uri: Option<Rc<str>>,
    /// Implementation of `prefix` for `Node`.
    prefix: Option<Rc<str>>,
    /// Implementation of `localName` for `Node`.
    local_name: Rc<str>,
    /// Attributes in insertion order.
    attributes: Vec<AttrRef>,
}

/// Wrapper of `Rc<RefCell<Element>>`.
#[derive(Clone)]
pub struct ElementRef(pub(super) Rc<RefCell<Element>>);

impl ElementRef {
    /// Create new [`ElementRef`] whose ownerDocument is `doc`.
    ///
    /// This method does not validate any names.
    pub(super) fn from_doc(
        doc: &DocumentRef,
        tag_name: Rc<str>,
        namespace_uri: Option<Rc<str>>,
        prefix: Option<Rc<str>>,
        local_name: Rc<str>,
    ) -> Self {
        Self(Rc::new(RefCell::new(Element {
            parent_node: None,
            children: vec![],
            owner_document: doc.downgrade(),
            tag_name,
            namespace_uri,
            prefix,
            local_name,
            attributes: vec![],
        })))
    }

    /// Generate [`ElementWeakRef`] from `self`.
    pub fn downgrade(&self) -> ElementWeakRef {
        ElementWeakRef(Rc::downgrade(&self.0))
    }

    /// Implementation of `tagName` attribute.
    pub fn tag_name(&self) -> Rc<str> {
        self.0.borrow().tag_name.clone()
    }

    /// Snapshot of the attribute list in insertion order.
    pub fn attributes(&self) -> Vec<AttrRef> {
        self.0.borrow().attributes.clone()
    }

    pub fn has_attributes(&self) -> bool {
        !self.0.borrow().attributes.is_empty()
    }

    /// Implementation of `getAttributeNode` method.
    pub fn get_attribute_node(&self, name: &str) -> Option<AttrRef> {
        self.0
            .borrow()
            .attributes
            .iter()
            .find(|attr| &*attr.name() == name)
            .cloned()
    }

    /// Implementation of `getAttribute` method.
    ///
    /// Unlike the specification, missing attributes are reported as `None`
    /// instead of an empty string.
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.get_attribute_node(name).map(|attr| attr.value())
    }

    /// Implementation of `getAttributeNodeNS` method.
    pub fn get_attribute_node_ns(
        &self,
        namespace_uri: Option<&str>,
        local_name: &str,
    ) -> Option<AttrRef> {
        let namespace_uri = namespace_uri.filter(|uri| !uri.is_empty());
        self.0
            .borrow()
            .attributes
            .iter()
            .find(|attr| {
                attr.namespace_uri().as_deref() == namespace_uri
                    && &*attr.local_name() == local_name
            })
            .cloned()
    }

    /// Implementation of `getAttributeNS` method.
    pub fn get_attribute_ns(&self, namespace_uri: Option<&str>, local_name: &str) -> Option<String> {
        self.get_attribute_node_ns(namespace_uri, local_name)
            .map(|attr| attr.value())
    }

    /// Implementation of `hasAttribute` method.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute_node(name).is_some()
    }

    /// Implementation of `setAttribute` method.
    ///
    /// `xmlns` and `xmlns:*` are bound to the XMLNS namespace,
    /// so they are recognized as namespace declarations.
    ///
    /// # Errors
    /// - `INVALID_CHARACTER_ERR`: `name` is not an XML name.
    /// - `NO_MODIFICATION_ALLOWED_ERR`: the owner document is read-only.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DOMException> {
        if name == "xmlns" || name.starts_with("xmlns:") {
            return self.set_attribute_ns(Some(XML_NS_NAMESPACE), name, value);
        }
        validate_name(name)?;
        check_no_modification_allowed_err(&*self)?;
        if let Some(mut attr) = self.get_attribute_node(name) {
            return attr.set_value(value);
        }
        let doc = self.owner_document().ok_or(DOMException::WrongDocumentErr)?;
        self.push_attribute(AttrRef::new(&doc, name.into(), None, value.into()));
        Ok(())
    }

    /// Implementation of `setAttributeNS` method.
    ///
    /// # Errors
    /// - `INVALID_CHARACTER_ERR`: `qualified_name` is not an XML name.
    /// - `NAMESPACE_ERR`: `qualified_name` and `namespace_uri` violate the Namespaces in XML.
    /// - `NO_MODIFICATION_ALLOWED_ERR`: the owner document is read-only.
    pub fn set_attribute_ns(
        &mut self,
        namespace_uri: Option<&str>,
        qualified_name: &str,
        value: impl Into<String>,
    ) -> Result<(), DOMException> {
        let (_, local_name) = validate_qualified_name(namespace_uri, qualified_name)?;
        check_no_modification_allowed_err(&*self)?;
        let namespace_uri = namespace_uri.filter(|uri| !uri.is_empty());
        if let Some(mut attr) = self.get_attribute_node_ns(namespace_uri, local_name) {
            return attr.set_value(value);
        }
        let doc = self.owner_document().ok_or(DOMException::WrongDocumentErr)?;
        let attr = AttrRef::new(
            &doc,
            qualified_name.into(),
            namespace_uri.map(Rc::from),
            value.into(),
        );
        self.push_attribute(attr);
        Ok(())
    }

    fn push_attribute(&mut self, mut attr: AttrRef) {
        attr.set_owner_element(Some(self));
        self.0.borrow_mut().attributes.push(attr);
    }

    /// Implementation of `removeAttribute` method.
    ///
    /// Removing a missing attribute is not an error.
    pub fn remove_attribute(&mut self, name: &str) -> Result<(), DOMException> {
        check_no_modification_allowed_err(&*self)?;
        let removed = {
            let mut elem = self.0.borrow_mut();
            elem.attributes
                .iter()
                .position(|attr| &*attr.name() == name)
                .map(|pos| elem.attributes.remove(pos))
        };
        if let Some(mut attr) = removed {
            attr.set_owner_element(None);
        }
        Ok(())
    }

    /// Implementation of `lookupNamespaceURI` method.
    ///
    /// `None` as `prefix` looks up the default namespace.
    /// An empty `xmlns=""` undeclaration stops the lookup.
    pub fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<Rc<str>> {
        match prefix {
            Some("xml") => return Some(XML_XML_NAMESPACE.into()),
            Some("xmlns") => return Some(XML_NS_NAMESPACE.into()),
            _ => {}
        }

        let mut current = Some(self.clone());
        while let Some(elem) = current {
            if let Some(uri) = elem.namespace_uri() {
                if elem.prefix().as_deref() == prefix {
                    return Some(uri);
                }
            }
            for attr in elem.attributes() {
                if let Some(declared) = attr.declared_prefix() {
                    if declared.as_deref() == prefix {
                        let value = attr.value();
                        return (!value.is_empty()).then(|| value.into());
                    }
                }
            }
            current = elem.parent_node().and_then(|par| par.as_element());
        }
        None
    }

    /// Snapshot of child elements.
    pub fn child_elements(&self) -> Vec<ElementRef> {
        self.0
            .borrow()
            .children
            .iter()
            .filter_map(|child| child.as_element())
            .collect()
    }
}

impl Node for ElementRef {
    fn node_name(&self) -> Rc<str> {
        self.tag_name()
    }

    fn node_type(&self) -> NodeType {
        NodeType::Element
    }

    fn parent_node(&self) -> Option<NodeRef> {
        self.0
            .borrow()
            .parent_node
            .as_ref()
            .and_then(|par| par.upgrade())
    }

    fn child_nodes(&self) -> Vec<NodeRef> {
        self.0.borrow().children.clone()
    }

    fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    fn first_child(&self) -> Option<NodeRef> {
        self.0.borrow().children.first().cloned()
    }

    fn last_child(&self) -> Option<NodeRef> {
        self.0.borrow().children.last().cloned()
    }

    fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    fn namespace_uri(&self) -> Option<Rc<str>> {
        self.0.borrow().namespace_uri.clone()
    }

    fn prefix(&self) -> Option<Rc<str>> {
        self.0.borrow().prefix.clone()
    }

    fn local_name(&self) -> Option<Rc<str>> {
        Some(self.0.borrow().local_name.clone())
    }

    fn text_content(&self) -> Option<String> {
        let mut content = String::new();
        for child in self.child_nodes() {
            match child {
                NodeRef::Element(elem) => {
                    content.extend(elem.text_content());
                }
                NodeRef::Text(text) => text.with_data(|data| content.push_str(data)),
                NodeRef::CDATASection(cdata) => cdata.with_data(|data| content.push_str(data)),
                _ => {}
            }
        }
        Some(content)
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        matches!(other, NodeRef::Element(other) if Rc::ptr_eq(&self.0, &other.0))
    }

    fn insert_before(
        &mut self,
        new_child: NodeRef,
        ref_child: Option<NodeRef>,
    ) -> Result<NodeRef, DOMException> {
        if ref_child
            .as_ref()
            .is_some_and(|ref_child| new_child.is_same_node(ref_child))
        {
            return Ok(new_child);
        }
        let this = NodeRef::Element(self.clone());
        let children = self.child_nodes();
        check_insertion(&this, &children, &new_child, ref_child.as_ref())?;

        detach(&new_child)?;
        // The index may be shifted if `new_child` was a child of this element.
        let index = check_insertion(&this, &self.child_nodes(), &new_child, ref_child.as_ref())?;
        self.0.borrow_mut().children.insert(index, new_child.clone());
        let mut child = new_child.clone();
        child.set_parent_node(Some(this));
        Ok(new_child)
    }

    fn remove_child(&mut self, mut old_child: NodeRef) -> Result<NodeRef, DOMException> {
        check_no_modification_allowed_err(&*self)?;
        let removed = {
            let mut elem = self.0.borrow_mut();
            let pos = elem
                .children
                .iter()
                .position(|child| child.is_same_node(&old_child))
                .ok_or(DOMException::NotFoundErr)?;
            elem.children.remove(pos)
        };
        old_child.set_parent_node(None);
        Ok(removed)
    }
}

impl NodeConnection for ElementRef {
    fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef> {
        let new_parent = new_parent.and_then(|par| par.downgrade());
        std::mem::replace(&mut self.0.borrow_mut().parent_node, new_parent)
            .and_then(|old| old.upgrade())
    }
}

/// Wrapper of `Weak<RefCell<Element>>`.
#[derive(Clone)]
pub struct ElementWeakRef(Weak<RefCell<Element>>);

impl ElementWeakRef {
    /// Generate [`ElementRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<ElementRef> {
        self.0.upgrade().map(ElementRef)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::character_data::CharacterData;

    fn sample() -> (DocumentRef, ElementRef) {
        let mut doc = DocumentRef::new();
        let root = doc.create_element("root").unwrap();
        doc.append_child(root.clone().into()).unwrap();
        (doc, root)
    }

    #[test]
    fn attribute_accessors() {
        let (_doc, mut root) = sample();
        root.set_attribute("b", "1").unwrap();
        root.set_attribute("a", "2").unwrap();
        root.set_attribute("b", "3").unwrap();
        let names = root
            .attributes()
            .iter()
            .map(|attr| attr.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(root.get_attribute("b").as_deref(), Some("3"));
        root.remove_attribute("b").unwrap();
        assert!(!root.has_attribute("b"));
        assert_eq!(
            root.set_attribute("1bad", "x"),
            Err(DOMException::InvalidCharacterErr)
        );
    }

    #[test]
    fn namespace_lookup() {
        let (doc, mut root) = sample();
        root.set_attribute("xmlns:p", "urn:p").unwrap();
        let mut child = doc.create_element_ns(Some("urn:q"), "q:child").unwrap();
        root.append_child(child.clone().into()).unwrap();
        assert_eq!(child.lookup_namespace_uri(Some("p")).as_deref(), Some("urn:p"));
        assert_eq!(child.lookup_namespace_uri(Some("q")).as_deref(), Some("urn:q"));
        assert_eq!(child.lookup_namespace_uri(None), None);

        child.set_attribute("xmlns", "").unwrap();
        root.set_attribute("xmlns", "urn:default").unwrap();
        assert_eq!(root.lookup_namespace_uri(None).as_deref(), Some("urn:default"));
        assert_eq!(child.lookup_namespace_uri(None), None);
    }

    #[test]
    fn tree_mutation() {
        let (doc, mut root) = sample();
        let a = doc.create_element("a").unwrap();
        let b = doc.create_text_node("b");
        root.append_child(b.clone().into()).unwrap();
        root.insert_before(a.clone().into(), Some(b.clone().into()))
            .unwrap();
        assert_eq!(root.child_count(), 2);
        assert!(root.first_child().unwrap().is_same_node(&a.clone().into()));
        assert!(a.next_sibling().unwrap().is_same_node(&b.clone().into()));

        // moving an existing child
        root.append_child(a.clone().into()).unwrap();
        assert!(root.last_child().unwrap().is_same_node(&a.clone().into()));
        assert_eq!(root.child_count(), 2);

        // cycles are rejected
        let mut a_mut = a.clone();
        assert_eq!(
            a_mut.append_child(root.clone().into()).err(),
            Some(DOMException::HierarchyRequestErr)
        );

        root.remove_child(b.clone().into()).unwrap();
        assert!(b.parent_node().is_none());
        assert_eq!(root.text_content().as_deref(), Some(""));
        let mut b = b;
        b.set_data("text").unwrap();
        a_mut.append_child(b.into()).unwrap();
        assert_eq!(root.text_content().as_deref(), Some("text"));
    }

    #[test]
    fn wrong_document() {
        let (_doc, mut root) = sample();
        let other = DocumentRef::new();
        let foreign = other.create_element("foreign").unwrap();
        assert_eq!(
            root.append_child(foreign.into()).err(),
            Some(DOMException::WrongDocumentErr)
        );
    }

    #[test]
    fn read_only_document() {
        let (mut doc, mut root) = sample();
        let text = doc.create_text_node("x");
        doc.set_read_only(true);
        assert_eq!(
            root.set_attribute("a", "b"),
            Err(DOMException::NoModificationAllowedErr)
        );
        assert_eq!(
            root.append_child(text.into()).err(),
            Some(DOMException::NoModificationAllowedErr)
        );
    }
}
