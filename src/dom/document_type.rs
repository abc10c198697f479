use std::{cell::RefCell, rc::Rc};

use super::{
    DOMException, NodeType, check_no_modification_allowed_err,
    document::{DocumentRef, DocumentWeakRef},
    entity::EntityDecl,
    node::{Node, NodeConnection, NodeRef, NodeWeakRef},
};

/// Implementation of [DocumentType](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-412266927)
/// interface on [1.5 Extended Interfaces: XML Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E067D597)
pub struct DocumentType {
    parent_node: Option<NodeWeakRef>,
    owner_document: DocumentWeakRef,

    /// Implementation of `name` attribute.
    name: Rc<str>,
    /// Implementation of `publicId` attribute.
    public_id: Option<Rc<str>>,
    /// Implementation of `systemId` attribute.
    system_id: Option<Rc<str>>,
    /// Implementation of `internalSubset` attribute.
    internal_subset: Option<Rc<str>>,
    /// General entities declared in the internal and external subsets, in declaration order.
    entities: Vec<EntityDecl>,
}

/// Wrapper of `Rc<RefCell<DocumentType>>`.
#[derive(Clone)]
pub struct DocumentTypeRef(pub(super) Rc<RefCell<DocumentType>>);

impl DocumentTypeRef {
    pub(super) fn from_doc(
        doc: &DocumentRef,
        name: Rc<str>,
        public_id: Option<Rc<str>>,
        system_id: Option<Rc<str>>,
    ) -> Self {
        Self(Rc::new(RefCell::new(DocumentType {
            parent_node: None,
            owner_document: doc.downgrade(),
            name,
            public_id,
            system_id,
            internal_subset: None,
            entities: vec![],
        })))
    }

    /// Implementation of `name` attribute.
    ///
    /// # Specification
    /// ```text
    /// name of type DOMString, readonly
    ///     The name of DTD; i.e., the name immediately following the DOCTYPE keyword.
    /// ```
    pub fn name(&self) -> Rc<str> {
        self.0.borrow().name.clone()
    }

    /// Implementation of `publicId` attribute.
    pub fn public_id(&self) -> Option<Rc<str>> {
        self.0.borrow().public_id.clone()
    }

    /// Implementation of `systemId` attribute.
    pub fn system_id(&self) -> Option<Rc<str>> {
        self.0.borrow().system_id.clone()
    }

    /// Implementation of `internalSubset` attribute.
    ///
    /// # Specification
    /// ```text
    /// internalSubset of type DOMString, readonly
    ///     The internal subset as a string, or null if there is none.
    ///     This is does not contain the delimiting square brackets.
    /// ```
    pub fn internal_subset(&self) -> Option<Rc<str>> {
        self.0.borrow().internal_subset.clone()
    }

    pub fn set_internal_subset(&mut self, subset: Option<Rc<str>>) -> Result<(), DOMException> {
        check_no_modification_allowed_err(&*self)?;
        self.0.borrow_mut().internal_subset = subset;
        Ok(())
    }

    /// Snapshot of the declared general entities.
    pub fn entities(&self) -> Vec<EntityDecl> {
        self.0.borrow().entities.clone()
    }

    pub fn get_entity(&self, name: &str) -> Option<EntityDecl> {
        self.0
            .borrow()
            .entities
            .iter()
            .find(|ent| ent.name() == name)
            .cloned()
    }

    /// Add an entity declaration.
    ///
    /// As in XML, the first declaration of a name is binding,
    /// so a redeclaration is silently ignored and `Ok(false)` is returned.
    pub fn add_entity(&mut self, entity: EntityDecl) -> Result<bool, DOMException> {
        check_no_modification_allowed_err(&*self)?;
        let mut doctype = self.0.borrow_mut();
        if doctype.entities.iter().any(|ent| ent.name() == entity.name()) {
            return Ok(false);
        }
        doctype.entities.push(entity);
        Ok(true)
    }
}

impl Node for DocumentTypeRef {
    fn node_name(&self) -> Rc<str> {
        self.name()
    }

    fn node_type(&self) -> NodeType {
        NodeType::DocumentType
    }

    fn parent_node(&self) -> Option<NodeRef> {
        self.0
            .borrow()
            .parent_node
            .as_ref()
            .and_then(|par| par.upgrade())
    }

    fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    fn text_content(&self) -> Option<String> {
        None
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        matches!(other, NodeRef::DocumentType(other) if Rc::ptr_eq(&self.0, &other.0))
    }
}

impl NodeConnection for DocumentTypeRef {
    fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef> {
        let new_parent = new_parent.and_then(|par| par.downgrade());
        std::mem::replace(&mut self.0.borrow_mut().parent_node, new_parent)
            .and_then(|old| old.upgrade())
    }
}
