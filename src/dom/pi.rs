use std::{cell::RefCell, rc::Rc};

use super::{
    DOMException, NodeType, check_no_modification_allowed_err,
    document::{DocumentRef, DocumentWeakRef},
    node::{Node, NodeConnection, NodeRef, NodeWeakRef},
};

/// Implementation of [ProcessingInstruction](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1004215813)
/// interface on [1.5 Extended Interfaces: XML Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E067D597)
pub struct ProcessingInstruction {
    parent_node: Option<NodeWeakRef>,
    owner_document: DocumentWeakRef,
    /// Implementation of `target` attribute for `ProcessingInstruction`.
    /// as same as `nodeName` for `Node`.
    target: Rc<str>,
    /// Implementation of `data` attribute for `ProcessingInstruction`.
    data: Option<Rc<str>>,
}

/// Wrapper of `Rc<RefCell<ProcessingInstruction>>`.
#[derive(Clone)]
pub struct ProcessingInstructionRef(pub(super) Rc<RefCell<ProcessingInstruction>>);

impl ProcessingInstructionRef {
    /// Create new [`ProcessingInstructionRef`] whose ownerDocument is `doc`.
    ///
    /// This method does not validate `target`.
    pub(super) fn from_doc(doc: &DocumentRef, target: Rc<str>, data: Option<Rc<str>>) -> Self {
        Self(Rc::new(RefCell::new(ProcessingInstruction {
            parent_node: None,
            owner_document: doc.downgrade(),
            target,
            data,
        })))
    }

    /// Implementation of `target` attribute.
    ///
    /// # Specification
    /// ```text
    /// target of type DOMString, readonly
    ///     The target of this processing instruction. XML defines this as being the first
    ///     token following the markup that begins the processing instruction.
    /// ```
    pub fn target(&self) -> Rc<str> {
        self.0.borrow().target.clone()
    }

    /// Implementation of `data` attribute.
    ///
    /// # Specification
    /// ```text
    /// data of type DOMString
    ///     The content of this processing instruction. This is from the first non white
    ///     space character after the target to the character immediately preceding the ?>.
    /// ```
    pub fn data(&self) -> Option<Rc<str>> {
        self.0.borrow().data.clone()
    }

    /// Implementation of `data` attribute.
    pub fn set_data(&mut self, value: impl Into<Rc<str>>) -> Result<(), DOMException> {
        check_no_modification_allowed_err(&*self)?;
        self.0.borrow_mut().data = Some(value.into());
        Ok(())
    }
}

impl Node for ProcessingInstructionRef {
    fn node_name(&self) -> Rc<str> {
        self.target()
    }

    fn node_value(&self) -> Option<Rc<str>> {
        self.data()
    }

    fn node_type(&self) -> NodeType {
        NodeType::ProcessingInstruction
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

    fn is_same_node(&self, other: &NodeRef) -> bool {
        matches!(other, NodeRef::ProcessingInstruction(other) if Rc::ptr_eq(&self.0, &other.0))
    }
}

impl NodeConnection for ProcessingInstructionRef {
    fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef> {
        let new_parent = new_parent.and_then(|par| par.downgrade());
        std::mem::replace(&mut self.0.borrow_mut().parent_node, new_parent)
            .and_then(|old| old.upgrade())
    }
}
