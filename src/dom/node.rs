use std::rc::Rc;

use super::{
    DOMException, NodeType,
    character_data::{CDATASectionRef, CommentRef, TextRef},
    check_no_modification_allowed_err, check_owner_document_sameness, check_vertical_hierarchy,
    document::{DocumentRef, DocumentWeakRef},
    document_type::DocumentTypeRef,
    element::{ElementRef, ElementWeakRef},
    pi::ProcessingInstructionRef,
};

/// Implementation of [Node](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1950641247)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// Actual node representations are implemented as `NodeRef` and `NodeWeakRef`.
#[allow(private_bounds)]
pub trait Node: NodeConnection {
    /// Implementation of `nodeName` attribute.
    fn node_name(&self) -> Rc<str>;
    /// Implementation of `nodeValue` attribute.
    fn node_value(&self) -> Option<Rc<str>> {
        None
    }
    /// Implementation of `nodeType` attribute.
    fn node_type(&self) -> NodeType;
    /// Implementation of `parentNode` attribute.
    fn parent_node(&self) -> Option<NodeRef> {
        None
    }
    /// Implementation of `childNodes` attribute.
    ///
    /// The specification requires that this method returns a `NodeList`,
    /// but this method returns a snapshot as [`Vec`].
    fn child_nodes(&self) -> Vec<NodeRef> {
        vec![]
    }
    /// The number of children at the moment of the call.
    fn child_count(&self) -> usize {
        0
    }
    /// Implementation of `firstChild` attribute.
    fn first_child(&self) -> Option<NodeRef> {
        self.child_nodes().into_iter().next()
    }
    /// Implementation of `lastChild` attribute.
    fn last_child(&self) -> Option<NodeRef> {
        self.child_nodes().pop()
    }
    /// Implementation of `previousSibling` attribute.
    fn previous_sibling(&self) -> Option<NodeRef> {
        let siblings = self.parent_node()?.child_nodes();
        let pos = siblings.iter().position(|sib| self.is_same_node(sib))?;
        pos.checked_sub(1).and_then(|prev| siblings.get(prev).cloned())
    }
    /// Implementation of `nextSibling` attribute.
    fn next_sibling(&self) -> Option<NodeRef> {
        let siblings = self.parent_node()?.child_nodes();
        let pos = siblings.iter().position(|sib| self.is_same_node(sib))?;
        siblings.get(pos + 1).cloned()
    }
    /// Implementation of `ownerDocument` attribute.
    fn owner_document(&self) -> Option<DocumentRef> {
        None
    }
    /// Implementation of `hasChildNodes` method.
    fn has_child_nodes(&self) -> bool {
        self.child_count() > 0
    }
    /// Implementation of `namespaceURI` attribute.
    fn namespace_uri(&self) -> Option<Rc<str>> {
        None
    }
    /// Implementation of `prefix` attribute.
    fn prefix(&self) -> Option<Rc<str>> {
        None
    }
    /// Implementation of `localName` attribute.
    fn local_name(&self) -> Option<Rc<str>> {
        None
    }
    /// Implementation of `textContent` attribute.
    fn text_content(&self) -> Option<String> {
        self.node_value().map(|value| value.to_string())
    }
    /// Check if the owner document of this node refuses modifications.
    fn is_read_only(&self) -> bool {
        self.owner_document().is_some_and(|doc| doc.is_read_only())
    }
    /// Implementation of `isSameNode` method.
    fn is_same_node(&self, other: &NodeRef) -> bool;

    /// Implementation of [`insertBefore`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-952280727) method.
    ///
    /// If `new_child` and `ref_child` are same nodes,
    /// this method does nothing and return `Ok(new_child)`.
    ///
    /// # Specification
    /// ```text
    /// Inserts the node newChild before the existing child node refChild.
    /// If refChild is null, insert newChild at the end of the list of children.
    /// If the newChild is already in the tree, it is first removed.
    /// ```
    fn insert_before(
        &mut self,
        new_child: NodeRef,
        ref_child: Option<NodeRef>,
    ) -> Result<NodeRef, DOMException> {
        let _ = (new_child, ref_child);
        Err(DOMException::HierarchyRequestErr)
    }
    /// Implementation of [`removeChild`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1734834066) method.
    fn remove_child(&mut self, old_child: NodeRef) -> Result<NodeRef, DOMException> {
        let _ = old_child;
        Err(DOMException::NotFoundErr)
    }
    /// Implementation of [`appendChild`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-184E7107) method.
    fn append_child(&mut self, new_child: NodeRef) -> Result<NodeRef, DOMException> {
        self.insert_before(new_child, None)
    }
}

/// Internal link maintenance. Not exposed to users.
pub(super) trait NodeConnection {
    /// Set new parent node and return the old one.
    fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef>;
}

/// Checks shared by every container's `insert_before`.
///
/// Returns the index at which `new_child` must be inserted into `children`.
pub(super) fn check_insertion(
    parent: &NodeRef,
    children: &[NodeRef],
    new_child: &NodeRef,
    ref_child: Option<&NodeRef>,
) -> Result<usize, DOMException> {
    check_no_modification_allowed_err(parent)?;
    // HIERARCHY_REQUEST_ERR: Raised if this node is of a type that does not allow children
    // of the type of the newChild node, or if the node to insert is one of this node's
    // ancestors or this node itself.
    if !check_vertical_hierarchy(parent.node_type(), new_child.node_type()) {
        return Err(DOMException::HierarchyRequestErr);
    }
    let mut ancestor = Some(parent.clone());
    while let Some(node) = ancestor {
        if node.is_same_node(new_child) {
            return Err(DOMException::HierarchyRequestErr);
        }
        ancestor = node.parent_node();
    }
    // WRONG_DOCUMENT_ERR: Raised if newChild was created from a different document
    // than the one that created this node.
    if !check_owner_document_sameness(parent, new_child) {
        return Err(DOMException::WrongDocumentErr);
    }
    // NOT_FOUND_ERR: Raised if refChild is not a child of this node.
    match ref_child {
        Some(ref_child) => children
            .iter()
            .position(|child| child.is_same_node(ref_child))
            .ok_or(DOMException::NotFoundErr),
        None => Ok(children.len()),
    }
}

/// Detach `node` from its current parent, if any.
pub(super) fn detach(node: &NodeRef) -> Result<(), DOMException> {
    if let Some(mut parent) = node.parent_node() {
        parent.remove_child(node.clone())?;
    }
    Ok(())
}

/// Sum type over every node kind that can appear in a document tree.
#[derive(Clone)]
pub enum NodeRef {
    Element(ElementRef),
    Text(TextRef),
    CDATASection(CDATASectionRef),
    ProcessingInstruction(ProcessingInstructionRef),
    Comment(CommentRef),
    Document(DocumentRef),
    DocumentType(DocumentTypeRef),
}

impl NodeRef {
    /// Generate [`NodeWeakRef`] from `self`.
    ///
    /// Only container nodes can be referred to weakly, so other kinds return `None`.
    pub fn downgrade(&self) -> Option<NodeWeakRef> {
        match self {
            NodeRef::Element(node) => Some(NodeWeakRef::Element(node.downgrade())),
            NodeRef::Document(node) => Some(NodeWeakRef::Document(node.downgrade())),
            _ => None,
        }
    }
}

macro_rules! impl_node_trait_to_noderef {
    (
        $(
            fn $( ($mut:tt) )? $fn:ident($( $arg_name:ident : $arg_type:ty ),*) -> $ret:ty
        ),*
    ) => {
        impl Node for NodeRef {
            $(
                fn $fn(& $( $mut )? self, $( $arg_name: $arg_type),* ) -> $ret {
                    match self {
                        NodeRef::Element(elem) => elem.$fn( $( $arg_name ),* ),
                        NodeRef::Text(text) => text.$fn( $( $arg_name ),* ),
                        NodeRef::CDATASection(cdata) => cdata.$fn( $( $arg_name ),* ),
                        NodeRef::ProcessingInstruction(pi) => pi.$fn( $( $arg_name ),* ),
                        NodeRef::Comment(comment) => comment.$fn( $( $arg_name ),* ),
                        NodeRef::Document(doc) => doc.$fn( $( $arg_name ),* ),
                        NodeRef::DocumentType(doctype) => doctype.$fn( $( $arg_name ),* ),
                    }
                }
            )*
        }
    };
}

impl_node_trait_to_noderef! {
    fn node_name() -> Rc<str>,
    fn node_value() -> Option<Rc<str>>,
    fn node_type() -> NodeType,
    fn parent_node() -> Option<NodeRef>,
    fn child_nodes() -> Vec<NodeRef>,
    fn child_count() -> usize,
    fn first_child() -> Option<NodeRef>,
    fn last_child() -> Option<NodeRef>,
    fn previous_sibling() -> Option<NodeRef>,
    fn next_sibling() -> Option<NodeRef>,
    fn owner_document() -> Option<DocumentRef>,
    fn has_child_nodes() -> bool,
    fn namespace_uri() -> Option<Rc<str>>,
    fn prefix() -> Option<Rc<str>>,
    fn local_name() -> Option<Rc<str>>,
    fn text_content() -> Option<String>,
    fn is_read_only() -> bool,
    fn is_same_node(other: &NodeRef) -> bool,
    fn(mut) insert_before(new_child: NodeRef, ref_child: Option<NodeRef>) -> Result<NodeRef, DOMException>,
    fn(mut) remove_child(old_child: NodeRef) -> Result<NodeRef, DOMException>,
    fn(mut) append_child(new_child: NodeRef) -> Result<NodeRef, DOMException>
}

impl NodeConnection for NodeRef {
    fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef> {
        match self {
            NodeRef::Element(elem) => elem.set_parent_node(new_parent),
            NodeRef::Text(text) => text.set_parent_node(new_parent),
            NodeRef::CDATASection(cdata) => cdata.set_parent_node(new_parent),
            NodeRef::ProcessingInstruction(pi) => pi.set_parent_node(new_parent),
            NodeRef::Comment(comment) => comment.set_parent_node(new_parent),
            NodeRef::Document(doc) => doc.set_parent_node(new_parent),
            NodeRef::DocumentType(doctype) => doctype.set_parent_node(new_parent),
        }
    }
}

macro_rules! impl_node_conversion {
    ( $( ( $fn:ident, $var:ident, $t:ty ) ),* ) => {
        impl NodeRef {
            $(
                pub fn $fn (&self) -> Option<$t> {
                    match self {
                        NodeRef:: $var (node) => Some(node.clone()),
                        _ => None
                    }
                }
            )*
        }
    };
}

impl_node_conversion! {
    ( as_element, Element, ElementRef ),
    ( as_text_node, Text, TextRef ),
    ( as_cdata_section, CDATASection, CDATASectionRef ),
    ( as_processing_instruction, ProcessingInstruction, ProcessingInstructionRef ),
    ( as_comment, Comment, CommentRef ),
    ( as_document, Document, DocumentRef ),
    ( as_document_type, DocumentType, DocumentTypeRef )
}

macro_rules! impl_from_for_noderef {
    ( $( ( $var:ident, $t:ty ) ),* ) => {
        $(
            impl From<$t> for NodeRef {
                fn from(value: $t) -> Self {
                    NodeRef:: $var (value)
                }
            }
        )*
    };
}

impl_from_for_noderef! {
    ( Element, ElementRef ),
    ( Text, TextRef ),
    ( CDATASection, CDATASectionRef ),
    ( ProcessingInstruction, ProcessingInstructionRef ),
    ( Comment, CommentRef ),
    ( Document, DocumentRef ),
    ( DocumentType, DocumentTypeRef )
}

/// Weak reference to a node that can own children.
#[derive(Clone)]
pub enum NodeWeakRef {
    Element(ElementWeakRef),
    Document(DocumentWeakRef),
}

impl NodeWeakRef {
    /// Generate [`NodeRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<NodeRef> {
        match self {
            NodeWeakRef::Element(node) => node.upgrade().map(NodeRef::Element),
            NodeWeakRef::Document(node) => node.upgrade().map(NodeRef::Document),
        }
    }
}
