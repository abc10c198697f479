use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use super::{
    DOMException, NodeType,
    character_data::{CDATASectionRef, CommentRef, TextRef},
    check_no_modification_allowed_err,
    document_type::DocumentTypeRef,
    element::ElementRef,
    node::{Node, NodeConnection, NodeRef, check_insertion, detach},
    pi::ProcessingInstructionRef,
    validate_name, validate_qualified_name,
};

/// Implementation of [Document](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-i-Document)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
pub struct Document {
    children: Vec<NodeRef>,
    /// Implementation of `xmlVersion` attribute.
    xml_version: Option<Rc<str>>,
    /// Implementation of `xmlEncoding` attribute.
    xml_encoding: Option<Rc<str>>,
    /// Implementation of `xmlStandalone` attribute.
    xml_standalone: Option<bool>,
    /// If `true`, every node owned by this document refuses modifications.
    read_only: bool,
}

/// Wrapper of `Rc<RefCell<Document>>`.
#[derive(Clone)]
pub struct DocumentRef(Rc<RefCell<Document>>);

impl DocumentRef {
    /// Create an empty document.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Document {
            children: vec![],
            xml_version: None,
            xml_encoding: None,
            xml_standalone: None,
            read_only: false,
        })))
    }

    /// Implementation of [`createElement`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-2141741547) method.
    ///
    /// # Specification
    /// ```text
    /// Return Value
    ///     Element A new Element object with the nodeName attribute set to tagName,
    ///             and localName, prefix, and namespaceURI set to null.
    ///
    /// Exceptions
    ///     INVALID_CHARACTER_ERR: Raised if the specified name is not an XML name.
    /// ```
    pub fn create_element(&self, tag_name: impl Into<Rc<str>>) -> Result<ElementRef, DOMException> {
        let tag_name: Rc<str> = tag_name.into();
        validate_name(&tag_name)?;
        Ok(ElementRef::from_doc(
            self,
            tag_name.clone(),
            None,
            None,
            tag_name,
        ))
    }

    /// Implementation of [`createElementNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-DocCrElNS) method.
    ///
    /// # Specification
    /// ```text
    /// Exceptions
    ///     INVALID_CHARACTER_ERR: Raised if the specified qualifiedName is not an XML name.
    ///     NAMESPACE_ERR:         Raised if the qualifiedName is a malformed qualified name,
    ///                            if the qualifiedName has a prefix and the namespaceURI is null,
    ///                            or if the qualifiedName has a prefix that is "xml" and the
    ///                            namespaceURI is different from
    ///                            "http://www.w3.org/XML/1998/namespace".
    /// ```
    pub fn create_element_ns(
        &self,
        namespace_uri: Option<&str>,
        qualified_name: &str,
    ) -> Result<ElementRef, DOMException> {
        let (prefix, local_name) = validate_qualified_name(namespace_uri, qualified_name)?;
        Ok(ElementRef::from_doc(
            self,
            qualified_name.into(),
            namespace_uri.filter(|uri| !uri.is_empty()).map(Rc::from),
            prefix.map(Rc::from),
            local_name.into(),
        ))
    }

    /// Implementation of [`createTextNode`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1975348127) method.
    pub fn create_text_node(&self, data: impl Into<String>) -> TextRef {
        TextRef::from_doc(self, data.into())
    }

    /// Implementation of [`createComment`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1334481328) method.
    pub fn create_comment(&self, data: impl Into<String>) -> CommentRef {
        CommentRef::from_doc(self, data.into())
    }

    /// Implementation of [`createCDATASection`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-D26C0AF8) method.
    ///
    /// `data` may contain `]]>`.
    pub fn create_cdata_section(&self, data: impl Into<String>) -> CDATASectionRef {
        CDATASectionRef::from_doc(self, data.into())
    }

    /// Implementation of [`createProcessingInstruction`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-135944439) method.
    ///
    /// # Specification
    /// ```text
    /// Exceptions
    ///     INVALID_CHARACTER_ERR: Raised if the specified target is not
    ///                            an XML name according to the XML version in use
    /// ```
    pub fn create_processing_instruction(
        &self,
        target: impl Into<Rc<str>>,
        data: Option<&str>,
    ) -> Result<ProcessingInstructionRef, DOMException> {
        let target: Rc<str> = target.into();
        // [17] PITarget ::= Name - (('X' | 'x') ('M' | 'm') ('L' | 'l'))
        if target.eq_ignore_ascii_case("xml") {
            return Err(DOMException::InvalidCharacterErr);
        }
        validate_name(&target)?;
        Ok(ProcessingInstructionRef::from_doc(
            self,
            target,
            data.map(Rc::from),
        ))
    }

    /// Implementation of [`createDocumentType`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-Level-2-Core-DOM-createDocType) method.
    ///
    /// The returned node is not attached. Append it before the document element.
    pub fn create_document_type(
        &self,
        name: impl Into<Rc<str>>,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<DocumentTypeRef, DOMException> {
        let name: Rc<str> = name.into();
        validate_name(&name)?;
        Ok(DocumentTypeRef::from_doc(
            self,
            name,
            public_id.map(Rc::from),
            system_id.map(Rc::from),
        ))
    }

    /// Implementation of `documentElement` attribute.
    pub fn document_element(&self) -> Option<ElementRef> {
        self.0
            .borrow()
            .children
            .iter()
            .find_map(|child| child.as_element())
    }

    /// Implementation of `doctype` attribute.
    pub fn doctype(&self) -> Option<DocumentTypeRef> {
        self.0
            .borrow()
            .children
            .iter()
            .find_map(|child| child.as_document_type())
    }

    /// Implementation of `xmlVersion` attribute.
    pub fn xml_version(&self) -> Option<Rc<str>> {
        self.0.borrow().xml_version.clone()
    }

    pub fn set_xml_version(&mut self, version: Option<&str>) {
        self.0.borrow_mut().xml_version = version.map(Rc::from);
    }

    /// Implementation of `xmlEncoding` attribute.
    ///
    /// This is the encoding declared in the parsed input, not the output encoding.
    pub fn xml_encoding(&self) -> Option<Rc<str>> {
        self.0.borrow().xml_encoding.clone()
    }

    pub fn set_xml_encoding(&mut self, encoding: Option<&str>) {
        self.0.borrow_mut().xml_encoding = encoding.map(Rc::from);
    }

    /// Implementation of `xmlStandalone` attribute.
    ///
    /// `None` means the declaration did not specify it.
    pub fn xml_standalone(&self) -> Option<bool> {
        self.0.borrow().xml_standalone
    }

    pub fn set_xml_standalone(&mut self, standalone: Option<bool>) {
        self.0.borrow_mut().xml_standalone = standalone;
    }

    /// Check if this document refuses modifications.
    pub fn is_read_only(&self) -> bool {
        self.0.borrow().read_only
    }

    /// Make every node owned by this document read-only, or writable again.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.0.borrow_mut().read_only = read_only;
    }

    /// Generate [`DocumentWeakRef`] from `self`.
    pub fn downgrade(&self) -> DocumentWeakRef {
        DocumentWeakRef(Rc::downgrade(&self.0))
    }
}

impl Default for DocumentRef {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for DocumentRef {
    fn node_name(&self) -> Rc<str> {
        "#document".into()
    }

    fn node_type(&self) -> NodeType {
        NodeType::Document
    }

    fn child_nodes(&self) -> Vec<NodeRef> {
        self.0.borrow().children.clone()
    }

    fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    fn text_content(&self) -> Option<String> {
        None
    }

    fn is_read_only(&self) -> bool {
        DocumentRef::is_read_only(self)
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        matches!(other, NodeRef::Document(other) if Rc::ptr_eq(&self.0, &other.0))
    }

    /// Insert `new_child` into the document.
    ///
    /// In addition to the common checks, a document accepts
    /// at most one element and at most one document type.
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
        let this = NodeRef::Document(self.clone());
        let children = self.child_nodes();
        check_insertion(&this, &children, &new_child, ref_child.as_ref())?;
        let duplicated = match new_child.node_type() {
            NodeType::Element => self.document_element().map(NodeRef::Element),
            NodeType::DocumentType => self.doctype().map(NodeRef::DocumentType),
            _ => None,
        };
        if duplicated.is_some_and(|old| !old.is_same_node(&new_child)) {
            return Err(DOMException::HierarchyRequestErr);
        }

        detach(&new_child)?;
        let index = check_insertion(&this, &self.child_nodes(), &new_child, ref_child.as_ref())?;
        self.0.borrow_mut().children.insert(index, new_child.clone());
        let mut child = new_child.clone();
        child.set_parent_node(Some(this));
        Ok(new_child)
    }

    fn remove_child(&mut self, mut old_child: NodeRef) -> Result<NodeRef, DOMException> {
        check_no_modification_allowed_err(&*self)?;
        let removed = {
            let mut doc = self.0.borrow_mut();
            let pos = doc
                .children
                .iter()
                .position(|child| child.is_same_node(&old_child))
                .ok_or(DOMException::NotFoundErr)?;
            doc.children.remove(pos)
        };
        old_child.set_parent_node(None);
        Ok(removed)
    }
}

impl NodeConnection for DocumentRef {
    fn set_parent_node(&mut self, _: Option<NodeRef>) -> Option<NodeRef> {
        None
    }
}

/// Wrapper of `Weak<RefCell<Document>>`.
#[derive(Clone)]
pub struct DocumentWeakRef(Weak<RefCell<Document>>);

impl DocumentWeakRef {
    /// Generate [`DocumentRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<DocumentRef> {
        self.0.upgrade().map(DocumentRef)
    }
}
