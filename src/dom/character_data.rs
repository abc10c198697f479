use std::{cell::RefCell, rc::Rc};

use super::{
    DOMException, NodeType, check_no_modification_allowed_err,
    document::{DocumentRef, DocumentWeakRef},
    node::{Node, NodeConnection, NodeRef, NodeWeakRef},
};

/// Implementation of [CharacterData](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-FF21A306)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// Strings are encoded in UTF-8, not UTF-16.
pub trait CharacterData: Node {
    /// Implementation of [`data`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-72AB8359) attribute.
    fn data(&self) -> String;

    /// Replace the character data of this node.
    ///
    /// # Errors
    /// `NO_MODIFICATION_ALLOWED_ERR` when the owner document is read-only.
    fn set_data(&mut self, data: impl Into<String>) -> Result<(), DOMException>;

    /// Implementation of `appendData` method.
    fn append_data(&mut self, arg: &str) -> Result<(), DOMException> {
        let mut data = self.data();
        data.push_str(arg);
        self.set_data(data)
    }
}

macro_rules! impl_character_data {
    ( $( $(#[$meta:meta])* ($name:ident, $rc:ident, $node_type:ident, $node_name:literal) ),* ) => {
        $(
            $(#[$meta])*
            pub struct $name {
                parent_node: Option<NodeWeakRef>,
                owner_document: DocumentWeakRef,
                data: String,
            }

            #[doc = concat!("Wrapper of `Rc<RefCell<", stringify!($name), ">>`.")]
            #[derive(Clone)]
            pub struct $rc(pub(super) Rc<RefCell<$name>>);

            impl $rc {
                pub(super) fn from_doc(doc: &DocumentRef, data: String) -> Self {
                    Self(Rc::new(RefCell::new($name {
                        parent_node: None,
                        owner_document: doc.downgrade(),
                        data,
                    })))
                }

                /// Borrow the character data without copying it.
                pub fn with_data<R>(&self, f: impl FnOnce(&str) -> R) -> R {
                    f(&self.0.borrow().data)
                }
            }

            impl CharacterData for $rc {
                fn data(&self) -> String {
                    self.0.borrow().data.clone()
                }

                fn set_data(&mut self, data: impl Into<String>) -> Result<(), DOMException> {
                    check_no_modification_allowed_err(&*self)?;
                    self.0.borrow_mut().data = data.into();
                    Ok(())
                }
            }

            impl Node for $rc {
                fn node_name(&self) -> Rc<str> {
                    $node_name.into()
                }

                fn node_value(&self) -> Option<Rc<str>> {
                    Some(self.0.borrow().data.as_str().into())
                }

                fn node_type(&self) -> NodeType {
                    NodeType::$node_type
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
                    Some(self.data())
                }

                fn is_same_node(&self, other: &NodeRef) -> bool {
                    matches!(other, NodeRef::$node_type(other) if Rc::ptr_eq(&self.0, &other.0))
                }
            }

            impl NodeConnection for $rc {
                fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef> {
                    let new_parent = new_parent.and_then(|par| par.downgrade());
                    std::mem::replace(&mut self.0.borrow_mut().parent_node, new_parent)
                        .and_then(|old| old.upgrade())
                }
            }
        )*
    };
}

impl_character_data! {
    /// Implementation of [Text](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1312295772)
    /// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
    (Text, TextRef, Text, "#text"),
    /// Implementation of [Comment](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1728279322)
    /// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
    (Comment, CommentRef, Comment, "#comment"),
    /// Implementation of [CDATASection](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-667469212)
    /// interface on [1.5 Extended Interfaces: XML Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E067D597)
    ///
    /// The content may contain `]]>`. The serializer splits such sections.
    (CDATASection, CDATASectionRef, CDATASection, "#cdata-section")
}
