//! Completion of missing namespace declarations.
//!
//! Only `xmlns` and `xmlns:*` attributes count as declarations. The namespace an element
//! or attribute was created with is what must be declared.

use std::rc::Rc;

use log::trace;

use crate::{
    dom::{ElementRef, Node, XML_NS_NAMESPACE},
    error::SaveError,
};

/// A namespace binding `(prefix, namespace URI)`.
///
/// `(None, None)` is a request for "no default namespace".
pub type Binding = (Option<Rc<str>>, Option<Rc<str>>);

fn is_implicit(prefix: Option<&str>) -> bool {
    matches!(prefix, Some("xml" | "xmlns"))
}

/// Find the declaration of `prefix` visible from `element`.
///
/// Return the declared URI, with an empty URI for `xmlns=""`. `None` means no declaration.
fn find_declaration(element: &ElementRef, prefix: Option<&str>) -> Option<String> {
    let mut current = Some(element.clone());
    while let Some(elem) = current {
        if let Some(value) = own_declaration(&elem, prefix) {
            return Some(value);
        }
        current = elem.parent_node().and_then(|par| par.as_element());
    }
    None
}

fn own_declaration(element: &ElementRef, prefix: Option<&str>) -> Option<String> {
    element.attributes().into_iter().find_map(|attr| {
        let declared = attr.declared_prefix()?;
        (declared.as_deref() == prefix).then(|| attr.value())
    })
}

/// Check if `prefix` is bound to `namespace_uri` at `element`.
///
/// `xml` and `xmlns` are always declared. An empty declaration `xmlns=""` satisfies
/// a request for no namespace, and so does the absence of any default declaration.
pub fn is_declared(element: &ElementRef, prefix: Option<&str>, namespace_uri: Option<&str>) -> bool {
    if is_implicit(prefix) {
        return true;
    }
    let namespace_uri = namespace_uri.unwrap_or("");
    match find_declaration(element, prefix) {
        Some(declared) => declared == namespace_uri,
        None => prefix.is_none() && namespace_uri.is_empty(),
    }
}

/// Return the bindings used by `element` that are not declared.
///
/// The element's own binding comes first. Unprefixed attributes are skipped because
/// attributes never take the default namespace.
pub fn undeclared_namespaces(element: &ElementRef) -> Vec<Binding> {
    let mut res: Vec<Binding> = vec![];
    let mut push = |binding: Binding| {
        if !res.contains(&binding) {
            res.push(binding);
        }
    };

    let prefix = element.prefix();
    let namespace_uri = element.namespace_uri();
    if !is_declared(element, prefix.as_deref(), namespace_uri.as_deref()) {
        push((prefix, namespace_uri));
    }

    for attr in element.attributes() {
        if attr.is_namespace_declaration() {
            continue;
        }
        let Some(prefix) = attr.prefix() else {
            continue;
        };
        let namespace_uri = attr.namespace_uri();
        if !is_declared(element, Some(&prefix), namespace_uri.as_deref()) {
            push((Some(prefix), namespace_uri));
        }
    }
    res
}

/// Add the declaration of `prefix` to `target`.
///
/// A missing namespace URI is declared as the empty string.
/// The implicit `xml` and `xmlns` bindings are never declared.
pub fn declare(
    target: &mut ElementRef,
    prefix: Option<&str>,
    namespace_uri: Option<&str>,
) -> Result<(), SaveError> {
    if is_implicit(prefix) {
        return Ok(());
    }
    let qname = match prefix {
        Some(prefix) => format!("xmlns:{prefix}"),
        None => "xmlns".to_owned(),
    };
    let value = namespace_uri.unwrap_or("");
    trace!(
        "declare {qname}=\"{value}\" on <{}>",
        target.tag_name()
    );
    target.set_attribute_ns(Some(XML_NS_NAMESPACE), &qname, value)?;
    Ok(())
}

/// Check that declaring `(prefix, namespace_uri)` on `target` for the sake of `element`
/// changes the meaning of no name between them.
fn can_hoist(target: &ElementRef, element: &ElementRef, prefix: &str, namespace_uri: Option<&str>) -> bool {
    // `target` must be an ancestor-or-self of `element`, and no element on the way
    // may already declare the prefix.
    let mut current = Some(element.clone());
    let mut reached = false;
    while let Some(elem) = current {
        if own_declaration(&elem, Some(prefix)).is_some() {
            return false;
        }
        if elem.is_same_node(&target.clone().into()) {
            reached = true;
            break;
        }
        current = elem.parent_node().and_then(|par| par.as_element());
    }
    if !reached {
        return false;
    }

    let namespace_uri = namespace_uri.unwrap_or("");
    let conflicts = |p: Option<Rc<str>>, uri: Option<Rc<str>>| {
        p.as_deref() == Some(prefix) && uri.as_deref().unwrap_or("") != namespace_uri
    };
    !conflicts(target.prefix(), target.namespace_uri())
        && !target
            .attributes()
            .into_iter()
            .any(|attr| conflicts(attr.prefix(), attr.namespace_uri()))
}

/// Declare every binding used but not declared by `element`, and by all descendant
/// elements if `deep` is set.
///
/// Prefixed bindings are declared on `target` when it is given and the declaration
/// there is safe. Otherwise the declaration goes to the element that needs it.
/// Default namespace bindings always stay on the element that needs them, because a
/// default declaration higher up would capture unprefixed elements already visited.
///
/// Return the number of added declarations.
pub fn ensure(
    element: &ElementRef,
    target: Option<&ElementRef>,
    deep: bool,
) -> Result<usize, SaveError> {
    let mut added = 0;
    for (prefix, namespace_uri) in undeclared_namespaces(element) {
        // an earlier declaration on the target may already satisfy this binding
        if is_declared(element, prefix.as_deref(), namespace_uri.as_deref()) {
            continue;
        }
        let mut place = element.clone();
        if let (Some(target), Some(p)) = (target, prefix.as_deref()) {
            if can_hoist(target, element, p, namespace_uri.as_deref()) {
                place = target.clone();
            } else {
                trace!(
                    "prefix '{p}' cannot be declared on <{}>, declaring on <{}>",
                    target.tag_name(),
                    element.tag_name()
                );
            }
        }
        declare(&mut place, prefix.as_deref(), namespace_uri.as_deref())?;
        added += 1;
    }

    if deep {
        for child in element.child_elements() {
            added += ensure(&child, target, deep)?;
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DOMException, DocumentRef};

    fn document_with_root(name: &str, ns: Option<&str>) -> (DocumentRef, ElementRef) {
        let mut doc = DocumentRef::new();
        let root = doc.create_element_ns(ns, name).unwrap();
        doc.append_child(root.clone().into()).unwrap();
        (doc, root)
    }

    #[test]
    fn implicit_and_inherited_declarations() {
        let (doc, mut root) = document_with_root("root", None);
        root.set_attribute("xmlns:a", "urn:a").unwrap();
        let mut child = doc.create_element("child").unwrap();
        root.append_child(child.clone().into()).unwrap();

        assert!(is_declared(&child, Some("xml"), None));
        assert!(is_declared(&child, Some("a"), Some("urn:a")));
        assert!(!is_declared(&child, Some("a"), Some("urn:other")));
        assert!(!is_declared(&child, Some("b"), Some("urn:b")));
        // no default namespace in effect
        assert!(is_declared(&child, None, None));

        root.set_attribute("xmlns", "urn:d").unwrap();
        assert!(!is_declared(&child, None, None));
        child.set_attribute("xmlns", "").unwrap();
        assert!(is_declared(&child, None, None));
        assert!(!is_declared(&child, None, Some("urn:d")));
    }

    #[test]
    fn undeclared_element_and_attribute_namespaces() {
        let (_doc, mut root) = document_with_root("p:root", Some("urn:p"));
        root.set_attribute_ns(Some("urn:q"), "q:attr", "v").unwrap();
        root.set_attribute("plain", "v").unwrap();
        root.set_attribute_ns(Some(crate::dom::XML_XML_NAMESPACE), "xml:lang", "en")
            .unwrap();

        let missing = undeclared_namespaces(&root);
        let missing = missing
            .iter()
            .map(|(p, ns)| (p.as_deref(), ns.as_deref()))
            .collect::<Vec<_>>();
        assert_eq!(
            missing,
            [(Some("p"), Some("urn:p")), (Some("q"), Some("urn:q"))]
        );
    }

    #[test]
    fn declarations_hoisted_to_document_element() {
        let (doc, mut root) = document_with_root("root", None);
        let mut mid = doc.create_element("mid").unwrap();
        let leaf = doc.create_element_ns(Some("urn:ns"), "ns:leaf").unwrap();
        mid.append_child(leaf.clone().into()).unwrap();
        root.append_child(mid.into()).unwrap();

        let added = ensure(&root, Some(&root), true).unwrap();
        assert_eq!(added, 1);
        assert_eq!(root.get_attribute("xmlns:ns").as_deref(), Some("urn:ns"));
        assert!(!leaf.has_attributes());
    }

    #[test]
    fn conflicting_declarations_stay_local() {
        let (doc, mut root) = document_with_root("ns:root", Some("urn:one"));
        root.set_attribute("xmlns:ns", "urn:one").unwrap();
        let leaf = doc.create_element_ns(Some("urn:two"), "ns:leaf").unwrap();
        root.append_child(leaf.clone().into()).unwrap();

        ensure(&root, Some(&root), true).unwrap();
        assert_eq!(root.get_attribute("xmlns:ns").as_deref(), Some("urn:one"));
        assert_eq!(leaf.get_attribute("xmlns:ns").as_deref(), Some("urn:two"));
    }

    #[test]
    fn default_namespace_is_declared_in_place() {
        let (doc, mut root) = document_with_root("root", None);
        let inner = doc.create_element_ns(Some("urn:d"), "inner").unwrap();
        let plain = doc.create_element("plain").unwrap();
        root.append_child(inner.clone().into()).unwrap();
        root.append_child(plain.clone().into()).unwrap();

        ensure(&root, Some(&root), true).unwrap();
        assert_eq!(inner.get_attribute("xmlns").as_deref(), Some("urn:d"));
        assert!(!root.has_attribute("xmlns"));
        assert!(!plain.has_attributes());
    }

    #[test]
    fn undeclaration_inside_default_namespace() {
        let (doc, mut root) = document_with_root("root", Some("urn:d"));
        let plain = doc.create_element("plain").unwrap();
        root.append_child(plain.clone().into()).unwrap();

        ensure(&root, None, true).unwrap();
        assert_eq!(root.get_attribute("xmlns").as_deref(), Some("urn:d"));
        assert_eq!(plain.get_attribute("xmlns").as_deref(), Some(""));
    }

    #[test]
    fn ensure_reports_read_only_documents() {
        let (mut doc, root) = document_with_root("p:root", Some("urn:p"));
        doc.set_read_only(true);
        let err = ensure(&root, Some(&root), true).unwrap_err();
        assert!(matches!(
            err,
            SaveError::Dom(DOMException::NoModificationAllowedErr)
        ));
    }
}
