use domsave::{
    dom::{DocumentRef, ElementRef, Node},
    save::{
        SaveOptions, Serializer,
        namespace::{ensure, undeclared_namespaces},
    },
};
use pretty_assertions::assert_eq;

fn assert_complete(elem: &ElementRef) {
    assert_eq!(
        undeclared_namespaces(elem),
        vec![],
        "<{}> has undeclared namespaces",
        elem.tag_name()
    );
    for child in elem.child_elements() {
        assert_complete(&child);
    }
}

/// `<root>` with children from three namespaces, a namespaced attribute and
/// an unqualified element below a default namespace.
fn sample() -> (DocumentRef, ElementRef) {
    let mut doc = DocumentRef::new();
    let mut root = doc.create_element("root").unwrap();

    let mut first = doc.create_element_ns(Some("urn:a"), "a:first").unwrap();
    first
        .set_attribute_ns(Some("urn:b"), "b:kind", "x")
        .unwrap();
    root.append_child(first.into()).unwrap();

    let mut section = doc.create_element_ns(Some("urn:d"), "section").unwrap();
    let mut plain = doc.create_element("plain").unwrap();
    plain
        .append_child(doc.create_element_ns(Some("urn:a"), "a:leaf").unwrap().into())
        .unwrap();
    section.append_child(plain.into()).unwrap();
    root.append_child(section.into()).unwrap();

    // same prefix, different namespace
    let other = doc.create_element_ns(Some("urn:other"), "a:second").unwrap();
    root.append_child(other.into()).unwrap();

    doc.append_child(root.clone().into()).unwrap();
    (doc, root)
}

fn bare() -> SaveOptions {
    SaveOptions::default()
        .with_prolog(false)
        .with_format_end_newline(false)
}

#[test]
fn every_binding_is_declared_after_ensure() {
    let (_doc, root) = sample();
    assert!(!undeclared_namespaces(&root.child_elements()[0]).is_empty());

    let added = ensure(&root, Some(&root), true).unwrap();
    assert_eq!(added, 5);
    assert_complete(&root);

    // nothing left to do
    assert_eq!(ensure(&root, Some(&root), true).unwrap(), 0);
}

#[test]
fn declarations_on_the_document_element() {
    let (doc, _) = sample();
    let text = Serializer::with_options(bare())
        .serialize_to_string(&doc)
        .unwrap();
    assert_eq!(
        text,
        concat!(
            r#"<root xmlns:a="urn:a" xmlns:b="urn:b">"#,
            r#"<a:first b:kind="x"/>"#,
            r#"<section xmlns="urn:d"><plain xmlns=""><a:leaf/></plain></section>"#,
            r#"<a:second xmlns:a="urn:other"/>"#,
            "</root>",
        )
    );
}

#[test]
fn declarations_in_place() {
    let (doc, root) = sample();
    let text = Serializer::with_options(bare().with_document_element_declarations(false))
        .serialize_to_string(&doc)
        .unwrap();
    assert_eq!(
        text,
        concat!(
            "<root>",
            r#"<a:first xmlns:a="urn:a" xmlns:b="urn:b" b:kind="x"/>"#,
            r#"<section xmlns="urn:d"><plain xmlns=""><a:leaf xmlns:a="urn:a"/></plain></section>"#,
            r#"<a:second xmlns:a="urn:other"/>"#,
            "</root>",
        )
    );
    assert!(!root.has_attributes());
    assert_complete(&root);
}

#[test]
fn tree_is_untouched_without_ensure() {
    let (doc, root) = sample();
    let text = Serializer::with_options(bare().with_namespace_declarations_ensured(false))
        .serialize_to_string(&doc)
        .unwrap();
    assert!(text.starts_with(r#"<root><a:first b:kind="x"/>"#));
    assert!(!root.has_attributes());
    assert!(!undeclared_namespaces(&root.child_elements()[0]).is_empty());
}

#[test]
fn single_node_declares_within_the_subtree() {
    let (_doc, root) = sample();
    let section = root.child_elements()[1].clone();
    let mut buf = vec![];
    Serializer::with_options(bare())
        .serialize_node(&section, &mut buf)
        .unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        r#"<section xmlns="urn:d" xmlns:a="urn:a"><plain xmlns=""><a:leaf/></plain></section>"#
    );
    assert!(!root.has_attributes());
}
