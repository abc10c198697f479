use std::fs::read_to_string;

use domsave::{
    dom::{DocumentRef, ElementRef},
    parser::{parse_reader, parse_str},
    save::{SaveOptions, Serializer, TableProfile},
};
use glob::glob;
use pretty_assertions::assert_eq;

const FIXTURES: &str = "tests/fixtures/*.xml";

fn fixtures() -> Vec<(String, DocumentRef)> {
    let res = glob(FIXTURES)
        .unwrap()
        .map(|path| {
            let path = path.unwrap();
            let text = read_to_string(&path).unwrap();
            let doc = parse_str(&text)
                .unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()));
            (path.display().to_string(), doc)
        })
        .collect::<Vec<_>>();
    assert!(!res.is_empty(), "no fixtures found in {FIXTURES}");
    res
}

fn element_names(elem: &ElementRef, names: &mut Vec<String>) {
    names.push(elem.tag_name().to_string());
    for child in elem.child_elements() {
        element_names(&child, names);
    }
}

fn outline(doc: &DocumentRef) -> Vec<String> {
    let mut names = vec![];
    if let Some(root) = doc.document_element() {
        element_names(&root, &mut names);
    }
    names
}

#[test]
fn unformatted_output_is_stable() {
    let serializer = Serializer::with_options(SaveOptions::default());
    for (path, doc) in fixtures() {
        let first = serializer.serialize_to_string(&doc).unwrap();
        let reparsed = parse_str(&first)
            .unwrap_or_else(|e| panic!("failed to reparse the output of {path}: {e}"));
        let second = serializer.serialize_to_string(&reparsed).unwrap();
        assert_eq!(first, second, "{path}");
    }
}

#[test]
fn formatted_output_keeps_the_element_tree() {
    let options = SaveOptions::default().with_format_output(true);
    let serializers = [
        Serializer::with_options(options.clone()),
        Serializer::new(options, TableProfile::xhtml()),
    ];
    for (path, doc) in fixtures() {
        for serializer in &serializers {
            let text = serializer.serialize_to_string(&doc).unwrap();
            let reparsed = parse_str(&text)
                .unwrap_or_else(|e| panic!("failed to reparse the output of {path}: {e}"));
            assert_eq!(outline(&doc), outline(&reparsed), "{path}");
        }
    }
}

#[test]
fn utf16_output_reads_back() {
    let utf8 = Serializer::default();
    let utf16 = Serializer::with_options(
        SaveOptions::default()
            .with_encoding("UTF-16")
            .unwrap()
            .with_bom(true),
    );
    for (path, doc) in fixtures() {
        let mut bytes = vec![];
        utf16.serialize(&doc, &mut bytes).unwrap();
        assert_eq!(&bytes[..2], [0xFF, 0xFE], "{path}");

        let decoded = parse_reader(bytes.as_slice())
            .unwrap_or_else(|e| panic!("failed to read the UTF-16 output of {path}: {e}"));
        assert_eq!(
            utf8.serialize_to_string(&doc).unwrap(),
            utf8.serialize_to_string(&decoded).unwrap(),
            "{path}"
        );
    }
}
