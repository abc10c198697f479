//! Deterministic attribute order.
//!
//! The order is realized as a composite sort key instead of chained comparators,
//! so it is total by construction:
//!
//! 1. the bare `xmlns` attribute
//! 2. unprefixed attributes listed by the profile, in list order
//! 3. other unprefixed attributes
//! 4. `xmlns:*` declarations, by declared prefix
//! 5. prefixed attributes listed by the profile, in list order
//! 6. other prefixed attributes, by prefix
//!
//! Within a class, names compare case-insensitively, then exactly.
//!
//! A profile listing a prefixed attribute such as `xml:lang` cannot move it ahead of
//! the `xmlns:*` declarations. The profile order applies within the prefixed attributes.

use crate::dom::{AttrRef, ElementRef, Node};

use super::profile::{ElementName, FormatProfile};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    class: u8,
    rank: usize,
    prefix: String,
    local: String,
    qname: String,
    namespace_uri: String,
}

fn sort_key(attr: &AttrRef, rank: Option<usize>) -> SortKey {
    let qname = attr.name().to_string();
    let local = attr.local_name().to_lowercase();
    let prefix = attr
        .prefix()
        .map(|prefix| prefix.to_lowercase())
        .unwrap_or_default();
    let namespace_uri = attr
        .namespace_uri()
        .map(|uri| uri.to_string())
        .unwrap_or_default();
    let prefixed = attr.prefix().is_some();
    let class = match (attr.declared_prefix(), rank, prefixed) {
        (Some(None), _, _) => 0,
        (Some(Some(_)), _, _) => 3,
        (None, Some(_), false) => 1,
        (None, None, false) => 2,
        (None, Some(_), true) => 4,
        (None, None, true) => 5,
    };
    SortKey {
        class,
        rank: if matches!(class, 1 | 4) { rank.unwrap_or(0) } else { 0 },
        prefix,
        local,
        qname,
        namespace_uri,
    }
}

/// Return the attributes of `element` in output order.
pub fn sorted_attributes(element: &ElementRef, profile: &dyn FormatProfile) -> Vec<AttrRef> {
    let namespace_uri = element.namespace_uri();
    let local_name = element.local_name().unwrap_or_else(|| element.tag_name());
    let name = ElementName::new(namespace_uri.as_deref(), &local_name);

    let mut keyed = element
        .attributes()
        .into_iter()
        .map(|attr| {
            let rank = profile.attribute_rank(&name, &attr.name());
            (sort_key(&attr, rank), attr)
        })
        .collect::<Vec<_>>();
    keyed.sort_by(|(l, _), (r, _)| l.cmp(r));
    keyed.into_iter().map(|(_, attr)| attr).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dom::DocumentRef,
        save::profile::{DefaultProfile, TableProfile},
    };

    fn names(attrs: &[AttrRef]) -> Vec<String> {
        attrs.iter().map(|attr| attr.name().to_string()).collect()
    }

    #[test]
    fn namespace_declarations_and_prefixes() {
        let doc = DocumentRef::new();
        let mut elem = doc.create_element("e").unwrap();
        elem.set_attribute_ns(Some("urn:b"), "b:x", "1").unwrap();
        elem.set_attribute("Zeta", "2").unwrap();
        elem.set_attribute("xmlns:b", "urn:b").unwrap();
        elem.set_attribute("alpha", "3").unwrap();
        elem.set_attribute_ns(Some("urn:a"), "A:y", "4").unwrap();
        elem.set_attribute("xmlns", "urn:default").unwrap();
        elem.set_attribute("xmlns:a", "urn:a").unwrap();

        let sorted = sorted_attributes(&elem, &DefaultProfile);
        assert_eq!(
            names(&sorted),
            ["xmlns", "alpha", "Zeta", "xmlns:a", "xmlns:b", "A:y", "b:x"]
        );
    }

    #[test]
    fn profile_order_comes_before_alphabetical() {
        let doc = DocumentRef::new();
        let mut img = doc.create_element("img").unwrap();
        img.set_attribute("class", "c").unwrap();
        img.set_attribute("alt", "a").unwrap();
        img.set_attribute("src", "s").unwrap();
        img.set_attribute("xmlns", "").unwrap();

        let sorted = sorted_attributes(&img, &TableProfile::xhtml());
        assert_eq!(names(&sorted), ["xmlns", "src", "alt", "class"]);
    }

    #[test]
    fn listed_prefixed_attributes_follow_namespace_declarations() {
        let doc = DocumentRef::new();
        let mut elem = doc.create_element("e").unwrap();
        elem.set_attribute_ns(Some("urn:b"), "b:z", "1").unwrap();
        elem.set_attribute_ns(Some(crate::dom::XML_XML_NAMESPACE), "xml:lang", "en")
            .unwrap();
        elem.set_attribute("id", "1").unwrap();
        elem.set_attribute("xmlns:a", "urn:a").unwrap();
        elem.set_attribute("name", "n").unwrap();

        let profile = TableProfile::new().with_attribute_order(None, "e", &["xml:lang", "name"]);
        let sorted = sorted_attributes(&elem, &profile);
        assert_eq!(names(&sorted), ["name", "id", "xmlns:a", "xml:lang", "b:z"]);
    }

    #[test]
    fn order_does_not_depend_on_insertion() {
        let doc = DocumentRef::new();
        let attrs = [("b", "1"), ("B", "2"), ("a", "3"), ("xmlns:p", "urn:p")];
        let mut orders = vec![];
        for rotation in 0..attrs.len() {
            let mut elem = doc.create_element("e").unwrap();
            for i in 0..attrs.len() {
                let (name, value) = attrs[(i + rotation) % attrs.len()];
                elem.set_attribute(name, value).unwrap();
            }
            orders.push(names(&sorted_attributes(&elem, &DefaultProfile)));
        }
        assert!(orders.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(orders[0], ["a", "B", "b", "xmlns:p"]);
    }
}
