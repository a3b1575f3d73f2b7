//! Recovering XML reader using quick-xml
//!
//! CIB dumps cut out of diagnostic reports are often truncated or carry stray
//! end tags. The reader keeps going where a strict parser would give up and
//! returns whatever element tree it could assemble.

use crate::error::MalformedConfigError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

/// An element of the parsed document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Direct child elements with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First direct child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Depth-first search for the first element (self included) with the given name
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

/// Outcome of a recovering parse
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub root: XmlElement,
    /// Problems that were recovered from, in the order they were met
    pub recovered: Vec<String>,
}

impl XmlDocument {
    pub fn is_clean(&self) -> bool {
        self.recovered.is_empty()
    }
}

/// Parse XML text, recovering from truncation and mismatched tags
///
/// Fails only when not a single element could be read.
pub fn parse_recovering(content: &str) -> Result<XmlDocument, MalformedConfigError> {
    let mut reader = Reader::from_str(content);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut roots: Vec<XmlElement> = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut recovered = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(element_from(&e));
            }

            Ok(Event::Empty(e)) => {
                attach(element_from(&e), &mut stack, &mut roots);
            }

            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match stack.iter().rposition(|open| open.name == name) {
                    Some(pos) => {
                        if pos + 1 != stack.len() {
                            recovered.push(format!(
                                "</{}> closed {} unterminated element(s)",
                                name,
                                stack.len() - pos - 1
                            ));
                        }
                        while stack.len() > pos {
                            close_top(&mut stack, &mut roots);
                        }
                    }
                    None => recovered.push(format!("ignored unmatched </{}>", name)),
                }
            }

            Ok(Event::Eof) => break,

            Err(e) => {
                recovered.push(format!(
                    "stopped at byte {}: {}",
                    reader.buffer_position(),
                    e
                ));
                break;
            }

            _ => {} // Skip text, comments, declarations, etc.
        }

        buf.clear();
    }

    if !stack.is_empty() {
        recovered.push(format!(
            "closed {} element(s) left open at end of input",
            stack.len()
        ));
        while !stack.is_empty() {
            close_top(&mut stack, &mut roots);
        }
    }

    for problem in &recovered {
        log::warn!("CIB XML recovered: {}", problem);
    }

    if roots.is_empty() {
        let reason = recovered
            .into_iter()
            .next()
            .unwrap_or_else(|| "no elements found".to_string());
        return Err(MalformedConfigError::new(reason));
    }

    if roots.len() > 1 {
        log::debug!("{} top-level elements, using the first", roots.len());
    }
    let root = roots.swap_remove(0);

    Ok(XmlDocument { root, recovered })
}

fn element_from(e: &BytesStart) -> XmlElement {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mut element = XmlElement::new(&name);

    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).to_string(),
        };
        element.attributes.insert(key, value);
    }

    element
}

fn attach(element: XmlElement, stack: &mut [XmlElement], roots: &mut Vec<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => roots.push(element),
    }
}

fn close_top(stack: &mut Vec<XmlElement>, roots: &mut Vec<XmlElement>) {
    if let Some(done) = stack.pop() {
        attach(done, stack, roots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let xml = r#"<cib><configuration><nodes><node id="1" uname="vm1"/></nodes></configuration></cib>"#;
        let doc = parse_recovering(xml).unwrap();

        assert!(doc.is_clean());
        assert_eq!(doc.root.name, "cib");
        let node = doc.root.find("node").unwrap();
        assert_eq!(node.attr("uname"), Some("vm1"));
    }

    #[test]
    fn test_attributes_are_unescaped() {
        let xml = r#"<nvpair name="cmdline_options" value="-U TCP-LISTEN:62000 &gt; /dev/null"/>"#;
        let doc = parse_recovering(xml).unwrap();
        assert_eq!(
            doc.root.attr("value"),
            Some("-U TCP-LISTEN:62000 > /dev/null")
        );
    }

    #[test]
    fn test_unclosed_elements_are_closed_at_eof() {
        let xml = r#"<cib><configuration><resources><primitive id="a" type="IPaddr2"/>"#;
        let doc = parse_recovering(xml).unwrap();

        assert!(!doc.is_clean());
        let resources = doc.root.find("resources").unwrap();
        assert_eq!(resources.children.len(), 1);
    }

    #[test]
    fn test_mismatched_end_closes_to_ancestor() {
        let xml = r#"<a><b><c></b><d/></a>"#;
        let doc = parse_recovering(xml).unwrap();

        let b = doc.root.child("b").unwrap();
        assert!(b.child("c").is_some());
        // <d/> lands under <a>, not under the unterminated <c>
        assert!(doc.root.child("d").is_some());
        assert_eq!(doc.recovered.len(), 1);
    }

    #[test]
    fn test_unmatched_end_is_ignored() {
        let xml = r#"<a><b/></x></a>"#;
        let doc = parse_recovering(xml).unwrap();
        assert_eq!(doc.root.children.len(), 1);
        assert!(!doc.is_clean());
    }

    #[test]
    fn test_truncated_inside_tag_keeps_prefix() {
        let xml = r#"<cib><configuration><nodes><node id="1" uname="vm1"/><node id="2" una"#;
        let doc = parse_recovering(xml).unwrap();

        let nodes = doc.root.find("nodes").unwrap();
        assert_eq!(nodes.children_named("node").count(), 1);
    }

    #[test]
    fn test_nothing_parseable() {
        assert!(parse_recovering("").is_err());
        assert!(parse_recovering("just some text").is_err());
    }
}
