//! XML document handling
//!
//! This module provides the generic tree-of-elements view the document
//! loader consumes. Element and attribute names are reduced to their
//! local part; namespace prefixes are stripped (a documented
//! simplification, sufficient for WADL documents).

use crate::error::{Error, Result};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One piece of an element's content, in document order
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// A run of character data
    Text(String),
    /// A child element
    Element(Element),
}

/// XML element in the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Local element name (namespace prefix stripped)
    pub name: String,
    /// Element attributes in document order
    pub attributes: IndexMap<String, String>,
    /// Text runs and child elements, interleaved in document order
    pub content: Vec<Content>,
}

impl Element {
    /// Create a new element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            content: Vec::new(),
        }
    }

    /// Get an attribute value by local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.content.push(Content::Element(child));
    }

    /// Append a run of character data, merging adjacent runs
    pub fn push_text(&mut self, text: &str) {
        if let Some(Content::Text(run)) = self.content.last_mut() {
            run.push_str(text);
        } else {
            self.content.push(Content::Text(text.to_string()));
        }
    }

    /// The child elements in document order
    pub fn children(&self) -> Vec<&Element> {
        self.content
            .iter()
            .filter_map(|piece| match piece {
                Content::Element(child) => Some(child),
                Content::Text(_) => None,
            })
            .collect()
    }

    /// The first run of character data, if any
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|piece| match piece {
            Content::Text(run) => Some(run.as_str()),
            Content::Element(_) => None,
        })
    }

    /// Find child elements by local name
    pub fn find_children(&self, name: &str) -> Vec<&Element> {
        self.children()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }

    /// Find the first element with the given local name, searching this
    /// element and its subtree in document order
    pub fn find_descendant(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children()
            .into_iter()
            .find_map(|child| child.find_descendant(name))
    }

    /// The text of this element and its subtree, in document order,
    /// trimmed at the ends
    pub fn inner_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        for piece in &self.content {
            match piece {
                Content::Text(text) => out.push_str(text),
                Content::Element(child) => child.collect_text(out),
            }
        }
    }
}

/// XML document representation
#[derive(Debug, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);

        let mut doc = Document::new();
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let element = Self::parse_element(&e)?;
                    element_stack.push(element);
                }
                Ok(Event::End(_)) => {
                    if let Some(current) = element_stack.pop() {
                        if let Some(parent) = element_stack.last_mut() {
                            parent.add_child(current);
                        } else {
                            doc.root = Some(current);
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let element = Self::parse_element(&e)?;
                    if let Some(parent) = element_stack.last_mut() {
                        parent.add_child(element);
                    } else {
                        doc.root = Some(element);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?
                            .to_string();
                        // Whitespace-only runs are document formatting,
                        // not content; anything else is kept verbatim.
                        if !text.trim().is_empty() {
                            current.push_text(&text);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // Ignore other events (comments, processing instructions, etc.)
            }
            buf.clear();
        }

        Ok(doc)
    }

    /// Parse element from a BytesStart event
    fn parse_element(start: &BytesStart) -> Result<Element> {
        let name_bytes = start.name();
        let name = std::str::from_utf8(name_bytes.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?;

        let mut element = Element::new(local_name(name));

        for attr_result in start.attributes() {
            let attr =
                attr_result.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?;

            // Drop namespace declarations; everything else is kept
            // under its qualified name with only the xml: prefix
            // preserved (WADL uses xml:lang on doc elements).
            if attr_name == "xmlns" || attr_name.starts_with("xmlns:") {
                continue;
            }

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            let key = if attr_name.starts_with("xml:") {
                attr_name.to_string()
            } else {
                local_name(attr_name).to_string()
            };
            element.attributes.insert(key, attr_value);
        }

        Ok(element)
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }
}

/// Strip a namespace prefix from a qualified name
pub fn local_name(name: &str) -> &str {
    match name.split_once(':') {
        Some((_prefix, local)) => local,
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].name, "child");
        assert_eq!(root.children()[0].text(), Some("text"));
    }

    #[test]
    fn test_parse_with_attributes() {
        let xml = r#"<resource id="top" path="palette"><method name="GET"/></resource>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.attribute("id"), Some("top"));
        assert_eq!(root.attribute("path"), Some("palette"));
    }

    #[test]
    fn test_prefixes_are_stripped() {
        let xml = r#"<wadl:application xmlns:wadl="http://wadl.dev.java.net/2009/02">
            <wadl:resources base="http://example.com/"/>
        </wadl:application>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.name, "application");
        assert_eq!(root.children()[0].name, "resources");
        assert!(root.attribute("xmlns:wadl").is_none());
    }

    #[test]
    fn test_xml_lang_is_preserved() {
        let xml = r#"<doc xml:lang="en" title="About">Some prose.</doc>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.attribute("xml:lang"), Some("en"));
        assert_eq!(root.attribute("title"), Some("About"));
    }

    #[test]
    fn test_find_children_and_descendant() {
        let xml = r#"<root><a/><b><c id="1"/></b><a/></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.find_children("a").len(), 2);
        assert_eq!(
            root.find_descendant("c").and_then(|e| e.attribute("id")),
            Some("1")
        );
    }

    #[test]
    fn test_mixed_content_keeps_interleaved_text() {
        let xml = r#"<doc>An <em>important</em> point.</doc>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.inner_text(), "An important point.");
        assert_eq!(
            root.content,
            vec![
                Content::Text("An ".to_string()),
                Content::Element({
                    let mut em = Element::new("em");
                    em.push_text("important");
                    em
                }),
                Content::Text(" point.".to_string()),
            ]
        );
    }

    #[test]
    fn test_whitespace_between_elements_is_dropped() {
        let xml = "<root>\n  <a/>\n  <b>kept</b>\n</root>";
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.text(), None);
        assert_eq!(root.inner_text(), "kept");
    }

    #[test]
    fn test_malformed_xml() {
        assert!(Document::from_string("<root><child></root>").is_err());
    }
}
