#![forbid(unsafe_code)]

//! Owned, mutable XML elements.
//!
//! `roxmltree` documents are read-only views borrowing from the source text.
//! Binding a digest to a node needs mutation (replace or append text), so
//! elements of interest are converted into this owned form first.

use sigtuna_core::Error;

/// Content of an element: interleaved text and child elements, in
/// document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlContent {
    Text(String),
    Element(Element),
}

/// An owned XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlContent>,
}

impl Element {
    /// Create an empty element with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse an XML fragment and convert its root element to owned form.
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let doc = roxmltree::Document::parse_with_options(xml, crate::parsing_options())
            .map_err(|e: roxmltree::Error| Error::XmlParse(e.to_string()))?;
        Ok(Self::from_node(doc.root_element()))
    }

    /// Convert a parsed `roxmltree` element to owned form.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut element = Element::new(node.tag_name().name());
        for attr in node.attributes() {
            element
                .attributes
                .push((attr.name().to_owned(), attr.value().to_owned()));
        }
        for child in node.children() {
            if child.is_element() {
                element
                    .children
                    .push(XmlContent::Element(Self::from_node(child)));
            } else if child.is_text() {
                if let Some(text) = child.text() {
                    element.children.push(XmlContent::Text(text.to_owned()));
                }
            }
        }
        element
    }

    /// Local name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        if let Some(attr) = self.attributes.iter_mut().find(|(n, _)| n == name) {
            attr.1 = value.to_owned();
        } else {
            self.attributes.push((name.to_owned(), value.to_owned()));
        }
    }

    /// Concatenated direct text content of the element.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlContent::Text(text) = child {
                out.push_str(text);
            }
        }
        out
    }

    /// Find the first direct child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|c| match c {
            XmlContent::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Remove all content (text and child elements).
    pub fn remove_content(&mut self) {
        self.children.clear();
    }

    /// Append text after any existing content.
    pub fn append_text(&mut self, text: &str) {
        self.children.push(XmlContent::Text(text.to_owned()));
    }

    /// Replace all content with the given text.
    pub fn set_text(&mut self, text: &str) {
        self.remove_content();
        self.append_text(text);
    }

    /// Append a child element after any existing content.
    pub fn append_child(&mut self, child: Element) {
        self.children.push(XmlContent::Element(child));
    }

    /// Serialize the element to XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlContent::Text(text) => out.push_str(&escape_text(text)),
                XmlContent::Element(element) => element.write_to(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Escape text node content.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape attribute value content.
fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_text() {
        let element =
            Element::parse(r#"<DigestValue Id="d1">qZk+NkcGgWq6PiVxeFDCbJzQ2J0=</DigestValue>"#)
                .unwrap();
        assert_eq!(element.name(), "DigestValue");
        assert_eq!(element.attribute("Id"), Some("d1"));
        assert_eq!(element.text(), "qZk+NkcGgWq6PiVxeFDCbJzQ2J0=");
    }

    #[test]
    fn test_child_lookup() {
        let element = Element::parse(
            r#"<DigestMethod Algorithm="x"><HMACOutputLength>128</HMACOutputLength></DigestMethod>"#,
        )
        .unwrap();
        let length = element.child("HMACOutputLength").unwrap();
        assert_eq!(length.text(), "128");
        assert!(element.child("Missing").is_none());
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let mut element = Element::new("DigestValue");
        element.append_text("X");
        element.append_text("abc=");
        assert_eq!(element.text(), "Xabc=");
    }

    #[test]
    fn test_set_text_replaces() {
        let mut element = Element::parse("<DigestValue>old</DigestValue>").unwrap();
        element.set_text("new");
        assert_eq!(element.text(), "new");
    }

    #[test]
    fn test_to_xml_escapes() {
        let mut element = Element::new("Value");
        element.set_attribute("a", "x\"y");
        element.set_text("a&b<c");
        assert_eq!(element.to_xml(), r#"<Value a="x&quot;y">a&amp;b&lt;c</Value>"#);
    }

    #[test]
    fn test_empty_element_serializes_self_closing() {
        let element = Element::new("DigestValue");
        assert_eq!(element.to_xml(), "<DigestValue/>");
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            Element::parse("<broken"),
            Err(Error::XmlParse(_))
        ));
    }
}
