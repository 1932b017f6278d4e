use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::escape::escape;

use crate::model::store::TaskError;

/// Error type for reading the persisted state document
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("element <{0}> is never closed")]
    Unclosed(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("could not rebuild task tree: {0}")]
    Store(#[from] TaskError),
}

/// A parsed element: name, attributes in document order, child elements,
/// and concatenated (trimmed) text content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push((key.to_string(), value.into()));
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// First direct child with this name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct children with this name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parse a whole document into its root element.
pub fn parse_document(input: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from(&e)?),
            Event::Empty(e) => {
                let element = element_from(&e)?;
                close(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                // the reader has already checked the end name matches
                if let Some(element) = stack.pop() {
                    close(&mut stack, &mut root, element);
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::Unclosed(open.name));
    }
    root.ok_or(ParseError::NoRoot)
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, ParseError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn close(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Serialize `root` as a UTF-8 document with two-space indentation.
pub fn write_document(root: &Element) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_element(root, 0, &mut out);
    out
}

fn write_element(element: &Element, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push_str(&format!(" {}=\"{}\"", key, escape(value.as_str())));
    }

    match (element.children.is_empty(), element.text.is_empty()) {
        (true, true) => out.push_str("/>\n"),
        (true, false) => {
            out.push('>');
            out.push_str(&escape(element.text.as_str()));
            out.push_str(&format!("</{}>\n", element.name));
        }
        (false, _) => {
            out.push_str(">\n");
            if !element.text.is_empty() {
                out.push_str(&"  ".repeat(depth + 1));
                out.push_str(&escape(element.text.as_str()));
                out.push('\n');
            }
            for child in &element.children {
                write_element(child, depth + 1, out);
            }
            out.push_str(&format!("{}</{}>\n", indent, element.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_nested_elements_and_attributes() {
        let doc = r#"<?xml version="1.0"?>
<component name="Tasks">
  <tasks>
    <task title="a &amp; b" priority="Normal">
      <task title="child"/>
    </task>
  </tasks>
</component>"#;
        let root = parse_document(doc).unwrap();
        assert_eq!(root.name, "component");
        assert_eq!(root.attr("name"), Some("Tasks"));
        let tasks = root.child("tasks").unwrap();
        let task = tasks.children_named("task").next().unwrap();
        assert_eq!(task.attr("title"), Some("a & b"));
        assert_eq!(task.children[0].attr("title"), Some("child"));
        assert_eq!(task.attr("missing"), None);
    }

    #[test]
    fn test_text_content_is_trimmed_and_unescaped() {
        let root = parse_document("<task>\n   Legacy &lt;title&gt;  \n</task>").unwrap();
        assert_eq!(root.text, "Legacy <title>");
    }

    #[test]
    fn test_mismatched_end_tag_is_error() {
        let err = parse_document("<a><b></a>").unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn test_unclosed_element_is_error() {
        let err = parse_document("<a><b/>").unwrap_err();
        assert!(matches!(err, ParseError::Unclosed(name) if name == "a"));
    }

    #[test]
    fn test_empty_document_has_no_root() {
        assert!(matches!(parse_document("").unwrap_err(), ParseError::NoRoot));
    }

    #[test]
    fn test_write_document_escapes_and_nests() {
        let mut root = Element::new("component").with_attr("name", "Tasks");
        let mut tasks = Element::new("tasks");
        tasks.push(Element::new("task").with_attr("title", "\"quoted\" <b>"));
        root.push(tasks);
        root.push(Element::new("note").with_attr("k", "v"));

        let written = write_document(&root);
        assert_eq!(
            written,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <component name=\"Tasks\">\n  \
             <tasks>\n    \
             <task title=\"&quot;quoted&quot; &lt;b&gt;\"/>\n  \
             </tasks>\n  \
             <note k=\"v\"/>\n\
             </component>\n"
        );
        assert_eq!(parse_document(&written).unwrap(), root);
    }
}
