//! Mutable XML element tree.
//!
//! Each [`Element`] has a name, attributes, an optional text node and child
//! elements. Text is `None` for a self-closing element (`<Tag />`) and
//! `Some("")` for an explicitly empty one (`<Tag></Tag>`); the distinction
//! survives a serialize/parse cycle. Whitespace between child elements is
//! formatting and is dropped on parse. Comments, processing instructions and
//! the XML declaration are not kept: a rewritten project loses any comments a
//! user added by hand, and the declaration is restored by the CDATA pass.

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("invalid attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("document has no root element")]
    NoRoot,
    #[error("document has more than one root element")]
    MultipleRoots,
    #[error("element <{0}> is not closed")]
    Unclosed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Follow a `/`-separated path of child names, e.g. `"Fields/Field_SceneType"`.
    pub fn find_path(&self, path: &str) -> Option<&Element> {
        path.split('/').try_fold(self, |el, name| el.find(name))
    }

    pub fn find_path_mut(&mut self, path: &str) -> Option<&mut Element> {
        path.split('/').try_fold(self, |el, name| el.find_mut(name))
    }

    /// Text of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(Element::text)
    }

    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name == name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Insert a child at `index`, or append if `index` is past the end.
    pub fn insert(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    /// Remove the first direct child with the given name.
    pub fn remove(&mut self, name: &str) -> Option<Element> {
        let index = self.position(name)?;
        Some(self.children.remove(index))
    }

    /// Remove every direct child with the given name.
    pub fn remove_all(&mut self, name: &str) {
        self.children.retain(|c| c.name != name);
    }

    /// The first child with the given name, created at `index` if missing.
    pub fn get_or_insert(&mut self, name: &str, index: usize) -> &mut Element {
        let position = match self.position(name) {
            Some(position) => position,
            None => {
                let index = index.min(self.children.len());
                self.children.insert(index, Element::new(name));
                index
            }
        };
        &mut self.children[position]
    }

    /// Parse a document into its root element.
    pub fn parse(text: &str) -> Result<Element, TreeError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(element, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let Some(mut element) = stack.pop() else {
                        continue;
                    };
                    if element.children.is_empty() {
                        element.text.get_or_insert_with(String::new);
                    } else if element.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
                        element.text = None;
                    }
                    attach(element, &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let text = text.unescape()?;
                        current.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        let data = data.into_inner();
                        current
                            .text
                            .get_or_insert_with(String::new)
                            .push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(TreeError::Unclosed(open.name));
        }
        root.ok_or(TreeError::NoRoot)
    }

    /// Serialize as indented XML without a declaration.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, 0);
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        let indent = "\t".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }

        if self.children.is_empty() {
            match &self.text {
                None => out.push_str(" />\n"),
                Some(text) => {
                    out.push('>');
                    out.push_str(&partial_escape(text.as_str()));
                    out.push_str("</");
                    out.push_str(&self.name);
                    out.push_str(">\n");
                }
            }
            return;
        }

        out.push_str(">\n");
        if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
            out.push_str(&indent);
            out.push('\t');
            out.push_str(&partial_escape(text));
            out.push('\n');
        }
        for child in &self.children {
            child.write_into(out, depth + 1);
        }
        out.push_str(&indent);
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, TreeError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), TreeError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => return Err(TreeError::MultipleRoots),
        None => *root = Some(element),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_instructions_are_not_kept() {
        let root = Element::parse(
            "<YWRITER7><!-- backup of 3 May --><?app hint?><PROJECT><Title>A<!-- x -->B</Title>\
             </PROJECT></YWRITER7>",
        )
        .unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.find_path("PROJECT/Title").and_then(Element::text), Some("AB"));
        let xml = root.to_xml_string();
        assert!(!xml.contains("<!--"));
        assert!(!xml.contains("<?app"));
    }

    #[test]
    fn parse_nested_elements() {
        let root = Element::parse(
            "<?xml version=\"1.0\"?>\n<YWRITER7>\n  <PROJECT>\n    <Title>Novel</Title>\n  </PROJECT>\n</YWRITER7>",
        )
        .unwrap();
        assert_eq!(root.name, "YWRITER7");
        assert_eq!(root.text, None);
        assert_eq!(root.find_path("PROJECT/Title").and_then(Element::text), Some("Novel"));
    }

    #[test]
    fn empty_and_self_closing_are_distinct() {
        let root = Element::parse("<r><a></a><b /></r>").unwrap();
        assert_eq!(root.child_text("a"), Some(""));
        assert_eq!(root.child_text("b"), None);
        assert!(root.has_child("b"));
    }

    #[test]
    fn cdata_content_is_kept_verbatim() {
        let root = Element::parse("<r><Desc><![CDATA[a < b & [i]c[/i]]]></Desc></r>").unwrap();
        assert_eq!(root.child_text("Desc"), Some("a < b & [i]c[/i]"));
    }

    #[test]
    fn entities_are_unescaped() {
        let root = Element::parse("<r><t>Tom &amp; Jerry &lt;3</t></r>").unwrap();
        assert_eq!(root.child_text("t"), Some("Tom & Jerry <3"));
    }

    #[test]
    fn attributes_are_parsed() {
        let root = Element::parse("<r><x id=\"1\" name=\"a&amp;b\"/></r>").unwrap();
        let x = root.find("x").unwrap();
        assert_eq!(x.attribute("id"), Some("1"));
        assert_eq!(x.attribute("name"), Some("a&b"));
        assert_eq!(x.attribute("missing"), None);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(Element::parse("<r><a></b></r>").is_err());
        assert!(matches!(
            Element::parse("<r><a>"),
            Err(TreeError::Unclosed(_) | TreeError::Syntax(_))
        ));
        assert!(matches!(Element::parse(""), Err(TreeError::NoRoot)));
        assert!(matches!(
            Element::parse("<a/><b/>"),
            Err(TreeError::MultipleRoots)
        ));
    }

    #[test]
    fn serialize_then_parse_is_stable() {
        let mut root = Element::new("r");
        root.push(Element::with_text("Title", "A & B <c>"));
        root.push(Element::with_text("Empty", ""));
        root.push(Element::new("Marker"));
        let mut fields = Element::new("Fields");
        fields.push(Element::with_text("Field_X", "1"));
        root.push(fields);

        let text = root.to_xml_string();
        assert!(text.contains("<Marker />"));
        assert!(text.contains("<Empty></Empty>"));
        assert!(text.contains("A &amp; B &lt;c&gt;"));
        assert_eq!(Element::parse(&text).unwrap(), root);
    }

    #[test]
    fn get_or_insert_creates_at_index() {
        let mut root = Element::parse("<r><a/><c/></r>").unwrap();
        root.get_or_insert("b", 1).set_text("x");
        let names: Vec<_> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        root.get_or_insert("a", 99).set_text("y");
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.child_text("a"), Some("y"));
    }

    #[test]
    fn insert_past_end_appends() {
        let mut root = Element::new("r");
        root.insert(5, Element::new("a"));
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn remove_helpers() {
        let mut root = Element::parse("<r><a/><b/><a/></r>").unwrap();
        assert!(root.remove("a").is_some());
        assert_eq!(root.find_all("a").count(), 1);
        root.remove_all("a");
        assert!(!root.has_child("a"));
        assert!(root.remove("a").is_none());
    }
}
