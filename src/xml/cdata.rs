//! CDATA registry and post-serialization patching.
//!
//! The element tree cannot express CDATA sections, so they are handled as
//! text on both sides of it:
//!
//! 1. Before parsing, [`CdataRegistry::scan`] looks at the raw file for
//!    `<Name><![CDATA[` and registers every element name found. This picks up
//!    user-defined custom fields that the authoring tool stores as CDATA.
//! 2. After serializing, [`CdataRegistry::postprocess`] prepends the XML
//!    declaration and wraps the text of every registered element in a CDATA
//!    section, undoing the entity escaping the serializer applied to it.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Elements that always carry free text.
pub const BUILTIN_CDATA_TAGS: &[&str] = &[
    "Title",
    "AuthorName",
    "Bio",
    "Desc",
    "FieldTitle1",
    "FieldTitle2",
    "FieldTitle3",
    "FieldTitle4",
    "LaTeXHeaderFile",
    "Tags",
    "AKA",
    "ImageFile",
    "FullName",
    "Goals",
    "Notes",
    "RTFFile",
    "SceneContent",
    "Outcome",
    "Goal",
    "Conflict",
];

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

static CDATA_OPENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>/!?\s]+)><!\[CDATA\[").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdataRegistry {
    tags: BTreeSet<String>,
}

impl Default for CdataRegistry {
    fn default() -> Self {
        Self {
            tags: BUILTIN_CDATA_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl CdataRegistry {
    /// Built-in tags plus configured extras.
    pub fn with_extra(extra: &[String]) -> Self {
        let mut registry = Self::default();
        for tag in extra {
            registry.insert(tag);
        }
        registry
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Register a tag. Returns `true` if it was not yet known.
    pub fn insert(&mut self, tag: &str) -> bool {
        self.tags.insert(tag.to_string())
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Register every element name that opens a CDATA section in `raw`.
    ///
    /// Returns the number of newly registered names.
    pub fn scan(&mut self, raw: &str) -> usize {
        let mut added = 0;
        for caps in CDATA_OPENING.captures_iter(raw) {
            let tag = &caps[1];
            if self.insert(tag) {
                tracing::debug!(tag, "Registered CDATA element");
                added += 1;
            }
        }
        added
    }

    /// Turn serializer output into the final file text.
    ///
    /// Only text-only elements are wrapped; an element with child elements is
    /// left alone even if its name is registered.
    pub fn postprocess(&self, xml: &str) -> String {
        let alternatives = self
            .tags
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!("<({alternatives})>([^<]*)</({alternatives})>");
        let body = match Regex::new(&pattern) {
            Ok(re) => re
                .replace_all(xml, |caps: &regex::Captures| {
                    let tag = &caps[1];
                    let text = quick_xml::escape::unescape(&caps[2])
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| caps[2].to_string());
                    format!(
                        "<{tag}><![CDATA[{}]]></{tag}>",
                        text.replace("]]>", "]]]]><![CDATA[>")
                    )
                })
                .into_owned(),
            Err(e) => {
                tracing::warn!(error = %e, "CDATA pattern rejected, writing plain text");
                xml.to_string()
            }
        };
        format!("{XML_DECLARATION}\n{body}")
    }
}
