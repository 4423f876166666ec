//! Entity XML accessor.
//!
//! A coArchi entity file is one XML document whose root carries a bag of
//! flat `properties` children, each a `(key, value)` attribute pair. The
//! inspector reads and writes only keys in the `pwrt:inspector:` namespace;
//! every other child (diagram geometry, relationship endpoints) is opaque
//! and preserved verbatim.
//!
//! Parsing goes through `roxmltree`; the on-disk form is produced by the
//! bespoke fixed-form writer in [`writer`] because the model's serialization
//! is not standard XML pretty-printing and its stability matters for humans
//! reviewing diffs. Names are stored in the expanded `{namespace}local`
//! form. Text nodes are not carried - entity files have none.

pub mod writer;

use crate::core::InspectorError;
use std::path::Path;

/// The Archimate model namespace, qualified as `archimate:` on roots.
pub const ARCHIMATE_NS: &str = "http://www.archimatetool.com/archimate";

/// The XML-Schema-instance namespace, re-prefixed as `xsi:` when writing.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// One XML element: expanded tag name, ordered attributes, child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag in expanded form: `{namespace}local`, or bare `local` when the
    /// element has no namespace.
    pub tag: String,
    /// Attributes in document order, names in expanded form.
    pub attrs: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Creates an element with no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Attribute value by expanded name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, replacing in place when it exists, appending
    /// otherwise.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }
}

/// One entity file, owned by the engine for the duration of an inspection.
#[derive(Debug, Clone)]
pub struct Entity {
    root: Element,
}

impl Entity {
    /// Parses an entity from its XML text.
    pub fn parse_str(text: &str, origin: &str) -> Result<Self, InspectorError> {
        let doc = roxmltree::Document::parse(text.trim_start()).map_err(|e| {
            InspectorError::EntityParseError {
                file: origin.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            root: convert(doc.root_element()),
        })
    }

    /// Reads and parses an entity file.
    pub fn parse_file(path: &Path) -> Result<Self, InspectorError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_str(&text, &path.display().to_string())
    }

    /// The root element, for read-only inspection in tests.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Returns true when the root carries a `properties` child with this key.
    pub fn has_property(&self, key: &str) -> bool {
        self.find_property(key).is_some()
    }

    /// The `value` attribute of the `properties` child with this key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.find_property(key).and_then(|e| e.attr("value"))
    }

    /// Inserts or updates a `(key, value)` property on the root.
    ///
    /// A new property is appended after the existing children; ordering is
    /// normalized by [`sort_children`](Self::sort_children) before writing.
    pub fn upsert_property(&mut self, key: &str, value: &str) {
        if let Some(e) = self
            .root
            .children
            .iter_mut()
            .find(|e| e.tag == "properties" && e.attr("key") == Some(key))
        {
            e.set_attr("value", value);
            return;
        }
        let mut e = Element::new("properties");
        e.set_attr("key", key);
        e.set_attr("value", value);
        self.root.children.push(e);
    }

    /// Stable-sorts the root's children by `(tag, key)` so the written form
    /// is diff-stable.
    pub fn sort_children(&mut self) {
        self.root.children.sort_by(|a, b| {
            let ka = (a.tag.as_str(), a.attr("key").unwrap_or(""));
            let kb = (b.tag.as_str(), b.attr("key").unwrap_or(""));
            ka.cmp(&kb)
        });
    }

    /// Serializes through the canonical fixed-form writer.
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        writer::write_element(&self.root, &mut out, 0);
        out
    }

    /// Writes the canonical form to a file.
    pub fn write_file(&self, path: &Path) -> Result<(), InspectorError> {
        std::fs::write(path, self.to_canonical_string())?;
        Ok(())
    }

    fn find_property(&self, key: &str) -> Option<&Element> {
        self.root
            .children
            .iter()
            .find(|e| e.tag == "properties" && e.attr("key") == Some(key))
    }
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let tag = expanded_tag(node);
    let attrs = node
        .attributes()
        .map(|a| (expanded_attr_name(&a), a.value().to_string()))
        .collect();
    let children = node
        .children()
        .filter(roxmltree::Node::is_element)
        .map(convert)
        .collect();
    Element {
        tag,
        attrs,
        children,
    }
}

fn expanded_tag(node: roxmltree::Node<'_, '_>) -> String {
    match node.tag_name().namespace() {
        Some(ns) => format!("{{{ns}}}{}", node.tag_name().name()),
        None => node.tag_name().name().to_string(),
    }
}

fn expanded_attr_name(attr: &roxmltree::Attribute<'_, '_>) -> String {
    match attr.namespace() {
        Some(ns) => format!("{{{ns}}}{}", attr.name()),
        None => attr.name().to_string(),
    }
}
