//! Arena XML tree that keeps the source text of every node.
//!
//! Nodes that are never edited serialize back to their original bytes.
//! Editing an element's attributes, or giving a self-closing element its
//! first child, regenerates only that element's tags.

use crate::error::{LoadErrorKind, XamlLoadError};
use crate::id::XmlNodeId;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_PREFIX: &str = "xmlns";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub prefix: Option<String>,
    pub local_name: String,
    /// Unescaped value.
    pub value: String,
}

impl XmlAttribute {
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local_name)
    }

    /// `xmlns` or `xmlns:p` declaration.
    pub fn is_namespace_declaration(&self) -> bool {
        match &self.prefix {
            Some(p) => p == XMLNS_PREFIX,
            None => self.local_name == XMLNS_PREFIX,
        }
    }

    fn matches(&self, prefix: Option<&str>, local_name: &str) -> bool {
        self.prefix.as_deref() == prefix && self.local_name == local_name
    }
}

#[derive(Debug, Clone)]
pub struct XmlElement {
    pub prefix: Option<String>,
    pub local_name: String,
    attributes: Vec<XmlAttribute>,
    /// Source text of the start tag, written while `attributes` still
    /// equal `source_attributes`. `None` for created elements.
    start_raw: Option<String>,
    source_attributes: Vec<XmlAttribute>,
    end_raw: Option<String>,
    self_closing: bool,
}

impl XmlElement {
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.local_name)
    }

    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, prefix: Option<&str>, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.matches(prefix, local_name))
            .map(|a| a.value.as_str())
    }

    /// Whether the start tag will be written back unchanged.
    pub fn is_pristine(&self) -> bool {
        self.start_raw.is_some() && self.attributes == self.source_attributes
    }
}

#[derive(Debug, Clone)]
pub enum XmlNodeKind {
    Document,
    Element(XmlElement),
    /// Character data; `value` is unescaped, `raw` is what gets written.
    Text { raw: String, value: String },
    CData { raw: String, value: String },
    /// Comments, processing instructions, declarations, doctypes.
    Other { raw: String },
}

#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: XmlNodeKind,
    parent: Option<XmlNodeId>,
    children: Vec<XmlNodeId>,
    /// 1-based source position; 0 for nodes created after parsing.
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![XmlNode {
                kind: XmlNodeKind::Document,
                parent: None,
                children: Vec::new(),
                line: 0,
                column: 0,
            }],
        }
    }

    /// Parse XML text into a tree that remembers every node's source.
    pub fn parse(text: &str) -> Result<Self, XamlLoadError> {
        let lines = LineIndex::new(text);
        let mut reader = Reader::from_str(text);
        let mut tree = XmlTree::new();
        let mut stack = vec![tree.document()];

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|e| {
                let (line, column) = lines.position(reader.buffer_position() as usize);
                XamlLoadError::new(LoadErrorKind::Xml, format!("malformed XML: {e}"), line, column)
            })?;
            let end = reader.buffer_position() as usize;
            let raw = text.get(start..end).unwrap_or_default();
            let (line, column) = lines.position(start);
            let parent = *stack.last().unwrap_or(&tree.document());

            match event {
                Event::Start(e) => {
                    let element = element_from(&e, raw, false, line, column)?;
                    let id = tree.push(XmlNodeKind::Element(element), line, column);
                    tree.append_child(parent, id);
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let element = element_from(&e, raw, true, line, column)?;
                    let id = tree.push(XmlNodeKind::Element(element), line, column);
                    tree.append_child(parent, id);
                }
                Event::End(_) => {
                    let Some(id) = stack.pop().filter(|_| !stack.is_empty()) else {
                        return Err(XamlLoadError::new(
                            LoadErrorKind::Xml,
                            "unexpected end tag",
                            line,
                            column,
                        ));
                    };
                    if let XmlNodeKind::Element(el) = &mut tree.nodes[id.index()].kind {
                        el.end_raw = Some(raw.to_string());
                    }
                }
                Event::Text(e) => {
                    let value = e
                        .unescape()
                        .map_err(|err| {
                            XamlLoadError::new(
                                LoadErrorKind::Xml,
                                format!("bad character data: {err}"),
                                line,
                                column,
                            )
                        })?
                        .into_owned();
                    let id = tree.push(
                        XmlNodeKind::Text {
                            raw: raw.to_string(),
                            value,
                        },
                        line,
                        column,
                    );
                    tree.append_child(parent, id);
                }
                Event::CData(e) => {
                    let value = String::from_utf8_lossy(&e).into_owned();
                    let id = tree.push(
                        XmlNodeKind::CData {
                            raw: raw.to_string(),
                            value,
                        },
                        line,
                        column,
                    );
                    tree.append_child(parent, id);
                }
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {
                    let id = tree.push(
                        XmlNodeKind::Other {
                            raw: raw.to_string(),
                        },
                        line,
                        column,
                    );
                    tree.append_child(parent, id);
                }
                Event::Eof => break,
            }
        }

        if stack.len() > 1 {
            let (line, column) = lines.position(text.len());
            return Err(XamlLoadError::new(
                LoadErrorKind::Xml,
                "unexpected end of document: unclosed element",
                line,
                column,
            ));
        }
        if tree.document_element().is_none() {
            return Err(XamlLoadError::new(
                LoadErrorKind::Xml,
                "document has no root element",
                1,
                1,
            ));
        }
        Ok(tree)
    }

    fn push(&mut self, kind: XmlNodeKind, line: u32, column: u32) -> XmlNodeId {
        let id = XmlNodeId::from_index(self.nodes.len());
        self.nodes.push(XmlNode {
            kind,
            parent: None,
            children: Vec::new(),
            line,
            column,
        });
        id
    }

    // ─── Navigation ───────────────────────────────────────────────────────

    pub fn document(&self) -> XmlNodeId {
        XmlNodeId::from_index(0)
    }

    pub fn document_element(&self) -> Option<XmlNodeId> {
        self.children(self.document())
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some())
    }

    pub fn node(&self, id: XmlNodeId) -> &XmlNode {
        &self.nodes[id.index()]
    }

    pub fn element(&self, id: XmlNodeId) -> Option<&XmlElement> {
        match &self.nodes[id.index()].kind {
            XmlNodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: XmlNodeId) -> Option<&mut XmlElement> {
        match &mut self.nodes[id.index()].kind {
            XmlNodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: XmlNodeId) -> Option<XmlNodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: XmlNodeId) -> &[XmlNodeId] {
        &self.nodes[id.index()].children
    }

    pub fn element_children(&self, id: XmlNodeId) -> impl Iterator<Item = XmlNodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.element(c).is_some())
    }

    pub fn position(&self, id: XmlNodeId) -> (u32, u32) {
        let node = self.node(id);
        (node.line, node.column)
    }

    /// Character data of a text or CDATA node.
    pub fn text_value(&self, id: XmlNodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            XmlNodeKind::Text { value, .. } | XmlNodeKind::CData { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_cdata(&self, id: XmlNodeId) -> bool {
        matches!(self.nodes[id.index()].kind, XmlNodeKind::CData { .. })
    }

    // ─── Namespaces ───────────────────────────────────────────────────────

    /// Resolve a prefix (or the default namespace) in scope at `id`.
    pub fn lookup_namespace(&self, id: XmlNodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(el) = self.element(node) {
                let decl = match prefix {
                    Some(p) => el.attribute(Some(XMLNS_PREFIX), p),
                    None => el.attribute(None, XMLNS_PREFIX),
                };
                if decl.is_some() {
                    return decl;
                }
            }
            current = self.parent(node);
        }
        None
    }

    /// Namespace URI of an element.
    pub fn namespace_of(&self, id: XmlNodeId) -> Option<&str> {
        let el = self.element(id)?;
        self.lookup_namespace(id, el.prefix.as_deref())
    }

    /// Find a prefix bound to `namespace` in scope at `id`. `Some(None)`
    /// means the default namespace.
    pub fn prefix_of_namespace(&self, id: XmlNodeId, namespace: &str) -> Option<Option<String>> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(el) = self.element(node) {
                for attr in el.attributes.iter().filter(|a| a.value == namespace) {
                    match &attr.prefix {
                        Some(p) if p == XMLNS_PREFIX => {
                            return Some(Some(attr.local_name.clone()));
                        }
                        None if attr.local_name == XMLNS_PREFIX => return Some(None),
                        _ => {}
                    }
                }
            }
            current = self.parent(node);
        }
        None
    }

    /// Whether `xml:space="preserve"` is in effect at `id`.
    pub fn is_space_preserved(&self, id: XmlNodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(space) = self
                .element(node)
                .and_then(|el| el.attribute(Some("xml"), "space"))
            {
                return space == "preserve";
            }
            current = self.parent(node);
        }
        false
    }

    // ─── Mutation ─────────────────────────────────────────────────────────

    /// Create a detached element. Its tags are generated on write.
    pub fn create_element(&mut self, prefix: Option<&str>, local_name: &str) -> XmlNodeId {
        self.push(
            XmlNodeKind::Element(XmlElement {
                prefix: prefix.map(str::to_string),
                local_name: local_name.to_string(),
                attributes: Vec::new(),
                start_raw: None,
                source_attributes: Vec::new(),
                end_raw: None,
                self_closing: true,
            }),
            0,
            0,
        )
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, value: &str) -> XmlNodeId {
        self.push(
            XmlNodeKind::Text {
                raw: escape_text(value),
                value: value.to_string(),
            },
            0,
            0,
        )
    }

    pub fn set_text(&mut self, id: XmlNodeId, text: &str) {
        match &mut self.nodes[id.index()].kind {
            XmlNodeKind::Text { raw, value } => {
                *raw = escape_text(text);
                *value = text.to_string();
            }
            XmlNodeKind::CData { raw, value } => {
                *raw = format!("<![CDATA[{text}]]>");
                *value = text.to_string();
            }
            _ => {}
        }
    }

    pub fn set_attribute(&mut self, id: XmlNodeId, prefix: Option<&str>, local_name: &str, value: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        match el.attributes.iter_mut().find(|a| a.matches(prefix, local_name)) {
            Some(attr) if attr.value == value => return,
            Some(attr) => attr.value = value.to_string(),
            None => el.attributes.push(XmlAttribute {
                prefix: prefix.map(str::to_string),
                local_name: local_name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn remove_attribute(&mut self, id: XmlNodeId, prefix: Option<&str>, local_name: &str) -> bool {
        let Some(el) = self.element_mut(id) else {
            return false;
        };
        let before = el.attributes.len();
        el.attributes.retain(|a| !a.matches(prefix, local_name));
        el.attributes.len() != before
    }

    pub fn append_child(&mut self, parent: XmlNodeId, child: XmlNodeId) {
        let at = self.nodes[parent.index()].children.len();
        self.insert_child(parent, at, child);
    }

    /// Insert `child` at `index` among `parent`'s children, detaching it
    /// from any previous parent first.
    pub fn insert_child(&mut self, parent: XmlNodeId, index: usize, child: XmlNodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Insert `child` before `reference`, or append when `reference` is
    /// `None` or not a child of `parent`.
    pub fn insert_before(&mut self, parent: XmlNodeId, child: XmlNodeId, reference: Option<XmlNodeId>) {
        let index = reference
            .and_then(|r| self.index_in_parent(r).filter(|_| self.parent(r) == Some(parent)))
            .unwrap_or(self.nodes[parent.index()].children.len());
        self.insert_child(parent, index, child);
    }

    pub fn insert_after(&mut self, parent: XmlNodeId, child: XmlNodeId, reference: XmlNodeId) {
        match self.index_in_parent(reference).filter(|_| self.parent(reference) == Some(parent)) {
            Some(i) => {
                // Detaching `child` first can shift `reference` when they share a parent.
                self.detach(child);
                let i = self.index_in_parent(reference).unwrap_or(i);
                self.insert_child(parent, i + 1, child);
            }
            None => self.append_child(parent, child),
        }
    }

    /// Remove a node from its parent. The node stays in the arena and can
    /// be inserted again.
    pub fn detach(&mut self, id: XmlNodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
    }

    /// Copy the subtree at `id` of another tree into this one, detached.
    pub fn import(&mut self, other: &XmlTree, id: XmlNodeId) -> XmlNodeId {
        let source = other.node(id);
        let copy = self.push(source.kind.clone(), source.line, source.column);
        for &child in other.children(id) {
            let child_copy = self.import(other, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    pub fn index_in_parent(&self, id: XmlNodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn is_attached(&self, id: XmlNodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.document()
    }

    // ─── Serialization ────────────────────────────────────────────────────

    pub fn write(&self) -> String {
        let mut out = String::new();
        self.write_node(self.document(), &mut out);
        out
    }

    /// Serialize a single subtree.
    pub fn write_subtree(&self, id: XmlNodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: XmlNodeId, out: &mut String) {
        let node = self.node(id);
        match &node.kind {
            XmlNodeKind::Document => {
                for &child in &node.children {
                    self.write_node(child, out);
                }
            }
            XmlNodeKind::Text { raw, .. } | XmlNodeKind::CData { raw, .. } | XmlNodeKind::Other { raw } => {
                out.push_str(raw);
            }
            XmlNodeKind::Element(el) => {
                let empty = node.children.is_empty();
                let write_self_closing = empty && (el.self_closing || el.end_raw.is_none());
                match &el.start_raw {
                    Some(raw) if el.self_closing == write_self_closing && el.is_pristine() => out.push_str(raw),
                    _ => write_start_tag(el, write_self_closing, out),
                }
                if write_self_closing {
                    return;
                }
                for &child in &node.children {
                    self.write_node(child, out);
                }
                match &el.end_raw {
                    Some(raw) if !el.self_closing => out.push_str(raw),
                    _ => {
                        out.push_str("</");
                        out.push_str(&el.qualified_name());
                        out.push('>');
                    }
                }
            }
        }
    }
}

fn write_start_tag(el: &XmlElement, self_closing: bool, out: &mut String) {
    out.push('<');
    out.push_str(&el.qualified_name());
    for attr in &el.attributes {
        out.push(' ');
        out.push_str(&attr.qualified_name());
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }
    out.push_str(if self_closing { " />" } else { ">" });
}

fn element_from(
    e: &BytesStart<'_>,
    raw: &str,
    self_closing: bool,
    line: u32,
    column: u32,
) -> Result<XmlElement, XamlLoadError> {
    let xml_error = |message: String| XamlLoadError::new(LoadErrorKind::Xml, message, line, column);
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| xml_error(format!("element name is not UTF-8: {err}")))?
        .to_string();
    let (prefix, local_name) = split_qualified(&name);

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(format!("malformed attribute: {err}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| xml_error(format!("attribute name is not UTF-8: {err}")))?;
        let value = attr
            .unescape_value()
            .map_err(|err| xml_error(format!("bad attribute value: {err}")))?
            .into_owned();
        let (prefix, local_name) = split_qualified(key);
        attributes.push(XmlAttribute {
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
            value,
        });
    }

    Ok(XmlElement {
        prefix: prefix.map(str::to_string),
        local_name: local_name.to_string(),
        source_attributes: attributes.clone(),
        attributes,
        start_raw: Some(raw.to_string()),
        end_raw: None,
        self_closing,
    })
}

/// Split `p:local` into its prefix and local name.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

pub fn qualify(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}:{local_name}"),
        _ => local_name.to_string(),
    }
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#xA;"),
            '\t' => out.push_str("&#x9;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Collapse XML whitespace runs to a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split([' ', '\t', '\r', '\n'])
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_whitespace(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

/// Byte offset to 1-based line/column.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|&s| s <= offset).max(1);
        let column = offset - self.starts[line - 1] + 1;
        (line as u32, column as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<!-- top -->
<Root xmlns="urn:a" xmlns:b="urn:b" Title = 'x &amp; y'>
  <b:Child   Value="1"/>
  <Other><![CDATA[raw <stuff>]]></Other>
</Root>
"#;

    #[test]
    fn untouched_tree_writes_source_bytes() {
        let tree = XmlTree::parse(SAMPLE).unwrap();
        assert_eq!(tree.write(), SAMPLE);
    }

    #[test]
    fn attribute_edit_regenerates_only_that_tag() {
        let mut tree = XmlTree::parse(SAMPLE).unwrap();
        let root = tree.document_element().unwrap();
        let child = tree.element_children(root).next().unwrap();
        tree.set_attribute(child, None, "Value", "2");
        let out = tree.write();
        assert!(out.contains(r#"<b:Child Value="2" />"#));
        assert!(out.contains(r#"<Root xmlns="urn:a" xmlns:b="urn:b" Title = 'x &amp; y'>"#));
        assert!(out.contains("<![CDATA[raw <stuff>]]>"));
    }

    #[test]
    fn restored_attributes_write_source_bytes_again() {
        let mut tree = XmlTree::parse(SAMPLE).unwrap();
        let root = tree.document_element().unwrap();
        let child = tree.element_children(root).next().unwrap();
        tree.set_attribute(child, None, "Value", "2");
        tree.set_attribute(child, None, "Extra", "x");
        assert!(!tree.element(child).unwrap().is_pristine());

        tree.set_attribute(child, None, "Value", "1");
        tree.remove_attribute(child, None, "Extra");
        assert!(tree.element(child).unwrap().is_pristine());
        assert_eq!(tree.write(), SAMPLE);
    }

    #[test]
    fn self_closing_element_gains_end_tag() {
        let mut tree = XmlTree::parse(r#"<A><B x="1"/></A>"#).unwrap();
        let a = tree.document_element().unwrap();
        let b = tree.element_children(a).next().unwrap();
        let c = tree.create_element(None, "C");
        tree.append_child(b, c);
        assert_eq!(tree.write(), r#"<A><B x="1"><C /></B></A>"#);
        tree.detach(c);
        assert_eq!(tree.write(), r#"<A><B x="1"/></A>"#);
    }

    #[test]
    fn namespace_lookup() {
        let tree = XmlTree::parse(SAMPLE).unwrap();
        let root = tree.document_element().unwrap();
        let child = tree.element_children(root).next().unwrap();
        assert_eq!(tree.namespace_of(root), Some("urn:a"));
        assert_eq!(tree.namespace_of(child), Some("urn:b"));
        assert_eq!(tree.prefix_of_namespace(child, "urn:b"), Some(Some("b".to_string())));
        assert_eq!(tree.prefix_of_namespace(child, "urn:a"), Some(None));
        assert_eq!(tree.prefix_of_namespace(child, "urn:c"), None);
    }

    #[test]
    fn positions_are_one_based() {
        let tree = XmlTree::parse(SAMPLE).unwrap();
        let root = tree.document_element().unwrap();
        assert_eq!(tree.position(root), (3, 1));
        let child = tree.element_children(root).next().unwrap();
        assert_eq!(tree.position(child), (4, 3));
    }

    #[test]
    fn unescaped_values() {
        let tree = XmlTree::parse(SAMPLE).unwrap();
        let root = tree.document_element().unwrap();
        assert_eq!(tree.element(root).unwrap().attribute(None, "Title"), Some("x & y"));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = XmlTree::parse("<A><B></A>").unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::Xml);
    }

    #[test]
    fn whitespace_normalization() {
        assert_eq!(normalize_whitespace("  hello \n\t world  "), "hello world");
        assert!(is_whitespace(" \n\t"));
    }
}
