//! Nodes of the XAML object graph.
//!
//! Objects, properties, and text values live in arenas owned by
//! `XamlDocument` and refer to each other by id. A value belongs to at most
//! one property at a time; detached values stay in the arena so undo can
//! put them back.

use crate::id::{ObjectId, PropertyId, TextId, TypeKey, XmlNodeId};
use crate::property::XamlPropertyInfo;
use crate::value::Value;

/// A property value: literal text or an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XamlValue {
    Text(TextId),
    Object(ObjectId),
}

impl XamlValue {
    pub fn as_object(self) -> Option<ObjectId> {
        match self {
            XamlValue::Object(o) => Some(o),
            XamlValue::Text(_) => None,
        }
    }

    pub fn as_text(self) -> Option<TextId> {
        match self {
            XamlValue::Text(t) => Some(t),
            XamlValue::Object(_) => None,
        }
    }
}

/// Where a text value lives in the XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TextBacking {
    /// An attribute on `element`.
    Attribute {
        element: XmlNodeId,
        prefix: Option<String>,
        local_name: String,
    },
    /// A text or CDATA node.
    Node(XmlNodeId),
    /// Not in the XML: freshly created, removed, or an argument inside an
    /// attribute-form markup extension.
    Detached,
}

#[derive(Debug, Clone)]
pub struct XamlTextValue {
    pub(crate) text: String,
    pub(crate) backing: TextBacking,
    pub(crate) parent: Option<PropertyId>,
}

impl XamlTextValue {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parent_property(&self) -> Option<PropertyId> {
        self.parent
    }

    /// The XML node behind this value, for text-node backed values.
    pub fn xml_node(&self) -> Option<XmlNodeId> {
        match self.backing {
            TextBacking::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self.backing, TextBacking::Attribute { .. })
    }
}

#[derive(Debug, Clone)]
pub struct XamlObject {
    pub(crate) element_type: TypeKey,
    pub(crate) instance: Value,
    /// `None` for markup extensions in attribute form.
    pub(crate) element: Option<XmlNodeId>,
    pub(crate) parent: Option<PropertyId>,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) key: Option<String>,
    pub(crate) has_errors: bool,
    pub(crate) markup_extension: bool,
    /// Set when an attribute-form extension was rewritten as an element
    /// because one of its values could not be printed.
    pub(crate) promoted: bool,
    /// Arguments of a non-default constructor; such extensions are not
    /// editable through properties.
    pub(crate) constructor_args: Option<Vec<String>>,
}

impl XamlObject {
    pub fn element_type(&self) -> TypeKey {
        self.element_type
    }

    /// The live instance (or converted primitive) this object describes.
    pub fn instance(&self) -> &Value {
        &self.instance
    }

    pub fn xml_element(&self) -> Option<XmlNodeId> {
        self.element
    }

    pub fn parent_property(&self) -> Option<PropertyId> {
        self.parent
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    /// `x:Key`, for dictionary entries.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn is_markup_extension(&self) -> bool {
        self.markup_extension
    }

    pub fn constructor_args(&self) -> Option<&[String]> {
        self.constructor_args.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct XamlProperty {
    pub(crate) parent: ObjectId,
    pub(crate) info: XamlPropertyInfo,
    pub(crate) value: Option<XamlValue>,
    pub(crate) items: Vec<XamlValue>,
    /// `<Type.Member>` element, when the member is written in element form.
    pub(crate) property_element: Option<XmlNodeId>,
    /// Element whose children are the collection items: the property
    /// element, an explicit collection element inside it, or the parent's
    /// own element for the content property.
    pub(crate) container: Option<XmlNodeId>,
    /// Property element removed from the tree once emptied; reused if the
    /// member is set again so its source text survives undo.
    pub(crate) retired_element: Option<XmlNodeId>,
    /// Attribute name the member was read from, reused when rewriting.
    pub(crate) attribute_name: Option<(Option<String>, String)>,
}

impl XamlProperty {
    pub fn parent_object(&self) -> ObjectId {
        self.parent
    }

    pub fn info(&self) -> &XamlPropertyInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn value(&self) -> Option<XamlValue> {
        self.value
    }

    pub fn items(&self) -> &[XamlValue] {
        &self.items
    }

    pub fn is_collection(&self) -> bool {
        self.info.is_collection()
    }

    pub fn is_attached(&self) -> bool {
        self.info.is_attached()
    }

    pub fn is_event(&self) -> bool {
        self.info.is_event()
    }

    pub fn property_element(&self) -> Option<XmlNodeId> {
        self.property_element
    }

    /// A scalar value, an element-form member, or at least one item.
    pub fn is_set(&self) -> bool {
        self.value.is_some() || self.property_element.is_some() || !self.items.is_empty()
    }
}
