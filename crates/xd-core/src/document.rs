//! `XamlDocument`: the XML tree, the object graph over it, and the live
//! instances the graph describes, kept in sync.

use crate::builtin::wpf_registry;
use crate::changes::ChangeLog;
use crate::convert::ConversionContext;
use crate::error::{LoadErrorKind, XamlError, XamlLoadError};
use crate::id::{InstanceId, Name, ObjectId, PropertyId, TextId, TypeKey, XmlNodeId};
use crate::instance::InstanceStore;
use crate::journal::UndoAction;
use crate::markup::ExtensionRegistry;
use crate::names::NameScopes;
use crate::object::{TextBacking, XamlObject, XamlProperty, XamlTextValue, XamlValue};
use crate::parser::XamlParser;
use crate::property::{PropertyKind, XamlPropertyInfo};
use crate::schema::{CollectionKind, TypeRegistry};
use crate::settings::XamlParserSettings;
use crate::type_finder::XamlTypeFinder;
use crate::value::Value;
use crate::xml::{XmlTree, escape_attribute, split_qualified};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

static DEFAULT_REGISTRY: LazyLock<Arc<TypeRegistry>> = LazyLock::new(|| Arc::new(wpf_registry()));

/// The shared built-in registry.
pub fn default_registry() -> Arc<TypeRegistry> {
    DEFAULT_REGISTRY.clone()
}

#[derive(Debug)]
pub struct XamlDocument {
    pub(crate) xml: XmlTree,
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) type_finder: XamlTypeFinder,
    pub(crate) extensions: ExtensionRegistry,
    pub(crate) instances: InstanceStore,
    pub(crate) objects: Vec<XamlObject>,
    pub(crate) properties: Vec<XamlProperty>,
    pub(crate) texts: Vec<XamlTextValue>,
    pub(crate) instance_index: HashMap<InstanceId, ObjectId>,
    pub(crate) root: Option<ObjectId>,
    pub(crate) scopes: NameScopes,
    pub(crate) changes: ChangeLog,
    pub(crate) journal: Option<Vec<UndoAction>>,
}

impl XamlDocument {
    pub(crate) fn new(xml: XmlTree, registry: Arc<TypeRegistry>, extensions: ExtensionRegistry) -> Self {
        Self {
            xml,
            type_finder: XamlTypeFinder::new(registry.clone()),
            registry,
            extensions,
            instances: InstanceStore::new(),
            objects: Vec::new(),
            properties: Vec::new(),
            texts: Vec::new(),
            instance_index: HashMap::new(),
            root: None,
            scopes: NameScopes::default(),
            changes: ChangeLog::new(),
            journal: None,
        }
    }

    /// Load with the built-in registry; the first error aborts.
    pub fn parse(text: &str) -> Result<Self, XamlLoadError> {
        Self::parse_with(text, XamlParserSettings::default())
    }

    pub fn parse_with(text: &str, settings: XamlParserSettings<'_>) -> Result<Self, XamlLoadError> {
        let xml = XmlTree::parse(text)?;
        let registry = settings.registry.unwrap_or_else(default_registry);
        let extensions = settings
            .extensions
            .unwrap_or_else(|| ExtensionRegistry::standard(&registry));
        let mut doc = XamlDocument::new(xml, registry, extensions);
        let Some(root_element) = doc.xml.document_element() else {
            return Err(XamlLoadError::new(LoadErrorKind::Xml, "document has no root element", 1, 1));
        };

        doc.changes.set_muted(true);
        let root = XamlParser::new(&mut doc, settings.error_sink).parse_object(root_element, None)?;
        doc.changes.set_muted(false);

        let Some(root) = root else {
            let (line, column) = doc.xml.position(root_element);
            return Err(XamlLoadError::new(
                LoadErrorKind::UnknownType,
                "root element could not be loaded",
                line,
                column,
            ));
        };
        doc.root = Some(root);
        log::debug!(
            "loaded document: {} objects, {} properties",
            doc.objects.len(),
            doc.properties.len()
        );
        Ok(doc)
    }

    /// Parse a fragment (an element written with this document's prefixes)
    /// into a detached object, ready to be inserted somewhere.
    pub fn parse_snippet(&mut self, text: &str) -> Result<ObjectId, XamlLoadError> {
        let Some(root_element) = self.xml.document_element() else {
            return Err(XamlLoadError::new(LoadErrorKind::Xml, "document has no root element", 1, 1));
        };
        let declarations: String = self
            .xml
            .element(root_element)
            .map(|el| {
                el.attributes()
                    .iter()
                    .filter(|a| a.is_namespace_declaration())
                    .map(|a| format!(" {}=\"{}\"", a.qualified_name(), escape_attribute(&a.value)))
                    .collect()
            })
            .unwrap_or_default();
        let snippet = XmlTree::parse(&format!("<Snippet{declarations}>{text}</Snippet>"))?;
        let first = snippet
            .document_element()
            .and_then(|wrapper| snippet.element_children(wrapper).next())
            .ok_or_else(|| XamlLoadError::new(LoadErrorKind::InvalidContent, "snippet has no element", 1, 1))?;

        let imported = self.xml.import(&snippet, first);
        // Parse in place so prefixes resolve against the root declarations.
        self.xml.append_child(root_element, imported);
        let parsed = XamlParser::new(self, None).parse_object(imported, None);
        self.xml.detach(imported);
        parsed?.ok_or_else(|| XamlLoadError::new(LoadErrorKind::UnknownType, "snippet type is unknown", 1, 1))
    }

    // ─── Accessors ────────────────────────────────────────────────────────

    pub fn root_element(&self) -> Option<ObjectId> {
        self.root
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn type_finder(&self) -> &XamlTypeFinder {
        &self.type_finder
    }

    pub fn instances(&self) -> &InstanceStore {
        &self.instances
    }

    pub fn xml(&self) -> &XmlTree {
        &self.xml
    }

    pub fn changes(&self) -> &ChangeLog {
        &self.changes
    }

    pub fn changes_mut(&mut self) -> &mut ChangeLog {
        &mut self.changes
    }

    pub fn object(&self, id: ObjectId) -> &XamlObject {
        &self.objects[id.index()]
    }

    pub fn property(&self, id: PropertyId) -> &XamlProperty {
        &self.properties[id.index()]
    }

    pub fn text(&self, id: TextId) -> &XamlTextValue {
        &self.texts[id.index()]
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn type_name(&self, obj: ObjectId) -> &str {
        self.registry.type_name(self.object(obj).element_type)
    }

    pub fn instance_of(&self, obj: ObjectId) -> Option<InstanceId> {
        self.object(obj).instance.as_instance()
    }

    pub fn object_for_instance(&self, instance: InstanceId) -> Option<ObjectId> {
        self.instance_index.get(&instance).copied()
    }

    pub fn parent_of(&self, value: XamlValue) -> Option<PropertyId> {
        match value {
            XamlValue::Text(t) => self.text(t).parent,
            XamlValue::Object(o) => self.object(o).parent,
        }
    }

    pub fn parent_object(&self, obj: ObjectId) -> Option<ObjectId> {
        self.object(obj).parent.map(|p| self.property(p).parent)
    }

    /// Text of a text value.
    pub fn text_of(&self, value: XamlValue) -> Option<&str> {
        value.as_text().map(|t| self.text(t).text())
    }

    /// Text of a property's scalar value, when it is literal text.
    pub fn value_text(&self, prop: PropertyId) -> Option<&str> {
        self.property(prop).value.and_then(|v| self.text_of(v))
    }

    /// Child objects held by the property's value or items, in order.
    pub fn object_values(&self, prop: PropertyId) -> Vec<ObjectId> {
        let p = self.property(prop);
        p.value
            .iter()
            .chain(p.items.iter())
            .filter_map(|v| v.as_object())
            .collect()
    }

    /// Whether `ancestor` is `obj` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: ObjectId, obj: ObjectId) -> bool {
        std::iter::successors(Some(obj), |&o| self.parent_object(o)).any(|o| o == ancestor)
    }

    // ─── Properties ───────────────────────────────────────────────────────

    /// An existing property by name (`Width`, or `Canvas.Left` for attached).
    pub fn find_property(&self, obj: ObjectId, name: &str) -> Option<PropertyId> {
        self.object(obj)
            .properties
            .iter()
            .copied()
            .find(|&p| {
                let info = &self.property(p).info;
                match info.kind() {
                    PropertyKind::Attached => info.full_name() == name,
                    _ => info.name() == name,
                }
            })
    }

    /// Find or create a normal member or event by name.
    pub fn property_by_name(&mut self, obj: ObjectId, name: &str) -> Result<PropertyId, XamlError> {
        if let Some(p) = self.find_property(obj, name).filter(|&p| !self.property(p).is_attached()) {
            return Ok(p);
        }
        let ty = self.object(obj).element_type;
        let info = if let Some((owner, schema)) = self.registry.find_property(ty, name) {
            XamlPropertyInfo::normal(&self.registry, owner, schema)
        } else if let Some(owner) = self.registry.find_event(ty, name) {
            XamlPropertyInfo::event(&self.registry, owner, name)
        } else {
            return Err(XamlError::UnknownProperty {
                owner: self.registry.type_name(ty).to_string(),
                member: name.to_string(),
            });
        };
        Ok(self.add_property(obj, info))
    }

    /// Find or create an attached member, e.g. `("Canvas", "Left")`.
    pub fn attached_property(&mut self, obj: ObjectId, owner: &str, name: &str) -> Result<PropertyId, XamlError> {
        let owner_ty = self
            .registry
            .find_by_name(owner)
            .ok_or_else(|| XamlError::UnknownType(owner.to_string()))?;
        let schema = self
            .registry
            .find_attached(owner_ty, name)
            .ok_or_else(|| XamlError::UnknownProperty {
                owner: owner.to_string(),
                member: name.to_string(),
            })?;
        let info = XamlPropertyInfo::attached(&self.registry, owner_ty, schema);
        Ok(self.property_for_info(obj, info))
    }

    /// The member that holds direct content: the content property, or the
    /// item list of a collection-typed object.
    pub fn content_property(&mut self, obj: ObjectId) -> Option<PropertyId> {
        let ty = self.object(obj).element_type;
        if let Some(name) = self.registry.content_property(ty) {
            return self.property_by_name(obj, name.as_str()).ok();
        }
        self.registry
            .collection_kind(ty)
            .map(|_| self.property_for_info(obj, XamlPropertyInfo::items(ty)))
    }

    pub(crate) fn property_for_info(&mut self, obj: ObjectId, info: XamlPropertyInfo) -> PropertyId {
        let existing = self
            .object(obj)
            .properties
            .iter()
            .copied()
            .find(|&p| self.property(p).info.same_member(&info));
        existing.unwrap_or_else(|| self.add_property(obj, info))
    }

    pub(crate) fn add_property(&mut self, obj: ObjectId, info: XamlPropertyInfo) -> PropertyId {
        let id = PropertyId::from_index(self.properties.len());
        self.properties.push(XamlProperty {
            parent: obj,
            info,
            value: None,
            items: Vec::new(),
            property_element: None,
            container: None,
            retired_element: None,
            attribute_name: None,
        });
        self.objects[obj.index()].properties.push(id);
        id
    }

    pub fn is_set(&self, prop: PropertyId) -> bool {
        self.property(prop).is_set()
    }

    pub(crate) fn is_content_property(&self, prop: PropertyId) -> bool {
        let p = self.property(prop);
        match p.info.kind() {
            PropertyKind::Items => true,
            PropertyKind::Normal => {
                self.registry.content_property(self.object(p.parent).element_type) == Some(p.info.name_key())
            }
            _ => false,
        }
    }

    pub(crate) fn is_name_property(&self, prop: PropertyId) -> bool {
        let p = self.property(prop);
        p.info.kind() == PropertyKind::Normal
            && self.registry.name_property(self.object(p.parent).element_type) == Some(p.info.name_key())
    }

    // ─── Creating values ──────────────────────────────────────────────────

    pub(crate) fn push_object(&mut self, object: XamlObject) -> ObjectId {
        let id = ObjectId::from_index(self.objects.len());
        if let Value::Instance(inst) = object.instance {
            self.instance_index.insert(inst, id);
        }
        self.objects.push(object);
        id
    }

    pub(crate) fn push_text(&mut self, text: String, backing: TextBacking) -> TextId {
        let id = TextId::from_index(self.texts.len());
        self.texts.push(XamlTextValue {
            text,
            backing,
            parent: None,
        });
        id
    }

    /// A detached text value.
    pub fn create_text_value(&mut self, text: &str) -> XamlValue {
        XamlValue::Text(self.push_text(text.to_string(), TextBacking::Detached))
    }

    /// A detached object of the named type (`Button`, `Binding`,
    /// `StaticResource`).
    pub fn create_object(&mut self, type_name: &str) -> Result<ObjectId, XamlError> {
        let ty = self
            .registry
            .find_by_name(type_name)
            .or_else(|| {
                self.registry
                    .find_by_name(&format!("{type_name}Extension"))
                    .filter(|&t| self.registry.is_markup_extension(t))
            })
            .ok_or_else(|| XamlError::UnknownType(type_name.to_string()))?;
        self.create_object_of(ty)
    }

    pub fn create_object_of(&mut self, ty: TypeKey) -> Result<ObjectId, XamlError> {
        let instance = self
            .registry
            .construct(ty, &mut self.instances)
            .ok_or_else(|| XamlError::NotConstructible(self.registry.type_name(ty).to_string()))?;
        Ok(self.wrap_instance(ty, instance))
    }

    fn wrap_instance(&mut self, ty: TypeKey, instance: InstanceId) -> ObjectId {
        let markup_extension = self.registry.is_markup_extension(ty);
        // Extensions start in attribute form; an element is made on demand.
        let element = (!markup_extension).then(|| self.create_element_for(ty));
        self.push_object(XamlObject {
            element_type: ty,
            instance: Value::Instance(instance),
            element,
            parent: None,
            properties: Vec::new(),
            key: None,
            has_errors: false,
            markup_extension,
            promoted: false,
            constructor_args: None,
        })
    }

    /// Turn a live value into something assignable to `target`: text for
    /// convertible values, an object for instances, `{x:Null}` for null.
    pub fn create_property_value(&mut self, target: &XamlPropertyInfo, value: Value) -> Result<XamlValue, XamlError> {
        match value {
            Value::Instance(inst) => {
                if let Some(existing) = self.object_for_instance(inst) {
                    if self.object(existing).parent.is_none() {
                        return Ok(XamlValue::Object(existing));
                    }
                }
                let ty = self.instances.type_of(inst);
                Ok(XamlValue::Object(self.wrap_instance(ty, inst)))
            }
            Value::Null => {
                let null = self.create_object("Null")?;
                Ok(XamlValue::Object(null))
            }
            other => {
                let converter = self.registry.converter(target.return_type());
                let ctx = self.conversion_context(self.root);
                let text = match converter {
                    Some(conv) => conv.convert_to_string(&other, &ctx),
                    None if Some(target.return_type()) == self.registry.object_type() => Some(other.to_string()),
                    None => None,
                };
                let text = text.ok_or_else(|| {
                    XamlError::Conversion(crate::error::ConversionError::new(
                        other.to_string(),
                        self.registry.type_name(target.return_type()),
                    ))
                })?;
                Ok(self.create_text_value(&text))
            }
        }
    }

    /// Element for a new object of type `ty`, prefixed for its namespace.
    pub(crate) fn create_element_for(&mut self, ty: TypeKey) -> XmlNodeId {
        let ns = self.registry.xml_namespace_of(ty);
        let prefix = self.get_prefix_for_namespace(&ns);
        let name = self.registry.type_name(ty).to_string();
        self.xml.create_element(prefix.as_deref(), &name)
    }

    // ─── Namespaces ───────────────────────────────────────────────────────

    /// Prefix bound to `namespace` on the root element (`None` for the
    /// default namespace). Unbound namespaces get a fresh declaration.
    pub fn get_prefix_for_namespace(&mut self, namespace: &str) -> Option<String> {
        let root = self.xml.document_element()?;
        if let Some(prefix) = self.xml.prefix_of_namespace(root, namespace) {
            return prefix;
        }
        let preferred = self.registry.preferred_prefix(namespace).map(str::to_string);
        let candidates = preferred
            .iter()
            .cloned()
            .chain((1..).map(|n| format!("{}{n}", preferred.as_deref().unwrap_or("ns"))));
        for candidate in candidates {
            if self.xml.lookup_namespace(root, Some(&candidate)).is_none() {
                log::debug!("declaring xmlns:{candidate}=\"{namespace}\"");
                self.xml
                    .set_attribute(root, Some(crate::xml::XMLNS_PREFIX), &candidate, namespace);
                return Some(candidate);
            }
        }
        None
    }

    /// Nearest XML element for resolving prefixes in `obj`'s values.
    pub(crate) fn context_node(&self, obj: Option<ObjectId>) -> XmlNodeId {
        std::iter::successors(obj, |&o| self.parent_object(o))
            .find_map(|o| self.object(o).element)
            .or_else(|| self.xml.document_element())
            .unwrap_or_else(|| self.xml.document())
    }

    pub(crate) fn conversion_context(&self, obj: Option<ObjectId>) -> DocumentTypes<'_> {
        DocumentTypes {
            doc: self,
            node: self.context_node(obj),
        }
    }

    /// Resolve `prefix:Type` as written in `obj`'s markup.
    pub fn resolve_type_reference(&self, obj: ObjectId, qualified_name: &str) -> Option<TypeKey> {
        self.conversion_context(Some(obj)).resolve_type(qualified_name)
    }

    // ─── Names ────────────────────────────────────────────────────────────

    /// The object whose name scope `obj`'s name belongs to.
    pub fn scope_root(&self, obj: ObjectId) -> ObjectId {
        let mut current = obj;
        while let Some(parent) = self.parent_object(current) {
            if self.registry.is_name_scope(self.object(parent).element_type) {
                return parent;
            }
            current = parent;
        }
        current
    }

    pub fn name_of(&self, obj: ObjectId) -> Option<String> {
        let name = self.registry.name_property(self.object(obj).element_type)?;
        let prop = self.find_property(obj, name.as_str())?;
        self.value_text(prop).map(str::to_string)
    }

    /// Look a name up in the scope `context` belongs to.
    pub fn find_by_name(&self, context: ObjectId, name: &str) -> Option<ObjectId> {
        let root = self.scope_root(context);
        self.scopes.scope(root)?.lookup(name)
    }

    /// Named objects in the subtree under `value`, outside nested scopes.
    pub(crate) fn names_in(&self, obj: ObjectId) -> Vec<(String, ObjectId)> {
        let mut found = Vec::new();
        let mut stack = vec![obj];
        while let Some(o) = stack.pop() {
            if let Some(name) = self.name_of(o) {
                found.push((name, o));
            }
            if o != obj && self.registry.is_name_scope(self.object(o).element_type) {
                continue;
            }
            for &p in &self.object(o).properties {
                stack.extend(self.object_values(p));
            }
        }
        found
    }

    /// Rename objects under `obj` whose names are taken in the scope of
    /// `target`, so the subtree can be inserted there.
    pub fn make_names_unique(&mut self, obj: ObjectId, target: ObjectId) -> Result<(), XamlError> {
        let scope_root = self.scope_root(target);
        for (name, o) in self.names_in(obj) {
            let taken = self
                .scopes
                .scope(scope_root)
                .is_some_and(|s| s.is_taken(&name, o));
            if taken {
                let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit()).to_string();
                let fresh = self.scopes.scope_mut(scope_root).unique_name(&prefix);
                log::debug!("renaming pasted `{name}` to `{fresh}`");
                self.rename(o, Some(&fresh))?;
            }
        }
        Ok(())
    }

    /// Set or clear an object's name through its name property.
    pub fn rename(&mut self, obj: ObjectId, name: Option<&str>) -> Result<(), XamlError> {
        let ty = self.object(obj).element_type;
        let member = self.registry.name_property(ty).ok_or_else(|| XamlError::UnknownProperty {
            owner: self.registry.type_name(ty).to_string(),
            member: "Name".to_string(),
        })?;
        let prop = self.property_by_name(obj, member.as_str())?;
        match name {
            Some(name) => {
                if let Some(t) = self.property(prop).value.and_then(XamlValue::as_text) {
                    return self.set_text(t, name);
                }
                let value = self.create_text_value(name);
                self.set_property_value(prop, value)
            }
            None => self.reset_property(prop),
        }
    }

    // ─── Resources ────────────────────────────────────────────────────────

    /// Look `key` up in the dictionaries of `start` and its ancestors.
    pub fn find_resource(&self, start: ObjectId, key: &str) -> Option<Value> {
        let resources = Name::intern("Resources");
        let mut current = Some(start);
        while let Some(obj) = current {
            if let Some(inst) = self.instance_of(obj) {
                let ty = self.instances.type_of(inst);
                if self.registry.collection_kind(ty) == Some(CollectionKind::Dictionary) {
                    if let Some(v) = self.instances.dictionary_get(inst, key) {
                        return Some(v.clone());
                    }
                }
                if let Some(Value::Instance(dict)) = self.instances.value(inst, resources) {
                    if let Some(v) = self.instances.dictionary_get(*dict, key) {
                        return Some(v.clone());
                    }
                }
            }
            current = self.parent_object(obj);
        }
        None
    }

    // ─── Live values ──────────────────────────────────────────────────────

    /// A member's current value on the live instance.
    pub fn value_on_instance(&self, prop: PropertyId) -> Result<Value, XamlError> {
        let p = self.property(prop);
        let inst = self.instance_of(p.parent).ok_or(XamlError::NotParented)?;
        p.info.get_value(&self.instances, inst)
    }

    /// Write a value to the live instance only, leaving the XML alone.
    /// Used for drag previews.
    pub fn set_value_on_instance(&mut self, prop: PropertyId, value: Value) -> Result<(), XamlError> {
        let p = &self.properties[prop.index()];
        let inst = self.objects[p.parent.index()]
            .instance
            .as_instance()
            .ok_or(XamlError::NotParented)?;
        p.info.set_value(&self.registry, &mut self.instances, inst, value)
    }

    /// Value stored on `instance` under `key`, or the registered default of
    /// the member it names (`Width`, `Canvas.Left`).
    pub fn instance_value(&self, instance: InstanceId, key: &str) -> Value {
        if let Some(v) = Name::get(key).and_then(|k| self.instances.value(instance, k)) {
            return v.clone();
        }
        let ty = self.instances.type_of(instance);
        let schema = match key.split_once('.') {
            Some((owner, member)) => self
                .registry
                .find_by_name(owner)
                .and_then(|o| self.registry.find_attached(o, member)),
            None => self.registry.find_property(ty, key).map(|(_, s)| s),
        };
        schema.map(|s| s.default.clone()).unwrap_or(Value::Null)
    }

    pub fn to_xml_string(&self) -> String {
        self.xml.write()
    }
}

/// Type resolution relative to an element's namespace declarations.
pub(crate) struct DocumentTypes<'d> {
    doc: &'d XamlDocument,
    node: XmlNodeId,
}

impl ConversionContext for DocumentTypes<'_> {
    fn resolve_type(&self, qualified_name: &str) -> Option<TypeKey> {
        let (prefix, local) = split_qualified(qualified_name.trim());
        let ns = self.doc.xml.lookup_namespace(self.node, prefix)?;
        self.doc.type_finder.resolve(ns, local)
    }

    fn type_name(&self, ty: TypeKey) -> Option<String> {
        let ns = self.doc.registry.xml_namespace_of(ty);
        let local = self.doc.registry.type_name(ty);
        match self.doc.xml.prefix_of_namespace(self.node, &ns)? {
            Some(prefix) => Some(format!("{prefix}:{local}")),
            None => Some(local.to_string()),
        }
    }
}
