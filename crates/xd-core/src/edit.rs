//! Edits that keep the XML, the object graph, and the live instances in
//! step.
//!
//! Each public edit updates the graph first, then mirrors the change into
//! the XML (`attach_value` / `detach_value`), pushes the new value to the
//! live instance, refreshes any markup extension the edit touched, and
//! finally records an undo action and raises change notifications.

use crate::changes::{CollectionAction, DocumentChange};
use crate::document::XamlDocument;
use crate::error::{ConversionError, XamlError};
use crate::id::{InstanceId, ObjectId, PropertyId, TextId, TypeKey, XmlNodeId};
use crate::journal::UndoAction;
use crate::markup::{escape_literal, quote_arg};
use crate::object::{TextBacking, XamlValue};
use crate::property::{PropertyKind, XamlPropertyInfo};
use crate::schema::CollectionKind;
use crate::value::Value;
use crate::xml::{is_whitespace, qualify};

impl XamlDocument {
    // ─── Scalar members ───────────────────────────────────────────────────

    /// Assign a detached value to a scalar member.
    pub fn set_property_value(&mut self, prop: PropertyId, value: XamlValue) -> Result<(), XamlError> {
        if self.property(prop).is_collection() {
            return Err(XamlError::IsACollection(self.property(prop).info.full_name().to_string()));
        }
        if self.parent_of(value).is_some() {
            return Err(XamlError::ValueAlreadyParented);
        }
        let obj = self.property(prop).parent;
        let old = self.property(prop).value;

        let rename = if self.is_name_property(prop) {
            let new_name = self.text_of(value).map(str::to_string);
            let old_name = old.and_then(|v| self.text_of(v)).map(str::to_string);
            self.check_name(obj, new_name.as_deref())?;
            Some((old_name, new_name))
        } else {
            None
        };
        if let XamlValue::Object(o) = value {
            self.check_subtree_names(obj, o)?;
        }

        let was_set = self.is_set(prop);
        let had_attribute = old.is_some_and(|v| self.value_in_attribute(v));
        if let Some(old) = old {
            self.unregister_subtree_names(old);
            self.take_over_text_node(old, value);
            self.detach_value(prop, old, true);
        }
        self.properties[prop.index()].value = Some(value);
        self.set_parent(value, Some(prop));
        self.attach_value(prop, value, None);
        if had_attribute && !self.value_in_attribute(value) {
            self.remove_member_attribute(prop);
        }
        if let Some((old_name, new_name)) = rename {
            self.apply_rename(obj, old_name, new_name);
        }
        if let XamlValue::Object(o) = value {
            self.register_subtree_names(o);
        }

        self.record(UndoAction::SetValue {
            property: prop,
            old,
            new: Some(value),
        });
        self.update_value_on_instance(prop);
        self.refresh_extension_xml(obj);
        self.changes.push(DocumentChange::ValueChanged { property: prop });
        if !was_set {
            self.changes.push(DocumentChange::IsSetChanged {
                property: prop,
                is_set: true,
            });
        }
        Ok(())
    }

    /// Replace a member's text, editing the existing text value in place
    /// when there is one.
    pub fn set_property_text(&mut self, prop: PropertyId, text: &str) -> Result<(), XamlError> {
        if let Some(t) = self.property(prop).value.and_then(XamlValue::as_text) {
            return self.set_text(t, text);
        }
        let value = self.create_text_value(text);
        self.set_property_value(prop, value)
    }

    /// Assign a live value, printed through the member's converter.
    pub fn set_value(&mut self, prop: PropertyId, value: Value) -> Result<(), XamlError> {
        let info = self.property(prop).info.clone();
        let value = self.create_property_value(&info, value)?;
        match value {
            XamlValue::Text(t) if self.property(prop).value.and_then(XamlValue::as_text).is_some() => {
                let text = self.text(t).text().to_string();
                self.set_property_text(prop, &text)
            }
            value => self.set_property_value(prop, value),
        }
    }

    /// Shorthand for `property_by_name` followed by `set_property_text`.
    pub fn set_member_text(&mut self, obj: ObjectId, name: &str, text: &str) -> Result<PropertyId, XamlError> {
        let prop = self.property_by_name(obj, name)?;
        self.set_property_text(prop, text)?;
        Ok(prop)
    }

    /// Remove a member's value (or all its items) and its XML.
    pub fn reset_property(&mut self, prop: PropertyId) -> Result<(), XamlError> {
        let obj = self.property(prop).parent;
        if self.property(prop).is_collection() {
            while let Some(last) = self.property(prop).items.len().checked_sub(1) {
                self.remove_item_at(prop, last)?;
            }
        }
        let was_set = self.is_set(prop);
        let old = self.properties[prop.index()].value;
        if let Some(old) = old {
            if self.is_name_property(prop) {
                let old_name = self.text_of(old).map(str::to_string);
                self.apply_rename(obj, old_name, None);
            }
            self.unregister_subtree_names(old);
            self.properties[prop.index()].value = None;
            self.detach_value(prop, old, false);
            self.record(UndoAction::SetValue {
                property: prop,
                old: Some(old),
                new: None,
            });
        }
        self.retire_property_element(prop);
        self.update_value_on_instance(prop);
        self.refresh_extension_xml(obj);
        if old.is_some() {
            self.changes.push(DocumentChange::ValueChanged { property: prop });
        }
        if was_set {
            self.changes.push(DocumentChange::IsSetChanged {
                property: prop,
                is_set: false,
            });
        }
        Ok(())
    }

    /// Change the text of a text value in place.
    pub fn set_text(&mut self, text: TextId, new: &str) -> Result<(), XamlError> {
        let old = self.texts[text.index()].text.clone();
        if old == new {
            return Ok(());
        }
        let parent = self.texts[text.index()].parent;
        if let Some(prop) = parent.filter(|&p| self.is_name_property(p)) {
            self.check_name(self.property(prop).parent, Some(new))?;
        }
        self.texts[text.index()].text = new.to_string();
        match self.texts[text.index()].backing.clone() {
            TextBacking::Attribute {
                element,
                prefix,
                local_name,
            } => self
                .xml
                .set_attribute(element, prefix.as_deref(), &local_name, &escape_literal(new)),
            TextBacking::Node(node) => self.xml.set_text(node, new),
            TextBacking::Detached => {}
        }
        self.record(UndoAction::SetText {
            text,
            old: old.clone(),
            new: new.to_string(),
        });
        if let Some(prop) = parent {
            let obj = self.property(prop).parent;
            if self.is_name_property(prop) {
                self.apply_rename(obj, Some(old), Some(new.to_string()));
            }
            self.update_value_on_instance(prop);
            self.refresh_extension_xml(obj);
            self.changes.push(DocumentChange::ValueChanged { property: prop });
        }
        Ok(())
    }

    // ─── Collection members ───────────────────────────────────────────────

    pub fn insert_item(&mut self, prop: PropertyId, index: usize, value: XamlValue) -> Result<(), XamlError> {
        let p = self.property(prop);
        if !p.is_collection() {
            return Err(XamlError::NotACollection(p.info.full_name().to_string()));
        }
        if index > p.items.len() {
            return Err(XamlError::IndexOutOfRange {
                index,
                len: p.items.len(),
            });
        }
        if self.parent_of(value).is_some() {
            return Err(XamlError::ValueAlreadyParented);
        }
        let obj = p.parent;
        if let XamlValue::Object(o) = value {
            self.check_subtree_names(obj, o)?;
        }

        let was_set = self.is_set(prop);
        self.properties[prop.index()].items.insert(index, value);
        self.set_parent(value, Some(prop));
        self.attach_value(prop, value, Some(index));
        if let XamlValue::Object(o) = value {
            self.register_subtree_names(o);
        }

        self.record(UndoAction::Insert {
            property: prop,
            index,
            value,
        });
        self.update_value_on_instance(prop);
        self.refresh_extension_xml(obj);
        self.changes.push(DocumentChange::CollectionChanged {
            property: prop,
            action: CollectionAction::Insert { index },
        });
        if !was_set {
            self.changes.push(DocumentChange::IsSetChanged {
                property: prop,
                is_set: true,
            });
        }
        Ok(())
    }

    pub fn add_item(&mut self, prop: PropertyId, value: XamlValue) -> Result<(), XamlError> {
        let len = self.property(prop).items.len();
        self.insert_item(prop, len, value)
    }

    pub fn remove_item_at(&mut self, prop: PropertyId, index: usize) -> Result<XamlValue, XamlError> {
        let p = self.property(prop);
        if !p.is_collection() {
            return Err(XamlError::NotACollection(p.info.full_name().to_string()));
        }
        let Some(&value) = p.items.get(index) else {
            return Err(XamlError::IndexOutOfRange {
                index,
                len: p.items.len(),
            });
        };
        let obj = p.parent;

        let was_set = self.is_set(prop);
        self.unregister_subtree_names(value);
        self.properties[prop.index()].items.remove(index);
        self.detach_value(prop, value, false);

        self.record(UndoAction::Remove {
            property: prop,
            index,
            value,
        });
        self.update_value_on_instance(prop);
        self.refresh_extension_xml(obj);
        self.changes.push(DocumentChange::CollectionChanged {
            property: prop,
            action: CollectionAction::Remove { index },
        });
        if was_set && !self.is_set(prop) {
            self.changes.push(DocumentChange::IsSetChanged {
                property: prop,
                is_set: false,
            });
        }
        Ok(value)
    }

    pub fn move_item(&mut self, prop: PropertyId, from: usize, to: usize) -> Result<(), XamlError> {
        if from == to {
            return Ok(());
        }
        let value = self.remove_item_at(prop, from)?;
        self.insert_item(prop, to, value)
    }

    /// Detach a value from whatever member holds it.
    pub fn remove_from_parent(&mut self, value: XamlValue) -> Result<(), XamlError> {
        let prop = self.parent_of(value).ok_or(XamlError::NotParented)?;
        if self.property(prop).is_collection() {
            let index = self
                .property(prop)
                .items
                .iter()
                .position(|&v| v == value)
                .ok_or(XamlError::NotParented)?;
            self.remove_item_at(prop, index).map(|_| ())
        } else {
            self.reset_property(prop)
        }
    }

    // ─── Names ────────────────────────────────────────────────────────────

    fn check_name(&self, obj: ObjectId, name: Option<&str>) -> Result<(), XamlError> {
        let Some(name) = name else {
            return Ok(());
        };
        let root = self.scope_root(obj);
        if self.scopes.scope(root).is_some_and(|s| s.is_taken(name, obj)) {
            return Err(XamlError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn apply_rename(&mut self, obj: ObjectId, old: Option<String>, new: Option<String>) {
        let root = self.scope_root(obj);
        let scope = self.scopes.scope_mut(root);
        if let Some(old) = &old {
            scope.unregister(old, obj);
        }
        if let Some(new) = &new {
            scope.register(new, obj);
        }
        self.changes.push(DocumentChange::NameChanged { object: obj, old, new });
    }

    /// Scope that names under a child of `parent` will land in.
    fn child_scope(&self, parent: ObjectId) -> ObjectId {
        if self.registry.is_name_scope(self.object(parent).element_type) {
            parent
        } else {
            self.scope_root(parent)
        }
    }

    fn check_subtree_names(&self, parent: ObjectId, obj: ObjectId) -> Result<(), XamlError> {
        let root = self.child_scope(parent);
        let Some(scope) = self.scopes.scope(root) else {
            return Ok(());
        };
        match self.names_in(obj).into_iter().find(|(name, o)| scope.is_taken(name, *o)) {
            Some((name, _)) => Err(XamlError::DuplicateName(name)),
            None => Ok(()),
        }
    }

    fn register_subtree_names(&mut self, obj: ObjectId) {
        for (name, o) in self.names_in(obj) {
            let root = self.scope_root(o);
            self.scopes.scope_mut(root).register(&name, o);
        }
    }

    fn unregister_subtree_names(&mut self, value: XamlValue) {
        let XamlValue::Object(obj) = value else {
            return;
        };
        for (name, o) in self.names_in(obj) {
            let root = self.scope_root(o);
            self.scopes.scope_mut(root).unregister(&name, o);
        }
    }

    // ─── XML mirroring ────────────────────────────────────────────────────

    fn set_parent(&mut self, value: XamlValue, parent: Option<PropertyId>) {
        match value {
            XamlValue::Text(t) => self.texts[t.index()].parent = parent,
            XamlValue::Object(o) => self.objects[o.index()].parent = parent,
        }
    }

    pub(crate) fn value_node(&self, value: XamlValue) -> Option<XmlNodeId> {
        match value {
            XamlValue::Text(t) => self.text(t).xml_node(),
            XamlValue::Object(o) => self.object(o).element,
        }
    }

    fn value_in_attribute(&self, value: XamlValue) -> bool {
        match value {
            XamlValue::Text(t) => self.text(t).is_attribute(),
            XamlValue::Object(o) => self.object(o).markup_extension && self.object(o).element.is_none(),
        }
    }

    /// Content text replaced by new text keeps its place among the
    /// element's children.
    fn take_over_text_node(&mut self, old: XamlValue, new: XamlValue) {
        let (XamlValue::Text(old), XamlValue::Text(new)) = (old, new) else {
            return;
        };
        if self.texts[new.index()].backing != TextBacking::Detached {
            return;
        }
        let Some(node) = self.text(old).xml_node() else {
            return;
        };
        let Some(parent) = self.xml.parent(node) else {
            return;
        };
        let fresh = self.xml.create_text(&self.texts[new.index()].text);
        self.xml.insert_before(parent, fresh, Some(node));
        self.texts[new.index()].backing = TextBacking::Node(fresh);
    }

    /// Name of the attribute that holds `prop`, remembered once chosen.
    fn attribute_name(&mut self, prop: PropertyId) -> (Option<String>, String) {
        if let Some(name) = &self.properties[prop.index()].attribute_name {
            return name.clone();
        }
        let info = self.properties[prop.index()].info.clone();
        let obj = self.properties[prop.index()].parent;
        let name = if info.kind() == PropertyKind::Attached {
            let owner_ns = self.registry.xml_namespace_of(info.owner());
            let default_ns = self
                .object(obj)
                .element
                .and_then(|el| self.xml.lookup_namespace(el, None))
                .map(str::to_string);
            let prefix = if default_ns.as_deref() == Some(owner_ns.as_str()) {
                None
            } else {
                self.get_prefix_for_namespace(&owner_ns)
            };
            (prefix, info.full_name().to_string())
        } else {
            (None, info.name().to_string())
        };
        self.properties[prop.index()].attribute_name = Some(name.clone());
        name
    }

    fn remove_member_attribute(&mut self, prop: PropertyId) {
        let obj = self.properties[prop.index()].parent;
        if let Some(host) = self.objects[obj.index()].element {
            let (prefix, local) = self.attribute_name(prop);
            self.xml.remove_attribute(host, prefix.as_deref(), &local);
        }
    }

    fn property_element_name(&mut self, prop: PropertyId) -> (Option<String>, String) {
        let info = self.properties[prop.index()].info.clone();
        let obj = self.properties[prop.index()].parent;
        if info.kind() == PropertyKind::Attached {
            let ns = self.registry.xml_namespace_of(info.owner());
            return (self.get_prefix_for_namespace(&ns), info.full_name().to_string());
        }
        let element = self.object(obj).element.and_then(|el| self.xml.element(el));
        let prefix = element.and_then(|el| el.prefix.clone());
        let type_name = element
            .map(|el| el.local_name.clone())
            .unwrap_or_else(|| self.type_name(obj).to_string());
        (prefix, format!("{type_name}.{}", info.name()))
    }

    /// `<Type.Member>` element for `prop`, inserted ahead of the content
    /// children of `host` when it is new.
    fn ensure_property_element(&mut self, prop: PropertyId, host: XmlNodeId) -> XmlNodeId {
        if let Some(pe) = self.properties[prop.index()].property_element {
            return pe;
        }
        let pe = match self.properties[prop.index()].retired_element.take() {
            Some(pe) => pe,
            None => {
                let (prefix, local) = self.property_element_name(prop);
                self.xml.create_element(prefix.as_deref(), &local)
            }
        };
        let first_content = self
            .xml
            .children(host)
            .iter()
            .copied()
            .find(|&c| self.xml.element(c).is_some_and(|el| !el.local_name.contains('.')));
        self.xml.insert_before(host, pe, first_content);
        self.properties[prop.index()].property_element = Some(pe);
        pe
    }

    fn ensure_collection_container(&mut self, prop: PropertyId, host: XmlNodeId) -> XmlNodeId {
        let p = &self.properties[prop.index()];
        if let Some(container) = p.container {
            if container != host && p.property_element.is_none() {
                self.ensure_property_element(prop, host);
            }
            return container;
        }
        let inline = self.is_content_property(prop) && p.property_element.is_none() && p.retired_element.is_none();
        let container = if inline {
            host
        } else {
            self.ensure_property_element(prop, host)
        };
        self.properties[prop.index()].container = Some(container);
        container
    }

    fn retire_property_element(&mut self, prop: PropertyId) {
        if let Some(pe) = self.properties[prop.index()].property_element.take() {
            self.xml.detach(pe);
            self.properties[prop.index()].retired_element = Some(pe);
        }
    }

    /// Drop a property element left with nothing but whitespace.
    fn cleanup_property_element(&mut self, prop: PropertyId) {
        let p = &self.properties[prop.index()];
        if p.value.is_some() || !p.items.is_empty() {
            return;
        }
        let Some(pe) = p.property_element else {
            return;
        };
        let occupied = self.xml.children(pe).iter().any(|&c| {
            self.xml.element(c).is_some() || self.xml.text_value(c).is_some_and(|t| !is_whitespace(t))
        });
        if !occupied {
            self.retire_property_element(prop);
        }
    }

    /// Place a value's node under `prop`: scalar content inline or inside
    /// the property element, items next to their neighbours.
    fn insert_child_node(&mut self, prop: PropertyId, node: XmlNodeId, index: Option<usize>) {
        let obj = self.properties[prop.index()].parent;
        let Some(host) = self.objects[obj.index()].element else {
            return;
        };
        let Some(index) = index else {
            let p = &self.properties[prop.index()];
            let inline = self.is_content_property(prop) && p.property_element.is_none() && p.retired_element.is_none();
            let parent = if inline {
                host
            } else {
                self.ensure_property_element(prop, host)
            };
            self.xml.append_child(parent, node);
            return;
        };

        let container = self.ensure_collection_container(prop, host);
        let items = &self.properties[prop.index()].items;
        let placed = |v: &XamlValue| {
            self.value_node(*v)
                .filter(|&n| n != node && self.xml.parent(n) == Some(container))
        };
        let next = items.get(index + 1..).and_then(|rest| rest.iter().find_map(placed));
        let prev = items[..index.min(items.len())].iter().rev().find_map(placed);
        match (next, prev) {
            (Some(next), _) => self.xml.insert_before(container, node, Some(next)),
            (None, Some(prev)) => self.xml.insert_after(container, node, prev),
            (None, None) => self.xml.append_child(container, node),
        }
    }

    /// Mirror a newly parented value into the XML.
    fn attach_value(&mut self, prop: PropertyId, value: XamlValue, index: Option<usize>) {
        let obj = self.properties[prop.index()].parent;
        let Some(host) = self.objects[obj.index()].element else {
            // The owner is an attribute-form extension; the value is part of
            // its printed text.
            self.drop_xml_presence(value);
            return;
        };
        match value {
            XamlValue::Text(t) => {
                if let Some(node) = self.text(t).xml_node() {
                    if self.xml.parent(node).is_none() {
                        self.insert_child_node(prop, node, index);
                    }
                    return;
                }
                if index.is_some() {
                    let node = self.xml.create_text(&self.texts[t.index()].text);
                    self.texts[t.index()].backing = TextBacking::Node(node);
                    self.insert_child_node(prop, node, index);
                } else {
                    let (prefix, local_name) = self.attribute_name(prop);
                    let text = escape_literal(&self.texts[t.index()].text);
                    self.xml.set_attribute(host, prefix.as_deref(), &local_name, &text);
                    self.texts[t.index()].backing = TextBacking::Attribute {
                        element: host,
                        prefix,
                        local_name,
                    };
                }
            }
            XamlValue::Object(o) => {
                let attribute_form = index.is_none()
                    && self.objects[o.index()].markup_extension
                    && self.objects[o.index()].element.is_none();
                if attribute_form && self.can_print(o) {
                    let text = self.print_extension(o);
                    let (prefix, local_name) = self.attribute_name(prop);
                    self.xml.set_attribute(host, prefix.as_deref(), &local_name, &text);
                    return;
                }
                if attribute_form {
                    self.objects[o.index()].promoted = true;
                }
                let element = match self.objects[o.index()].element {
                    Some(el) => el,
                    None => self.materialize(o),
                };
                self.insert_child_node(prop, element, index);
            }
        }
    }

    /// Remove a value's XML. With `keep_attribute` an attribute is left in
    /// place for the replacement value to overwrite.
    fn detach_value(&mut self, prop: PropertyId, value: XamlValue, keep_attribute: bool) {
        match value {
            XamlValue::Text(t) => match self.texts[t.index()].backing.clone() {
                TextBacking::Attribute {
                    element,
                    prefix,
                    local_name,
                } => {
                    if !keep_attribute {
                        self.xml.remove_attribute(element, prefix.as_deref(), &local_name);
                    }
                    self.texts[t.index()].backing = TextBacking::Detached;
                }
                TextBacking::Node(node) => self.xml.detach(node),
                TextBacking::Detached => {}
            },
            XamlValue::Object(o) => match self.objects[o.index()].element {
                Some(el) => self.xml.detach(el),
                None if !keep_attribute => self.remove_member_attribute(prop),
                None => {}
            },
        }
        self.set_parent(value, None);
        self.cleanup_property_element(prop);
    }

    fn drop_xml_presence(&mut self, value: XamlValue) {
        match value {
            XamlValue::Text(t) => {
                if let Some(node) = self.text(t).xml_node() {
                    self.xml.detach(node);
                }
                self.texts[t.index()].backing = TextBacking::Detached;
            }
            XamlValue::Object(o) => {
                if self.objects[o.index()].markup_extension {
                    if let Some(el) = self.objects[o.index()].element.take() {
                        self.xml.detach(el);
                    }
                    self.objects[o.index()].promoted = false;
                    self.clear_xml_presence_below(o);
                }
            }
        }
    }

    /// Forget the XML of everything under an extension that went back to
    /// attribute form.
    fn clear_xml_presence_below(&mut self, obj: ObjectId) {
        for prop in self.objects[obj.index()].properties.clone() {
            let p = &mut self.properties[prop.index()];
            p.property_element = None;
            p.container = None;
            p.retired_element = None;
            let values: Vec<XamlValue> = p.value.iter().chain(p.items.iter()).copied().collect();
            for value in values {
                match value {
                    XamlValue::Text(t) => self.texts[t.index()].backing = TextBacking::Detached,
                    XamlValue::Object(child) if self.objects[child.index()].markup_extension => {
                        self.objects[child.index()].element = None;
                        self.objects[child.index()].promoted = false;
                        self.clear_xml_presence_below(child);
                    }
                    XamlValue::Object(_) => {}
                }
            }
        }
    }

    /// Give an object an element and write all its values under it.
    fn materialize(&mut self, obj: ObjectId) -> XmlNodeId {
        let element = self.create_element_for(self.objects[obj.index()].element_type);
        self.objects[obj.index()].element = Some(element);
        for prop in self.objects[obj.index()].properties.clone() {
            if let Some(value) = self.properties[prop.index()].value {
                self.attach_value(prop, value, None);
            }
            let items = self.properties[prop.index()].items.clone();
            for (i, value) in items.into_iter().enumerate() {
                self.attach_value(prop, value, Some(i));
            }
        }
        element
    }

    // ─── Markup extensions ────────────────────────────────────────────────

    /// Whether an extension can be written as `{...}` attribute text.
    pub fn can_print(&self, obj: ObjectId) -> bool {
        let object = self.object(obj);
        object.markup_extension
            && object.properties.iter().all(|&p| {
                let prop = self.property(p);
                prop.items.is_empty()
                    && match prop.value {
                        Some(XamlValue::Object(child)) => self.can_print(child),
                        _ => true,
                    }
            })
    }

    /// `{Type positional, Member=value, ...}` for an extension object.
    pub fn print_extension(&mut self, obj: ObjectId) -> String {
        let ty = self.objects[obj.index()].element_type;
        let ns = self.registry.xml_namespace_of(ty);
        let prefix = self.get_prefix_for_namespace(&ns);
        let mut out = format!("{{{}", qualify(prefix.as_deref(), self.registry.markup_name(ty)));

        let mut args = Vec::new();
        let positional = match &self.objects[obj.index()].constructor_args {
            Some(ctor) => {
                args.extend(ctor.iter().map(|a| quote_arg(a)));
                None
            }
            None => self.extensions.get(&self.registry, ty).and_then(|h| h.positional),
        };
        let props: Vec<PropertyId> = self.objects[obj.index()]
            .properties
            .iter()
            .copied()
            .filter(|&p| self.properties[p.index()].value.is_some())
            .collect();
        let leading = positional.and_then(|name| {
            props
                .iter()
                .copied()
                .find(|&p| self.properties[p.index()].info.name_key() == name)
        });
        if let Some(p) = leading {
            if let Some(value) = self.properties[p.index()].value {
                args.push(self.print_arg(value));
            }
        }
        for p in props.into_iter().filter(|&p| Some(p) != leading) {
            if let Some(value) = self.properties[p.index()].value {
                let name = self.properties[p.index()].info.full_name().to_string();
                args.push(format!("{name}={}", self.print_arg(value)));
            }
        }
        if !args.is_empty() {
            out.push(' ');
            out.push_str(&args.join(", "));
        }
        out.push('}');
        out
    }

    fn print_arg(&mut self, value: XamlValue) -> String {
        match value {
            XamlValue::Text(t) => quote_arg(self.text(t).text()),
            XamlValue::Object(o) => self.print_extension(o),
        }
    }

    /// Rewrite the attribute text of the extension chain around `obj`,
    /// promoting it to element form when it stopped being printable and
    /// demoting a promoted one that became printable again.
    pub(crate) fn refresh_extension_xml(&mut self, obj: ObjectId) {
        let mut holder = None;
        let mut current = obj;
        while self.objects[current.index()].markup_extension && self.objects[current.index()].element.is_none() {
            holder = Some(current);
            match self.parent_object(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        if let Some(holder) = holder
            && let Some(prop) = self.objects[holder.index()].parent
        {
            let owner = self.properties[prop.index()].parent;
            if let Some(host) = self.objects[owner.index()].element {
                let (prefix, local_name) = self.attribute_name(prop);
                if self.can_print(holder) {
                    let text = self.print_extension(holder);
                    self.xml.set_attribute(host, prefix.as_deref(), &local_name, &text);
                } else {
                    log::debug!("writing {} in element form", self.type_name(holder));
                    self.xml.remove_attribute(host, prefix.as_deref(), &local_name);
                    self.objects[holder.index()].promoted = true;
                    let element = self.materialize(holder);
                    self.insert_child_node(prop, element, None);
                }
            }
        }

        let chain: Vec<ObjectId> = std::iter::successors(Some(obj), |&o| self.parent_object(o))
            .take_while(|&o| self.objects[o.index()].markup_extension)
            .collect();
        let demotable = chain.into_iter().rev().find(|&o| {
            let object = &self.objects[o.index()];
            object.promoted && object.element.is_some() && self.can_print(o)
        });
        if let Some(target) = demotable {
            self.demote(target);
        }
    }

    fn demote(&mut self, obj: ObjectId) {
        let Some(prop) = self.objects[obj.index()].parent else {
            return;
        };
        if self.properties[prop.index()].is_collection() {
            return;
        }
        let owner = self.properties[prop.index()].parent;
        let Some(host) = self.objects[owner.index()].element else {
            return;
        };
        log::debug!("writing {} in attribute form", self.type_name(obj));
        if let Some(element) = self.objects[obj.index()].element.take() {
            self.xml.detach(element);
        }
        self.objects[obj.index()].promoted = false;
        self.clear_xml_presence_below(obj);
        self.cleanup_property_element(prop);
        let text = self.print_extension(obj);
        let (prefix, local_name) = self.attribute_name(prop);
        self.xml.set_attribute(host, prefix.as_deref(), &local_name, &text);
    }

    // ─── Live instances ───────────────────────────────────────────────────

    /// Push a member's value to its instance, then re-evaluate extensions
    /// that feed their owner's members.
    pub(crate) fn update_value_on_instance(&mut self, prop: PropertyId) {
        self.push_value(prop);
        let mut obj = self.properties[prop.index()].parent;
        while self.objects[obj.index()].markup_extension {
            let Some(parent) = self.objects[obj.index()].parent else {
                break;
            };
            self.push_value(parent);
            obj = self.properties[parent.index()].parent;
        }
    }

    pub(crate) fn push_value(&mut self, prop: PropertyId) {
        match self.try_push_value(prop) {
            Ok(()) => {}
            Err(XamlError::NotResettable(member)) => log::debug!("ignoring reset of {member}"),
            Err(err) => {
                let p = self.property(prop);
                log::warn!("cannot update {} on {}: {err}", p.info.full_name(), self.type_name(p.parent));
            }
        }
    }

    pub(crate) fn try_push_value(&mut self, prop: PropertyId) -> Result<(), XamlError> {
        let p = &self.properties[prop.index()];
        let info = p.info.clone();
        let obj = p.parent;
        let value = p.value;
        let Some(inst) = self.objects[obj.index()].instance.as_instance() else {
            return Ok(());
        };
        if info.is_collection() {
            return self.rebuild_collection(prop, &info, inst);
        }
        match value {
            Some(value) => {
                let live = self.value_for(value, &info, obj)?;
                info.set_value(&self.registry, &mut self.instances, inst, live)
            }
            None => info.reset_value(&mut self.instances, inst),
        }
    }

    fn rebuild_collection(&mut self, prop: PropertyId, info: &XamlPropertyInfo, inst: InstanceId) -> Result<(), XamlError> {
        let collection = info.ensure_collection(&self.registry, &mut self.instances, inst)?;
        let dictionary = self.registry.collection_kind(self.instances.type_of(collection)) == Some(CollectionKind::Dictionary);
        let obj = self.properties[prop.index()].parent;
        let mut live = Vec::new();
        for item in self.properties[prop.index()].items.clone() {
            match self.value_for(item, info, obj) {
                Ok(value) => live.push((item, value)),
                Err(err) => log::warn!("skipping item of {}: {err}", info.full_name()),
            }
        }
        self.instances.clear(collection);
        for (item, value) in live {
            if !dictionary {
                self.instances.add(collection, value);
                continue;
            }
            match item.as_object().and_then(|o| self.objects[o.index()].key.clone()) {
                Some(key) => self.instances.dictionary_insert(collection, &key, value),
                None => log::warn!("entry of {} has no x:Key", info.full_name()),
            }
        }
        Ok(())
    }

    /// Live value a graph value produces for the member `info` of `owner`.
    pub(crate) fn value_for(&self, value: XamlValue, info: &XamlPropertyInfo, owner: ObjectId) -> Result<Value, XamlError> {
        match value {
            XamlValue::Text(t) => {
                let text = self.text(t).text();
                if info.is_event() || info.is_collection() {
                    return Ok(Value::String(text.to_string()));
                }
                self.convert_text(text, info.return_type(), Some(owner))
            }
            XamlValue::Object(o) => {
                let object = self.object(o);
                match self.extensions.get(&self.registry, object.element_type) {
                    Some(handler) if object.markup_extension => (handler.evaluate)(self, o, info),
                    _ => Ok(object.instance.clone()),
                }
            }
        }
    }

    pub(crate) fn convert_text(&self, text: &str, target: TypeKey, context: Option<ObjectId>) -> Result<Value, XamlError> {
        let ctx = self.conversion_context(context);
        let target_name = self.registry.type_name(target);
        match self.registry.converter(target) {
            Some(converter) => Ok(converter.convert_from(text, target_name, &ctx)?),
            None if Some(target) == self.registry.object_type() => Ok(Value::String(text.to_string())),
            None => Err(ConversionError::new(text, target_name).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PRESENTATION: &str = "http://schemas.microsoft.com/winfx/2006/xaml/presentation";

    fn load(body: &str) -> XamlDocument {
        let text = format!(r#"<StackPanel xmlns="{PRESENTATION}" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml">{body}</StackPanel>"#);
        XamlDocument::parse(&text).unwrap()
    }

    fn body(doc: &XamlDocument) -> String {
        let text = doc.to_xml_string();
        let start = text.find('>').unwrap() + 1;
        let end = text.rfind("</StackPanel>").unwrap();
        text[start..end].to_string()
    }

    fn first_child(doc: &mut XamlDocument) -> ObjectId {
        let root = doc.root_element().unwrap();
        let children = doc.content_property(root).unwrap();
        doc.object_values(children)[0]
    }

    #[test]
    fn inserted_items_land_between_neighbours() {
        let mut doc = load("<Button x:Name=\"a\" /><Button x:Name=\"c\" />");
        let root = doc.root_element().unwrap();
        let children = doc.content_property(root).unwrap();
        let b = doc.create_object("Button").unwrap();
        doc.rename(b, Some("b")).unwrap();
        doc.insert_item(children, 1, XamlValue::Object(b)).unwrap();
        assert_eq!(
            body(&doc),
            r#"<Button x:Name="a" /><Button Name="b" /><Button x:Name="c" />"#
        );

        let panel = doc.instance_of(root).unwrap();
        let items = doc.value_on_instance(children).unwrap().as_instance().unwrap();
        assert_eq!(doc.instances().count(items), 3);
        assert_eq!(doc.instances().items(items)[1], Value::Instance(doc.instance_of(b).unwrap()));
        assert!(doc.instances().value(panel, crate::id::Name::intern("Children")).is_some());
    }

    #[test]
    fn scalar_object_gets_a_property_element() {
        let mut doc = load("<Button Content=\"Hi\" />");
        let button = first_child(&mut doc);
        let transform = doc.create_object("RotateTransform").unwrap();
        let prop = doc.property_by_name(button, "RenderTransform").unwrap();
        doc.set_property_value(prop, XamlValue::Object(transform)).unwrap();
        assert_eq!(
            body(&doc),
            r#"<Button Content="Hi"><Button.RenderTransform><RotateTransform /></Button.RenderTransform></Button>"#
        );
        doc.reset_property(prop).unwrap();
        assert_eq!(body(&doc), r#"<Button Content="Hi" />"#);
        assert!(!doc.is_set(prop));
    }

    #[test]
    fn literal_braces_are_escaped() {
        let mut doc = load("<TextBlock />");
        let block = first_child(&mut doc);
        let prop = doc.set_member_text(block, "Text", "{x}").unwrap();
        assert_eq!(body(&doc), r#"<TextBlock Text="{}{x}" />"#);
        assert_eq!(doc.value_on_instance(prop).unwrap(), Value::String("{x}".into()));
    }

    #[test]
    fn content_text_is_replaced_in_place() {
        let mut doc = load("<TextBlock>Hello</TextBlock>");
        let block = first_child(&mut doc);
        let text = doc.find_property(block, "Text").unwrap();
        let value = doc.create_text_value("Bye");
        doc.set_property_value(text, value).unwrap();
        assert_eq!(body(&doc), "<TextBlock>Bye</TextBlock>");
    }

    #[test]
    fn events_keep_handler_names() {
        let mut doc = load("<Button Click=\"OnClick\" />");
        let button = first_child(&mut doc);
        let click = doc.find_property(button, "Click").unwrap();
        assert!(doc.property(click).is_event());
        assert!(matches!(doc.value_on_instance(click), Err(XamlError::EventValue(_))));
        doc.set_property_text(click, "OnPress").unwrap();
        assert_eq!(body(&doc), r#"<Button Click="OnPress" />"#);
    }

    #[test]
    fn collection_changes_are_reported() {
        let mut doc = load("");
        let root = doc.root_element().unwrap();
        let children = doc.content_property(root).unwrap();
        let cursor = doc.changes().cursor();
        let button = doc.create_object("Button").unwrap();
        doc.add_item(children, XamlValue::Object(button)).unwrap();
        doc.remove_item_at(children, 0).unwrap();
        assert_eq!(
            doc.changes().since(cursor),
            &[
                DocumentChange::CollectionChanged {
                    property: children,
                    action: CollectionAction::Insert { index: 0 },
                },
                DocumentChange::IsSetChanged {
                    property: children,
                    is_set: true,
                },
                DocumentChange::CollectionChanged {
                    property: children,
                    action: CollectionAction::Remove { index: 0 },
                },
                DocumentChange::IsSetChanged {
                    property: children,
                    is_set: false,
                },
            ]
        );
    }

    #[test]
    fn parented_values_are_rejected() {
        let mut doc = load("<Button Content=\"A\" /><Button />");
        let root = doc.root_element().unwrap();
        let children = doc.content_property(root).unwrap();
        let first = doc.object_values(children)[0];
        let second = doc.object_values(children)[1];
        let content = doc.find_property(first, "Content").unwrap();
        let value = doc.property(content).value().unwrap();
        let target = doc.property_by_name(second, "Content").unwrap();
        assert_eq!(doc.set_property_value(target, value), Err(XamlError::ValueAlreadyParented));
        assert_eq!(
            doc.insert_item(children, 0, XamlValue::Object(first)),
            Err(XamlError::ValueAlreadyParented)
        );
        assert!(matches!(
            doc.set_property_value(children, value),
            Err(XamlError::IsACollection(_))
        ));
    }
}
