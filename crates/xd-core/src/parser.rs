//! Builds the object graph and live instances from a parsed `XmlTree`.

use crate::builtin::{DESIGN_NS, MARKUP_COMPATIBILITY_NS, XAML_NS};
use crate::document::XamlDocument;
use crate::error::{LoadErrorKind, XamlError, XamlLoadError};
use crate::id::{ObjectId, PropertyId, TypeKey, XmlNodeId};
use crate::markup::{MarkupArg, MarkupExtensionAst, is_markup_extension_text, parse_markup_extension, unescape_literal};
use crate::object::{TextBacking, XamlObject, XamlValue};
use crate::property::XamlPropertyInfo;
use crate::settings::XamlErrorSink;
use crate::value::Value;
use crate::xml::{XML_NAMESPACE, XmlAttribute, XmlNodeKind, is_whitespace, normalize_whitespace, split_qualified};

/// `x:` directives that only matter to a compiler.
const IGNORED_DIRECTIVES: &[&str] = &[
    "Class",
    "ClassModifier",
    "Subclass",
    "FieldModifier",
    "Uid",
    "Shared",
    "TypeArguments",
];

pub(crate) struct XamlParser<'d, 's> {
    doc: &'d mut XamlDocument,
    sink: Option<&'s mut dyn XamlErrorSink>,
}

impl<'d, 's> XamlParser<'d, 's> {
    pub(crate) fn new(doc: &'d mut XamlDocument, sink: Option<&'s mut dyn XamlErrorSink>) -> Self {
        Self { doc, sink }
    }

    fn error(&self, kind: LoadErrorKind, message: impl Into<String>, node: XmlNodeId) -> XamlLoadError {
        let (line, column) = self.doc.xml.position(node);
        XamlLoadError::new(kind, message, line, column)
    }

    /// Hand a recoverable error to the sink, or fail the load without one.
    fn report(&mut self, error: XamlLoadError, obj: Option<ObjectId>) -> Result<(), XamlLoadError> {
        if error.is_fatal() {
            return Err(error);
        }
        let Some(sink) = self.sink.as_deref_mut() else {
            return Err(error);
        };
        log::debug!("load error: {error}");
        sink.report(&error);
        if let Some(obj) = obj {
            self.doc.objects[obj.index()].has_errors = true;
        }
        Ok(())
    }

    fn report_at(
        &mut self,
        kind: LoadErrorKind,
        message: impl Into<String>,
        node: XmlNodeId,
        obj: Option<ObjectId>,
    ) -> Result<(), XamlLoadError> {
        let error = self.error(kind, message, node);
        self.report(error, obj)
    }

    // ─── Namespaces ───────────────────────────────────────────────────────

    fn resolve_type(&mut self, node: XmlNodeId, prefix: Option<&str>, local_name: &str) -> Option<TypeKey> {
        let ns = self.doc.xml.lookup_namespace(node, prefix)?.to_string();
        self.doc.type_finder.register_clr_namespace(&ns);
        self.doc.type_finder.resolve(&ns, local_name)
    }

    fn resolve_element_type(&mut self, el: XmlNodeId) -> Option<TypeKey> {
        let element = self.doc.xml.element(el)?;
        let prefix = element.prefix.clone();
        let local_name = element.local_name.clone();
        self.resolve_type(el, prefix.as_deref(), &local_name)
    }

    /// Design-time namespaces, plus any listed in `mc:Ignorable`.
    fn is_ignorable(&self, node: XmlNodeId, ns: &str) -> bool {
        if ns == MARKUP_COMPATIBILITY_NS || ns == DESIGN_NS {
            return true;
        }
        let xml = &self.doc.xml;
        std::iter::successors(Some(node), |&n| xml.parent(n)).any(|n| {
            xml.element(n).is_some_and(|el| {
                el.attributes().iter().any(|a| {
                    a.local_name == "Ignorable"
                        && a.prefix.as_deref().and_then(|p| xml.lookup_namespace(n, Some(p)))
                            == Some(MARKUP_COMPATIBILITY_NS)
                        && a.value
                            .split_whitespace()
                            .any(|p| xml.lookup_namespace(n, Some(p)) == Some(ns))
                })
            })
        })
    }

    fn is_ignorable_element(&self, el: XmlNodeId) -> bool {
        self.doc
            .xml
            .namespace_of(el)
            .is_some_and(|ns| self.is_ignorable(el, ns))
    }

    fn is_property_element(&self, el: XmlNodeId) -> bool {
        self.doc
            .xml
            .element(el)
            .is_some_and(|e| e.local_name.contains('.'))
    }

    // ─── Objects ──────────────────────────────────────────────────────────

    /// Load `el` and everything under it. `None` means the element was
    /// skipped after a reported error.
    pub(crate) fn parse_object(
        &mut self,
        el: XmlNodeId,
        parent: Option<PropertyId>,
    ) -> Result<Option<ObjectId>, XamlLoadError> {
        let parent_obj = parent.map(|p| self.doc.properties[p.index()].parent);
        let Some(ty) = self.resolve_element_type(el) else {
            let name = self.doc.xml.element(el).map(|e| e.qualified_name()).unwrap_or_default();
            self.report_at(LoadErrorKind::UnknownType, format!("unknown type `{name}`"), el, parent_obj)?;
            return Ok(None);
        };
        let registry = self.doc.registry.clone();
        let info = registry.info(ty);
        let has_elements = self.doc.xml.element_children(el).next().is_some();
        let text = self.element_text(el);
        let leaf = registry.converter(ty).is_some()
            && registry.content_property(ty).is_none()
            && !has_elements
            && (text.is_some() || !info.constructible);

        let instance = if leaf {
            let raw = text.unwrap_or_default();
            match self.doc.convert_text(&raw, ty, parent_obj) {
                Ok(value) => value,
                Err(err) => {
                    self.report_at(LoadErrorKind::Conversion, err.to_string(), el, parent_obj)?;
                    Value::Null
                }
            }
        } else {
            match registry.construct(ty, &mut self.doc.instances) {
                Some(inst) => Value::Instance(inst),
                None => {
                    self.report_at(
                        LoadErrorKind::NotConstructible,
                        format!("`{}` cannot be created", info.name),
                        el,
                        parent_obj,
                    )?;
                    return Ok(None);
                }
            }
        };

        // Linked before its members load so name scopes and resources
        // resolve through the parent.
        let obj = self.doc.push_object(XamlObject {
            element_type: ty,
            instance,
            element: Some(el),
            parent,
            properties: Vec::new(),
            key: None,
            has_errors: false,
            markup_extension: registry.is_markup_extension(ty),
            promoted: false,
            constructor_args: None,
        });

        let attributes = self.doc.xml.element(el).map(|e| e.attributes().to_vec()).unwrap_or_default();
        for attr in &attributes {
            self.parse_attribute(obj, el, attr)?;
        }
        self.register_name(obj, el)?;
        if !leaf {
            self.parse_children(obj, el)?;
        }
        Ok(Some(obj))
    }

    /// Non-whitespace character data directly under `el`.
    fn element_text(&self, el: XmlNodeId) -> Option<String> {
        let xml = &self.doc.xml;
        let preserve = xml.is_space_preserved(el);
        let mut text = String::new();
        for &child in xml.children(el) {
            if let Some(value) = xml.text_value(child) {
                text.push_str(value);
            }
        }
        if is_whitespace(&text) {
            return None;
        }
        Some(if preserve { text } else { normalize_whitespace(&text) })
    }

    fn register_name(&mut self, obj: ObjectId, el: XmlNodeId) -> Result<(), XamlLoadError> {
        let Some(name) = self.doc.name_of(obj) else {
            return Ok(());
        };
        let root = self.doc.scope_root(obj);
        if !self.doc.scopes.scope_mut(root).register(&name, obj) {
            self.report_at(
                LoadErrorKind::DuplicateName,
                format!("name `{name}` is already in use"),
                el,
                Some(obj),
            )?;
        }
        Ok(())
    }

    // ─── Attributes ───────────────────────────────────────────────────────

    fn parse_attribute(&mut self, obj: ObjectId, el: XmlNodeId, attr: &XmlAttribute) -> Result<(), XamlLoadError> {
        if attr.is_namespace_declaration() {
            return Ok(());
        }
        let ns = match attr.prefix.as_deref() {
            Some(prefix) => match self.doc.xml.lookup_namespace(el, Some(prefix)) {
                Some(ns) => Some(ns.to_string()),
                None => {
                    return self.report_at(
                        LoadErrorKind::UnknownProperty,
                        format!("prefix `{prefix}` is not declared"),
                        el,
                        Some(obj),
                    );
                }
            },
            None => None,
        };
        match ns.as_deref() {
            Some(XML_NAMESPACE) => return Ok(()),
            Some(XAML_NS) => return self.parse_directive(obj, el, attr),
            Some(ns) if self.is_ignorable(el, ns) => return Ok(()),
            _ => {}
        }

        let ty = self.doc.objects[obj.index()].element_type;
        let registry = self.doc.registry.clone();
        let info = match attr.local_name.split_once('.') {
            None => {
                if let Some((owner, schema)) = registry.find_property(ty, &attr.local_name) {
                    XamlPropertyInfo::normal(&registry, owner, schema)
                } else if let Some(owner) = registry.find_event(ty, &attr.local_name) {
                    XamlPropertyInfo::event(&registry, owner, &attr.local_name)
                } else {
                    return self.report_at(
                        LoadErrorKind::UnknownProperty,
                        format!("`{}` has no member `{}`", registry.type_name(ty), attr.local_name),
                        el,
                        Some(obj),
                    );
                }
            }
            Some((owner_name, member)) => {
                let owner = self.resolve_type(el, attr.prefix.as_deref(), owner_name);
                match owner.and_then(|o| self.member_of_owner(o, ty, member)) {
                    Some(info) => info,
                    None => {
                        return self.report_at(
                            LoadErrorKind::UnresolvableAttachedProperty,
                            format!("cannot resolve `{}`", attr.qualified_name()),
                            el,
                            Some(obj),
                        );
                    }
                }
            }
        };

        let Some(prop) = self.add_member(obj, info, el)? else {
            return Ok(());
        };
        self.doc.properties[prop.index()].attribute_name = Some((attr.prefix.clone(), attr.local_name.clone()));
        self.assign_attribute_value(obj, prop, el, attr)
    }

    /// `Owner.Member`: an attached member of `owner`, or a normal member
    /// written with its declaring type.
    fn member_of_owner(&self, owner: TypeKey, target: TypeKey, member: &str) -> Option<XamlPropertyInfo> {
        let registry = &self.doc.registry;
        if let Some(schema) = registry.find_attached(owner, member) {
            return Some(XamlPropertyInfo::attached(registry, owner, schema));
        }
        if !registry.is_assignable(owner, target) {
            return None;
        }
        registry
            .find_property(owner, member)
            .map(|(declaring, schema)| XamlPropertyInfo::normal(registry, declaring, schema))
    }

    fn parse_directive(&mut self, obj: ObjectId, el: XmlNodeId, attr: &XmlAttribute) -> Result<(), XamlLoadError> {
        match attr.local_name.as_str() {
            "Name" => {
                let ty = self.doc.objects[obj.index()].element_type;
                let registry = self.doc.registry.clone();
                let schema = registry
                    .name_property(ty)
                    .and_then(|name| registry.find_property(ty, name.as_str()));
                let Some((owner, schema)) = schema else {
                    return self.report_at(
                        LoadErrorKind::UnknownProperty,
                        format!("`{}` cannot be named", registry.type_name(ty)),
                        el,
                        Some(obj),
                    );
                };
                let info = XamlPropertyInfo::normal(&registry, owner, schema);
                let Some(prop) = self.add_member(obj, info, el)? else {
                    return Ok(());
                };
                self.doc.properties[prop.index()].attribute_name = Some((attr.prefix.clone(), attr.local_name.clone()));
                self.assign_attribute_value(obj, prop, el, attr)
            }
            "Key" => {
                self.doc.objects[obj.index()].key = Some(attr.value.clone());
                Ok(())
            }
            name if IGNORED_DIRECTIVES.contains(&name) => Ok(()),
            other => self.report_at(
                LoadErrorKind::UnknownProperty,
                format!("unknown directive `x:{other}`"),
                el,
                Some(obj),
            ),
        }
    }

    /// Add a member to `obj`. A second non-attached assignment of the same
    /// member aborts the load.
    fn add_member(
        &mut self,
        obj: ObjectId,
        info: XamlPropertyInfo,
        node: XmlNodeId,
    ) -> Result<Option<PropertyId>, XamlLoadError> {
        let exists = self.doc.objects[obj.index()]
            .properties
            .iter()
            .any(|&p| self.doc.properties[p.index()].info.same_member(&info));
        if exists {
            let message = format!("`{}` is set more than once", info.full_name());
            if !info.is_attached() {
                return Err(self.error(LoadErrorKind::DuplicateProperty, message, node));
            }
            self.report_at(LoadErrorKind::InvalidContent, message, node, Some(obj))?;
            return Ok(None);
        }
        Ok(Some(self.doc.add_property(obj, info)))
    }

    fn assign_attribute_value(
        &mut self,
        obj: ObjectId,
        prop: PropertyId,
        el: XmlNodeId,
        attr: &XmlAttribute,
    ) -> Result<(), XamlLoadError> {
        let info = &self.doc.properties[prop.index()].info;
        if info.is_collection() {
            let message = format!("`{}` cannot be set from an attribute", info.full_name());
            return self.report_at(LoadErrorKind::InvalidContent, message, el, Some(obj));
        }
        if is_markup_extension_text(&attr.value) && !info.is_event() {
            let ast = match parse_markup_extension(&attr.value) {
                Ok(ast) => ast,
                Err(err) => {
                    return self.report_at(LoadErrorKind::MarkupExtension, err.to_string(), el, Some(obj));
                }
            };
            let Some(ext) = self.build_extension(&ast, el, obj)? else {
                return Ok(());
            };
            self.link(prop, XamlValue::Object(ext));
            self.push_extension_tree(ext, el)?;
            return self.push(prop, el);
        }
        let text = self.doc.push_text(
            unescape_literal(&attr.value).to_string(),
            TextBacking::Attribute {
                element: el,
                prefix: attr.prefix.clone(),
                local_name: attr.local_name.clone(),
            },
        );
        self.link(prop, XamlValue::Text(text));
        self.push(prop, el)
    }

    // ─── Markup extensions ────────────────────────────────────────────────

    /// Create the object for `{Type args}` written on element `node`.
    fn build_extension(
        &mut self,
        ast: &MarkupExtensionAst,
        node: XmlNodeId,
        owner: ObjectId,
    ) -> Result<Option<ObjectId>, XamlLoadError> {
        let (prefix, local) = split_qualified(&ast.type_name);
        let registry = self.doc.registry.clone();
        let Some(ty) = self
            .resolve_type(node, prefix, local)
            .filter(|&t| registry.is_markup_extension(t))
        else {
            self.report_at(
                LoadErrorKind::UnknownType,
                format!("unknown markup extension `{}`", ast.type_name),
                node,
                Some(owner),
            )?;
            return Ok(None);
        };
        let info = registry.info(ty);

        let mut assignments: Vec<(String, &MarkupArg)> = Vec::new();
        let mut constructor_args = None;
        if !ast.positional.is_empty() {
            let Some(params) = info.constructors.iter().find(|c| c.len() == ast.positional.len()) else {
                self.report_at(
                    LoadErrorKind::NotConstructible,
                    format!("`{}` has no constructor taking {} arguments", info.name, ast.positional.len()),
                    node,
                    Some(owner),
                )?;
                return Ok(None);
            };
            // With a default constructor, parameters that name members are
            // assigned after construction.
            let members: Option<Vec<String>> = info
                .has_default_constructor()
                .then(|| {
                    params
                        .iter()
                        .map(|p| {
                            registry
                                .find_property_ignore_case(ty, p.as_str())
                                .map(|(_, s)| s.name.to_string())
                        })
                        .collect()
                })
                .flatten();
            match members {
                Some(members) => assignments.extend(members.into_iter().zip(ast.positional.iter())),
                None => {
                    let mut args = Vec::new();
                    for arg in &ast.positional {
                        match arg {
                            MarkupArg::Text(text) => args.push(text.clone()),
                            MarkupArg::Extension(_) => {
                                self.report_at(
                                    LoadErrorKind::MarkupExtension,
                                    "nested extensions are not supported as constructor arguments",
                                    node,
                                    Some(owner),
                                )?;
                                return Ok(None);
                            }
                        }
                    }
                    constructor_args = Some(args);
                }
            }
        }

        let instance = match constructor_args {
            Some(_) => Some(self.doc.instances.create(ty)),
            None => registry.construct(ty, &mut self.doc.instances),
        };
        let Some(instance) = instance else {
            self.report_at(
                LoadErrorKind::NotConstructible,
                format!("`{}` cannot be created", info.name),
                node,
                Some(owner),
            )?;
            return Ok(None);
        };
        let ext = self.doc.push_object(XamlObject {
            element_type: ty,
            instance: Value::Instance(instance),
            element: None,
            parent: None,
            properties: Vec::new(),
            key: None,
            has_errors: false,
            markup_extension: true,
            promoted: false,
            constructor_args,
        });

        let named = ast.named.iter().map(|(name, arg)| (name.clone(), arg));
        for (member, arg) in assignments.into_iter().chain(named) {
            self.assign_extension_member(ext, &member, arg, node)?;
        }
        Ok(Some(ext))
    }

    fn assign_extension_member(
        &mut self,
        ext: ObjectId,
        member: &str,
        arg: &MarkupArg,
        node: XmlNodeId,
    ) -> Result<(), XamlLoadError> {
        let ty = self.doc.objects[ext.index()].element_type;
        let registry = self.doc.registry.clone();
        let Some((owner, schema)) = registry.find_property(ty, member) else {
            return self.report_at(
                LoadErrorKind::UnknownProperty,
                format!("`{}` has no member `{member}`", registry.type_name(ty)),
                node,
                Some(ext),
            );
        };
        let info = XamlPropertyInfo::normal(&registry, owner, schema);
        let Some(prop) = self.add_member(ext, info, node)? else {
            return Ok(());
        };
        let value = match arg {
            MarkupArg::Text(text) => XamlValue::Text(self.doc.push_text(text.clone(), TextBacking::Detached)),
            MarkupArg::Extension(inner) => match self.build_extension(inner, node, ext)? {
                Some(inner) => XamlValue::Object(inner),
                None => return Ok(()),
            },
        };
        self.link(prop, value);
        Ok(())
    }

    /// Push the members of an attribute-form extension to its instance,
    /// innermost first, once the whole tree is linked to its owner.
    fn push_extension_tree(&mut self, ext: ObjectId, node: XmlNodeId) -> Result<(), XamlLoadError> {
        for prop in self.doc.objects[ext.index()].properties.clone() {
            if let Some(XamlValue::Object(child)) = self.doc.properties[prop.index()].value {
                if self.doc.objects[child.index()].markup_extension {
                    self.push_extension_tree(child, node)?;
                }
            }
            self.push(prop, node)?;
        }
        Ok(())
    }

    // ─── Children ─────────────────────────────────────────────────────────

    fn parse_children(&mut self, obj: ObjectId, el: XmlNodeId) -> Result<(), XamlLoadError> {
        let mut content: Option<PropertyId> = None;
        for child in self.doc.xml.children(el).to_vec() {
            let is_element = self.doc.xml.element(child).is_some();
            if is_element && self.is_ignorable_element(child) {
                continue;
            }
            if is_element && self.is_property_element(child) {
                self.parse_property_element(obj, child)?;
                continue;
            }
            if !is_element && self.content_text(child).is_none() {
                continue;
            }
            if let Some(prop) = self.content_member(obj, child, &mut content)? {
                self.parse_value_node(obj, prop, child)?;
            }
        }
        Ok(())
    }

    /// Text of a content node, `None` for ignorable whitespace.
    fn content_text(&self, node: XmlNodeId) -> Option<String> {
        let xml = &self.doc.xml;
        let raw = xml.text_value(node)?;
        if xml.is_cdata(node) || xml.parent(node).is_some_and(|p| xml.is_space_preserved(p)) {
            return Some(raw.to_string());
        }
        (!is_whitespace(raw)).then(|| normalize_whitespace(raw))
    }

    /// Member receiving direct content, resolved on first use.
    fn content_member(
        &mut self,
        obj: ObjectId,
        node: XmlNodeId,
        content: &mut Option<PropertyId>,
    ) -> Result<Option<PropertyId>, XamlLoadError> {
        if content.is_some() {
            return Ok(*content);
        }
        let ty = self.doc.objects[obj.index()].element_type;
        let registry = self.doc.registry.clone();
        let info = if let Some(name) = registry.content_property(ty) {
            registry
                .find_property(ty, name.as_str())
                .map(|(owner, schema)| XamlPropertyInfo::normal(&registry, owner, schema))
        } else {
            registry
                .collection_kind(ty)
                .map(|_| XamlPropertyInfo::items(ty))
        };
        let Some(info) = info else {
            self.report_at(
                LoadErrorKind::InvalidContent,
                format!("`{}` does not accept content", registry.type_name(ty)),
                node,
                Some(obj),
            )?;
            return Ok(None);
        };
        let prop = self.doc.property_for_info(obj, info);
        *content = Some(prop);
        Ok(Some(prop))
    }

    /// Load one element or text node as a value of `prop`.
    fn parse_value_node(&mut self, obj: ObjectId, prop: PropertyId, node: XmlNodeId) -> Result<(), XamlLoadError> {
        let is_collection = self.doc.properties[prop.index()].is_collection();
        if !is_collection && self.doc.properties[prop.index()].value.is_some() {
            let name = self.doc.properties[prop.index()].info.full_name().to_string();
            return self.report_at(
                LoadErrorKind::InvalidContent,
                format!("`{name}` already has a value"),
                node,
                Some(obj),
            );
        }
        let value = if self.doc.xml.element(node).is_some() {
            match self.parse_object(node, Some(prop))? {
                Some(child) => XamlValue::Object(child),
                None => return Ok(()),
            }
        } else {
            let Some(text) = self.content_text(node) else {
                return Ok(());
            };
            let id = self.doc.push_text(text, TextBacking::Node(node));
            XamlValue::Text(id)
        };
        self.link(prop, value);
        self.push(prop, node)
    }

    fn parse_property_element(&mut self, obj: ObjectId, pe: XmlNodeId) -> Result<(), XamlLoadError> {
        let Some((prefix, owner_name, member)) = self.doc.xml.element(pe).and_then(|e| {
            let (owner, member) = e.local_name.split_once('.')?;
            Some((e.prefix.clone(), owner.to_string(), member.to_string()))
        }) else {
            return Ok(());
        };
        let ty = self.doc.objects[obj.index()].element_type;
        let owner = self.resolve_type(pe, prefix.as_deref(), &owner_name);
        let Some(info) = owner.and_then(|o| self.member_of_owner(o, ty, &member)) else {
            let name = format!("{owner_name}.{member}");
            return self.report_at(
                LoadErrorKind::UnknownProperty,
                format!("cannot resolve member element `{name}`"),
                pe,
                Some(obj),
            );
        };
        let Some(prop) = self.add_member(obj, info, pe)? else {
            return Ok(());
        };
        self.doc.properties[prop.index()].property_element = Some(pe);

        let nodes: Vec<XmlNodeId> = self
            .doc
            .xml
            .children(pe)
            .iter()
            .copied()
            .filter(|&c| {
                let xml = &self.doc.xml;
                match &xml.node(c).kind {
                    XmlNodeKind::Element(_) => !self.is_ignorable_element(c),
                    XmlNodeKind::Text { .. } | XmlNodeKind::CData { .. } => self.content_text(c).is_some(),
                    _ => false,
                }
            })
            .collect();

        if !self.doc.properties[prop.index()].is_collection() {
            if nodes.len() > 1 {
                let name = self.doc.properties[prop.index()].info.full_name().to_string();
                self.report_at(
                    LoadErrorKind::InvalidContent,
                    format!("`{name}` takes a single value"),
                    pe,
                    Some(obj),
                )?;
            }
            if let Some(&first) = nodes.first() {
                self.parse_value_node(obj, prop, first)?;
            }
            return Ok(());
        }

        // A lone collection element is the collection itself; its children
        // are the items.
        let return_type = self.doc.properties[prop.index()].info.return_type();
        let wrapper = match nodes.as_slice() {
            [only] if self.doc.xml.element(*only).is_some() => self.resolve_element_type(*only).and_then(|t| {
                let registry = &self.doc.registry;
                (registry.collection_kind(t).is_some() && registry.is_assignable(return_type, t)).then_some(*only)
            }),
            _ => None,
        };
        let (container, items) = match wrapper {
            Some(wrapper) => {
                let items: Vec<XmlNodeId> = self
                    .doc
                    .xml
                    .children(wrapper)
                    .iter()
                    .copied()
                    .filter(|&c| match &self.doc.xml.node(c).kind {
                        XmlNodeKind::Element(_) => !self.is_ignorable_element(c),
                        XmlNodeKind::Text { .. } | XmlNodeKind::CData { .. } => self.content_text(c).is_some(),
                        _ => false,
                    })
                    .collect();
                (wrapper, items)
            }
            None => (pe, nodes),
        };
        self.doc.properties[prop.index()].container = Some(container);
        for item in items {
            self.parse_value_node(obj, prop, item)?;
        }
        Ok(())
    }

    // ─── Linking ──────────────────────────────────────────────────────────

    /// Attach a freshly loaded value to `prop` without touching the XML.
    fn link(&mut self, prop: PropertyId, value: XamlValue) {
        match value {
            XamlValue::Text(t) => self.doc.texts[t.index()].parent = Some(prop),
            XamlValue::Object(o) => self.doc.objects[o.index()].parent = Some(prop),
        }
        let p = &mut self.doc.properties[prop.index()];
        if p.info.is_collection() {
            p.items.push(value);
        } else {
            p.value = Some(value);
        }
    }

    fn push(&mut self, prop: PropertyId, node: XmlNodeId) -> Result<(), XamlLoadError> {
        let Err(err) = self.doc.try_push_value(prop) else {
            return Ok(());
        };
        let p = &self.doc.properties[prop.index()];
        let obj = p.parent;
        let message = format!("{}: {err}", p.info.full_name());
        let kind = match err {
            XamlError::Conversion(_) => LoadErrorKind::Conversion,
            XamlError::MarkupExtension(_) => LoadErrorKind::MarkupExtension,
            XamlError::UnknownType(_) => LoadErrorKind::UnknownType,
            _ => LoadErrorKind::InvalidContent,
        };
        self.report_at(kind, message, node, Some(obj))
    }
}

#[cfg(test)]
mod tests {
    use crate::document::XamlDocument;
    use crate::error::{LoadErrorKind, XamlLoadError};
    use crate::settings::XamlParserSettings;
    use crate::value::{Color, Thickness, Value};
    use pretty_assertions::assert_eq;

    const NS: &str = r#"xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation" xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml""#;

    fn parse(body: &str) -> XamlDocument {
        XamlDocument::parse(&format!("<Grid {NS}>{body}</Grid>")).unwrap()
    }

    fn parse_with_errors(text: &str) -> (Option<XamlDocument>, Vec<XamlLoadError>) {
        let mut errors: Vec<XamlLoadError> = Vec::new();
        let doc = XamlDocument::parse_with(text, XamlParserSettings::default().with_error_sink(&mut errors)).ok();
        (doc, errors)
    }

    #[test]
    fn attributes_convert_to_live_values() {
        let mut doc = parse(r#"<Button Width="80" Margin="10,5" Background="Red" HorizontalAlignment="left" />"#);
        let root = doc.root_element().unwrap();
        let children = doc.content_property(root).unwrap();
        let button = doc.object_values(children)[0];
        let inst = doc.instance_of(button).unwrap();
        assert_eq!(doc.instance_value(inst, "Width"), Value::Double(80.0));
        assert_eq!(doc.instance_value(inst, "Margin"), Value::Thickness(Thickness::new(10.0, 5.0, 10.0, 5.0)));
        assert_eq!(doc.instance_value(inst, "Background"), Value::Brush(Color::parse("Red").unwrap()));
        assert_eq!(doc.instance_value(inst, "HorizontalAlignment").as_enum().unwrap().as_str(), "Left");
    }

    #[test]
    fn content_and_property_elements() {
        let mut doc = parse(
            r#"<Grid.RowDefinitions><RowDefinition Height="Auto" /><RowDefinition /></Grid.RowDefinitions><TextBlock>  Hello   world </TextBlock>"#,
        );
        let root = doc.root_element().unwrap();
        let rows = doc.find_property(root, "RowDefinitions").unwrap();
        assert_eq!(doc.property(rows).items().len(), 2);
        let children = doc.content_property(root).unwrap();
        let block = doc.object_values(children)[0];
        let text = doc.find_property(block, "Text").unwrap();
        assert_eq!(doc.value_text(text), Some("Hello world"));
    }

    #[test]
    fn collection_wrapper_is_unwrapped() {
        let doc = XamlDocument::parse(&format!(
            r#"<Window {NS}><Window.Resources><ResourceDictionary><SolidColorBrush x:Key="accent" Color="Blue" /></ResourceDictionary></Window.Resources><Button Background="{{StaticResource accent}}" /></Window>"#
        ))
        .unwrap();
        let window = doc.root_element().unwrap();
        let resources = doc.find_property(window, "Resources").unwrap();
        assert_eq!(doc.property(resources).items().len(), 1);
        assert!(doc.find_resource(window, "accent").is_some());

        let content = doc.find_property(window, "Content").unwrap();
        let button = doc.object_values(content)[0];
        let background = doc.find_property(button, "Background").unwrap();
        let brush = doc.find_resource(window, "accent").unwrap();
        assert_eq!(doc.value_on_instance(background).unwrap(), brush);
    }

    #[test]
    fn markup_extension_constructor_arguments_become_members() {
        let mut doc = parse(r#"<TextBlock Text="{Binding Name, Mode=TwoWay}" />"#);
        let root = doc.root_element().unwrap();
        let children = doc.content_property(root).unwrap();
        let block = doc.object_values(children)[0];
        let text = doc.find_property(block, "Text").unwrap();
        let binding = doc.property(text).value().unwrap().as_object().unwrap();
        assert!(doc.object(binding).is_markup_extension());
        assert_eq!(doc.object(binding).xml_element(), None);
        let path = doc.find_property(binding, "Path").unwrap();
        assert_eq!(doc.value_text(path), Some("Name"));
        let mode = doc.find_property(binding, "Mode").unwrap();
        assert_eq!(doc.value_text(mode), Some("TwoWay"));
    }

    #[test]
    fn duplicate_member_is_fatal_even_with_a_sink() {
        let (doc, errors) = parse_with_errors(&format!(r#"<Button {NS} Name="a" x:Name="b" />"#));
        assert!(doc.is_none());
        assert!(errors.is_empty());
        let err = XamlDocument::parse(&format!(r#"<Button {NS} Name="a" x:Name="b" />"#)).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::DuplicateProperty);
    }

    #[test]
    fn recoverable_errors_go_to_the_sink() {
        let (doc, errors) = parse_with_errors(&format!(
            r#"<StackPanel {NS}><Bogus /><Button Width="wide" Nope="1" /><Button x:Name="a" /><Button x:Name="a" /></StackPanel>"#
        ));
        let doc = doc.unwrap();
        let kinds: Vec<LoadErrorKind> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LoadErrorKind::UnknownType,
                LoadErrorKind::Conversion,
                LoadErrorKind::UnknownProperty,
                LoadErrorKind::DuplicateName,
            ]
        );
        assert_eq!(errors[0].line, 1);
        let root = doc.root_element().unwrap();
        assert!(doc.object(root).has_errors());
    }

    #[test]
    fn without_a_sink_the_first_error_aborts() {
        let err = XamlDocument::parse(&format!(r#"<StackPanel {NS}><Bogus /></StackPanel>"#)).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::UnknownType);
    }

    #[test]
    fn design_time_attributes_are_ignored() {
        let doc = XamlDocument::parse(&format!(
            r#"<Grid {NS} xmlns:d="http://schemas.microsoft.com/expression/blend/2008" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" mc:Ignorable="d" d:DesignWidth="300" x:Class="Demo.Main" />"#
        ))
        .unwrap();
        let root = doc.root_element().unwrap();
        assert!(doc.object(root).properties().is_empty());
    }

    #[test]
    fn leaf_elements_convert_their_text() {
        let mut doc = XamlDocument::parse(&format!(
            r#"<ResourceDictionary {NS} xmlns:sys="clr-namespace:System;assembly=mscorlib"><sys:String x:Key="greeting">Hi there</sys:String><sys:Double x:Key="gap">4</sys:Double></ResourceDictionary>"#
        ))
        .unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.find_resource(root, "greeting"), Some(Value::String("Hi there".into())));
        assert_eq!(doc.find_resource(root, "gap"), Some(Value::Double(4.0)));
        let items = doc.content_property(root).unwrap();
        assert_eq!(doc.property(items).items().len(), 2);
    }

    #[test]
    fn preserved_space_and_cdata_are_kept() {
        let mut doc = parse(r#"<TextBlock xml:space="preserve">  a  b </TextBlock><TextBlock><![CDATA[ <x> ]]></TextBlock>"#);
        let root = doc.root_element().unwrap();
        let children = doc.content_property(root).unwrap();
        let blocks = doc.object_values(children);
        let first = doc.find_property(blocks[0], "Text").unwrap();
        let second = doc.find_property(blocks[1], "Text").unwrap();
        assert_eq!(doc.value_text(first), Some("  a  b "));
        assert_eq!(doc.value_text(second), Some(" <x> "));
    }
}
