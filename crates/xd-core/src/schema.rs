//! Type metadata: members, content properties, converters, constructors,
//! and XML namespace mappings.
//!
//! A `TypeRegistry` plays the role of runtime reflection. Types are
//! registered up front (see `builtin::wpf_registry`) and are looked up by
//! CLR namespace and name, or through XML namespace mappings.

use crate::convert::ConverterKind;
use crate::id::{InstanceId, Name, TypeKey};
use crate::instance::InstanceStore;
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    Dictionary,
}

/// A member declared on a type (or an attached member declared by an owner).
#[derive(Debug, Clone)]
pub struct PropertySchema {
    pub name: Name,
    pub value_type: TypeKey,
    pub default: Value,
    pub read_only: bool,
    pub resettable: bool,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub key: TypeKey,
    pub name: Name,
    pub clr_namespace: String,
    pub assembly: String,
    pub base: Option<TypeKey>,
    pub converter: Option<ConverterKind>,
    pub collection: Option<CollectionKind>,
    pub content_property: Option<Name>,
    pub name_property: Option<Name>,
    pub markup_extension: bool,
    /// Constructor parameter-name lists. An empty list is the default
    /// constructor.
    pub constructors: Vec<Vec<Name>>,
    pub constructible: bool,
    /// Primitive or struct type; rejects `Null`.
    pub value_type: bool,
    pub name_scope: bool,
    pub properties: Vec<PropertySchema>,
    pub events: Vec<Name>,
}

impl TypeInfo {
    pub fn full_name(&self) -> String {
        if self.clr_namespace.is_empty() {
            self.name.to_string()
        } else {
            format!("{}.{}", self.clr_namespace, self.name)
        }
    }

    pub fn has_default_constructor(&self) -> bool {
        self.constructors.iter().any(Vec::is_empty)
    }
}

/// An XML namespace mapped onto a CLR namespace in an assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlnsMapping {
    pub xml_namespace: String,
    pub clr_namespace: String,
    pub assembly: String,
    pub preferred_prefix: Option<String>,
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    by_name: HashMap<(String, Name), TypeKey>,
    attached: HashMap<(TypeKey, Name), PropertySchema>,
    mappings: Vec<XmlnsMapping>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining a type in `clr_namespace` of `assembly`.
    pub fn define(&mut self, clr_namespace: &str, assembly: &str, name: &str) -> TypeBuilder<'_> {
        let key = TypeKey::from_index(self.types.len());
        let info = TypeInfo {
            key,
            name: Name::intern(name),
            clr_namespace: clr_namespace.to_string(),
            assembly: assembly.to_string(),
            base: None,
            converter: None,
            collection: None,
            content_property: None,
            name_property: None,
            markup_extension: false,
            constructors: vec![Vec::new()],
            constructible: true,
            value_type: false,
            name_scope: false,
            properties: Vec::new(),
            events: Vec::new(),
        };
        TypeBuilder { registry: self, info }
    }

    /// Declare an attached member `owner.name`.
    pub fn attach(&mut self, owner: TypeKey, name: &str, value_type: TypeKey, default: Value) {
        let name = Name::intern(name);
        self.attached.insert(
            (owner, name),
            PropertySchema {
                name,
                value_type,
                default,
                read_only: false,
                resettable: true,
            },
        );
    }

    pub fn map_xmlns(&mut self, xml_namespace: &str, clr_namespace: &str, assembly: &str, prefix: Option<&str>) {
        self.mappings.push(XmlnsMapping {
            xml_namespace: xml_namespace.to_string(),
            clr_namespace: clr_namespace.to_string(),
            assembly: assembly.to_string(),
            preferred_prefix: prefix.map(str::to_string),
        });
    }

    pub fn mappings(&self) -> &[XmlnsMapping] {
        &self.mappings
    }

    pub fn info(&self, ty: TypeKey) -> &TypeInfo {
        &self.types[ty.index()]
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter()
    }

    pub fn find(&self, clr_namespace: &str, name: &str) -> Option<TypeKey> {
        let name = Name::get(name)?;
        self.by_name.get(&(clr_namespace.to_string(), name)).copied()
    }

    /// Look a type up by simple name across all namespaces (first wins).
    pub fn find_by_name(&self, name: &str) -> Option<TypeKey> {
        self.types
            .iter()
            .find(|t| t.name.as_str() == name)
            .map(|t| t.key)
    }

    pub fn type_name(&self, ty: TypeKey) -> &str {
        self.info(ty).name.as_str()
    }

    /// `ty` followed by its base types, most derived first.
    pub fn ancestry(&self, ty: TypeKey) -> impl Iterator<Item = TypeKey> + '_ {
        std::iter::successors(Some(ty), |&t| self.info(t).base)
    }

    pub fn is_assignable(&self, target: TypeKey, source: TypeKey) -> bool {
        self.ancestry(source).any(|t| t == target)
    }

    /// Find a member on `ty` or its bases. Returns the declaring type.
    pub fn find_property(&self, ty: TypeKey, name: &str) -> Option<(TypeKey, &PropertySchema)> {
        self.ancestry(ty).find_map(|t| {
            self.info(t)
                .properties
                .iter()
                .find(|p| p.name.as_str() == name)
                .map(|p| (t, p))
        })
    }

    /// Case-insensitive member lookup, used to match constructor parameters.
    pub fn find_property_ignore_case(&self, ty: TypeKey, name: &str) -> Option<(TypeKey, &PropertySchema)> {
        self.ancestry(ty).find_map(|t| {
            self.info(t)
                .properties
                .iter()
                .find(|p| p.name.eq_ignore_case(name))
                .map(|p| (t, p))
        })
    }

    pub fn find_attached(&self, owner: TypeKey, name: &str) -> Option<&PropertySchema> {
        let name = Name::get(name)?;
        self.ancestry(owner).find_map(|t| self.attached.get(&(t, name)))
    }

    pub fn find_event(&self, ty: TypeKey, name: &str) -> Option<TypeKey> {
        self.ancestry(ty)
            .find(|&t| self.info(t).events.iter().any(|e| e.as_str() == name))
    }

    pub fn content_property(&self, ty: TypeKey) -> Option<Name> {
        self.ancestry(ty).find_map(|t| self.info(t).content_property)
    }

    pub fn name_property(&self, ty: TypeKey) -> Option<Name> {
        self.ancestry(ty).find_map(|t| self.info(t).name_property)
    }

    pub fn converter(&self, ty: TypeKey) -> Option<&ConverterKind> {
        self.ancestry(ty).find_map(|t| self.info(t).converter.as_ref())
    }

    pub fn collection_kind(&self, ty: TypeKey) -> Option<CollectionKind> {
        self.ancestry(ty).find_map(|t| self.info(t).collection)
    }

    pub fn is_markup_extension(&self, ty: TypeKey) -> bool {
        self.ancestry(ty).any(|t| self.info(t).markup_extension)
    }

    /// Name used in markup. Extension types drop the `Extension` suffix.
    pub fn markup_name(&self, ty: TypeKey) -> &str {
        let name = self.info(ty).name.as_str();
        if self.is_markup_extension(ty) {
            name.strip_suffix("Extension").filter(|s| !s.is_empty()).unwrap_or(name)
        } else {
            name
        }
    }

    pub fn is_name_scope(&self, ty: TypeKey) -> bool {
        self.ancestry(ty).any(|t| self.info(t).name_scope)
    }

    /// The registered `Object` root type, if any.
    pub fn object_type(&self) -> Option<TypeKey> {
        self.find("System", "Object")
    }

    /// Whether `value` can be stored in a member of type `target`.
    pub fn value_fits(&self, value: &Value, target: TypeKey, store: &InstanceStore) -> bool {
        if Some(target) == self.object_type() {
            return true;
        }
        let target_info = self.info(target);
        let converter = self.converter(target);
        match value {
            Value::Null => !target_info.value_type,
            Value::Instance(id) => self.is_assignable(target, store.type_of(*id)),
            Value::String(_) => matches!(converter, Some(ConverterKind::String | ConverterKind::Object)),
            Value::Bool(_) => matches!(converter, Some(ConverterKind::Bool)),
            Value::Int(_) => matches!(converter, Some(ConverterKind::Int | ConverterKind::Double)),
            Value::Double(_) => matches!(converter, Some(ConverterKind::Double)),
            Value::Enum(n) => matches!(converter, Some(ConverterKind::Enum(members)) if members.contains(n)),
            Value::Color(_) => matches!(converter, Some(ConverterKind::Color)),
            Value::Brush(_) => matches!(converter, Some(ConverterKind::Brush)),
            Value::Thickness(_) => matches!(converter, Some(ConverterKind::Thickness)),
            Value::GridLength(_) => matches!(converter, Some(ConverterKind::GridLength)),
            Value::Point(..) => matches!(converter, Some(ConverterKind::Point)),
            Value::Type(_) => matches!(converter, Some(ConverterKind::Type)),
        }
    }

    /// Create a default-constructed instance, or `None` when `ty` cannot be
    /// constructed without arguments.
    pub fn construct(&self, ty: TypeKey, store: &mut InstanceStore) -> Option<InstanceId> {
        let info = self.info(ty);
        (info.constructible && info.has_default_constructor()).then(|| store.create(ty))
    }

    /// XML namespace for `ty`: a registered mapping, or a `clr-namespace:` URI.
    pub fn xml_namespace_of(&self, ty: TypeKey) -> String {
        let info = self.info(ty);
        self.mappings
            .iter()
            .find(|m| m.clr_namespace == info.clr_namespace && m.assembly == info.assembly)
            .map(|m| m.xml_namespace.clone())
            .unwrap_or_else(|| crate::type_finder::clr_namespace_uri(&info.clr_namespace, Some(&info.assembly)))
    }

    pub fn preferred_prefix(&self, xml_namespace: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.xml_namespace == xml_namespace)
            .and_then(|m| m.preferred_prefix.as_deref())
    }
}

/// Fluent type definition; call `finish` to register.
pub struct TypeBuilder<'r> {
    registry: &'r mut TypeRegistry,
    info: TypeInfo,
}

impl TypeBuilder<'_> {
    pub fn base(mut self, base: TypeKey) -> Self {
        self.info.base = Some(base);
        self
    }

    pub fn converter(mut self, converter: ConverterKind) -> Self {
        self.info.converter = Some(converter);
        self
    }

    pub fn collection(mut self, kind: CollectionKind) -> Self {
        self.info.collection = Some(kind);
        self
    }

    pub fn content(mut self, property: &str) -> Self {
        self.info.content_property = Some(Name::intern(property));
        self
    }

    pub fn name_property(mut self, property: &str) -> Self {
        self.info.name_property = Some(Name::intern(property));
        self
    }

    pub fn markup_extension(mut self) -> Self {
        self.info.markup_extension = true;
        self
    }

    /// Add a constructor with the given parameter names.
    pub fn constructor(mut self, params: &[&str]) -> Self {
        self.info.constructors.push(params.iter().map(|p| Name::intern(p)).collect());
        self
    }

    /// Drop the implicit default constructor.
    pub fn no_default_constructor(mut self) -> Self {
        self.info.constructors.retain(|c| !c.is_empty());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.info.constructible = false;
        self
    }

    /// Value types are built from text, never default-constructed.
    pub fn value_type(mut self) -> Self {
        self.info.value_type = true;
        self.info.constructible = false;
        self
    }

    pub fn name_scope(mut self) -> Self {
        self.info.name_scope = true;
        self
    }

    pub fn property(self, name: &str, value_type: TypeKey, default: Value) -> Self {
        self.member(name, value_type, default, false, true)
    }

    pub fn read_only(self, name: &str, value_type: TypeKey) -> Self {
        self.member(name, value_type, Value::Null, true, true)
    }

    /// A computed member whose reset is rejected.
    pub fn computed(self, name: &str, value_type: TypeKey, default: Value) -> Self {
        self.member(name, value_type, default, true, false)
    }

    fn member(mut self, name: &str, value_type: TypeKey, default: Value, read_only: bool, resettable: bool) -> Self {
        self.info.properties.push(PropertySchema {
            name: Name::intern(name),
            value_type,
            default,
            read_only,
            resettable,
        });
        self
    }

    pub fn event(mut self, name: &str) -> Self {
        self.info.events.push(Name::intern(name));
        self
    }

    pub fn finish(self) -> TypeKey {
        let key = self.info.key;
        self.registry
            .by_name
            .insert((self.info.clr_namespace.clone(), self.info.name), key);
        self.registry.types.push(self.info);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_are_inherited() {
        let mut reg = TypeRegistry::new();
        let object = reg.define("System", "mscorlib", "Object").finish();
        let double = reg
            .define("System", "mscorlib", "Double")
            .base(object)
            .converter(ConverterKind::Double)
            .value_type()
            .finish();
        let base = reg
            .define("Demo", "Demo", "Base")
            .base(object)
            .property("Width", double, Value::Double(f64::NAN))
            .content("Width")
            .finish();
        let derived = reg.define("Demo", "Demo", "Derived").base(base).finish();

        let (owner, prop) = reg.find_property(derived, "Width").unwrap();
        assert_eq!(owner, base);
        assert_eq!(prop.value_type, double);
        assert_eq!(reg.content_property(derived), Some(Name::intern("Width")));
        assert!(reg.is_assignable(base, derived));
        assert!(!reg.is_assignable(derived, base));
        assert!(reg.find_property_ignore_case(derived, "width").is_some());
    }

    #[test]
    fn value_fitting() {
        let mut reg = TypeRegistry::new();
        let object = reg.define("System", "mscorlib", "Object").finish();
        let double = reg
            .define("System", "mscorlib", "Double")
            .base(object)
            .converter(ConverterKind::Double)
            .value_type()
            .finish();
        let store = InstanceStore::new();
        assert!(reg.value_fits(&Value::Double(1.0), double, &store));
        assert!(reg.value_fits(&Value::Int(1), double, &store));
        assert!(!reg.value_fits(&Value::Null, double, &store));
        assert!(!reg.value_fits(&Value::Bool(true), double, &store));
        assert!(reg.value_fits(&Value::Bool(true), object, &store));
    }
}
