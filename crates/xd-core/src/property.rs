//! Member descriptors: one shape for normal, attached, event, and
//! collection-item members.

use crate::error::XamlError;
use crate::id::{InstanceId, Name, TypeKey};
use crate::instance::InstanceStore;
use crate::schema::{PropertySchema, TypeRegistry};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Normal,
    /// `Owner.Member`, stored on the target under the qualified key.
    Attached,
    /// Handler names; they carry no live value.
    Event,
    /// Items of an object that is itself a collection.
    Items,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XamlPropertyInfo {
    kind: PropertyKind,
    /// Declaring type (the owner, for attached members).
    owner: TypeKey,
    name: Name,
    storage_key: Name,
    return_type: TypeKey,
    default: Value,
    read_only: bool,
    resettable: bool,
    is_collection: bool,
}

impl XamlPropertyInfo {
    pub fn normal(registry: &TypeRegistry, owner: TypeKey, schema: &PropertySchema) -> Self {
        Self {
            kind: PropertyKind::Normal,
            owner,
            name: schema.name,
            storage_key: schema.name,
            return_type: schema.value_type,
            default: schema.default.clone(),
            read_only: schema.read_only,
            resettable: schema.resettable,
            is_collection: registry.collection_kind(schema.value_type).is_some(),
        }
    }

    pub fn attached(registry: &TypeRegistry, owner: TypeKey, schema: &PropertySchema) -> Self {
        Self {
            kind: PropertyKind::Attached,
            storage_key: Name::qualified(registry.type_name(owner), schema.name.as_str()),
            ..Self::normal(registry, owner, schema)
        }
    }

    pub fn event(registry: &TypeRegistry, owner: TypeKey, name: &str) -> Self {
        let name = Name::intern(name);
        let string = registry.find("System", "String").unwrap_or(owner);
        Self {
            kind: PropertyKind::Event,
            owner,
            name,
            storage_key: name,
            return_type: string,
            default: Value::Null,
            read_only: false,
            resettable: true,
            is_collection: false,
        }
    }

    /// Pseudo-member for the items of a collection-typed object that has
    /// no content property.
    pub fn items(collection_type: TypeKey) -> Self {
        let name = Name::intern("_Items");
        Self {
            kind: PropertyKind::Items,
            owner: collection_type,
            name,
            storage_key: name,
            return_type: collection_type,
            default: Value::Null,
            read_only: true,
            resettable: true,
            is_collection: true,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn name_key(&self) -> Name {
        self.name
    }

    /// `Canvas.Left` for attached members, the plain name otherwise.
    pub fn full_name(&self) -> &str {
        self.storage_key.as_str()
    }

    pub fn storage_key(&self) -> Name {
        self.storage_key
    }

    pub fn owner(&self) -> TypeKey {
        self.owner
    }

    pub fn return_type(&self) -> TypeKey {
        self.return_type
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn is_attached(&self) -> bool {
        self.kind == PropertyKind::Attached
    }

    pub fn is_event(&self) -> bool {
        self.kind == PropertyKind::Event
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Same member, regardless of which object it is read from.
    pub fn same_member(&self, other: &XamlPropertyInfo) -> bool {
        self.kind == other.kind && self.owner == other.owner && self.name == other.name
    }

    /// Current value on `instance`, falling back to the member default.
    pub fn get_value(&self, store: &InstanceStore, instance: InstanceId) -> Result<Value, XamlError> {
        match self.kind {
            PropertyKind::Event => Err(XamlError::EventValue(self.name.to_string())),
            PropertyKind::Items => Ok(Value::Instance(instance)),
            PropertyKind::Normal | PropertyKind::Attached => Ok(store
                .value(instance, self.storage_key)
                .cloned()
                .unwrap_or_else(|| self.default.clone())),
        }
    }

    pub fn set_value(
        &self,
        registry: &TypeRegistry,
        store: &mut InstanceStore,
        instance: InstanceId,
        value: Value,
    ) -> Result<(), XamlError> {
        if self.read_only || self.kind == PropertyKind::Items {
            return Err(XamlError::ReadOnly(self.full_name().to_string()));
        }
        let value = match (value, self.kind) {
            (Value::String(handler), PropertyKind::Event) => Value::String(handler),
            (value, PropertyKind::Event) => {
                return Err(XamlError::Conversion(crate::error::ConversionError::new(
                    value.to_string(),
                    "event handler",
                )));
            }
            (Value::Int(v), _) if registry.value_fits(&Value::Double(v as f64), self.return_type, store) => {
                Value::Double(v as f64)
            }
            (value, _) => value,
        };
        if self.kind != PropertyKind::Event && !registry.value_fits(&value, self.return_type, store) {
            return Err(XamlError::Conversion(crate::error::ConversionError::new(
                value.to_string(),
                registry.type_name(self.return_type),
            )));
        }
        store.set_value(instance, self.storage_key, value);
        Ok(())
    }

    /// Clear the local value. Computed members reject this.
    pub fn reset_value(&self, store: &mut InstanceStore, instance: InstanceId) -> Result<(), XamlError> {
        if !self.resettable {
            return Err(XamlError::NotResettable(self.full_name().to_string()));
        }
        if self.kind == PropertyKind::Items {
            store.clear(instance);
        } else {
            store.clear_value(instance, self.storage_key);
        }
        Ok(())
    }

    /// The live collection behind a collection member, created on first use.
    pub fn ensure_collection(
        &self,
        registry: &TypeRegistry,
        store: &mut InstanceStore,
        instance: InstanceId,
    ) -> Result<InstanceId, XamlError> {
        if self.kind == PropertyKind::Items {
            return Ok(instance);
        }
        if let Some(Value::Instance(existing)) = store.value(instance, self.storage_key) {
            return Ok(*existing);
        }
        if registry.collection_kind(self.return_type).is_none() {
            return Err(XamlError::NotACollection(self.full_name().to_string()));
        }
        let collection = store.create(self.return_type);
        store.set_value(instance, self.storage_key, Value::Instance(collection));
        Ok(collection)
    }
}
