pub mod builtin;
pub mod changes;
pub mod convert;
pub mod document;
mod edit;
pub mod error;
pub mod id;
pub mod instance;
mod journal;
pub mod markup;
pub mod names;
pub mod object;
pub mod parser;
pub mod property;
pub mod schema;
pub mod settings;
pub mod type_finder;
pub mod value;
pub mod xml;

pub use changes::{ChangeLog, CollectionAction, DocumentChange, SubscriptionId};
pub use document::{XamlDocument, default_registry};
pub use error::{ConversionError, LoadErrorKind, MarkupExtensionParseError, XamlError, XamlLoadError};
pub use id::{InstanceId, Name, ObjectId, PropertyId, TextId, TypeKey, XmlNodeId};
pub use instance::{Instance, InstanceStore};
pub use journal::UndoAction;
pub use markup::{ExtensionHandler, ExtensionRegistry};
pub use object::{XamlObject, XamlProperty, XamlTextValue, XamlValue};
pub use property::{PropertyKind, XamlPropertyInfo};
pub use schema::TypeRegistry;
pub use settings::{XamlErrorSink, XamlParserSettings};
pub use type_finder::XamlTypeFinder;
pub use value::{Color, GridLength, GridUnit, Thickness, Value};
