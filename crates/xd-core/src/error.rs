//! Error types shared by the parser, the object model, and converters.

use thiserror::Error;

/// Category of a document load failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    Xml,
    UnknownType,
    UnknownProperty,
    DuplicateProperty,
    UnresolvableAttachedProperty,
    InvalidContent,
    DuplicateName,
    Conversion,
    MarkupExtension,
    NotConstructible,
}

/// A positioned load error. Reported to an error sink when one is
/// configured, otherwise returned from the parse call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct XamlLoadError {
    pub kind: LoadErrorKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl XamlLoadError {
    pub fn new(kind: LoadErrorKind, message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column,
        }
    }

    /// Fatal errors abort the load even when an error sink is configured.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, LoadErrorKind::DuplicateProperty | LoadErrorKind::Xml)
    }
}

/// Malformed markup-extension text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} in markup extension `{fragment}`")]
pub struct MarkupExtensionParseError {
    pub message: String,
    pub fragment: String,
}

impl MarkupExtensionParseError {
    pub fn new(message: impl Into<String>, fragment: &str) -> Self {
        Self {
            message: message.into(),
            fragment: fragment.to_string(),
        }
    }
}

/// A text value that the target type's converter rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert `{value}` to {target}")]
pub struct ConversionError {
    pub value: String,
    pub target: String,
}

impl ConversionError {
    pub fn new(value: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target: target.into(),
        }
    }
}

/// Errors raised by object-model edits.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XamlError {
    #[error("value already belongs to a property; remove it first")]
    ValueAlreadyParented,
    #[error("value does not belong to any property")]
    NotParented,
    #[error("property `{0}` is not a collection")]
    NotACollection(String),
    #[error("property `{0}` is a collection; use the collection operations")]
    IsACollection(String),
    #[error("index {index} is out of range for a collection of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("name `{0}` is already used in this name scope")]
    DuplicateName(String),
    #[error("type `{0}` is not known")]
    UnknownType(String),
    #[error("type `{owner}` has no member `{member}`")]
    UnknownProperty { owner: String, member: String },
    #[error("type `{0}` cannot be constructed")]
    NotConstructible(String),
    #[error("property `{0}` is read-only")]
    ReadOnly(String),
    #[error("property `{0}` cannot be reset")]
    NotResettable(String),
    #[error("event `{0}` has no value")]
    EventValue(String),
    #[error("resource `{0}` was not found")]
    ResourceNotFound(String),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    MarkupExtension(#[from] MarkupExtensionParseError),
}
