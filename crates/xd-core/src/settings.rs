//! Load options.

use crate::error::XamlLoadError;
use crate::markup::ExtensionRegistry;
use crate::schema::TypeRegistry;
use std::sync::Arc;

/// Receives recoverable load errors. With a sink configured the parser
/// keeps going past them and marks the affected objects.
pub trait XamlErrorSink {
    fn report(&mut self, error: &XamlLoadError);
}

impl XamlErrorSink for Vec<XamlLoadError> {
    fn report(&mut self, error: &XamlLoadError) {
        self.push(error.clone());
    }
}

#[derive(Default)]
pub struct XamlParserSettings<'s> {
    /// Types to load against; the built-in registry when `None`.
    pub registry: Option<Arc<TypeRegistry>>,
    pub extensions: Option<ExtensionRegistry>,
    pub error_sink: Option<&'s mut dyn XamlErrorSink>,
}

impl<'s> XamlParserSettings<'s> {
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_error_sink(mut self, sink: &'s mut dyn XamlErrorSink) -> Self {
        self.error_sink = Some(sink);
        self
    }
}
