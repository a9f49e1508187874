//! Maps `(xml namespace, local name)` to registered types.

use crate::id::TypeKey;
use crate::schema::TypeRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use winnow::combinator::{opt, preceded};
use winnow::prelude::*;
use winnow::token::{rest, take_till};

/// A CLR namespace, optionally qualified by an assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClrNamespace {
    pub namespace: String,
    pub assembly: Option<String>,
}

fn parse_clr_uri(input: &mut &str) -> ModalResult<ClrNamespace> {
    "clr-namespace:".parse_next(input)?;
    let namespace = take_till(0.., ';').parse_next(input)?;
    let assembly = opt(preceded((';', "assembly="), rest)).parse_next(input)?;
    Ok(ClrNamespace {
        namespace: namespace.trim().to_string(),
        assembly: assembly
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
    })
}

/// Parse `clr-namespace:Ns[;assembly=Asm]`. Returns `None` for any other URI.
pub fn parse_clr_namespace(uri: &str) -> Option<ClrNamespace> {
    parse_clr_uri.parse(uri).ok()
}

pub fn clr_namespace_uri(namespace: &str, assembly: Option<&str>) -> String {
    match assembly {
        Some(asm) => format!("clr-namespace:{namespace};assembly={asm}"),
        None => format!("clr-namespace:{namespace}"),
    }
}

#[derive(Debug, Clone)]
pub struct XamlTypeFinder {
    registry: Arc<TypeRegistry>,
    namespaces: HashMap<String, Vec<ClrNamespace>>,
}

impl XamlTypeFinder {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        let mut namespaces: HashMap<String, Vec<ClrNamespace>> = HashMap::new();
        for m in registry.mappings() {
            namespaces.entry(m.xml_namespace.clone()).or_default().push(ClrNamespace {
                namespace: m.clr_namespace.clone(),
                assembly: Some(m.assembly.clone()),
            });
        }
        Self { registry, namespaces }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Record a `clr-namespace:` URI met while loading. Returns `false`
    /// for URIs of any other form.
    pub fn register_clr_namespace(&mut self, uri: &str) -> bool {
        if self.namespaces.contains_key(uri) {
            return true;
        }
        match parse_clr_namespace(uri) {
            Some(clr) => {
                log::debug!("registered {uri} -> {}", clr.namespace);
                self.namespaces.insert(uri.to_string(), vec![clr]);
                true
            }
            None => false,
        }
    }

    pub fn is_known_namespace(&self, xml_namespace: &str) -> bool {
        self.namespaces.contains_key(xml_namespace) || parse_clr_namespace(xml_namespace).is_some()
    }

    /// Resolve an element or extension name. `Foo` also matches a markup
    /// extension registered as `FooExtension`.
    pub fn resolve(&self, xml_namespace: &str, local_name: &str) -> Option<TypeKey> {
        let parsed;
        let candidates: &[ClrNamespace] = match self.namespaces.get(xml_namespace) {
            Some(list) => list,
            None => {
                parsed = parse_clr_namespace(xml_namespace)?;
                std::slice::from_ref(&parsed)
            }
        };
        let lookup = |name: &str| {
            candidates.iter().find_map(|clr| {
                let ty = self.registry.find(&clr.namespace, name)?;
                let info = self.registry.info(ty);
                let assembly_ok = clr.assembly.as_deref().is_none_or(|a| a == info.assembly);
                assembly_ok.then_some(ty)
            })
        };
        lookup(local_name).or_else(|| {
            lookup(&format!("{local_name}Extension")).filter(|&t| self.registry.is_markup_extension(t))
        })
    }

    /// XML namespace under which `ty` is written.
    pub fn xml_namespace_for(&self, ty: TypeKey) -> String {
        self.registry.xml_namespace_of(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{PRESENTATION_NS, XAML_NS, wpf_registry};
    use pretty_assertions::assert_eq;

    #[test]
    fn clr_namespace_forms() {
        assert_eq!(
            parse_clr_namespace("clr-namespace:Demo.Controls;assembly=Demo"),
            Some(ClrNamespace {
                namespace: "Demo.Controls".into(),
                assembly: Some("Demo".into()),
            })
        );
        assert_eq!(
            parse_clr_namespace("clr-namespace:Local"),
            Some(ClrNamespace {
                namespace: "Local".into(),
                assembly: None,
            })
        );
        assert_eq!(parse_clr_namespace("http://example.com"), None);
        assert_eq!(
            clr_namespace_uri("Demo.Controls", Some("Demo")),
            "clr-namespace:Demo.Controls;assembly=Demo"
        );
    }

    #[test]
    fn resolves_presentation_and_extension_names() {
        let finder = XamlTypeFinder::new(Arc::new(wpf_registry()));
        let reg = finder.registry().clone();
        let button = finder.resolve(PRESENTATION_NS, "Button").unwrap();
        assert_eq!(reg.type_name(button), "Button");
        let sr = finder.resolve(PRESENTATION_NS, "StaticResource").unwrap();
        assert_eq!(reg.type_name(sr), "StaticResourceExtension");
        let null = finder.resolve(XAML_NS, "Null").unwrap();
        assert_eq!(reg.type_name(null), "NullExtension");
        assert!(finder.resolve(PRESENTATION_NS, "Nope").is_none());
        assert!(finder.resolve("urn:unknown", "Button").is_none());
    }

    #[test]
    fn clr_namespace_uris_resolve_directly() {
        let finder = XamlTypeFinder::new(Arc::new(wpf_registry()));
        let uri = "clr-namespace:System;assembly=mscorlib";
        let string = finder.resolve(uri, "String").unwrap();
        assert_eq!(finder.registry().type_name(string), "String");
        assert!(finder.resolve("clr-namespace:System;assembly=Other", "String").is_none());
    }
}
