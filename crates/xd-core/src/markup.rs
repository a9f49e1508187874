//! Markup-extension text: `{Binding Path=Name, Mode=TwoWay}`.
//!
//! `tokenize` splits the text, `parse_markup_extension` builds an AST, and
//! `ExtensionRegistry` holds the per-type hooks used to evaluate an
//! extension and to print it back to attribute form.

use crate::document::XamlDocument;
use crate::error::{MarkupExtensionParseError, XamlError};
use crate::id::{Name, ObjectId, TypeKey};
use crate::property::XamlPropertyInfo;
use crate::schema::TypeRegistry;
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupToken {
    OpenBrace,
    TypeName(String),
    MemberName(String),
    String(String),
    Comma,
    Equals,
    CloseBrace,
}

/// Split markup-extension text into tokens. Nested extensions are returned
/// as a single `String` token that starts with `{`.
pub fn tokenize(text: &str) -> Result<Vec<MarkupToken>, MarkupExtensionParseError> {
    let err = |message: &str| MarkupExtensionParseError::new(message, text);
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut tokens = Vec::new();

    let skip_ws = |pos: &mut usize| {
        while *pos < chars.len() && chars[*pos].is_whitespace() {
            *pos += 1;
        }
    };

    skip_ws(&mut pos);
    if chars.get(pos) != Some(&'{') {
        return Err(err("expected `{`"));
    }
    pos += 1;
    tokens.push(MarkupToken::OpenBrace);

    skip_ws(&mut pos);
    let start = pos;
    while pos < chars.len() && !chars[pos].is_whitespace() && chars[pos] != '}' && chars[pos] != ',' {
        pos += 1;
    }
    if pos == start {
        return Err(err("missing extension type name"));
    }
    tokens.push(MarkupToken::TypeName(chars[start..pos].iter().collect()));

    loop {
        skip_ws(&mut pos);
        let Some(&c) = chars.get(pos) else {
            return Err(err("missing `}`"));
        };
        match c {
            '}' => {
                pos += 1;
                tokens.push(MarkupToken::CloseBrace);
                skip_ws(&mut pos);
                if pos != chars.len() {
                    return Err(err("unexpected text after `}`"));
                }
                return Ok(tokens);
            }
            ',' => {
                pos += 1;
                tokens.push(MarkupToken::Comma);
            }
            '=' => {
                pos += 1;
                tokens.push(MarkupToken::Equals);
            }
            '\'' | '"' => {
                let quote = c;
                pos += 1;
                let mut value = String::new();
                loop {
                    match chars.get(pos) {
                        None => return Err(err("unterminated quoted string")),
                        Some('\\') => {
                            let Some(&escaped) = chars.get(pos + 1) else {
                                return Err(err("dangling escape"));
                            };
                            value.push(escaped);
                            pos += 2;
                        }
                        Some(&q) if q == quote => {
                            pos += 1;
                            break;
                        }
                        Some(&other) => {
                            value.push(other);
                            pos += 1;
                        }
                    }
                }
                tokens.push(MarkupToken::String(value));
            }
            _ => {
                let mut value = String::new();
                let mut depth = 0usize;
                while let Some(&ch) = chars.get(pos) {
                    match ch {
                        '\\' => {
                            let Some(&escaped) = chars.get(pos + 1) else {
                                return Err(err("dangling escape"));
                            };
                            if depth > 0 {
                                value.push('\\');
                            }
                            value.push(escaped);
                            pos += 2;
                            continue;
                        }
                        '{' => depth += 1,
                        '}' if depth == 0 => break,
                        '}' => depth -= 1,
                        ',' | '=' if depth == 0 => break,
                        _ => {}
                    }
                    value.push(ch);
                    pos += 1;
                }
                if depth > 0 {
                    return Err(err("unbalanced `{` in argument"));
                }
                let value = value.trim_end().to_string();
                let mut look = pos;
                skip_ws(&mut look);
                if chars.get(look) == Some(&'=') {
                    tokens.push(MarkupToken::MemberName(value));
                } else {
                    tokens.push(MarkupToken::String(value));
                }
            }
        }
    }
}

/// An argument: literal text or a nested extension.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupArg {
    Text(String),
    Extension(MarkupExtensionAst),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupExtensionAst {
    /// Possibly prefixed (`x:Type`).
    pub type_name: String,
    pub positional: Vec<MarkupArg>,
    pub named: Vec<(String, MarkupArg)>,
}

/// Whether attribute text is a markup extension rather than a literal.
/// `{}` escapes a literal that starts with a brace.
pub fn is_markup_extension_text(text: &str) -> bool {
    text.starts_with('{') && !text.starts_with("{}")
}

/// Strip the `{}` literal escape.
pub fn unescape_literal(text: &str) -> &str {
    text.strip_prefix("{}").unwrap_or(text)
}

/// Escape a literal so it is not read back as a markup extension.
pub fn escape_literal(text: &str) -> String {
    if text.starts_with('{') {
        format!("{{}}{text}")
    } else {
        text.to_string()
    }
}

pub fn parse_markup_extension(text: &str) -> Result<MarkupExtensionAst, MarkupExtensionParseError> {
    let tokens = tokenize(text)?;
    let err = |message: &str| MarkupExtensionParseError::new(message, text);
    let mut iter = tokens.into_iter().peekable();

    if iter.next() != Some(MarkupToken::OpenBrace) {
        return Err(err("expected `{`"));
    }
    let Some(MarkupToken::TypeName(type_name)) = iter.next() else {
        return Err(err("missing extension type name"));
    };

    let mut ast = MarkupExtensionAst {
        type_name,
        positional: Vec::new(),
        named: Vec::new(),
    };
    let mut expect_separator = false;

    while let Some(token) = iter.next() {
        match token {
            MarkupToken::CloseBrace => return Ok(ast),
            MarkupToken::Comma if expect_separator => expect_separator = false,
            MarkupToken::Comma => return Err(err("unexpected `,`")),
            _ if expect_separator => return Err(err("expected `,` between arguments")),
            MarkupToken::String(value) => {
                if !ast.named.is_empty() {
                    return Err(err("positional argument after named argument"));
                }
                ast.positional.push(parse_arg(&value, text)?);
                expect_separator = true;
            }
            MarkupToken::MemberName(member) => {
                if iter.next() != Some(MarkupToken::Equals) {
                    return Err(err("expected `=` after member name"));
                }
                let value = match iter.peek() {
                    Some(MarkupToken::String(_)) => match iter.next() {
                        Some(MarkupToken::String(v)) => v,
                        _ => String::new(),
                    },
                    // `Member=` followed by `,` or `}` is an empty value.
                    _ => String::new(),
                };
                ast.named.push((member, parse_arg(&value, text)?));
                expect_separator = true;
            }
            MarkupToken::Equals => return Err(err("unexpected `=`")),
            MarkupToken::OpenBrace | MarkupToken::TypeName(_) => return Err(err("unexpected token")),
        }
    }
    Err(err("missing `}`"))
}

fn parse_arg(value: &str, whole: &str) -> Result<MarkupArg, MarkupExtensionParseError> {
    if is_markup_extension_text(value) {
        parse_markup_extension(value)
            .map(MarkupArg::Extension)
            .map_err(|e| MarkupExtensionParseError::new(e.message, whole))
    } else {
        Ok(MarkupArg::Text(unescape_literal(value).to_string()))
    }
}

/// Quote an argument when it would not survive tokenizing unquoted.
pub fn quote_arg(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains(['{', '}', ',', '=', '\'', '"', '\\']);
    if !needs_quotes {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

// ─── Extension registry ──────────────────────────────────────────────────

/// Produces the value an extension supplies to the member `target` of the
/// object that owns it.
pub type EvaluateFn = fn(&XamlDocument, ObjectId, &XamlPropertyInfo) -> Result<Value, XamlError>;

/// Per-type markup-extension hooks.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionHandler {
    /// Member written as the leading positional argument when printing
    /// (`{Binding Name}` rather than `{Binding Path=Name}`).
    pub positional: Option<Name>,
    pub evaluate: EvaluateFn,
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    handlers: HashMap<TypeKey, ExtensionHandler>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks for the extensions in `builtin::wpf_registry`.
    pub fn standard(registry: &TypeRegistry) -> Self {
        let mut ext = Self::new();
        let mut add = |ns: &str, name: &str, positional: Option<&str>, evaluate: EvaluateFn| {
            if let Some(ty) = registry.find(ns, name) {
                ext.register(
                    ty,
                    ExtensionHandler {
                        positional: positional.map(Name::intern),
                        evaluate,
                    },
                );
            }
        };
        add("System.Windows.Data", "Binding", Some("Path"), evaluate_binding);
        add(
            "System.Windows",
            "StaticResourceExtension",
            Some("ResourceKey"),
            evaluate_resource,
        );
        add(
            "System.Windows",
            "DynamicResourceExtension",
            Some("ResourceKey"),
            evaluate_dynamic_resource,
        );
        add("System.Windows.Markup", "NullExtension", None, |_, _, _| Ok(Value::Null));
        add("System.Windows.Markup", "TypeExtension", Some("TypeName"), evaluate_type);
        add("System.Windows.Markup", "StaticExtension", Some("Member"), |_, _, target| {
            Ok(target.default_value().clone())
        });
        ext
    }

    pub fn register(&mut self, ty: TypeKey, handler: ExtensionHandler) {
        self.handlers.insert(ty, handler);
    }

    /// Handler for `ty` or its nearest registered base.
    pub fn get(&self, registry: &TypeRegistry, ty: TypeKey) -> Option<&ExtensionHandler> {
        registry.ancestry(ty).find_map(|t| self.handlers.get(&t))
    }
}

/// No data context at design time: a binding shows its `FallbackValue`,
/// or the member default.
fn evaluate_binding(doc: &XamlDocument, ext: ObjectId, target: &XamlPropertyInfo) -> Result<Value, XamlError> {
    match doc.find_property(ext, "FallbackValue").and_then(|p| doc.property(p).value()) {
        Some(fallback) => doc.value_for(fallback, target, ext),
        None => Ok(target.default_value().clone()),
    }
}

fn resource_key(doc: &XamlDocument, ext: ObjectId) -> Option<String> {
    let prop = doc.find_property(ext, "ResourceKey")?;
    doc.value_text(prop).map(str::to_string)
}

fn evaluate_resource(doc: &XamlDocument, ext: ObjectId, _target: &XamlPropertyInfo) -> Result<Value, XamlError> {
    let key = resource_key(doc, ext).unwrap_or_default();
    doc.find_resource(ext, &key).ok_or(XamlError::ResourceNotFound(key))
}

/// Dynamic lookups that fail at design time leave the member unset.
fn evaluate_dynamic_resource(
    doc: &XamlDocument,
    ext: ObjectId,
    _target: &XamlPropertyInfo,
) -> Result<Value, XamlError> {
    let key = resource_key(doc, ext).unwrap_or_default();
    Ok(doc.find_resource(ext, &key).unwrap_or(Value::Null))
}

fn evaluate_type(doc: &XamlDocument, ext: ObjectId, _target: &XamlPropertyInfo) -> Result<Value, XamlError> {
    let name = doc
        .find_property(ext, "TypeName")
        .and_then(|p| doc.value_text(p))
        .unwrap_or_default()
        .to_string();
    doc.resolve_type_reference(ext, &name)
        .map(Value::Type)
        .ok_or(XamlError::UnknownType(name))
}
