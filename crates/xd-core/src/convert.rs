//! Text ↔ value converters attached to types.

use crate::error::ConversionError;
use crate::id::{Name, TypeKey};
use crate::value::{Color, GridLength, Thickness, Value, format_number, split_numbers};
use smallvec::SmallVec;

/// Resolves `prefix:Type` references while converting (`x:Type`,
/// `TargetType`).
pub trait ConversionContext {
    fn resolve_type(&self, qualified_name: &str) -> Option<TypeKey>;
    fn type_name(&self, ty: TypeKey) -> Option<String>;
}

/// Context for conversions that never reference types.
pub struct NoTypes;

impl ConversionContext for NoTypes {
    fn resolve_type(&self, _qualified_name: &str) -> Option<TypeKey> {
        None
    }

    fn type_name(&self, _ty: TypeKey) -> Option<String> {
        None
    }
}

/// How a type converts from and to attribute text.
#[derive(Debug, Clone, PartialEq)]
pub enum ConverterKind {
    String,
    /// Any text is accepted and kept as a string (`Object`-typed members).
    Object,
    Bool,
    Int,
    /// Doubles accept `Auto` as NaN, the layout "unset" marker.
    Double,
    Enum(SmallVec<[Name; 8]>),
    Color,
    Brush,
    Thickness,
    GridLength,
    Point,
    Type,
}

impl ConverterKind {
    pub fn enumeration(members: &[&str]) -> Self {
        ConverterKind::Enum(members.iter().map(|m| Name::intern(m)).collect())
    }

    pub fn convert_from(
        &self,
        text: &str,
        target: &str,
        ctx: &dyn ConversionContext,
    ) -> Result<Value, ConversionError> {
        let fail = || ConversionError::new(text, target);
        let trimmed = text.trim();
        match self {
            ConverterKind::String | ConverterKind::Object => Ok(Value::String(text.to_string())),
            ConverterKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            ConverterKind::Int => trimmed.parse().map(Value::Int).map_err(|_| fail()),
            ConverterKind::Double => {
                if trimmed.eq_ignore_ascii_case("auto") {
                    return Ok(Value::Double(f64::NAN));
                }
                trimmed.parse().map(Value::Double).map_err(|_| fail())
            }
            ConverterKind::Enum(members) => members
                .iter()
                .find(|m| m.eq_ignore_case(trimmed))
                .map(|m| Value::Enum(*m))
                .ok_or_else(fail),
            ConverterKind::Color => Color::parse(trimmed).map(Value::Color).ok_or_else(fail),
            ConverterKind::Brush => Color::parse(trimmed).map(Value::Brush).ok_or_else(fail),
            ConverterKind::Thickness => Thickness::parse(trimmed).map(Value::Thickness).ok_or_else(fail),
            ConverterKind::GridLength => GridLength::parse(trimmed).map(Value::GridLength).ok_or_else(fail),
            ConverterKind::Point => match split_numbers(trimmed).as_deref() {
                Some([x, y]) => Ok(Value::Point(*x, *y)),
                _ => Err(fail()),
            },
            ConverterKind::Type => ctx.resolve_type(trimmed).map(Value::Type).ok_or_else(fail),
        }
    }

    /// Text form of `value`, or `None` when this converter cannot print it.
    pub fn convert_to_string(&self, value: &Value, ctx: &dyn ConversionContext) -> Option<String> {
        match (self, value) {
            (ConverterKind::String | ConverterKind::Object, Value::String(s)) => Some(s.clone()),
            (ConverterKind::Bool, Value::Bool(_))
            | (ConverterKind::Int, Value::Int(_))
            | (ConverterKind::Double, Value::Double(_))
            | (ConverterKind::Color, Value::Color(_))
            | (ConverterKind::Brush, Value::Brush(_))
            | (ConverterKind::Thickness, Value::Thickness(_))
            | (ConverterKind::GridLength, Value::GridLength(_))
            | (ConverterKind::Point, Value::Point(..)) => Some(value.to_string()),
            (ConverterKind::Double, Value::Int(v)) => Some(format_number(*v as f64)),
            (ConverterKind::Enum(members), Value::Enum(n)) if members.contains(n) => Some(n.to_string()),
            (ConverterKind::Type, Value::Type(t)) => ctx.type_name(*t),
            (ConverterKind::Object, v) => match v {
                Value::Instance(_) | Value::Type(_) | Value::Null => None,
                other => Some(other.to_string()),
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitive_conversions() {
        let ctx = NoTypes;
        assert_eq!(
            ConverterKind::Double.convert_from(" 12.5 ", "Double", &ctx),
            Ok(Value::Double(12.5))
        );
        assert!(matches!(
            ConverterKind::Double.convert_from("Auto", "Double", &ctx),
            Ok(Value::Double(v)) if v.is_nan()
        ));
        assert_eq!(
            ConverterKind::Bool.convert_from("True", "Boolean", &ctx),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            ConverterKind::Int.convert_from("x", "Int32", &ctx),
            Err(ConversionError::new("x", "Int32"))
        );
    }

    #[test]
    fn enum_is_case_insensitive() {
        let ctx = NoTypes;
        let conv = ConverterKind::enumeration(&["Left", "Center", "Right", "Stretch"]);
        assert_eq!(
            conv.convert_from("center", "HorizontalAlignment", &ctx),
            Ok(Value::Enum(Name::intern("Center")))
        );
        assert_eq!(
            conv.convert_to_string(&Value::Enum(Name::intern("Right")), &ctx),
            Some("Right".to_string())
        );
    }

    #[test]
    fn printing_rejects_mismatched_values() {
        let ctx = NoTypes;
        assert_eq!(ConverterKind::Bool.convert_to_string(&Value::Int(1), &ctx), None);
        assert_eq!(
            ConverterKind::Double.convert_to_string(&Value::Double(f64::NAN), &ctx),
            Some("Auto".to_string())
        );
    }
}
