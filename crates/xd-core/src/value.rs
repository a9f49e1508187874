//! Live property values held by instances.

use crate::id::{InstanceId, Name, TypeKey};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Colors ──────────────────────────────────────────────────────────────

/// ARGB color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

const NAMED_COLORS: &[(&str, u32)] = &[
    ("Transparent", 0x00FF_FFFF),
    ("Black", 0xFF00_0000),
    ("White", 0xFFFF_FFFF),
    ("Red", 0xFFFF_0000),
    ("Green", 0xFF00_8000),
    ("Lime", 0xFF00_FF00),
    ("Blue", 0xFF00_00FF),
    ("Yellow", 0xFFFF_FF00),
    ("Orange", 0xFFFF_A500),
    ("Purple", 0xFF80_0080),
    ("Gray", 0xFF80_8080),
    ("LightGray", 0xFFD3_D3D3),
    ("DarkGray", 0xFFA9_A9A9),
    ("Silver", 0xFFC0_C0C0),
    ("Navy", 0xFF00_0080),
    ("Teal", 0xFF00_8080),
    ("Maroon", 0xFF80_0000),
    ("CornflowerBlue", 0xFF64_95ED),
    ("SteelBlue", 0xFF46_82B4),
    ("WhiteSmoke", 0xFFF5_F5F5),
];

impl Color {
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    const fn from_u32(v: u32) -> Self {
        Self::argb((v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    /// Parse `#RGB`, `#ARGB`, `#RRGGBB`, `#AARRGGBB`, or a named color.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text.strip_prefix('#') {
            Some(hex) => Self::from_hex(hex),
            None => NAMED_COLORS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(text))
                .map(|&(_, v)| Self::from_u32(v)),
        }
    }

    fn from_hex(hex: &str) -> Option<Self> {
        let bytes = hex.as_bytes();
        let nibble = |i: usize| hex_val(bytes[i]);
        let byte = |i: usize| Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?);
        match bytes.len() {
            3 => Some(Self::argb(255, nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17)),
            4 => Some(Self::argb(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
                nibble(3)? * 17,
            )),
            6 => Some(Self::argb(255, byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::argb(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// `#AARRGGBB`, the form the XAML color converter emits.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
    }
}

// ─── Thickness ───────────────────────────────────────────────────────────

/// Four-sided spacing (`Margin`, `Padding`, `BorderThickness`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Thickness {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Thickness {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(v: f64) -> Self {
        Self::new(v, v, v, v)
    }

    /// `"4"`, `"4,2"` (horizontal, vertical), or `"l,t,r,b"`.
    pub fn parse(text: &str) -> Option<Self> {
        let parts = split_numbers(text)?;
        match parts.as_slice() {
            [v] => Some(Self::uniform(*v)),
            [h, v] => Some(Self::new(*h, *v, *h, *v)),
            [l, t, r, b] => Some(Self::new(*l, *t, *r, *b)),
            _ => None,
        }
    }
}

impl fmt::Display for Thickness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.left == self.top && self.top == self.right && self.right == self.bottom {
            return f.write_str(&format_number(self.left));
        }
        write!(
            f,
            "{},{},{},{}",
            format_number(self.left),
            format_number(self.top),
            format_number(self.right),
            format_number(self.bottom)
        )
    }
}

// ─── Grid lengths ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridUnit {
    Auto,
    Pixel,
    Star,
}

/// A row height or column width: `Auto`, `120`, `*`, `2*`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLength {
    pub value: f64,
    pub unit: GridUnit,
}

impl GridLength {
    pub const AUTO: Self = Self {
        value: 1.0,
        unit: GridUnit::Auto,
    };

    pub const fn pixels(value: f64) -> Self {
        Self {
            value,
            unit: GridUnit::Pixel,
        }
    }

    pub const fn star(value: f64) -> Self {
        Self {
            value,
            unit: GridUnit::Star,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("auto") {
            return Some(Self::AUTO);
        }
        if let Some(weight) = text.strip_suffix('*') {
            if weight.is_empty() {
                return Some(Self::star(1.0));
            }
            return weight.trim().parse().ok().map(Self::star);
        }
        text.strip_suffix("px")
            .unwrap_or(text)
            .trim()
            .parse()
            .ok()
            .map(Self::pixels)
    }
}

impl fmt::Display for GridLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            GridUnit::Auto => f.write_str("Auto"),
            GridUnit::Pixel => f.write_str(&format_number(self.value)),
            GridUnit::Star if self.value == 1.0 => f.write_str("*"),
            GridUnit::Star => write!(f, "{}*", format_number(self.value)),
        }
    }
}

// ─── Value ───────────────────────────────────────────────────────────────

/// A property value on a live instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    /// An enum member; the owning enum type is the property's type.
    Enum(Name),
    Color(Color),
    /// A solid-color brush produced by the brush converter.
    Brush(Color),
    Thickness(Thickness),
    GridLength(GridLength),
    Point(f64, f64),
    Type(TypeKey),
    Instance(InstanceId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Double(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<InstanceId> {
        match self {
            Value::Instance(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<Name> {
        match self {
            Value::Enum(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_thickness(&self) -> Option<Thickness> {
        match self {
            Value::Thickness(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("{x:Null}"),
            Value::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            Value::Int(v) => write!(f, "{v}"),
            Value::Double(v) if v.is_nan() => f.write_str("Auto"),
            Value::Double(v) => f.write_str(&format_number(*v)),
            Value::String(s) => f.write_str(s),
            Value::Enum(n) => f.write_str(n.as_str()),
            Value::Color(c) | Value::Brush(c) => f.write_str(&c.to_hex()),
            Value::Thickness(t) => write!(f, "{t}"),
            Value::GridLength(g) => write!(f, "{g}"),
            Value::Point(x, y) => write!(f, "{},{}", format_number(*x), format_number(*y)),
            Value::Type(t) => write!(f, "type#{}", t.index()),
            Value::Instance(i) => write!(f, "instance#{}", i.index()),
        }
    }
}

/// Format a number for XAML output: integers without a decimal point,
/// everything else with at most four decimals.
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n:.4}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Split a comma- or space-separated list of numbers.
pub(crate) fn split_numbers(text: &str) -> Option<Vec<f64>> {
    text.split([',', ' '])
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<f64>().ok())
        .collect()
}
