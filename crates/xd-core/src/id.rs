use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global interner for type, property, and enum member names.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// An interned identifier (`Canvas`, `Left`, `Canvas.Left`, `Stretch`, ...).
/// Internally a `Spur` index: 4 bytes, Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(Spur);

impl Name {
    /// Intern a string, or return the existing handle.
    pub fn intern(s: &str) -> Self {
        Name(INTERNER.get_or_intern(s))
    }

    /// Look up a string without interning it.
    pub fn get(s: &str) -> Option<Self> {
        INTERNER.get(s).map(Name)
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// `Owner.Member`, the storage key used for attached members.
    pub fn qualified(owner: &str, member: &str) -> Self {
        Self::intern(&format!("{owner}.{member}"))
    }

    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(other)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Name::intern(&s))
    }
}

/// Arena handles. Each wraps a dense `u32` index into the owning arena.
macro_rules! arena_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }
    )*};
}

arena_handle! {
    /// A `XamlObject` in a document's object arena.
    ObjectId,
    /// A `XamlProperty` in a document's property arena.
    PropertyId,
    /// A `XamlTextValue` in a document's text arena.
    TextId,
    /// A live instance in an `InstanceStore`.
    InstanceId,
    /// A registered type in a `TypeRegistry`.
    TypeKey,
    /// A node in an `XmlTree`.
    XmlNodeId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_roundtrip() {
        let a = Name::intern("Canvas.Left");
        let b = Name::qualified("Canvas", "Left");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Canvas.Left");
        assert!(a.eq_ignore_case("canvas.left"));
    }

    #[test]
    fn lookup_does_not_intern() {
        assert!(Name::get("__never_interned_member__").is_none());
        let n = Name::intern("Width");
        assert_eq!(Name::get("Width"), Some(n));
    }
}
