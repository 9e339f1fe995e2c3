use std::any::TypeId;
use std::fmt;

/// Identity of a requested abstraction, usually a trait object such as `dyn Database`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AbstractionId {
    type_id: TypeId,
    type_name: &'static str,
}

impl AbstractionId {
    /// Identity of `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully-qualified type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for AbstractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Registry key derived from an abstraction and an optional qualifying consumer
///
/// The key is the hex BLAKE3 digest of `"<abstraction>#<qualifier>"`. Type names
/// never contain `#`, so the material of two different pairs never coincides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey(String);

impl BindingKey {
    const SEPARATOR: &'static [u8] = b"#";

    pub fn new(abstraction: &AbstractionId, qualifier: Option<&AbstractionId>) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(abstraction.type_name().as_bytes());
        hasher.update(Self::SEPARATOR);
        if let Some(qualifier) = qualifier {
            hasher.update(qualifier.type_name().as_bytes());
        }
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    /// Key of an unqualified binding
    pub fn unqualified(abstraction: &AbstractionId) -> Self {
        Self::new(abstraction, None)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
