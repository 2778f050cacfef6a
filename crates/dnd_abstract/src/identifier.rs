//! Entity identity.
//!
//! A [`UniqueIdentifier`] is the public, mutable identifier callers choose
//! for an entity. An [`EntityKey`] is the internal instance key the manager
//! hands out once per constructed entity; it never changes, so the registry
//! can tell instances apart while their identifiers move.

use serde::{Deserialize, Serialize};

/// Caller-chosen identifier of an entity: a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniqueIdentifier {
    Number(i64),
    String(String),
}

impl UniqueIdentifier {
    /// A fresh random string identifier (UUID v4).
    #[must_use]
    pub fn random() -> Self {
        Self::String(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for UniqueIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for UniqueIdentifier {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for UniqueIdentifier {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for UniqueIdentifier {
                fn from(value: $ty) -> Self {
                    Self::Number(i64::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

/// Internal key of one entity instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(pub u64);

impl EntityKey {
    /// The null key; never handed out by a [`KeyAllocator`].
    pub const INVALID: EntityKey = EntityKey(0);

    /// Returns `true` if this is a valid (non-zero) key.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityKey({})", self.0)
    }
}

/// Allocates monotonically increasing entity keys.
#[derive(Debug)]
pub struct KeyAllocator {
    next: std::cell::Cell<u64>,
}

impl KeyAllocator {
    /// Creates a new allocator. Keys start at 1 (0 is [`EntityKey::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: std::cell::Cell::new(1),
        }
    }

    /// Allocates a fresh key.
    pub fn allocate(&self) -> EntityKey {
        let key = self.next.get();
        self.next.set(key + 1);
        EntityKey(key)
    }

    /// Returns the number of keys allocated so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.next.get() - 1
    }
}

impl Default for KeyAllocator {
    fn default() -> Self {
        Self::new()
    }
}
