//! Hierarchical entity keys and their canonical byte form.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one path element: a string name or an integer id.
///
/// Integer ids order before names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyId {
    /// Numeric id.
    Id(i64),
    /// String name.
    Name(String),
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Id(id) => write!(f, "{id}"),
            KeyId::Name(name) => write!(f, "{name:?}"),
        }
    }
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        KeyId::Id(id)
    }
}

impl From<i32> for KeyId {
    fn from(id: i32) -> Self {
        KeyId::Id(i64::from(id))
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        KeyId::Name(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        KeyId::Name(name)
    }
}

/// One `(kind, identifier)` segment of a key path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathElement {
    /// Kind name of the entity at this level.
    pub kind: String,
    /// Identifier within the kind.
    pub id: KeyId,
}

impl PathElement {
    /// Creates a path element.
    pub fn new(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// A hierarchical entity key.
///
/// Ancestry is implicit in segment order: the last element names the
/// entity itself, earlier elements its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Key {
    /// Partition namespace; `None` is the default namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Path from the root ancestor down to the entity.
    pub path: Vec<PathElement>,
}

impl Key {
    /// Creates a root key identified by name.
    pub fn name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_path(vec![PathElement::new(kind, KeyId::Name(name.into()))])
    }

    /// Creates a root key identified by a numeric id.
    pub fn id(kind: impl Into<String>, id: i64) -> Self {
        Self::from_path(vec![PathElement::new(kind, KeyId::Id(id))])
    }

    /// Creates a key from an explicit path.
    #[must_use]
    pub fn from_path(path: Vec<PathElement>) -> Self {
        Self {
            namespace: None,
            path,
        }
    }

    /// Returns a copy of this key with the given namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Returns a child key of this key.
    #[must_use]
    pub fn child(&self, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        let mut path = self.path.clone();
        path.push(PathElement::new(kind, id));
        Self {
            namespace: self.namespace.clone(),
            path,
        }
    }

    /// Returns the parent key, if this key has ancestors.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            namespace: self.namespace.clone(),
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    /// Returns the kind of the final path element.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.path.last().map(|e| e.kind.as_str())
    }

    /// Serializes the key to its canonical byte form.
    ///
    /// The encoding is CBOR of the full key (namespace and every path
    /// element), so distinct keys never share bytes and a key always
    /// produces the same bytes.
    pub fn to_bytes(&self) -> CoreResult<KeyBytes> {
        let mut buf = Vec::with_capacity(16 * (self.path.len() + 1));
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| CoreError::codec(format!("failed to encode key {self}: {e:?}")))?;
        Ok(KeyBytes(buf))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}:")?;
        }
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}({})", element.kind, element.id)?;
        }
        Ok(())
    }
}

/// Canonical serialized form of a [`Key`], used as the store's map key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyBytes(Vec<u8>);

impl KeyBytes {
    /// Returns the raw bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the encoded length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no bytes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyBytes(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        f.write_str(")")
    }
}

impl AsRef<[u8]> for KeyBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
