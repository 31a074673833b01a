//! Object names.
//!
//! Fabric objects carry an optional `name` attribute, and the editor uses
//! it as the object's identity: selection, commands and history all refer
//! to objects by name. Names are interned once per process so an
//! [`ObjectId`] is `Copy` and compares as an integer.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static NAMES: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Suffix source for generated names; never reused within a process.
static NEXT_SUFFIX: AtomicU64 = AtomicU64::new(1);

/// The `name` of a scene object.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Spur);

impl ObjectId {
    pub fn intern(name: &str) -> Self {
        ObjectId(NAMES.get_or_intern(name))
    }

    pub fn as_str(&self) -> &str {
        NAMES.resolve(&self.0)
    }

    /// Fabric writes `""` for objects nobody named. Such names identify
    /// nothing and are replaced on import.
    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }

    /// A generated name for a new object of the given kind, e.g. `star_12`.
    ///
    /// Imported documents may already use the same name; use
    /// [`SceneDocument::fresh_id`](crate::model::SceneDocument::fresh_id)
    /// when the name must be free in a particular scene.
    pub fn numbered(kind: &str) -> Self {
        let n = NEXT_SUFFIX.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{kind}_{n}"))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectId").field(&self.as_str()).finish()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ObjectId::intern(&name))
    }
}
