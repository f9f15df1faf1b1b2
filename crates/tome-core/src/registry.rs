// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type registry: maps a manifest type tag to the constructors of its schema.
//!
//! Domain schemas do not subclass notes or collections. A schema is a pair of
//! plain functions: one seeds the extra payload fields of a fresh note, the
//! other seeds the manifest of a fresh collection. The tag is resolved once,
//! when a collection is created or opened.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::manifest::Manifest;

/// Schema-specific top-level fields of a note document.
pub type Payload = BTreeMap<String, Value>;

/// Tag of the built-in schema with no extra fields.
pub const BASE_TYPE: &str = "base";

/// Constructor pair registered under a type tag.
#[derive(Clone, Copy)]
pub struct Schema {
    /// Type tag stored in manifests.
    pub tag: &'static str,
    /// Default payload for a new note.
    pub new_note_of: fn() -> Payload,
    /// Seeds the (still suppressed) manifest of a new collection.
    pub new_collection_of: fn(&mut Manifest) -> Result<()>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("tag", &self.tag).finish_non_exhaustive()
    }
}

impl Schema {
    /// The `base` schema: no payload, default manifest.
    pub const BASE: Self = Self {
        tag: BASE_TYPE,
        new_note_of: Payload::new,
        new_collection_of: keep_defaults,
    };
}

fn keep_defaults(_: &mut Manifest) -> Result<()> {
    Ok(())
}

/// Tag → schema lookup table.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    schemas: BTreeMap<&'static str, Schema>,
}

impl TypeRegistry {
    /// Registry with no schemas at all.
    pub fn empty() -> Self {
        Self {
            schemas: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in schemas.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.schemas.insert(BASE_TYPE, Schema::BASE);
        registry
    }

    /// Add a schema. Tags must be unique.
    pub fn register(&mut self, schema: Schema) -> Result<()> {
        if self.schemas.contains_key(schema.tag) {
            return Err(StoreError::AlreadyExists(schema.tag.to_string()));
        }
        self.schemas.insert(schema.tag, schema);
        Ok(())
    }

    /// Look up the schema for `tag`.
    pub fn resolve(&self, tag: &str) -> Result<Schema> {
        self.schemas
            .get(tag)
            .copied()
            .ok_or_else(|| StoreError::UnknownType(tag.to_string()))
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schemas.keys().copied()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
