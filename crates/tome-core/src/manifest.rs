// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-collection configuration document (`manifest.json`).
//!
//! Every mutator persists immediately. A manifest built for a collection that
//! does not exist on disk yet starts *suppressed*: saves are skipped until
//! [`Manifest::commit`] so the whole configuration lands in one first write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document;
use crate::error::{Result, StoreError};
use crate::meta::{MetaRule, MetaValue};

/// File name of the manifest inside a collection directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Columns every listing shows, whatever the viewer config says.
pub const FIXED_COLUMNS: [&str; 2] = ["id", "name"];

/// Which level of the hierarchy a collection lives at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Top-level collection.
    Table,
    /// Collection nested one level under a table.
    Module,
}

/// Options shared by every collection type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonOptions {
    /// Fill id gaps when allocating.
    #[serde(default)]
    pub recycle_id: bool,
    /// Notes carry an attachment store.
    #[serde(default)]
    pub attachments: bool,
    /// Declared slots (name → description). `None` disables slotted attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<BTreeMap<String, String>>,
    /// Allow attachments that occupy no slot.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unslotted: bool,
}

/// Declaration of a module nested in a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDecl {
    /// Module (and directory) name.
    pub name: String,
    /// Type tag of the module's notes.
    #[serde(rename = "type")]
    pub type_tag: String,
}

/// Serialized body of a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestData {
    /// Table or module.
    pub object: ObjectKind,
    /// Schema type tag, resolved against the type registry.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Id and attachment options.
    #[serde(default)]
    pub common: CommonOptions,
    /// Validation rules for metainfo fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metainfo_rules: BTreeMap<String, MetaRule>,
    /// Modules declared by a table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleDecl>,
    /// Display configuration; persisted verbatim.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub viewer: Value,
    /// Free-form payload; persisted verbatim.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub custom: Value,
}

impl ManifestData {
    /// Fresh manifest body with default options.
    pub fn new(object: ObjectKind, type_tag: impl Into<String>) -> Self {
        Self {
            object,
            type_tag: type_tag.into(),
            common: CommonOptions::default(),
            metainfo_rules: BTreeMap::new(),
            modules: Vec::new(),
            viewer: Value::Null,
            custom: Value::Null,
        }
    }
}

/// A manifest bound to its location on disk.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    data: ManifestData,
    suppressed: bool,
}

impl Manifest {
    /// Load the manifest of the collection at `dir`.
    ///
    /// A missing manifest means there is no collection at `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let data = document::load::<ManifestData>(&path)?
            .ok_or_else(|| StoreError::CollectionNotFound(dir.to_path_buf()))?;
        Ok(Self {
            path,
            data,
            suppressed: false,
        })
    }

    /// In-memory manifest for a collection about to be created at `dir`.
    /// Saves are suppressed until [`Manifest::commit`].
    pub fn draft(dir: &Path, object: ObjectKind, type_tag: impl Into<String>) -> Self {
        Self {
            path: dir.join(MANIFEST_FILE),
            data: ManifestData::new(object, type_tag),
            suppressed: true,
        }
    }

    /// Persist the manifest. A no-op while suppressed.
    pub fn save(&self) -> Result<()> {
        if self.suppressed {
            return Ok(());
        }
        document::save(&self.path, &self.data)
    }

    /// Lift suppression and write the manifest for the first time.
    pub fn commit(&mut self) -> Result<()> {
        self.suppressed = false;
        self.save()
    }

    /// Whether saves are currently suppressed.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Path of the manifest document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn relocate(&mut self, dir: &Path) {
        self.path = dir.join(MANIFEST_FILE);
    }

    /// Raw manifest body.
    pub fn data(&self) -> &ManifestData {
        &self.data
    }

    /// Table or module.
    pub fn object(&self) -> ObjectKind {
        self.data.object
    }

    /// Schema type tag.
    pub fn type_tag(&self) -> &str {
        &self.data.type_tag
    }

    // ── common options ──────────────────────────────────────────────

    /// Common options.
    pub fn common(&self) -> &CommonOptions {
        &self.data.common
    }

    /// Replace the whole common option group.
    pub fn set_common(&mut self, common: CommonOptions) -> Result<()> {
        self.data.common = common;
        self.save()
    }

    /// Whether id allocation fills gaps.
    pub fn recycle_id(&self) -> bool {
        self.data.common.recycle_id
    }

    /// Toggle id recycling.
    pub fn set_recycle_id(&mut self, on: bool) -> Result<()> {
        self.data.common.recycle_id = on;
        self.save()
    }

    /// Whether notes carry attachments.
    pub fn attachments_enabled(&self) -> bool {
        self.data.common.attachments
    }

    /// Toggle attachments.
    pub fn set_attachments_enabled(&mut self, on: bool) -> Result<()> {
        self.data.common.attachments = on;
        self.save()
    }

    /// Declared slots, if slotted attachments are enabled.
    pub fn slots(&self) -> Option<&BTreeMap<String, String>> {
        self.data.common.slots.as_ref()
    }

    /// Declare (or redescribe) a slot, enabling slotted attachments.
    pub fn declare_slot(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<()> {
        self.data
            .common
            .slots
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), description.into());
        self.save()
    }

    /// Remove a slot declaration. Notes keep files already attached to it.
    pub fn remove_slot(&mut self, name: &str) -> Result<bool> {
        let removed = self
            .data
            .common
            .slots
            .as_mut()
            .is_some_and(|slots| slots.remove(name).is_some());
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Whether attachments without a slot are allowed.
    pub fn unslotted_allowed(&self) -> bool {
        self.data.common.unslotted
    }

    /// Toggle slot-less attachments.
    pub fn set_unslotted_allowed(&mut self, on: bool) -> Result<()> {
        self.data.common.unslotted = on;
        self.save()
    }

    // ── metainfo rules ──────────────────────────────────────────────

    /// All metainfo rules.
    pub fn metainfo_rules(&self) -> &BTreeMap<String, MetaRule> {
        &self.data.metainfo_rules
    }

    /// Set the rule for `field`.
    pub fn set_meta_rule(&mut self, field: impl Into<String>, rule: MetaRule) -> Result<()> {
        self.data.metainfo_rules.insert(field.into(), rule);
        self.save()
    }

    /// Drop the rule for `field`.
    pub fn remove_meta_rule(&mut self, field: &str) -> Result<bool> {
        let removed = self.data.metainfo_rules.remove(field).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Check `value` against the rule declared for `field`. Fields without a
    /// rule accept anything. Existing notes are never re-checked.
    pub fn validate_meta(&self, field: &str, value: &MetaValue) -> Result<()> {
        match self.data.metainfo_rules.get(field) {
            Some(rule) if !rule.admits(value) => Err(StoreError::RuleViolation {
                field: field.to_string(),
                value: value.to_string(),
            }),
            _ => Ok(()),
        }
    }

    // ── module declarations ─────────────────────────────────────────

    /// Declared modules, in declaration order.
    pub fn modules(&self) -> &[ModuleDecl] {
        &self.data.modules
    }

    /// Declaration for module `name`.
    pub fn module(&self, name: &str) -> Option<&ModuleDecl> {
        self.data.modules.iter().find(|m| m.name == name)
    }

    /// Append a module declaration.
    pub fn declare_module(&mut self, decl: ModuleDecl) -> Result<()> {
        if self.module(&decl.name).is_some() {
            return Err(StoreError::AlreadyExists(decl.name));
        }
        self.data.modules.push(decl);
        self.save()
    }

    /// Remove the declaration for `name`.
    pub fn remove_module(&mut self, name: &str) -> Result<bool> {
        let before = self.data.modules.len();
        self.data.modules.retain(|m| m.name != name);
        let removed = self.data.modules.len() != before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Rename a declaration in place, keeping its position.
    pub fn rename_module(&mut self, old: &str, new: &str) -> Result<()> {
        if self.module(new).is_some() {
            return Err(StoreError::AlreadyExists(new.to_string()));
        }
        let decl = self
            .data
            .modules
            .iter_mut()
            .find(|m| m.name == old)
            .ok_or_else(|| StoreError::CollectionNotFound(PathBuf::from(old)))?;
        decl.name = new.to_string();
        self.save()
    }

    // ── opaque payloads ─────────────────────────────────────────────

    /// Viewer configuration.
    pub fn viewer(&self) -> &Value {
        &self.data.viewer
    }

    /// Replace the viewer configuration.
    pub fn set_viewer(&mut self, viewer: Value) -> Result<()> {
        self.data.viewer = viewer;
        self.save()
    }

    /// Custom payload.
    pub fn custom(&self) -> &Value {
        &self.data.custom
    }

    /// Replace the custom payload.
    pub fn set_custom(&mut self, custom: Value) -> Result<()> {
        self.data.custom = custom;
        self.save()
    }

    /// Columns a listing should show: `id` and `name` first, then whatever
    /// string entries `viewer.columns` lists.
    pub fn visible_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = FIXED_COLUMNS.iter().map(ToString::to_string).collect();
        let extra = self
            .data
            .viewer
            .get("columns")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        for col in extra {
            if !columns.iter().any(|c| c == col) {
                columns.push(col.to_string());
            }
        }
        columns
    }
}
