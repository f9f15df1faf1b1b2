// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Notes: one JSON document per id.
//!
//! The id is the document's file stem and is never written inside it. The
//! document holds the optional name, the metainfo map (kept sorted by key),
//! attachment bookkeeping when the collection enables attachments, and any
//! schema payload fields flattened at the top level.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::attachments::{attachment_dir, Attachments};
use crate::document;
use crate::error::{Result, StoreError};
use crate::ids::NoteId;
use crate::manifest::Manifest;
use crate::meta::MetaValue;
use crate::registry::Payload;

/// Top-level keys owned by the base document; payload fields may not use them.
pub const RESERVED_FIELDS: [&str; 3] = ["name", "metainfo", "attachments"];

/// Serialized body of a note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteDoc {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Metainfo, sorted by key.
    #[serde(default)]
    pub metainfo: BTreeMap<String, MetaValue>,
    /// Attachment bookkeeping, present when attachments are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
    /// Schema payload fields.
    #[serde(flatten)]
    pub payload: Payload,
}

/// A note loaded from its collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    id: NoteId,
    doc: NoteDoc,
}

impl Note {
    pub(crate) fn new(id: NoteId, doc: NoteDoc) -> Self {
        Self { id, doc }
    }

    pub(crate) fn load(collection_dir: &Path, id: NoteId) -> Result<Self> {
        let path = collection_dir.join(id.file_name());
        let doc = document::load::<NoteDoc>(&path)?.unwrap_or_default();
        Ok(Self { id, doc })
    }

    pub(crate) fn save(&self, collection_dir: &Path) -> Result<()> {
        document::save(&self.document_path(collection_dir), &self.doc)
    }

    pub(crate) fn set_id(&mut self, id: NoteId) {
        self.id = id;
    }

    /// Location of this note's document inside `collection_dir`.
    pub fn document_path(&self, collection_dir: &Path) -> PathBuf {
        collection_dir.join(self.id.file_name())
    }

    /// Identifier within the owning collection.
    pub fn id(&self) -> NoteId {
        self.id
    }

    /// Display name, if set.
    pub fn name(&self) -> Option<&str> {
        self.doc.name.as_deref()
    }

    /// Whole metainfo map.
    pub fn metainfo(&self) -> &BTreeMap<String, MetaValue> {
        &self.doc.metainfo
    }

    /// One metainfo value.
    pub fn meta(&self, key: &str) -> Option<&MetaValue> {
        self.doc.metainfo.get(key)
    }

    /// Attachment bookkeeping, if the collection enables attachments.
    pub fn attachments(&self) -> Option<&Attachments> {
        self.doc.attachments.as_ref()
    }

    /// Schema payload fields.
    pub fn payload(&self) -> &Payload {
        &self.doc.payload
    }

    /// One payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.doc.payload.get(key)
    }

    /// Raw document body.
    pub fn doc(&self) -> &NoteDoc {
        &self.doc
    }

    /// Case-insensitive substring match over the name and text metainfo.
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        let hit = |s: &str| s.to_lowercase().contains(needle);
        self.name().is_some_and(hit)
            || self
                .doc
                .metainfo
                .values()
                .filter_map(MetaValue::as_text)
                .any(hit)
    }
}

/// Mutable view of one note, borrowed from its collection.
///
/// Every mutator validates first, then updates the note and rewrites its
/// document before returning.
#[derive(Debug)]
pub struct NoteMut<'a> {
    pub(crate) dir: PathBuf,
    pub(crate) manifest: &'a Manifest,
    pub(crate) note: &'a mut Note,
}

impl NoteMut<'_> {
    /// Read-only view of the note.
    pub fn note(&self) -> &Note {
        self.note
    }

    /// Identifier of the note.
    pub fn id(&self) -> NoteId {
        self.note.id
    }

    fn persist(&self) -> Result<()> {
        self.note.save(&self.dir)?;
        debug!(id = %self.note.id, "note saved");
        Ok(())
    }

    /// Set or clear the display name.
    pub fn set_name(&mut self, name: Option<String>) -> Result<()> {
        self.note.doc.name = name;
        self.persist()
    }

    /// Set a metainfo value after checking the manifest's rules.
    pub fn set_meta(&mut self, key: impl Into<String>, value: MetaValue) -> Result<()> {
        let key = key.into();
        self.manifest.validate_meta(&key, &value)?;
        self.note.doc.metainfo.insert(key, value);
        self.persist()
    }

    /// Drop a metainfo value. Returns the previous value.
    pub fn remove_meta(&mut self, key: &str) -> Result<Option<MetaValue>> {
        let removed = self.note.doc.metainfo.remove(key);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Set a schema payload field.
    pub fn set_field(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        if RESERVED_FIELDS.contains(&key.as_str()) {
            return Err(StoreError::InvalidName(key));
        }
        self.note.doc.payload.insert(key, value);
        self.persist()
    }

    /// Drop a schema payload field. Returns the previous value.
    pub fn remove_field(&mut self, key: &str) -> Result<Option<Value>> {
        let removed = self.note.doc.payload.remove(key);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Directory holding this note's attachments.
    pub fn attachment_dir(&self) -> PathBuf {
        attachment_dir(&self.dir, self.note.id)
    }

    fn attachments_mut(&mut self) -> Result<&mut Attachments> {
        if !self.manifest.attachments_enabled() {
            return Err(StoreError::CapabilityDenied(
                "attachments are disabled for this collection".into(),
            ));
        }
        let manifest = self.manifest;
        let attachments = self
            .note
            .doc
            .attachments
            .get_or_insert_with(|| Attachments::for_manifest(manifest));
        attachments.sync_slots(manifest);
        Ok(attachments)
    }

    /// Copy `source` into the note's attachment directory, into `slot` or
    /// as a slot-less file. Returns the stored file name.
    pub fn attach(&mut self, source: &Path, slot: Option<&str>, overwrite: bool) -> Result<String> {
        let dir = self.attachment_dir();
        let manifest = self.manifest;
        let stored = self.attachments_mut()?.attach(&dir, manifest, source, slot, overwrite)?;
        self.persist()?;
        Ok(stored)
    }

    /// Detach `file_name` and delete the file. Works even after the manifest
    /// has turned attachments off.
    pub fn unattach(&mut self, file_name: &str) -> Result<()> {
        let dir = self.attachment_dir();
        self.note
            .doc
            .attachments
            .as_mut()
            .ok_or_else(|| StoreError::AttachmentNotFound(file_name.to_string()))?
            .unattach(&dir, file_name)?;
        self.persist()
    }

    /// Empty `slot`. Returns the file that was removed, if any. Like
    /// [`NoteMut::unattach`], this ignores the manifest's current options.
    pub fn clear_slot(&mut self, slot: &str) -> Result<Option<String>> {
        let dir = self.attachment_dir();
        let removed = self
            .note
            .doc
            .attachments
            .as_mut()
            .ok_or_else(|| StoreError::SlotNotFound(slot.to_string()))?
            .clear_slot(&dir, slot)?;
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Whether `slot` holds a file.
    pub fn slot_occupied(&self, slot: &str) -> bool {
        self.note
            .attachments()
            .is_some_and(|a| a.slot_occupied(slot))
    }

    /// Absolute path of an attached file.
    pub fn attachment_path(&self, file_name: &str) -> Option<PathBuf> {
        self.note
            .attachments()
            .filter(|a| a.contains(file_name))
            .map(|_| self.attachment_dir().join(file_name))
    }
}
