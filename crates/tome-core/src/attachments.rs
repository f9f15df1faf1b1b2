// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Files attached to a note.
//!
//! Files live in `<collection>/.attachments/<id>/` under their original file
//! names. Each manifest-declared slot holds at most one file; slot-less files
//! go to the `other` list. Either category exists only when the manifest opts
//! into it. The directory is created on the first attach and removed again
//! when its last file goes away.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind as IoKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document;
use crate::error::{Result, StoreError};
use crate::ids::NoteId;
use crate::manifest::Manifest;

/// Directory (inside a collection) holding every note's attachment directory.
pub const ATTACHMENTS_DIR: &str = ".attachments";

/// Attachment directory of note `id` in the collection at `collection_dir`.
pub fn attachment_dir(collection_dir: &Path, id: NoteId) -> PathBuf {
    collection_dir.join(ATTACHMENTS_DIR).join(id.to_string())
}

/// Attachment bookkeeping stored in the note document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
    /// Slot name → attached file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<BTreeMap<String, Option<String>>>,
    /// Files attached without a slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<Vec<String>>,
}

impl Attachments {
    /// Empty store shaped by the manifest's declared categories.
    pub fn for_manifest(manifest: &Manifest) -> Self {
        Self {
            slots: manifest
                .slots()
                .map(|declared| declared.keys().map(|k| (k.clone(), None)).collect()),
            other: manifest.unslotted_allowed().then(Vec::new),
        }
    }

    /// Whether `slot` currently holds a file.
    pub fn slot_occupied(&self, slot: &str) -> bool {
        self.slot_file(slot).is_some()
    }

    /// File held by `slot`, if any.
    pub fn slot_file(&self, slot: &str) -> Option<&str> {
        self.slots
            .as_ref()
            .and_then(|slots| slots.get(slot))
            .and_then(Option::as_deref)
    }

    /// Every attached file name: slot files first (by slot), then others.
    pub fn files(&self) -> Vec<&str> {
        let slotted = self
            .slots
            .iter()
            .flat_map(BTreeMap::values)
            .filter_map(Option::as_deref);
        let other = self.other.iter().flatten().map(String::as_str);
        slotted.chain(other).collect()
    }

    /// Whether `file_name` is attached in any category.
    pub fn contains(&self, file_name: &str) -> bool {
        self.files().contains(&file_name)
    }

    /// `true` when nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }

    /// Copy `source` into `dir` and record it under `slot` (or as a slot-less
    /// file). Returns the stored file name.
    pub(crate) fn attach(
        &mut self,
        dir: &Path,
        manifest: &Manifest,
        source: &Path,
        slot: Option<&str>,
        overwrite: bool,
    ) -> Result<String> {
        if !manifest.attachments_enabled() {
            return Err(StoreError::CapabilityDenied(
                "attachments are disabled for this collection".into(),
            ));
        }
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::InvalidName(source.display().to_string()))?
            .to_string();
        match slot {
            Some(slot) => {
                let declared = manifest.slots().ok_or_else(|| {
                    StoreError::CapabilityDenied("slotted attachments are disabled".into())
                })?;
                if !declared.contains_key(slot) {
                    return Err(StoreError::CapabilityDenied(format!(
                        "slot `{slot}` is not declared"
                    )));
                }
                if self.slot_occupied(slot) && !overwrite {
                    return Err(StoreError::SlotOccupied(slot.to_string()));
                }
            }
            None if !manifest.unslotted_allowed() => {
                return Err(StoreError::CapabilityDenied(
                    "attachments without a slot are disabled".into(),
                ));
            }
            None => {}
        }
        let target = dir.join(&file_name);
        let collides = self.contains(&file_name) || target.exists();
        if collides && !overwrite {
            return Err(StoreError::AlreadyExists(file_name));
        }
        if !source.is_file() {
            return Err(StoreError::io(
                source,
                std::io::Error::new(IoKind::NotFound, "attachment source is not a file"),
            ));
        }

        if collides {
            self.forget(&file_name);
            remove_file(&target)?;
        }
        if let Some(slot) = slot {
            if let Some(previous) = self.slot_file(slot).map(str::to_string) {
                self.forget(&previous);
                remove_file(&dir.join(previous))?;
            }
        }

        fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;
        fs::copy(source, &target).map_err(|err| StoreError::io(source, err))?;
        match slot {
            Some(slot) => {
                self.slots
                    .get_or_insert_with(BTreeMap::new)
                    .insert(slot.to_string(), Some(file_name.clone()));
            }
            None => self.other.get_or_insert_with(Vec::new).push(file_name.clone()),
        }
        debug!(file = %file_name, slot = slot.unwrap_or("-"), "attached");
        Ok(file_name)
    }

    /// Detach and delete `file_name`.
    pub(crate) fn unattach(&mut self, dir: &Path, file_name: &str) -> Result<()> {
        if !self.forget(file_name) {
            return Err(StoreError::AttachmentNotFound(file_name.to_string()));
        }
        remove_file(&dir.join(file_name))?;
        document::remove_dir_if_empty(dir)?;
        debug!(file = %file_name, "unattached");
        Ok(())
    }

    /// Empty `slot`, deleting its file. Returns the removed file name.
    pub(crate) fn clear_slot(&mut self, dir: &Path, slot: &str) -> Result<Option<String>> {
        let held = self
            .slots
            .as_mut()
            .and_then(|slots| slots.get_mut(slot))
            .ok_or_else(|| StoreError::SlotNotFound(slot.to_string()))?
            .take();
        if let Some(file) = &held {
            remove_file(&dir.join(file))?;
            document::remove_dir_if_empty(dir)?;
        }
        Ok(held)
    }

    /// Add keys for slots declared after this note was created.
    pub(crate) fn sync_slots(&mut self, manifest: &Manifest) {
        if let Some(declared) = manifest.slots() {
            let slots = self.slots.get_or_insert_with(BTreeMap::new);
            for name in declared.keys() {
                slots.entry(name.clone()).or_insert(None);
            }
        }
        if manifest.unslotted_allowed() && self.other.is_none() {
            self.other = Some(Vec::new());
        }
    }

    /// Drop `file_name` from whichever category holds it.
    fn forget(&mut self, file_name: &str) -> bool {
        if let Some(slots) = self.slots.as_mut() {
            if let Some(held) = slots
                .values_mut()
                .find(|held| held.as_deref() == Some(file_name))
            {
                *held = None;
                return true;
            }
        }
        if let Some(other) = self.other.as_mut() {
            if let Some(pos) = other.iter().position(|f| f == file_name) {
                other.remove(pos);
                return true;
            }
        }
        false
    }
}

fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == IoKind::NotFound => Ok(()),
        Err(err) => Err(StoreError::io(path, err)),
    }
}
