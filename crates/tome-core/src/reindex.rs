// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Changing a note's id.
//!
//! Reindexing is built from single moves. A move renames the note document,
//! relocates its attachment directory and rewrites the note's id in the local
//! binder and, for modules, in the general binder, all before the next move
//! starts. Swap and insert park one note at [`NoteId::TRANSIENT`] while the
//! others shift.
//!
//! A failed move aborts the sequence. Moves already done are not rolled back.

use std::fmt;
use std::fs;
use std::str::FromStr;

use tracing::{debug, info, instrument};

use crate::attachments::{attachment_dir, ATTACHMENTS_DIR};
use crate::collection::Collection;
use crate::document;
use crate::error::{Result, StoreError};
use crate::ids::NoteId;

/// How `change_id` resolves an occupied target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeMode {
    /// Refuse with [`StoreError::TargetOccupied`].
    #[default]
    None,
    /// Delete the note at the target first.
    Overwrite,
    /// Exchange the two notes' ids.
    Swap,
    /// Shift the contiguous run starting at the target up by one.
    Insert,
}

impl fmt::Display for ChangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Overwrite => "overwrite",
            Self::Swap => "swap",
            Self::Insert => "insert",
        })
    }
}

impl FromStr for ChangeMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "overwrite" => Ok(Self::Overwrite),
            "swap" => Ok(Self::Swap),
            "insert" => Ok(Self::Insert),
            other => Err(StoreError::InvalidName(other.to_string())),
        }
    }
}

impl Collection {
    /// Give note `source` the id `target`.
    ///
    /// An unoccupied target is a plain move whatever the mode. An occupied
    /// target is resolved per `mode`.
    #[instrument(skip(self), fields(collection = self.name()))]
    pub fn change_id(&mut self, source: NoteId, target: NoteId, mode: ChangeMode) -> Result<()> {
        for id in [source, target] {
            if !id.is_positive() {
                return Err(StoreError::InvalidId(id));
            }
        }
        if !self.contains(source) {
            return Err(StoreError::NoteNotFound(source));
        }
        if source == target {
            return Ok(());
        }
        if !self.contains(target) {
            self.move_note(source, target)?;
            info!(%source, %target, "note id changed");
            return Ok(());
        }
        match mode {
            ChangeMode::None => return Err(StoreError::TargetOccupied(target)),
            ChangeMode::Overwrite => {
                self.delete_note(target)?;
                self.move_note(source, target)?;
            }
            ChangeMode::Swap => {
                self.move_note(target, NoteId::TRANSIENT)?;
                self.move_note(source, target)?;
                self.move_note(NoteId::TRANSIENT, source)?;
            }
            ChangeMode::Insert => {
                let shifts = self.shift_run(target, source)?;
                self.move_note(source, NoteId::TRANSIENT)?;
                for (from, to) in shifts.into_iter().rev() {
                    self.move_note(from, to)?;
                }
                self.move_note(NoteId::TRANSIENT, target)?;
            }
        }
        info!(%source, %target, %mode, "note id changed");
        Ok(())
    }

    /// `(id, id+1)` for `start, start+1, ...` while each id is held by a note
    /// other than `moving`. Fails before anything moves if the run would have
    /// to shift past `u32::MAX`.
    fn shift_run(&self, start: NoteId, moving: NoteId) -> Result<Vec<(NoteId, NoteId)>> {
        let mut run = Vec::new();
        let mut id = start;
        while id != moving && self.contains(id) {
            let next = id.succ().ok_or(StoreError::InvalidId(id))?;
            run.push((id, next));
            id = next;
        }
        Ok(run)
    }

    /// Move one note from `from` to the unoccupied id `to`.
    fn move_note(&mut self, from: NoteId, to: NoteId) -> Result<()> {
        if self.contains(to) {
            return Err(StoreError::TargetOccupied(to));
        }
        let dir = self.location.dir();
        let note = self.notes.get(&from).ok_or(StoreError::NoteNotFound(from))?;
        document::rename(&note.document_path(&dir), &dir.join(to.file_name()))?;

        let mut note = self
            .notes
            .remove(&from)
            .ok_or(StoreError::NoteNotFound(from))?;
        note.set_id(to);
        self.notes.insert(to, note);

        let attached = attachment_dir(&dir, from);
        if attached.is_dir() {
            let root = dir.join(ATTACHMENTS_DIR);
            fs::create_dir_all(&root).map_err(|err| StoreError::io(&root, err))?;
            document::rename(&attached, &attachment_dir(&dir, to))?;
        }

        self.binder.fix_id_change(from, to)?;
        if self.general_binds_path().is_some() {
            let module = self.name().to_string();
            self.general_binder()?.fix_id_change(&module, from, to)?;
        }
        debug!(%from, %to, "note moved");
        Ok(())
    }
}
