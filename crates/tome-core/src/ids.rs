// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Note identifiers and id allocation.
//!
//! A note's id is the stem of its document file (`<id>.json`). The directory
//! scan is the only source of truth for which ids exist, so allocation is a
//! pure function of the current id set and nothing like a counter is stored.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, StoreError};

/// Identifier of a note inside one collection.
///
/// Live notes always carry a positive id. [`NoteId::TRANSIENT`] (`0`) is only
/// occupied for the duration of a swap or insert reindex.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u32);

impl NoteId {
    /// Parking id used while shuffling notes during reindexing.
    pub const TRANSIENT: Self = Self(0);

    /// Raw numeric value.
    pub fn get(self) -> u32 {
        self.0
    }

    /// `true` for ids a live note may carry.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// The id directly above this one; `None` past `u32::MAX`.
    pub(crate) fn succ(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// File name of the note document for this id.
    pub(crate) fn file_name(self) -> String {
        format!("{}.json", self.0)
    }

    /// Parse a note document file name (`<id>.json`).
    pub(crate) fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        stem.parse().ok().map(Self)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NoteId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl FromStr for NoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Pick the id for a new note.
///
/// With `recycle` set this is the smallest positive integer missing from
/// `existing` (scanning `1..=len+1`, which always contains a free slot).
/// Without it the result is one past the largest id, or `1` when empty.
///
/// Fails with [`StoreError::InvalidId`] when no id fits in `u32`.
pub fn generate_new_id(existing: &BTreeSet<NoteId>, recycle: bool) -> Result<NoteId> {
    let exhausted = || StoreError::InvalidId(NoteId(u32::MAX));
    if recycle {
        let upper = u32::try_from(existing.len()).map_or(u32::MAX, |n| n.saturating_add(1));
        return (1..=upper)
            .map(NoteId)
            .find(|id| !existing.contains(id))
            .ok_or_else(exhausted);
    }
    match existing.iter().next_back() {
        Some(max) => max.succ().ok_or_else(exhausted),
        None => Ok(NoteId(1)),
    }
}

/// Cross-collection note identifier, rendered `"<module>-<id>"`.
///
/// Module names may themselves contain `-`; parsing splits at the last one.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GlobalRef {
    /// Module (collection) name.
    pub module: String,
    /// Note id within that module.
    pub id: NoteId,
}

impl GlobalRef {
    /// Build a reference to note `id` of `module`.
    pub fn new(module: impl Into<String>, id: NoteId) -> Self {
        Self {
            module: module.into(),
            id,
        }
    }
}

impl fmt::Display for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.module, self.id)
    }
}

/// Failure to parse a [`GlobalRef`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed note reference `{0}` (expected <module>-<id>)")]
pub struct ParseRefError(pub String);

impl FromStr for GlobalRef {
    type Err = ParseRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, id) = s.rsplit_once('-').ok_or_else(|| ParseRefError(s.into()))?;
        if module.is_empty() {
            return Err(ParseRefError(s.into()));
        }
        let id = id.parse().map_err(|_| ParseRefError(s.into()))?;
        Ok(Self::new(module, id))
    }
}

impl Serialize for GlobalRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GlobalRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> BTreeSet<NoteId> {
        raw.iter().copied().map(NoteId).collect()
    }

    #[test]
    fn empty_collection_starts_at_one() {
        assert_eq!(generate_new_id(&ids(&[]), true).unwrap(), NoteId(1));
        assert_eq!(generate_new_id(&ids(&[]), false).unwrap(), NoteId(1));
    }

    #[test]
    fn recycling_fills_the_lowest_gap() {
        assert_eq!(generate_new_id(&ids(&[1, 3, 4]), true).unwrap(), NoteId(2));
        assert_eq!(generate_new_id(&ids(&[2, 3]), true).unwrap(), NoteId(1));
        assert_eq!(generate_new_id(&ids(&[1, 2, 3]), true).unwrap(), NoteId(4));
    }

    #[test]
    fn without_recycling_ids_only_grow() {
        assert_eq!(generate_new_id(&ids(&[1, 3, 4]), false).unwrap(), NoteId(5));
        assert_eq!(generate_new_id(&ids(&[7]), false).unwrap(), NoteId(8));
    }

    #[test]
    fn allocation_past_the_largest_id_is_an_error() {
        let full = ids(&[1, u32::MAX]);
        assert!(matches!(
            generate_new_id(&full, false),
            Err(StoreError::InvalidId(NoteId(u32::MAX)))
        ));
        assert_eq!(generate_new_id(&full, true).unwrap(), NoteId(2));
        assert_eq!(NoteId(u32::MAX).succ(), None);
        assert_eq!(NoteId(4).succ(), Some(NoteId(5)));
    }

    #[test]
    fn file_names_round_trip_and_reject_noise() {
        assert_eq!(NoteId::from_file_name("12.json"), Some(NoteId(12)));
        assert_eq!(NoteId::from_file_name("manifest.json"), None);
        assert_eq!(NoteId::from_file_name("-1.json"), None);
        assert_eq!(NoteId::from_file_name(".json"), None);
        assert_eq!(NoteId::from_file_name("3.txt"), None);
        assert_eq!(NoteId(12).file_name(), "12.json");
    }

    #[test]
    fn global_refs_split_at_the_last_dash() {
        let r: GlobalRef = "reading-list-14".parse().unwrap();
        assert_eq!(r.module, "reading-list");
        assert_eq!(r.id, NoteId(14));
        assert_eq!(r.to_string(), "reading-list-14");
        assert!("nodash".parse::<GlobalRef>().is_err());
        assert!("-3".parse::<GlobalRef>().is_err());
        assert!("books-x".parse::<GlobalRef>().is_err());
    }
}
