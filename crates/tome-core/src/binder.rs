// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Link registries between notes.
//!
//! - The **local** binder maps a parent [`NoteId`] to the set of child ids in
//!   the same collection (`binds.json`).
//! - The **general** binder maps a parent [`GlobalRef`] to child refs across
//!   the modules of one table (`general-binds.json` in the table directory).
//!
//! # Canonical form
//!
//! Both persist as a list of `[parent, [child, ...]]` tuples, sorted by parent
//! and then by child, so equal binding sets produce identical bytes no matter
//! the insertion order. An empty registry is never written: the document is
//! deleted as soon as the last link goes away, and a missing document reads as
//! "no links".

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::document;
use crate::error::Result;
use crate::ids::{GlobalRef, NoteId};

/// File name of a collection's local binder.
pub const LOCAL_BINDS_FILE: &str = "binds.json";
/// File name of a table's general binder.
pub const GENERAL_BINDS_FILE: &str = "general-binds.json";

/// Key type a [`Binder`] can hold.
pub trait BindKey: Ord + Clone + fmt::Display + Serialize + DeserializeOwned {}

impl BindKey for NoteId {}
impl BindKey for GlobalRef {}

/// Binder over note ids of one collection.
pub type LocalBinder = Binder<NoteId>;
/// Binder over `<module>-<id>` refs shared by a table's modules.
pub type GeneralBinder = Binder<GlobalRef>;

type Canonical<K> = Vec<(K, Vec<K>)>;

/// Parent → children link registry persisted at a fixed path.
#[derive(Debug, Clone)]
pub struct Binder<K: BindKey> {
    path: PathBuf,
    links: BTreeMap<K, BTreeSet<K>>,
}

impl<K: BindKey> Binder<K> {
    /// Load the registry stored at `path`; a missing document is empty.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut links: BTreeMap<K, BTreeSet<K>> = BTreeMap::new();
        for (parent, children) in document::load::<Canonical<K>>(&path)?.unwrap_or_default() {
            if children.is_empty() {
                continue;
            }
            links.entry(parent).or_default().extend(children);
        }
        Ok(Self { path, links })
    }

    /// Write the canonical form, or delete the document when empty.
    pub fn save(&self) -> Result<()> {
        if self.links.is_empty() {
            document::remove(&self.path)?;
            return Ok(());
        }
        document::save(&self.path, &self.canonical())
    }

    fn canonical(&self) -> Canonical<K> {
        self.links
            .iter()
            .map(|(parent, children)| (parent.clone(), children.iter().cloned().collect()))
            .collect()
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn relocate(&mut self, path: PathBuf) {
        self.path = path;
    }

    /// Link `child` under `parent`. Returns `false` if the link already
    /// existed (nothing is rewritten then).
    pub fn bind(&mut self, parent: K, child: K) -> Result<bool> {
        debug!(%parent, %child, "bind");
        let added = self.links.entry(parent).or_default().insert(child);
        if added {
            self.save()?;
        }
        Ok(added)
    }

    /// Remove the link if present. Absent links are not an error.
    pub fn unbind(&mut self, parent: &K, child: &K) -> Result<bool> {
        let Some(children) = self.links.get_mut(parent) else {
            return Ok(false);
        };
        if !children.remove(child) {
            return Ok(false);
        }
        if children.is_empty() {
            self.links.remove(parent);
        }
        debug!(%parent, %child, "unbind");
        self.save()?;
        Ok(true)
    }

    /// Children bound under `parent`, ascending.
    pub fn children(&self, parent: &K) -> Vec<K> {
        self.links
            .get(parent)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Parents that list `child`, ascending.
    pub fn parents(&self, child: &K) -> Vec<K> {
        self.links
            .iter()
            .filter(|(_, children)| children.contains(child))
            .map(|(parent, _)| parent.clone())
            .collect()
    }

    /// Whether `parent → child` is bound.
    pub fn is_bound(&self, parent: &K, child: &K) -> bool {
        self.links.get(parent).is_some_and(|c| c.contains(child))
    }

    /// Iterate `(parent, children)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &BTreeSet<K>)> {
        self.links.iter()
    }

    /// Total number of links.
    pub fn len(&self) -> usize {
        self.links.values().map(BTreeSet::len).sum()
    }

    /// `true` when no links exist.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Rewrite every key and value through `map` (identity for `None`) and
    /// persist if anything changed. Keys that collapse onto one another merge.
    fn remap(&mut self, map: impl Fn(&K) -> Option<K>) -> Result<bool> {
        let mut changed = false;
        let mut rebuilt: BTreeMap<K, BTreeSet<K>> = BTreeMap::new();
        for (parent, children) in std::mem::take(&mut self.links) {
            let parent = map(&parent).map_or(parent, |p| {
                changed = true;
                p
            });
            let entry = rebuilt.entry(parent).or_default();
            for child in children {
                entry.insert(map(&child).map_or(child, |c| {
                    changed = true;
                    c
                }));
            }
        }
        self.links = rebuilt;
        if changed {
            self.save()?;
        }
        Ok(changed)
    }
}

impl Binder<NoteId> {
    /// Rename `old` to `new` wherever it appears, as a key or as a child.
    pub fn fix_id_change(&mut self, old: NoteId, new: NoteId) -> Result<bool> {
        self.remap(|id| (*id == old).then_some(new))
    }
}

impl Binder<GlobalRef> {
    /// Rename note `old` of `module` to `new` wherever it appears.
    pub fn fix_id_change(&mut self, module: &str, old: NoteId, new: NoteId) -> Result<bool> {
        self.remap(|r| (r.module == module && r.id == old).then(|| GlobalRef::new(module, new)))
    }

    /// Rewrite the module prefix of every ref that names `old`.
    pub fn fix_module_rename(&mut self, old: &str, new: &str) -> Result<bool> {
        self.remap(|r| (r.module == old).then(|| GlobalRef::new(new, r.id)))
    }
}
