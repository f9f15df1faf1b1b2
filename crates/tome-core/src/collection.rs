// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Collections: tables and the modules nested one level below them.
//!
//! A collection is a directory holding its manifest, one `<id>.json` per note,
//! an optional local binder and the `.attachments/` tree. The directory scan at
//! open time is the only index. Modules additionally reach the general binder
//! stored in their parent table's directory; a table has no general binder of
//! its own, it is only where the modules' one lives.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind as IoKind;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::attachments::{attachment_dir, Attachments, ATTACHMENTS_DIR};
use crate::binder::{GeneralBinder, LocalBinder, GENERAL_BINDS_FILE, LOCAL_BINDS_FILE};
use crate::document;
use crate::error::{Result, StoreError};
use crate::ids::{generate_new_id, GlobalRef, NoteId};
use crate::manifest::{Manifest, ObjectKind};
use crate::note::{Note, NoteDoc, NoteMut};
use crate::registry::{Schema, TypeRegistry};

/// Where a collection lives under a storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    root: PathBuf,
    table: String,
    module: Option<String>,
}

impl Location {
    /// A table directly under `root`.
    pub fn table(root: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            table: table.into(),
            module: None,
        }
    }

    /// A module nested in `table`.
    pub fn module(
        root: impl Into<PathBuf>,
        table: impl Into<String>,
        module: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            table: table.into(),
            module: Some(module.into()),
        }
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the collection itself.
    pub fn name(&self) -> &str {
        self.module.as_deref().unwrap_or(&self.table)
    }

    /// Name of the owning table (the collection itself for a table).
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Table or module.
    pub fn kind(&self) -> ObjectKind {
        if self.module.is_some() {
            ObjectKind::Module
        } else {
            ObjectKind::Table
        }
    }

    /// Directory of the owning table.
    pub fn table_dir(&self) -> PathBuf {
        self.root.join(&self.table)
    }

    /// Directory of the collection.
    pub fn dir(&self) -> PathBuf {
        match &self.module {
            Some(module) => self.table_dir().join(module),
            None => self.table_dir(),
        }
    }

    /// Same location with the collection's own name replaced.
    pub fn renamed(&self, name: &str) -> Self {
        match &self.module {
            Some(_) => Self::module(&self.root, &self.table, name),
            None => Self::table(&self.root, name),
        }
    }

    fn validate(&self) -> Result<()> {
        validate_name(&self.table)?;
        if let Some(module) = &self.module {
            validate_name(module)?;
        }
        Ok(())
    }
}

/// Reject names that cannot double as a collection directory name.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.bytes().all(|b| b.is_ascii_digit())
        || name.ends_with(".json");
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Port the session provides so a module can check notes of its siblings.
pub trait SiblingResolver {
    /// Whether module `module` of the same table holds note `id`.
    fn note_exists(&self, module: &str, id: NoteId) -> Result<bool>;
}

/// An open table or module.
#[derive(Debug)]
pub struct Collection {
    pub(crate) location: Location,
    pub(crate) manifest: Manifest,
    pub(crate) schema: Schema,
    pub(crate) notes: BTreeMap<NoteId, Note>,
    pub(crate) binder: LocalBinder,
}

impl Collection {
    /// Create a new collection at `location`.
    ///
    /// The manifest is seeded by the schema registered for `type_tag`, then
    /// by `configure`, entirely in memory; it is written once the directory
    /// exists. Fails if the directory is already there.
    #[instrument(skip(registry, configure), fields(dir = %location.dir().display()))]
    pub fn create<F>(
        location: Location,
        registry: &TypeRegistry,
        type_tag: &str,
        configure: F,
    ) -> Result<Self>
    where
        F: FnOnce(&mut Manifest) -> Result<()>,
    {
        location.validate()?;
        let dir = location.dir();
        if dir.exists() {
            return Err(StoreError::AlreadyExists(location.name().to_string()));
        }
        if location.kind() == ObjectKind::Module && !location.table_dir().is_dir() {
            return Err(StoreError::CollectionNotFound(location.table_dir()));
        }
        let schema = registry.resolve(type_tag)?;
        let mut manifest = Manifest::draft(&dir, location.kind(), type_tag);
        (schema.new_collection_of)(&mut manifest)?;
        configure(&mut manifest)?;

        fs::create_dir_all(&dir).map_err(|err| StoreError::io(&dir, err))?;
        manifest.commit()?;
        let binder = LocalBinder::load(dir.join(LOCAL_BINDS_FILE))?;
        info!(name = location.name(), kind = ?location.kind(), "collection created");
        Ok(Self {
            location,
            manifest,
            schema,
            notes: BTreeMap::new(),
            binder,
        })
    }

    /// Open the collection at `location`: load the manifest, resolve its type,
    /// scan note documents and tidy empty attachment directories.
    #[instrument(skip(registry), fields(dir = %location.dir().display()))]
    pub fn open(location: Location, registry: &TypeRegistry) -> Result<Self> {
        let dir = location.dir();
        if !dir.is_dir() {
            return Err(StoreError::CollectionNotFound(dir));
        }
        let manifest = Manifest::load(&dir)?;
        if manifest.object() != location.kind() {
            warn!(
                expected = ?location.kind(),
                found = ?manifest.object(),
                "manifest object kind does not match its location"
            );
        }
        let schema = registry.resolve(manifest.type_tag())?;
        let notes = scan_notes(&dir)?;
        repair_attachments(&dir, &notes)?;
        let binder = LocalBinder::load(dir.join(LOCAL_BINDS_FILE))?;
        Ok(Self {
            location,
            manifest,
            schema,
            notes,
            binder,
        })
    }

    /// Rename the collection's directory.
    ///
    /// For a module this also renames its declaration in the parent table's
    /// manifest and rewrites the module prefix in the general binder.
    #[instrument(skip(self), fields(from = self.name()))]
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let old_name = self.name().to_string();
        if new_name == old_name {
            return Ok(());
        }
        let target = self.location.renamed(new_name);
        let new_dir = target.dir();
        if new_dir.exists() {
            return Err(StoreError::AlreadyExists(new_name.to_string()));
        }
        // Everything a module rename rewrites is loaded and checked up front.
        let parent = match self.kind() {
            ObjectKind::Module => {
                let table_dir = self.location.table_dir();
                let table = Manifest::load(&table_dir)?;
                if table.module(new_name).is_some() {
                    return Err(StoreError::AlreadyExists(new_name.to_string()));
                }
                let general = GeneralBinder::load(table_dir.join(GENERAL_BINDS_FILE))?;
                Some((table, general))
            }
            ObjectKind::Table => None,
        };

        document::rename(&self.location.dir(), &new_dir)?;
        self.location = target;
        self.manifest.relocate(&new_dir);
        self.binder.relocate(new_dir.join(LOCAL_BINDS_FILE));

        if let Some((mut table, mut general)) = parent {
            if table.module(&old_name).is_some() {
                table.rename_module(&old_name, new_name)?;
            }
            general.fix_module_rename(&old_name, new_name)?;
        }
        info!(to = new_name, "collection renamed");
        Ok(())
    }

    /// Remove the collection's directory tree. Module declarations in the
    /// parent table stay; the module simply becomes inactive.
    pub fn delete(self) -> Result<()> {
        Self::delete_at(&self.location)
    }

    /// Remove the directory tree at `location` without opening it. The
    /// manifest's type tag is never resolved.
    #[instrument(skip(location), fields(dir = %location.dir().display()))]
    pub fn delete_at(location: &Location) -> Result<()> {
        let dir = location.dir();
        if !dir.is_dir() {
            return Err(StoreError::CollectionNotFound(dir));
        }
        fs::remove_dir_all(&dir).map_err(|err| StoreError::io(&dir, err))?;
        info!("collection deleted");
        Ok(())
    }

    // ── accessors ───────────────────────────────────────────────────

    /// Where this collection lives.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        self.location.name()
    }

    /// Table or module.
    pub fn kind(&self) -> ObjectKind {
        self.location.kind()
    }

    /// Directory of the collection.
    pub fn dir(&self) -> PathBuf {
        self.location.dir()
    }

    /// Manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Manifest, for its persisting mutators.
    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    /// Schema resolved from the manifest's type tag.
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Local binder.
    pub fn binder(&self) -> &LocalBinder {
        &self.binder
    }

    /// Number of notes.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// `true` when the collection holds no notes.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Whether note `id` exists.
    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.contains_key(&id)
    }

    /// Current id set.
    pub fn ids(&self) -> BTreeSet<NoteId> {
        self.notes.keys().copied().collect()
    }

    /// Notes in ascending id order.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    /// Note `id`.
    pub fn note(&self, id: NoteId) -> Result<&Note> {
        self.notes.get(&id).ok_or(StoreError::NoteNotFound(id))
    }

    /// Mutable handle on note `id`.
    pub fn note_mut(&mut self, id: NoteId) -> Result<NoteMut<'_>> {
        let dir = self.location.dir();
        let note = self.notes.get_mut(&id).ok_or(StoreError::NoteNotFound(id))?;
        Ok(NoteMut {
            dir,
            manifest: &self.manifest,
            note,
        })
    }

    // ── notes ───────────────────────────────────────────────────────

    /// Id the next [`Collection::create_note`] would allocate.
    pub fn next_id(&self) -> Result<NoteId> {
        generate_new_id(&self.ids(), self.manifest.recycle_id())
    }

    /// Allocate an id and write a fresh note document.
    #[instrument(skip(self), fields(collection = self.name()))]
    pub fn create_note(&mut self) -> Result<NoteId> {
        let id = self.next_id()?;
        let doc = NoteDoc {
            attachments: self
                .manifest
                .attachments_enabled()
                .then(|| Attachments::for_manifest(&self.manifest)),
            payload: (self.schema.new_note_of)(),
            ..NoteDoc::default()
        };
        let note = Note::new(id, doc);
        note.save(&self.location.dir())?;
        self.notes.insert(id, note);
        info!(%id, "note created");
        Ok(id)
    }

    /// Delete note `id` and its attachments. Bindings that mention it are
    /// left in place.
    #[instrument(skip(self), fields(collection = self.name()))]
    pub fn delete_note(&mut self, id: NoteId) -> Result<()> {
        let dir = self.location.dir();
        let note = self.notes.get(&id).ok_or(StoreError::NoteNotFound(id))?;
        document::remove(&note.document_path(&dir))?;
        self.notes.remove(&id);
        let attached = attachment_dir(&dir, id);
        match fs::remove_dir_all(&attached) {
            Ok(()) => {}
            Err(err) if err.kind() == IoKind::NotFound => {}
            Err(err) => return Err(StoreError::io(&attached, err)),
        }
        document::remove_dir_if_empty(&dir.join(ATTACHMENTS_DIR))?;
        info!(%id, "note deleted");
        Ok(())
    }

    /// Ids of notes whose name or text metainfo contains `query`,
    /// case-insensitively.
    pub fn search(&self, query: &str) -> Vec<NoteId> {
        let needle = query.to_lowercase();
        self.notes
            .values()
            .filter(|note| note.matches(&needle))
            .map(Note::id)
            .collect()
    }

    // ── local bindings ──────────────────────────────────────────────

    /// Bind `child` under `parent`. The child must be a live note.
    pub fn bind(&mut self, parent: NoteId, child: NoteId) -> Result<bool> {
        if !self.contains(child) {
            return Err(StoreError::BindTargetNotFound(child.to_string()));
        }
        self.binder.bind(parent, child)
    }

    /// Remove `parent → child`; absent links are fine.
    pub fn unbind(&mut self, parent: NoteId, child: NoteId) -> Result<bool> {
        self.binder.unbind(&parent, &child)
    }

    /// Children bound under `parent`.
    pub fn children(&self, parent: NoteId) -> Vec<NoteId> {
        self.binder.children(&parent)
    }

    /// Parents that bind `child`.
    pub fn parents(&self, child: NoteId) -> Vec<NoteId> {
        self.binder.parents(&child)
    }

    // ── general bindings (modules only) ─────────────────────────────

    /// Path of the general binder this collection participates in.
    /// `None` for tables.
    pub fn general_binds_path(&self) -> Option<PathBuf> {
        (self.kind() == ObjectKind::Module)
            .then(|| self.location.table_dir().join(GENERAL_BINDS_FILE))
    }

    /// Load the general binder fresh from disk so sibling modules never work
    /// on stale copies.
    pub fn general_binder(&self) -> Result<GeneralBinder> {
        let path = self.general_binds_path().ok_or_else(|| {
            StoreError::CapabilityDenied("general bindings belong to modules".into())
        })?;
        GeneralBinder::load(path)
    }

    /// Reference to note `id` of this module.
    pub fn global_ref(&self, id: NoteId) -> GlobalRef {
        GlobalRef::new(self.name(), id)
    }

    /// Bind `child` (any module of the same table) under local note `parent`.
    pub fn bind_general(
        &self,
        parent: NoteId,
        child: &GlobalRef,
        siblings: &dyn SiblingResolver,
    ) -> Result<bool> {
        let mut general = self.general_binder()?;
        let live = if child.module == self.name() {
            self.contains(child.id)
        } else {
            siblings.note_exists(&child.module, child.id)?
        };
        if !live {
            return Err(StoreError::BindTargetNotFound(child.to_string()));
        }
        general.bind(self.global_ref(parent), child.clone())
    }

    /// Remove a general link from local note `parent`.
    pub fn unbind_general(&self, parent: NoteId, child: &GlobalRef) -> Result<bool> {
        self.general_binder()?.unbind(&self.global_ref(parent), child)
    }

    /// General children of local note `parent`.
    pub fn general_children(&self, parent: NoteId) -> Result<Vec<GlobalRef>> {
        Ok(self.general_binder()?.children(&self.global_ref(parent)))
    }

    /// General parents of local note `child`.
    pub fn general_parents(&self, child: NoteId) -> Result<Vec<GlobalRef>> {
        Ok(self.general_binder()?.parents(&self.global_ref(child)))
    }
}

fn scan_notes(dir: &Path) -> Result<BTreeMap<NoteId, Note>> {
    let mut notes = BTreeMap::new();
    let entries = fs::read_dir(dir).map_err(|err| StoreError::io(dir, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| StoreError::io(dir, err))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Some(id) = NoteId::from_file_name(&name) else {
            continue;
        };
        if !id.is_positive() {
            warn!(file = %name, "skipping note document with the transient id");
            continue;
        }
        if !entry.path().is_file() {
            continue;
        }
        notes.insert(id, Note::load(dir, id)?);
    }
    Ok(notes)
}

/// Remove empty per-note attachment directories (and the `.attachments`
/// root once it holds nothing).
fn repair_attachments(dir: &Path, notes: &BTreeMap<NoteId, Note>) -> Result<()> {
    let root = dir.join(ATTACHMENTS_DIR);
    if !root.is_dir() {
        return Ok(());
    }
    for id in notes.keys() {
        document::remove_dir_if_empty(&attachment_dir(dir, *id))?;
    }
    if document::remove_dir_if_empty(&root)? {
        warn!(dir = %root.display(), "removed stray empty attachments directory");
    }
    Ok(())
}
