// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session: a mounted storage root plus the type registry.
//!
//! The session resolves names to collections and is the only place sibling
//! modules are looked up for general bindings. It keeps no notion of a
//! "currently open" table or note; callers hold the [`Collection`] handles.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::collection::{validate_name, Collection, Location, SiblingResolver};
use crate::error::{Result, StoreError};
use crate::ids::NoteId;
use crate::manifest::{Manifest, ModuleDecl, MANIFEST_FILE};
use crate::registry::TypeRegistry;

/// A declared module and whether its directory exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    /// Declaration from the table manifest.
    pub decl: ModuleDecl,
    /// `true` iff the module directory exists.
    pub active: bool,
}

/// Mounted storage root.
#[derive(Debug, Clone)]
pub struct Session {
    root: PathBuf,
    registry: TypeRegistry,
}

impl Session {
    /// Mount an existing storage root.
    pub fn mount(root: impl Into<PathBuf>, registry: TypeRegistry) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::CollectionNotFound(root));
        }
        info!(root = %root.display(), "storage root mounted");
        Ok(Self { root, registry })
    }

    /// Mount `root`, creating the directory first if needed.
    pub fn mount_or_create(root: impl Into<PathBuf>, registry: TypeRegistry) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| StoreError::io(&root, err))?;
        Self::mount(root, registry)
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Names of the tables under the root (directories holding a manifest).
    pub fn tables(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|err| StoreError::io(&self.root, err))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(&self.root, err))?;
            let path = entry.path();
            if !path.join(MANIFEST_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn table_location(&self, table: &str) -> Location {
        Location::table(&self.root, table)
    }

    fn module_location(&self, table: &str, module: &str) -> Location {
        Location::module(&self.root, table, module)
    }

    /// Create table `name` of type `type_tag`, configured by `configure`.
    pub fn create_table<F>(&self, name: &str, type_tag: &str, configure: F) -> Result<Collection>
    where
        F: FnOnce(&mut Manifest) -> Result<()>,
    {
        Collection::create(self.table_location(name), &self.registry, type_tag, configure)
    }

    /// Open table `name`.
    pub fn open_table(&self, name: &str) -> Result<Collection> {
        Collection::open(self.table_location(name), &self.registry)
    }

    /// Rename table `old` to `new`.
    pub fn rename_table(&self, old: &str, new: &str) -> Result<Collection> {
        let mut table = self.open_table(old)?;
        table.rename(new)?;
        Ok(table)
    }

    /// Delete table `name` with everything under it.
    pub fn delete_table(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        Collection::delete_at(&self.table_location(name))
    }

    /// Declared modules of `table` with their active state.
    pub fn modules(&self, table: &str) -> Result<Vec<ModuleStatus>> {
        let location = self.table_location(table);
        let manifest = Manifest::load(&location.dir())?;
        Ok(manifest
            .modules()
            .iter()
            .map(|decl| ModuleStatus {
                active: self.module_location(table, &decl.name).dir().is_dir(),
                decl: decl.clone(),
            })
            .collect())
    }

    /// Declare module `name` in `table` without creating it.
    pub fn declare_module(&self, table: &str, name: &str, type_tag: &str) -> Result<()> {
        validate_name(name)?;
        self.registry.resolve(type_tag)?;
        let mut manifest = Manifest::load(&self.table_location(table).dir())?;
        manifest.declare_module(ModuleDecl {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
        })
    }

    /// Create module `name` in `table`, declaring it first if needed.
    ///
    /// An existing declaration must carry the same type tag.
    pub fn create_module<F>(
        &self,
        table: &str,
        name: &str,
        type_tag: &str,
        configure: F,
    ) -> Result<Collection>
    where
        F: FnOnce(&mut Manifest) -> Result<()>,
    {
        let mut table_manifest = Manifest::load(&self.table_location(table).dir())?;
        let declared = match table_manifest.module(name) {
            Some(decl) if decl.type_tag != type_tag => {
                return Err(StoreError::CapabilityDenied(format!(
                    "module `{name}` is declared with type `{}`",
                    decl.type_tag
                )));
            }
            Some(_) => true,
            None => false,
        };
        let module = Collection::create(
            self.module_location(table, name),
            &self.registry,
            type_tag,
            configure,
        )?;
        if !declared {
            table_manifest.declare_module(ModuleDecl {
                name: name.to_string(),
                type_tag: type_tag.to_string(),
            })?;
        }
        Ok(module)
    }

    /// Create the directory of a declared but inactive module.
    pub fn activate_module(&self, table: &str, name: &str) -> Result<Collection> {
        let table_manifest = Manifest::load(&self.table_location(table).dir())?;
        let decl = table_manifest
            .module(name)
            .ok_or_else(|| StoreError::CollectionNotFound(self.module_location(table, name).dir()))?
            .clone();
        self.create_module(table, name, &decl.type_tag, |_| Ok(()))
    }

    /// Open module `name` of `table`.
    pub fn open_module(&self, table: &str, name: &str) -> Result<Collection> {
        Collection::open(self.module_location(table, name), &self.registry)
    }

    /// Rename module `old` of `table` to `new`; see [`Collection::rename`].
    pub fn rename_module(&self, table: &str, old: &str, new: &str) -> Result<Collection> {
        let mut module = self.open_module(table, old)?;
        module.rename(new)?;
        Ok(module)
    }

    /// Delete the directory of module `name`. With `forget`, the declaration
    /// is removed from the table manifest too.
    pub fn delete_module(&self, table: &str, name: &str, forget: bool) -> Result<()> {
        validate_name(table)?;
        validate_name(name)?;
        Collection::delete_at(&self.module_location(table, name))?;
        if forget {
            let mut manifest = Manifest::load(&self.table_location(table).dir())?;
            manifest.remove_module(name)?;
        }
        Ok(())
    }

    /// Open a collection by path: `"table"` or `"table/module"`.
    pub fn open_path(&self, path: &str) -> Result<Collection> {
        match path.split_once('/') {
            Some((table, module)) => self.open_module(table, module),
            None => self.open_table(path),
        }
    }

    /// Resolver over the modules of `table`, for general bindings.
    pub fn siblings<'s>(&'s self, table: &'s str) -> Siblings<'s> {
        Siblings {
            session: self,
            table,
        }
    }
}

/// [`SiblingResolver`] over the modules of one table.
#[derive(Debug, Clone, Copy)]
pub struct Siblings<'s> {
    session: &'s Session,
    table: &'s str,
}

impl SiblingResolver for Siblings<'_> {
    fn note_exists(&self, module: &str, id: NoteId) -> Result<bool> {
        match self.session.open_module(self.table, module) {
            Ok(collection) => Ok(collection.contains(id)),
            Err(StoreError::CollectionNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
