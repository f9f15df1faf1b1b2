// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! File-backed collections of notes.
//!
//! `tome-core` stores user data as **tables** and the **modules** nested one
//! level below them. Each collection is a directory; each note is one JSON
//! document named after its id. On top of that sit the pieces with real
//! invariants:
//!
//! - [`Manifest`]: per-collection options, metainfo rules, module declarations.
//! - [`generate_new_id`]: id allocation derived from the current id set alone.
//! - [`Collection::change_id`]: reindexing under overwrite / swap / insert.
//! - [`Binder`]: local and general link registries kept consistent across
//!   reindexing and module renames.
//! - [`Attachments`]: per-note files in declared slots or slot-less.
//!
//! # Layout
//!
//! ```text
//! <root>/<table>/manifest.json
//! <root>/<table>/binds.json             local links (absent when empty)
//! <root>/<table>/general-binds.json     links across the table's modules
//! <root>/<table>/<id>.json
//! <root>/<table>/.attachments/<id>/...
//! <root>/<table>/<module>/...           same shape, minus general-binds.json
//! ```
//!
//! # Durability
//!
//! Every mutation rewrites its document in place before returning. There is
//! no locking, no journaling and no atomic replace; one process is assumed to
//! own the root for the duration of a [`Session`].

pub mod attachments;
pub mod binder;
pub mod collection;
mod document;
pub mod error;
pub mod ids;
pub mod manifest;
pub mod meta;
pub mod note;
pub mod registry;
pub mod reindex;
pub mod session;

pub use attachments::Attachments;
pub use binder::{Binder, GeneralBinder, LocalBinder};
pub use collection::{Collection, Location, SiblingResolver};
pub use error::{ErrorKind, Result, StoreError};
pub use ids::{generate_new_id, GlobalRef, NoteId};
pub use manifest::{CommonOptions, Manifest, ModuleDecl, ObjectKind};
pub use meta::{MetaRule, MetaValue};
pub use note::{Note, NoteMut};
pub use registry::{Payload, Schema, TypeRegistry, BASE_TYPE};
pub use reindex::ChangeMode;
pub use session::{ModuleStatus, Session, Siblings};
