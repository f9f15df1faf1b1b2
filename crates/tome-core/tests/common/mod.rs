// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::collections::BTreeMap;

use tempfile::TempDir;
use tome_core::{Collection, NoteId, Session, TypeRegistry};

/// Fresh storage root with a mounted session.
pub fn session() -> (TempDir, Session) {
    let tmp = tempfile::tempdir().unwrap();
    let session = Session::mount(tmp.path(), TypeRegistry::default()).unwrap();
    (tmp, session)
}

/// Create table `name` holding `count` notes named `note-<id>`.
pub fn table_with_notes(session: &Session, name: &str, count: u32, recycle: bool) -> Collection {
    let mut table = session
        .create_table(name, "base", |m| m.set_recycle_id(recycle))
        .unwrap();
    fill(&mut table, count);
    table
}

/// Append `count` notes named after their allocated id.
pub fn fill(collection: &mut Collection, count: u32) {
    for _ in 0..count {
        let id = collection.create_note().unwrap();
        collection
            .note_mut(id)
            .unwrap()
            .set_name(Some(format!("note-{id}")))
            .unwrap();
    }
}

/// Id → name snapshot of a collection.
pub fn names(collection: &Collection) -> BTreeMap<NoteId, String> {
    collection
        .notes()
        .map(|n| (n.id(), n.name().unwrap_or_default().to_string()))
        .collect()
}

/// Ids as plain integers, ascending.
pub fn raw_ids(collection: &Collection) -> Vec<u32> {
    collection.ids().into_iter().map(NoteId::get).collect()
}
