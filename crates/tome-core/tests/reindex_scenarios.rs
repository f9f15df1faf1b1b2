// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{fill, names, raw_ids, session, table_with_notes};
use tome_core::{ChangeMode, ErrorKind, GlobalRef, NoteId, StoreError};

#[test]
fn recycled_ids_fill_the_gap_left_by_a_delete() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 3, true);
    table.delete_note(NoteId(2)).unwrap();
    assert_eq!(table.create_note().unwrap(), NoteId(2));
}

#[test]
fn without_recycling_deleted_ids_stay_free() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 3, false);
    table.delete_note(NoteId(2)).unwrap();
    assert_eq!(table.create_note().unwrap(), NoteId(4));
}

#[test]
fn overwrite_replaces_the_target() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 3, false);
    table.change_id(NoteId(1), NoteId(3), ChangeMode::Overwrite).unwrap();
    assert_eq!(raw_ids(&table), vec![2, 3]);
    assert_eq!(table.note(NoteId(3)).unwrap().name(), Some("note-1"));

    let reopened = session.open_table("films").unwrap();
    assert_eq!(names(&reopened), names(&table));
}

#[test]
fn insert_shifts_the_contiguous_run() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 4, false);
    table.change_id(NoteId(4), NoteId(2), ChangeMode::Insert).unwrap();
    assert_eq!(raw_ids(&table), vec![1, 2, 3, 4]);
    let got = names(&table);
    assert_eq!(got[&NoteId(1)], "note-1");
    assert_eq!(got[&NoteId(2)], "note-4");
    assert_eq!(got[&NoteId(3)], "note-2");
    assert_eq!(got[&NoteId(4)], "note-3");
    assert!(!table.dir().join("0.json").exists());
}

#[test]
fn insert_stops_at_the_first_gap() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 6, false);
    table.delete_note(NoteId(4)).unwrap();
    // {1,2,3,5,6}: inserting 6 at 2 shifts only 2,3.
    table.change_id(NoteId(6), NoteId(2), ChangeMode::Insert).unwrap();
    assert_eq!(raw_ids(&table), vec![1, 2, 3, 4, 5]);
    let got = names(&table);
    assert_eq!(got[&NoteId(2)], "note-6");
    assert_eq!(got[&NoteId(3)], "note-2");
    assert_eq!(got[&NoteId(4)], "note-3");
    assert_eq!(got[&NoteId(5)], "note-5");
}

#[test]
fn swap_exchanges_ids_and_twice_is_identity() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 3, false);
    let before = names(&table);
    table.change_id(NoteId(1), NoteId(3), ChangeMode::Swap).unwrap();
    assert_eq!(table.note(NoteId(1)).unwrap().name(), Some("note-3"));
    assert_eq!(table.note(NoteId(3)).unwrap().name(), Some("note-1"));
    table.change_id(NoteId(1), NoteId(3), ChangeMode::Swap).unwrap();
    assert_eq!(names(&table), before);
}

#[test]
fn occupied_target_without_mode_changes_nothing() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 3, false);
    let before = names(&table);
    let err = table
        .change_id(NoteId(1), NoteId(2), ChangeMode::None)
        .unwrap_err();
    assert!(matches!(err, StoreError::TargetOccupied(NoteId(2))));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(names(&table), before);
}

#[test]
fn free_target_is_a_plain_move_in_every_mode() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 2, false);
    table.change_id(NoteId(2), NoteId(9), ChangeMode::Insert).unwrap();
    assert_eq!(raw_ids(&table), vec![1, 9]);
    table.change_id(NoteId(9), NoteId(5), ChangeMode::None).unwrap();
    assert_eq!(raw_ids(&table), vec![1, 5]);
    assert!(table.dir().join("5.json").is_file());
    assert!(!table.dir().join("9.json").exists());
}

#[test]
fn unknown_source_and_zero_ids_are_rejected() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 1, false);
    assert!(matches!(
        table.change_id(NoteId(7), NoteId(2), ChangeMode::None),
        Err(StoreError::NoteNotFound(NoteId(7)))
    ));
    assert!(matches!(
        table.change_id(NoteId(1), NoteId(0), ChangeMode::None),
        Err(StoreError::InvalidId(NoteId(0)))
    ));
}

#[test]
fn bindings_follow_a_changed_id() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 2, false);
    table.bind(NoteId(1), NoteId(2)).unwrap();
    table.change_id(NoteId(2), NoteId(5), ChangeMode::None).unwrap();
    assert_eq!(table.children(NoteId(1)), vec![NoteId(5)]);

    let reopened = session.open_table("films").unwrap();
    assert_eq!(reopened.children(NoteId(1)), vec![NoteId(5)]);
}

#[test]
fn bindings_follow_every_shifted_note() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 4, false);
    table.bind(NoteId(1), NoteId(2)).unwrap();
    table.bind(NoteId(3), NoteId(4)).unwrap();
    table.change_id(NoteId(4), NoteId(2), ChangeMode::Insert).unwrap();
    // old 2 → 3, old 3 → 4, old 4 → 2
    assert_eq!(table.children(NoteId(1)), vec![NoteId(3)]);
    assert_eq!(table.children(NoteId(4)), vec![NoteId(2)]);
    assert!(table.children(NoteId(3)).is_empty());
}

#[test]
fn attachments_move_with_their_note() {
    let (tmp, session) = session();
    let mut table = session
        .create_table("books", "base", |m| {
            m.set_attachments_enabled(true)?;
            m.declare_slot("cover", "Front cover")
        })
        .unwrap();
    common::fill(&mut table, 2);
    let src = tmp.path().join("cover.jpg");
    std::fs::write(&src, b"jpeg").unwrap();
    table
        .note_mut(NoteId(1))
        .unwrap()
        .attach(&src, Some("cover"), false)
        .unwrap();
    table.change_id(NoteId(1), NoteId(2), ChangeMode::Swap).unwrap();
    let att = table.dir().join(".attachments");
    assert!(att.join("2").join("cover.jpg").is_file());
    assert!(!att.join("1").exists());
    let moved = table.note_mut(NoteId(2)).unwrap();
    assert!(moved.slot_occupied("cover"));
    assert!(moved.attachment_path("cover.jpg").unwrap().is_file());
}

#[test]
fn ids_past_the_top_of_the_range_are_refused() {
    let (_tmp, session) = session();
    let mut table = table_with_notes(&session, "films", 3, false);
    let top = NoteId(u32::MAX);
    table.change_id(NoteId(3), top, ChangeMode::None).unwrap();
    table.change_id(NoteId(2), NoteId(u32::MAX - 1), ChangeMode::None).unwrap();
    let before = names(&table);

    assert!(matches!(table.create_note(), Err(StoreError::InvalidId(id)) if id == top));
    // The run {MAX-1, MAX} has nowhere to shift to.
    let err = table
        .change_id(NoteId(1), NoteId(u32::MAX - 1), ChangeMode::Insert)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidId(id) if id == top));
    assert_eq!(names(&table), before);
    assert!(!table.dir().join("0.json").exists());
    assert_eq!(names(&session.open_table("films").unwrap()), before);

    table.manifest_mut().set_recycle_id(true).unwrap();
    assert_eq!(table.create_note().unwrap(), NoteId(2));
}

#[test]
fn module_reindex_rewrites_local_and_general_bindings() {
    let (_tmp, session) = session();
    session.create_table("media", "base", |_| Ok(())).unwrap();
    let mut films = session
        .create_module("media", "films", "base", |_| Ok(()))
        .unwrap();
    let mut books = session
        .create_module("media", "books", "base", |_| Ok(()))
        .unwrap();
    fill(&mut films, 4);
    fill(&mut books, 1);
    let film = |id| GlobalRef::new("films", NoteId(id));
    let book = GlobalRef::new("books", NoteId(1));
    let siblings = session.siblings("media");
    films.bind(NoteId(1), NoteId(2)).unwrap();
    films.bind(NoteId(3), NoteId(4)).unwrap();
    films.bind_general(NoteId(2), &book, &siblings).unwrap();
    films.bind_general(NoteId(1), &film(3), &siblings).unwrap();
    books.bind_general(NoteId(1), &film(4), &siblings).unwrap();

    // 1 <-> 3
    films.change_id(NoteId(1), NoteId(3), ChangeMode::Swap).unwrap();
    assert_eq!(films.children(NoteId(3)), vec![NoteId(2)]);
    assert_eq!(films.children(NoteId(1)), vec![NoteId(4)]);
    assert_eq!(films.general_children(NoteId(3)).unwrap(), vec![film(1)]);

    // old 2 -> 3, old 3 -> 4, old 4 -> 2
    films.change_id(NoteId(4), NoteId(2), ChangeMode::Insert).unwrap();
    assert_eq!(films.children(NoteId(4)), vec![NoteId(3)]);
    assert_eq!(films.children(NoteId(1)), vec![NoteId(2)]);
    assert_eq!(films.parents(NoteId(3)), vec![NoteId(4)]);
    assert_eq!(films.general_children(NoteId(3)).unwrap(), vec![book.clone()]);
    assert_eq!(films.general_children(NoteId(4)).unwrap(), vec![film(1)]);
    assert!(films.general_children(NoteId(2)).unwrap().is_empty());
    assert_eq!(films.general_parents(NoteId(2)).unwrap(), vec![book.clone()]);
    assert_eq!(books.general_children(NoteId(1)).unwrap(), vec![film(2)]);

    let reopened = session.open_module("media", "films").unwrap();
    assert_eq!(reopened.children(NoteId(4)), vec![NoteId(3)]);
    assert_eq!(reopened.children(NoteId(1)), vec![NoteId(2)]);
    let general = std::fs::read_to_string(films.general_binds_path().unwrap()).unwrap();
    assert!(!general.contains("-0\""), "{general}");
    assert!(!films.contains(NoteId::TRANSIENT));
}
