// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn tome(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tome").unwrap();
    cmd.arg("--root").arg(root);
    cmd
}

fn ok(root: &Path, args: &[&str]) -> String {
    let out = tome(root).args(args).assert().success();
    String::from_utf8(out.get_output().stdout.clone()).unwrap()
}

#[test]
fn help_lists_the_command_groups() {
    Command::cargo_bin("tome")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("table"))
        .stdout(predicate::str::contains("note"))
        .stdout(predicate::str::contains("bind"));
}

#[test]
fn notes_are_created_listed_and_searched() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    ok(root, &["table", "create", "films", "--rule", "status=seen,queued"]);
    assert_eq!(ok(root, &["table", "list"]).trim(), "films");

    assert_eq!(ok(root, &["note", "new", "films", "--name", "Alien"]).trim(), "1");
    assert_eq!(ok(root, &["note", "new", "films", "--name", "Heat"]).trim(), "2");
    ok(root, &["note", "meta", "films", "1", "status", "seen"]);
    assert_eq!(ok(root, &["note", "meta", "films", "1", "status"]).trim(), "seen");

    tome(root)
        .args(["note", "meta", "films", "2", "status", "abandoned"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("status"));

    tome(root)
        .args(["note", "list", "films"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alien"))
        .stdout(predicate::str::contains("Heat"));

    assert_eq!(ok(root, &["note", "search", "films", "ali"]).trim(), "1\tAlien");

    tome(root)
        .args(["note", "show", "films", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status": "seen""#));
}

#[test]
fn chid_modes_reorder_notes() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    ok(root, &["table", "create", "queue"]);
    for name in ["a", "b", "c"] {
        ok(root, &["note", "new", "queue", "--name", name]);
    }

    tome(root)
        .args(["note", "chid", "queue", "3", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("occupied"));

    ok(root, &["note", "chid", "queue", "3", "1", "--insert"]);
    let listing = ok(root, &["note", "search", "queue", ""]);
    assert_eq!(listing, "1\tc\n2\ta\n3\tb\n");

    ok(root, &["note", "chid", "queue", "1", "3", "--swap"]);
    let listing = ok(root, &["note", "search", "queue", ""]);
    assert_eq!(listing, "1\tb\n2\ta\n3\tc\n");

    ok(root, &["note", "rm", "queue", "2"]);
    ok(root, &["note", "chid", "queue", "3", "2"]);
    assert!(root.join("queue").join("2.json").is_file());
    assert!(!root.join("queue").join("3.json").exists());
}

#[test]
fn bindings_span_modules_and_survive_renames() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    ok(root, &["table", "create", "media"]);
    ok(root, &["module", "create", "media", "films"]);
    ok(root, &["module", "create", "media", "books"]);
    ok(root, &["note", "new", "media/films"]);
    ok(root, &["note", "new", "media/films"]);
    ok(root, &["note", "new", "media/books"]);

    ok(root, &["bind", "media/films", "1", "2"]);
    ok(root, &["bind", "media/films", "1", "books-1"]);
    tome(root)
        .args(["bind", "media/films", "1", "books-9"])
        .assert()
        .failure();

    ok(root, &["module", "rename", "media", "books", "novels"]);
    let general = std::fs::read_to_string(root.join("media").join("general-binds.json")).unwrap();
    assert!(general.contains("novels-1"));
    assert!(!general.contains("books-1"));
    assert_eq!(
        ok(root, &["module", "list", "media"]),
        "films\tbase\tactive\nnovels\tbase\tactive\n"
    );

    ok(root, &["unbind", "media/films", "1", "novels-1"]);
    assert!(!root.join("media").join("general-binds.json").exists());
    assert!(root.join("media").join("films").join("binds.json").is_file());
}

#[test]
fn attachments_fill_declared_slots() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("store");
    let cover = tmp.path().join("cover.png");
    std::fs::write(&cover, b"png").unwrap();

    ok(&root, &["table", "create", "books", "--slot", "cover=Front cover"]);
    ok(&root, &["note", "new", "books"]);
    assert_eq!(
        ok(&root, &["attach", "books", "1", cover.to_str().unwrap(), "--slot", "cover"]).trim(),
        "cover.png"
    );
    let stored = root.join("books").join(".attachments").join("1").join("cover.png");
    assert!(stored.is_file());

    tome(&root)
        .args(["attach", "books", "1", cover.to_str().unwrap(), "--slot", "cover"])
        .assert()
        .failure();

    ok(&root, &["unattach", "books", "1", "--slot", "cover"]);
    assert!(!stored.exists());
}

#[test]
fn tables_rename_and_delete() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    ok(root, &["table", "create", "drafts"]);
    ok(root, &["table", "rename", "drafts", "notes"]);
    assert_eq!(ok(root, &["table", "list"]).trim(), "notes");
    ok(root, &["table", "delete", "notes"]);
    assert!(ok(root, &["table", "list"]).is_empty());

    tome(root)
        .args(["note", "list", "notes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("notes"));
}
