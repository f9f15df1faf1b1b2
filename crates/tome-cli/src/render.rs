// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Terminal rendering of notes.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde_json::Value;
use tome_core::{Collection, Note};

/// Table of every note, limited to the manifest's visible columns.
pub fn note_table(collection: &Collection) -> Table {
    let columns = collection.manifest().visible_columns();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(&columns);
    for note in collection.notes() {
        table.add_row(columns.iter().map(|column| cell(note, column)));
    }
    table
}

/// Value of `column` for `note`; metainfo wins over payload fields.
fn cell(note: &Note, column: &str) -> String {
    match column {
        "id" => note.id().to_string(),
        "name" => note.name().unwrap_or_default().to_string(),
        other => note
            .meta(other)
            .map(ToString::to_string)
            .or_else(|| note.field(other).map(plain))
            .unwrap_or_default(),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Note document as pretty JSON, with its id added.
pub fn note_json(note: &Note) -> serde_json::Result<String> {
    let mut out = serde_json::Map::new();
    out.insert("id".into(), Value::from(note.id().get()));
    if let Value::Object(body) = serde_json::to_value(note.doc())? {
        out.extend(body);
    }
    serde_json::to_string_pretty(&Value::Object(out))
}
