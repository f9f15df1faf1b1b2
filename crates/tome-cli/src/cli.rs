// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command-line grammar.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tome_core::{ChangeMode, Manifest, MetaRule, MetaValue, NoteId, BASE_TYPE};

/// File-backed tables of notes.
#[derive(Parser, Debug)]
#[command(name = "tome", author, version, about, long_about = None)]
pub struct Cli {
    /// Storage root (defaults to the config file, then the platform data dir).
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Log more: `-v` for info, `-vv` for debug.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, list, rename or delete tables.
    #[command(subcommand)]
    Table(TableCmd),
    /// Create, list, rename or delete the modules of a table.
    #[command(subcommand)]
    Module(ModuleCmd),
    /// Work with the notes of a collection.
    #[command(subcommand)]
    Note(NoteCmd),
    /// Bind CHILD under PARENT. `module-id` children bind across modules.
    Bind(BindArgs),
    /// Remove a binding.
    Unbind(BindArgs),
    /// Copy a file into a note's attachments.
    Attach {
        /// `table` or `table/module`.
        collection: String,
        id: NoteId,
        file: PathBuf,
        /// Store the file in this declared slot.
        #[arg(long)]
        slot: Option<String>,
        /// Replace whatever occupies the slot or shares the file name.
        #[arg(long)]
        overwrite: bool,
    },
    /// Remove an attachment by file name, or whatever fills `--slot`.
    Unattach {
        /// `table` or `table/module`.
        collection: String,
        id: NoteId,
        #[arg(required_unless_present = "slot")]
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        slot: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TableCmd {
    /// Create a table.
    Create {
        name: String,
        #[command(flatten)]
        opts: CollectionOpts,
    },
    /// List tables.
    List,
    /// Delete a table with all its modules and notes.
    Delete { name: String },
    /// Rename a table.
    Rename { old: String, new: String },
}

#[derive(Subcommand, Debug)]
pub enum ModuleCmd {
    /// Create a module, declaring it in the table first if needed.
    Create {
        table: String,
        name: String,
        #[command(flatten)]
        opts: CollectionOpts,
    },
    /// List declared modules and whether they are active.
    List { table: String },
    /// Delete a module's directory.
    Delete {
        table: String,
        name: String,
        /// Also drop the declaration from the table manifest.
        #[arg(long)]
        forget: bool,
    },
    /// Rename a module; general bindings follow.
    Rename {
        table: String,
        old: String,
        new: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum NoteCmd {
    /// Create a note and print its id.
    New {
        collection: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a note as JSON.
    Show { collection: String, id: NoteId },
    /// Tabulate the notes of a collection.
    List { collection: String },
    /// Delete a note and its attachments.
    Rm { collection: String, id: NoteId },
    /// Set a note's name; omit NAME to clear it.
    Name {
        collection: String,
        id: NoteId,
        name: Option<String>,
    },
    /// Print, set or unset a metainfo field.
    Meta {
        collection: String,
        id: NoteId,
        key: String,
        /// New value; `true`/`false` and numbers are typed.
        value: Option<String>,
        #[arg(long, conflicts_with = "value")]
        unset: bool,
    },
    /// Case-insensitive search over names and text metainfo.
    Search { collection: String, query: String },
    /// Change a note's id.
    Chid {
        collection: String,
        source: NoteId,
        target: NoteId,
        /// Replace an occupied target.
        #[arg(long, conflicts_with_all = ["swap", "insert"])]
        overwrite: bool,
        /// Exchange ids with an occupied target.
        #[arg(long, conflicts_with = "insert")]
        swap: bool,
        /// Shift the run of ids starting at the target up by one.
        #[arg(long)]
        insert: bool,
    },
}

#[derive(Args, Debug)]
pub struct BindArgs {
    /// `table` or `table/module`.
    pub collection: String,
    pub parent: NoteId,
    /// Local id, or `module-id` for a note of a sibling module.
    pub child: String,
}

/// Manifest options accepted at creation time.
#[derive(Args, Debug)]
pub struct CollectionOpts {
    /// Schema type tag.
    #[arg(long = "type", default_value = BASE_TYPE)]
    pub type_tag: String,
    /// Fill id gaps when allocating.
    #[arg(long)]
    pub recycle: bool,
    /// Give notes an attachment store.
    #[arg(long)]
    pub attachments: bool,
    /// Declare a slot as `NAME` or `NAME=DESCRIPTION`; implies `--attachments`.
    #[arg(long = "slot", value_name = "NAME[=DESC]")]
    pub slots: Vec<String>,
    /// Allow attachments outside any slot; implies `--attachments`.
    #[arg(long)]
    pub unslotted: bool,
    /// Restrict a metainfo field as `FIELD=a,b,c`; bare `FIELD` admits anything.
    #[arg(long = "rule", value_name = "FIELD[=VALUES]")]
    pub rules: Vec<String>,
}

impl CollectionOpts {
    /// Apply the options to a fresh manifest.
    pub fn apply(&self, manifest: &mut Manifest) -> tome_core::Result<()> {
        if self.recycle {
            manifest.set_recycle_id(true)?;
        }
        if self.attachments || self.unslotted || !self.slots.is_empty() {
            manifest.set_attachments_enabled(true)?;
        }
        for slot in &self.slots {
            let (name, description) = slot.split_once('=').unwrap_or((slot.as_str(), ""));
            manifest.declare_slot(name, description)?;
        }
        if self.unslotted {
            manifest.set_unslotted_allowed(true)?;
        }
        for rule in &self.rules {
            match rule.split_once('=') {
                Some((field, values)) => {
                    let allowed = values.split(',').map(MetaValue::parse_loose).collect();
                    manifest.set_meta_rule(field, MetaRule::OneOf(allowed))?;
                }
                None => manifest.set_meta_rule(rule.as_str(), MetaRule::Any)?,
            }
        }
        Ok(())
    }
}

/// Mode selected by the `chid` flags.
pub const fn change_mode(overwrite: bool, swap: bool, insert: bool) -> ChangeMode {
    if overwrite {
        ChangeMode::Overwrite
    } else if swap {
        ChangeMode::Swap
    } else if insert {
        ChangeMode::Insert
    } else {
        ChangeMode::None
    }
}
