// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `tome`: command-line front end for a tome storage root.
//!
//! Collections are addressed as `table` or `table/module`; notes by id.
//!
//! # Usage
//! ```text
//! tome [--root DIR] [-v...] <command> [options]
//! ```
//!
//! Exit code `0` on success, non-zero with the error chain on stderr
//! otherwise. Logs go to stderr; results go to stdout.

// The CLI is expected to print to stdout.
#![allow(clippy::print_stdout)]

mod cli;
mod config;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use tome_core::{Collection, GlobalRef, MetaValue, NoteId, Session, TypeRegistry};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use crate::cli::{change_mode, BindArgs, Cli, Command, ModuleCmd, NoteCmd, TableCmd};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    let root = config::resolve_root(cli.root)?;
    debug!(root = %root.display(), "resolved storage root");
    let session = Session::mount_or_create(&root, TypeRegistry::default())
        .with_context(|| format!("mounting storage root {}", root.display()))?;
    run(&session, cli.command)
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing log subscriber")
}

fn run(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Table(cmd) => table(session, cmd),
        Command::Module(cmd) => module(session, cmd),
        Command::Note(cmd) => note(session, cmd),
        Command::Bind(args) => bind(session, &args, true),
        Command::Unbind(args) => bind(session, &args, false),
        Command::Attach {
            collection,
            id,
            file,
            slot,
            overwrite,
        } => {
            let mut coll = open(session, &collection)?;
            let stored = coll
                .note_mut(id)?
                .attach(&file, slot.as_deref(), overwrite)
                .with_context(|| format!("attaching {} to note {id}", file.display()))?;
            println!("{stored}");
            Ok(())
        }
        Command::Unattach {
            collection,
            id,
            name,
            slot,
        } => {
            let mut coll = open(session, &collection)?;
            let mut note = coll.note_mut(id)?;
            match (name, slot) {
                (_, Some(slot)) => {
                    note.clear_slot(&slot)
                        .with_context(|| format!("clearing slot `{slot}` of note {id}"))?;
                }
                (Some(name), None) => {
                    note.unattach(&name)
                        .with_context(|| format!("removing `{name}` from note {id}"))?;
                }
                (None, None) => anyhow::bail!("name an attachment or pass --slot"),
            }
            Ok(())
        }
    }
}

fn open(session: &Session, path: &str) -> Result<Collection> {
    session
        .open_path(path)
        .with_context(|| format!("opening collection `{path}`"))
}

fn table(session: &Session, cmd: TableCmd) -> Result<()> {
    match cmd {
        TableCmd::Create { name, opts } => {
            session
                .create_table(&name, &opts.type_tag, |m| opts.apply(m))
                .with_context(|| format!("creating table `{name}`"))?;
        }
        TableCmd::List => {
            for name in session.tables()? {
                println!("{name}");
            }
        }
        TableCmd::Delete { name } => {
            session
                .delete_table(&name)
                .with_context(|| format!("deleting table `{name}`"))?;
        }
        TableCmd::Rename { old, new } => {
            session
                .rename_table(&old, &new)
                .with_context(|| format!("renaming table `{old}` to `{new}`"))?;
        }
    }
    Ok(())
}

fn module(session: &Session, cmd: ModuleCmd) -> Result<()> {
    match cmd {
        ModuleCmd::Create { table, name, opts } => {
            session
                .create_module(&table, &name, &opts.type_tag, |m| opts.apply(m))
                .with_context(|| format!("creating module `{table}/{name}`"))?;
        }
        ModuleCmd::List { table } => {
            for status in session.modules(&table)? {
                let state = if status.active { "active" } else { "inactive" };
                println!("{}\t{}\t{state}", status.decl.name, status.decl.type_tag);
            }
        }
        ModuleCmd::Delete {
            table,
            name,
            forget,
        } => {
            session
                .delete_module(&table, &name, forget)
                .with_context(|| format!("deleting module `{table}/{name}`"))?;
        }
        ModuleCmd::Rename { table, old, new } => {
            session
                .rename_module(&table, &old, &new)
                .with_context(|| format!("renaming module `{table}/{old}` to `{new}`"))?;
        }
    }
    Ok(())
}

fn note(session: &Session, cmd: NoteCmd) -> Result<()> {
    match cmd {
        NoteCmd::New { collection, name } => {
            let mut coll = open(session, &collection)?;
            let id = coll.create_note()?;
            if name.is_some() {
                coll.note_mut(id)?.set_name(name)?;
            }
            println!("{id}");
        }
        NoteCmd::Show { collection, id } => {
            let coll = open(session, &collection)?;
            println!("{}", render::note_json(coll.note(id)?)?);
        }
        NoteCmd::List { collection } => {
            let coll = open(session, &collection)?;
            println!("{}", render::note_table(&coll));
        }
        NoteCmd::Rm { collection, id } => {
            open(session, &collection)?
                .delete_note(id)
                .with_context(|| format!("deleting note {id}"))?;
        }
        NoteCmd::Name {
            collection,
            id,
            name,
        } => {
            open(session, &collection)?.note_mut(id)?.set_name(name)?;
        }
        NoteCmd::Meta {
            collection,
            id,
            key,
            value,
            unset,
        } => {
            let mut coll = open(session, &collection)?;
            let mut note = coll.note_mut(id)?;
            if unset {
                note.remove_meta(&key)?;
            } else if let Some(raw) = value {
                note.set_meta(key, MetaValue::parse_loose(&raw))?;
            } else if let Some(current) = note.note().meta(&key) {
                println!("{current}");
            }
        }
        NoteCmd::Search { collection, query } => {
            let coll = open(session, &collection)?;
            for id in coll.search(&query) {
                let name = coll.note(id)?.name().unwrap_or_default();
                println!("{id}\t{name}");
            }
        }
        NoteCmd::Chid {
            collection,
            source,
            target,
            overwrite,
            swap,
            insert,
        } => {
            let mode = change_mode(overwrite, swap, insert);
            open(session, &collection)?
                .change_id(source, target, mode)
                .with_context(|| format!("moving note {source} to {target} ({mode})"))?;
        }
    }
    Ok(())
}

fn bind(session: &Session, args: &BindArgs, link: bool) -> Result<()> {
    let mut coll = open(session, &args.collection)?;
    if let Ok(child) = args.child.parse::<NoteId>() {
        if link {
            coll.bind(args.parent, child)?;
        } else {
            coll.unbind(args.parent, child)?;
        }
        return Ok(());
    }
    let child: GlobalRef = args
        .child
        .parse()
        .with_context(|| format!("`{}` is neither an id nor `module-id`", args.child))?;
    let table = coll.location().table_name().to_string();
    if link {
        coll.bind_general(args.parent, &child, &session.siblings(&table))?;
    } else {
        coll.unbind_general(args.parent, &child)?;
    }
    Ok(())
}

