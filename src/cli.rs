use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;

use crate::config;
use crate::journal::Journal;
use crate::mapping::UserMap;
use crate::migrate::{CancelFlag, MigrationContext, MigrationRun};
use crate::model::item::WorkItemKind;
use crate::providers::snapshot::{SnapshotDestination, SnapshotSource};

#[derive(Debug, PartialEq)]
pub struct MigrateArgs {
    pub source_project: String,
    pub destination_project: String,
    pub from: PathBuf,
    pub to: PathBuf,
    pub collection_uri: Option<String>,
}

/// Run a migration from a snapshot export into a destination directory.
pub async fn handle_migrate(args: &[String]) -> Result<()> {
    let parsed = parse_migrate_args(args)?;

    let config = config::load_config()?;
    let base_uri = match parsed
        .collection_uri
        .or(config.collection.map(|c| c.base_uri))
    {
        Some(uri) => uri,
        None => bail!(
            "No collection base URI configured. Pass --collection-uri or set [collection] base_uri in ~/.caseport/config.toml"
        ),
    };

    let source = SnapshotSource::load(&parsed.from)?;
    let destination = SnapshotDestination::create(&parsed.to)?;

    let journal = Journal::open_default();
    let journal_path = journal.path().to_path_buf();
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();

    // Ctrl-C stops the run at the next item boundary instead of mid-save.
    let cancel = CancelFlag::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    let migration = MigrationRun {
        source: Arc::new(source),
        destination: Arc::new(destination),
        users: UserMap::from_table(config.users),
        journal,
        status_tx,
        cancel,
    };
    let ctx = MigrationContext {
        source_project: parsed.source_project,
        destination_project: parsed.destination_project,
        collection_base_uri: base_uri,
    };

    // The run executes off the caller's task; statuses stream back here.
    let handle = tokio::spawn(async move { migration.run(&ctx).await });
    while let Some(update) = status_rx.recv().await {
        println!("{update}");
    }

    let summary = handle.await.context("migration task failed")?;
    if summary.failed_total() > 0 {
        println!(
            "Some items failed to migrate; see {} for details.",
            journal_path.display()
        );
    }
    Ok(())
}

pub fn parse_migrate_args(args: &[String]) -> Result<MigrateArgs> {
    let mut positional: Vec<String> = Vec::new();
    let mut from: Option<PathBuf> = None;
    let mut to: Option<PathBuf> = None;
    let mut collection_uri: Option<String> = None;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--from" => {
                i += 1;
                match args.get(i) {
                    Some(value) => from = Some(PathBuf::from(value)),
                    None => bail!("Missing value for --from flag"),
                }
            }
            "--to" => {
                i += 1;
                match args.get(i) {
                    Some(value) => to = Some(PathBuf::from(value)),
                    None => bail!("Missing value for --to flag"),
                }
            }
            "--collection-uri" => {
                i += 1;
                match args.get(i) {
                    Some(value) => collection_uri = Some(value.clone()),
                    None => bail!("Missing value for --collection-uri flag"),
                }
            }
            flag if flag.starts_with("--") => bail!("Unknown flag: {flag}"),
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }

    if positional.len() != 2 {
        bail!(
            "Usage: caseport migrate <source-project> <destination-project> --from <export.json> --to <out-dir> [--collection-uri <uri>]"
        );
    }
    let Some(from) = from else {
        bail!("Missing --from <export.json>");
    };
    let Some(to) = to else {
        bail!("Missing --to <out-dir>");
    };

    let mut positional = positional.into_iter();
    Ok(MigrateArgs {
        source_project: positional.next().unwrap_or_default(),
        destination_project: positional.next().unwrap_or_default(),
        from,
        to,
        collection_uri,
    })
}

/// Print recent run journal entries.
pub fn handle_log(args: &[String]) -> Result<()> {
    let (kind, limit) = parse_log_args(args)?;
    let journal = Journal::open_default();
    let events = journal.read(kind, Some(limit));

    if events.is_empty() {
        println!("No journal entries at {}", journal.path().display());
        return Ok(());
    }
    for event in events {
        let mut line = format!("{} {} {}", event.timestamp, event.kind, event.event);
        if let Some(id) = event.item_id {
            line.push_str(&format!(" {id}"));
        }
        if let Some(title) = &event.item_title {
            line.push_str(&format!(": {title}"));
        }
        if let Some(message) = &event.message {
            line.push_str(&format!(" — {message}"));
        }
        println!("{line}");
    }
    Ok(())
}

pub fn parse_log_args(args: &[String]) -> Result<(Option<WorkItemKind>, usize)> {
    let mut kind = None;
    let mut limit = 50;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--limit" | "-n" => {
                i += 1;
                let value = args.get(i).map(String::as_str);
                match value.and_then(|v| v.parse::<usize>().ok()) {
                    Some(n) => limit = n,
                    None => bail!("--limit expects a number"),
                }
            }
            "--kind" => {
                i += 1;
                match args.get(i).map(String::as_str) {
                    Some("shared-steps") => kind = Some(WorkItemKind::SharedStep),
                    Some("test-cases") => kind = Some(WorkItemKind::TestCase),
                    _ => bail!("--kind expects shared-steps or test-cases"),
                }
            }
            other => bail!("Unknown argument: {other}"),
        }
        i += 1;
    }

    Ok((kind, limit))
}

pub fn print_help() {
    println!("caseport — migrate shared steps and test cases between tracker projects\n");
    println!("USAGE:");
    println!("  caseport migrate <source-project> <destination-project> --from <export.json> --to <out-dir> [--collection-uri <uri>]");
    println!("  caseport log [--limit <n>] [--kind shared-steps|test-cases]");
    println!();
    println!("Shared steps migrate first so test cases can point their shared-step");
    println!("references at the newly assigned destination ids.");
    println!();
    println!("CONFIG (~/.caseport/config.toml):");
    println!("  [collection] base_uri — destination collection URI for origin breadcrumbs");
    println!("  [users]               — source to destination assignee display names");
}
