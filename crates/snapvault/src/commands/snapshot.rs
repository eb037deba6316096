//! Snapshot commands

use anyhow::{Context as _, Result};
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use snapvault_core::ComponentConfiguration;
use snapvault_secrets::mask_secrets;
use snapvault_store::BASELINE_ID;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::{SnapshotCommands, SnapshotListArgs, SnapshotShowArgs};
use crate::context::Context;
use crate::output;

pub async fn run(cmd: SnapshotCommands, config_dir: Option<&Utf8Path>) -> Result<()> {
    let ctx = Context::load(config_dir)?;
    match cmd {
        SnapshotCommands::List(args) => list(&ctx, args),
        SnapshotCommands::Show(args) => show(&ctx, args),
        SnapshotCommands::Take => take(&ctx).await,
        SnapshotCommands::Gc => gc(&ctx),
        SnapshotCommands::Migrate => migrate(&ctx),
    }
}

#[derive(Tabled, Serialize)]
struct SnapshotRow {
    id: u64,
    kind: &'static str,
    taken: String,
}

impl SnapshotRow {
    fn new(id: u64) -> Self {
        let kind = if id == BASELINE_ID { "baseline" } else { "snapshot" };
        Self {
            id,
            kind,
            taken: describe_timestamp(id),
        }
    }
}

/// Snapshot ids are allocated from the wall clock in milliseconds
fn describe_timestamp(id: u64) -> String {
    if id == BASELINE_ID {
        return "-".to_string();
    }
    i64::try_from(id)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn list(ctx: &Context, args: SnapshotListArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let rows: Vec<SnapshotRow> = store
        .snapshot_ids()
        .into_iter()
        .rev()
        .map(SnapshotRow::new)
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        output::warning(&format!("No snapshots in {}", store.dir()));
        return Ok(());
    }

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

fn show(ctx: &Context, args: SnapshotShowArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let mut configs = store
        .load(args.id)
        .with_context(|| format!("Failed to load snapshot {}", args.id))?;
    for config in configs.iter_mut() {
        mask_secrets(&mut config.properties);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&configs)?);
        return Ok(());
    }

    output::header(&format!("Snapshot {}", args.id));
    output::kv("Taken", &describe_timestamp(args.id));
    output::kv("Components", &configs.len().to_string());
    for config in &configs {
        print_configuration(config);
    }
    Ok(())
}

/// Print one configuration as a header and key-value lines
pub fn print_configuration(config: &ComponentConfiguration) {
    output::header(&config.pid);
    if let Some(factory_pid) = &config.factory_pid {
        output::kv("factory", factory_pid);
    }
    for (key, value) in &config.properties {
        output::kv(key, &value.to_string());
    }
}

async fn take(ctx: &Context) -> Result<()> {
    let service = ctx.open_service().await?;
    let id = service.snapshot().await.context("Failed to take snapshot")?;
    output::success(&format!("Saved snapshot {}", id));
    Ok(())
}

fn gc(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let deleted = store
        .collect_garbage()
        .context("Failed to collect old snapshots")?;

    if deleted.is_empty() {
        output::info(&format!(
            "Nothing to delete (keeping up to {} snapshots)",
            store.max_count()
        ));
    } else {
        for id in &deleted {
            output::kv("deleted", &id.to_string());
        }
        output::success(&format!("Deleted {} snapshots", deleted.len()));
    }
    Ok(())
}

fn migrate(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;

    let spinner = output::spinner("Encrypting plaintext snapshots...");
    let result = store.encrypt_plain_snapshots();
    spinner.finish_and_clear();

    let migrated = result.context("Failed to migrate snapshots")?;
    output::success(&format!("Encrypted {} plaintext snapshots", migrated));
    Ok(())
}
