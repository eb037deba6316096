//! Rollback command

use anyhow::{anyhow, Result};
use camino::Utf8Path;

use crate::cli::RollbackArgs;
use crate::context::Context;
use crate::output;

pub async fn run(args: RollbackArgs, config_dir: Option<&Utf8Path>) -> Result<()> {
    let ctx = Context::load(config_dir)?;
    let service = ctx.open_service().await?;

    let spinner = output::spinner("Rolling back configuration...");
    let result = match args.id {
        Some(id) => service.rollback_to(id).await.map(|_| id),
        None => service.rollback().await,
    };
    spinner.finish_and_clear();

    match result {
        Ok(id) => {
            output::success(&format!("Rolled back to snapshot {}", id));
            Ok(())
        }
        Err(e) if e.is_partial_success() => {
            for pid in e.failed_pids() {
                output::warning(&format!("Not restored: {}", pid));
            }
            Err(anyhow!(e))
        }
        Err(e) => Err(anyhow!(e).context("Rollback failed")),
    }
}
