//! Master key commands

use anyhow::{Context as _, Result};
use camino::Utf8Path;
use snapvault_secrets::MasterKey;

use crate::cli::{KeyCommands, KeyGenerateArgs};
use crate::context::Context;
use crate::output;

pub fn run(cmd: KeyCommands, config_dir: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        KeyCommands::Generate(args) => generate(args, config_dir),
    }
}

fn generate(args: KeyGenerateArgs, config_dir: Option<&Utf8Path>) -> Result<()> {
    let ctx = Context::load(config_dir)?;
    let key_file = ctx.key_file();

    MasterKey::generate()
        .write_key_file(&key_file, args.force)
        .with_context(|| {
            format!(
                "Failed to write key file {} (use --force to replace it)",
                key_file
            )
        })?;

    output::success(&format!("Generated master key at {}", key_file));
    if args.force {
        output::warning("Existing snapshots encrypted with the previous key can no longer be read");
    }
    Ok(())
}
