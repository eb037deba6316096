//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Snapvault - versioned, encrypted configuration snapshots
#[derive(Parser, Debug)]
#[command(name = "snapvault")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration directory (defaults to ~/.snapvault)
    #[arg(long, global = true, env = "SNAPVAULT_CONFIG_DIR")]
    pub config_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Snapshot management
    #[command(subcommand)]
    Snapshot(SnapshotCommands),

    /// Roll back to a previous snapshot
    Rollback(RollbackArgs),

    /// Component configuration management
    #[command(subcommand)]
    Component(ComponentCommands),

    /// Master key management
    #[command(subcommand)]
    Key(KeyCommands),
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Snapshot commands
#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// List snapshot ids
    List(SnapshotListArgs),

    /// Show the contents of a snapshot
    Show(SnapshotShowArgs),

    /// Take a snapshot of the current configuration
    Take,

    /// Delete snapshots beyond the retention count
    Gc,

    /// Encrypt legacy plaintext snapshots in place
    Migrate,
}

#[derive(Args, Debug)]
pub struct SnapshotListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SnapshotShowArgs {
    /// Snapshot id
    pub id: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Rollback command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Snapshot to roll back to (defaults to the second most recent)
    #[arg(long)]
    pub id: Option<u64>,
}

// Component commands
#[derive(Subcommand, Debug)]
pub enum ComponentCommands {
    /// List configured components
    List,

    /// Show the configuration of a component
    Get(ComponentGetArgs),

    /// Create a factory instance
    Create(ComponentCreateArgs),

    /// Update the configuration of a component
    Update(ComponentUpdateArgs),

    /// Delete a factory instance
    Delete(ComponentDeleteArgs),
}

#[derive(Args, Debug)]
pub struct ComponentGetArgs {
    /// Component pid
    pub pid: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Property assignments shared by create and update
#[derive(Args, Debug)]
pub struct PropertyArgs {
    /// Set a property (KEY=VALUE, typed: booleans, integers, decimals, text)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Set a secret property (KEY=VALUE)
    #[arg(long = "secret", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub secret: Vec<(String, String)>,

    /// Do not take a snapshot afterwards
    #[arg(long)]
    pub no_snapshot: bool,
}

#[derive(Args, Debug)]
pub struct ComponentCreateArgs {
    /// Factory to instantiate
    #[arg(long)]
    pub factory: String,

    /// Pid of the new instance
    #[arg(long)]
    pub pid: String,

    #[command(flatten)]
    pub properties: PropertyArgs,
}

#[derive(Args, Debug)]
pub struct ComponentUpdateArgs {
    /// Component pid
    pub pid: String,

    #[command(flatten)]
    pub properties: PropertyArgs,
}

#[derive(Args, Debug)]
pub struct ComponentDeleteArgs {
    /// Component pid
    pub pid: String,

    /// Do not take a snapshot afterwards
    #[arg(long)]
    pub no_snapshot: bool,
}

// Key commands
#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Generate a new master key file
    Generate(KeyGenerateArgs),
}

#[derive(Args, Debug)]
pub struct KeyGenerateArgs {
    /// Overwrite an existing key file
    #[arg(short, long)]
    pub force: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
