//! Component commands

use anyhow::{anyhow, Context as _, Result};
use camino::Utf8Path;
use snapvault_core::{Properties, PropertyValue};
use snapvault_service::ConfigurationService;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::{
    ComponentCommands, ComponentCreateArgs, ComponentDeleteArgs, ComponentGetArgs,
    ComponentUpdateArgs, PropertyArgs,
};
use crate::commands::snapshot::print_configuration;
use crate::context::Context;
use crate::output;

pub async fn run(cmd: ComponentCommands, config_dir: Option<&Utf8Path>) -> Result<()> {
    let ctx = Context::load(config_dir)?;
    let service = ctx.open_service().await?;

    match cmd {
        ComponentCommands::List => list(&service).await,
        ComponentCommands::Get(args) => get(&service, args).await,
        ComponentCommands::Create(args) => create(&service, args).await,
        ComponentCommands::Update(args) => update(&service, args).await,
        ComponentCommands::Delete(args) => delete(&service, args).await,
    }
}

#[derive(Tabled)]
struct ComponentRow {
    pid: String,
    factory: String,
    properties: usize,
}

async fn list(service: &ConfigurationService) -> Result<()> {
    let configs = service.component_configurations().await?;
    if configs.is_empty() {
        output::warning("No components configured");
        return Ok(());
    }

    let rows: Vec<ComponentRow> = configs
        .into_iter()
        .map(|config| ComponentRow {
            factory: config.factory_pid.unwrap_or_else(|| "-".to_string()),
            properties: config.properties.len(),
            pid: config.pid,
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

async fn get(service: &ConfigurationService, args: ComponentGetArgs) -> Result<()> {
    let config = service
        .component_configuration(&args.pid)
        .await?
        .ok_or_else(|| anyhow!("Unknown component: {}", args.pid))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print_configuration(&config);
    }
    Ok(())
}

async fn create(service: &ConfigurationService, args: ComponentCreateArgs) -> Result<()> {
    let properties = build_properties(&args.properties);
    service
        .create_factory_configuration(
            &args.factory,
            &args.pid,
            Some(properties),
            !args.properties.no_snapshot,
        )
        .await
        .with_context(|| format!("Failed to create {}", args.pid))?;

    output::success(&format!("Created {} from {}", args.pid, args.factory));
    Ok(())
}

async fn update(service: &ConfigurationService, args: ComponentUpdateArgs) -> Result<()> {
    if service.component_configuration(&args.pid).await?.is_none() {
        return Err(anyhow!("Unknown component: {}", args.pid));
    }

    let properties = build_properties(&args.properties);
    if properties.is_empty() {
        output::info("Nothing to update");
        return Ok(());
    }

    service
        .update_configuration(&args.pid, properties, !args.properties.no_snapshot)
        .await
        .with_context(|| format!("Failed to update {}", args.pid))?;

    output::success(&format!("Updated {}", args.pid));
    Ok(())
}

async fn delete(service: &ConfigurationService, args: ComponentDeleteArgs) -> Result<()> {
    let config = service
        .component_configuration(&args.pid)
        .await?
        .ok_or_else(|| anyhow!("Unknown component: {}", args.pid))?;
    if config.factory_pid.is_none() {
        output::warning(&format!(
            "{} is not a factory instance and cannot be deleted",
            args.pid
        ));
        return Ok(());
    }

    service
        .delete_factory_configuration(&args.pid, !args.no_snapshot)
        .await
        .with_context(|| format!("Failed to delete {}", args.pid))?;

    output::success(&format!("Deleted {}", args.pid));
    Ok(())
}

fn build_properties(args: &PropertyArgs) -> Properties {
    let mut properties = Properties::new();
    for (key, raw) in &args.set {
        properties.insert(key.clone(), parse_value(raw));
    }
    for (key, raw) in &args.secret {
        properties.insert(key.clone(), PropertyValue::password(raw.as_str()));
    }
    properties
}

/// Infer a typed value from command-line text
fn parse_value(raw: &str) -> PropertyValue {
    if raw == "true" || raw == "false" {
        return PropertyValue::Boolean(raw == "true");
    }
    if let Ok(value) = raw.parse::<i32>() {
        return PropertyValue::Integer(value);
    }
    if let Ok(value) = raw.parse::<i64>() {
        return PropertyValue::Long(value);
    }
    if raw.contains('.') {
        if let Ok(value) = raw.parse::<f64>() {
            if value.is_finite() {
                return PropertyValue::Double(value);
            }
        }
    }
    PropertyValue::String(raw.to_string())
}
