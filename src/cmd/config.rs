//! Configuration view and validation commands (`handover config`).

use anyhow::Result;

use handover::config::{HandoverConfig, HandoverToml, config_path, handover_dir};

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    let path = config_path(project_dir);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Handover Configuration");
            println!("======================");
            println!();

            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("No handover.toml found at {}", path.display());
                println!("Using default configuration.");
            }
            println!();

            let file = HandoverToml::load_or_default(project_dir)?;
            print_toml(&file);

            println!("Effective values (with env overrides):");
            let effective = HandoverConfig::load(project_dir)?;
            println!("  port = {}", effective.toml.server.port);
            match effective.db_path() {
                Some(db) => println!("  database = \"{}\"", db.display()),
                None => println!("  database = in-memory"),
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !path.exists() {
                println!("No handover.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = HandoverToml::load(&path)?;
            let warnings = toml.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if path.exists() {
                println!("handover.toml already exists at {}", path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(handover_dir(project_dir))?;
            HandoverToml::default().save(&path)?;

            println!("Created handover.toml at {}", path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] port, host, dev");
            println!("  - [store] path, ephemeral");
            println!("  - [plan] collection, document_id");
            println!();
        }
    }

    Ok(())
}

fn print_toml(toml: &HandoverToml) {
    println!("[server]");
    println!("  port = {}", toml.server.port);
    println!("  host = \"{}\"", toml.server.host);
    println!("  dev = {}", toml.server.dev);
    println!();
    println!("[store]");
    println!("  path = \"{}\"", toml.store.path.display());
    println!("  ephemeral = {}", toml.store.ephemeral);
    println!();
    println!("[plan]");
    println!("  collection = \"{}\"", toml.plan.collection);
    println!("  document_id = \"{}\"", toml.plan.document_id);
    println!();
}
