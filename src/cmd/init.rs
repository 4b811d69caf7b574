//! Project setup command (`handover init`).

use anyhow::{Context, Result};
use std::path::Path;

use handover::config::{HandoverConfig, HandoverToml, config_path, handover_dir};
use handover::dashboard::server::open_store;
use handover::plan::PlanMutator;
use handover::ui::icons::{SPARKLE, WARN};

/// Create `.handover/`, a default config file if missing, and the database
/// with a seeded (or repaired) transition plan.
pub async fn cmd_init(project_dir: &Path) -> Result<()> {
    let dir = handover_dir(project_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = config_path(project_dir);
    if !path.exists() {
        HandoverToml::default().save(&path)?;
        println!("{}Created {}", SPARKLE, path.display());
    }

    let config = HandoverConfig::load(project_dir)?;
    let Some(db_path) = config.db_path() else {
        println!(
            "{}store.ephemeral is set; nothing to initialize on disk.",
            WARN
        );
        return Ok(());
    };

    let store = open_store(Some(&db_path))?;
    let plan = PlanMutator::new(store, config.plan_location());
    let loaded = plan.load().await.context("Failed to load transition plan")?;

    if loaded.repaired {
        println!("{}Seeded transition plan in {}", SPARKLE, db_path.display());
    } else {
        println!("Transition plan already present in {}", db_path.display());
    }
    Ok(())
}
