//! Plan inspection commands (`handover plan show|repair`).

use anyhow::{Context, Result};
use std::path::Path;

use handover::config::HandoverConfig;
use handover::dashboard::server::open_store;
use handover::plan::{PlanMutator, TransitionPlan, loader};
use handover::ui::icons::{CALENDAR, DONE, OPEN, SPARKLE};

use super::super::PlanCommands;

pub async fn cmd_plan(project_dir: &Path, command: PlanCommands) -> Result<()> {
    let config = HandoverConfig::load(project_dir)?;
    let store = open_store(config.db_path().as_deref())?;
    let plan = PlanMutator::new(store.clone(), config.plan_location());

    match command {
        PlanCommands::Show => {
            let loaded = plan.load().await.context("Failed to load transition plan")?;
            if loaded.repaired {
                println!("{}Plan was missing or damaged and has been reset.", SPARKLE);
            }
            print_plan(&loaded.plan);
        }
        PlanCommands::Repair => {
            let version = loader::write_default(store.as_ref(), plan.location())
                .await
                .context("Failed to reset transition plan")?;
            println!(
                "{}Transition plan reset to the default template (version {}).",
                SPARKLE, version
            );
        }
    }
    Ok(())
}

fn print_plan(plan: &TransitionPlan) {
    println!();
    println!("{}", console::style(&plan.title).bold().cyan());
    for (_, week) in plan.sorted_weeks() {
        let done = week.action_items.iter().filter(|i| i.completed).count();
        println!();
        println!(
            "{} {} {}",
            console::style(&week.title).bold(),
            console::style(format!("({}/{})", done, week.action_items.len())).dim(),
            week.focus
        );
        for item in &week.action_items {
            let mark = if item.completed { &DONE } else { &OPEN };
            let date = if item.target_date.is_empty() {
                String::new()
            } else {
                format!("  {}{}", CALENDAR, item.target_date)
            };
            println!("  {}{}{}", mark, item.text, date);
        }
        for line in &week.learning_focus {
            println!("  {} {}", console::style("›").dim(), console::style(line).italic());
        }
    }
    println!();
}
