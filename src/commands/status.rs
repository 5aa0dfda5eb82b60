use anyhow::Result;
use chrono::Utc;
use famsync_core::config::LoadedConfig;
use famsync_core::sync::SyncEngine;
use famsync_core::CancellationToken;
use owo_colors::OwoColorize;

use crate::render::{ChildDiffRender, Render};
use crate::utils::tui;

pub async fn run(loaded: LoadedConfig, verbose: bool) -> Result<()> {
    let engine = SyncEngine::with_settings(super::backend(&loaded)?, loaded.engine);

    let spinner = tui::create_spinner("Reading calendars".to_string());
    let result = engine
        .plan_pass(&loaded.sync, Utc::now(), &CancellationToken::new())
        .await;
    spinner.finish_and_clear();

    let plan = result?;

    for (i, child) in plan.children.iter().enumerate() {
        println!("{}", child.child.render());

        if let Some(diff) = &child.diff {
            println!("{}", diff.render(verbose));
        }
        for failure in &child.summary.failures {
            println!("   {}", failure.error.to_string().red());
        }

        if i < plan.children.len() - 1 {
            println!();
        }
    }

    Ok(())
}
