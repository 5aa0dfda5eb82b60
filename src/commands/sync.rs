use anyhow::Result;
use chrono::Utc;
use famsync_core::config::LoadedConfig;
use famsync_core::sync::SyncEngine;
use famsync_core::CancellationToken;
use owo_colors::OwoColorize;

use crate::render::{ChildSummaryRender, Render};
use crate::utils::tui;

pub async fn run(loaded: LoadedConfig, verbose: bool) -> Result<()> {
    let engine = SyncEngine::with_settings(super::backend(&loaded)?, loaded.engine);

    // Ctrl-C stops the pass between writes, never in the middle of one
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let spinner = tui::create_spinner("Syncing".to_string());
    let result = engine.run_pass(&loaded.sync, Utc::now(), &cancel).await;
    spinner.finish_and_clear();
    ctrl_c.abort();

    let summary = result?;

    for (i, child) in summary.children.iter().enumerate() {
        println!("{}", child.child.render());
        println!("{}", child.render_summary(verbose));

        if i < summary.children.len() - 1 {
            println!();
        }
    }

    let (created, updated, deleted) = summary.counts();
    if created > 0 || updated > 0 || deleted > 0 {
        println!(
            "\nSynced: {} created, {} updated, {} deleted",
            created, updated, deleted
        );
    }

    if summary.cancelled {
        println!("{}", "Sync cancelled, remaining changes will be applied next run".yellow());
    }

    if summary.has_errors() {
        anyhow::bail!("Sync finished with {} error(s)", summary.error_count());
    }

    Ok(())
}
