//! System status command.

use anyhow::Result;
use console::style;

use recall_core::classify::Classifier;
use recall_core::persistence::TurnRepository;

use crate::state::AppState;

/// Display version, storage and cache configuration.
///
/// The pending count only covers this process; a separate `serve`
/// instance keeps its own cache.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let stored = state.pipeline.repository().count_turns().await?;
    let policy = state.cache.policy();
    let classifier = state.pipeline.classifier().name().to_string();
    let db_path = state.data_dir.join(&state.config.database_file);

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "database": db_path.display().to_string(),
            "stored_turns": stored,
            "classifier": classifier,
            "cache": {
                "pending": state.cache.len(),
                "ttl_secs": policy.ttl.map(|ttl| ttl.as_secs()),
                "max_entries": policy.max_entries,
            },
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Recall v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Storage ──").dim());
    println!("  Data dir:   {}", style(state.data_dir.display()).dim());
    println!("  Database:   {}", style(db_path.display()).dim());
    println!("  Turns:      {}", style(stored).bold());
    println!();

    println!("  {}", style("── Pipeline ──").dim());
    println!("  Classifier: {}", style(classifier).cyan());
    let ttl = match policy.ttl {
        Some(ttl) => format!("{}s", ttl.as_secs()),
        None => "never".to_string(),
    };
    let max = match policy.max_entries {
        Some(max) => max.to_string(),
        None => "unbounded".to_string(),
    };
    println!("  Cache TTL:  {ttl}");
    println!("  Cache max:  {max}");
    println!();

    Ok(())
}
