//! Similarity search command.

use anyhow::{Context, Result};
use console::style;

use recall_observe::spans::SPAN_SEARCH;
use tracing::Instrument;

use crate::state::AppState;

/// Parse an embedding given on the command line as a JSON array.
pub fn parse_embedding(raw: &str) -> Result<Vec<f32>> {
    serde_json::from_str(raw).context("embedding must be a JSON array of numbers")
}

/// Print the stored turns most similar to the given embedding.
pub async fn search(state: &AppState, embedding: &str, user: &str, json: bool) -> Result<()> {
    let embedding = parse_embedding(embedding)?;
    let matches = state
        .retriever
        .search(&embedding, user)
        .instrument(tracing::info_span!(SPAN_SEARCH, dimensions = embedding.len()))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    println!();
    if matches.is_empty() {
        println!("  {}", style("No similar turns found.").dim());
        println!();
        return Ok(());
    }

    for ranked in &matches {
        let label = ranked
            .turn
            .classification_id
            .map(|id| match id.label() {
                Some(label) => label.as_str().to_string(),
                None => format!("#{id}"),
            })
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  {:<12} {:<10} {}",
            style(format!("{:.3}", ranked.similarity)).cyan(),
            ranked.turn.turn_id,
            ranked.turn.role,
            style(label).dim()
        );
        if !ranked.turn.content.is_empty() {
            println!("         {}", ranked.turn.content);
        }
    }
    println!();

    Ok(())
}
