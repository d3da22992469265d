//! Stored turn inspection commands: `show` and `session`.

use anyhow::{bail, Result};
use console::style;
use uuid::Uuid;

use recall_core::persistence::TurnRepository;
use recall_types::turn::{ConversationTurn, TurnId};

use crate::state::AppState;

/// Show the latest stored copy of a turn.
pub async fn show_turn(state: &AppState, turn_id: &str, json: bool) -> Result<()> {
    let turn_id = TurnId::from(turn_id);
    let Some(turn) = state.pipeline.repository().get_turn(&turn_id).await? else {
        bail!("turn '{turn_id}' not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&turn)?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style("Turn").bold(), style(&turn.turn_id).cyan());
    println!();
    println!("  Role:       {}", turn.role);
    if let Some(paired) = &turn.paired_turn_id {
        println!("  Replies to: {paired}");
    }
    println!("  Label:      {}", label_text(&turn));
    if let Some(session_id) = turn.session_id {
        println!("  Session:    {session_id}");
    }
    if let Some(user_id) = &turn.user_id {
        println!("  User:       {user_id}");
    }
    if let Some(embedding) = &turn.embedding {
        println!("  Embedding:  {} dimensions", embedding.len());
    }
    println!(
        "  Created:    {}",
        turn.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if !turn.content.is_empty() {
        println!();
        println!("  {}", turn.content);
    }
    println!();

    Ok(())
}

/// List the stored turns of a session in creation order.
pub async fn list_session(
    state: &AppState,
    session_id: Uuid,
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    if limit.is_some_and(|limit| limit <= 0) {
        bail!("--limit must be positive");
    }

    let turns = state
        .pipeline
        .repository()
        .list_session_turns(&session_id, limit)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    println!();
    if turns.is_empty() {
        println!(
            "  {}",
            style(format!("No turns stored for session {session_id}.")).dim()
        );
        println!();
        return Ok(());
    }

    println!(
        "  {} Session {} ({} turns)",
        style("⚡").bold(),
        style(session_id).cyan(),
        turns.len()
    );
    println!();
    for turn in &turns {
        println!(
            "  {}  {:<12} {:<10} {}",
            style(turn.created_at.format("%H:%M:%S")).dim(),
            turn.turn_id,
            turn.role,
            label_text(turn)
        );
    }
    println!();

    Ok(())
}

fn label_text(turn: &ConversationTurn) -> String {
    match turn.classification_id {
        Some(id) => match id.label() {
            Some(label) => format!("{label} ({id})"),
            None => format!("unknown ({id})"),
        },
        None => "unlabeled".to_string(),
    }
}
