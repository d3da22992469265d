//! Batch ingestion of JSONL turn files.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;

use recall_observe::spans::SPAN_INGEST;
use recall_types::error::PipelineError;
use recall_types::pairing::PairingState;
use recall_types::turn::{ConversationTurn, FinalizedTurn, TurnId, TurnRole};
use tracing::Instrument;

use crate::state::AppState;

/// Outcome of one line of the input file.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LineOutcome {
    Processed {
        line: usize,
        record: FinalizedTurn,
    },
    Failed {
        line: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        turn_id: Option<TurnId>,
        error: String,
    },
}

/// Summary printed after the whole file has been processed.
#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    pub processed: usize,
    pub failed: usize,
    /// Assistant turns that consumed their user turn.
    pub paired: usize,
    pub missed: usize,
    /// User turns still waiting for a reply when ingestion finished.
    pub pending: Vec<TurnId>,
    /// User turns abandoned by `--sweep`.
    pub abandoned: Vec<TurnId>,
    /// Finalized records whose write failed twice. Each can be resubmitted
    /// to `POST /api/v1/records`.
    pub unsaved: Vec<FinalizedTurn>,
    pub lines: Vec<LineOutcome>,
}

/// Parse one JSONL line. Blank lines yield `None`.
pub fn parse_turn_line(line: &str) -> Result<Option<ConversationTurn>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let turn = serde_json::from_str(trimmed).context("malformed turn JSON")?;
    Ok(Some(turn))
}

/// Process every turn in `file` in order, then report.
pub async fn ingest(state: &AppState, file: &Path, sweep: bool, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let summary = ingest_lines(state, &content, sweep)
        .instrument(tracing::info_span!(SPAN_INGEST, file = %file.display()))
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_summary(file, &summary);
    Ok(())
}

/// Run each line through the shared pipeline and collect the outcomes.
pub async fn ingest_lines(state: &AppState, content: &str, sweep: bool) -> IngestSummary {
    let mut summary = IngestSummary::default();
    let mut user_turns: Vec<TurnId> = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        let turn = match parse_turn_line(line) {
            Ok(Some(turn)) => turn,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping unparseable line");
                summary.failed += 1;
                summary.lines.push(LineOutcome::Failed {
                    line: line_no,
                    turn_id: None,
                    error: format!("{e:#}"),
                });
                continue;
            }
        };

        let turn_id = turn.turn_id.clone();
        let is_user = turn.role == TurnRole::User;

        match state.pipeline.process(turn).await {
            Ok(record) => {
                if is_user && !user_turns.contains(&turn_id) {
                    user_turns.push(turn_id);
                }
                summary.record(line_no, record);
            }
            Err(PipelineError::PersistenceFailed { record, source }) => {
                // The label was computed and the cache updated; only storage failed.
                if is_user && !user_turns.contains(&turn_id) {
                    user_turns.push(turn_id.clone());
                }
                tracing::warn!(line = line_no, turn_id = %turn_id, error = %source, "Retrying write");
                match state.pipeline.persist(*record).await {
                    Ok(record) => summary.record(line_no, record),
                    Err(PipelineError::PersistenceFailed { record, source }) => {
                        summary.failed += 1;
                        summary.lines.push(LineOutcome::Failed {
                            line: line_no,
                            turn_id: Some(turn_id),
                            error: format!("persistence failed: {source}"),
                        });
                        summary.unsaved.push(*record);
                    }
                    Err(e) => {
                        summary.failed += 1;
                        summary.lines.push(LineOutcome::Failed {
                            line: line_no,
                            turn_id: Some(turn_id),
                            error: e.to_string(),
                        });
                    }
                }
            }
            Err(e) => {
                summary.failed += 1;
                summary.lines.push(LineOutcome::Failed {
                    line: line_no,
                    turn_id: Some(turn_id),
                    error: e.to_string(),
                });
            }
        }
    }

    if sweep {
        summary.abandoned = state
            .cache
            .sweep_expired()
            .into_iter()
            .map(|(turn_id, _)| turn_id)
            .collect();
    }

    summary.pending = user_turns
        .into_iter()
        .filter(|turn_id| state.cache.contains(turn_id))
        .collect();

    summary
}

impl IngestSummary {
    fn record(&mut self, line: usize, record: FinalizedTurn) {
        self.processed += 1;
        match record.pairing {
            PairingState::Paired { .. } => self.paired += 1,
            PairingState::Missed { .. } => self.missed += 1,
            _ => {}
        }
        self.lines.push(LineOutcome::Processed { line, record });
    }
}

fn print_summary(file: &Path, summary: &IngestSummary) {
    println!();
    println!(
        "  {} Ingested {}",
        style("⚡").bold(),
        style(file.display()).cyan()
    );
    println!();

    for outcome in &summary.lines {
        match outcome {
            LineOutcome::Processed { line, record } => {
                let label = match (record.classification, record.classification_id()) {
                    (Some(label), _) => label.as_str().to_string(),
                    (None, Some(id)) => format!("#{id}"),
                    (None, None) => "-".to_string(),
                };
                println!(
                    "  {} {:>4}  {:<12} {:<10} {:<26} {}",
                    style("✓").green(),
                    line,
                    record.turn_id(),
                    record.turn.role,
                    label,
                    style(record.pairing.name()).dim()
                );
            }
            LineOutcome::Failed {
                line,
                turn_id,
                error,
            } => {
                let turn_id = turn_id.as_ref().map(TurnId::as_str).unwrap_or("-");
                println!(
                    "  {} {:>4}  {:<12} {}",
                    style("✗").red(),
                    line,
                    turn_id,
                    style(error).red()
                );
            }
        }
    }

    println!();
    println!("  {}", style("── Summary ──").dim());
    println!("  Processed: {}", style(summary.processed).bold());
    println!("  Replies:   {} labeled, {} missed", summary.paired, summary.missed);
    if summary.failed > 0 {
        println!("  Failed:    {}", style(summary.failed).red());
    }
    if !summary.abandoned.is_empty() {
        println!(
            "  Abandoned: {}",
            style(summary.abandoned.len()).yellow()
        );
    }
    if !summary.unsaved.is_empty() {
        println!(
            "  Unsaved:   {} (rerun with --json and POST them to /api/v1/records)",
            style(summary.unsaved.len()).red()
        );
    }
    if !summary.pending.is_empty() {
        println!("  Unpaired:  {}", style(summary.pending.len()).yellow());
        for turn_id in &summary.pending {
            println!("    {} {}", style("·").dim(), turn_id);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::persistence::TurnRepository;
    use recall_types::classification::ClassificationId;

    use crate::state::test_support::test_state;

    #[test]
    fn test_parse_turn_line() {
        assert!(parse_turn_line("   ").unwrap().is_none());

        let turn = parse_turn_line(r#"{"turn_id":"u1","role":"user","content":"hi"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(turn.turn_id, TurnId::from("u1"));

        assert!(parse_turn_line("{not json").is_err());
    }

    #[tokio::test]
    async fn test_ingest_pairs_in_order_and_reports_leftovers() {
        let state = test_state().await;
        let content = r#"
{"turn_id":"u1","role":"user","content":"where is my refund?"}
{"turn_id":"a1","role":"assistant","paired_turn_id":"u1","content":"It is on its way."}
{"turn_id":"u2","role":"user","content":"cancel my order"}
not json
{"turn_id":"a9","role":"assistant","paired_turn_id":"u9","content":"?"}
"#;

        let summary = ingest_lines(&state, content, false).await;

        assert_eq!(summary.processed, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.paired, 1);
        assert_eq!(summary.missed, 1);
        assert_eq!(summary.pending, vec![TurnId::from("u2")]);

        let reply = summary
            .lines
            .iter()
            .find_map(|outcome| match outcome {
                LineOutcome::Processed { record, .. } if record.turn_id().as_str() == "a1" => {
                    Some(record)
                }
                _ => None,
            })
            .unwrap();
        // user_question (0) -> assistant_answer (2)
        assert_eq!(reply.classification_id(), Some(ClassificationId(2)));
    }

    #[tokio::test]
    async fn test_ingest_invalid_turn_is_reported_not_stored() {
        let state = test_state().await;
        let content = r#"{"turn_id":"a1","role":"assistant","paired_turn_id":"a1"}"#;

        let summary = ingest_lines(&state, content, false).await;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed, 0);
        assert_eq!(state.pipeline.repository().count_turns().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_keeps_records_it_could_not_store() {
        let state = test_state().await;
        sqlx::query(
            "CREATE TRIGGER reject_turns BEFORE INSERT ON conversation_turns \
             BEGIN SELECT RAISE(ABORT, 'storage offline'); END",
        )
        .execute(&state.db_pool.writer)
        .await
        .unwrap();

        let content = r#"{"turn_id":"u1","role":"user","content":"where is my refund?"}"#;
        let summary = ingest_lines(&state, content, false).await;

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unsaved.len(), 1);
        assert_eq!(summary.unsaved[0].classification_id(), Some(ClassificationId(0)));
        // Classification happened, so a later reply can still pair.
        assert_eq!(summary.pending, vec![TurnId::from("u1")]);

        sqlx::query("DROP TRIGGER reject_turns")
            .execute(&state.db_pool.writer)
            .await
            .unwrap();
        let record = summary.unsaved.into_iter().next().unwrap();
        state.pipeline.persist(record).await.unwrap();
        assert_eq!(state.pipeline.repository().count_turns().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_sweep_without_expiry_keeps_pending() {
        let state = test_state().await;
        let content = r#"{"turn_id":"u1","role":"user","content":"hello"}"#;

        let summary = ingest_lines(&state, content, true).await;
        assert!(summary.abandoned.is_empty());
        assert_eq!(summary.pending, vec![TurnId::from("u1")]);
    }
}
