//! Span name constants.
//!
//! Shared by the core (background sweeper) and the CLI and HTTP entry
//! points, so the same operation always emits an identically named span.
//! `recall-observe` re-exports these next to the tracer setup.

/// One turn through the classification pipeline.
pub const SPAN_PROCESS_TURN: &str = "recall.process_turn";

/// One similarity search against stored turns.
pub const SPAN_SEARCH: &str = "recall.search";

/// One sweep of expired correlation cache entries.
pub const SPAN_SWEEP: &str = "recall.sweep";

/// A batch ingest of turns from a JSONL file.
pub const SPAN_INGEST: &str = "recall.ingest";

/// Re-submission of a finalized record after a persistence failure.
pub const SPAN_PERSIST_RECORD: &str = "recall.persist_record";
