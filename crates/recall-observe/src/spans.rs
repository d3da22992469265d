//! Span and tracer name constants.
//!
//! Span names live in `recall-types` so the core can use them without
//! depending on the subscriber stack; they are re-exported here for the
//! entry points.

pub use recall_types::spans::{
    SPAN_INGEST, SPAN_PERSIST_RECORD, SPAN_PROCESS_TURN, SPAN_SEARCH, SPAN_SWEEP,
};

/// OpenTelemetry tracer (instrumentation scope) name.
pub const TRACER_NAME: &str = "recall";
