//! Observability setup for Relevantic Recall.
//!
//! - `tracing_setup`: subscriber installation and OTel shutdown
//! - `spans`: span names shared by the CLI and HTTP surfaces

pub mod spans;
pub mod tracing_setup;
