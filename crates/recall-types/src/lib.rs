//! Shared domain types for Relevantic Recall.
//!
//! This crate contains the domain types used across the workspace:
//! conversation turns, the sentence classification label space, the
//! per-turn pairing state machine, retrieval results, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod classification;
pub mod config;
pub mod error;
pub mod pairing;
pub mod retrieval;
pub mod spans;
pub mod turn;
