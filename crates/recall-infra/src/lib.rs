//! Infrastructure layer for Relevantic Recall.
//!
//! Contains implementations of the collaborator traits defined in
//! `recall-core`: SQLite turn storage with nearest-neighbor search, the
//! HTTP and keyword classifiers, and the `config.toml` loader.

pub mod classifier;
pub mod config;
pub mod sqlite;
