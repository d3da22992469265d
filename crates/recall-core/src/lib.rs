//! Business logic and collaborator trait definitions for Relevantic Recall.
//!
//! This crate defines the "ports" (classifier, persistence gateway and
//! nearest-neighbor search traits) that the infrastructure layer
//! implements, plus the turn pairing pipeline built on top of them. It
//! depends only on `recall-types` -- never on `recall-infra` or any
//! database/IO crate.

pub mod classify;
pub mod correlation;
pub mod persistence;
pub mod pipeline;
pub mod retrieval;
