//! Transient correlation between user turns and their replies.
//!
//! The cache is an explicit dependency of the pipeline rather than a
//! process-wide singleton: each pipeline (and each test) owns its handle,
//! and the eviction policy is chosen at construction time.

pub mod cache;
pub mod sweeper;

pub use cache::{CorrelationCache, EvictionPolicy};
