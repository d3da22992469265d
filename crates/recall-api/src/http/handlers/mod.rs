//! HTTP request handlers for the REST API.

pub mod cache;
pub mod record;
pub mod search;
pub mod turn;
