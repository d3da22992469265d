//! Classifier implementations.
//!
//! - `HttpClassifier`: remote labeling service over JSON/HTTP
//! - `KeywordClassifier`: deterministic offline fallback

pub mod http;
pub mod keyword;

pub use http::HttpClassifier;
pub use keyword::KeywordClassifier;
