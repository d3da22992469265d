//! Turn classification port.
//!
//! The classifier itself is an external collaborator: the pipeline only
//! needs "content in, label out". Implementations (HTTP model endpoint,
//! offline keyword rules) live in recall-infra.

pub mod box_classifier;
pub mod classifier;

pub use box_classifier::BoxClassifier;
pub use classifier::Classifier;
